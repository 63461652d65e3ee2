//! Remote API seam
//!
//! The transport behind the adapter. A production implementation wraps the
//! provider's SDK client, constructed once per process and passed in
//! explicitly; tests substitute a fake. Authentication, retries, and rate
//! limiting are the transport's responsibility. Cancellation is the caller
//! dropping the returned future; the next read reconciles whatever state the
//! abandoned call left behind.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::AdapterResult;

/// One page of a resource listing
#[derive(Debug, Clone, Default)]
pub struct ResourcePage {
    /// Stable identifiers of the resources on this page
    pub identifiers: Vec<String>,
    /// Continuation token; `None` means no more pages remain
    pub next_token: Option<String>,
}

/// Remote resource operations, keyed by the remote type name
///
/// Implementations map the provider's "object absent" error shapes to
/// [`AdapterError::NotFound`](crate::error::AdapterError::NotFound) so the
/// taxonomy stays uniform across transports.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Create a resource and return its property document
    async fn create_resource(
        &self,
        type_name: &str,
        desired: JsonValue,
    ) -> AdapterResult<JsonValue>;

    /// Fetch a resource's property document; `None` if it does not exist
    async fn get_resource(
        &self,
        type_name: &str,
        identifier: &str,
    ) -> AdapterResult<Option<JsonValue>>;

    /// Apply an RFC 6902 patch document to a resource
    async fn update_resource(
        &self,
        type_name: &str,
        identifier: &str,
        patch: JsonValue,
    ) -> AdapterResult<()>;

    /// Delete a resource; surfaces `NotFound` distinctly so callers can
    /// decide whether absence is a failure
    async fn delete_resource(&self, type_name: &str, identifier: &str) -> AdapterResult<()>;

    /// List one page of resources of the given type
    async fn list_resources(
        &self,
        type_name: &str,
        next_token: Option<&str>,
    ) -> AdapterResult<ResourcePage>;
}
