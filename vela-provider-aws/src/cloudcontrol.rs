//! AWS Cloud Control transport
//!
//! Implements the remote API seam over the Cloud Control API: every resource
//! type is addressed by its type name and a JSON property document. Mutating
//! calls are asynchronous on the AWS side; each one is driven to completion
//! by polling the returned request token before the call is reported done.
//!
//! Construct the client once per process and pass it into each adapter.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_cloudcontrol::Client as CloudControlClient;
use aws_sdk_cloudcontrol::types::OperationStatus;
use serde_json::Value as JsonValue;
use vela_core::api::{RemoteApi, ResourcePage};
use vela_core::error::{AdapterError, AdapterResult, Operation};

const MAX_STATUS_ATTEMPTS: u32 = 120;
const STATUS_POLL_DELAY: Duration = Duration::from_secs(5);

/// Cloud Control-backed implementation of [`RemoteApi`]
pub struct CloudControlApi {
    client: CloudControlClient,
}

impl CloudControlApi {
    /// Create a client for the given region using the ambient credential chain
    pub async fn new(region: &str) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        Self {
            client: CloudControlClient::new(&config),
        }
    }

    /// Wrap an already-configured SDK client
    pub fn from_client(client: CloudControlClient) -> Self {
        Self { client }
    }

    /// Poll an in-flight Cloud Control operation until it settles
    ///
    /// Returns the primary identifier of the affected resource on success.
    async fn wait_for_operation(
        &self,
        type_name: &str,
        operation: Operation,
        request_token: &str,
    ) -> AdapterResult<String> {
        for _ in 0..MAX_STATUS_ATTEMPTS {
            let status = self
                .client
                .get_resource_request_status()
                .request_token(request_token)
                .send()
                .await
                .map_err(|e| {
                    AdapterError::remote(
                        type_name,
                        operation,
                        "",
                        format!("failed to get operation status: {:?}", e),
                    )
                })?;

            if let Some(progress) = status.progress_event() {
                match progress.operation_status() {
                    Some(OperationStatus::Success) => {
                        return Ok(progress.identifier().unwrap_or_default().to_string());
                    }
                    Some(OperationStatus::Failed) => {
                        let identifier = progress.identifier().unwrap_or_default();
                        let message = progress.status_message().unwrap_or("unknown error");
                        return Err(classify(
                            type_name,
                            operation,
                            identifier,
                            message.to_string(),
                        ));
                    }
                    Some(OperationStatus::CancelComplete) => {
                        return Err(AdapterError::remote(
                            type_name,
                            operation,
                            progress.identifier().unwrap_or_default(),
                            "operation was cancelled",
                        ));
                    }
                    _ => {
                        tokio::time::sleep(STATUS_POLL_DELAY).await;
                    }
                }
            } else {
                tokio::time::sleep(STATUS_POLL_DELAY).await;
            }
        }

        Err(AdapterError::remote(
            type_name,
            operation,
            "",
            "operation timed out",
        ))
    }
}

#[async_trait]
impl RemoteApi for CloudControlApi {
    async fn create_resource(
        &self,
        type_name: &str,
        desired: JsonValue,
    ) -> AdapterResult<JsonValue> {
        let result = self
            .client
            .create_resource()
            .type_name(type_name)
            .desired_state(desired.to_string())
            .send()
            .await
            .map_err(|e| {
                AdapterError::remote(type_name, Operation::Create, "", format!("{:?}", e))
            })?;

        let request_token = result
            .progress_event()
            .and_then(|p| p.request_token())
            .ok_or_else(|| AdapterError::empty_output(type_name, Operation::Create))?;

        let identifier = self
            .wait_for_operation(type_name, Operation::Create, request_token)
            .await?;

        match self.get_resource(type_name, &identifier).await? {
            Some(props) => Ok(props),
            None => Err(AdapterError::empty_output(type_name, Operation::Create)),
        }
    }

    async fn get_resource(
        &self,
        type_name: &str,
        identifier: &str,
    ) -> AdapterResult<Option<JsonValue>> {
        let result = self
            .client
            .get_resource()
            .type_name(type_name)
            .identifier(identifier)
            .send()
            .await;

        match result {
            Ok(response) => {
                // Success with no property document violates the API
                // contract; this is not the same as "does not exist"
                let props = response
                    .resource_description()
                    .and_then(|d| d.properties())
                    .ok_or_else(|| AdapterError::empty_output(type_name, Operation::Read))?;
                let props = serde_json::from_str(props).map_err(|e| {
                    AdapterError::remote(
                        type_name,
                        Operation::Read,
                        identifier,
                        format!("invalid property document: {}", e),
                    )
                })?;
                Ok(Some(props))
            }
            Err(e) => {
                match classify(type_name, Operation::Read, identifier, format!("{:?}", e)) {
                    AdapterError::NotFound { .. } => Ok(None),
                    other => Err(other),
                }
            }
        }
    }

    async fn update_resource(
        &self,
        type_name: &str,
        identifier: &str,
        patch: JsonValue,
    ) -> AdapterResult<()> {
        if patch.as_array().is_none_or(Vec::is_empty) {
            return Ok(());
        }

        let patch_document = serde_json::to_string(&patch).map_err(|e| {
            AdapterError::remote(
                type_name,
                Operation::Update,
                identifier,
                format!("failed to build patch: {}", e),
            )
        })?;

        let result = self
            .client
            .update_resource()
            .type_name(type_name)
            .identifier(identifier)
            .patch_document(patch_document)
            .send()
            .await
            .map_err(|e| classify(type_name, Operation::Update, identifier, format!("{:?}", e)))?;

        if let Some(request_token) = result.progress_event().and_then(|p| p.request_token()) {
            self.wait_for_operation(type_name, Operation::Update, request_token)
                .await?;
        }

        Ok(())
    }

    async fn delete_resource(&self, type_name: &str, identifier: &str) -> AdapterResult<()> {
        let result = self
            .client
            .delete_resource()
            .type_name(type_name)
            .identifier(identifier)
            .send()
            .await
            .map_err(|e| classify(type_name, Operation::Delete, identifier, format!("{:?}", e)))?;

        if let Some(request_token) = result.progress_event().and_then(|p| p.request_token()) {
            self.wait_for_operation(type_name, Operation::Delete, request_token)
                .await?;
        }

        Ok(())
    }

    async fn list_resources(
        &self,
        type_name: &str,
        next_token: Option<&str>,
    ) -> AdapterResult<ResourcePage> {
        let mut request = self.client.list_resources().type_name(type_name);
        if let Some(token) = next_token {
            request = request.next_token(token);
        }

        let output = request
            .send()
            .await
            .map_err(|e| classify(type_name, Operation::List, "", format!("{:?}", e)))?;

        let identifiers = output
            .resource_descriptions()
            .iter()
            .filter_map(|d| d.identifier().map(str::to_string))
            .collect();

        Ok(ResourcePage {
            identifiers,
            next_token: output.next_token().map(str::to_string),
        })
    }
}

/// Map a Cloud Control failure to the adapter taxonomy
///
/// The SDK reports "object absent" through several error shapes; all of them
/// must land on `NotFound` so delete idempotency and read-absence work.
fn classify(
    type_name: &str,
    operation: Operation,
    identifier: &str,
    message: String,
) -> AdapterError {
    if message.contains("ResourceNotFound") || message.contains("NotFoundException") {
        AdapterError::not_found(type_name, identifier)
    } else {
        AdapterError::remote(type_name, operation, identifier, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_detects_resource_not_found() {
        let err = classify(
            "AWS::SES::Tenant",
            Operation::Read,
            "t1",
            "ServiceError { code: \"ResourceNotFoundException\", .. }".to_string(),
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn classify_detects_plain_not_found_exception() {
        let err = classify(
            "AWS::CleanRooms::ConfiguredTable",
            Operation::Delete,
            "ct-1",
            "NotFoundException: configured table does not exist".to_string(),
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn classify_passes_other_errors_through() {
        let err = classify(
            "AWS::SES::Tenant",
            Operation::Delete,
            "t1",
            "ThrottlingException: slow down".to_string(),
        );
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("t1"));
    }
}
