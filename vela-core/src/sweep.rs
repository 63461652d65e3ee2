//! Bulk discovery of remote resources for out-of-band cleanup
//!
//! Test tooling enumerates everything of a type and deletes the orphans.
//! Enumeration is exhaustive: pages are fetched until the API stops handing
//! back a continuation token, and a page-fetch failure aborts the whole pass
//! with no partial result.

use crate::api::RemoteApi;
use crate::error::AdapterResult;
use crate::schema::ResourceSchema;

/// A deletable handle to one discovered remote resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepHandle {
    pub type_name: String,
    pub identifier: String,
}

impl SweepHandle {
    /// Delete the resource behind this handle; absence counts as success
    pub async fn delete<C: RemoteApi>(&self, client: &C) -> AdapterResult<()> {
        log::info!("sweeping {} ({})", self.type_name, self.identifier);
        match client
            .delete_resource(&self.type_name, &self.identifier)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Enumerate every remote resource of the schema's type
///
/// Returns one handle per resource across all pages, or the first page-fetch
/// error with no partial results.
pub async fn discover<C: RemoteApi>(
    schema: &ResourceSchema,
    client: &C,
) -> AdapterResult<Vec<SweepHandle>> {
    let mut handles = Vec::new();
    let mut next_token: Option<String> = None;

    loop {
        let page = client
            .list_resources(&schema.type_name, next_token.as_deref())
            .await?;

        handles.extend(page.identifiers.into_iter().map(|identifier| SweepHandle {
            type_name: schema.type_name.clone(),
            identifier,
        }));

        match page.next_token {
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    Ok(handles)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::Value as JsonValue;

    use super::*;
    use crate::api::ResourcePage;
    use crate::error::{AdapterError, AdapterResult, Operation};

    /// Serves a scripted sequence of pages; a `None` entry fails that fetch.
    struct PagedFake {
        pages: Mutex<Vec<Option<ResourcePage>>>,
        deleted: Mutex<Vec<String>>,
    }

    impl PagedFake {
        fn new(pages: Vec<Option<ResourcePage>>) -> Self {
            Self {
                pages: Mutex::new(pages),
                deleted: Mutex::new(Vec::new()),
            }
        }
    }

    fn page(identifiers: &[&str], next_token: Option<&str>) -> ResourcePage {
        ResourcePage {
            identifiers: identifiers.iter().map(|s| s.to_string()).collect(),
            next_token: next_token.map(str::to_string),
        }
    }

    #[async_trait]
    impl RemoteApi for PagedFake {
        async fn create_resource(
            &self,
            type_name: &str,
            _desired: JsonValue,
        ) -> AdapterResult<JsonValue> {
            Err(AdapterError::remote(
                type_name,
                Operation::Create,
                "",
                "not supported",
            ))
        }

        async fn get_resource(
            &self,
            _type_name: &str,
            _identifier: &str,
        ) -> AdapterResult<Option<JsonValue>> {
            Ok(None)
        }

        async fn update_resource(
            &self,
            type_name: &str,
            identifier: &str,
            _patch: JsonValue,
        ) -> AdapterResult<()> {
            Err(AdapterError::remote(
                type_name,
                Operation::Update,
                identifier,
                "not supported",
            ))
        }

        async fn delete_resource(&self, _type_name: &str, identifier: &str) -> AdapterResult<()> {
            self.deleted.lock().unwrap().push(identifier.to_string());
            Ok(())
        }

        async fn list_resources(
            &self,
            type_name: &str,
            _next_token: Option<&str>,
        ) -> AdapterResult<ResourcePage> {
            let mut pages = self.pages.lock().unwrap();
            if pages.is_empty() {
                return Ok(ResourcePage::default());
            }
            pages.remove(0).ok_or_else(|| {
                AdapterError::remote(type_name, Operation::List, "", "page fetch failed")
            })
        }
    }

    fn schema() -> ResourceSchema {
        ResourceSchema::new("widget", "Test::Widget")
    }

    #[tokio::test]
    async fn discover_collects_every_page() {
        let client = PagedFake::new(vec![
            Some(page(&["a", "b"], Some("t1"))),
            Some(page(&["c"], Some("t2"))),
            Some(page(&["d", "e"], None)),
        ]);

        let handles = discover(&schema(), &client).await.unwrap();
        let identifiers: Vec<&str> = handles.iter().map(|h| h.identifier.as_str()).collect();
        assert_eq!(identifiers, vec!["a", "b", "c", "d", "e"]);
        assert!(handles.iter().all(|h| h.type_name == "Test::Widget"));
    }

    #[tokio::test]
    async fn discover_aborts_on_page_failure() {
        // First page succeeds with two items, second page fails: the caller
        // gets an error, never a two-item partial list
        let client = PagedFake::new(vec![Some(page(&["a", "b"], Some("t1"))), None]);

        let result = discover(&schema(), &client).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn handles_delete_through_the_client() {
        let client = PagedFake::new(vec![Some(page(&["a"], None))]);
        let handles = discover(&schema(), &client).await.unwrap();
        handles[0].delete(&client).await.unwrap();
        assert_eq!(*client.deleted.lock().unwrap(), vec!["a".to_string()]);
    }
}
