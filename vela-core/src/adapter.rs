//! Generic resource adapter
//!
//! One component, parameterized by a (schema, client) pair per resource
//! type. Translates a declared record into remote calls and remote results
//! back into observed state, converging actual existence toward desired
//! existence. Holds no mutable state of its own; the engine guarantees at
//! most one in-flight lifecycle operation per record.

use serde_json::{Value as JsonValue, json};

use crate::api::RemoteApi;
use crate::diff::ChangeSet;
use crate::error::{AdapterError, AdapterResult, Operation};
use crate::mapping;
use crate::resource::{Record, RemoteState, ResourceId};
use crate::schema::{IdentifierSource, Mapping, ResourceSchema};
use crate::waiter::{StatusPoll, WaitError, WaitSpec, wait_for_status};

/// Opt-in convergence wait after create
///
/// Polls the named status attribute via read until the wait spec's target
/// holds. Neither shipped resource configuration enables this.
#[derive(Debug, Clone)]
pub struct CreateWait {
    pub spec: WaitSpec,
    /// Attribute carrying the server-assigned status (e.g. "sending_status")
    pub status_attribute: String,
}

/// CRUD adapter for one resource type
pub struct ResourceAdapter<'a, C> {
    schema: &'a ResourceSchema,
    client: &'a C,
    create_wait: Option<CreateWait>,
}

impl<'a, C: RemoteApi> ResourceAdapter<'a, C> {
    /// Build an adapter, verifying the schema's mapping table first
    ///
    /// An unmapped required attribute is a configuration error and surfaces
    /// here, before any operation runs.
    pub fn new(schema: &'a ResourceSchema, client: &'a C) -> AdapterResult<Self> {
        schema
            .verify()
            .map_err(|msg| AdapterError::validation(&schema.resource_type, msg))?;
        Ok(Self {
            schema,
            client,
            create_wait: None,
        })
    }

    pub fn with_create_wait(mut self, wait: CreateWait) -> Self {
        self.create_wait = Some(wait);
        self
    }

    /// Create the remote resource and return its observed state
    ///
    /// The returned state carries the user's attributes overlaid with every
    /// server-computed field from the create response, and the stable
    /// identifier under which the resource can be read back.
    pub async fn create(&self, record: &Record) -> AdapterResult<RemoteState> {
        self.validate(record)?;

        let props = mapping::expand(self.schema, &record.attributes);
        let out = self
            .client
            .create_resource(&self.schema.type_name, JsonValue::Object(props))
            .await?;

        // Success with no usable payload is a contract violation on the
        // remote side, not an absence
        if out.as_object().is_none_or(|o| o.is_empty()) {
            return Err(AdapterError::empty_output(
                &self.schema.resource_type,
                Operation::Create,
            ));
        }

        let identifier = self.identifier_from(record, &out)?;

        // With a wait configured, the create response may predate
        // convergence; re-read so the returned state reflects it
        let remote_attributes = if let Some(wait) = &self.create_wait {
            self.wait_for_create(wait, &record.id, &identifier).await?;
            let state = self.read(&record.id, &identifier).await?;
            if !state.exists {
                return Err(AdapterError::empty_output(
                    &self.schema.resource_type,
                    Operation::Create,
                ));
            }
            state.attributes
        } else {
            mapping::flatten(self.schema, &out)
        };

        let mut attributes = record.attributes.clone();
        attributes.extend(remote_attributes);
        Ok(RemoteState::existing(record.id.clone(), attributes).with_identifier(identifier))
    }

    /// Observe the remote resource keyed by its stable identifier
    ///
    /// Absence is a value, not an error: the caller drops the record instead
    /// of failing the workflow. The returned attributes are built in full
    /// before the state is constructed, so no partial population can escape.
    pub async fn read(&self, id: &ResourceId, identifier: &str) -> AdapterResult<RemoteState> {
        let props = match self
            .client
            .get_resource(&self.schema.type_name, identifier)
            .await
        {
            Ok(props) => props,
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        match props {
            None => {
                log::warn!("{} ({}) not found, dropping from state", id, identifier);
                Ok(RemoteState::not_found(id.clone()))
            }
            Some(props) => {
                let attributes = mapping::flatten(self.schema, &props);
                Ok(RemoteState::existing(id.clone(), attributes).with_identifier(identifier))
            }
        }
    }

    /// Apply the in-place updatable part of the diff, then re-read
    ///
    /// Force-new attributes never enter the request payload; a diff on one is
    /// rejected so the engine routes it to replace. A tags-only diff issues
    /// no remote call at all.
    pub async fn update(&self, desired: &Record, previous: &RemoteState) -> AdapterResult<RemoteState> {
        self.validate(desired)?;

        let Some(identifier) = previous.identifier.as_deref() else {
            return Err(AdapterError::validation(
                &self.schema.resource_type,
                "cannot update a resource that has no identifier",
            ));
        };

        let change_set = ChangeSet::compute(self.schema, desired, previous);
        if change_set.requires_replace() {
            return Err(AdapterError::validation(
                &self.schema.resource_type,
                format!(
                    "cannot change [{}] in place; destroy and recreate",
                    change_set.replaced.join(", ")
                ),
            ));
        }
        if change_set.is_empty() || change_set.is_tags_only() {
            return Ok(previous.clone());
        }

        let patch = self.build_patch(&change_set, desired);
        self.client
            .update_resource(&self.schema.type_name, identifier, patch)
            .await?;

        let state = self.read(&desired.id, identifier).await?;
        if !state.exists {
            return Err(AdapterError::empty_output(
                &self.schema.resource_type,
                Operation::Update,
            ));
        }
        Ok(state)
    }

    /// Delete the remote resource; absence already being true is success
    pub async fn delete(&self, id: &ResourceId, identifier: &str) -> AdapterResult<()> {
        log::info!("deleting {} ({})", id, identifier);
        match self
            .client
            .delete_resource(&self.schema.type_name, identifier)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Reconstruct state from a stable identifier alone
    ///
    /// The identifier format is resource-specific: the user-assigned name
    /// when the schema's identifier source is an attribute, the
    /// server-generated id otherwise. Unlike read, importing something that
    /// does not exist is an error.
    pub async fn import(&self, name: &str, identifier: &str) -> AdapterResult<RemoteState> {
        let id = ResourceId::new(&self.schema.resource_type, name);
        let state = self.read(&id, identifier).await?;
        if !state.exists {
            return Err(AdapterError::not_found(
                &self.schema.resource_type,
                identifier,
            ));
        }
        Ok(state)
    }

    fn validate(&self, record: &Record) -> AdapterResult<()> {
        self.schema.validate(&record.attributes).map_err(|errors| {
            let message = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            AdapterError::validation(&self.schema.resource_type, message)
        })
    }

    fn identifier_from(&self, record: &Record, out: &JsonValue) -> AdapterResult<String> {
        match &self.schema.identifier {
            IdentifierSource::Attribute(attr) => {
                record.get_str(attr).map(str::to_string).ok_or_else(|| {
                    AdapterError::validation(
                        &self.schema.resource_type,
                        format!("identifier attribute '{}' is not set", attr),
                    )
                })
            }
            IdentifierSource::RemoteField(field) => out
                .get(field.as_str())
                .and_then(JsonValue::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    AdapterError::empty_output(&self.schema.resource_type, Operation::Create)
                }),
        }
    }

    fn build_patch(&self, change_set: &ChangeSet, desired: &Record) -> JsonValue {
        let mut ops = Vec::new();
        for name in &change_set.changed {
            let Some(attr) = self.schema.attributes.get(name) else {
                continue;
            };
            if let Mapping::Remote(remote_name) = &attr.mapping
                && let Some(value) = desired.attributes.get(name)
                && let Some(json) = mapping::value_to_json(value)
            {
                ops.push(json!({
                    "op": "replace",
                    "path": format!("/{}", remote_name),
                    "value": json
                }));
            }
        }
        JsonValue::Array(ops)
    }

    async fn wait_for_create(
        &self,
        wait: &CreateWait,
        id: &ResourceId,
        identifier: &str,
    ) -> AdapterResult<()> {
        let status_attribute = wait.status_attribute.as_str();
        let result = wait_for_status(&wait.spec, move || async move {
            let state = self.read(id, identifier).await?;
            if !state.exists {
                return Ok(StatusPoll::NotFound);
            }
            let status = state
                .get_str(status_attribute)
                .unwrap_or_default()
                .to_string();
            Ok(StatusPoll::Status(status))
        })
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(WaitError::Refresh(inner)) => Err(inner),
            Err(other) => Err(AdapterError::remote(
                &self.schema.resource_type,
                Operation::Create,
                identifier,
                other.to_string(),
            )),
        }
    }
}
