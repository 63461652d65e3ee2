//! Email-sending tenant schema

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value as JsonValue;
use vela_core::resource::Value;
use vela_core::schema::{AttributeSchema, AttributeType, IdentifierSource, ResourceSchema};

/// Sending status values reported by the service
fn sending_status() -> AttributeType {
    AttributeType::Enum(vec![
        "ENABLED".to_string(),
        "DISABLED".to_string(),
        "REINSTATED".to_string(),
    ])
}

/// Schema for an email-sending tenant
///
/// The tenant name doubles as the stable identifier: reads, deletes, and
/// imports are all keyed by it. Every input attribute forces replacement,
/// so the resource has no in-place update path.
pub fn tenant() -> ResourceSchema {
    ResourceSchema::new("ses_tenant", "AWS::SES::Tenant")
        .identifier(IdentifierSource::Attribute("tenant_name".to_string()))
        .attribute(
            AttributeSchema::new("tenant_name", AttributeType::String)
                .required()
                .force_new()
                .remote("TenantName"),
        )
        .attribute(
            AttributeSchema::new("id", AttributeType::String)
                .computed()
                .remote("TenantId"),
        )
        .attribute(
            AttributeSchema::new("arn", AttributeType::String)
                .computed()
                .remote("TenantArn"),
        )
        .attribute(
            AttributeSchema::new("sending_status", sending_status())
                .computed()
                .remote("SendingStatus"),
        )
        .attribute(AttributeSchema::new("created_timestamp", AttributeType::String).computed())
        .attribute(
            AttributeSchema::new("tags", AttributeType::Map(Box::new(AttributeType::String)))
                .tags(),
        )
        .with_flatten_hook(flatten_created_timestamp)
}

/// Normalize the creation instant to RFC 3339
///
/// The transport may hand the timestamp back as an RFC 3339 string or as
/// epoch seconds depending on the service; state always stores one shape.
fn flatten_created_timestamp(props: &JsonValue, attrs: &mut HashMap<String, Value>) {
    let Some(raw) = props.get("CreatedTimestamp") else {
        return;
    };
    let parsed = match raw {
        JsonValue::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        JsonValue::Number(n) => n.as_i64().and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        _ => None,
    };
    if let Some(instant) = parsed {
        attrs.insert(
            "created_timestamp".to_string(),
            Value::String(instant.to_rfc3339_opts(SecondsFormat::Secs, true)),
        );
    }
}
