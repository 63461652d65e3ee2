//! Clean-room configured table schema

use std::collections::HashMap;

use serde_json::{Value as JsonValue, json};
use vela_core::resource::Value;
use vela_core::schema::{AttributeSchema, AttributeType, IdentifierSource, ResourceSchema};

const MAX_ALLOWED_COLUMNS: usize = 225;

/// Analysis method; the service currently supports direct query only
fn analysis_method() -> AttributeType {
    AttributeType::Custom {
        name: "AnalysisMethod".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(s) if s == "DIRECT_QUERY" => Ok(()),
            Value::String(s) => Err(format!(
                "invalid analysis method '{}': the only supported value is DIRECT_QUERY",
                s
            )),
            _ => Err("expected string".to_string()),
        },
    }
}

/// Columns the collaboration may analyze, 1 to 225 entries
fn allowed_columns() -> AttributeType {
    AttributeType::Custom {
        name: "AllowedColumns".to_string(),
        base: Box::new(AttributeType::List(Box::new(AttributeType::String))),
        validate: |value| match value {
            Value::List(items) => {
                if items.is_empty() || items.len() > MAX_ALLOWED_COLUMNS {
                    return Err(format!(
                        "allowed_columns must contain between 1 and {} entries, got {}",
                        MAX_ALLOWED_COLUMNS,
                        items.len()
                    ));
                }
                if items.iter().any(|v| !matches!(v, Value::String(_))) {
                    return Err("allowed_columns entries must be strings".to_string());
                }
                Ok(())
            }
            _ => Err("expected list of strings".to_string()),
        },
    }
}

/// Schema for a configured table in a clean-room collaboration
///
/// The stable identifier is the server-generated table id, known only after
/// create; importing requires that id, not the display name. Name and
/// description update in place; the column set and the underlying table
/// reference force replacement.
pub fn configured_table() -> ResourceSchema {
    ResourceSchema::new(
        "cleanrooms_configured_table",
        "AWS::CleanRooms::ConfiguredTable",
    )
    .identifier(IdentifierSource::RemoteField("Id".to_string()))
    .attribute(
        AttributeSchema::new("name", AttributeType::String)
            .required()
            .remote("Name"),
    )
    .attribute(AttributeSchema::new("description", AttributeType::String).remote("Description"))
    .attribute(
        AttributeSchema::new("analysis_method", analysis_method())
            .required()
            .force_new()
            .remote("AnalysisMethod"),
    )
    .attribute(
        AttributeSchema::new("allowed_columns", allowed_columns())
            .required()
            .force_new()
            .remote("AllowedColumns"),
    )
    .attribute(
        // Nested shape; expanded and flattened by the hooks below
        AttributeSchema::new(
            "table_reference",
            AttributeType::Map(Box::new(AttributeType::String)),
        )
        .required()
        .force_new(),
    )
    .attribute(
        AttributeSchema::new("id", AttributeType::String)
            .computed()
            .remote("Id"),
    )
    .attribute(
        AttributeSchema::new("arn", AttributeType::String)
            .computed()
            .remote("Arn"),
    )
    .attribute(
        AttributeSchema::new("create_time", AttributeType::String)
            .computed()
            .remote("CreateTime"),
    )
    .attribute(
        AttributeSchema::new("update_time", AttributeType::String)
            .computed()
            .remote("UpdateTime"),
    )
    .attribute(
        AttributeSchema::new("tags", AttributeType::Map(Box::new(AttributeType::String))).tags(),
    )
    .with_expand_hook(expand_table_reference)
    .with_flatten_hook(flatten_table_reference)
}

/// The wire shape nests the Glue reference one level deeper than the record
fn expand_table_reference(
    attrs: &HashMap<String, Value>,
    props: &mut serde_json::Map<String, JsonValue>,
) {
    let Some(Value::Map(reference)) = attrs.get("table_reference") else {
        return;
    };
    let (Some(database), Some(table)) = (
        reference.get("database_name").and_then(Value::as_str),
        reference.get("table_name").and_then(Value::as_str),
    ) else {
        return;
    };
    props.insert(
        "TableReference".to_string(),
        json!({
            "Glue": {
                "DatabaseName": database,
                "TableName": table
            }
        }),
    );
}

fn flatten_table_reference(props: &JsonValue, attrs: &mut HashMap<String, Value>) {
    let Some(glue) = props.get("TableReference").and_then(|r| r.get("Glue")) else {
        return;
    };
    let (Some(database), Some(table)) = (
        glue.get("DatabaseName").and_then(JsonValue::as_str),
        glue.get("TableName").and_then(JsonValue::as_str),
    ) else {
        return;
    };
    let mut reference = HashMap::new();
    reference.insert(
        "database_name".to_string(),
        Value::String(database.to_string()),
    );
    reference.insert("table_name".to_string(), Value::String(table.to_string()));
    attrs.insert("table_reference".to_string(), Value::Map(reference));
}

#[cfg(test)]
mod tests {
    use vela_core::diff::ChangeSet;
    use vela_core::mapping;
    use vela_core::resource::{Record, RemoteState, ResourceId};

    use super::*;

    fn table_reference_value(database: &str, table: &str) -> Value {
        let mut reference = HashMap::new();
        reference.insert(
            "database_name".to_string(),
            Value::String(database.to_string()),
        );
        reference.insert("table_name".to_string(), Value::String(table.to_string()));
        Value::Map(reference)
    }

    fn sample_record() -> Record {
        Record::new("cleanrooms_configured_table", "analytics")
            .with_attribute("name", Value::String("orders".to_string()))
            .with_attribute("analysis_method", Value::String("DIRECT_QUERY".to_string()))
            .with_attribute(
                "allowed_columns",
                Value::List(vec![
                    Value::String("order_id".to_string()),
                    Value::String("total".to_string()),
                ]),
            )
            .with_attribute("table_reference", table_reference_value("sales", "orders"))
    }

    #[test]
    fn schema_verifies() {
        assert!(configured_table().verify().is_ok());
    }

    #[test]
    fn validates_sample_record() {
        let schema = configured_table();
        assert!(schema.validate(&sample_record().attributes).is_ok());
    }

    #[test]
    fn analysis_method_accepts_direct_query_only() {
        let t = analysis_method();
        assert!(t.validate(&Value::String("DIRECT_QUERY".to_string())).is_ok());
        assert!(t.validate(&Value::String("MULTIPLE".to_string())).is_err());
        assert!(t.validate(&Value::Int(1)).is_err());
    }

    #[test]
    fn allowed_columns_enforces_bounds() {
        let t = allowed_columns();
        assert!(t.validate(&Value::List(vec![])).is_err());

        let one = Value::List(vec![Value::String("a".to_string())]);
        assert!(t.validate(&one).is_ok());

        let too_many = Value::List(vec![Value::String("c".to_string()); MAX_ALLOWED_COLUMNS + 1]);
        assert!(t.validate(&too_many).is_err());

        let mixed = Value::List(vec![Value::String("a".to_string()), Value::Int(1)]);
        assert!(t.validate(&mixed).is_err());
    }

    #[test]
    fn expand_nests_the_glue_reference() {
        let schema = configured_table();
        let props = mapping::expand(&schema, &sample_record().attributes);

        assert_eq!(props.get("Name"), Some(&json!("orders")));
        assert_eq!(
            props.get("TableReference"),
            Some(&json!({"Glue": {"DatabaseName": "sales", "TableName": "orders"}}))
        );
        assert!(!props.contains_key("table_reference"));
    }

    #[test]
    fn flatten_rebuilds_the_table_reference() {
        let schema = configured_table();
        let props = json!({
            "Name": "orders",
            "Id": "ct-1",
            "Arn": "arn:aws:cleanrooms:us-east-1:123456789012:configuredtable/ct-1",
            "TableReference": {"Glue": {"DatabaseName": "sales", "TableName": "orders"}}
        });

        let attrs = mapping::flatten(&schema, &props);
        assert_eq!(
            attrs.get("table_reference"),
            Some(&table_reference_value("sales", "orders"))
        );
        assert_eq!(attrs.get("id"), Some(&Value::String("ct-1".to_string())));
    }

    #[test]
    fn name_and_description_update_in_place_but_columns_force_replace() {
        let schema = configured_table();
        let mut desired = sample_record();
        desired
            .attributes
            .insert("description".to_string(), Value::String("v2".to_string()));
        desired.attributes.insert(
            "allowed_columns".to_string(),
            Value::List(vec![Value::String("order_id".to_string())]),
        );

        let previous = RemoteState::existing(
            ResourceId::new("cleanrooms_configured_table", "analytics"),
            sample_record().attributes,
        )
        .with_identifier("ct-1");

        let cs = ChangeSet::compute(&schema, &desired, &previous);
        assert_eq!(cs.changed, vec!["description".to_string()]);
        assert_eq!(cs.replaced, vec!["allowed_columns".to_string()]);
        assert!(cs.requires_replace());
    }
}
