//! Field mapping between records and remote property documents
//!
//! Expansion (record -> create request) and flattening (remote response ->
//! attributes) both walk the schema's correspondence table. Unmapped remote
//! properties are silently dropped; attributes without a remote mapping are
//! left to the schema's hooks or to external collaborators.

use std::collections::HashMap;

use serde_json::{Value as JsonValue, json};

use crate::resource::Value;
use crate::schema::{Mapping, ResourceSchema};

/// Build a remote property document from user-supplied attributes
///
/// Computed attributes never appear in a request; ignored and tag attributes
/// are skipped. The schema's expand hook runs last and may add shapes the
/// declarative table cannot express.
pub fn expand(
    schema: &ResourceSchema,
    attributes: &HashMap<String, Value>,
) -> serde_json::Map<String, JsonValue> {
    let mut props = serde_json::Map::new();

    for (name, attr) in &schema.attributes {
        if attr.computed || attr.tag_metadata {
            continue;
        }
        if let Mapping::Remote(remote_name) = &attr.mapping
            && let Some(value) = attributes.get(name)
            && let Some(json) = value_to_json(value)
        {
            props.insert(remote_name.clone(), json);
        }
    }

    if let Some(hook) = schema.expand_hook {
        hook(attributes, &mut props);
    }

    props
}

/// Flatten a remote property document into local attributes
///
/// Returns a fresh map; callers merge it in one step so a record is never
/// left partially populated. Every mapped attribute found remotely is set,
/// computed or not; remote properties with no mapping are dropped.
pub fn flatten(schema: &ResourceSchema, props: &JsonValue) -> HashMap<String, Value> {
    let mut attributes = HashMap::new();

    for (name, attr) in &schema.attributes {
        if attr.tag_metadata {
            continue;
        }
        if let Mapping::Remote(remote_name) = &attr.mapping
            && let Some(value) = props.get(remote_name.as_str())
            && let Some(local) = json_to_value(value)
        {
            attributes.insert(name.clone(), local);
        }
    }

    if let Some(hook) = schema.flatten_hook {
        hook(props, &mut attributes);
    }

    attributes
}

/// Convert an attribute value to its JSON wire form
pub fn value_to_json(value: &Value) -> Option<JsonValue> {
    match value {
        Value::String(s) => Some(json!(s)),
        Value::Bool(b) => Some(json!(b)),
        Value::Int(i) => Some(json!(i)),
        Value::List(items) => {
            let arr: Vec<JsonValue> = items.iter().filter_map(value_to_json).collect();
            Some(JsonValue::Array(arr))
        }
        Value::Map(map) => {
            let mut obj = serde_json::Map::new();
            for (k, v) in map {
                if let Some(json) = value_to_json(v) {
                    obj.insert(k.clone(), json);
                }
            }
            Some(JsonValue::Object(obj))
        }
    }
}

/// Convert a JSON wire value to an attribute value
pub fn json_to_value(value: &JsonValue) -> Option<Value> {
    match value {
        JsonValue::String(s) => Some(Value::String(s.clone())),
        JsonValue::Bool(b) => Some(Value::Bool(*b)),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Value::Int(i))
            } else {
                n.as_f64().map(|f| Value::Int(f as i64))
            }
        }
        JsonValue::Array(arr) => {
            let items: Vec<Value> = arr.iter().filter_map(json_to_value).collect();
            Some(Value::List(items))
        }
        JsonValue::Object(obj) => {
            let mut map = HashMap::new();
            for (k, v) in obj {
                if let Some(local) = json_to_value(v) {
                    map.insert(k.clone(), local);
                }
            }
            Some(Value::Map(map))
        }
        JsonValue::Null => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeSchema, AttributeType};

    fn schema() -> ResourceSchema {
        ResourceSchema::new("widget", "Test::Widget")
            .attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .required()
                    .remote("Name"),
            )
            .attribute(AttributeSchema::new("count", AttributeType::Int).remote("Count"))
            .attribute(
                AttributeSchema::new("id", AttributeType::String)
                    .computed()
                    .remote("Id"),
            )
            .attribute(
                AttributeSchema::new("tags", AttributeType::Map(Box::new(AttributeType::String)))
                    .tags(),
            )
    }

    #[test]
    fn expand_renames_and_skips_computed() {
        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::String("w1".to_string()));
        attrs.insert("count".to_string(), Value::Int(2));

        let props = expand(&schema(), &attrs);
        assert_eq!(props.get("Name"), Some(&json!("w1")));
        assert_eq!(props.get("Count"), Some(&json!(2)));
        assert!(!props.contains_key("Id"));
    }

    #[test]
    fn expand_skips_tags() {
        let mut tags = HashMap::new();
        tags.insert("env".to_string(), Value::String("test".to_string()));
        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::String("w1".to_string()));
        attrs.insert("tags".to_string(), Value::Map(tags));

        let props = expand(&schema(), &attrs);
        assert!(!props.contains_key("tags"));
        assert!(!props.contains_key("Tags"));
    }

    #[test]
    fn flatten_maps_known_and_drops_unknown() {
        let props = json!({
            "Name": "w1",
            "Count": 2,
            "Id": "w-123",
            "ServerOnlyField": "dropped"
        });

        let attrs = flatten(&schema(), &props);
        assert_eq!(attrs.get("name"), Some(&Value::String("w1".to_string())));
        assert_eq!(attrs.get("count"), Some(&Value::Int(2)));
        assert_eq!(attrs.get("id"), Some(&Value::String("w-123".to_string())));
        assert!(!attrs.contains_key("ServerOnlyField"));
        assert_eq!(attrs.len(), 3);
    }

    #[test]
    fn flatten_absent_properties_stay_absent() {
        let props = json!({"Name": "w1"});
        let attrs = flatten(&schema(), &props);
        assert!(!attrs.contains_key("count"));
        assert!(!attrs.contains_key("id"));
    }

    #[test]
    fn json_round_trip_for_nested_values() {
        let mut inner = HashMap::new();
        inner.insert("database_name".to_string(), Value::String("db".to_string()));
        let value = Value::Map(inner);

        let json = value_to_json(&value).unwrap();
        assert_eq!(json, json!({"database_name": "db"}));
        assert_eq!(json_to_value(&json), Some(value));
    }

    #[test]
    fn null_converts_to_nothing() {
        assert_eq!(json_to_value(&JsonValue::Null), None);
    }
}
