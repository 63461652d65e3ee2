//! Resource schemas and the field-name correspondence table
//!
//! Each resource type declares its attributes once: type, required/computed
//! flags, whether a change forces replacement, and how the attribute maps to
//! the remote property document. A mapping either copies the value under a
//! remote property name or marks it intentionally absent (`Ignored`).

use std::collections::HashMap;

use serde_json::Value as JsonValue;

use crate::resource::Value;

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    String,
    Int,
    Bool,
    /// Enum over a fixed set of string values
    Enum(Vec<String>),
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    List(Box<AttributeType>),
    Map(Box<AttributeType>),
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { validate, .. }, v) => {
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
        }
    }
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
        }
    }
}

/// Attribute-level validation error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("attribute '{name}' is computed and cannot be set")]
    ComputedSet { name: String },

    #[error("list item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

/// How an attribute corresponds to the remote property document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mapping {
    /// Copied to/from the remote document under this property name
    Remote(String),
    /// Intentionally absent from one side; handled elsewhere or not at all
    /// (tags, separately-normalized timestamps, nested shapes with hooks)
    Ignored,
}

/// Schema for a single attribute
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    /// Must be present in the record before any remote call
    pub required: bool,
    /// Server-assigned; never accepted from user input, always overwritten on read
    pub computed: bool,
    /// A change to this attribute cannot be applied in place and forces
    /// destroy-then-recreate
    pub force_new: bool,
    /// Externally-reconciled metadata (tags); excluded from diff and mapping
    pub tag_metadata: bool,
    pub mapping: Mapping,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            computed: false,
            force_new: false,
            tag_metadata: false,
            mapping: Mapping::Ignored,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn tags(mut self) -> Self {
        self.tag_metadata = true;
        self
    }

    /// Map to/from the remote property with the given name
    pub fn remote(mut self, name: impl Into<String>) -> Self {
        self.mapping = Mapping::Remote(name.into());
        self
    }
}

/// Where the stable identifier of a resource instance comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierSource {
    /// A user-supplied attribute doubles as the identifier (e.g. a tenant
    /// is addressed by its `tenant_name`)
    Attribute(String),
    /// Server-generated, read from this remote property after create (e.g.
    /// a configured table's `Id`)
    RemoteField(String),
}

/// Hook to adjust the outgoing property document after standard expansion
pub type ExpandHook = fn(&HashMap<String, Value>, &mut serde_json::Map<String, JsonValue>);

/// Hook to adjust flattened attributes after standard flattening
pub type FlattenHook = fn(&JsonValue, &mut HashMap<String, Value>);

/// Schema for one resource type
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    /// Local resource type (e.g., "ses_tenant")
    pub resource_type: String,
    /// Remote API type name (e.g., "AWS::SES::Tenant")
    pub type_name: String,
    pub identifier: IdentifierSource,
    pub attributes: HashMap<String, AttributeSchema>,
    /// Adjusts the create request beyond the declarative mapping
    pub expand_hook: Option<ExpandHook>,
    /// Adjusts flattened attributes beyond the declarative mapping
    pub flatten_hook: Option<FlattenHook>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            type_name: type_name.into(),
            identifier: IdentifierSource::RemoteField("Id".to_string()),
            attributes: HashMap::new(),
            expand_hook: None,
            flatten_hook: None,
        }
    }

    pub fn identifier(mut self, source: IdentifierSource) -> Self {
        self.identifier = source;
        self
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_expand_hook(mut self, hook: ExpandHook) -> Self {
        self.expand_hook = Some(hook);
        self
    }

    pub fn with_flatten_hook(mut self, hook: FlattenHook) -> Self {
        self.flatten_hook = Some(hook);
        self
    }

    /// Validate user-supplied attributes against this schema
    ///
    /// Runs before any remote call; a failure here guarantees no remote side
    /// effect occurred.
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();

        for (name, schema) in &self.attributes {
            if schema.required && !schema.computed && !attributes.contains_key(name) {
                errors.push(TypeError::MissingRequired { name: name.clone() });
            }
        }

        for (name, value) in attributes {
            if let Some(schema) = self.attributes.get(name) {
                if schema.computed {
                    errors.push(TypeError::ComputedSet { name: name.clone() });
                } else if let Err(e) = schema.attr_type.validate(value) {
                    errors.push(e);
                }
            }
            // Unknown attributes are allowed; the engine may carry metadata
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Verify the schema itself is well-formed
    ///
    /// A required input with no remote mapping and no hook can never reach
    /// the wire; that is a configuration error caught here, not at runtime.
    pub fn verify(&self) -> Result<(), String> {
        for (name, schema) in &self.attributes {
            if schema.required
                && !schema.computed
                && schema.mapping == Mapping::Ignored
                && !schema.tag_metadata
                && self.expand_hook.is_none()
            {
                return Err(format!(
                    "required attribute '{}' of {} has no remote mapping",
                    name, self.resource_type
                ));
            }
        }

        if let IdentifierSource::Attribute(attr) = &self.identifier
            && !self.attributes.contains_key(attr)
        {
            return Err(format!(
                "identifier attribute '{}' is not declared on {}",
                attr, self.resource_type
            ));
        }

        Ok(())
    }

    /// Attributes that are computed by the server
    pub fn computed_attributes(&self) -> impl Iterator<Item = &AttributeSchema> {
        self.attributes.values().filter(|a| a.computed)
    }
}
