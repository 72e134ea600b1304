//! Declarative schema descriptions and their JSON Schema translation.
//!
//! A [`SchemaNode`] tree is authored by hand for each AI-backed feature and
//! handed to [`translate`], which produces the [`JsonSchema`] document sent
//! to the generation service to constrain the model's output.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Errors raised for schema trees that cannot be translated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaDefinitionError {
    /// An optional marker outside of an object's field list
    #[error("optional node at {path} is not a direct object field")]
    MisplacedOptional { path: String },

    /// Enum without any allowed value
    #[error("enum at {path} has no values")]
    EmptyEnum { path: String },

    /// Enum listing the same value twice
    #[error("enum at {path} repeats value {value:?}")]
    DuplicateEnumValue { path: String, value: String },

    /// Lower bound above upper bound, or a non-finite bound
    #[error("invalid bounds at {path}: {reason}")]
    InvalidBounds { path: String, reason: String },

    /// Object field with a blank name
    #[error("object at {path} has a field with an empty name")]
    EmptyFieldName { path: String },
}

/// One node of a declarative schema description.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    String {
        description: Option<String>,
    },
    Number {
        min: Option<f64>,
        max: Option<f64>,
        description: Option<String>,
    },
    Boolean {
        description: Option<String>,
    },
    Enum {
        values: Vec<String>,
        description: Option<String>,
    },
    /// Item-count bounds are kept as given and must be whole, non-negative numbers.
    Array {
        items: Box<SchemaNode>,
        min_items: Option<f64>,
        max_items: Option<f64>,
        description: Option<String>,
    },
    Object {
        fields: BTreeMap<String, SchemaNode>,
        description: Option<String>,
    },
    /// Marks an object field as not required. Only valid as a field value.
    Optional(Box<SchemaNode>),
    /// A kind with no JSON Schema rendering. Translated as a string.
    Other {
        kind: String,
        description: Option<String>,
    },
}

impl SchemaNode {
    pub fn string() -> Self {
        SchemaNode::String { description: None }
    }

    pub fn number() -> Self {
        SchemaNode::Number {
            min: None,
            max: None,
            description: None,
        }
    }

    pub fn boolean() -> Self {
        SchemaNode::Boolean { description: None }
    }

    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SchemaNode::Enum {
            values: values.into_iter().map(Into::into).collect(),
            description: None,
        }
    }

    pub fn array(items: SchemaNode) -> Self {
        SchemaNode::Array {
            items: Box::new(items),
            min_items: None,
            max_items: None,
            description: None,
        }
    }

    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, SchemaNode)>,
        K: Into<String>,
    {
        SchemaNode::Object {
            fields: fields
                .into_iter()
                .map(|(name, node)| (name.into(), node))
                .collect(),
            description: None,
        }
    }

    pub fn other(kind: impl Into<String>) -> Self {
        SchemaNode::Other {
            kind: kind.into(),
            description: None,
        }
    }

    /// Wrap this node so the enclosing object does not require it.
    pub fn optional(self) -> Self {
        SchemaNode::Optional(Box::new(self))
    }

    /// Attach a description. On an optional node the wrapped node is described.
    pub fn describe(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        match &mut self {
            SchemaNode::Optional(inner) => {
                let described = std::mem::replace(inner.as_mut(), SchemaNode::string()).describe(text);
                **inner = described;
            }
            SchemaNode::String { description }
            | SchemaNode::Number { description, .. }
            | SchemaNode::Boolean { description }
            | SchemaNode::Enum { description, .. }
            | SchemaNode::Array { description, .. }
            | SchemaNode::Object { description, .. }
            | SchemaNode::Other { description, .. } => *description = Some(text),
        }
        self
    }

    /// Lower bound for numbers, minimum length for arrays. Ignored elsewhere.
    pub fn min(mut self, value: f64) -> Self {
        match &mut self {
            SchemaNode::Number { min, .. } => *min = Some(value),
            SchemaNode::Array { min_items, .. } => *min_items = Some(value),
            SchemaNode::Optional(inner) => {
                let bounded = std::mem::replace(inner.as_mut(), SchemaNode::string()).min(value);
                **inner = bounded;
            }
            _ => {}
        }
        self
    }

    /// Upper bound for numbers, maximum length for arrays. Ignored elsewhere.
    pub fn max(mut self, value: f64) -> Self {
        match &mut self {
            SchemaNode::Number { max, .. } => *max = Some(value),
            SchemaNode::Array { max_items, .. } => *max_items = Some(value),
            SchemaNode::Optional(inner) => {
                let bounded = std::mem::replace(inner.as_mut(), SchemaNode::string()).max(value);
                **inner = bounded;
            }
            _ => {}
        }
        self
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, SchemaNode::Optional(_))
    }

    /// Strip every optional layer.
    fn without_optional(&self) -> &SchemaNode {
        let mut node = self;
        while let SchemaNode::Optional(inner) = node {
            node = inner;
        }
        node
    }
}

/// JSON Schema `type` keyword values produced by the translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

/// Translated JSON Schema document. Keys that do not apply are omitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonSchema {
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, JsonSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<JsonSchema>>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl JsonSchema {
    fn of(schema_type: SchemaType, description: &Option<String>) -> Self {
        Self {
            schema_type,
            properties: None,
            required: None,
            items: None,
            enum_values: None,
            minimum: None,
            maximum: None,
            min_items: None,
            max_items: None,
            description: description.clone(),
        }
    }

    /// Render as a plain JSON value.
    pub fn to_value(&self) -> serde_json::Value {
        // Every field is a string, number, map or sequence.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Translate a schema description into a JSON Schema document.
///
/// The whole tree is checked before anything is rendered, so a malformed
/// tree yields an error and never a partial document. An optional wrapped
/// in another optional is flattened to a single optional field.
pub fn translate(node: &SchemaNode) -> Result<JsonSchema, SchemaDefinitionError> {
    validate(node, "$")?;
    Ok(render(node))
}

fn validate(node: &SchemaNode, path: &str) -> Result<(), SchemaDefinitionError> {
    match node {
        SchemaNode::String { .. } | SchemaNode::Boolean { .. } | SchemaNode::Other { .. } => Ok(()),
        SchemaNode::Number { min, max, .. } => {
            if [min, max].into_iter().flatten().any(|bound| !bound.is_finite()) {
                return Err(SchemaDefinitionError::InvalidBounds {
                    path: path.to_string(),
                    reason: "bounds must be finite".to_string(),
                });
            }
            match (min, max) {
                (Some(min), Some(max)) if min > max => Err(SchemaDefinitionError::InvalidBounds {
                    path: path.to_string(),
                    reason: format!("minimum {} exceeds maximum {}", min, max),
                }),
                _ => Ok(()),
            }
        }
        SchemaNode::Enum { values, .. } => {
            if values.is_empty() {
                return Err(SchemaDefinitionError::EmptyEnum {
                    path: path.to_string(),
                });
            }
            let mut seen = HashSet::new();
            for value in values {
                if !seen.insert(value.as_str()) {
                    return Err(SchemaDefinitionError::DuplicateEnumValue {
                        path: path.to_string(),
                        value: value.clone(),
                    });
                }
            }
            Ok(())
        }
        SchemaNode::Array {
            items,
            min_items,
            max_items,
            ..
        } => {
            for (name, bound) in [("minItems", min_items), ("maxItems", max_items)] {
                if let Some(bound) = bound {
                    if !bound.is_finite() || *bound < 0.0 || bound.fract() != 0.0 {
                        return Err(SchemaDefinitionError::InvalidBounds {
                            path: path.to_string(),
                            reason: format!("{} must be a whole number of items, got {}", name, bound),
                        });
                    }
                }
            }
            if let (Some(min), Some(max)) = (min_items, max_items) {
                if min > max {
                    return Err(SchemaDefinitionError::InvalidBounds {
                        path: path.to_string(),
                        reason: format!("minItems {} exceeds maxItems {}", min, max),
                    });
                }
            }
            validate(items, &format!("{}[]", path))
        }
        SchemaNode::Object { fields, .. } => {
            for (name, field) in fields {
                if name.trim().is_empty() {
                    return Err(SchemaDefinitionError::EmptyFieldName {
                        path: path.to_string(),
                    });
                }
                validate(field.without_optional(), &format!("{}.{}", path, name))?;
            }
            Ok(())
        }
        SchemaNode::Optional(_) => Err(SchemaDefinitionError::MisplacedOptional {
            path: path.to_string(),
        }),
    }
}

fn render(node: &SchemaNode) -> JsonSchema {
    match node {
        SchemaNode::String { description } => JsonSchema::of(SchemaType::String, description),
        SchemaNode::Number {
            min,
            max,
            description,
        } => JsonSchema {
            minimum: *min,
            maximum: *max,
            ..JsonSchema::of(SchemaType::Number, description)
        },
        SchemaNode::Boolean { description } => JsonSchema::of(SchemaType::Boolean, description),
        SchemaNode::Enum {
            values,
            description,
        } => JsonSchema {
            enum_values: Some(values.clone()),
            ..JsonSchema::of(SchemaType::String, description)
        },
        SchemaNode::Array {
            items,
            min_items,
            max_items,
            description,
        } => JsonSchema {
            items: Some(Box::new(render(items))),
            // Whole and non-negative after validation.
            min_items: min_items.map(|n| n as usize),
            max_items: max_items.map(|n| n as usize),
            ..JsonSchema::of(SchemaType::Array, description)
        },
        SchemaNode::Object {
            fields,
            description,
        } => {
            let mut schema = JsonSchema::of(SchemaType::Object, description);
            if !fields.is_empty() {
                schema.properties = Some(
                    fields
                        .iter()
                        .map(|(name, field)| (name.clone(), render(field)))
                        .collect(),
                );
                schema.required = Some(
                    fields
                        .iter()
                        .filter(|(_, field)| !field.is_optional())
                        .map(|(name, _)| name.clone())
                        .collect(),
                );
            }
            schema
        }
        SchemaNode::Optional(inner) => render(inner),
        SchemaNode::Other { kind, description } => {
            warn!(kind = %kind, "No JSON Schema rendering for schema node kind, using string");
            JsonSchema::of(SchemaType::String, description)
        }
    }
}
