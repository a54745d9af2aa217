use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The `type` keyword of a schema: either a single type name or a list of
/// type names (used for nullable primitives, e.g. `["string", "null"]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    One(String),
    Many(Vec<String>),
}

impl SchemaType {
    pub fn one(name: &str) -> Self {
        SchemaType::One(name.to_string())
    }

    pub fn nullable(name: &str) -> Self {
        SchemaType::Many(vec![name.to_string(), "null".to_string()])
    }
}

/// A JSON-Schema-shaped description of a type in the output document.
///
/// A node is one of: primitive (via `schema_type`), array (`items`), object
/// (`properties`/`additional_properties`), reference (`reference`), or a
/// union (`any_of`/`one_of`/`all_of`). Reference nodes must not carry
/// sibling constraint keys; only `description` and `examples` are permitted
/// next to `$ref`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub properties: BTreeMap<String, Schema>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub required: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(
        rename = "additionalProperties",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<Box<Schema>>,
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(rename = "minLength", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(rename = "minItems", skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(rename = "maxItems", skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(rename = "uniqueItems", skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty", default)]
    pub enum_values: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub examples: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    #[serde(rename = "readOnly", skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(rename = "writeOnly", skip_serializing_if = "Option::is_none")]
    pub write_only: Option<bool>,

    #[serde(rename = "oneOf", skip_serializing_if = "Vec::is_empty", default)]
    pub one_of: Vec<Schema>,
    #[serde(rename = "anyOf", skip_serializing_if = "Vec::is_empty", default)]
    pub any_of: Vec<Schema>,
    #[serde(rename = "allOf", skip_serializing_if = "Vec::is_empty", default)]
    pub all_of: Vec<Schema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<Schema>>,
}

impl Schema {
    /// A primitive node with a single type name.
    pub fn primitive(type_name: &str) -> Self {
        Schema {
            schema_type: Some(SchemaType::one(type_name)),
            ..Default::default()
        }
    }

    /// A primitive node with a format tag.
    pub fn primitive_with_format(type_name: &str, format: &str) -> Self {
        Schema {
            schema_type: Some(SchemaType::one(type_name)),
            format: Some(format.to_string()),
            ..Default::default()
        }
    }

    /// A reference node pointing into the component schema store.
    pub fn reference(key: &str) -> Self {
        Schema {
            reference: Some(format!("#/components/schemas/{}", key)),
            ..Default::default()
        }
    }

    /// A bare object node.
    pub fn object() -> Self {
        Schema::primitive("object")
    }

    /// An array node with the given item schema.
    pub fn array(items: Schema) -> Self {
        Schema {
            schema_type: Some(SchemaType::one("array")),
            items: Some(Box::new(items)),
            ..Default::default()
        }
    }

    /// An anyOf composition.
    pub fn any_of(variants: Vec<Schema>) -> Self {
        Schema {
            any_of: variants,
            ..Default::default()
        }
    }

    /// A oneOf composition.
    pub fn one_of(variants: Vec<Schema>) -> Self {
        Schema {
            one_of: variants,
            ..Default::default()
        }
    }

    /// An allOf composition.
    pub fn all_of(members: Vec<Schema>) -> Self {
        Schema {
            all_of: members,
            ..Default::default()
        }
    }

    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// True if the node's `type` keyword includes the given type name.
    pub fn has_type(&self, type_name: &str) -> bool {
        match &self.schema_type {
            None => false,
            Some(SchemaType::One(t)) => t == type_name,
            Some(SchemaType::Many(ts)) => ts.iter().any(|t| t == type_name),
        }
    }

    /// The first non-null type name, or the single type name.
    pub fn primary_type(&self) -> Option<&str> {
        match &self.schema_type {
            None => None,
            Some(SchemaType::One(t)) => Some(t),
            Some(SchemaType::Many(ts)) => ts
                .iter()
                .find(|t| *t != "null")
                .or_else(|| ts.first())
                .map(|t| t.as_str()),
        }
    }
}
