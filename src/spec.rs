use crate::schema::Schema;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One security requirement: scheme name to required scopes.
pub type SecurityRequirement = BTreeMap<String, Vec<String>>;

/// Document metadata supplied by the caller.
///
/// `title` and `version` are required by the output format; a missing value
/// is logged and replaced with a placeholder so generation still completes.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub title: String,
    pub version: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub terms_of_service: Option<String>,
    pub contact: Option<Contact>,
    pub license: Option<License>,
    pub servers: Vec<Server>,
}

impl Config {
    pub fn new(title: &str, version: &str) -> Self {
        Config {
            title: title.to_string(),
            version: version.to_string(),
            ..Default::default()
        }
    }

    /// Builds the `info` object, warning on missing required fields.
    pub fn info(&self) -> Info {
        let mut title = self.title.clone();
        if title.is_empty() {
            warn!("Config has no title; using placeholder");
            title = "Untitled API".to_string();
        }
        let mut version = self.version.clone();
        if version.is_empty() {
            warn!("Config has no version; using placeholder");
            version = "0.0.0".to_string();
        }
        Info {
            title,
            version,
            summary: self.summary.clone(),
            description: self.description.clone(),
            terms_of_service: self.terms_of_service.clone(),
            contact: self.contact.clone(),
            license: self.license.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "termsOfService", skip_serializing_if = "Option::is_none")]
    pub terms_of_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    pub schema: Schema,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    pub schema: Schema,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    pub content: BTreeMap<String, MediaType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub description: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub content: BTreeMap<String, MediaType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "operationId", skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub parameters: Vec<Parameter>,
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: BTreeMap<String, Response>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub security: Vec<SecurityRequirement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub callbacks: BTreeMap<String, BTreeMap<String, PathItem>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Operation>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub parameters: Vec<Parameter>,
}

impl PathItem {
    /// Mutable slot for an HTTP method, or `None` for an unknown method.
    pub fn slot_mut(&mut self, method: &str) -> Option<&mut Option<Operation>> {
        match method.to_uppercase().as_str() {
            "GET" => Some(&mut self.get),
            "PUT" => Some(&mut self.put),
            "POST" => Some(&mut self.post),
            "DELETE" => Some(&mut self.delete),
            "OPTIONS" => Some(&mut self.options),
            "HEAD" => Some(&mut self.head),
            "PATCH" => Some(&mut self.patch),
            "TRACE" => Some(&mut self.trace),
            _ => None,
        }
    }

    /// All present operations, for document-wide rewriting passes.
    pub fn operations_mut(&mut self) -> Vec<&mut Operation> {
        [
            &mut self.get,
            &mut self.put,
            &mut self.post,
            &mut self.delete,
            &mut self.options,
            &mut self.head,
            &mut self.patch,
            &mut self.trace,
        ]
        .into_iter()
        .filter_map(|slot| slot.as_mut())
        .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityScheme {
    #[serde(rename = "type")]
    pub scheme_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(rename = "bearerFormat", skip_serializing_if = "Option::is_none")]
    pub bearer_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub schemas: BTreeMap<String, Schema>,
    #[serde(
        rename = "securitySchemes",
        skip_serializing_if = "BTreeMap::is_empty",
        default
    )]
    pub security_schemes: BTreeMap<String, SecurityScheme>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub responses: BTreeMap<String, Response>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub parameters: BTreeMap<String, Parameter>,
}

/// The output document.
///
/// Every collection member is a `BTreeMap` or explicitly sorted, so a given
/// router and source tree serialize byte-identically on every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spec {
    pub openapi: String,
    #[serde(rename = "jsonSchemaDialect")]
    pub json_schema_dialect: String,
    pub info: Info,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub servers: Vec<Server>,
    pub paths: BTreeMap<String, PathItem>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub webhooks: BTreeMap<String, PathItem>,
    pub components: Components,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub security: Vec<SecurityRequirement>,
}

impl Spec {
    pub fn new(info: Info) -> Self {
        Spec {
            openapi: "3.1.0".to_string(),
            json_schema_dialect: "https://json-schema.org/draft/2020-12/schema".to_string(),
            info,
            servers: Vec::new(),
            paths: BTreeMap::new(),
            webhooks: BTreeMap::new(),
            components: Components::default(),
            tags: Vec::new(),
            security: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_spec_serializes_required_top_level_keys() {
        let spec = Spec::new(Config::new("Demo", "1.0.0").info());
        let json = serde_json::to_value(&spec).unwrap();

        assert_eq!(json["openapi"], "3.1.0");
        assert_eq!(
            json["jsonSchemaDialect"],
            "https://json-schema.org/draft/2020-12/schema"
        );
        assert_eq!(json["info"]["title"], "Demo");
        assert_eq!(json["info"]["version"], "1.0.0");
        // empty optional collections stay absent
        assert!(json.get("servers").is_none());
        assert!(json.get("webhooks").is_none());
        assert!(json.get("tags").is_none());
    }

    #[test]
    fn test_missing_title_and_version_get_placeholders() {
        let info = Config::default().info();
        assert_eq!(info.title, "Untitled API");
        assert_eq!(info.version, "0.0.0");
    }

    #[test]
    fn test_paths_serialize_sorted() {
        let mut spec = Spec::new(Config::new("Demo", "1.0.0").info());
        spec.paths.insert("/zebra".into(), PathItem::default());
        spec.paths.insert("/alpha".into(), PathItem::default());

        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.find("/alpha").unwrap() < json.find("/zebra").unwrap());
    }

    #[test]
    fn test_path_item_slot_lookup() {
        let mut item = PathItem::default();
        *item.slot_mut("get").unwrap() = Some(Operation::default());
        assert!(item.get.is_some());
        assert!(item.slot_mut("CONNECT").is_none());
        assert_eq!(item.operations_mut().len(), 1);
    }

    #[test]
    fn test_parameter_in_keyword() {
        let param = Parameter {
            name: "id".into(),
            location: "path".into(),
            required: true,
            schema: Schema::primitive("string"),
            description: None,
        };
        let json = serde_json::to_value(&param).unwrap();
        assert_eq!(json["in"], "path");
        assert_eq!(json["required"], true);
    }
}
