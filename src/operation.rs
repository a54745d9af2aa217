use crate::acl::PermissionDescriptor;
use crate::annotations::{Annotation, ParamLocation, PayloadWrapper, ResponseAnnotation};
use crate::router::{MiddlewareKind, RouteEntry};
use crate::schema::Schema;
use crate::spec::{MediaType, Operation, Parameter, RequestBody, Response, SecurityRequirement};
use crate::synthesizer::SchemaSynthesizer;
use std::collections::BTreeMap;

pub const PROBLEM_DETAILS_SCHEMA: &str = "ProblemDetails";
pub const PAGINATION_META_SCHEMA: &str = "PaginationMeta";
pub const BEARER_AUTH_SCHEME: &str = "BearerAuth";

const PROBLEM_JSON: &str = "application/problem+json";
const JSON: &str = "application/json";

/// Builds one operation object from a discovered route, its parsed
/// annotation (if the handler resolved and was documented), and the
/// extracted access-control requirements.
pub struct OperationBuilder;

impl OperationBuilder {
    pub fn build(
        route: &RouteEntry,
        annotation: Option<&Annotation>,
        synthesizer: &mut SchemaSynthesizer,
        permissions: &[PermissionDescriptor],
    ) -> Operation {
        let mut operation = Operation {
            operation_id: Some(operation_id(&route.method, &route.pattern)),
            ..Default::default()
        };

        if let Some(annotation) = annotation {
            operation.summary = annotation.summary.clone();
            operation.description = annotation.description.clone();
            operation.tags = annotation.tags.clone();
        }
        if operation.tags.is_empty() {
            if let Some(tag) = default_tag(&route.pattern) {
                operation.tags.push(tag);
            }
        }

        operation.parameters = build_parameters(route, annotation, synthesizer);
        operation.request_body = build_request_body(route, annotation, synthesizer);
        operation.responses = build_responses(annotation, synthesizer);
        operation.security = build_security(route, annotation);

        if !permissions.is_empty() {
            let narrative = acl_narrative(permissions);
            operation.description = Some(match operation.description.take() {
                Some(existing) => format!("{}\n\n{}", existing, narrative),
                None => narrative,
            });
        }

        operation
    }
}

/// Deterministic operation identifier: lowercase method plus capitalized
/// path segments, template placeholders rendered as `By<Name>` so sibling
/// routes like `/foo` and `/foo/{id}` never collide.
fn operation_id(method: &str, pattern: &str) -> String {
    let mut id = method.to_lowercase();
    for segment in pattern.split('/') {
        if segment.is_empty() {
            continue;
        }
        if let Some(name) = template_name(segment) {
            id.push_str("By");
            id.push_str(&capitalize(name));
        } else {
            id.push_str(&capitalize(segment));
        }
    }
    id
}

fn template_name(segment: &str) -> Option<&str> {
    segment.strip_prefix('{')?.strip_suffix('}')
}

fn capitalize(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    let mut chars = cleaned.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Default tag: first meaningful path segment, skipping `api` and version
/// segments.
fn default_tag(pattern: &str) -> Option<String> {
    pattern
        .split('/')
        .find(|s| {
            !s.is_empty()
                && !s.starts_with('{')
                && !s.eq_ignore_ascii_case("api")
                && !is_version_segment(s)
        })
        .map(|s| s.to_string())
}

fn is_version_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    matches!(chars.next(), Some('v') | Some('V')) && chars.all(|c| c.is_ascii_digit())
}

/// Path-template parameters first (required, string-typed), then upserted
/// with annotation-declared parameters.
fn build_parameters(
    route: &RouteEntry,
    annotation: Option<&Annotation>,
    synthesizer: &mut SchemaSynthesizer,
) -> Vec<Parameter> {
    let mut parameters: Vec<Parameter> = route
        .pattern
        .split('/')
        .filter_map(template_name)
        .map(|name| Parameter {
            name: name.to_string(),
            location: "path".to_string(),
            description: None,
            required: true,
            schema: Schema::primitive("string"),
        })
        .collect();

    if let Some(annotation) = annotation {
        for declared in &annotation.params {
            if declared.location == ParamLocation::Body {
                continue; // handled by the request body
            }
            let schema = param_schema(&declared.type_name, synthesizer);
            let location = declared.location.as_str().to_string();

            if let Some(existing) = parameters
                .iter_mut()
                .find(|p| p.name == declared.name && p.location == location)
            {
                existing.description = declared.description.clone();
                existing.schema = schema;
                // path parameters stay required regardless of the directive
                if existing.location != "path" {
                    existing.required = declared.required;
                }
            } else {
                parameters.push(Parameter {
                    name: declared.name.clone(),
                    location,
                    description: declared.description.clone(),
                    required: declared.required,
                    schema,
                });
            }
        }
    }

    parameters
}

/// Maps a directive type token to a schema: shorthand primitives first,
/// indexed model names second.
fn param_schema(type_name: &str, synthesizer: &mut SchemaSynthesizer) -> Schema {
    match type_name {
        "string" => Schema::primitive("string"),
        "int" | "integer" => Schema::primitive_with_format("integer", "int32"),
        "number" => Schema::primitive("number"),
        "bool" | "boolean" => Schema::primitive("boolean"),
        other => synthesizer.schema_for_name(other),
    }
}

fn build_request_body(
    route: &RouteEntry,
    annotation: Option<&Annotation>,
    synthesizer: &mut SchemaSynthesizer,
) -> Option<RequestBody> {
    if !matches!(route.method.as_str(), "POST" | "PUT" | "PATCH") {
        return None;
    }

    let declared = annotation.and_then(|a| {
        a.params
            .iter()
            .find(|p| p.location == ParamLocation::Body)
    });
    let media = annotation
        .and_then(|a| a.accept.clone())
        .unwrap_or_else(|| JSON.to_string());

    let (schema, description, required) = match declared {
        Some(param) => (
            synthesizer.schema_for_name(&param.type_name),
            param.description.clone(),
            param.required,
        ),
        None => (Schema::object(), None, true),
    };

    let mut content = BTreeMap::new();
    content.insert(media, MediaType { schema });
    Some(RequestBody {
        description,
        required,
        content,
    })
}

fn build_responses(
    annotation: Option<&Annotation>,
    synthesizer: &mut SchemaSynthesizer,
) -> BTreeMap<String, Response> {
    let mut responses = BTreeMap::new();

    let produce = annotation
        .and_then(|a| a.produce.clone())
        .unwrap_or_else(|| JSON.to_string());

    if let Some(annotation) = annotation {
        for declared in &annotation.responses {
            let response = if declared.success {
                success_response(declared, &produce, synthesizer)
            } else {
                failure_response(declared, synthesizer)
            };
            responses.insert(declared.code.to_string(), response);
        }
    }

    // default success when none is documented
    if !responses.keys().any(|code| code.starts_with('2')) {
        let mut content = BTreeMap::new();
        content.insert(
            "application/json".to_string(),
            MediaType {
                schema: Schema::object(),
            },
        );
        responses.insert(
            "200".to_string(),
            Response {
                description: "Successful response".to_string(),
                content,
            },
        );
    }

    // standard problem responses, never overriding documented ones
    for (code, description) in [
        ("400", "Bad Request"),
        ("401", "Unauthorized"),
        ("403", "Forbidden"),
        ("404", "Not Found"),
        ("500", "Internal Server Error"),
    ] {
        responses
            .entry(code.to_string())
            .or_insert_with(|| problem_response(description));
    }

    responses
}

/// A documented success response. Payload markers wrap the declared type in
/// the standard envelope: `message` plus `data`, and a `meta` pagination
/// block for array payloads.
fn success_response(
    declared: &ResponseAnnotation,
    produce: &str,
    synthesizer: &mut SchemaSynthesizer,
) -> Response {
    let description = declared
        .description
        .clone()
        .unwrap_or_else(|| "Success".to_string());

    let schema = match (&declared.wrapper, &declared.type_name) {
        (Some(wrapper), Some(type_name)) => {
            let payload = synthesizer.schema_for_name(type_name);
            Some(envelope(payload, *wrapper))
        }
        (None, Some(type_name)) => Some(synthesizer.schema_for_name(type_name)),
        _ => None,
    };

    let mut content = BTreeMap::new();
    if let Some(schema) = schema {
        content.insert(produce.to_string(), MediaType { schema });
    }
    Response {
        description,
        content,
    }
}

fn envelope(payload: Schema, wrapper: PayloadWrapper) -> Schema {
    let mut body = Schema::object();
    body.properties
        .insert("message".to_string(), Schema::primitive("string"));
    body.required.push("message".to_string());

    match wrapper {
        PayloadWrapper::Object => {
            body.properties.insert("data".to_string(), payload);
        }
        PayloadWrapper::Array => {
            body.properties
                .insert("data".to_string(), Schema::array(payload));
            body.properties.insert(
                "meta".to_string(),
                Schema::reference(PAGINATION_META_SCHEMA),
            );
        }
    }
    body
}

fn failure_response(
    declared: &ResponseAnnotation,
    synthesizer: &mut SchemaSynthesizer,
) -> Response {
    let description = declared
        .description
        .clone()
        .unwrap_or_else(|| "Error".to_string());

    let schema = match &declared.type_name {
        Some(type_name) if type_name != PROBLEM_DETAILS_SCHEMA => {
            synthesizer.schema_for_name(type_name)
        }
        _ => Schema::reference(PROBLEM_DETAILS_SCHEMA),
    };

    let mut content = BTreeMap::new();
    content.insert(PROBLEM_JSON.to_string(), MediaType { schema });
    Response {
        description,
        content,
    }
}

fn problem_response(description: &str) -> Response {
    let mut content = BTreeMap::new();
    content.insert(
        PROBLEM_JSON.to_string(),
        MediaType {
            schema: Schema::reference(PROBLEM_DETAILS_SCHEMA),
        },
    );
    Response {
        description: description.to_string(),
        content,
    }
}

fn build_security(route: &RouteEntry, annotation: Option<&Annotation>) -> Vec<SecurityRequirement> {
    let mut security: Vec<SecurityRequirement> = Vec::new();

    if let Some(annotation) = annotation {
        for scheme in &annotation.security {
            let mut requirement = SecurityRequirement::new();
            requirement.insert(scheme.clone(), Vec::new());
            if !security.contains(&requirement) {
                security.push(requirement);
            }
        }
    }

    let authenticated = route
        .middlewares
        .iter()
        .any(|m| m.classify() == Some(MiddlewareKind::Authentication));
    if authenticated {
        let mut requirement = SecurityRequirement::new();
        requirement.insert(BEARER_AUTH_SCHEME.to_string(), Vec::new());
        if !security.contains(&requirement) {
            security.push(requirement);
        }
    }

    security
}

fn acl_narrative(permissions: &[PermissionDescriptor]) -> String {
    let mut narrative = String::from("Access control:");
    for permission in permissions {
        narrative.push_str("\n- ");
        narrative.push_str(&permission.to_string());
    }
    narrative
}
