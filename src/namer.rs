use crate::index::QualifiedName;
use crate::schema::Schema;
use crate::spec::{Operation, PathItem, Spec};
use log::debug;
use std::collections::BTreeMap;

/// Strategy producing the public component name for a qualified type:
/// `(namespace, simple name) -> name`.
pub type ModelNameFn = dyn Fn(&str, &str) -> String;

/// Default strategy: last module segment plus the simple name, e.g.
/// `handlers::models` + `User` -> `models.User`.
pub fn default_model_name(namespace: &str, name: &str) -> String {
    match namespace.rsplit("::").next().filter(|s| !s.is_empty()) {
        Some(module) => format!("{}.{}", module, name),
        None => name.to_string(),
    }
}

/// Final naming pass over a complete document.
///
/// Takes the synthesized component store (keyed by canonical qualified
/// names), assigns each schema its public name, and rewrites every `$ref`
/// in the document to match. Runs exactly once, after all operations are
/// built.
pub struct ModelNamer {
    strategy: Box<ModelNameFn>,
}

impl Default for ModelNamer {
    fn default() -> Self {
        ModelNamer::new()
    }
}

impl ModelNamer {
    pub fn new() -> Self {
        ModelNamer {
            strategy: Box::new(default_model_name),
        }
    }

    pub fn with_strategy(strategy: Box<ModelNameFn>) -> Self {
        ModelNamer { strategy }
    }

    /// Names every schema in `store`, merges them into the document's
    /// components, and rewrites all references.
    ///
    /// Keys are processed in canonical sorted order; a name collision gets
    /// a numeric suffix (2, 3, ...), so the outcome is identical on every
    /// run. Names already present in the document (pre-seeded standard
    /// schemas) are never displaced.
    pub fn finalize(&self, spec: &mut Spec, store: BTreeMap<String, Schema>) {
        let mut used: Vec<String> = spec.components.schemas.keys().cloned().collect();
        let mut rename: BTreeMap<String, String> = BTreeMap::new();

        // BTreeMap iteration gives canonical sorted order
        for canonical in store.keys() {
            let (namespace, name) = QualifiedName::split(canonical);
            let base = (self.strategy)(&namespace, &name);

            let mut public = base.clone();
            let mut suffix = 2u32;
            while used.contains(&public) {
                public = format!("{}{}", base, suffix);
                suffix += 1;
            }
            if public != base {
                debug!("Model name collision: {} -> {}", canonical, public);
            }
            used.push(public.clone());
            rename.insert(
                format!("#/components/schemas/{}", canonical),
                format!("#/components/schemas/{}", public),
            );
        }

        for (canonical, mut schema) in store {
            rewrite_schema(&mut schema, &rename);
            let public = rename
                .get(&format!("#/components/schemas/{}", canonical))
                .and_then(|target| target.rsplit('/').next())
                .unwrap_or(&canonical)
                .to_string();
            spec.components.schemas.insert(public, schema);
        }

        // pre-seeded component schemas may reference renamed types too
        for schema in spec.components.schemas.values_mut() {
            rewrite_schema(schema, &rename);
        }
        for response in spec.components.responses.values_mut() {
            for media in response.content.values_mut() {
                rewrite_schema(&mut media.schema, &rename);
            }
        }
        for parameter in spec.components.parameters.values_mut() {
            rewrite_schema(&mut parameter.schema, &rename);
        }
        for item in spec.paths.values_mut() {
            rewrite_path_item(item, &rename);
        }
        for item in spec.webhooks.values_mut() {
            rewrite_path_item(item, &rename);
        }
    }
}

fn rewrite_path_item(item: &mut PathItem, rename: &BTreeMap<String, String>) {
    for parameter in &mut item.parameters {
        rewrite_schema(&mut parameter.schema, rename);
    }
    for operation in item.operations_mut() {
        rewrite_operation(operation, rename);
    }
}

fn rewrite_operation(operation: &mut Operation, rename: &BTreeMap<String, String>) {
    for parameter in &mut operation.parameters {
        rewrite_schema(&mut parameter.schema, rename);
    }
    if let Some(body) = &mut operation.request_body {
        for media in body.content.values_mut() {
            rewrite_schema(&mut media.schema, rename);
        }
    }
    for response in operation.responses.values_mut() {
        for media in response.content.values_mut() {
            rewrite_schema(&mut media.schema, rename);
        }
    }
    for callback in operation.callbacks.values_mut() {
        for item in callback.values_mut() {
            rewrite_path_item(item, rename);
        }
    }
}

/// Recursively rewrites `$ref` targets through every nesting position a
/// schema can carry one.
fn rewrite_schema(schema: &mut Schema, rename: &BTreeMap<String, String>) {
    if let Some(reference) = &schema.reference {
        if let Some(target) = rename.get(reference) {
            schema.reference = Some(target.clone());
        }
    }
    for nested in schema.properties.values_mut() {
        rewrite_schema(nested, rename);
    }
    if let Some(items) = &mut schema.items {
        rewrite_schema(items, rename);
    }
    if let Some(additional) = &mut schema.additional_properties {
        rewrite_schema(additional, rename);
    }
    if let Some(not) = &mut schema.not {
        rewrite_schema(not, rename);
    }
    for nested in schema
        .one_of
        .iter_mut()
        .chain(schema.any_of.iter_mut())
        .chain(schema.all_of.iter_mut())
    {
        rewrite_schema(nested, rename);
    }
}
