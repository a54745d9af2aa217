use crate::acl::AclExtractor;
use crate::annotations::Annotation;
use crate::error::{Error, Result};
use crate::index::SourceIndex;
use crate::namer::{ModelNameFn, ModelNamer};
use crate::operation::{
    OperationBuilder, BEARER_AUTH_SCHEME, PAGINATION_META_SCHEMA, PROBLEM_DETAILS_SCHEMA,
};
use crate::resolver::{HandlerResolver, RouteContext};
use crate::router::{discover_routes, Router};
use crate::schema::Schema;
use crate::spec::{Config, SecurityScheme, Spec, Tag};
use crate::synthesizer::SchemaSynthesizer;
use log::{debug, warn};

/// Assembles the output document from a router snapshot and the source
/// index.
///
/// The synthesizer memo and naming strategy live on the instance, so
/// out-of-band schemas registered through [`Generator::schema_for`] appear
/// in the next generated document.
pub struct Generator<'a> {
    index: &'a SourceIndex,
    synthesizer: SchemaSynthesizer<'a>,
    namer: ModelNamer,
}

impl<'a> Generator<'a> {
    pub fn new(index: &'a SourceIndex) -> Self {
        Generator {
            index,
            synthesizer: SchemaSynthesizer::new(index),
            namer: ModelNamer::new(),
        }
    }

    /// Replaces the default model naming strategy.
    pub fn with_model_name_fn(mut self, strategy: Box<ModelNameFn>) -> Self {
        self.namer = ModelNamer::with_strategy(strategy);
        self
    }

    /// Synthesizes (and memoizes) a schema out of band; the component lands
    /// in the next generated document.
    pub fn schema_for(&mut self, type_name: &str) -> Schema {
        self.synthesizer.schema_for_name(type_name)
    }

    /// Generates the full document for the given router.
    ///
    /// Fails only when route discovery rejects the router; every later
    /// stage degrades per-route instead of failing.
    pub fn generate(&mut self, router: &Router, config: &Config) -> Result<Spec> {
        let routes = discover_routes(router).map_err(Error::from)?;
        debug!("Generating document for {} routes", routes.len());

        let mut spec = Spec::new(config.info());
        spec.servers = config.servers.clone();
        seed_components(&mut spec);

        let resolver = HandlerResolver::new(self.index);
        let extractor = AclExtractor::new(self.index);

        for route in &routes {
            let context = RouteContext::from_entry(route);
            let resolved = resolver.resolve(&route.handler, &context);
            if resolved.is_none() {
                debug!(
                    "Handler '{}' for {} {} unresolved; building undocumented operation",
                    route.handler, route.method, route.pattern
                );
            }

            let annotation = resolved.and_then(|decl| Annotation::parse(&decl.docs));
            let permissions = extractor.extract(resolved, route);
            let operation = OperationBuilder::build(
                route,
                annotation.as_ref(),
                &mut self.synthesizer,
                &permissions,
            );

            let item = spec.paths.entry(route.pattern.clone()).or_default();
            match item.slot_mut(&route.method) {
                Some(slot) => *slot = Some(operation),
                None => warn!(
                    "Skipping route with unsupported method: {} {}",
                    route.method, route.pattern
                ),
            }
        }

        spec.tags = collect_tags(&spec);
        self.namer
            .finalize(&mut spec, self.synthesizer.schemas().clone());

        Ok(spec)
    }
}

/// Seeds the security scheme and the standard schemas every document
/// carries.
fn seed_components(spec: &mut Spec) {
    spec.components.security_schemes.insert(
        BEARER_AUTH_SCHEME.to_string(),
        SecurityScheme {
            scheme_type: "http".to_string(),
            scheme: Some("bearer".to_string()),
            bearer_format: Some("JWT".to_string()),
            description: Some("JWT bearer token".to_string()),
        },
    );
    spec.components.schemas.insert(
        PROBLEM_DETAILS_SCHEMA.to_string(),
        problem_details_schema(),
    );
    spec.components.schemas.insert(
        PAGINATION_META_SCHEMA.to_string(),
        pagination_meta_schema(),
    );
}

/// RFC 7807 problem document.
fn problem_details_schema() -> Schema {
    let mut schema = Schema::object();
    schema.description = Some("Problem details for HTTP APIs (RFC 7807)".to_string());
    schema.properties.insert("type".to_string(), {
        let mut s = Schema::primitive_with_format("string", "uri");
        s.description = Some("URI identifying the problem type".to_string());
        s
    });
    schema
        .properties
        .insert("title".to_string(), Schema::primitive("string"));
    schema.properties.insert(
        "status".to_string(),
        Schema::primitive_with_format("integer", "int32"),
    );
    schema
        .properties
        .insert("detail".to_string(), Schema::primitive("string"));
    schema
        .properties
        .insert("instance".to_string(), Schema::primitive("string"));
    schema.required = vec!["status".to_string(), "title".to_string()];
    schema
}

fn pagination_meta_schema() -> Schema {
    let mut schema = Schema::object();
    schema.description = Some("Pagination block for list responses".to_string());
    schema.properties.insert(
        "page".to_string(),
        Schema::primitive_with_format("integer", "int32"),
    );
    schema.properties.insert(
        "page_size".to_string(),
        Schema::primitive_with_format("integer", "int32"),
    );
    schema.properties.insert(
        "total".to_string(),
        Schema::primitive_with_format("string", "int64"),
    );
    schema
}

/// Unique tag names across all operations, sorted.
fn collect_tags(spec: &Spec) -> Vec<Tag> {
    let mut names: Vec<String> = Vec::new();
    for item in spec.paths.values() {
        for operation in [
            &item.get,
            &item.put,
            &item.post,
            &item.delete,
            &item.options,
            &item.head,
            &item.patch,
            &item.trace,
        ]
        .into_iter()
        .flatten()
        {
            for tag in &operation.tags {
                if !names.contains(tag) {
                    names.push(tag.clone());
                }
            }
        }
    }
    names.sort();
    names
        .into_iter()
        .map(|name| Tag {
            name,
            description: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::HandlerId;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_generate_seeds_standard_components() {
        let index = SourceIndex::empty("demo");
        let mut generator = Generator::new(&index);
        let router = Router::new().route("get", "/menu", HandlerId::new("list"));

        let spec = generator
            .generate(&router, &Config::new("Demo", "1.0.0"))
            .unwrap();

        assert!(spec.components.schemas.contains_key("ProblemDetails"));
        assert!(spec.components.schemas.contains_key("PaginationMeta"));
        let scheme = &spec.components.security_schemes["BearerAuth"];
        assert_eq!(scheme.scheme_type, "http");
        assert_eq!(scheme.scheme.as_deref(), Some("bearer"));
    }

    #[test]
    fn test_generate_fails_on_invalid_router() {
        let index = SourceIndex::empty("demo");
        let mut generator = Generator::new(&index);
        let router = Router::new()
            .route("get", "/a", HandlerId::new("x"))
            .route("get", "/a", HandlerId::new("y"));

        let err = generator
            .generate(&router, &Config::new("Demo", "1.0.0"))
            .unwrap_err();
        assert!(matches!(err, Error::RouteDiscovery(ref e) if e.operation == "discover"));
    }

    #[test]
    fn test_tags_are_sorted_and_unique() {
        let index = SourceIndex::empty("demo");
        let mut generator = Generator::new(&index);
        let router = Router::new()
            .route("get", "/zoo", HandlerId::new("a"))
            .route("get", "/bar", HandlerId::new("b"))
            .route("post", "/zoo", HandlerId::new("c"));

        let spec = generator
            .generate(&router, &Config::new("Demo", "1.0.0"))
            .unwrap();
        let names: Vec<&str> = spec.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["bar", "zoo"]);
    }

    #[test]
    fn test_out_of_band_schema_appears_in_document() {
        let index = SourceIndex::empty("demo");
        let mut generator = Generator::new(&index);
        generator.schema_for("extras::Widget");

        let router = Router::new().route("get", "/menu", HandlerId::new("list"));
        let spec = generator
            .generate(&router, &Config::new("Demo", "1.0.0"))
            .unwrap();

        assert!(spec.components.schemas.contains_key("extras.Widget"));
    }
}
