//! Derives an OpenAPI 3.1 document from a live router snapshot and static
//! analysis of the project's own source tree.
//!
//! The pipeline: [`router::discover_routes`] reads the registered routes
//! out of a [`router::Router`] snapshot; [`resolver::HandlerResolver`] maps
//! each handler identity back to its source declaration;
//! [`annotations::Annotation`] parses doc-comment directives;
//! [`synthesizer::SchemaSynthesizer`] turns indexed type declarations into
//! JSON-Schema components; [`acl::AclExtractor`] reads permission guards
//! out of route-registration code; and [`namer::ModelNamer`] assigns every
//! component its public name and rewrites all references in one final pass.
//! [`generator::Generator`] ties the stages together.
//!
//! ```no_run
//! use openapi_from_router::generator::Generator;
//! use openapi_from_router::index::SourceIndex;
//! use openapi_from_router::router::{HandlerId, Router};
//! use openapi_from_router::spec::Config;
//!
//! let index = SourceIndex::build(std::path::Path::new(".")).unwrap();
//! let router = Router::new()
//!     .route("get", "/api/v1/menu", HandlerId::new("handlers::menu::MenuHandler::list"));
//!
//! let mut generator = Generator::new(&index);
//! let spec = generator.generate(&router, &Config::new("Menu API", "1.0.0")).unwrap();
//! println!("{}", openapi_from_router::serializer::to_json(&spec).unwrap());
//! ```

pub mod acl;
pub mod annotations;
pub mod error;
pub mod generator;
pub mod index;
pub mod namer;
pub mod operation;
pub mod parser;
pub mod resolver;
pub mod router;
pub mod scanner;
pub mod schema;
pub mod serializer;
pub mod spec;
pub mod synthesizer;

pub use error::{Error, Result, RouteDiscoveryError};
pub use generator::Generator;
pub use index::{LazyIndex, SourceIndex};
pub use router::{HandlerId, Middleware, MiddlewareKind, Router};
pub use spec::{Config, Spec};
