use openapi_from_router::generator::Generator;
use openapi_from_router::index::SourceIndex;
use openapi_from_router::router::{HandlerId, Middleware, MiddlewareKind, Router};
use openapi_from_router::serializer;
use openapi_from_router::spec::Config;
use std::fs;
use tempfile::TempDir;

fn write_project(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("Cargo.toml"),
        "[package]\nname = \"demo-api\"\nversion = \"0.1.0\"\n",
    )
    .unwrap();
    for (name, content) in files {
        let path = temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
    temp_dir
}

const MODELS: &str = r#"
    use serde::Serialize;

    #[derive(Serialize)]
    #[serde(rename_all = "lowercase")]
    pub enum MenuStatus {
        Active,
        Retired,
    }

    #[derive(Serialize)]
    pub struct MenuItem {
        pub id: u64,
        pub name: String,
        pub status: MenuStatus,
        pub description: Option<String>,
    }

    #[derive(Serialize)]
    pub struct CreateMenuItem {
        pub name: String,
        pub status: MenuStatus,
    }
"#;

const MENU_HANDLER: &str = r#"
    pub struct MenuHandler;

    impl MenuHandler {
        pub fn routes(&self) -> Router {
            Router::new()
                .with(can(MENU_READ)).get("/", Self::list)
                .with(can(MENU_WRITE)).post("/", Self::create)
        }

        /// @Summary List menu items
        /// @Tags menu
        /// @Produce json
        /// @Success 200 {array} models::MenuItem "All menu items"
        pub fn list(&self) {}

        /// @Summary Create a menu item
        /// @Tags menu
        /// @Accept json
        /// @Param payload body models::CreateMenuItem true "New item"
        /// @Success 201 {object} models::MenuItem "Created item"
        pub fn create(&self) {}
    }
"#;

const COUPON_HANDLER: &str = r#"
    pub struct CouponHandler;

    impl CouponHandler {
        /// @Summary List coupons
        pub fn list(&self) {}
    }
"#;

const ACL: &str = r#"
    pub const MENU_READ: &str = "menu.read";
    pub const MENU_WRITE: &str = "menu.write";
"#;

fn demo_router() -> Router {
    let menu = Router::new()
        .middleware(Middleware::tagged("jwt", MiddlewareKind::Authentication))
        .route("get", "/", HandlerId::new("list"))
        .route("post", "/", HandlerId::new("create"))
        .route("get", "/{id}", HandlerId::new("nonexistent_handler"));

    let coupons = Router::new().route("get", "/", HandlerId::new("list"));

    Router::new()
        .mount("/api/v1/menus", menu)
        .mount("/api/v1/coupons", coupons)
        .route("get", "/openapi.json", HandlerId::new("serve_spec"))
}

fn demo_project() -> TempDir {
    write_project(&[
        ("src/models.rs", MODELS),
        ("src/handlers/menu.rs", MENU_HANDLER),
        ("src/handlers/coupon.rs", COUPON_HANDLER),
        ("src/acl/mod.rs", ACL),
    ])
}

#[test]
fn generated_document_is_byte_identical_across_runs() {
    let project = demo_project();
    let config = Config::new("Demo API", "1.0.0");

    let index_a = SourceIndex::build(project.path()).unwrap();
    let first = serializer::to_json(
        &Generator::new(&index_a)
            .generate(&demo_router(), &config)
            .unwrap(),
    )
    .unwrap();

    let index_b = SourceIndex::build(project.path()).unwrap();
    let second = serializer::to_json(
        &Generator::new(&index_b)
            .generate(&demo_router(), &config)
            .unwrap(),
    )
    .unwrap();

    assert_eq!(first, second);
}

#[test]
fn every_reference_resolves_to_a_component() {
    let project = demo_project();
    let index = SourceIndex::build(project.path()).unwrap();
    let spec = Generator::new(&index)
        .generate(&demo_router(), &Config::new("Demo API", "1.0.0"))
        .unwrap();

    let document = serde_json::to_value(&spec).unwrap();
    let schemas = document["components"]["schemas"]
        .as_object()
        .expect("schemas present");

    let mut refs = Vec::new();
    collect_refs(&document, &mut refs);
    assert!(!refs.is_empty());

    for reference in refs {
        let key = reference
            .strip_prefix("#/components/schemas/")
            .unwrap_or_else(|| panic!("unexpected ref shape: {}", reference));
        assert!(
            schemas.contains_key(key),
            "dangling reference: {}",
            reference
        );
    }
}

fn collect_refs(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, nested) in map {
                if key == "$ref" {
                    if let Some(target) = nested.as_str() {
                        out.push(target.to_string());
                    }
                }
                collect_refs(nested, out);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_refs(item, out);
            }
        }
        _ => {}
    }
}

#[test]
fn undocumented_get_by_id_route() {
    let project = demo_project();
    let index = SourceIndex::build(project.path()).unwrap();
    let spec = Generator::new(&index)
        .generate(&demo_router(), &Config::new("Demo API", "1.0.0"))
        .unwrap();

    let operation = spec.paths["/api/v1/menus/{id}"].get.as_ref().unwrap();
    assert_eq!(operation.parameters.len(), 1);

    let param = &operation.parameters[0];
    assert_eq!(param.name, "id");
    assert_eq!(param.location, "path");
    assert!(param.required);
    assert!(param.schema.has_type("string"));

    let ok = &operation.responses["200"];
    assert_eq!(ok.description, "Successful response");
    assert!(ok.content["application/json"].schema.has_type("object"));
}

#[test]
fn same_named_handlers_resolve_independently() {
    let project = demo_project();
    let index = SourceIndex::build(project.path()).unwrap();
    let spec = Generator::new(&index)
        .generate(&demo_router(), &Config::new("Demo API", "1.0.0"))
        .unwrap();

    let menu_list = spec.paths["/api/v1/menus"].get.as_ref().unwrap();
    let coupon_list = spec.paths["/api/v1/coupons"].get.as_ref().unwrap();

    assert_eq!(menu_list.summary.as_deref(), Some("List menu items"));
    assert_eq!(coupon_list.summary.as_deref(), Some("List coupons"));
    assert_ne!(menu_list.operation_id, coupon_list.operation_id);
}

#[test]
fn annotations_acl_and_security_flow_into_operations() {
    let project = demo_project();
    let index = SourceIndex::build(project.path()).unwrap();
    let spec = Generator::new(&index)
        .generate(&demo_router(), &Config::new("Demo API", "1.0.0"))
        .unwrap();

    let list = spec.paths["/api/v1/menus"].get.as_ref().unwrap();
    // permission extracted from the routes registration body
    let description = list.description.as_deref().unwrap();
    assert!(description.contains("Access control:"));
    assert!(description.contains("menu.read"));
    // auth middleware adds the bearer requirement
    assert!(list.security.iter().any(|r| r.contains_key("BearerAuth")));

    // wrapped array success: envelope with data + pagination meta
    let ok = &list.responses["200"];
    assert_eq!(ok.description, "All menu items");
    let schema = &ok.content["application/json"].schema;
    assert!(schema.properties["data"].has_type("array"));
    assert_eq!(
        schema.properties["meta"].reference.as_deref(),
        Some("#/components/schemas/PaginationMeta")
    );

    let create = spec.paths["/api/v1/menus"].post.as_ref().unwrap();
    let body = create.request_body.as_ref().unwrap();
    assert_eq!(
        body.content["application/json"].schema.reference.as_deref(),
        Some("#/components/schemas/models.CreateMenuItem")
    );
    assert!(create
        .description
        .as_deref()
        .unwrap()
        .contains("menu.write"));
}

#[test]
fn components_carry_named_models_with_rewritten_refs() {
    let project = demo_project();
    let index = SourceIndex::build(project.path()).unwrap();
    let spec = Generator::new(&index)
        .generate(&demo_router(), &Config::new("Demo API", "1.0.0"))
        .unwrap();

    let item = &spec.components.schemas["models.MenuItem"];
    // 64-bit id crosses the wire as a string
    assert!(item.properties["id"].has_type("string"));
    assert_eq!(item.properties["id"].format.as_deref(), Some("int64"));
    // enum field by reference, rewritten to the public name
    assert_eq!(
        item.properties["status"].reference.as_deref(),
        Some("#/components/schemas/models.MenuStatus")
    );
    // optional field is nullable
    assert!(item.properties["description"].has_type("null"));
    assert!(!item.required.contains(&"description".to_string()));

    let status = &spec.components.schemas["models.MenuStatus"];
    assert_eq!(status.enum_values, vec!["active", "retired"]);
}

#[test]
fn introspection_routes_are_excluded() {
    let project = demo_project();
    let index = SourceIndex::build(project.path()).unwrap();
    let spec = Generator::new(&index)
        .generate(&demo_router(), &Config::new("Demo API", "1.0.0"))
        .unwrap();

    assert!(!spec.paths.contains_key("/openapi.json"));
}
