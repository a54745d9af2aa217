use crate::error::RouteDiscoveryError;
use log::debug;

/// Opaque, comparable handler identity attached to a route registration.
///
/// Callers that can name their handlers fully (`handlers::menu::MenuHandler::list`)
/// get exact source resolution; a bare name still resolves through the
/// structural source search.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct HandlerId(String);

impl HandlerId {
    pub fn new(id: impl Into<String>) -> Self {
        HandlerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for HandlerId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a middleware does to requests passing through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiddlewareKind {
    /// Rejects unauthenticated requests.
    Authentication,
    /// Checks fine-grained permissions.
    Permission,
    /// Restricts access to specific roles.
    RoleGate,
    /// Scopes the request to a tenant.
    TenantContext,
}

/// A middleware in a route's chain.
///
/// The capability tag is the authoritative classification; when absent, a
/// conservative name-pattern fallback applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Middleware {
    pub name: String,
    pub kind: Option<MiddlewareKind>,
}

impl Middleware {
    pub fn named(name: impl Into<String>) -> Self {
        Middleware {
            name: name.into(),
            kind: None,
        }
    }

    pub fn tagged(name: impl Into<String>, kind: MiddlewareKind) -> Self {
        Middleware {
            name: name.into(),
            kind: Some(kind),
        }
    }

    /// Effective classification: explicit tag first, name heuristic second.
    pub fn classify(&self) -> Option<MiddlewareKind> {
        if self.kind.is_some() {
            return self.kind;
        }
        let lower = self.name.to_lowercase();
        if lower.contains("permission") || lower.contains("acl") {
            Some(MiddlewareKind::Permission)
        } else if lower.contains("role") {
            Some(MiddlewareKind::RoleGate)
        } else if lower.contains("tenant") {
            Some(MiddlewareKind::TenantContext)
        } else if lower.contains("auth") {
            Some(MiddlewareKind::Authentication)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
struct Registration {
    method: String,
    pattern: String,
    handler: HandlerId,
    middlewares: Vec<Middleware>,
}

/// Value snapshot of a router: root middlewares, direct registrations, and
/// nested mounts. This is the narrow contract the generator reads routes
/// from; any HTTP framework can be adapted into it.
#[derive(Debug, Clone, Default)]
pub struct Router {
    middlewares: Vec<Middleware>,
    routes: Vec<Registration>,
    mounts: Vec<(String, Router)>,
}

impl Router {
    pub fn new() -> Self {
        Router::default()
    }

    /// Adds a middleware applying to every route registered below this
    /// router.
    pub fn middleware(mut self, middleware: Middleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Registers a route with no route-level middlewares.
    pub fn route(self, method: &str, pattern: &str, handler: HandlerId) -> Self {
        self.route_with(method, pattern, handler, Vec::new())
    }

    /// Registers a route with its own middleware chain.
    pub fn route_with(
        mut self,
        method: &str,
        pattern: &str,
        handler: HandlerId,
        middlewares: Vec<Middleware>,
    ) -> Self {
        self.routes.push(Registration {
            method: method.to_string(),
            pattern: pattern.to_string(),
            handler,
            middlewares,
        });
        self
    }

    /// Mounts a nested router under a path prefix.
    pub fn mount(mut self, prefix: &str, router: Router) -> Self {
        self.mounts.push((prefix.to_string(), router));
        self
    }
}

/// A fully-resolved route as seen by the generator: absolute pattern plus
/// the middleware chain accumulated from every nesting level.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub method: String,
    pub pattern: String,
    pub handler: HandlerId,
    pub middlewares: Vec<Middleware>,
    /// The mount prefix the route was registered under (empty at root).
    pub mount_path: String,
}

/// Walks the router tree and returns every registration with absolute
/// patterns and accumulated middleware chains, in registration order.
///
/// Fails with operation `"inspect"` on a registration with an empty method
/// or a pattern that does not start with `/`.
pub fn inspect_routes(router: &Router) -> Result<Vec<RouteEntry>, RouteDiscoveryError> {
    let mut entries = Vec::new();
    walk(router, "", &[], &mut entries)?;
    debug!("Inspected {} routes", entries.len());
    Ok(entries)
}

fn walk(
    router: &Router,
    prefix: &str,
    inherited: &[Middleware],
    entries: &mut Vec<RouteEntry>,
) -> Result<(), RouteDiscoveryError> {
    let mut chain: Vec<Middleware> = inherited.to_vec();
    chain.extend(router.middlewares.iter().cloned());

    for registration in &router.routes {
        if registration.method.trim().is_empty() {
            return Err(RouteDiscoveryError::new(
                "inspect",
                format!("route '{}' has an empty method", registration.pattern),
            ));
        }
        if !registration.pattern.starts_with('/') {
            return Err(RouteDiscoveryError::new(
                "inspect",
                format!(
                    "route pattern '{}' does not start with '/'",
                    registration.pattern
                ),
            ));
        }

        let mut middlewares = chain.clone();
        middlewares.extend(registration.middlewares.iter().cloned());

        entries.push(RouteEntry {
            method: registration.method.to_uppercase(),
            pattern: join_paths(prefix, &registration.pattern),
            handler: registration.handler.clone(),
            middlewares,
            mount_path: prefix.to_string(),
        });
    }

    for (mount_prefix, nested) in &router.mounts {
        if !mount_prefix.starts_with('/') {
            return Err(RouteDiscoveryError::new(
                "inspect",
                format!("mount prefix '{}' does not start with '/'", mount_prefix),
            ));
        }
        let combined = join_paths(prefix, mount_prefix);
        walk(nested, &combined, &chain, entries)?;
    }

    Ok(())
}

/// Inspects the router, then drops the tool's own introspection endpoints
/// and rejects duplicate registrations.
///
/// Fails with operation `"discover"` when two registrations share the same
/// (method, pattern) pair.
pub fn discover_routes(router: &Router) -> Result<Vec<RouteEntry>, RouteDiscoveryError> {
    let entries = inspect_routes(router)?;

    let mut seen: std::collections::BTreeSet<(String, String)> = std::collections::BTreeSet::new();
    let mut discovered = Vec::new();

    for entry in entries {
        if is_introspection_endpoint(&entry.pattern) {
            debug!("Skipping introspection endpoint {}", entry.pattern);
            continue;
        }
        let key = (entry.method.clone(), entry.pattern.clone());
        if !seen.insert(key) {
            return Err(RouteDiscoveryError::new(
                "discover",
                format!(
                    "duplicate route registration: {} {}",
                    entry.method, entry.pattern
                ),
            ));
        }
        discovered.push(entry);
    }

    debug!("Discovered {} documentable routes", discovered.len());
    Ok(discovered)
}

fn is_introspection_endpoint(pattern: &str) -> bool {
    pattern.starts_with("/openapi") || pattern.starts_with("/swagger") || pattern.starts_with("/docs")
}

fn join_paths(prefix: &str, pattern: &str) -> String {
    if prefix.is_empty() || prefix == "/" {
        return pattern.to_string();
    }
    let base = prefix.trim_end_matches('/');
    if pattern == "/" {
        base.to_string()
    } else {
        format!("{}{}", base, pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_inspect_flattens_mount_tree() {
        let menu = Router::new()
            .route("get", "/", HandlerId::new("MenuHandler::list"))
            .route("post", "/", HandlerId::new("MenuHandler::create"))
            .route("get", "/{id}", HandlerId::new("MenuHandler::get"));

        let app = Router::new()
            .middleware(Middleware::named("request_logger"))
            .mount("/api/v1/menu", menu);

        let entries = inspect_routes(&app).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].method, "GET");
        assert_eq!(entries[0].pattern, "/api/v1/menu");
        assert_eq!(entries[2].pattern, "/api/v1/menu/{id}");
        assert_eq!(entries[0].mount_path, "/api/v1/menu");
    }

    #[test]
    fn test_middleware_chain_accumulates_through_levels() {
        let inner = Router::new()
            .middleware(Middleware::tagged("require_auth", MiddlewareKind::Authentication))
            .route_with(
                "delete",
                "/{id}",
                HandlerId::new("delete_item"),
                vec![Middleware::tagged("require_admin", MiddlewareKind::RoleGate)],
            );

        let app = Router::new()
            .middleware(Middleware::named("request_logger"))
            .mount("/items", inner);

        let entries = inspect_routes(&app).unwrap();
        let names: Vec<&str> = entries[0]
            .middlewares
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["request_logger", "require_auth", "require_admin"]);
    }

    #[test]
    fn test_inspect_rejects_empty_method() {
        let app = Router::new().route("", "/x", HandlerId::new("h"));
        let err = inspect_routes(&app).unwrap_err();

        assert_eq!(err.operation, "inspect");
        assert!(err.message.contains("empty method"));
    }

    #[test]
    fn test_inspect_rejects_relative_pattern() {
        let app = Router::new().route("get", "x", HandlerId::new("h"));
        let err = inspect_routes(&app).unwrap_err();

        assert_eq!(err.operation, "inspect");
        assert!(err.message.contains("does not start with '/'"));
    }

    #[test]
    fn test_discover_filters_introspection_endpoints() {
        let app = Router::new()
            .route("get", "/openapi.json", HandlerId::new("serve_spec"))
            .route("get", "/swagger", HandlerId::new("serve_ui"))
            .route("get", "/docs/index.html", HandlerId::new("serve_docs"))
            .route("get", "/menu", HandlerId::new("MenuHandler::list"));

        let entries = discover_routes(&app).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].pattern, "/menu");
    }

    #[test]
    fn test_discover_rejects_duplicates() {
        let app = Router::new()
            .route("get", "/menu", HandlerId::new("a"))
            .route("get", "/menu", HandlerId::new("b"));

        let err = discover_routes(&app).unwrap_err();
        assert_eq!(err.operation, "discover");
        assert!(err.message.contains("duplicate"));
    }

    #[test]
    fn test_same_pattern_different_methods_allowed() {
        let app = Router::new()
            .route("get", "/menu", HandlerId::new("list"))
            .route("post", "/menu", HandlerId::new("create"));

        assert_eq!(discover_routes(&app).unwrap().len(), 2);
    }

    #[test]
    fn test_middleware_classification_fallback() {
        assert_eq!(
            Middleware::named("jwt_auth").classify(),
            Some(MiddlewareKind::Authentication)
        );
        assert_eq!(
            Middleware::named("check_permission").classify(),
            Some(MiddlewareKind::Permission)
        );
        assert_eq!(
            Middleware::named("role_gate").classify(),
            Some(MiddlewareKind::RoleGate)
        );
        assert_eq!(
            Middleware::named("tenant_scope").classify(),
            Some(MiddlewareKind::TenantContext)
        );
        assert_eq!(Middleware::named("request_logger").classify(), None);

        // explicit tag beats the name
        let tagged = Middleware::tagged("auth_logger", MiddlewareKind::TenantContext);
        assert_eq!(tagged.classify(), Some(MiddlewareKind::TenantContext));
    }

    #[test]
    fn test_root_mount_pattern_join() {
        let inner = Router::new().route("get", "/", HandlerId::new("root"));
        let app = Router::new().mount("/api", inner);

        let entries = inspect_routes(&app).unwrap();
        assert_eq!(entries[0].pattern, "/api");
    }
}
