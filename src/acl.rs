use crate::index::{HandlerDecl, SourceIndex};
use crate::router::{MiddlewareKind, RouteEntry};
use log::debug;
use std::collections::BTreeMap;
use syn::visit::Visit;

/// A single access-control requirement attached to an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionDescriptor {
    /// One required permission slug.
    Single(String),
    /// Any one of the listed slugs suffices.
    AnyOf(Vec<String>),
    /// All of the listed slugs are required.
    AllOf(Vec<String>),
    /// Free-form requirement wording (heuristic or middleware-derived).
    Narrative(String),
}

impl std::fmt::Display for PermissionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            PermissionDescriptor::Single(slug) => write!(f, "{}", slug),
            PermissionDescriptor::AnyOf(slugs) => write!(f, "any({})", slugs.join(", ")),
            PermissionDescriptor::AllOf(slugs) => write!(f, "all({})", slugs.join(", ")),
            PermissionDescriptor::Narrative(text) => write!(f, "{}", text),
        }
    }
}

/// Extracts access-control requirements for a route.
///
/// Three tiers, first non-empty result wins:
/// 1. a static walk of the owning type's `routes` registration body,
///    reading `can(..)` / `any_of(..)` / `all_of(..)` guards chained onto
///    the registration that names the handler;
/// 2. a verb/resource heuristic when a permission-checking middleware
///    guards the route;
/// 3. generic labels derived from middleware capability classification.
pub struct AclExtractor<'a> {
    index: &'a SourceIndex,
    slug_table: BTreeMap<String, String>,
}

impl<'a> AclExtractor<'a> {
    pub fn new(index: &'a SourceIndex) -> Self {
        let slug_table = index.acl_slug_table();
        Self { index, slug_table }
    }

    pub fn extract(
        &self,
        resolved: Option<&HandlerDecl>,
        route: &RouteEntry,
    ) -> Vec<PermissionDescriptor> {
        if let Some(decl) = resolved {
            let from_registration = self.from_routes_body(decl);
            if !from_registration.is_empty() {
                return dedup(from_registration);
            }
        }

        let classified: Vec<MiddlewareKind> = route
            .middlewares
            .iter()
            .filter_map(|m| m.classify())
            .collect();

        if classified.contains(&MiddlewareKind::Permission) {
            if let Some(heuristic) = verb_resource_heuristic(route) {
                return vec![heuristic];
            }
        }

        dedup(
            classified
                .into_iter()
                .filter_map(generic_label)
                .collect(),
        )
    }

    /// Tier 1: walk the owning type's `routes` body for the registration
    /// naming this handler and read the chained permission guards.
    fn from_routes_body(&self, decl: &HandlerDecl) -> Vec<PermissionDescriptor> {
        let owner = match &decl.owner {
            Some(owner) => owner,
            None => return Vec::new(),
        };
        let routes_fn = match self.index.routes_fn_for(owner, &decl.namespace) {
            Some(f) => f,
            None => return Vec::new(),
        };

        let mut finder = RegistrationFinder {
            target: &decl.name,
            slug_table: &self.slug_table,
            found: Vec::new(),
        };
        finder.visit_block(&routes_fn.body);

        if !finder.found.is_empty() {
            debug!(
                "Extracted {} permission guard(s) for {}::{} from routes body",
                finder.found.len(),
                owner,
                decl.name
            );
        }
        finder.found
    }
}

const HTTP_VERB_METHODS: &[&str] = &[
    "get", "post", "put", "delete", "patch", "head", "options", "route", "route_with",
];

struct RegistrationFinder<'s> {
    target: &'s str,
    slug_table: &'s BTreeMap<String, String>,
    found: Vec<PermissionDescriptor>,
}

impl<'ast> Visit<'ast> for RegistrationFinder<'_> {
    fn visit_expr_method_call(&mut self, node: &'ast syn::ExprMethodCall) {
        let method = node.method.to_string();
        if HTTP_VERB_METHODS.contains(&method.as_str()) && self.names_target(node) {
            // guards attached to the registration itself
            for arg in &node.args {
                collect_permission_calls(arg, self.slug_table, &mut self.found);
            }
            // guards chained below it: .with(can(..)).get(..); the walk
            // stops at the previous registration so guards never bleed
            // across neighbors in the same chain
            let mut receiver = node.receiver.as_ref();
            while let syn::Expr::MethodCall(inner) = receiver {
                let inner_method = inner.method.to_string();
                if HTTP_VERB_METHODS.contains(&inner_method.as_str()) {
                    break;
                }
                if inner_method == "with" || inner_method == "using" {
                    for arg in &inner.args {
                        collect_permission_calls(arg, self.slug_table, &mut self.found);
                    }
                }
                receiver = inner.receiver.as_ref();
            }
        }
        syn::visit::visit_expr_method_call(self, node);
    }
}

impl RegistrationFinder<'_> {
    /// True if any argument of the registration names the target handler,
    /// either as a path tail (`Self::list`) or a string literal.
    fn names_target(&self, node: &syn::ExprMethodCall) -> bool {
        node.args.iter().any(|arg| match arg {
            syn::Expr::Path(p) => p
                .path
                .segments
                .last()
                .is_some_and(|s| s.ident == self.target),
            syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Str(s),
                ..
            }) => {
                let value = s.value();
                value == self.target || value.rsplit("::").next() == Some(self.target)
            }
            syn::Expr::Reference(r) => match r.expr.as_ref() {
                syn::Expr::Path(p) => p
                    .path
                    .segments
                    .last()
                    .is_some_and(|s| s.ident == self.target),
                _ => false,
            },
            _ => false,
        })
    }
}

/// Finds `can(..)` / `any_of(..)` / `all_of(..)` calls anywhere inside an
/// expression and converts them to descriptors.
fn collect_permission_calls(
    expr: &syn::Expr,
    slug_table: &BTreeMap<String, String>,
    out: &mut Vec<PermissionDescriptor>,
) {
    struct GuardFinder<'s> {
        slug_table: &'s BTreeMap<String, String>,
        out: &'s mut Vec<PermissionDescriptor>,
    }

    impl<'ast> Visit<'ast> for GuardFinder<'_> {
        fn visit_expr_call(&mut self, node: &'ast syn::ExprCall) {
            if let syn::Expr::Path(func) = node.func.as_ref() {
                let name = func
                    .path
                    .segments
                    .last()
                    .map(|s| s.ident.to_string())
                    .unwrap_or_default();
                let slugs: Vec<String> = node
                    .args
                    .iter()
                    .filter_map(|arg| slug_for(arg, self.slug_table))
                    .collect();

                match (name.as_str(), slugs.len()) {
                    ("can", 1) => self.out.push(PermissionDescriptor::Single(slugs[0].clone())),
                    ("any_of", n) if n > 0 => self.out.push(PermissionDescriptor::AnyOf(slugs)),
                    ("all_of", n) if n > 0 => self.out.push(PermissionDescriptor::AllOf(slugs)),
                    _ => {}
                }
            }
            syn::visit::visit_expr_call(self, node);
        }
    }

    GuardFinder { slug_table, out }.visit_expr(expr);
}

/// Resolves a guard argument to a slug: string literals verbatim, symbolic
/// identifiers through the harvested slug table, lowercased otherwise.
fn slug_for(expr: &syn::Expr, slug_table: &BTreeMap<String, String>) -> Option<String> {
    match expr {
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(s),
            ..
        }) => Some(s.value()),
        syn::Expr::Path(p) => {
            let ident = p.path.segments.last()?.ident.to_string();
            Some(
                slug_table
                    .get(&ident)
                    .cloned()
                    .unwrap_or_else(|| ident.to_lowercase()),
            )
        }
        syn::Expr::Reference(r) => slug_for(&r.expr, slug_table),
        _ => None,
    }
}

/// Tier 2: infer a requirement from the HTTP verb and the leading
/// meaningful path segment.
fn verb_resource_heuristic(route: &RouteEntry) -> Option<PermissionDescriptor> {
    let resource = route
        .pattern
        .split('/')
        .find(|s| {
            !s.is_empty()
                && !s.starts_with('{')
                && !s.eq_ignore_ascii_case("api")
                && !is_version_segment(s)
        })?
        .to_lowercase();

    let action = match route.method.as_str() {
        "GET" | "HEAD" => "Read",
        "DELETE" => "Delete",
        _ => "Write",
    };
    Some(PermissionDescriptor::Narrative(format!(
        "{} access to {}",
        action, resource
    )))
}

fn is_version_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    matches!(chars.next(), Some('v') | Some('V')) && chars.all(|c| c.is_ascii_digit())
}

/// Tier 3: generic middleware-derived labels.
fn generic_label(kind: MiddlewareKind) -> Option<PermissionDescriptor> {
    let text = match kind {
        MiddlewareKind::Authentication => "Requires authentication",
        MiddlewareKind::RoleGate => "Restricted to specific roles",
        MiddlewareKind::TenantContext => "Scoped to the requesting tenant",
        MiddlewareKind::Permission => return None,
    };
    Some(PermissionDescriptor::Narrative(text.to_string()))
}

fn dedup(descriptors: Vec<PermissionDescriptor>) -> Vec<PermissionDescriptor> {
    let mut seen = Vec::new();
    for d in descriptors {
        if !seen.contains(&d) {
            seen.push(d);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{HandlerId, Middleware, Router};
    use std::fs;
    use tempfile::TempDir;

    fn build_index(files: &[(&str, &str)]) -> SourceIndex {
        let temp_dir = TempDir::new().unwrap();
        for (name, content) in files {
            let path = temp_dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
        SourceIndex::build(temp_dir.path()).unwrap()
    }

    fn entry(method: &str, pattern: &str, middlewares: Vec<Middleware>) -> RouteEntry {
        let router = Router::new().route_with(method, pattern, HandlerId::new("h"), middlewares);
        crate::router::inspect_routes(&router).unwrap().remove(0)
    }

    const HANDLER_SOURCE: &str = r#"
        use crate::acl::{can, any_of, all_of};

        pub struct MenuHandler;

        impl MenuHandler {
            pub fn routes(&self) -> Router {
                Router::new()
                    .with(can(MENU_READ)).get("/", Self::list)
                    .with(any_of(MENU_WRITE, "admin.super")).post("/", Self::create)
                    .with(all_of(MENU_WRITE, AUDIT_LOG)).delete("/{id}", Self::remove)
                    .get("/public", Self::public_list)
            }

            pub fn list(&self) {}
            pub fn create(&self) {}
            pub fn remove(&self) {}
            pub fn public_list(&self) {}
        }
    "#;

    const ACL_SOURCE: &str = r#"
        pub const MENU_READ: &str = "menu.read";
        pub const MENU_WRITE: &str = "menu.write";
    "#;

    fn handler<'a>(index: &'a SourceIndex, name: &str) -> &'a crate::index::HandlerDecl {
        index
            .handler_by_qualified(&format!("MenuHandler::{}", name))
            .unwrap()
    }

    #[test]
    fn test_static_extraction_single_permission() {
        let index = build_index(&[
            ("src/handlers/menu.rs", HANDLER_SOURCE),
            ("src/acl/mod.rs", ACL_SOURCE),
        ]);
        let extractor = AclExtractor::new(&index);

        let perms = extractor.extract(
            Some(handler(&index, "list")),
            &entry("get", "/menu", vec![]),
        );
        assert_eq!(
            perms,
            vec![PermissionDescriptor::Single("menu.read".to_string())]
        );
    }

    #[test]
    fn test_static_extraction_any_of_mixes_symbols_and_literals() {
        let index = build_index(&[
            ("src/handlers/menu.rs", HANDLER_SOURCE),
            ("src/acl/mod.rs", ACL_SOURCE),
        ]);
        let extractor = AclExtractor::new(&index);

        let perms = extractor.extract(
            Some(handler(&index, "create")),
            &entry("post", "/menu", vec![]),
        );
        assert_eq!(
            perms,
            vec![PermissionDescriptor::AnyOf(vec![
                "menu.write".to_string(),
                "admin.super".to_string(),
            ])]
        );
    }

    #[test]
    fn test_unknown_symbol_falls_back_to_lowercased_identifier() {
        let index = build_index(&[("src/handlers/menu.rs", HANDLER_SOURCE)]);
        let extractor = AclExtractor::new(&index);

        // AUDIT_LOG has no slug table entry
        let perms = extractor.extract(
            Some(handler(&index, "remove")),
            &entry("delete", "/menu/{id}", vec![]),
        );
        assert_eq!(
            perms,
            vec![PermissionDescriptor::AllOf(vec![
                "menu_write".to_string(),
                "audit_log".to_string(),
            ])]
        );
    }

    #[test]
    fn test_heuristic_tier_with_permission_middleware() {
        let index = SourceIndex::empty("demo");
        let extractor = AclExtractor::new(&index);

        let route = entry(
            "delete",
            "/api/v1/coupons/{id}",
            vec![Middleware::named("check_permission")],
        );
        let perms = extractor.extract(None, &route);
        assert_eq!(
            perms,
            vec![PermissionDescriptor::Narrative(
                "Delete access to coupons".to_string()
            )]
        );
    }

    #[test]
    fn test_generic_labels_from_capability_tags() {
        let index = SourceIndex::empty("demo");
        let extractor = AclExtractor::new(&index);

        let route = entry(
            "get",
            "/profile",
            vec![
                Middleware::tagged("jwt", MiddlewareKind::Authentication),
                Middleware::tagged("admin_only", MiddlewareKind::RoleGate),
            ],
        );
        let perms = extractor.extract(None, &route);
        assert_eq!(
            perms,
            vec![
                PermissionDescriptor::Narrative("Requires authentication".to_string()),
                PermissionDescriptor::Narrative("Restricted to specific roles".to_string()),
            ]
        );
    }

    #[test]
    fn test_unguarded_route_yields_nothing() {
        let index = build_index(&[("src/handlers/menu.rs", HANDLER_SOURCE)]);
        let extractor = AclExtractor::new(&index);

        let perms = extractor.extract(
            Some(handler(&index, "public_list")),
            &entry("get", "/menu/public", vec![]),
        );
        assert!(perms.is_empty());
    }

    #[test]
    fn test_display_formats() {
        assert_eq!(
            PermissionDescriptor::Single("a.b".into()).to_string(),
            "a.b"
        );
        assert_eq!(
            PermissionDescriptor::AnyOf(vec!["a".into(), "b".into()]).to_string(),
            "any(a, b)"
        );
        assert_eq!(
            PermissionDescriptor::AllOf(vec!["a".into(), "b".into()]).to_string(),
            "all(a, b)"
        );
    }
}
