use crate::index::{HandlerDecl, SourceIndex};
use crate::router::{HandlerId, RouteEntry};
use log::debug;

/// Route-derived context used to disambiguate handler candidates.
#[derive(Debug, Clone)]
pub struct RouteContext {
    pub mount_path: String,
    pub pattern: String,
}

impl RouteContext {
    pub fn from_entry(entry: &RouteEntry) -> Self {
        RouteContext {
            mount_path: entry.mount_path.clone(),
            pattern: entry.pattern.clone(),
        }
    }
}

/// Maps opaque handler identities back to source declarations.
///
/// Resolution without runtime cooperation from the router is inherently
/// best-effort. A fully-qualified identity resolves exactly; a bare name
/// falls back to a structural search over the index, using the route's
/// mount path to pick between same-named methods on different owners. When
/// neither tier produces a single declaration the handler stays unresolved
/// and the operation is built without annotation data.
pub struct HandlerResolver<'a> {
    index: &'a SourceIndex,
}

impl<'a> HandlerResolver<'a> {
    pub fn new(index: &'a SourceIndex) -> Self {
        Self { index }
    }

    pub fn resolve(&self, id: &HandlerId, context: &RouteContext) -> Option<&'a HandlerDecl> {
        // Tier 1: exact identity.
        if id.as_str().contains("::") {
            if let Some(decl) = self.index.handler_by_qualified(id.as_str()) {
                return Some(decl);
            }
        }

        // Tier 2: structural source search by simple name.
        let simple = id.as_str().rsplit("::").next()?;
        let candidates = self.index.handlers_by_name(simple);
        match candidates.len() {
            0 => {
                debug!("Handler '{}' not found in source index", id);
                None
            }
            1 => Some(candidates[0]),
            _ => self.disambiguate(candidates, context, id),
        }
    }

    fn disambiguate(
        &self,
        candidates: Vec<&'a HandlerDecl>,
        context: &RouteContext,
        id: &HandlerId,
    ) -> Option<&'a HandlerDecl> {
        let tokens = context_tokens(context);

        let mut best: Option<&HandlerDecl> = None;
        let mut best_score = 0usize;
        let mut tied = false;

        // candidates arrive in stable (file, owner) order, so ties resolve
        // the same way on every run
        for candidate in candidates {
            let score = candidate_score(candidate, &tokens);
            if score > best_score {
                best = Some(candidate);
                best_score = score;
                tied = false;
            } else if score == best_score && best.is_some() {
                tied = true;
            }
        }

        if best_score == 0 || tied {
            debug!(
                "Handler '{}' is ambiguous under route context '{}'; leaving unresolved",
                id, context.pattern
            );
            return None;
        }
        best
    }
}

/// Meaningful lowercase path segments from the route context, skipping
/// version prefixes and template placeholders.
fn context_tokens(context: &RouteContext) -> Vec<String> {
    let mut tokens = Vec::new();
    for source in [&context.mount_path, &context.pattern] {
        for segment in source.split('/') {
            let segment = segment.trim();
            if segment.is_empty()
                || segment.starts_with('{')
                || segment.eq_ignore_ascii_case("api")
                || is_version_segment(segment)
            {
                continue;
            }
            let token = segment.to_lowercase();
            if !tokens.contains(&token) {
                tokens.push(token);
            }
        }
    }
    tokens
}

fn is_version_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    matches!(chars.next(), Some('v') | Some('V')) && chars.all(|c| c.is_ascii_digit())
}

fn candidate_score(candidate: &HandlerDecl, tokens: &[String]) -> usize {
    let owner = candidate
        .owner
        .as_deref()
        .unwrap_or("")
        .to_lowercase();
    let module = candidate
        .namespace
        .rsplit("::")
        .next()
        .unwrap_or("")
        .to_lowercase();

    let mut score = 0;
    for token in tokens {
        let singular = token.trim_end_matches('s');
        if !singular.is_empty() && owner.contains(singular) {
            score += 2;
        }
        if module == *token || module == singular {
            score += 1;
        }
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SourceIndex;
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

    fn ctx(mount: &str, pattern: &str) -> RouteContext {
        RouteContext {
            mount_path: mount.to_string(),
            pattern: pattern.to_string(),
        }
    }

    #[test]
    fn test_resolve_by_exact_identity() {
        let index = build_index(&[(
            "src/handlers/menu.rs",
            "pub struct MenuHandler; impl MenuHandler { pub fn list(&self) {} }",
        )]);
        let resolver = HandlerResolver::new(&index);

        let decl = resolver
            .resolve(
                &HandlerId::new("handlers::menu::MenuHandler::list"),
                &ctx("", "/anything"),
            )
            .expect("identity resolution");
        assert_eq!(decl.owner.as_deref(), Some("MenuHandler"));
    }

    #[test]
    fn test_resolve_unique_simple_name() {
        let index = build_index(&[(
            "src/handlers/menu.rs",
            "pub struct MenuHandler; impl MenuHandler { pub fn list_specials(&self) {} }",
        )]);
        let resolver = HandlerResolver::new(&index);

        let decl = resolver
            .resolve(&HandlerId::new("list_specials"), &ctx("", "/whatever"))
            .expect("unique name resolves without context");
        assert_eq!(decl.name, "list_specials");
    }

    #[test]
    fn test_disambiguation_by_mount_path() {
        // two owners expose the same method name
        let index = build_index(&[
            (
                "src/handlers/menu.rs",
                "pub struct MenuHandler; impl MenuHandler { pub fn list(&self) {} }",
            ),
            (
                "src/handlers/coupon.rs",
                "pub struct CouponHandler; impl CouponHandler { pub fn list(&self) {} }",
            ),
        ]);
        let resolver = HandlerResolver::new(&index);

        let menu = resolver
            .resolve(&HandlerId::new("list"), &ctx("/api/v1/menus", "/api/v1/menus"))
            .expect("menu side resolves");
        assert_eq!(menu.owner.as_deref(), Some("MenuHandler"));

        let coupon = resolver
            .resolve(
                &HandlerId::new("list"),
                &ctx("/api/v1/coupons", "/api/v1/coupons"),
            )
            .expect("coupon side resolves");
        assert_eq!(coupon.owner.as_deref(), Some("CouponHandler"));
    }

    #[test]
    fn test_ambiguous_without_context_stays_unresolved() {
        let index = build_index(&[
            (
                "src/handlers/menu.rs",
                "pub struct MenuHandler; impl MenuHandler { pub fn list(&self) {} }",
            ),
            (
                "src/handlers/coupon.rs",
                "pub struct CouponHandler; impl CouponHandler { pub fn list(&self) {} }",
            ),
        ]);
        let resolver = HandlerResolver::new(&index);

        // no segment names either owner
        assert!(resolver
            .resolve(&HandlerId::new("list"), &ctx("", "/api/v1/things"))
            .is_none());
    }

    #[test]
    fn test_unknown_handler_returns_none() {
        let index = SourceIndex::empty("demo");
        let resolver = HandlerResolver::new(&index);

        assert!(resolver
            .resolve(&HandlerId::new("no_such_handler"), &ctx("", "/x"))
            .is_none());
    }
}
