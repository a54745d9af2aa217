use crate::parser::{AstParser, ParsedFile};
use crate::scanner::FileScanner;
use crate::schema::Schema;
use anyhow::Result;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{OnceLock, RwLock};

/// Unique key for a source type declaration: module path plus simple name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct QualifiedName {
    /// Module path of the declaring file, e.g. `handlers::menu`.
    pub namespace: String,
    /// Simple type name, e.g. `CreateReq`.
    pub name: String,
}

impl QualifiedName {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// Canonical string key used by the schema store, e.g. `handlers::menu::CreateReq`.
    pub fn canonical(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}::{}", self.namespace, self.name)
        }
    }

    /// Splits a canonical key back into (namespace, simple name).
    pub fn split(canonical: &str) -> (String, String) {
        match canonical.rfind("::") {
            Some(idx) => (canonical[..idx].to_string(), canonical[idx + 2..].to_string()),
            None => (String::new(), canonical.to_string()),
        }
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// Structured view of a field's declared type, extracted from the AST.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    /// A named type as written in source, possibly module-qualified.
    Named(String),
    /// `Option<T>`.
    Optional(Box<TypeRef>),
    /// `Vec<T>` or a slice.
    List(Box<TypeRef>),
    /// `HashMap<_, V>` / `BTreeMap<_, V>`; carries the value type.
    Map(Box<TypeRef>),
    /// Anything the extractor does not model (trait objects, fn pointers, ...).
    Unknown,
}

impl TypeRef {
    /// Parses a `syn::Type` into a `TypeRef`, unwrapping transparent
    /// containers (`Box`, `Arc`, `Rc`) and references.
    pub fn from_syn(ty: &syn::Type) -> TypeRef {
        match ty {
            syn::Type::Path(type_path) => Self::from_path(&type_path.path),
            syn::Type::Reference(r) => Self::from_syn(&r.elem),
            syn::Type::Slice(s) => TypeRef::List(Box::new(Self::from_syn(&s.elem))),
            syn::Type::Array(a) => TypeRef::List(Box::new(Self::from_syn(&a.elem))),
            syn::Type::Paren(p) => Self::from_syn(&p.elem),
            _ => TypeRef::Unknown,
        }
    }

    fn from_path(path: &syn::Path) -> TypeRef {
        let segment = match path.segments.last() {
            Some(s) => s,
            None => return TypeRef::Unknown,
        };
        let head = segment.ident.to_string();

        let first_arg = |seg: &syn::PathSegment| -> Option<TypeRef> {
            if let syn::PathArguments::AngleBracketed(args) = &seg.arguments {
                for arg in &args.args {
                    if let syn::GenericArgument::Type(inner) = arg {
                        return Some(Self::from_syn(inner));
                    }
                }
            }
            None
        };
        let last_arg = |seg: &syn::PathSegment| -> Option<TypeRef> {
            if let syn::PathArguments::AngleBracketed(args) = &seg.arguments {
                let mut found = None;
                for arg in &args.args {
                    if let syn::GenericArgument::Type(inner) = arg {
                        found = Some(Self::from_syn(inner));
                    }
                }
                return found;
            }
            None
        };

        match head.as_str() {
            "Option" => match first_arg(segment) {
                Some(inner) => TypeRef::Optional(Box::new(inner)),
                None => TypeRef::Unknown,
            },
            "Vec" | "VecDeque" | "HashSet" | "BTreeSet" => match first_arg(segment) {
                Some(inner) => TypeRef::List(Box::new(inner)),
                None => TypeRef::Unknown,
            },
            "HashMap" | "BTreeMap" => match last_arg(segment) {
                Some(value) => TypeRef::Map(Box::new(value)),
                None => TypeRef::Unknown,
            },
            "Box" | "Arc" | "Rc" | "Cow" => match last_arg(segment) {
                Some(inner) => inner,
                None => TypeRef::Unknown,
            },
            _ => {
                // Parameterized user types are out of scope; degrade to the
                // generic fallback rather than guessing.
                if !matches!(segment.arguments, syn::PathArguments::None) {
                    return TypeRef::Unknown;
                }
                let written: Vec<String> = path
                    .segments
                    .iter()
                    .map(|s| s.ident.to_string())
                    .collect();
                TypeRef::Named(written.join("::"))
            }
        }
    }
}

/// Constraint hints attached to a field via `#[openapi(...)]` attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldConstraints {
    pub format: Option<String>,
    pub pattern: Option<String>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub deprecated: bool,
}

impl FieldConstraints {
    pub fn is_empty(&self) -> bool {
        *self == FieldConstraints::default()
    }
}

/// One field of an indexed record type.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    /// Declared field name.
    pub name: String,
    /// External serialization name from `#[serde(rename = "...")]`.
    pub rename: Option<String>,
    pub ty: TypeRef,
    /// `#[serde(skip)]` — field never serialized.
    pub skip: bool,
    /// `#[serde(flatten)]` — field folds into the parent object.
    pub flatten: bool,
    /// `#[serde(skip_serializing_if = "...")]` — omitted when empty.
    pub omit_if_empty: bool,
    pub constraints: FieldConstraints,
}

impl FieldDecl {
    /// The name the field serializes under.
    pub fn wire_name(&self) -> &str {
        self.rename.as_deref().unwrap_or(&self.name)
    }
}

/// Shape of an indexed type declaration.
#[derive(Debug, Clone)]
pub enum TypeShape {
    Record { fields: Vec<FieldDecl> },
    Alias { target: TypeRef },
    /// An enumerated constant set: unit-variant enum or string newtype with
    /// harvested constant literals, in declaration order.
    Enum { literals: Vec<String> },
}

/// One indexed source type.
#[derive(Debug, Clone)]
pub struct TypeDeclaration {
    pub qualified: QualifiedName,
    pub shape: TypeShape,
    pub file: PathBuf,
}

/// A function or method declaration usable as a route handler.
#[derive(Debug, Clone)]
pub struct HandlerDecl {
    pub name: String,
    /// Owning type for impl methods; `None` for free functions.
    pub owner: Option<String>,
    pub namespace: String,
    pub file: PathBuf,
    /// Raw doc-comment lines attached to the declaration.
    pub docs: Vec<String>,
}

/// Body of a route-registration method (`fn routes`) kept for the ACL walker.
#[derive(Debug, Clone)]
pub struct RoutesFn {
    pub owner: String,
    pub namespace: String,
    pub file: PathBuf,
    pub body: syn::Block,
}

/// A harvested top-level string constant (`pub const X: ... = "...";`).
#[derive(Debug, Clone)]
pub struct ConstDecl {
    pub namespace: String,
    pub name: String,
    pub value: String,
}

/// One `use` declaration: the full imported path and whether its origin is
/// outside the project.
#[derive(Debug, Clone)]
struct ImportEntry {
    path: String,
    external: bool,
}

/// Immutable index over every reachable source file.
///
/// Built once per project; all lookups are read-only afterwards. The only
/// post-build mutation is [`SourceIndex::register_external`], which adds
/// known external type schemas behind a lock.
pub struct SourceIndex {
    project_name: String,
    decls: BTreeMap<String, TypeDeclaration>,
    by_simple: BTreeMap<String, Vec<String>>,
    /// Import aliases aggregated across all scanned files, with their
    /// internal/external classification. Internal bindings win over
    /// external ones for the same alias.
    aliases: BTreeMap<String, ImportEntry>,
    handlers: Vec<HandlerDecl>,
    routes_fns: Vec<RoutesFn>,
    consts: Vec<ConstDecl>,
    external_types: RwLock<BTreeMap<String, Schema>>,
}

impl SourceIndex {
    /// Scans `root`, parses every Rust file, and builds the index.
    ///
    /// Files that fail to parse are logged and skipped; they never abort the
    /// build.
    pub fn build(root: &Path) -> Result<SourceIndex> {
        let project_name = read_project_name(root);
        debug!(
            "Building source index for project '{}' at {}",
            project_name,
            root.display()
        );

        let scan = FileScanner::new(root.to_path_buf()).scan()?;
        let parsed: Vec<ParsedFile> = AstParser::parse_files(&scan.rust_files)
            .into_iter()
            .filter_map(|r| r.ok())
            .collect();

        let mut index = SourceIndex::empty(&project_name);
        for file in &parsed {
            index.index_file(root, file);
        }

        debug!(
            "Source index built: {} types, {} handlers, {} import aliases",
            index.decls.len(),
            index.handlers.len(),
            index.aliases.len()
        );
        Ok(index)
    }

    /// An index with no declarations, seeded only with the default external
    /// type table.
    pub fn empty(project_name: &str) -> SourceIndex {
        SourceIndex {
            project_name: project_name.to_string(),
            decls: BTreeMap::new(),
            by_simple: BTreeMap::new(),
            aliases: BTreeMap::new(),
            handlers: Vec::new(),
            routes_fns: Vec::new(),
            consts: Vec::new(),
            external_types: RwLock::new(default_external_types()),
        }
    }

    /// Looks up a declaration by exact (namespace, name) pair.
    pub fn lookup(&self, namespace: &str, name: &str) -> Option<&TypeDeclaration> {
        self.decls
            .get(&QualifiedName::new(namespace, name).canonical())
    }

    /// Looks up a declaration by canonical key.
    pub fn lookup_canonical(&self, canonical: &str) -> Option<&TypeDeclaration> {
        self.decls.get(canonical)
    }

    /// Looks up a declaration by simple name.
    ///
    /// Deterministic under ambiguity: candidate namespaces are kept in
    /// lexicographic order and the first match wins, so repeated runs always
    /// resolve the same declaration. Indexed project declarations always
    /// beat registered external types.
    pub fn lookup_by_simple_name(&self, name: &str) -> Option<(&TypeDeclaration, QualifiedName)> {
        let candidates = self.by_simple.get(name)?;
        let canonical = candidates.first()?;
        let decl = self.decls.get(canonical)?;
        Some((decl, decl.qualified.clone()))
    }

    /// Resolves a type name as written in source to its canonical key.
    ///
    /// Already-canonical keys pass through. A leading import alias is
    /// expanded through the classified `use` declarations: an internal
    /// import resolves to its indexed declaration, an external import to
    /// its full path (so the external known-types table can match it).
    /// Remaining unqualified names resolve via the deterministic
    /// simple-name lookup; unknown names are returned unchanged so the
    /// caller can degrade gracefully.
    pub fn qualify(&self, written: &str) -> String {
        if self.decls.contains_key(written) {
            return written.to_string();
        }

        let (head, rest) = match written.split_once("::") {
            Some((head, rest)) => (head, Some(rest)),
            None => (written, None),
        };
        if let Some(entry) = self.aliases.get(head) {
            let mut full = entry.path.clone();
            if let Some(rest) = rest {
                full.push_str("::");
                full.push_str(rest);
            }
            let local = full
                .trim_start_matches("crate::")
                .trim_start_matches("self::")
                .to_string();
            if self.decls.contains_key(&local) {
                return local;
            }
            if entry.external {
                return full;
            }
        }

        let simple = written.rsplit("::").next().unwrap_or(written);
        if let Some((_, qualified)) = self.lookup_by_simple_name(simple) {
            return qualified.canonical();
        }
        written.to_string()
    }

    /// Registers a known external type schema out of band.
    ///
    /// The schema is stored under the full path and, like the seeded
    /// default table, under the trailing simple name so a source file that
    /// writes the bare imported name still resolves it. An existing
    /// simple-name binding is never displaced.
    pub fn register_external(&self, qualified: &str, schema: Schema) {
        debug!("Registering external known type: {}", qualified);
        let mut table = self
            .external_types
            .write()
            .unwrap_or_else(|e| e.into_inner());
        if let Some(simple) = qualified.rsplit("::").next() {
            if simple != qualified {
                table
                    .entry(simple.to_string())
                    .or_insert_with(|| schema.clone());
            }
        }
        table.insert(qualified.to_string(), schema);
    }

    /// Returns the registered schema for an external type, trying both the
    /// full path and the trailing simple name.
    pub fn external_schema(&self, written: &str) -> Option<Schema> {
        let table = self.external_types.read().unwrap_or_else(|e| e.into_inner());
        if let Some(s) = table.get(written) {
            return Some(s.clone());
        }
        let simple = written.rsplit("::").next()?;
        table.get(simple).cloned()
    }

    /// All handler declarations with the given simple name, in a stable
    /// (file, owner) order.
    pub fn handlers_by_name(&self, name: &str) -> Vec<&HandlerDecl> {
        let mut found: Vec<&HandlerDecl> = self
            .handlers
            .iter()
            .filter(|h| h.name == name)
            .collect();
        found.sort_by(|a, b| (&a.file, &a.owner).cmp(&(&b.file, &b.owner)));
        found
    }

    /// Resolves a fully-qualified handler identity like
    /// `handlers::menu::MenuHandler::list` to a unique declaration.
    pub fn handler_by_qualified(&self, qualified: &str) -> Option<&HandlerDecl> {
        let mut parts: Vec<&str> = qualified.split("::").collect();
        let name = parts.pop()?;
        let matches: Vec<&HandlerDecl> = self
            .handlers
            .iter()
            .filter(|h| {
                if h.name != name {
                    return false;
                }
                match parts.last() {
                    None => true,
                    Some(tail) => {
                        h.owner.as_deref() == Some(*tail)
                            || h.namespace.ends_with(&parts.join("::"))
                    }
                }
            })
            .collect();
        if matches.len() == 1 {
            Some(matches[0])
        } else {
            None
        }
    }

    /// The route-registration body for the given owning type, searched in
    /// the owner's own namespace first.
    pub fn routes_fn_for(&self, owner: &str, namespace: &str) -> Option<&RoutesFn> {
        self.routes_fns
            .iter()
            .find(|r| r.owner == owner && r.namespace == namespace)
            .or_else(|| self.routes_fns.iter().find(|r| r.owner == owner))
    }

    /// String constants declared in `acl` modules, usable as a permission
    /// slug table (constant name -> slug value).
    pub fn acl_slug_table(&self) -> BTreeMap<String, String> {
        self.consts
            .iter()
            .filter(|c| {
                c.namespace == "acl"
                    || c.namespace.ends_with("::acl")
                    || c.namespace.split("::").last() == Some("acl")
            })
            .map(|c| (c.name.clone(), c.value.clone()))
            .collect()
    }

    fn index_file(&mut self, root: &Path, file: &ParsedFile) {
        let namespace = namespace_for(root, &file.path);

        let mut imports: BTreeMap<String, ImportEntry> = BTreeMap::new();
        for item in &file.syntax_tree.items {
            if let syn::Item::Use(item_use) = item {
                collect_imports(&item_use.tree, &self.project_name, &mut imports);
            }
        }
        // Files are indexed in sorted scan order, so the merge outcome is
        // the same on every run: first binding wins, except that an
        // internal import displaces an external one under the same alias.
        for (alias, entry) in imports {
            match self.aliases.get(&alias) {
                Some(existing) if !existing.external || entry.external => {}
                _ => {
                    self.aliases.insert(alias, entry);
                }
            }
        }

        // Constant harvesting walks items in declaration order, carrying the
        // active enum-like type so `Self`-typed and same-group constants
        // attach to the right literal set.
        let mut harvested: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for item in &file.syntax_tree.items {
            match item {
                syn::Item::Struct(s) => self.index_struct(s, &namespace, &file.path),
                syn::Item::Enum(e) => self.index_enum(e, &namespace, &file.path),
                syn::Item::Type(t) => {
                    let qualified = QualifiedName::new(&namespace, &t.ident.to_string());
                    self.insert_decl(TypeDeclaration {
                        qualified,
                        shape: TypeShape::Alias {
                            target: TypeRef::from_syn(&t.ty),
                        },
                        file: file.path.clone(),
                    });
                }
                syn::Item::Fn(f) => {
                    self.handlers.push(HandlerDecl {
                        name: f.sig.ident.to_string(),
                        owner: None,
                        namespace: namespace.clone(),
                        file: file.path.clone(),
                        docs: doc_lines(&f.attrs),
                    });
                }
                syn::Item::Const(c) => {
                    harvest_free_const(c, &mut harvested, &mut self.consts, &namespace);
                }
                syn::Item::Impl(imp) => {
                    self.index_impl(imp, &namespace, &file.path, &mut harvested);
                }
                _ => {}
            }
        }

        // Attach harvested literals to string-newtype/alias declarations.
        for (type_name, literals) in harvested {
            let canonical = QualifiedName::new(&namespace, &type_name).canonical();
            if let Some(decl) = self.decls.get_mut(&canonical) {
                if literals.is_empty() {
                    continue;
                }
                match &decl.shape {
                    TypeShape::Alias { .. } | TypeShape::Record { .. } => {
                        debug!(
                            "Harvested {} constant literals for {}",
                            literals.len(),
                            canonical
                        );
                        decl.shape = TypeShape::Enum { literals };
                    }
                    TypeShape::Enum { .. } => {}
                }
            }
        }

    }

    fn index_struct(&mut self, s: &syn::ItemStruct, namespace: &str, path: &Path) {
        let name = s.ident.to_string();
        let qualified = QualifiedName::new(namespace, &name);

        let shape = match &s.fields {
            syn::Fields::Named(named) => {
                let mut fields = Vec::new();
                for field in &named.named {
                    if !matches!(field.vis, syn::Visibility::Public(_)) {
                        continue; // exported fields only
                    }
                    let field_name = match &field.ident {
                        Some(ident) => ident.to_string(),
                        None => continue,
                    };
                    let serde = SerdeAttrs::parse(&field.attrs);
                    fields.push(FieldDecl {
                        name: field_name,
                        rename: serde.rename,
                        ty: TypeRef::from_syn(&field.ty),
                        skip: serde.skip,
                        flatten: serde.flatten,
                        omit_if_empty: serde.omit_if_empty,
                        constraints: parse_openapi_attrs(&field.attrs),
                    });
                }
                TypeShape::Record { fields }
            }
            syn::Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => {
                // Newtype; string newtypes may later become constant sets.
                TypeShape::Alias {
                    target: TypeRef::from_syn(&unnamed.unnamed[0].ty),
                }
            }
            _ => TypeShape::Record { fields: Vec::new() },
        };

        self.insert_decl(TypeDeclaration {
            qualified,
            shape,
            file: path.to_path_buf(),
        });
    }

    fn index_enum(&mut self, e: &syn::ItemEnum, namespace: &str, path: &Path) {
        let name = e.ident.to_string();
        let qualified = QualifiedName::new(namespace, &name);

        let all_unit = e
            .variants
            .iter()
            .all(|v| matches!(v.fields, syn::Fields::Unit));

        let shape = if all_unit {
            let rename_all = SerdeAttrs::parse(&e.attrs).rename_all;
            let literals = e
                .variants
                .iter()
                .map(|v| {
                    let variant_serde = SerdeAttrs::parse(&v.attrs);
                    match variant_serde.rename {
                        Some(renamed) => renamed,
                        None => apply_rename_all(&v.ident.to_string(), rename_all.as_deref()),
                    }
                })
                .collect();
            TypeShape::Enum { literals }
        } else {
            // Data-carrying enums are beyond the fidelity contract; degrade
            // to the generic-object fallback at synthesis time.
            TypeShape::Alias {
                target: TypeRef::Unknown,
            }
        };

        self.insert_decl(TypeDeclaration {
            qualified,
            shape,
            file: path.to_path_buf(),
        });
    }

    fn index_impl(
        &mut self,
        imp: &syn::ItemImpl,
        namespace: &str,
        path: &Path,
        harvested: &mut BTreeMap<String, Vec<String>>,
    ) {
        let owner = impl_target_name(imp);

        // The impl target is the active type for `Self`-typed constants.
        let mut current_type: Option<String> = owner.clone();

        for item in &imp.items {
            match item {
                syn::ImplItem::Fn(method) => {
                    let method_name = method.sig.ident.to_string();
                    if method_name == "routes" {
                        if let Some(owner_name) = &owner {
                            self.routes_fns.push(RoutesFn {
                                owner: owner_name.clone(),
                                namespace: namespace.to_string(),
                                file: path.to_path_buf(),
                                body: method.block.clone(),
                            });
                        }
                    }
                    self.handlers.push(HandlerDecl {
                        name: method_name,
                        owner: owner.clone(),
                        namespace: namespace.to_string(),
                        file: path.to_path_buf(),
                        docs: doc_lines(&method.attrs),
                    });
                }
                syn::ImplItem::Const(c) => {
                    let declared = const_type_name(&c.ty);
                    match declared.as_deref() {
                        // `Self` inherits the impl target; anything explicit
                        // becomes the new active type for the group.
                        Some("Self") | None => {}
                        Some(other) => current_type = Some(other.to_string()),
                    }
                    if let (Some(target), Some(value)) =
                        (current_type.clone(), const_literal_value(&c.expr))
                    {
                        harvested.entry(target).or_default().push(value);
                    }
                }
                _ => {}
            }
        }
    }

    fn insert_decl(&mut self, decl: TypeDeclaration) {
        let canonical = decl.qualified.canonical();
        let simple = decl.qualified.name.clone();
        debug!("Indexed type {}", canonical);
        self.decls.insert(canonical.clone(), decl);
        let bucket = self.by_simple.entry(simple).or_default();
        if !bucket.contains(&canonical) {
            bucket.push(canonical);
            bucket.sort();
        }
    }
}

/// Lazily built, shareable index.
///
/// Concurrent callers asking for the index before it exists block until the
/// first build finishes, then all share the same immutable result.
pub struct LazyIndex {
    root: PathBuf,
    cell: OnceLock<SourceIndex>,
}

impl LazyIndex {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            cell: OnceLock::new(),
        }
    }

    pub fn get(&self) -> &SourceIndex {
        self.cell.get_or_init(|| {
            SourceIndex::build(&self.root).unwrap_or_else(|e| {
                warn!("Index build failed, continuing with empty index: {}", e);
                SourceIndex::empty("unknown")
            })
        })
    }
}

/// Default table of well-known external types, keyed by both full path and
/// simple name.
fn default_external_types() -> BTreeMap<String, Schema> {
    let mut table = BTreeMap::new();

    let with_desc = |t: Option<&str>, format: Option<&str>, desc: &str| -> Schema {
        let mut s = match t {
            Some(t) => Schema::primitive(t),
            None => Schema::default(),
        };
        s.format = format.map(|f| f.to_string());
        s.description = Some(desc.to_string());
        s
    };

    let entries: Vec<(&str, Schema)> = vec![
        (
            "chrono::DateTime",
            with_desc(Some("string"), Some("date-time"), "RFC3339 date-time"),
        ),
        (
            "chrono::NaiveDateTime",
            with_desc(Some("string"), Some("date-time"), "Naive date-time"),
        ),
        (
            "chrono::NaiveDate",
            with_desc(Some("string"), Some("date"), "Calendar date"),
        ),
        (
            "uuid::Uuid",
            with_desc(Some("string"), Some("uuid"), "UUID string"),
        ),
        (
            "url::Url",
            with_desc(Some("string"), Some("uri"), "URL string"),
        ),
        (
            "std::net::IpAddr",
            with_desc(Some("string"), None, "IP address"),
        ),
        (
            "std::time::Duration",
            with_desc(Some("string"), None, "Duration string (e.g. '1h30m')"),
        ),
        (
            "rust_decimal::Decimal",
            with_desc(Some("string"), None, "Decimal number as string"),
        ),
        (
            "serde_json::Value",
            with_desc(None, None, "Any JSON value"),
        ),
    ];

    for (path, schema) in entries {
        let simple = path.rsplit("::").next().unwrap().to_string();
        table.insert(path.to_string(), schema.clone());
        table.entry(simple).or_insert(schema);
    }
    table
}

/// Derives the module path of a file relative to the scan root, e.g.
/// `src/handlers/menu.rs` -> `handlers::menu`.
fn namespace_for(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    let mut parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();

    if let Some(last) = parts.last_mut() {
        *last = last.trim_end_matches(".rs").to_string();
    }
    parts.retain(|p| p != "src");
    if matches!(parts.last().map(|s| s.as_str()), Some("mod") | Some("lib") | Some("main")) {
        parts.pop();
    }
    parts.join("::")
}

fn read_project_name(root: &Path) -> String {
    if let Ok(manifest) = std::fs::read_to_string(root.join("Cargo.toml")) {
        for line in manifest.lines() {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix("name") {
                let rest = rest.trim_start();
                if let Some(value) = rest.strip_prefix('=') {
                    return value.trim().trim_matches('"').to_string();
                }
            }
        }
    }
    root.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "project".to_string())
}

fn collect_imports(
    tree: &syn::UseTree,
    project_name: &str,
    imports: &mut BTreeMap<String, ImportEntry>,
) {
    fn walk(
        tree: &syn::UseTree,
        prefix: Vec<String>,
        project_name: &str,
        imports: &mut BTreeMap<String, ImportEntry>,
    ) {
        match tree {
            syn::UseTree::Path(p) => {
                let mut next = prefix;
                next.push(p.ident.to_string());
                walk(&p.tree, next, project_name, imports);
            }
            syn::UseTree::Name(n) => {
                let mut full = prefix;
                full.push(n.ident.to_string());
                record(n.ident.to_string(), full, project_name, imports);
            }
            syn::UseTree::Rename(r) => {
                let mut full = prefix;
                full.push(r.ident.to_string());
                record(r.rename.to_string(), full, project_name, imports);
            }
            syn::UseTree::Group(g) => {
                for item in &g.items {
                    walk(item, prefix.clone(), project_name, imports);
                }
            }
            syn::UseTree::Glob(_) => {}
        }
    }

    fn record(
        alias: String,
        full: Vec<String>,
        project_name: &str,
        imports: &mut BTreeMap<String, ImportEntry>,
    ) {
        let origin = full.first().map(|s| s.as_str()).unwrap_or("");
        let normalized_project = project_name.replace('-', "_");
        let internal = matches!(origin, "crate" | "self" | "super") || origin == normalized_project;
        imports.insert(
            alias,
            ImportEntry {
                path: full.join("::"),
                external: !internal,
            },
        );
    }

    walk(tree, Vec::new(), project_name, imports);
}

fn doc_lines(attrs: &[syn::Attribute]) -> Vec<String> {
    let mut lines = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        if let syn::Meta::NameValue(nv) = &attr.meta {
            if let syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Str(s),
                ..
            }) = &nv.value
            {
                lines.push(s.value().trim().to_string());
            }
        }
    }
    lines
}

fn impl_target_name(imp: &syn::ItemImpl) -> Option<String> {
    if let syn::Type::Path(type_path) = imp.self_ty.as_ref() {
        type_path.path.segments.last().map(|s| s.ident.to_string())
    } else {
        None
    }
}

fn const_type_name(ty: &syn::Type) -> Option<String> {
    match ty {
        syn::Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map(|s| s.ident.to_string()),
        syn::Type::Reference(r) => const_type_name(&r.elem),
        _ => None,
    }
}

/// Extracts the string literal from a constant's value expression, looking
/// through a single constructor call like `Status("active")`.
fn const_literal_value(expr: &syn::Expr) -> Option<String> {
    match expr {
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(s),
            ..
        }) => Some(s.value()),
        syn::Expr::Call(call) => call.args.first().and_then(const_literal_value),
        syn::Expr::Reference(r) => const_literal_value(&r.expr),
        _ => None,
    }
}

fn harvest_free_const(
    c: &syn::ItemConst,
    harvested: &mut BTreeMap<String, Vec<String>>,
    consts: &mut Vec<ConstDecl>,
    namespace: &str,
) {
    let declared = const_type_name(&c.ty);
    let value = const_literal_value(&c.expr);

    if let Some(value) = &value {
        // Plain string constants feed the ACL slug table.
        if matches!(declared.as_deref(), Some("str") | Some("String")) {
            consts.push(ConstDecl {
                namespace: namespace.to_string(),
                name: c.ident.to_string(),
                value: value.clone(),
            });
            return;
        }
    }

    if let (Some(target), Some(value)) = (declared, value) {
        harvested.entry(target).or_default().push(value);
    }
}

struct SerdeAttrs {
    rename: Option<String>,
    rename_all: Option<String>,
    skip: bool,
    flatten: bool,
    omit_if_empty: bool,
}

impl SerdeAttrs {
    /// Parses `#[serde(...)]` attributes from their token text, the same
    /// lightweight approach used for struct-tag extraction elsewhere.
    fn parse(attrs: &[syn::Attribute]) -> SerdeAttrs {
        let mut result = SerdeAttrs {
            rename: None,
            rename_all: None,
            skip: false,
            flatten: false,
            omit_if_empty: false,
        };

        for attr in attrs {
            if !attr.path().is_ident("serde") {
                continue;
            }
            let tokens = match attr.meta.require_list() {
                Ok(list) => list.tokens.to_string(),
                Err(_) => continue,
            };

            if let Some(value) = extract_str_value(&tokens, "rename_all") {
                result.rename_all = Some(value);
            } else if let Some(value) = extract_str_value(&tokens, "rename") {
                result.rename = Some(value);
            }
            if tokens.contains("skip_serializing_if") {
                result.omit_if_empty = true;
            } else if tokens.contains("skip") {
                result.skip = true;
            }
            if tokens.contains("flatten") {
                result.flatten = true;
            }
        }

        result
    }
}

fn parse_openapi_attrs(attrs: &[syn::Attribute]) -> FieldConstraints {
    let mut constraints = FieldConstraints::default();

    for attr in attrs {
        if !attr.path().is_ident("openapi") {
            continue;
        }
        let tokens = match attr.meta.require_list() {
            Ok(list) => list.tokens.to_string(),
            Err(_) => continue,
        };

        constraints.format = extract_str_value(&tokens, "format").or(constraints.format);
        constraints.pattern = extract_str_value(&tokens, "pattern").or(constraints.pattern);
        constraints.minimum = extract_num_value(&tokens, "minimum").or(constraints.minimum);
        constraints.maximum = extract_num_value(&tokens, "maximum").or(constraints.maximum);
        constraints.min_length = extract_num_value(&tokens, "min_length")
            .map(|v| v as u64)
            .or(constraints.min_length);
        constraints.max_length = extract_num_value(&tokens, "max_length")
            .map(|v| v as u64)
            .or(constraints.max_length);
        if tokens.contains("deprecated") {
            constraints.deprecated = true;
        }
    }

    constraints
}

/// Finds `key = "value"` inside an attribute token string.
fn extract_str_value(tokens: &str, key: &str) -> Option<String> {
    let key_pos = tokens.find(key)?;
    let after_key = &tokens[key_pos + key.len()..];
    let eq_pos = after_key.find('=')?;
    let after_eq = &after_key[eq_pos + 1..];
    let start_quote = after_eq.find('"')?;
    let after_start = &after_eq[start_quote + 1..];
    let end_quote = after_start.find('"')?;
    Some(after_start[..end_quote].to_string())
}

/// Finds `key = <number>` inside an attribute token string.
fn extract_num_value(tokens: &str, key: &str) -> Option<f64> {
    let key_pos = tokens.find(key)?;
    let after_key = &tokens[key_pos + key.len()..];
    let eq_pos = after_key.find('=')?;
    let after_eq = after_key[eq_pos + 1..].trim_start();
    let end = after_eq
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .unwrap_or(after_eq.len());
    after_eq[..end].trim().parse().ok()
}

fn apply_rename_all(variant: &str, rename_all: Option<&str>) -> String {
    match rename_all {
        Some("lowercase") => variant.to_lowercase(),
        Some("UPPERCASE") => variant.to_uppercase(),
        Some("snake_case") => to_snake_case(variant),
        Some("SCREAMING_SNAKE_CASE") => to_snake_case(variant).to_uppercase(),
        Some("kebab-case") => to_snake_case(variant).replace('_', "-"),
        Some("camelCase") => {
            let mut chars = variant.chars();
            match chars.next() {
                Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        }
        _ => variant.to_string(),
    }
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
