use crate::index::{FieldConstraints, SourceIndex, TypeDeclaration, TypeRef, TypeShape};
use crate::schema::{Schema, SchemaType};
use log::debug;
use std::collections::BTreeMap;

/// Synthesizes JSON-Schema descriptions from indexed type declarations.
///
/// Every named type resolves to a `$ref` into the component store; the
/// store is memoized per synthesizer instance, so repeated requests for the
/// same type return identical references. Synthesis never fails: anything
/// that cannot be resolved degrades to a described generic object.
pub struct SchemaSynthesizer<'a> {
    index: &'a SourceIndex,
    schemas: BTreeMap<String, Schema>,
}

impl<'a> SchemaSynthesizer<'a> {
    pub fn new(index: &'a SourceIndex) -> Self {
        Self {
            index,
            schemas: BTreeMap::new(),
        }
    }

    /// The accumulated component schema store, keyed by canonical qualified
    /// name.
    pub fn schemas(&self) -> &BTreeMap<String, Schema> {
        &self.schemas
    }

    /// Synthesizes a schema for a type name as written in source.
    pub fn schema_for_name(&mut self, written: &str) -> Schema {
        self.schema_for(&TypeRef::Named(written.to_string()))
    }

    /// Synthesizes a schema node for a structured type reference.
    pub fn schema_for(&mut self, ty: &TypeRef) -> Schema {
        match ty {
            TypeRef::Named(name) => self.named_schema(name),
            TypeRef::Optional(inner) => {
                let inner_schema = self.schema_for(inner);
                nullable(inner_schema)
            }
            TypeRef::List(inner) => {
                // Byte buffers serialize as base64 strings, not arrays.
                if matches!(inner.as_ref(), TypeRef::Named(n) if n == "u8") {
                    return Schema::primitive_with_format("string", "byte");
                }
                Schema::array(self.schema_for(inner))
            }
            TypeRef::Map(value) => {
                let mut schema = Schema::object();
                schema.additional_properties = Some(Box::new(self.schema_for(value)));
                schema
            }
            TypeRef::Unknown => generic_object("unknown"),
        }
    }

    fn named_schema(&mut self, name: &str) -> Schema {
        let simple = name.rsplit("::").next().unwrap_or(name);
        if let Some(primitive) = primitive_schema(simple) {
            return primitive;
        }

        let canonical = self.index.qualify(name);
        if let Some(decl) = self.index.lookup_canonical(&canonical).cloned() {
            self.ensure_component(&canonical, &decl);
            return Schema::reference(&canonical);
        }

        // Known external types inline their registered schema. The
        // canonical form covers aliased imports (`use rust_decimal::Decimal
        // as Dec;` fields written as `Dec`).
        if let Some(external) = self
            .index
            .external_schema(&canonical)
            .or_else(|| self.index.external_schema(name))
        {
            return external;
        }

        debug!("Type '{}' not resolved; using generic object fallback", name);
        self.schemas
            .entry(canonical.clone())
            .or_insert_with(|| generic_object(name));
        Schema::reference(&canonical)
    }

    fn ensure_component(&mut self, canonical: &str, decl: &TypeDeclaration) {
        if self.schemas.contains_key(canonical) {
            return;
        }
        // Placeholder before descent, so cyclic records resolve to a
        // reference instead of recursing forever.
        self.schemas
            .insert(canonical.to_string(), Schema::object());

        let built = match &decl.shape {
            TypeShape::Record { fields } => self.record_schema(fields),
            TypeShape::Alias { target } => self.schema_for(target),
            TypeShape::Enum { literals } => {
                let mut schema = Schema::primitive("string");
                schema.enum_values = literals.clone();
                schema
            }
        };

        debug!("Synthesized component schema for {}", canonical);
        self.schemas.insert(canonical.to_string(), built);
    }

    fn record_schema(&mut self, fields: &[crate::index::FieldDecl]) -> Schema {
        let mut object = Schema::object();
        let mut flattened: Vec<Schema> = Vec::new();

        for field in fields {
            if field.skip {
                continue;
            }
            if field.flatten {
                flattened.push(self.schema_for(&field.ty));
                continue;
            }

            let mut field_schema = self.schema_for(&field.ty);
            apply_constraints(&mut field_schema, &field.constraints);
            object
                .properties
                .insert(field.wire_name().to_string(), field_schema);

            let optional = matches!(field.ty, TypeRef::Optional(_)) || field.omit_if_empty;
            if !optional {
                object.required.push(field.wire_name().to_string());
            }
        }
        object.required.sort();

        if flattened.is_empty() {
            object
        } else {
            let mut members = vec![object];
            members.extend(flattened);
            Schema::all_of(members)
        }
    }
}

/// Wraps a schema in a nullable form.
///
/// Primitives widen their `type` keyword to `[t, "null"]`; reference and
/// composite nodes are wrapped in `anyOf` so the referenced component is
/// never mutated.
fn nullable(inner: Schema) -> Schema {
    if inner.is_reference() || !inner.any_of.is_empty() || !inner.one_of.is_empty() {
        return Schema::any_of(vec![inner, null_schema()]);
    }
    match &inner.schema_type {
        Some(SchemaType::One(t)) if inner.properties.is_empty() => {
            let mut widened = inner.clone();
            widened.schema_type = Some(SchemaType::nullable(t));
            widened
        }
        Some(SchemaType::Many(ts)) if ts.iter().any(|t| t == "null") => inner,
        _ => Schema::any_of(vec![inner, null_schema()]),
    }
}

fn null_schema() -> Schema {
    Schema::primitive("null")
}

fn generic_object(name: &str) -> Schema {
    let mut schema = Schema::object();
    schema.description = Some(format!("Unresolved type: {}", name));
    schema
}

/// Maps a Rust primitive type name to its schema, or `None` for non-primitives.
///
/// 64-bit and larger integer kinds map to strings with an `int64` format
/// tag: JSON numbers cannot carry them without precision loss.
fn primitive_schema(name: &str) -> Option<Schema> {
    let schema = match name {
        "i8" | "i16" | "i32" | "u8" | "u16" | "u32" => {
            Schema::primitive_with_format("integer", "int32")
        }
        "i64" | "u64" | "i128" | "u128" | "isize" | "usize" => {
            Schema::primitive_with_format("string", "int64")
        }
        "f32" => Schema::primitive_with_format("number", "float"),
        "f64" => Schema::primitive_with_format("number", "double"),
        "bool" => Schema::primitive("boolean"),
        "String" | "str" | "char" => Schema::primitive("string"),
        "()" => {
            let mut s = Schema::default();
            s.schema_type = Some(SchemaType::one("null"));
            s
        }
        _ => return None,
    };
    Some(schema)
}

fn apply_constraints(schema: &mut Schema, constraints: &FieldConstraints) {
    if constraints.is_empty() {
        return;
    }
    // Constraint keys may not sit next to a $ref.
    if schema.is_reference() {
        return;
    }
    if constraints.format.is_some() {
        schema.format = constraints.format.clone();
    }
    if constraints.pattern.is_some() {
        schema.pattern = constraints.pattern.clone();
    }
    if constraints.minimum.is_some() {
        schema.minimum = constraints.minimum;
    }
    if constraints.maximum.is_some() {
        schema.maximum = constraints.maximum;
    }
    if constraints.min_length.is_some() {
        schema.min_length = constraints.min_length;
    }
    if constraints.max_length.is_some() {
        schema.max_length = constraints.max_length;
    }
    if constraints.deprecated {
        schema.deprecated = Some(true);
    }
}
