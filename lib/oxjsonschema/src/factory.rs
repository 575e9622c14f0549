//! Compilation of schema documents into schema graphs.

use crate::constraint::{Constraint, FormatKind, ItemsSchema, TypeKind};
use crate::error::SchemaError;
use crate::limits::Limits;
use crate::loader::{DocumentCache, RemoteDocument};
use crate::meta::meta_schema;
use crate::model::{Schema, SchemaBuilder, SchemaId};
use crate::pointer::Pointer;
use crate::reference::{Document, ReferenceResolver};
use crate::report::DEPTH_KEYWORD;
use crate::uri::Uri;
use crate::validator::{Validator, parse_date_time};
use crate::value::{Value, ValueKind};
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::error::Error;
use tracing::{debug, trace};

type Location = (Option<String>, String);

/// Compiles schema documents into [`Schema`] graphs.
///
/// Each schema document, and each document location reached through `$ref` for the first
/// time, is validated against the [meta-schema](crate::meta_schema) before being compiled.
/// Locations are compiled once per [`create`](Self::create) call, so recursive schemas
/// become cyclic graphs.
///
/// Subschemas under `definitions` are checked against the meta-schema with the rest of
/// their document, but they are compiled, and their references resolved, only when a
/// `$ref` reaches them.
///
/// ```
/// use oxjsonschema::{SchemaFactory, Value};
/// use serde_json::json;
///
/// let schema = SchemaFactory::new().create(
///     &Value::from(json!({
///         "type": "object",
///         "properties": {"children": {"type": "array", "items": {"$ref": "#"}}}
///     })),
///     None,
/// )?;
/// let children = &schema.nested()[0];
/// assert!(children.nested()[0].ptr_eq(&schema));
/// # Result::<_, oxjsonschema::SchemaError>::Ok(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaFactory {
    resolver: ReferenceResolver,
    limits: Limits,
}

impl SchemaFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `resolver` to follow references to other documents.
    #[must_use]
    pub fn with_resolver(mut self, resolver: ReferenceResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Sets the callback used to load the documents referenced by schemas.
    #[must_use]
    pub fn with_load_document_callback(
        mut self,
        callback: impl Fn(&str) -> Result<RemoteDocument, Box<dyn Error + Send + Sync>>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.resolver = self.resolver.with_load_document_callback(callback);
        self
    }

    /// Sets the limits of compilation, of reference resolution and of meta-schema validation.
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.resolver = self.resolver.with_limits(limits.clone());
        self.limits = limits;
        self
    }

    pub fn resolver(&self) -> &ReferenceResolver {
        &self.resolver
    }

    /// Compiles the schema document `raw`, retrieved from `document_uri` if known.
    ///
    /// The document is registered under `document_uri` only while compiling, as described
    /// in [`create_from_document`](Self::create_from_document).
    pub fn create(&self, raw: &Value, document_uri: Option<&str>) -> Result<Schema, SchemaError> {
        let mut document = Document::new(raw.clone());
        if let Some(uri) = document_uri {
            document = document.with_uri(Uri::parse(uri)?);
        }
        self.create_from_document(&document)
    }

    /// Compiles the root of `document`.
    ///
    /// While compiling, a document with a URI is registered in the resolver cache so that
    /// references from other documents back to it do not load it again. The previous cache
    /// entry for that URI is restored afterwards. Documents loaded through references stay
    /// cached.
    pub fn create_from_document(&self, document: &Document) -> Result<Schema, SchemaError> {
        debug!(
            document = document.uri().map_or("<anonymous>", Uri::as_str),
            "compiling schema"
        );
        let _registration = Registration::new(self.resolver.cache(), document);
        let mut compiler = Compiler {
            resolver: &self.resolver,
            limits: &self.limits,
            meta: Validator::new(meta_schema()).with_limits(self.limits.clone()),
            builder: SchemaBuilder::new(),
            memo: FxHashMap::default(),
            checked: FxHashSet::default(),
        };
        let root = Pointer::root();
        compiler.check(document.root(), document, &root)?;
        let id = compiler.compile(document.root(), document, &root, 0)?;
        debug!(nodes = compiler.builder.len(), "schema compiled");
        Ok(compiler.builder.build(id))
    }
}

/// Registers a document in a cache until dropped.
struct Registration<'a> {
    cache: &'a DocumentCache,
    uri: Uri,
    previous: Option<Document>,
}

impl<'a> Registration<'a> {
    fn new(cache: &'a DocumentCache, document: &Document) -> Option<Self> {
        let uri = document.uri()?.clone();
        let previous = cache.get(&uri);
        cache.insert_as(&uri, document.clone());
        Some(Self {
            cache,
            uri,
            previous,
        })
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(previous) => self.cache.insert_as(&self.uri, previous),
            None => {
                self.cache.remove(&self.uri);
            }
        }
    }
}

struct Compiler<'a> {
    resolver: &'a ReferenceResolver,
    limits: &'a Limits,
    meta: Validator,
    builder: SchemaBuilder,
    /// Compiled (or being compiled) locations.
    memo: FxHashMap<Location, SchemaId>,
    /// Locations already validated against the meta-schema.
    checked: FxHashSet<Location>,
}

fn location(document: &Document, pointer: &Pointer) -> Location {
    (
        document.uri().map(|uri| uri.as_str().to_owned()),
        pointer.to_string(),
    )
}

fn uri_name(document: &Document) -> String {
    document
        .uri()
        .map(|uri| uri.as_str().to_owned())
        .unwrap_or_default()
}

impl Compiler<'_> {
    /// Validates the schema at `pointer` against the meta-schema, once per location.
    fn check(
        &mut self,
        value: &Value,
        document: &Document,
        pointer: &Pointer,
    ) -> Result<(), SchemaError> {
        if !self.checked.insert(location(document, pointer)) {
            return Ok(());
        }
        let result = self.meta.validate(value);
        if result.is_valid() {
            return Ok(());
        }
        if let Some(issue) = result.iter().find(|issue| issue.keyword() == DEPTH_KEYWORD) {
            let pointer = pointer
                .atoms()
                .iter()
                .chain(issue.pointer().atoms())
                .collect::<Pointer>();
            return Err(SchemaError::depth_limit_exceeded(
                uri_name(document),
                pointer.to_string(),
                self.limits.max_depth,
            ));
        }
        Err(SchemaError::invalid_schema_specification(
            uri_name(document),
            pointer.to_string(),
            result,
        ))
    }

    fn compile(
        &mut self,
        value: &Value,
        document: &Document,
        pointer: &Pointer,
        depth: usize,
    ) -> Result<SchemaId, SchemaError> {
        let key = location(document, pointer);
        if let Some(id) = self.memo.get(&key) {
            trace!(pointer = %pointer, "schema location reused");
            return Ok(*id);
        }
        if depth > self.limits.max_depth {
            return Err(SchemaError::depth_limit_exceeded(
                uri_name(document),
                pointer.to_string(),
                self.limits.max_depth,
            ));
        }
        if value.is_reference() {
            return self.compile_reference(value, key, document, depth);
        }

        let id = self.builder.allocate();
        self.memo.insert(key, id);
        let mut node = Node {
            compiler: self,
            value,
            document,
            pointer,
            depth,
            id,
        };
        node.compile_type();
        node.compile_numeric();
        node.compile_string()?;
        node.compile_array()?;
        node.compile_object()?;
        node.compile_enum();
        node.compile_combinators()?;
        node.compile_annotations();
        Ok(id)
    }

    /// A reference compiles to the schema of the value its chain of references ends on;
    /// the keywords next to `$ref` are ignored.
    fn compile_reference(
        &mut self,
        reference: &Value,
        key: Location,
        document: &Document,
        depth: usize,
    ) -> Result<SchemaId, SchemaError> {
        let target = self.resolver.resolve(reference, document)?;
        if self
            .memo
            .contains_key(&location(target.document(), target.pointer()))
        {
            trace!(reference = ?reference.reference(), "schema reference closes a cycle");
        } else {
            self.check(target.value(), target.document(), target.pointer())?;
        }
        let id = self.compile(
            target.value(),
            target.document(),
            target.pointer(),
            depth + 1,
        )?;
        self.memo.insert(key, id);
        Ok(id)
    }
}

/// The compilation of the keywords of a single schema object.
struct Node<'c, 'a> {
    compiler: &'c mut Compiler<'a>,
    value: &'c Value,
    document: &'c Document,
    pointer: &'c Pointer,
    depth: usize,
    id: SchemaId,
}

impl Node<'_, '_> {
    fn get(&self, keyword: &str) -> Option<Value> {
        self.value.get(keyword)
    }

    fn flag(&self, keyword: &str) -> bool {
        self.get(keyword).and_then(|v| v.as_bool()) == Some(true)
    }

    fn count(&self, keyword: &str) -> Option<usize> {
        self.get(keyword).as_ref().and_then(count)
    }

    fn push(&mut self, constraint: Constraint) {
        self.compiler.builder.push_constraint(self.id, constraint);
    }

    fn child(&mut self, value: &Value, pointer: &Pointer) -> Result<SchemaId, SchemaError> {
        self.compiler
            .compile(value, self.document, pointer, self.depth + 1)
    }

    /// Compiles the schema at `keyword`.
    fn keyword_schema(&mut self, keyword: &str) -> Result<Option<SchemaId>, SchemaError> {
        let Some(value) = self.get(keyword) else {
            return Ok(None);
        };
        let pointer = self.pointer.child(keyword);
        self.child(&value, &pointer).map(Some)
    }

    /// Compiles each schema of the array at `keyword`.
    fn keyword_schemas(&mut self, keyword: &str) -> Result<Option<Vec<SchemaId>>, SchemaError> {
        let Some(value) = self.get(keyword) else {
            return Ok(None);
        };
        let pointer = self.pointer.child(keyword);
        value
            .elements()
            .enumerate()
            .map(|(i, element)| self.child(&element, &pointer.child_index(i)))
            .collect::<Result<_, _>>()
            .map(Some)
    }

    /// `additionalItems` and `additionalProperties`: `false` forbids, a schema restricts.
    fn additional(&mut self, keyword: &str) -> Result<Option<SchemaId>, SchemaError> {
        match self.get(keyword) {
            Some(value) if value.as_bool() == Some(false) => {
                Ok(Some(self.compiler.builder.never()))
            }
            Some(value) if value.is_object() => self.keyword_schema(keyword),
            _ => Ok(None),
        }
    }

    fn regex(&self, pattern: &str, pointer: &Pointer) -> Result<Regex, SchemaError> {
        let invalid = |message: String| {
            SchemaError::invalid_pattern(
                uri_name(self.document),
                pointer.to_string(),
                pattern,
                message,
            )
        };
        if pattern.len() > self.compiler.limits.max_regex_length {
            return Err(invalid(format!(
                "the pattern is longer than {} bytes",
                self.compiler.limits.max_regex_length
            )));
        }
        Regex::new(pattern).map_err(|e| invalid(e.to_string()))
    }

    fn compile_type(&mut self) {
        let Some(value) = self.get("type") else {
            return;
        };
        let kinds = match value.kind() {
            ValueKind::String => value
                .as_str()
                .and_then(TypeKind::from_name)
                .into_iter()
                .collect(),
            _ => value
                .elements()
                .filter_map(|kind| kind.as_str().and_then(TypeKind::from_name))
                .collect(),
        };
        self.push(Constraint::Type(kinds));
    }

    fn compile_numeric(&mut self) {
        if let Some(value) = self.get("minimum").and_then(|v| v.as_f64()) {
            let exclusive = self.flag("exclusiveMinimum");
            self.push(Constraint::Minimum { value, exclusive });
        }
        if let Some(value) = self.get("maximum").and_then(|v| v.as_f64()) {
            let exclusive = self.flag("exclusiveMaximum");
            self.push(Constraint::Maximum { value, exclusive });
        }
        if let Some(quantity) = self.get("multipleOf").and_then(|v| v.as_f64()) {
            self.push(Constraint::MultipleOf(quantity));
        }
    }

    fn compile_string(&mut self) -> Result<(), SchemaError> {
        if let Some(length) = self.count("minLength") {
            self.push(Constraint::MinimumLength(length));
        }
        if let Some(length) = self.count("maxLength") {
            self.push(Constraint::MaximumLength(length));
        }
        if let Some(pattern) = self.get("pattern") {
            if let Some(pattern) = pattern.as_str() {
                let regex = self.regex(pattern, &self.pointer.child("pattern"))?;
                self.push(Constraint::Pattern(regex));
            }
        }
        if let Some(value) = self.date_time("formatMinimum") {
            let exclusive = self.flag("formatExclusiveMinimum");
            self.push(Constraint::MinimumDateTime { value, exclusive });
        }
        if let Some(value) = self.date_time("formatMaximum") {
            let exclusive = self.flag("formatExclusiveMaximum");
            self.push(Constraint::MaximumDateTime { value, exclusive });
        }
        if let Some(format) = self
            .get("format")
            .and_then(|v| v.as_str().and_then(FormatKind::from_name))
        {
            self.push(Constraint::Format(format));
        }
        Ok(())
    }

    fn date_time(&self, keyword: &str) -> Option<oxsdatatypes::DateTime> {
        self.get(keyword)
            .and_then(|v| v.as_str().and_then(parse_date_time))
    }

    fn compile_array(&mut self) -> Result<(), SchemaError> {
        if let Some(count) = self.count("minItems") {
            self.push(Constraint::MinimumItems(count));
        }
        if let Some(count) = self.count("maxItems") {
            self.push(Constraint::MaximumItems(count));
        }
        if self.flag("uniqueItems") {
            self.push(Constraint::UniqueItems);
        }
        if let Some(items) = self.get("items") {
            let items = if items.is_array() {
                let additional = self.additional("additionalItems")?;
                let schemas = self.keyword_schemas("items")?.unwrap_or_default();
                (ItemsSchema::Tuple(schemas), additional)
            } else {
                let schema = self.keyword_schema("items")?.unwrap_or(SchemaId::EMPTY);
                (ItemsSchema::Single(schema), None)
            };
            self.push(Constraint::Items {
                items: items.0,
                additional: items.1,
            });
        }
        Ok(())
    }

    fn compile_object(&mut self) -> Result<(), SchemaError> {
        if let Some(count) = self.count("minProperties") {
            self.push(Constraint::MinimumProperties(count));
        }
        if let Some(count) = self.count("maxProperties") {
            self.push(Constraint::MaximumProperties(count));
        }
        let declared = self.get("properties");
        let patterns = self.get("patternProperties");
        let additional = self.additional("additionalProperties")?;
        if declared.is_some() || patterns.is_some() || additional.is_some() {
            let mut properties = Vec::new();
            if let Some(declared) = declared {
                let pointer = self.pointer.child("properties");
                for (name, schema) in declared.members() {
                    let id = self.child(&schema, &pointer.child(name))?;
                    properties.push((name.to_owned(), id));
                }
            }
            let mut pattern_properties = Vec::new();
            if let Some(patterns) = patterns {
                let pointer = self.pointer.child("patternProperties");
                for (pattern, schema) in patterns.members() {
                    let member_pointer = pointer.child(pattern);
                    let regex = self.regex(pattern, &member_pointer)?;
                    let id = self.child(&schema, &member_pointer)?;
                    pattern_properties.push((regex, id));
                }
            }
            self.push(Constraint::Properties {
                properties,
                pattern_properties,
                additional,
            });
        }
        if let Some(required) = self.get("required") {
            let names = required
                .elements()
                .filter_map(|name| name.as_str().map(str::to_owned))
                .collect();
            self.push(Constraint::Required(names));
        }
        Ok(())
    }

    fn compile_enum(&mut self) {
        if let Some(values) = self.get("enum") {
            self.push(Constraint::Enum(values.elements().collect()));
        }
    }

    fn compile_combinators(&mut self) -> Result<(), SchemaError> {
        if let Some(schemas) = self.keyword_schemas("allOf")? {
            self.push(Constraint::AllOf(schemas));
        }
        if let Some(schemas) = self.keyword_schemas("anyOf")? {
            self.push(Constraint::AnyOf(schemas));
        }
        if let Some(schemas) = self.keyword_schemas("oneOf")? {
            self.push(Constraint::OneOf(schemas));
        }
        if let Some(schema) = self.keyword_schema("not")? {
            self.push(Constraint::Not(schema));
        }
        Ok(())
    }

    fn compile_annotations(&mut self) {
        if let Some(default) = self.get("default") {
            self.compiler.builder.set_default(self.id, default);
        }
        if let Some(title) = self.get("title") {
            if let Some(title) = title.as_str() {
                self.compiler.builder.set_title(self.id, title);
            }
        }
        if let Some(description) = self.get("description") {
            if let Some(description) = description.as_str() {
                self.compiler.builder.set_description(self.id, description);
            }
        }
    }
}

/// A non-negative integral number, as used by the length and count keywords.
#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn count(value: &Value) -> Option<usize> {
    if let Some(i) = value.as_i64() {
        return usize::try_from(i).ok();
    }
    value
        .as_f64()
        .filter(|n| n.is_finite() && *n >= 0.0 && n.fract() == 0.0)
        .map(|n| n as usize)
}
