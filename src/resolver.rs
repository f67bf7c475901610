//! Reference resolution - inlines every `$ref` in a schema tree.
//!
//! The walk is depth-first and synchronous. Each node's `$ref` is resolved
//! first (local definition or external document), merged into the node, and
//! then `properties`, `definitions` and `items` are walked using the location
//! the node's content now comes from.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::ResolveError;
use crate::loader::SchemaLoader;
use crate::location::Location;
use crate::merge::merge_into;
use crate::reference::Reference;
use crate::schema::{json_type_name, Schema, DEFINITIONS, ITEMS, PROPERTIES, REF};

/// Options for a resolution pass.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Reuse documents already loaded during the same pass instead of
    /// fetching them again. Nothing is kept between passes.
    pub cache: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self { cache: true }
    }
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable per-pass memoization of loaded documents.
    pub fn cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }
}

/// Resolve every `$ref` in `schema`, which was loaded from `location`.
///
/// External references are joined against the directory of `location` and
/// fetched through `loader`. On success no node in the tree carries `$ref`.
///
/// # Errors
///
/// Returns the first `ResolveError` encountered; the schema may be
/// partially rewritten in that case and should be discarded.
pub fn resolve(
    schema: &mut Schema,
    loader: &dyn SchemaLoader,
    location: &str,
) -> Result<(), ResolveError> {
    resolve_with_options(schema, loader, location, &ResolveOptions::default())
}

/// Like [`resolve`], with explicit options.
pub fn resolve_with_options(
    schema: &mut Schema,
    loader: &dyn SchemaLoader,
    location: &str,
    options: &ResolveOptions,
) -> Result<(), ResolveError> {
    Resolver::new(loader, options).run(schema.as_map_mut(), &Location::new(location))
}

/// Resolve a schema held as a generic JSON value.
///
/// # Errors
///
/// Returns `ResolveError::NotAnObject` if `value` isn't a JSON object, or
/// any error [`resolve`] can return.
pub fn resolve_value(
    value: &mut Value,
    loader: &dyn SchemaLoader,
    location: &str,
) -> Result<(), ResolveError> {
    resolve_value_with_options(value, loader, location, &ResolveOptions::default())
}

/// Like [`resolve_value`], with explicit options.
pub fn resolve_value_with_options(
    value: &mut Value,
    loader: &dyn SchemaLoader,
    location: &str,
    options: &ResolveOptions,
) -> Result<(), ResolveError> {
    match value {
        Value::Object(map) => Resolver::new(loader, options).run(map, &Location::new(location)),
        other => Err(ResolveError::NotAnObject {
            location: location.to_string(),
            actual: json_type_name(other).to_string(),
        }),
    }
}

/// Load the document at `location` through `loader` and resolve it.
///
/// # Errors
///
/// Returns any error from loading the root document, plus everything
/// [`resolve`] can return.
pub fn resolve_document(loader: &dyn SchemaLoader, location: &str) -> Result<Schema, ResolveError> {
    resolve_document_with_options(loader, location, &ResolveOptions::default())
}

/// Like [`resolve_document`], with explicit options.
pub fn resolve_document_with_options(
    loader: &dyn SchemaLoader,
    location: &str,
    options: &ResolveOptions,
) -> Result<Schema, ResolveError> {
    let mut schema = loader.load(&Location::new(location))?;
    resolve_with_options(&mut schema, loader, location, options)?;
    Ok(schema)
}

// --- Internal implementation ---

/// State for the document whose nodes are being walked.
struct Context<'d> {
    /// Unresolved `definitions` of the document, the target of local anchors.
    definitions: &'d Map<String, Value>,
    /// Where the current node's content was loaded from.
    location: Location,
}

struct Resolver<'l> {
    loader: &'l dyn SchemaLoader,
    cache: Option<HashMap<Location, Schema>>,
    /// Anchor keys of the references currently being resolved, outermost first.
    active: Vec<String>,
    fetches: usize,
}

impl<'l> Resolver<'l> {
    fn new(loader: &'l dyn SchemaLoader, options: &ResolveOptions) -> Self {
        Self {
            loader,
            cache: options.cache.then(HashMap::new),
            active: Vec::new(),
            fetches: 0,
        }
    }

    fn run(&mut self, root: &mut Map<String, Value>, location: &Location) -> Result<(), ResolveError> {
        tracing::debug!(%location, "resolving schema");

        self.enter(anchor_key(location, None))?;
        self.resolve_document(root, location)?;
        self.leave();

        tracing::debug!(%location, fetches = self.fetches, "schema resolved");
        Ok(())
    }

    /// Resolve a whole document; its own definitions become the anchor scope.
    fn resolve_document(
        &mut self,
        doc: &mut Map<String, Value>,
        location: &Location,
    ) -> Result<(), ResolveError> {
        let definitions = definitions_of(doc);
        let ctx = Context {
            definitions: &definitions,
            location: location.clone(),
        };
        self.resolve_node(doc, &ctx)
    }

    fn resolve_node(
        &mut self,
        node: &mut Map<String, Value>,
        ctx: &Context<'_>,
    ) -> Result<(), ResolveError> {
        tracing::trace!(location = %ctx.location, "entering node");

        let mut location = ctx.location.clone();

        if let Some(raw) = node.get(REF) {
            let raw = raw.as_str().ok_or_else(|| ResolveError::InvalidReference {
                location: location.to_string(),
                reference: raw.to_string(),
            })?;

            match Reference::parse(raw, location.as_str())? {
                Reference::Local { name } => {
                    let target = self.resolve_local(&name, ctx)?;
                    merge_into(node, target);
                }
                Reference::External { path, anchor } => {
                    let next = location.join(&path)?;
                    let target = self.resolve_external(&next, anchor.as_deref())?;
                    merge_into(node, target);
                    location = next;
                }
            }
        }

        let ctx = Context {
            definitions: ctx.definitions,
            location,
        };

        for keyword in [PROPERTIES, DEFINITIONS] {
            if let Some(Value::Object(children)) = node.get_mut(keyword) {
                for child in children.values_mut() {
                    if let Value::Object(child) = child {
                        self.resolve_node(child, &ctx)?;
                    }
                }
            }
        }

        if let Some(Value::Object(items)) = node.get_mut(ITEMS) {
            self.resolve_node(items, &ctx)?;
        }

        Ok(())
    }

    /// Resolve `#/definitions/<name>` against the current document.
    fn resolve_local(
        &mut self,
        name: &str,
        ctx: &Context<'_>,
    ) -> Result<Map<String, Value>, ResolveError> {
        let key = anchor_key(&ctx.location, Some(name));

        let mut target = match ctx.definitions.get(name) {
            Some(Value::Object(definition)) => definition.clone(),
            Some(other) => {
                return Err(ResolveError::NotAnObject {
                    location: key,
                    actual: json_type_name(other).to_string(),
                })
            }
            None => {
                return Err(ResolveError::DefinitionNotFound {
                    name: name.to_string(),
                    location: ctx.location.to_string(),
                })
            }
        };

        tracing::debug!(reference = %key, "following local reference");

        self.enter(key)?;
        self.resolve_node(&mut target, ctx)?;
        self.leave();

        Ok(target)
    }

    /// Load the document at `location` and resolve it (or one of its
    /// definitions) against its own location.
    fn resolve_external(
        &mut self,
        location: &Location,
        anchor: Option<&str>,
    ) -> Result<Map<String, Value>, ResolveError> {
        tracing::debug!(reference = %anchor_key(location, anchor), "following external reference");

        if let Some(name) = anchor {
            let doc = self.load(location)?;
            let definitions = definitions_of(doc.as_map());
            let ctx = Context {
                definitions: &definitions,
                location: location.clone(),
            };
            return self.resolve_local(name, &ctx);
        }

        self.enter(anchor_key(location, None))?;
        let mut doc = self.load(location)?.into_map();
        self.resolve_document(&mut doc, location)?;
        self.leave();

        Ok(doc)
    }

    fn load(&mut self, location: &Location) -> Result<Schema, ResolveError> {
        if let Some(doc) = self.cache.as_ref().and_then(|cache| cache.get(location)) {
            tracing::debug!(%location, "reusing loaded document");
            return Ok(doc.clone());
        }

        let doc = self.loader.load(location)?;
        self.fetches += 1;

        if let Some(cache) = self.cache.as_mut() {
            cache.insert(location.clone(), doc.clone());
        }
        Ok(doc)
    }

    /// Mark a reference as in progress, failing if it already is.
    fn enter(&mut self, key: String) -> Result<(), ResolveError> {
        if let Some(start) = self.active.iter().position(|active| *active == key) {
            let mut chain = self.active[start..].to_vec();
            chain.push(key);
            return Err(ResolveError::CircularReference { chain });
        }
        self.active.push(key);
        Ok(())
    }

    fn leave(&mut self) {
        self.active.pop();
    }
}

/// Identity of a reference target: the document location plus an optional
/// definition name, so `#/definitions/A` inside `a.json` and
/// `a.json#/definitions/A` elsewhere map to the same key.
fn anchor_key(location: &Location, anchor: Option<&str>) -> String {
    Reference::External {
        path: location.to_string(),
        anchor: anchor.map(str::to_string),
    }
    .to_string()
}

fn definitions_of(doc: &Map<String, Value>) -> Map<String, Value> {
    doc.get(DEFINITIONS)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use serde_json::json;

    /// In-memory loader that records every location it is asked for.
    #[derive(Default)]
    struct MemoryLoader {
        docs: HashMap<String, Value>,
        calls: RefCell<Vec<String>>,
    }

    impl MemoryLoader {
        fn with(mut self, location: &str, doc: Value) -> Self {
            self.docs.insert(location.to_string(), doc);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl SchemaLoader for MemoryLoader {
        fn load(&self, location: &Location) -> Result<Schema, ResolveError> {
            self.calls.borrow_mut().push(location.to_string());
            let doc = self
                .docs
                .get(location.as_str())
                .ok_or_else(|| ResolveError::FileNotFound {
                    path: location.as_str().into(),
                })?;
            Schema::from_value(doc.clone(), location.as_str())
        }
    }

    fn schema(value: Value) -> Schema {
        Schema::from_value(value, "main.json").unwrap()
    }

    fn resolved(value: Value, loader: &MemoryLoader) -> Value {
        let mut s = schema(value);
        resolve(&mut s, loader, "main.json").unwrap();
        s.into_value()
    }

    // === Local Anchors ===

    #[test]
    fn resolve_local_anchor() {
        let result = resolved(
            json!({
                "definitions": { "Foo": { "type": "integer" } },
                "properties": { "a": { "$ref": "#/definitions/Foo" } }
            }),
            &MemoryLoader::default(),
        );

        assert_eq!(result["properties"]["a"], json!({ "type": "integer" }));
    }

    #[test]
    fn resolve_local_anchor_chain() {
        let result = resolved(
            json!({
                "definitions": {
                    "Id": { "$ref": "#/definitions/Uuid", "title": "Id" },
                    "Uuid": { "type": "string", "format": "uuid", "title": "Uuid" }
                },
                "properties": { "id": { "$ref": "#/definitions/Id" } }
            }),
            &MemoryLoader::default(),
        );

        let id = &result["properties"]["id"];
        assert_eq!(id["format"], "uuid");
        assert!(id.get("title").is_none());
        assert!(id.get("$ref").is_none());
        // Definitions themselves are resolved in place too
        assert!(result["definitions"]["Id"].get("$ref").is_none());
        assert_eq!(result["definitions"]["Id"]["title"], "Id");
    }

    #[test]
    fn resolve_missing_anchor_fails() {
        let mut s = schema(json!({
            "properties": { "a": { "$ref": "#/definitions/Missing" } }
        }));
        let result = resolve(&mut s, &MemoryLoader::default(), "main.json");

        assert!(matches!(
            result,
            Err(ResolveError::DefinitionNotFound { name, .. }) if name == "Missing"
        ));
    }

    #[test]
    fn resolve_items_and_title_override() {
        let result = resolved(
            json!({
                "definitions": { "Tag": { "title": "theirs", "type": "string" } },
                "type": "array",
                "items": { "$ref": "#/definitions/Tag", "title": "mine" }
            }),
            &MemoryLoader::default(),
        );

        assert_eq!(result["items"], json!({ "title": "mine", "type": "string" }));
    }

    #[test]
    fn resolve_leaves_untitled_node_untitled() {
        let result = resolved(
            json!({
                "definitions": { "X": { "title": "theirs", "type": "string" } },
                "properties": { "a": { "$ref": "#/definitions/X" } }
            }),
            &MemoryLoader::default(),
        );

        assert_eq!(result["properties"]["a"], json!({ "type": "string" }));
        // The definition keeps its own title
        assert_eq!(result["definitions"]["X"]["title"], "theirs");
    }

    #[test]
    fn resolve_non_string_ref_fails() {
        let mut s = schema(json!({ "properties": { "a": { "$ref": 42 } } }));
        let result = resolve(&mut s, &MemoryLoader::default(), "main.json");
        assert!(matches!(result, Err(ResolveError::InvalidReference { .. })));
    }

    // === External References ===

    #[test]
    fn resolve_external_chain_is_relative_to_referent() {
        let loader = MemoryLoader::default()
            .with(
                "nested/folder/example.json",
                json!({ "$ref": "./sibling.json" }),
            )
            .with(
                "nested/folder/sibling.json",
                json!({ "type": "boolean" }),
            );

        let result = resolved(json!({ "$ref": "nested/folder/example.json" }), &loader);

        assert_eq!(result, json!({ "type": "boolean" }));
        assert_eq!(
            loader.calls(),
            ["nested/folder/example.json", "nested/folder/sibling.json"]
        );
    }

    #[test]
    fn resolve_external_uses_referent_definitions() {
        let loader = MemoryLoader::default().with(
            "types/address.json",
            json!({
                "definitions": { "Line": { "type": "string", "maxLength": 80 } },
                "type": "object",
                "properties": { "street": { "$ref": "#/definitions/Line" } }
            }),
        );

        let result = resolved(
            json!({
                "definitions": { "Line": { "type": "integer" } },
                "properties": { "home": { "$ref": "types/address.json" } }
            }),
            &loader,
        );

        assert_eq!(result["properties"]["home"]["properties"]["street"]["maxLength"], 80);
    }

    #[test]
    fn resolve_external_anchor() {
        let loader = MemoryLoader::default().with(
            "common.json",
            json!({ "definitions": { "Money": { "type": "number", "minimum": 0 } } }),
        );

        let result = resolved(
            json!({ "properties": { "price": { "$ref": "common.json#/definitions/Money" } } }),
            &loader,
        );

        assert_eq!(result["properties"]["price"], json!({ "type": "number", "minimum": 0 }));
    }

    #[test]
    fn resolve_external_missing_document_fails() {
        let mut s = schema(json!({ "$ref": "missing.json" }));
        let result = resolve(&mut s, &MemoryLoader::default(), "main.json");
        assert!(matches!(result, Err(ResolveError::FileNotFound { .. })));
    }

    #[test]
    fn resolve_nested_refs_after_merge_use_new_location() {
        let loader = MemoryLoader::default()
            .with(
                "a/outer.json",
                json!({
                    "type": "object",
                    "properties": { "inner": { "$ref": "inner.json" } }
                }),
            )
            .with("a/inner.json", json!({ "type": "null" }));

        let result = resolved(json!({ "items": { "$ref": "a/outer.json" } }), &loader);
        assert_eq!(result["items"]["properties"]["inner"]["type"], "null");
    }

    // === Caching ===

    #[test]
    fn resolve_reuses_loaded_documents_within_a_pass() {
        let loader = MemoryLoader::default().with("shared.json", json!({ "type": "string" }));
        let doc = json!({
            "properties": {
                "a": { "$ref": "shared.json" },
                "b": { "$ref": "shared.json" }
            }
        });

        resolved(doc.clone(), &loader);
        assert_eq!(loader.calls(), ["shared.json"]);

        // A second pass starts with an empty cache
        resolved(doc, &loader);
        assert_eq!(loader.calls(), ["shared.json", "shared.json"]);
    }

    #[test]
    fn resolve_without_cache_fetches_every_time() {
        let loader = MemoryLoader::default().with("shared.json", json!({ "type": "string" }));
        let mut s = schema(json!({
            "properties": {
                "a": { "$ref": "shared.json" },
                "b": { "$ref": "shared.json" }
            }
        }));

        let options = ResolveOptions::new().cache(false);
        resolve_with_options(&mut s, &loader, "main.json", &options).unwrap();
        assert_eq!(loader.calls(), ["shared.json", "shared.json"]);
    }

    // === Cycles ===

    #[test]
    fn resolve_self_referential_definition_fails() {
        let mut s = schema(json!({
            "definitions": {
                "Node": {
                    "type": "object",
                    "properties": { "next": { "$ref": "#/definitions/Node" } }
                }
            },
            "properties": { "head": { "$ref": "#/definitions/Node" } }
        }));
        let result = resolve(&mut s, &MemoryLoader::default(), "main.json");

        assert!(matches!(result, Err(ResolveError::CircularReference { .. })));
    }

    #[test]
    fn resolve_mutual_external_refs_fail() {
        let loader = MemoryLoader::default()
            .with("a.json", json!({ "properties": { "b": { "$ref": "b.json" } } }))
            .with("b.json", json!({ "items": { "$ref": "a.json" } }));

        let mut s = schema(json!({ "$ref": "a.json" }));
        let result = resolve(&mut s, &loader, "main.json");

        match result {
            Err(ResolveError::CircularReference { chain }) => {
                assert_eq!(chain, ["a.json", "b.json", "a.json"]);
            }
            other => panic!("expected circular reference, got {:?}", other),
        }
    }

    #[test]
    fn resolve_shared_definition_is_not_a_cycle() {
        let result = resolved(
            json!({
                "definitions": {
                    "Name": { "type": "string" },
                    "Person": {
                        "properties": {
                            "first": { "$ref": "#/definitions/Name" },
                            "last": { "$ref": "#/definitions/Name" }
                        }
                    }
                },
                "properties": {
                    "owner": { "$ref": "#/definitions/Person" },
                    "tenant": { "$ref": "#/definitions/Person" }
                }
            }),
            &MemoryLoader::default(),
        );

        assert_eq!(result["properties"]["tenant"]["properties"]["last"]["type"], "string");
    }

    // === Entry Points ===

    #[test]
    fn resolve_without_refs_is_identity() {
        let doc = json!({
            "title": "Plain",
            "type": "object",
            "properties": { "a": { "type": "string" } },
            "definitions": { "B": { "type": "integer" } }
        });
        assert_eq!(resolved(doc.clone(), &MemoryLoader::default()), doc);
    }

    #[test]
    fn resolve_value_rejects_non_object() {
        let mut value = json!("string");
        let result = resolve_value(&mut value, &MemoryLoader::default(), "main.json");
        assert!(matches!(result, Err(ResolveError::NotAnObject { .. })));
    }

    #[test]
    fn resolve_document_loads_root_through_loader() {
        let loader = MemoryLoader::default()
            .with("schemas/main.json", json!({ "$ref": "types.json" }))
            .with("schemas/types.json", json!({ "type": "object" }));

        let doc = resolve_document(&loader, "schemas/main.json").unwrap();
        assert_eq!(doc.into_value(), json!({ "type": "object" }));
    }
}
