//! JSON Schema dereferencing
//!
//! Inlines `$ref` pointers in a JSON Schema document, producing a tree with
//! no references left. References may point to local definitions, to sibling
//! files on disk, or to documents served over HTTP.
//!
//! # Example
//!
//! ```
//! use schema_deref::{resolve, FileLoader, Schema};
//! use serde_json::json;
//!
//! let mut schema = Schema::from_value(
//!     json!({
//!         "definitions": { "Id": { "type": "string", "format": "uuid" } },
//!         "properties": {
//!             "id": { "$ref": "#/definitions/Id", "title": "Order id" }
//!         }
//!     }),
//!     "order.json",
//! )
//! .unwrap();
//!
//! let loader = FileLoader::new(".");
//! resolve(&mut schema, &loader, "order.json").unwrap();
//!
//! let id = &schema.properties().unwrap()["id"];
//! assert_eq!(id["format"], "uuid");
//! assert_eq!(id["title"], "Order id");
//! assert!(!schema.has_refs());
//! ```
//!
//! # Reference Forms
//!
//! | `$ref` | Resolved against |
//! |--------|------------------|
//! | `#/definitions/Name` | `definitions` of the document being walked |
//! | `nested/x.json` | directory of the document being walked |
//! | `nested/x.json#/definitions/Name` | `definitions` of `nested/x.json` |
//! | `https://host/x.json` | the URL itself |
//!
//! # Merge Policy
//!
//! The referenced schema's keywords overwrite the referencing node's, except
//! `title`, which is never taken from the referent: a node keeps its own
//! title, or stays untitled. Keywords the referent doesn't define stay on the
//! node.

mod check;
mod error;
mod loader;
mod location;
mod merge;
mod reference;
mod resolver;
mod schema;

pub use check::{check, check_file, CheckResult, Diagnostic, FileResult, FileStatus, Severity};
pub use error::{ErrorKind, ResolveError};
pub use loader::{load_schema, AutoLoader, FileLoader, SchemaLoader};
pub use location::{is_url, Location};
pub use merge::merge;
pub use reference::Reference;
pub use resolver::{
    resolve, resolve_document, resolve_document_with_options, resolve_value,
    resolve_value_with_options, resolve_with_options, ResolveOptions,
};
pub use schema::Schema;

#[cfg(feature = "remote")]
pub use loader::HttpLoader;
