//! JSON:API document shaping
//!
//! Turns resources into JSON:API documents and back, independent of any web
//! framework: sparse fieldsets, `include` validation, resource identifier
//! resolution and wire-case key formatting.
//!
//! # Example
//!
//! ```
//! use jsonapi_shape::{
//!     CaseConvention, Pipeline, QueryDirectives, ResourceHandle, ResourceSchema,
//!     SchemaRegistry, Settings,
//! };
//! use serde_json::json;
//!
//! let registry = SchemaRegistry::new([ResourceSchema::new("users")
//!     .attribute("first_name")
//!     .attribute("email")])
//! .unwrap();
//! let settings = Settings::new().format_keys(CaseConvention::Camel);
//! let pipeline = Pipeline::new(&registry, &settings);
//!
//! let user = ResourceHandle::new("users", 1)
//!     .with_attribute("first_name", json!("Miles"))
//!     .with_attribute("email", json!("miles@example.com"));
//! let query = QueryDirectives::parse("fields[users]=firstName", settings.format_keys);
//!
//! let document = pipeline.render_resource(&user, &query).unwrap();
//! assert_eq!(
//!     document,
//!     json!({
//!         "data": {
//!             "type": "users",
//!             "id": "1",
//!             "attributes": { "firstName": "Miles" }
//!         }
//!     })
//! );
//! ```
//!
//! # Pipeline
//!
//! | Step | Read path (render) | Write path (parse) |
//! |------|--------------------|--------------------|
//! | 1 | `include` validated against the includable relationships | document shape validated |
//! | 2 | fieldset narrowed per type, protected fields kept | relationship identifiers resolved |
//! | 3 | only selected attributes fetched | attribute keys normalized from wire case |
//! | 4 | keys formatted to wire case | |
//!
//! # Case Conventions
//!
//! | Setting | Internal | Wire |
//! |---------|----------|------|
//! | `camelize` | `first_name` | `firstName` |
//! | `dasherize` | `first_name` | `first-name` |
//! | `underscore` | `first_name` | `first_name` |
//! | `unchanged` | `first_name` | `first_name` |

pub mod config;
mod document;
mod error;
mod fieldset;
mod format;
mod identifier;
mod include;
mod linter;
mod loader;
mod query;
mod registry;
mod types;
mod validator;

pub use config::Settings;
pub use document::{PageInfo, ParsedResource, Pipeline, Resource};
pub use error::{
    ConfigError, DecodeError, IncludeError, LoadError, ParseError, RegistryError, RenderError,
    SchemaError, ValidateError,
};
pub use fieldset::filter_fields;
pub use format::{camelize, dasherize, format_key, format_keys, format_type_name, underscore};
pub use identifier::{coerce_id, decode, decode_value, encode, MemoryStore, ResourceId, ResourceStore};
pub use include::validate_includes;
pub use linter::{lint, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity};
pub use loader::{is_url, load_json, load_json_auto, load_json_str};
pub use registry::SchemaRegistry;
pub use types::{
    json_type_name, CaseConvention, Direction, IdKind, QueryDirectives, Relationship,
    RelationshipData, ResourceHandle, ResourceIdentifier, ResourceSchema,
};
pub use validator::{document_schema, validate_against_schema, validate_document};

#[cfg(feature = "remote")]
pub use loader::load_json_url;
