//! Error types for document shaping, parsing and loading.

use std::path::PathBuf;

use serde_json::{json, Value};
use thiserror::Error;

/// Errors while loading JSON input.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            LoadError::InvalidJson { .. } => 2,
        }
    }
}

/// Errors in process-wide configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown case convention \"{value}\": expected camelize, dasherize, underscore, or unchanged")]
    UnknownConvention { value: String },

    #[error("settings already installed")]
    AlreadyInstalled,
}

impl ConfigError {
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Errors while building the schema registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid registry: {source}")]
    InvalidRegistry {
        #[source]
        source: serde_json::Error,
    },

    #[error("resource type \"{type_name}\" registered more than once")]
    DuplicateType { type_name: String },

    #[error("unknown resource type \"{type_name}\"")]
    UnknownType { type_name: String },

    #[error("relationship \"{type_name}.{relationship}\" targets unregistered type \"{target}\"")]
    UnknownTarget {
        type_name: String,
        relationship: String,
        target: String,
    },

    #[error("\"{type_name}\" declares \"{name}\" includable but has no such relationship")]
    IncludableNotRelationship { type_name: String, name: String },

    #[error("\"{type_name}\" uses \"{name}\" as both attribute and relationship")]
    FieldClash { type_name: String, name: String },
}

impl RegistryError {
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Errors while resolving a resource identifier to a resource.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Incorrect model type. Expected {expected}, received {received}.")]
    IncorrectType { expected: String, received: String },

    #[error("Invalid pk \"{id}\" - object of type {type_name} does not exist.")]
    NotFound { type_name: String, id: String },

    #[error("Incorrect type. Expected {expected} pk value, received {received}.")]
    InvalidIdFormat { expected: String, received: String },

    #[error("resource identifier is missing \"{member}\"")]
    MissingMember { member: String },
}

impl DecodeError {
    fn code(&self) -> &'static str {
        match self {
            DecodeError::IncorrectType { .. } => "incorrect_type",
            DecodeError::NotFound { .. } => "not_found",
            DecodeError::InvalidIdFormat { .. } => "invalid_id_format",
            DecodeError::MissingMember { .. } => "missing_member",
        }
    }

    /// JSON:API error object pointing at `pointer` in the request body.
    pub fn error_object(&self, pointer: &str) -> Value {
        json!({
            "code": self.code(),
            "detail": self.to_string(),
            "source": { "pointer": pointer }
        })
    }
}

/// Errors while validating the `include` parameter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IncludeError {
    #[error("This endpoint does not support the include parameter (resource type {resource_type})")]
    IncludeNotSupported { resource_type: String },

    #[error("This endpoint does not support the include parameter for field(s) {}", fields.join(", "))]
    IncludeFieldNotSupported {
        resource_type: String,
        fields: Vec<String>,
    },
}

impl IncludeError {
    /// One JSON:API error object per offending name.
    pub fn error_objects(&self) -> Vec<Value> {
        match self {
            IncludeError::IncludeNotSupported { .. } => vec![json!({
                "code": "include_not_supported",
                "detail": self.to_string(),
                "source": { "parameter": crate::types::INCLUDE_PARAM }
            })],
            IncludeError::IncludeFieldNotSupported { fields, .. } => fields
                .iter()
                .map(|field| {
                    json!({
                        "code": "include_field_not_supported",
                        "detail": format!(
                            "This endpoint does not support the include parameter for field {}",
                            field
                        ),
                        "source": { "parameter": crate::types::INCLUDE_PARAM },
                        "meta": { "field": field }
                    })
                })
                .collect(),
        }
    }
}

/// Errors during structural validation of an inbound document.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },

    #[error("document invalid with {} error(s)", errors.len())]
    Invalid { errors: Vec<SchemaError> },
}

/// Single validation error with path context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SchemaError {
    /// JSON Pointer (RFC 6901) to the invalid member.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl ValidateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidateError::InvalidSchema { .. } => 2,
            ValidateError::Invalid { .. } => 1,
        }
    }

    pub fn error_objects(&self) -> Vec<Value> {
        match self {
            ValidateError::InvalidSchema { message } => vec![json!({
                "code": "invalid_schema",
                "detail": message
            })],
            ValidateError::Invalid { errors } => errors
                .iter()
                .map(|e| {
                    json!({
                        "code": "invalid_document",
                        "detail": e.message,
                        "source": { "pointer": e.path }
                    })
                })
                .collect(),
        }
    }
}

/// Errors while rendering a response document.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Include(#[from] IncludeError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("collection of \"{expected}\" contains a \"{received}\" resource")]
    MixedCollection { expected: String, received: String },

    #[error("invalid page link base \"{base_url}\": {source}")]
    InvalidBaseUrl {
        base_url: String,
        #[source]
        source: url::ParseError,
    },
}

impl RenderError {
    pub fn exit_code(&self) -> i32 {
        match self {
            RenderError::Include(_) => 1,
            RenderError::Registry(e) => e.exit_code(),
            RenderError::MixedCollection { .. } | RenderError::InvalidBaseUrl { .. } => 2,
        }
    }

    /// JSON:API `errors` document describing this failure.
    pub fn to_document(&self) -> Value {
        let errors = match self {
            RenderError::Include(e) => e.error_objects(),
            other => vec![json!({ "code": "render_failed", "detail": other.to_string() })],
        };
        json!({ "errors": errors })
    }
}

/// Errors while parsing an inbound document.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Validate(#[from] ValidateError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("{source}")]
    Decode {
        /// JSON Pointer to the offending identifier.
        pointer: String,
        #[source]
        source: DecodeError,
    },

    #[error("resource type \"{type_name}\" has no relationship \"{name}\"")]
    UnknownRelationship { type_name: String, name: String },

    #[error("relationship \"{name}\" expects {expected} linkage")]
    RelationshipShape { name: String, expected: String },

    #[error("\"{name}\" is given more than once after key normalization")]
    DuplicateMember {
        name: String,
        /// JSON Pointer to the later of the two members.
        pointer: String,
    },
}

impl ParseError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ParseError::Validate(e) => e.exit_code(),
            ParseError::Registry(e) => e.exit_code(),
            _ => 1,
        }
    }

    /// JSON:API `errors` document describing this failure.
    pub fn to_document(&self) -> Value {
        let errors = match self {
            ParseError::Validate(e) => e.error_objects(),
            ParseError::Decode { pointer, source } => vec![source.error_object(pointer)],
            ParseError::UnknownRelationship { name, .. } => vec![json!({
                "code": "unknown_relationship",
                "detail": self.to_string(),
                "source": { "pointer": format!("/data/relationships/{}", name) }
            })],
            ParseError::RelationshipShape { name, .. } => vec![json!({
                "code": "invalid_relationship",
                "detail": self.to_string(),
                "source": { "pointer": format!("/data/relationships/{}/data", name) }
            })],
            ParseError::DuplicateMember { pointer, .. } => vec![json!({
                "code": "duplicate_member",
                "detail": self.to_string(),
                "source": { "pointer": pointer }
            })],
            ParseError::Registry(e) => {
                vec![json!({ "code": "parse_failed", "detail": e.to_string() })]
            }
        };
        json!({ "errors": errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_exit_codes() {
        let err = LoadError::FileNotFound {
            path: PathBuf::from("test.json"),
        };
        assert_eq!(err.exit_code(), 3);

        let source = serde_json::from_str::<Value>("nope").unwrap_err();
        let err = LoadError::InvalidJson { source };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn decode_messages_carry_expected_and_received() {
        let err = DecodeError::IncorrectType {
            expected: "users".into(),
            received: "posts".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("users") && msg.contains("posts"));

        let err = DecodeError::InvalidIdFormat {
            expected: "integer".into(),
            received: "abc".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("integer") && msg.contains("abc"));

        let err = DecodeError::NotFound {
            type_name: "users".into(),
            id: "7".into(),
        };
        assert!(err.to_string().contains("\"7\""));
    }

    #[test]
    fn include_field_errors_are_reported_per_field() {
        let err = IncludeError::IncludeFieldNotSupported {
            resource_type: "users".into(),
            fields: vec!["posts".into(), "likes".into()],
        };
        let objects = err.error_objects();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0]["meta"]["field"], "posts");
        assert_eq!(objects[1]["source"]["parameter"], "include");
    }

    #[test]
    fn parse_error_document_points_at_identifier() {
        let err = ParseError::Decode {
            pointer: "/data/relationships/author/data".into(),
            source: DecodeError::NotFound {
                type_name: "users".into(),
                id: "7".into(),
            },
        };
        let doc = err.to_document();
        assert_eq!(doc["errors"][0]["code"], "not_found");
        assert_eq!(
            doc["errors"][0]["source"]["pointer"],
            "/data/relationships/author/data"
        );
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn schema_error_display() {
        let err = SchemaError {
            path: "/data/type".into(),
            message: "expected string, got number".into(),
        };
        assert_eq!(err.to_string(), "/data/type: expected string, got number");
    }
}
