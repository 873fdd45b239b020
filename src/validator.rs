//! Structural validation of inbound JSON:API documents.

use serde_json::{json, Value};

use crate::error::{SchemaError, ValidateError};

/// JSON Schema for the write-path document subset: a single primary
/// resource object with optional id, attributes and relationship linkage.
pub fn document_schema() -> Value {
    json!({
        "type": "object",
        "required": ["data"],
        "properties": {
            "data": {
                "type": "object",
                "required": ["type"],
                "properties": {
                    "type": { "type": "string", "minLength": 1 },
                    "id": { "type": ["string", "integer"] },
                    "attributes": { "type": "object" },
                    "relationships": {
                        "type": "object",
                        "additionalProperties": {
                            "type": "object",
                            "required": ["data"],
                            "properties": {
                                "data": {
                                    "oneOf": [
                                        { "type": "null" },
                                        { "$ref": "#/$defs/identifier" },
                                        {
                                            "type": "array",
                                            "items": { "$ref": "#/$defs/identifier" }
                                        }
                                    ]
                                }
                            }
                        }
                    }
                }
            }
        },
        "$defs": {
            "identifier": {
                "type": "object",
                "required": ["type", "id"],
                "properties": {
                    "type": { "type": "string", "minLength": 1 },
                    "id": { "type": ["string", "integer"] }
                }
            }
        }
    })
}

/// Validate a document against the bundled JSON:API subset schema.
///
/// # Errors
///
/// `ValidateError::Invalid` listing every structural problem found.
pub fn validate_document(document: &Value) -> Result<(), ValidateError> {
    validate_against_schema(&document_schema(), document)
}

/// Validate a payload against an arbitrary JSON Schema.
pub fn validate_against_schema(schema: &Value, payload: &Value) -> Result<(), ValidateError> {
    let validator = jsonschema::validator_for(schema).map_err(|e| ValidateError::InvalidSchema {
        message: e.to_string(),
    })?;

    let errors: Vec<SchemaError> = validator
        .iter_errors(payload)
        .map(|e| SchemaError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidateError::Invalid { errors })
    }
}
