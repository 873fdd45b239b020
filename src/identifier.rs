//! Resource identifier codec: `{type, id}` <-> resources.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::error::DecodeError;
use crate::format::format_type_name;
use crate::types::{
    json_type_name, CaseConvention, Direction, IdKind, ResourceHandle, ResourceIdentifier,
    ResourceSchema,
};

/// Primary key after coercion to the type the store expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceId {
    Integer(i64),
    String(String),
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceId::Integer(n) => write!(f, "{}", n),
            ResourceId::String(s) => f.write_str(s),
        }
    }
}

/// Backing-store lookup used to resolve identifiers.
pub trait ResourceStore {
    /// Fetch a resource, `None` when no resource of that type has the id.
    fn get(&self, type_name: &str, id: &ResourceId) -> Option<ResourceHandle>;
}

/// In-memory store keyed by type and id.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    resources: BTreeMap<(String, String), ResourceHandle>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handle: ResourceHandle) {
        self.resources
            .insert((handle.type_name.clone(), handle.id.clone()), handle);
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl FromIterator<ResourceHandle> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = ResourceHandle>>(iter: I) -> Self {
        let mut store = MemoryStore::new();
        for handle in iter {
            store.insert(handle);
        }
        store
    }
}

impl ResourceStore for MemoryStore {
    fn get(&self, type_name: &str, id: &ResourceId) -> Option<ResourceHandle> {
        self.resources
            .get(&(type_name.to_string(), id.to_string()))
            .cloned()
    }
}

/// Encode a resource as its wire identifier. Always succeeds.
pub fn encode(handle: &ResourceHandle, convention: CaseConvention) -> ResourceIdentifier {
    ResourceIdentifier {
        type_name: format_type_name(&handle.type_name, Direction::ToWire, convention),
        id: handle.id.clone(),
    }
}

/// Resolve a wire identifier against the schema it must belong to.
///
/// # Errors
///
/// `IncorrectType` when the type does not match the schema, `InvalidIdFormat`
/// when the id cannot be coerced to the schema's id kind, `NotFound` when
/// the store has no such resource.
pub fn decode(
    identifier: &ResourceIdentifier,
    expected: &ResourceSchema,
    store: &dyn ResourceStore,
    convention: CaseConvention,
) -> Result<ResourceHandle, DecodeError> {
    let received = format_type_name(&identifier.type_name, Direction::FromWire, convention);
    if received != expected.type_name {
        return Err(DecodeError::IncorrectType {
            expected: format_type_name(&expected.type_name, Direction::ToWire, convention),
            received: identifier.type_name.clone(),
        });
    }

    let id = coerce_id(&identifier.id, expected.id)?;
    debug!(type_name = %expected.type_name, %id, "Resolving identifier");

    store
        .get(&expected.type_name, &id)
        .ok_or_else(|| DecodeError::NotFound {
            type_name: expected.type_name.clone(),
            id: identifier.id.clone(),
        })
}

/// Like [`decode`], but starting from an unparsed JSON identifier object.
///
/// Numeric ids are accepted as well as strings; any other id type is an
/// `InvalidIdFormat` error naming the received JSON type.
pub fn decode_value(
    value: &Value,
    expected: &ResourceSchema,
    store: &dyn ResourceStore,
    convention: CaseConvention,
) -> Result<ResourceHandle, DecodeError> {
    let identifier = identifier_from_value(value, expected.id)?;
    decode(&identifier, expected, store, convention)
}

fn identifier_from_value(value: &Value, kind: IdKind) -> Result<ResourceIdentifier, DecodeError> {
    let type_name = match value.get("type") {
        Some(Value::String(s)) => s.clone(),
        _ => {
            return Err(DecodeError::MissingMember {
                member: "type".to_string(),
            })
        }
    };
    let id = match value.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(DecodeError::InvalidIdFormat {
                expected: kind.as_str().to_string(),
                received: json_type_name(other).to_string(),
            })
        }
        None => {
            return Err(DecodeError::MissingMember {
                member: "id".to_string(),
            })
        }
    };
    Ok(ResourceIdentifier { type_name, id })
}

/// Coerce a wire id to the key type the store expects.
pub fn coerce_id(raw: &str, kind: IdKind) -> Result<ResourceId, DecodeError> {
    match kind {
        IdKind::String => Ok(ResourceId::String(raw.to_string())),
        IdKind::Integer => raw
            .trim()
            .parse::<i64>()
            .map(ResourceId::Integer)
            .map_err(|_| DecodeError::InvalidIdFormat {
                expected: kind.as_str().to_string(),
                received: raw.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn users() -> ResourceSchema {
        ResourceSchema::new("users")
            .id_kind(IdKind::Integer)
            .attribute("first_name")
    }

    fn store() -> MemoryStore {
        [ResourceHandle::new("users", 1).with_attribute("first_name", json!("Miles"))]
            .into_iter()
            .collect()
    }

    #[test]
    fn encode_formats_type_and_stringifies_id() {
        let handle = ResourceHandle::new("blog_posts", 42);
        let ident = encode(&handle, CaseConvention::Camel);
        assert_eq!(ident, ResourceIdentifier::new("blogPosts", "42"));
    }

    #[test]
    fn decode_existing() {
        let ident = ResourceIdentifier::new("users", "1");
        let handle = decode(&ident, &users(), &store(), CaseConvention::Unchanged).unwrap();
        assert_eq!(handle.attributes["first_name"], "Miles");
    }

    #[test]
    fn decode_not_found_references_id() {
        let ident = ResourceIdentifier::new("users", "7");
        let err = decode(&ident, &users(), &store(), CaseConvention::Unchanged).unwrap_err();
        assert_eq!(
            err,
            DecodeError::NotFound {
                type_name: "users".into(),
                id: "7".into()
            }
        );
    }

    #[test]
    fn decode_incorrect_type() {
        let ident = ResourceIdentifier::new("posts", "1");
        let err = decode(&ident, &users(), &store(), CaseConvention::Unchanged).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::IncorrectType { ref expected, ref received }
                if expected == "users" && received == "posts"
        ));
    }

    #[test]
    fn incorrect_type_reports_wire_names() {
        let schema = ResourceSchema::new("blog_posts");
        let ident = ResourceIdentifier::new("users", "1");
        let err = decode(&ident, &schema, &store(), CaseConvention::Camel).unwrap_err();
        assert_eq!(
            err,
            DecodeError::IncorrectType {
                expected: "blogPosts".into(),
                received: "users".into(),
            }
        );
    }

    #[test]
    fn decode_unformats_type_name() {
        let schema = ResourceSchema::new("blog_posts");
        let store: MemoryStore = [ResourceHandle::new("blog_posts", "a")].into_iter().collect();
        let ident = ResourceIdentifier::new("blog-posts", "a");
        assert!(decode(&ident, &schema, &store, CaseConvention::Dash).is_ok());
    }

    #[test]
    fn decode_invalid_id_format() {
        let ident = ResourceIdentifier::new("users", "abc");
        let err = decode(&ident, &users(), &store(), CaseConvention::Unchanged).unwrap_err();
        assert_eq!(
            err,
            DecodeError::InvalidIdFormat {
                expected: "integer".into(),
                received: "abc".into()
            }
        );
    }

    #[test]
    fn decode_value_accepts_numeric_id() {
        let value = json!({ "type": "users", "id": 1 });
        assert!(decode_value(&value, &users(), &store(), CaseConvention::Unchanged).is_ok());
    }

    #[test]
    fn decode_value_rejects_non_scalar_id() {
        let value = json!({ "type": "users", "id": [1] });
        let err = decode_value(&value, &users(), &store(), CaseConvention::Unchanged).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidIdFormat { received, .. } if received == "array"));
    }

    #[test]
    fn decode_value_missing_members() {
        let err = decode_value(&json!({ "id": "1" }), &users(), &store(), CaseConvention::Unchanged)
            .unwrap_err();
        assert_eq!(
            err,
            DecodeError::MissingMember {
                member: "type".into()
            }
        );
        let err = decode_value(&json!("users"), &users(), &store(), CaseConvention::Unchanged)
            .unwrap_err();
        assert!(matches!(err, DecodeError::MissingMember { .. }));
    }

    #[test]
    fn string_ids_pass_through() {
        assert_eq!(
            coerce_id("abc", IdKind::String).unwrap(),
            ResourceId::String("abc".into())
        );
        assert_eq!(coerce_id("12", IdKind::Integer).unwrap(), ResourceId::Integer(12));
    }
}
