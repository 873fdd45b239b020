//! Core types for JSON:API document shaping.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Name of the query parameter listing relationships to side-load.
pub const INCLUDE_PARAM: &str = "include";

/// Prefix of the sparse fieldset query parameter (`fields[<type>]`).
pub const FIELDS_PARAM: &str = "fields";

/// Identity field every rendered resource keeps regardless of sparse fieldsets.
pub const ID_FIELD: &str = "id";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Naming convention used for member names on the wire.
///
/// Internal names are always snake_case; the convention decides what the
/// client sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CaseConvention {
    /// `first_name` <-> `firstName`
    #[serde(rename = "camelize", alias = "camel")]
    Camel,
    /// `first_name` <-> `first-name`
    #[serde(rename = "dasherize", alias = "dash")]
    Dash,
    /// `first_name` <-> `first_name`
    #[serde(rename = "underscore")]
    Underscore,
    /// Keys are passed through untouched in both directions.
    #[default]
    #[serde(rename = "unchanged")]
    Unchanged,
}

impl CaseConvention {
    /// All conventions, in setting order.
    pub const ALL: [CaseConvention; 4] = [
        CaseConvention::Camel,
        CaseConvention::Dash,
        CaseConvention::Underscore,
        CaseConvention::Unchanged,
    ];

    /// Parse a convention from its setting value.
    ///
    /// Returns `None` for unknown values (caller should error).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "camelize" | "camel" => Some(CaseConvention::Camel),
            "dasherize" | "dash" => Some(CaseConvention::Dash),
            "underscore" => Some(CaseConvention::Underscore),
            "unchanged" => Some(CaseConvention::Unchanged),
            _ => None,
        }
    }

    /// The setting value for this convention.
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseConvention::Camel => "camelize",
            CaseConvention::Dash => "dasherize",
            CaseConvention::Underscore => "underscore",
            CaseConvention::Unchanged => "unchanged",
        }
    }
}

impl std::fmt::Display for CaseConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a key transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Internal names to wire names (rendering).
    ToWire,
    /// Wire names to internal names (parsing).
    FromWire,
}

/// Key type a store expects for resource ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdKind {
    #[default]
    String,
    Integer,
}

impl IdKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdKind::String => "string",
            IdKind::Integer => "integer",
        }
    }
}

/// A declared relationship of a resource type.
///
/// The target is held by type name and resolved through the registry, so
/// schemas may reference each other cyclically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Type name of the related resource.
    pub target: String,
    /// True for to-many relationships.
    #[serde(default)]
    pub many: bool,
}

/// Static description of one resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSchema {
    /// Stable wire identifier, in internal (snake_case) form.
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub id: IdKind,
    #[serde(default)]
    pub attributes: BTreeSet<String>,
    #[serde(default)]
    pub relationships: BTreeMap<String, Relationship>,
    /// Relationships clients may side-load. `None` means the resource does
    /// not support `include` at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub includable: Option<BTreeSet<String>>,
}

impl ResourceSchema {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: IdKind::default(),
            attributes: BTreeSet::new(),
            relationships: BTreeMap::new(),
            includable: None,
        }
    }

    pub fn id_kind(mut self, id: IdKind) -> Self {
        self.id = id;
        self
    }

    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.insert(name.into());
        self
    }

    pub fn to_one(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.relationships.insert(
            name.into(),
            Relationship {
                target: target.into(),
                many: false,
            },
        );
        self
    }

    pub fn to_many(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.relationships.insert(
            name.into(),
            Relationship {
                target: target.into(),
                many: true,
            },
        );
        self
    }

    /// Declare a relationship as includable.
    pub fn includable(mut self, name: impl Into<String>) -> Self {
        self.includable
            .get_or_insert_with(BTreeSet::new)
            .insert(name.into());
        self
    }

    /// Every serializable field: attributes, relationships and the id.
    pub fn field_names(&self) -> BTreeSet<String> {
        let mut fields: BTreeSet<String> = self.attributes.iter().cloned().collect();
        fields.extend(self.relationships.keys().cloned());
        fields.insert(ID_FIELD.to_string());
        fields
    }

    /// The declared-includable mapping, or `None` when the schema declares
    /// no includable relationships.
    pub fn includable_relations(&self) -> Option<BTreeMap<&str, &Relationship>> {
        let names = self.includable.as_ref()?;
        Some(
            names
                .iter()
                .filter_map(|name| {
                    self.relationships
                        .get(name)
                        .map(|rel| (name.as_str(), rel))
                })
                .collect(),
        )
    }
}

/// Linkage of a relationship on a concrete resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    ToMany(Vec<ResourceHandle>),
    ToOne(Option<Box<ResourceHandle>>),
}

impl RelationshipData {
    /// Related resources, in linkage order.
    pub fn handles(&self) -> Vec<&ResourceHandle> {
        match self {
            RelationshipData::ToMany(items) => items.iter().collect(),
            RelationshipData::ToOne(Some(item)) => vec![item.as_ref()],
            RelationshipData::ToOne(None) => Vec::new(),
        }
    }
}

/// A concrete resource instance as handed over by the data layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceHandle {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub relationships: BTreeMap<String, RelationshipData>,
}

impl ResourceHandle {
    pub fn new(type_name: impl Into<String>, id: impl ToString) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.to_string(),
            attributes: Map::new(),
            relationships: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn with_relationship(mut self, name: impl Into<String>, data: RelationshipData) -> Self {
        self.relationships.insert(name.into(), data);
        self
    }
}

/// Accepts ids given either as JSON strings or numbers.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            json_type_name(&other)
        ))),
    }
}

/// The wire-format `{type, id}` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub type_name: String,
    pub id: String,
}

impl ResourceIdentifier {
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.into(),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({ "type": self.type_name, "id": self.id })
    }
}

/// Per-request intent parsed from the query string.
///
/// Type names and field names are held in internal form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDirectives {
    pub sparse_fields: BTreeMap<String, BTreeSet<String>>,
    pub include_paths: BTreeSet<String>,
}

impl QueryDirectives {
    /// Requested fields for a type, if the request restricts it.
    pub fn fields_for(&self, type_name: &str) -> Option<&BTreeSet<String>> {
        self.sparse_fields.get(type_name)
    }

    pub fn with_fields<I, S>(mut self, type_name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sparse_fields
            .entry(type_name.into())
            .or_default()
            .extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn with_include(mut self, name: impl Into<String>) -> Self {
        self.include_paths.insert(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn convention_parse_valid() {
        assert_eq!(CaseConvention::parse("camelize"), Some(CaseConvention::Camel));
        assert_eq!(CaseConvention::parse("dasherize"), Some(CaseConvention::Dash));
        assert_eq!(
            CaseConvention::parse("underscore"),
            Some(CaseConvention::Underscore)
        );
        assert_eq!(
            CaseConvention::parse("unchanged"),
            Some(CaseConvention::Unchanged)
        );
        assert_eq!(CaseConvention::parse(" Camel "), Some(CaseConvention::Camel));
    }

    #[test]
    fn convention_parse_invalid() {
        assert_eq!(CaseConvention::parse("pascal"), None);
        assert_eq!(CaseConvention::parse(""), None);
    }

    #[test]
    fn convention_deserializes_from_setting_value() {
        let c: CaseConvention = serde_json::from_value(json!("dasherize")).unwrap();
        assert_eq!(c, CaseConvention::Dash);
        assert_eq!(CaseConvention::Dash.to_string(), "dasherize");
    }

    #[test]
    fn schema_field_names_include_id() {
        let schema = ResourceSchema::new("users")
            .attribute("first_name")
            .to_many("comments", "comments");
        let fields = schema.field_names();
        assert!(fields.contains("id"));
        assert!(fields.contains("first_name"));
        assert!(fields.contains("comments"));
    }

    #[test]
    fn includable_relations_absent_when_undeclared() {
        let schema = ResourceSchema::new("users").to_many("comments", "comments");
        assert!(schema.includable_relations().is_none());

        let schema = schema.includable("comments");
        let rels = schema.includable_relations().unwrap();
        assert_eq!(rels["comments"].target, "comments");
    }

    #[test]
    fn handle_accepts_numeric_id() {
        let handle: ResourceHandle = serde_json::from_value(json!({
            "type": "users",
            "id": 7,
            "attributes": { "email": "a@b.c" }
        }))
        .unwrap();
        assert_eq!(handle.id, "7");
        assert_eq!(handle.attributes["email"], "a@b.c");
    }

    #[test]
    fn relationship_data_shapes() {
        let many: RelationshipData =
            serde_json::from_value(json!([{ "type": "comments", "id": "1" }])).unwrap();
        assert_eq!(many.handles().len(), 1);

        let none: RelationshipData = serde_json::from_value(json!(null)).unwrap();
        assert_eq!(none, RelationshipData::ToOne(None));
        assert!(none.handles().is_empty());

        let one: RelationshipData =
            serde_json::from_value(json!({ "type": "users", "id": "2" })).unwrap();
        assert_eq!(one.handles()[0].id, "2");
    }
}
