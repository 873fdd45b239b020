//! The per-request document pipeline.
//!
//! Rendering runs include validation, then sparse fieldset filtering, then
//! fetches only the selected attributes, and formats keys last. Parsing
//! validates the document shape, resolves relationship identifiers, then
//! normalizes attribute keys from wire case.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use url::Url;

use crate::config::Settings;
use crate::error::{DecodeError, ParseError, RenderError};
use crate::fieldset::filter_fields;
use crate::format::{format_key, format_keys, format_map, format_type_name};
use crate::identifier::{coerce_id, decode_value, encode, ResourceStore};
use crate::include::validate_includes;
use crate::registry::SchemaRegistry;
use crate::types::{
    Direction, QueryDirectives, RelationshipData, ResourceHandle, ResourceSchema,
};
use crate::validator::validate_document;

/// A resource the pipeline can render.
///
/// Attributes are requested one by one, and only for the fields that
/// survive sparse fieldset filtering, so implementors may compute them
/// lazily.
pub trait Resource {
    fn type_name(&self) -> &str;
    fn id(&self) -> String;
    fn attribute(&self, name: &str) -> Option<Value>;
    fn relationship(&self, name: &str) -> Option<RelationshipData>;
}

impl Resource for ResourceHandle {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn id(&self) -> String {
        self.id.clone()
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        self.attributes.get(name).cloned()
    }

    fn relationship(&self, name: &str) -> Option<RelationshipData> {
        self.relationships.get(name).cloned()
    }
}

/// Pagination state of a collection response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    /// Current page, 1-based.
    pub page: u64,
    /// Total number of pages.
    pub pages: u64,
    /// Total number of resources across all pages.
    pub count: u64,
    /// URL of the collection; the `page` query parameter is replaced.
    pub base_url: String,
}

/// A resource parsed from an inbound document, in internal form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedResource {
    #[serde(rename = "type")]
    pub type_name: String,
    /// Absent for create requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub attributes: Map<String, Value>,
    pub relationships: BTreeMap<String, RelationshipData>,
}

/// Side-loaded resources, deduplicated by `(type, id)`.
#[derive(Default)]
struct Included {
    seen: BTreeSet<(String, String)>,
    pending: Vec<ResourceHandle>,
}

/// Request/response document transformation bound to a registry and settings.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline<'a> {
    registry: &'a SchemaRegistry,
    settings: &'a Settings,
}

impl<'a> Pipeline<'a> {
    pub fn new(registry: &'a SchemaRegistry, settings: &'a Settings) -> Self {
        Self { registry, settings }
    }

    pub fn registry(&self) -> &'a SchemaRegistry {
        self.registry
    }

    pub fn settings(&self) -> &'a Settings {
        self.settings
    }

    /// Render a single resource as a JSON:API document.
    ///
    /// # Errors
    ///
    /// `RenderError::Include` when the include parameter names relationships
    /// the resource does not allow; nothing is rendered in that case.
    pub fn render_resource<R: Resource>(
        &self,
        resource: &R,
        directives: &QueryDirectives,
    ) -> Result<Value, RenderError> {
        let schema = self.registry.schema(resource.type_name())?;
        self.check_includes(schema, directives)?;

        let mut included = Included::default();
        included
            .seen
            .insert((schema.type_name.clone(), resource.id()));
        let data = self.resource_object(resource, schema, directives, Some(&mut included))?;

        let mut document = Map::new();
        document.insert("data".to_string(), data);
        self.finish(document, included, directives)
    }

    /// Render a collection of resources of one type.
    ///
    /// `type_name` is needed so that an empty collection still validates
    /// the include parameter.
    ///
    /// # Errors
    ///
    /// `RenderError::MixedCollection` when a resource is not of `type_name`,
    /// plus everything [`render_resource`](Self::render_resource) reports.
    pub fn render_collection<R: Resource>(
        &self,
        type_name: &str,
        resources: &[R],
        directives: &QueryDirectives,
        page: Option<&PageInfo>,
    ) -> Result<Value, RenderError> {
        let schema = self.registry.schema(type_name)?;
        if let Some(stray) = resources.iter().find(|r| r.type_name() != schema.type_name) {
            return Err(RenderError::MixedCollection {
                expected: schema.type_name.clone(),
                received: stray.type_name().to_string(),
            });
        }
        self.check_includes(schema, directives)?;

        let mut included = Included::default();
        for resource in resources {
            included
                .seen
                .insert((schema.type_name.clone(), resource.id()));
        }

        let mut data = Vec::with_capacity(resources.len());
        for resource in resources {
            data.push(self.resource_object(resource, schema, directives, Some(&mut included))?);
        }

        let mut document = Map::new();
        document.insert("data".to_string(), Value::Array(data));
        if let Some(page) = page {
            document.insert("links".to_string(), page_links(page)?);
            document.insert(
                "meta".to_string(),
                json!({
                    "pagination": {
                        "page": page.page,
                        "pages": page.pages,
                        "count": page.count
                    }
                }),
            );
        }

        info!(type_name, count = resources.len(), "Rendered collection");
        self.finish(document, included, directives)
    }

    /// Parse an inbound single-resource document for `expected_type`.
    ///
    /// # Errors
    ///
    /// Structural problems, a mismatched type, malformed ids, unknown
    /// relationships and unresolvable identifiers are all reported as
    /// `ParseError`.
    pub fn parse_document(
        &self,
        document: &Value,
        expected_type: &str,
        store: &dyn ResourceStore,
    ) -> Result<ParsedResource, ParseError> {
        validate_document(document)?;
        let schema = self.registry.schema(expected_type)?;
        let convention = self.settings.format_keys;
        let data = &document["data"];

        let wire_type = data["type"].as_str().unwrap_or_default();
        if format_type_name(wire_type, Direction::FromWire, convention) != schema.type_name {
            return Err(ParseError::Decode {
                pointer: "/data/type".to_string(),
                source: DecodeError::IncorrectType {
                    expected: format_type_name(&schema.type_name, Direction::ToWire, convention),
                    received: wire_type.to_string(),
                },
            });
        }

        let id = match &data["id"] {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        };
        if let Some(raw) = &id {
            coerce_id(raw, schema.id).map_err(|source| ParseError::Decode {
                pointer: "/data/id".to_string(),
                source,
            })?;
        }

        let mut relationships = BTreeMap::new();
        if let Some(wire_relationships) = data.get("relationships").and_then(Value::as_object) {
            for (wire_name, member) in wire_relationships {
                let name = format_key(wire_name, Direction::FromWire, convention);
                if relationships.contains_key(&name) {
                    return Err(ParseError::DuplicateMember {
                        name,
                        pointer: format!("/data/relationships/{}", wire_name),
                    });
                }
                let linkage = self.decode_relationship(schema, &name, wire_name, &member["data"], store)?;
                relationships.insert(name, linkage);
            }
        }

        let mut attributes = Map::new();
        if let Some(wire_attributes) = data.get("attributes").and_then(Value::as_object) {
            let mut seen = BTreeSet::new();
            for (wire_name, value) in wire_attributes {
                let name = format_key(wire_name, Direction::FromWire, convention);
                if !seen.insert(name.clone()) {
                    return Err(ParseError::DuplicateMember {
                        name,
                        pointer: format!("/data/attributes/{}", wire_name),
                    });
                }
                if schema.attributes.contains(&name) {
                    attributes.insert(name, format_keys(value, Direction::FromWire, convention));
                } else {
                    debug!(type_name = %schema.type_name, attribute = %name, "Ignoring unknown attribute");
                }
            }
        }

        debug!(type_name = %schema.type_name, ?id, "Parsed document");
        Ok(ParsedResource {
            type_name: schema.type_name.clone(),
            id,
            attributes,
            relationships,
        })
    }

    // --- Internal implementation ---

    fn check_includes(
        &self,
        schema: &ResourceSchema,
        directives: &QueryDirectives,
    ) -> Result<(), RenderError> {
        validate_includes(
            &schema.type_name,
            &directives.include_paths,
            schema.includable_relations().as_ref(),
        )
        .map_err(|e| {
            debug!(type_name = %schema.type_name, error = %e, "Include rejected");
            RenderError::from(e)
        })
    }

    /// Build one resource object. `included` is `Some` for primary data,
    /// where requested relationships are side-loaded.
    fn resource_object<R: Resource>(
        &self,
        resource: &R,
        schema: &ResourceSchema,
        directives: &QueryDirectives,
        mut included: Option<&mut Included>,
    ) -> Result<Value, RenderError> {
        let convention = self.settings.format_keys;
        let url_field = self.settings.url_field_name.as_str();
        let fields = filter_fields(
            &schema.field_names(),
            directives.fields_for(&schema.type_name),
            &self.settings.protected_fields(),
        );

        let mut attributes = Map::new();
        let mut links = Map::new();
        for name in schema.attributes.iter().filter(|name| fields.contains(*name)) {
            let Some(value) = resource.attribute(name) else {
                continue;
            };
            if name == url_field {
                links.insert("self".to_string(), value);
            } else {
                attributes.insert(name.clone(), value);
            }
        }

        let mut relationships = Map::new();
        for name in schema.relationships.keys() {
            let selected = fields.contains(name);
            let side_load = included.is_some() && directives.include_paths.contains(name);
            if !selected && !side_load {
                continue;
            }
            let Some(data) = resource.relationship(name) else {
                continue;
            };
            if side_load {
                if let Some(included) = included.as_deref_mut() {
                    included
                        .pending
                        .extend(data.handles().into_iter().cloned());
                }
            }
            if selected {
                relationships.insert(
                    format_key(name, Direction::ToWire, convention),
                    json!({ "data": linkage(&data, self.settings) }),
                );
            }
        }

        let mut object = Map::new();
        object.insert(
            "type".to_string(),
            Value::String(format_type_name(&schema.type_name, Direction::ToWire, convention)),
        );
        object.insert("id".to_string(), Value::String(resource.id()));
        object.insert(
            "attributes".to_string(),
            Value::Object(format_map(&attributes, Direction::ToWire, convention)),
        );
        if !relationships.is_empty() {
            object.insert("relationships".to_string(), Value::Object(relationships));
        }
        if !links.is_empty() {
            object.insert("links".to_string(), Value::Object(links));
        }
        Ok(Value::Object(object))
    }

    /// Render pending side-loads and attach them to the document.
    fn finish(
        &self,
        mut document: Map<String, Value>,
        included: Included,
        directives: &QueryDirectives,
    ) -> Result<Value, RenderError> {
        let Included { mut seen, pending } = included;
        let mut rendered = Vec::new();
        for handle in pending {
            if !seen.insert((handle.type_name.clone(), handle.id.clone())) {
                continue;
            }
            let schema = self.registry.schema(&handle.type_name)?;
            rendered.push(self.resource_object(&handle, schema, directives, None)?);
        }

        if !rendered.is_empty() {
            debug!(count = rendered.len(), "Side-loaded resources");
            document.insert("included".to_string(), Value::Array(rendered));
        }
        Ok(Value::Object(document))
    }

    fn decode_relationship(
        &self,
        schema: &ResourceSchema,
        name: &str,
        wire_name: &str,
        data: &Value,
        store: &dyn ResourceStore,
    ) -> Result<RelationshipData, ParseError> {
        let relationship =
            schema
                .relationships
                .get(name)
                .ok_or_else(|| ParseError::UnknownRelationship {
                    type_name: schema.type_name.clone(),
                    name: name.to_string(),
                })?;
        let target = self.registry.schema(&relationship.target)?;
        let convention = self.settings.format_keys;
        let pointer = format!("/data/relationships/{}/data", wire_name);

        match (relationship.many, data) {
            (false, Value::Null) => Ok(RelationshipData::ToOne(None)),
            (false, Value::Object(_)) => decode_value(data, target, store, convention)
                .map(|handle| RelationshipData::ToOne(Some(Box::new(handle))))
                .map_err(|source| ParseError::Decode { pointer, source }),
            (true, Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    decode_value(item, target, store, convention).map_err(|source| {
                        ParseError::Decode {
                            pointer: format!("{}/{}", pointer, i),
                            source,
                        }
                    })
                })
                .collect::<Result<Vec<_>, _>>()
                .map(RelationshipData::ToMany),
            (many, _) => Err(ParseError::RelationshipShape {
                name: name.to_string(),
                expected: if many { "to-many" } else { "to-one" }.to_string(),
            }),
        }
    }
}

/// Resource linkage for a relationship member.
fn linkage(data: &RelationshipData, settings: &Settings) -> Value {
    let convention = settings.format_keys;
    match data {
        RelationshipData::ToOne(None) => Value::Null,
        RelationshipData::ToOne(Some(handle)) => encode(handle, convention).to_value(),
        RelationshipData::ToMany(items) => Value::Array(
            items
                .iter()
                .map(|handle| encode(handle, convention).to_value())
                .collect(),
        ),
    }
}

/// `first`/`last`/`next`/`prev` links for a page.
fn page_links(page: &PageInfo) -> Result<Value, RenderError> {
    let base = Url::parse(&page.base_url).map_err(|source| RenderError::InvalidBaseUrl {
        base_url: page.base_url.clone(),
        source,
    })?;
    let last = page.pages.max(1);
    let link = |n: u64| Value::String(page_url(&base, n));
    let next = if page.page < last {
        link(page.page + 1)
    } else {
        Value::Null
    };
    let prev = if page.page > 1 {
        link(page.page - 1)
    } else {
        Value::Null
    };

    Ok(json!({
        "first": link(1),
        "last": link(last),
        "next": next,
        "prev": prev,
    }))
}

fn page_url(base: &Url, page: u64) -> String {
    let mut url = base.clone();
    let kept: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(key, _)| key != "page")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("page", &page.to_string());
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CaseConvention;
    use std::cell::RefCell;

    /// Records which attributes were fetched.
    struct Tracked {
        inner: ResourceHandle,
        fetched: RefCell<Vec<String>>,
    }

    impl Resource for Tracked {
        fn type_name(&self) -> &str {
            &self.inner.type_name
        }
        fn id(&self) -> String {
            self.inner.id.clone()
        }
        fn attribute(&self, name: &str) -> Option<Value> {
            self.fetched.borrow_mut().push(name.to_string());
            self.inner.attribute(name)
        }
        fn relationship(&self, name: &str) -> Option<RelationshipData> {
            self.inner.relationship(name)
        }
    }

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new([
            ResourceSchema::new("users")
                .attribute("first_name")
                .attribute("last_name")
                .attribute("email"),
        ])
        .unwrap()
    }

    #[test]
    fn unselected_attributes_are_never_fetched() {
        let registry = registry();
        let settings = Settings::new();
        let pipeline = Pipeline::new(&registry, &settings);
        let resource = Tracked {
            inner: ResourceHandle::new("users", 1)
                .with_attribute("first_name", json!("Miles"))
                .with_attribute("email", json!("miles@example.com")),
            fetched: RefCell::new(Vec::new()),
        };
        let directives = QueryDirectives::default().with_fields("users", ["first_name"]);

        pipeline.render_resource(&resource, &directives).unwrap();
        assert_eq!(*resource.fetched.borrow(), vec!["first_name".to_string()]);
    }

    #[test]
    fn page_url_replaces_page_parameter() {
        let base = Url::parse("http://testserver/identities?page=4&sort=name").unwrap();
        assert_eq!(
            page_url(&base, 2),
            "http://testserver/identities?sort=name&page=2"
        );
    }

    #[test]
    fn page_links_at_first_page() {
        let links = page_links(&PageInfo {
            page: 1,
            pages: 2,
            count: 2,
            base_url: "http://testserver/identities".into(),
        })
        .unwrap();
        assert_eq!(
            links,
            json!({
                "first": "http://testserver/identities?page=1",
                "last": "http://testserver/identities?page=2",
                "next": "http://testserver/identities?page=2",
                "prev": null
            })
        );
    }

    #[test]
    fn bad_base_url() {
        let err = page_links(&PageInfo {
            page: 1,
            pages: 1,
            count: 0,
            base_url: "not a url".into(),
        })
        .unwrap_err();
        assert!(matches!(err, RenderError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn linkage_shapes() {
        let settings = Settings::new().format_keys(CaseConvention::Dash);
        assert_eq!(linkage(&RelationshipData::ToOne(None), &settings), Value::Null);
        let many = RelationshipData::ToMany(vec![ResourceHandle::new("blog_posts", 3)]);
        assert_eq!(
            linkage(&many, &settings),
            json!([{ "type": "blog-posts", "id": "3" }])
        );
    }
}
