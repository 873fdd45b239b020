//! Parsing of `fields[<type>]` and `include` query parameters.

use url::form_urlencoded;

use crate::format::{format_key, format_type_name};
use crate::types::{CaseConvention, Direction, QueryDirectives, FIELDS_PARAM, INCLUDE_PARAM};

impl QueryDirectives {
    /// Parse the query string of a request (with or without a leading `?`).
    ///
    /// Names arrive in wire case and are normalized to internal form.
    /// Parameters other than `fields[...]` and `include` are ignored.
    pub fn parse(query: &str, convention: CaseConvention) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut directives = QueryDirectives::default();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            if key == INCLUDE_PARAM {
                directives.include_paths.extend(
                    split_list(&value).map(|name| format_key(name, Direction::FromWire, convention)),
                );
            } else if let Some(type_name) = sparse_fieldset_type(&key) {
                let type_name = format_type_name(type_name, Direction::FromWire, convention);
                directives
                    .sparse_fields
                    .entry(type_name)
                    .or_default()
                    .extend(
                        split_list(&value)
                            .map(|name| format_key(name, Direction::FromWire, convention)),
                    );
            }
        }

        directives
    }
}

/// `fields[users]` -> `users`.
fn sparse_fieldset_type(key: &str) -> Option<&str> {
    let inner = key
        .strip_prefix(FIELDS_PARAM)?
        .strip_prefix('[')?
        .strip_suffix(']')?
        .trim();
    (!inner.is_empty()).then_some(inner)
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}
