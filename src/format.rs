//! Key formatting between internal snake_case names and wire names.
//!
//! Round-trips hold for any key made of lowercase ASCII letters, digits and
//! underscores: `format_key(format_key(k, ToWire, c), FromWire, c) == k`.

use serde_json::{Map, Value};

use crate::types::{CaseConvention, Direction};

/// Rewrite every mapping key in `value` for the given direction.
///
/// Recurses through objects and through arrays (so arrays of objects are
/// handled); scalar values, including strings, are never touched.
pub fn format_keys(value: &Value, direction: Direction, convention: CaseConvention) -> Value {
    match value {
        Value::Object(map) => Value::Object(format_map(map, direction, convention)),
        Value::Array(arr) => Value::Array(
            arr.iter()
                .map(|item| format_keys(item, direction, convention))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Rewrite the keys of a single mapping, recursing into its values.
pub fn format_map(
    map: &Map<String, Value>,
    direction: Direction,
    convention: CaseConvention,
) -> Map<String, Value> {
    map.iter()
        .map(|(key, child)| {
            (
                format_key(key, direction, convention),
                format_keys(child, direction, convention),
            )
        })
        .collect()
}

/// Rewrite a single key.
pub fn format_key(key: &str, direction: Direction, convention: CaseConvention) -> String {
    match (convention, direction) {
        (CaseConvention::Unchanged, _) => key.to_string(),
        (CaseConvention::Camel, Direction::ToWire) => camelize(key),
        (CaseConvention::Dash, Direction::ToWire) => dasherize(key),
        (CaseConvention::Underscore, Direction::ToWire) => underscore(key),
        (_, Direction::FromWire) => underscore(key),
    }
}

/// Format a resource type name. Type names follow the key convention.
pub fn format_type_name(type_name: &str, direction: Direction, convention: CaseConvention) -> String {
    format_key(type_name, direction, convention)
}

/// `first_name` -> `firstName`.
///
/// Only an underscore followed by a lowercase letter is folded; any other
/// underscore is kept so that `underscore` can restore it.
pub fn camelize(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut chars = key.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '_' {
            if let Some(next) = chars.peek().copied().filter(char::is_ascii_lowercase) {
                out.push(next.to_ascii_uppercase());
                chars.next();
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// `first_name` -> `first-name`; camelCase input is split first.
pub fn dasherize(key: &str) -> String {
    underscore(key).replace('_', "-")
}

/// `firstName` / `first-name` -> `first_name`.
pub fn underscore(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else if c == '-' {
            out.push('_');
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn camelize_simple() {
        assert_eq!(camelize("first_name"), "firstName");
        assert_eq!(camelize("id"), "id");
        assert_eq!(camelize("a_b_c"), "aBC");
    }

    #[test]
    fn camelize_keeps_ambiguous_underscores() {
        assert_eq!(camelize("line_1"), "line_1");
        assert_eq!(camelize("a__b"), "a_B");
        assert_eq!(camelize("trailing_"), "trailing_");
    }

    #[test]
    fn underscore_from_camel_and_dash() {
        assert_eq!(underscore("firstName"), "first_name");
        assert_eq!(underscore("first-name"), "first_name");
        assert_eq!(underscore("aBC"), "a_b_c");
        assert_eq!(underscore("a_B"), "a__b");
    }

    #[test]
    fn dasherize_simple() {
        assert_eq!(dasherize("first_name"), "first-name");
        assert_eq!(dasherize("firstName"), "first-name");
    }

    #[test]
    fn camel_round_trip_scenario() {
        let wire = format_key("first_name", Direction::ToWire, CaseConvention::Camel);
        assert_eq!(wire, "firstName");
        let back = format_key(&wire, Direction::FromWire, CaseConvention::Camel);
        assert_eq!(back, "first_name");
    }

    #[test]
    fn unchanged_is_identity_both_ways() {
        for key in ["firstName", "first-name", "first_name"] {
            assert_eq!(
                format_key(key, Direction::ToWire, CaseConvention::Unchanged),
                key
            );
            assert_eq!(
                format_key(key, Direction::FromWire, CaseConvention::Unchanged),
                key
            );
        }
    }

    #[test]
    fn format_keys_recurses_into_objects_and_arrays() {
        let value = json!({
            "first_name": "first_name",
            "home_address": { "street_name": "x" },
            "phone_numbers": [{ "area_code": "555" }, "plain_string"]
        });
        let out = format_keys(&value, Direction::ToWire, CaseConvention::Camel);
        assert_eq!(
            out,
            json!({
                "firstName": "first_name",
                "homeAddress": { "streetName": "x" },
                "phoneNumbers": [{ "areaCode": "555" }, "plain_string"]
            })
        );
    }

    #[test]
    fn format_keys_leaves_scalars() {
        let value = json!("first_name");
        assert_eq!(
            format_keys(&value, Direction::ToWire, CaseConvention::Camel),
            value
        );
    }

    #[test]
    fn format_keys_reverse_dasherize() {
        let value = json!({ "first-name": 1, "nested-map": { "last-name": 2 } });
        let out = format_keys(&value, Direction::FromWire, CaseConvention::Dash);
        assert_eq!(out, json!({ "first_name": 1, "nested_map": { "last_name": 2 } }));
    }
}
