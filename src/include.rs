//! Validation of the `include` query parameter.

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::IncludeError;

/// Check every requested relationship against the declared-includable map.
///
/// Runs before any side-loading. An endpoint with no (or an empty)
/// includable map rejects any include; otherwise every unknown name is
/// collected and reported together, in sorted order.
///
/// # Errors
///
/// `IncludeNotSupported` or `IncludeFieldNotSupported`.
pub fn validate_includes<K, V>(
    resource_type: &str,
    requested: &BTreeSet<String>,
    declared: Option<&BTreeMap<K, V>>,
) -> Result<(), IncludeError>
where
    K: Borrow<str> + Ord,
{
    if requested.is_empty() {
        return Ok(());
    }

    let declared = match declared {
        Some(map) if !map.is_empty() => map,
        _ => {
            return Err(IncludeError::IncludeNotSupported {
                resource_type: resource_type.to_string(),
            })
        }
    };

    let unsupported: Vec<String> = requested
        .iter()
        .filter(|name| !declared.contains_key(name.as_str()))
        .cloned()
        .collect();

    if unsupported.is_empty() {
        Ok(())
    } else {
        Err(IncludeError::IncludeFieldNotSupported {
            resource_type: resource_type.to_string(),
            fields: unsupported,
        })
    }
}
