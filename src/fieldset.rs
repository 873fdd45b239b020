//! Sparse fieldset filtering.

use std::collections::BTreeSet;

/// Narrow `all` to the requested fields.
///
/// With no directive the full set is returned unchanged. Otherwise the
/// result is `all ∩ requested` plus every protected field. Requested names
/// that the resource does not have are ignored.
pub fn filter_fields(
    all: &BTreeSet<String>,
    requested: Option<&BTreeSet<String>>,
    protected: &BTreeSet<String>,
) -> BTreeSet<String> {
    let Some(requested) = requested else {
        return all.clone();
    };

    all.iter()
        .filter(|field| requested.contains(*field))
        .chain(protected.iter())
        .cloned()
        .collect()
}
