//! Cache key and tag derivation.
//!
//! Pure functions the cache layer is agnostic to. A key is canonical for
//! its parameter set regardless of the order parameters were supplied:
//! names are sorted, rendered as `name:value` pairs, and joined with `|`.

use std::collections::BTreeMap;

use beacon_core::SearchFilters;

use crate::constants::{TAG_DATE_RANGE, TAG_SEARCH};

/// Derive the canonical cache key for `prefix` and a parameter map.
///
/// Empty-valued parameters are dropped; an empty parameter set yields
/// `"<prefix>:"`.
pub fn derive_key(prefix: &str, params: &BTreeMap<String, String>) -> String {
    let joined = params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, value)| format!("{}:{}", name, value))
        .collect::<Vec<_>>()
        .join("|");
    format!("{}:{}", prefix, joined)
}

/// Derive the tag set for an operation scope and filter set.
pub fn derive_tags(scope: &str, filters: &SearchFilters) -> Vec<String> {
    let mut tags = vec![scope.to_string()];

    if let Some(subject) = &filters.subject_id {
        tags.push(format!("subject:{}", subject));
    }
    if let Some(category) = &filters.category {
        tags.push(format!("category:{}", category));
    }
    if filters.date_range.is_some() {
        tags.push(TAG_DATE_RANGE.to_string());
    }
    if filters.free_text.is_some() {
        tags.push(TAG_SEARCH.to_string());
    }

    tags
}

/// Flatten a filter set into the key parameter map. Paging and sort are
/// part of the identity: different pages cache separately.
pub fn filter_params(filters: &SearchFilters) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();

    if let Some(range) = &filters.date_range {
        params.insert(
            "date_range".to_string(),
            format!("{}..{}", range.start.to_rfc3339(), range.end.to_rfc3339()),
        );
    }
    if let Some(subject) = &filters.subject_id {
        params.insert("subject".to_string(), subject.clone());
    }
    if let Some(category) = &filters.category {
        params.insert("category".to_string(), category.clone());
    }
    if let Some(fragment) = &filters.url_substring {
        params.insert("url".to_string(), fragment.clone());
    }
    if let Some(text) = &filters.free_text {
        params.insert("text".to_string(), text.clone());
    }
    params.insert("page".to_string(), filters.page.to_string());
    params.insert("page_size".to_string(), filters.page_size.to_string());
    params.insert("sort".to_string(), filters.sort_field.as_str().to_string());
    params.insert(
        "dir".to_string(),
        filters.sort_direction.as_str().to_string(),
    );

    params
}
