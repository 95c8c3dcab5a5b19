use serde_json::Value;

use crate::business::CrossReference;

const MAPS_SEARCH_BASE: &str = "https://www.google.com/maps/search/?api=1&query=";

/// Picks the maps reference for a business.
///
/// The first hint whose lowercased title contains the lowercased name wins;
/// with no hit the reference is a search URL over `"{name} {address}"`.
pub fn resolve_maps_uri(name: &str, address: &str, cross_refs: &[CrossReference]) -> String {
    match find_cross_reference(name, cross_refs) {
        Some(hit) if !hit.uri.trim().is_empty() => hit.uri.clone(),
        _ => search_uri(name, address),
    }
}

pub fn find_cross_reference<'a>(
    name: &str,
    cross_refs: &'a [CrossReference],
) -> Option<&'a CrossReference> {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    cross_refs
        .iter()
        .find(|candidate| candidate.title.to_lowercase().contains(&needle))
}

pub fn search_uri(name: &str, address: &str) -> String {
    let query = format!("{name} {address}");
    format!("{MAPS_SEARCH_BASE}{}", urlencoding::encode(&query))
}

/// Flattens hint lists in either of the shapes a caller may hold.
///
/// Accepts plain `{title, uri}` entries as well as grounding chunks that nest
/// the pair under `maps` or `web` (maps first). Entries without a URI are
/// dropped; a missing title becomes empty and so never matches.
pub fn cross_refs_from_value(value: &Value) -> Vec<CrossReference> {
    let Some(entries) = value.as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let maps = entry.get("maps");
            let web = entry.get("web");
            let uri = maps
                .and_then(|node| str_field(node, "uri"))
                .or_else(|| web.and_then(|node| str_field(node, "uri")))
                .or_else(|| str_field(entry, "uri"))?;
            let title = maps
                .and_then(|node| str_field(node, "title"))
                .or_else(|| web.and_then(|node| str_field(node, "title")))
                .or_else(|| str_field(entry, "title"))
                .unwrap_or_default();
            Some(CrossReference::new(title, uri))
        })
        .collect()
}

fn str_field<'a>(node: &'a Value, key: &str) -> Option<&'a str> {
    node.get(key).and_then(Value::as_str)
}
