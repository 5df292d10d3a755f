use std::collections::BTreeMap;

use tracing::warn;

/// Split a comma-separated tag list, trimming each entry.
///
/// Order, duplicates and empty entries are preserved. Only absent or empty
/// input yields no tags.
pub fn parse_tags(csv: Option<&str>) -> Vec<String> {
    match csv {
        None | Some("") => Vec::new(),
        Some(csv) => csv.split(',').map(|t| t.trim().to_string()).collect(),
    }
}

/// Parse a flat string-to-string JSON object.
///
/// Malformed input is logged and replaced by an empty map; it never fails
/// the request.
pub fn parse_metadata(json: Option<&str>) -> BTreeMap<String, String> {
    let Some(raw) = json.filter(|s| !s.is_empty()) else {
        return BTreeMap::new();
    };

    match serde_json::from_str::<Option<BTreeMap<String, String>>>(raw) {
        Ok(map) => map.unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "Failed to parse metadata JSON, storing empty metadata");
            BTreeMap::new()
        }
    }
}
