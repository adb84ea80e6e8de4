//! Response parsing
//!
//! Turns a BuiltWith document into a [`FingerprintResult`]. Two families of
//! shapes are accepted:
//!
//! - BuiltWith `Results` documents, where technologies sit under
//!   `Result.Paths[].Technologies[]`, `Technologies[]` or a `Categories` map
//! - plain category maps such as `{"WordPress": [{"status": "live"}]}`
//!
//! Field names vary between API versions and saved exports, so each concept
//! is looked up under a list of aliases.

use super::error::FingerprintError;
use super::timestamp;
use super::types::{DetectedItem, FingerprintResult, ItemStatus};
use serde_json::{Map, Value};
use tracing::{debug, warn};

const CATEGORY_KEYS: &[&str] = &["Tag", "Category", "category"];
const SUBCATEGORY_KEYS: &[&str] = &["SubCategory", "Subcategory", "subcategory"];
const NAME_KEYS: &[&str] = &["Name", "name", "Technology"];
const LIVE_COUNT_KEYS: &[&str] = &["LiveCount", "live_count", "Live"];
const DEAD_COUNT_KEYS: &[&str] = &["DeadCount", "dead_count", "Dead"];
const LATEST_KEYS: &[&str] = &["Latest", "latest", "LatestTimestamp", "LastDetected"];
const OLDEST_KEYS: &[&str] = &["Oldest", "oldest", "OldestTimestamp", "FirstDetected"];
const STATUS_KEYS: &[&str] = &["status", "Status"];

/// Top-level keys that never hold a category in a plain map
const RESERVED_KEYS: &[&str] = &["Errors", "Trust", "NextOffset", "Lookup"];

/// Parses a response body.
pub fn parse_body(domain: &str, body: &str) -> Result<FingerprintResult, FingerprintError> {
    let raw: Value = serde_json::from_str(body)
        .map_err(|e| FingerprintError::parse(format!("invalid JSON: {}", e)))?;
    parse_document(domain, raw)
}

/// Parses an already-decoded response document.
pub fn parse_document(domain: &str, raw: Value) -> Result<FingerprintResult, FingerprintError> {
    let Some(root) = raw.as_object() else {
        return Err(FingerprintError::parse(format!(
            "expected a JSON object, got {}",
            json_kind(&raw)
        )));
    };

    let mut result = FingerprintResult::new(domain, Value::Null);

    if let Some(errors) = root.get("Errors").and_then(Value::as_array) {
        result.errors = errors.clone();
    }

    let results = root.get("Results").or_else(|| root.get("result"));
    match results {
        Some(Value::Array(entries)) => {
            for entry in entries {
                extract_from_result(&mut result, entry);
            }
        }
        Some(entry) if entry.is_object() => extract_from_result(&mut result, entry),
        Some(_) | None => {
            if root.contains_key("Paths")
                || root.contains_key("Technologies")
                || root.contains_key("Categories")
            {
                extract_from_result(&mut result, &raw);
            } else {
                extract_category_map(&mut result, root);
            }
        }
    }

    if result.is_empty() {
        warn!(domain, "No technology data found in fingerprint response");
    } else {
        debug!(
            domain,
            categories = result.categories.len(),
            items = result.item_count(),
            "Parsed fingerprint response"
        );
    }

    result.raw = raw;
    Ok(result)
}

fn extract_from_result(result: &mut FingerprintResult, entry: &Value) {
    // BuiltWith wraps the payload in a `Result` object; saved exports may not
    let entry = entry.get("Result").unwrap_or(entry);

    if let Some(paths) = entry.get("Paths").and_then(Value::as_array) {
        for path in paths {
            for tech in technologies(path) {
                push_technology(result, tech, None);
            }
        }
    } else if entry.get("Technologies").is_some() {
        for tech in technologies(entry) {
            push_technology(result, tech, None);
        }
    } else if let Some(categories) = entry.get("Categories").and_then(Value::as_object) {
        for (category, data) in categories {
            for tech in technologies(data) {
                push_technology(result, tech, Some(category.as_str()));
            }
        }
    }
}

fn technologies(container: &Value) -> impl Iterator<Item = &Map<String, Value>> {
    container
        .get("Technologies")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn extract_category_map(result: &mut FingerprintResult, root: &Map<String, Value>) {
    for (category, value) in root {
        if RESERVED_KEYS.contains(&category.as_str()) {
            continue;
        }
        let Some(items) = value.as_array() else {
            debug!(key = %category, "Skipping non-list value in category map");
            continue;
        };
        for item in items {
            match item {
                Value::Object(obj) => {
                    let detected = item_from_object(obj, category);
                    result.push_item(category, detected);
                }
                Value::String(name) if !name.trim().is_empty() => {
                    result.push_item(category, DetectedItem::live(name.trim()));
                }
                _ => debug!(key = %category, "Skipping unrecognised item in category map"),
            }
        }
    }
}

fn push_technology(
    result: &mut FingerprintResult,
    tech: &Map<String, Value>,
    category_override: Option<&str>,
) {
    let name = first_string(tech, NAME_KEYS);
    let category = category_override
        .map(str::to_string)
        .or_else(|| first_string(tech, CATEGORY_KEYS))
        .or_else(|| name.clone())
        .unwrap_or_default();

    let default_name = name.unwrap_or_else(|| category.clone());
    let mut item = item_from_object(tech, &default_name);
    if item.subcategory.is_none() {
        item.subcategory = tech
            .get("Categories")
            .and_then(Value::as_array)
            .and_then(|c| c.iter().find_map(Value::as_str))
            .map(str::to_string);
    }

    result.push_item(&category, item);
}

/// Builds an item from a technology object. `default_name` is used when the
/// object carries no name of its own.
fn item_from_object(obj: &Map<String, Value>, default_name: &str) -> DetectedItem {
    let name = first_string(obj, NAME_KEYS).unwrap_or_else(|| default_name.to_string());
    let live_count = first_count(obj, LIVE_COUNT_KEYS);
    let dead_count = first_count(obj, DEAD_COUNT_KEYS);

    let status = first_string(obj, STATUS_KEYS)
        .and_then(|s| ItemStatus::from_label(&s))
        .unwrap_or(match (live_count, dead_count) {
            (Some(live), Some(dead)) if live == 0 && dead > 0 => ItemStatus::Dead,
            (None, Some(dead)) if dead > 0 => ItemStatus::Dead,
            _ => ItemStatus::Live,
        });

    DetectedItem {
        name,
        subcategory: first_string(obj, SUBCATEGORY_KEYS),
        status,
        live_count,
        dead_count,
        first_seen: first_value(obj, OLDEST_KEYS).and_then(timestamp::from_json),
        last_seen: first_value(obj, LATEST_KEYS).and_then(timestamp::from_json),
    }
}

/// First alias holding a non-empty string (numbers are stringified).
fn first_string(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// First alias holding a non-negative integer or an integer string.
fn first_count(obj: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    })
}

/// First alias with a non-null value.
fn first_value<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| obj.get(*key).filter(|v| !v.is_null()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
