//! Technology fingerprint types
//!
//! A [`FingerprintResult`] groups detected technologies by category, in the
//! order the upstream service reported them. It also keeps the raw document
//! so the insight stage can hand the model exactly what BuiltWith returned.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a technology is still present on the domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Live,
    Dead,
}

impl ItemStatus {
    /// Parses a status label such as `"live"` or `"Dead"`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "live" | "active" | "current" => Some(ItemStatus::Live),
            "dead" | "inactive" | "removed" => Some(ItemStatus::Dead),
            _ => None,
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStatus::Live => write!(f, "live"),
            ItemStatus::Dead => write!(f, "dead"),
        }
    }
}

/// A first/last-seen value as reported, plus its parsed form when the
/// format was recognised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub raw: String,
    pub parsed: Option<NaiveDateTime>,
}

/// One detected technology
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedItem {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,

    pub status: ItemStatus,

    /// Explicit live count reported by the service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_count: Option<u64>,

    /// Explicit dead count reported by the service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dead_count: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_seen: Option<Timestamp>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<Timestamp>,
}

impl DetectedItem {
    /// A live item with no counts or timestamps
    pub fn live(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subcategory: None,
            status: ItemStatus::Live,
            live_count: None,
            dead_count: None,
            first_seen: None,
            last_seen: None,
        }
    }

    /// Live count, falling back to 1/0 from the status when the service
    /// gave no explicit count.
    pub fn effective_live_count(&self) -> u64 {
        self.live_count.unwrap_or(match self.status {
            ItemStatus::Live => 1,
            ItemStatus::Dead => 0,
        })
    }

    /// Dead count, falling back to 0/1 from the status.
    pub fn effective_dead_count(&self) -> u64 {
        self.dead_count.unwrap_or(match self.status {
            ItemStatus::Live => 0,
            ItemStatus::Dead => 1,
        })
    }
}

/// All items detected under one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub name: String,
    pub items: Vec<DetectedItem>,
}

/// Technology-detection output for one domain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintResult {
    pub domain: String,

    /// Categories in first-seen order
    pub categories: Vec<CategoryEntry>,

    /// Entries of the response's `Errors` array, if any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<serde_json::Value>,

    /// Response document as received
    #[serde(skip)]
    pub raw: serde_json::Value,
}

impl FingerprintResult {
    pub fn new(domain: impl Into<String>, raw: serde_json::Value) -> Self {
        Self {
            domain: domain.into(),
            categories: Vec::new(),
            errors: Vec::new(),
            raw,
        }
    }

    /// Appends an item to its category, creating the category at the end
    /// if it has not been seen yet.
    pub fn push_item(&mut self, category: &str, item: DetectedItem) {
        match self.categories.iter_mut().find(|c| c.name == category) {
            Some(entry) => entry.items.push(item),
            None => self.categories.push(CategoryEntry {
                name: category.to_string(),
                items: vec![item],
            }),
        }
    }

    pub fn category(&self, name: &str) -> Option<&CategoryEntry> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Iterates `(category, item)` pairs in report order.
    pub fn items(&self) -> impl Iterator<Item = (&str, &DetectedItem)> {
        self.categories
            .iter()
            .flat_map(|c| c.items.iter().map(move |item| (c.name.as_str(), item)))
    }

    pub fn item_count(&self) -> usize {
        self.categories.iter().map(|c| c.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Pretty JSON of the raw response, used as model input.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.raw).unwrap_or_else(|_| self.raw.to_string())
    }
}
