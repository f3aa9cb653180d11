//! The history document payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An arbitrary-depth JSON object holding scheduling/attendance history.
///
/// The store never looks inside it. The only structural requirement is
/// that the top level is an object, so `[]` or `"text"` do not parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryDocument(Map<String, Value>);

impl HistoryDocument {
    /// An empty document (`{}`), meaning "no history yet".
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document from its JSON text.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Two-space indented JSON, the form written to disk and to the cache.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for HistoryDocument {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for HistoryDocument {
    type Error = serde_json::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        serde_json::from_value(value)
    }
}

// ── tests ────────────────────────────────────────────────────────────
