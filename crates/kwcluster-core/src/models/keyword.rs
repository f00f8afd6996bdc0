use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Server-defined partition of a project's keywords.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Ungrouped,
    Grouped,
    Confirmed,
    Blocked,
}

impl View {
    pub const ALL: [View; 4] = [View::Ungrouped, View::Grouped, View::Confirmed, View::Blocked];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ungrouped => "ungrouped",
            Self::Grouped => "grouped",
            Self::Confirmed => "confirmed",
            Self::Blocked => "blocked",
        }
    }

    /// Metadata key under which the view's total row count is recorded.
    pub fn count_key(&self) -> String {
        format!("{}Count", self.as_str())
    }

    /// Views whose rows are organised as parent + children groups.
    pub fn is_grouped_like(&self) -> bool {
        matches!(self, Self::Grouped | Self::Confirmed)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ungrouped" => Ok(Self::Ungrouped),
            "grouped" => Ok(Self::Grouped),
            "confirmed" => Ok(Self::Confirmed),
            "blocked" => Ok(Self::Blocked),
            other => Err(format!("unknown view: {}", other)),
        }
    }
}

/// A normalized keyword row. One copy per id per project lives in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyword {
    pub id: i64,
    pub project_id: i64,
    pub text: String,
    /// Server-assigned canonical order
    pub tokens: Vec<String>,
    pub volume: i64,
    pub original_volume: Option<i64>,
    pub difficulty: f64,
    pub length: i64,
    pub rating: f64,
    pub is_parent: bool,
    pub group_id: Option<String>,
    pub group_name: Option<String>,
    pub status: View,
    pub child_count: u32,
    pub serp_features: Vec<String>,
}

impl Keyword {
    pub fn new(id: i64, project_id: i64, text: impl Into<String>, status: View) -> Self {
        let text = text.into();
        Self {
            id,
            project_id,
            length: text.chars().count() as i64,
            text,
            tokens: Vec::new(),
            volume: 0,
            original_volume: None,
            difficulty: 0.0,
            rating: 0.0,
            is_parent: false,
            group_id: None,
            group_name: None,
            status,
            child_count: 0,
            serp_features: Vec::new(),
        }
    }

    /// Force the row into the requested view and backfill `original_volume`.
    ///
    /// The API sometimes returns rows with a stale or missing status; the view
    /// the rows were requested for is authoritative.
    pub fn stamp_for_view(&mut self, view: View) {
        self.status = view;
        if self.original_volume.is_none() {
            self.original_volume = Some(self.volume);
        }
    }

    pub fn is_child(&self) -> bool {
        !self.is_parent && self.group_id.is_some()
    }
}

/// Partial update applied by `KeywordStore::update_keyword`.
/// Fields left as `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeywordPatch {
    pub id: i64,
    pub text: Option<String>,
    pub tokens: Option<Vec<String>>,
    pub volume: Option<i64>,
    pub difficulty: Option<f64>,
    pub length: Option<i64>,
    pub rating: Option<f64>,
    pub is_parent: Option<bool>,
    pub group_id: Option<Option<String>>,
    pub group_name: Option<Option<String>>,
    pub status: Option<View>,
    pub child_count: Option<u32>,
    pub serp_features: Option<Vec<String>>,
}

impl KeywordPatch {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn apply_to(&self, row: &mut Keyword) {
        if let Some(text) = &self.text {
            row.text = text.clone();
        }
        if let Some(tokens) = &self.tokens {
            row.tokens = tokens.clone();
        }
        if let Some(volume) = self.volume {
            row.volume = volume;
        }
        if let Some(difficulty) = self.difficulty {
            row.difficulty = difficulty;
        }
        if let Some(length) = self.length {
            row.length = length;
        }
        if let Some(rating) = self.rating {
            row.rating = rating;
        }
        if let Some(is_parent) = self.is_parent {
            row.is_parent = is_parent;
        }
        if let Some(group_id) = &self.group_id {
            row.group_id = group_id.clone();
        }
        if let Some(group_name) = &self.group_name {
            row.group_name = group_name.clone();
        }
        if let Some(status) = self.status {
            row.status = status;
        }
        if let Some(child_count) = self.child_count {
            row.child_count = child_count;
        }
        if let Some(serp_features) = &self.serp_features {
            row.serp_features = serp_features.clone();
        }
    }
}

/// Keyword row as it arrives from the API, before normalization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawKeyword {
    pub id: i64,
    #[serde(default, alias = "project_id")]
    pub project_id: Option<i64>,
    #[serde(default, alias = "keyword")]
    pub text: String,
    #[serde(default)]
    pub tokens: Option<Value>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default, alias = "original_volume")]
    pub original_volume: Option<f64>,
    #[serde(default)]
    pub difficulty: Option<f64>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default, alias = "is_parent")]
    pub is_parent: Option<bool>,
    #[serde(default, alias = "group_id")]
    pub group_id: Option<Value>,
    #[serde(default, alias = "group_name")]
    pub group_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "child_count")]
    pub child_count: Option<u32>,
    #[serde(default, alias = "serp_features")]
    pub serp_features: Option<Value>,
}

impl RawKeyword {
    /// Normalize into a new store row. `project_id` is used when the payload omits it.
    pub fn into_keyword(self, project_id: i64) -> Keyword {
        let mut row = Keyword::new(
            self.id,
            self.project_id.unwrap_or(project_id),
            "",
            View::Ungrouped,
        );
        self.apply_to(&mut row);
        row
    }

    /// Merge onto the stored copy of the same id.
    ///
    /// Fields the payload leaves out keep their stored value, so a partial
    /// row (children lists, processing previews) never erases what a fuller
    /// fetch already loaded.
    pub fn merge_into(self, existing: &Keyword) -> Keyword {
        let mut row = existing.clone();
        self.apply_to(&mut row);
        row
    }

    fn apply_to(self, row: &mut Keyword) {
        let original_volume = self.original_volume;
        self.into_patch().apply_to(row);
        if let Some(volume) = original_volume {
            row.original_volume = Some(volume as i64);
        }
    }

    fn into_patch(self) -> KeywordPatch {
        // Without an explicit length, a new text implies its character count.
        let length = self
            .length
            .map(|l| l as i64)
            .or_else(|| (!self.text.is_empty()).then(|| self.text.chars().count() as i64));

        KeywordPatch {
            id: self.id,
            text: Some(self.text).filter(|t| !t.is_empty()),
            tokens: self.tokens.as_ref().map(parse_string_list),
            volume: self.volume.map(|v| v as i64),
            difficulty: self.difficulty,
            length,
            rating: self.rating,
            is_parent: self.is_parent,
            group_id: self.group_id.as_ref().map(value_to_id_string),
            group_name: self.group_name.map(|name| Some(name).filter(|n| !n.is_empty())),
            status: self.status.as_deref().and_then(|s| s.parse().ok()),
            child_count: self.child_count,
            serp_features: self.serp_features.as_ref().map(parse_string_list),
        }
    }
}

fn value_to_id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a list field that may arrive as a JSON array or as a JSON-encoded string.
///
/// A string that is not valid JSON falls back to comma-split-and-trim; this never fails.
pub fn parse_string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Vec::new();
            }
            match serde_json::from_str::<Value>(trimmed) {
                Ok(parsed @ Value::Array(_)) => parse_string_list(&parsed),
                _ => split_comma_list(trimmed),
            }
        }
        _ => Vec::new(),
    }
}

fn split_comma_list(s: &str) -> Vec<String> {
    s.trim_matches(|c| c == '[' || c == ']')
        .split(',')
        .map(|part| part.trim().trim_matches('"').trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}
