use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

use super::Keyword;

/// How multiple comma-separated text terms combine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    #[default]
    Any,
    All,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::All => "all",
        }
    }
}

impl FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" => Ok(Self::Any),
            "all" => Ok(Self::All),
            other => Err(format!("unknown match type: {}", other)),
        }
    }
}

/// Inclusive numeric bound; either side may be absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl NumericRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn is_set(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

/// Every user-controlled filter of a keyword view.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordFilters {
    pub tokens: Vec<String>,
    pub include: String,
    pub exclude: String,
    pub volume: NumericRange,
    pub length: NumericRange,
    pub difficulty: NumericRange,
    pub rating: NumericRange,
    pub serp_features: Vec<String>,
}

impl KeywordFilters {
    pub fn has_text_filter(&self) -> bool {
        !self.include.trim().is_empty() || !self.exclude.trim().is_empty()
    }

    pub fn has_numeric_bounds(&self) -> bool {
        self.volume.is_set() || self.length.is_set() || self.difficulty.is_set() || self.rating.is_set()
    }

    /// True when any filter narrows the view.
    pub fn is_active(&self) -> bool {
        !self.tokens.is_empty()
            || self.has_text_filter()
            || self.has_numeric_bounds()
            || !self.serp_features.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortColumn {
    Keyword,
    #[default]
    Volume,
    Difficulty,
    Length,
    Rating,
    ChildCount,
}

impl SortColumn {
    /// Column name understood by the server.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Volume => "volume",
            Self::Difficulty => "difficulty",
            Self::Length => "length",
            Self::Rating => "rating",
            Self::ChildCount => "childCount",
        }
    }
}

impl FromStr for SortColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "keyword" => Ok(Self::Keyword),
            "volume" => Ok(Self::Volume),
            "difficulty" => Ok(Self::Difficulty),
            "length" => Ok(Self::Length),
            "rating" => Ok(Self::Rating),
            "childCount" | "child_count" => Ok(Self::ChildCount),
            other => Err(format!("unknown sort column: {}", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(column: SortColumn, direction: SortDirection) -> Self {
        Self { column, direction }
    }

    /// Key under which a locally sorted id list is memoized.
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.column.as_str(), self.direction.as_str())
    }

    /// Total order over rows; equal values fall back to ascending id.
    pub fn compare(&self, a: &Keyword, b: &Keyword) -> Ordering {
        let ordering = match self.column {
            SortColumn::Keyword => a.text.to_lowercase().cmp(&b.text.to_lowercase()),
            SortColumn::Volume => a.volume.cmp(&b.volume),
            SortColumn::Difficulty => a.difficulty.total_cmp(&b.difficulty),
            SortColumn::Length => a.length.cmp(&b.length),
            SortColumn::Rating => a.rating.total_cmp(&b.rating),
            SortColumn::ChildCount => a.child_count.cmp(&b.child_count),
        };
        let ordering = match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        ordering.then_with(|| a.id.cmp(&b.id))
    }
}

/// Pagination metadata for one (project, view) pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub pages: u32,
}

impl Pagination {
    /// Build metadata for `total` rows, clamping `requested_page` into `[1, pages]`.
    /// An empty result still reports one page.
    pub fn clamped(total: u64, requested_page: u32, limit: u32) -> Self {
        let limit = limit.max(1);
        let pages = (total.div_ceil(limit as u64) as u32).max(1);
        Self {
            total,
            page: requested_page.clamp(1, pages),
            limit,
            pages,
        }
    }

    /// Index range of the current page inside the full result.
    pub fn window(&self) -> std::ops::Range<usize> {
        let start = (self.page.saturating_sub(1) as usize) * self.limit as usize;
        let end = (start + self.limit as usize).min(self.total as usize);
        start.min(end)..end
    }
}
