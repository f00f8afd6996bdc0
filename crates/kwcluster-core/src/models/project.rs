use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
}

impl Project {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Aggregate counters for one project.
/// Replaced wholesale on every stats fetch, never merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectStats {
    pub ungrouped_count: u64,
    pub grouped_keywords_count: u64,
    pub grouped_groups_count: u64,
    pub confirmed_keywords_count: u64,
    pub confirmed_groups_count: u64,
    pub blocked_count: u64,
    pub total_keywords: u64,
    pub total_parent_keywords: u64,
    pub token_count: u64,
    pub grouped_pages: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_missing_fields_default_to_zero() {
        let stats: ProjectStats =
            serde_json::from_str(r#"{"ungroupedCount": 12, "tokenCount": 40}"#).unwrap();
        assert_eq!(stats.ungrouped_count, 12);
        assert_eq!(stats.token_count, 40);
        assert_eq!(stats.blocked_count, 0);
    }
}
