use clap::Args;
use kwcluster_core::models::{
    KeywordFilters, MatchType, NumericRange, SortColumn, SortDirection, SortSpec,
};

/// Filter and sort flags shared by commands that read a view.
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Require every token (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub tokens: Vec<String>,

    /// Comma separated terms the keyword must contain
    #[arg(long, default_value = "")]
    pub include: String,

    /// Comma separated terms the keyword must not contain
    #[arg(long, default_value = "")]
    pub exclude: String,

    /// How include terms combine: any | all
    #[arg(long, default_value = "any")]
    pub include_match: MatchType,

    /// How exclude terms combine: any | all
    #[arg(long, default_value = "any")]
    pub exclude_match: MatchType,

    #[arg(long)]
    pub min_volume: Option<f64>,
    #[arg(long)]
    pub max_volume: Option<f64>,
    #[arg(long)]
    pub min_length: Option<f64>,
    #[arg(long)]
    pub max_length: Option<f64>,
    #[arg(long)]
    pub min_difficulty: Option<f64>,
    #[arg(long)]
    pub max_difficulty: Option<f64>,
    #[arg(long)]
    pub min_rating: Option<f64>,
    #[arg(long)]
    pub max_rating: Option<f64>,

    /// Require every SERP feature (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub serp_features: Vec<String>,

    /// keyword | volume | difficulty | length | rating | childCount
    #[arg(long, default_value = "volume")]
    pub sort: SortColumn,

    /// Sort ascending instead of descending
    #[arg(long)]
    pub asc: bool,
}

impl FilterArgs {
    pub fn to_filters(&self) -> KeywordFilters {
        KeywordFilters {
            tokens: clean_list(&self.tokens).map(|t| t.to_lowercase()).collect(),
            include: self.include.trim().to_string(),
            exclude: self.exclude.trim().to_string(),
            volume: NumericRange::new(self.min_volume, self.max_volume),
            length: NumericRange::new(self.min_length, self.max_length),
            difficulty: NumericRange::new(self.min_difficulty, self.max_difficulty),
            rating: NumericRange::new(self.min_rating, self.max_rating),
            serp_features: clean_list(&self.serp_features).map(str::to_string).collect(),
        }
    }

    pub fn to_sort(&self) -> SortSpec {
        let direction = if self.asc {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        };
        SortSpec::new(self.sort, direction)
    }
}

/// Trimmed, non-empty entries. SERP feature names keep the server's casing.
fn clean_list(items: &[String]) -> impl Iterator<Item = &str> {
    items.iter().map(|item| item.trim()).filter(|item| !item.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        filters: FilterArgs,
    }

    #[test]
    fn test_no_flags_means_no_filters() {
        let harness = Harness::parse_from(["kwcluster"]);
        assert!(!harness.filters.to_filters().is_active());
        assert_eq!(harness.filters.to_sort(), SortSpec::default());
    }

    #[test]
    fn test_flags_build_filters() {
        let harness = Harness::parse_from([
            "kwcluster",
            "--tokens",
            "SEO, tool",
            "--include",
            "audit",
            "--include-match",
            "all",
            "--min-volume",
            "100",
            "--serp-features",
            "Featured Snippet, video",
            "--sort",
            "keyword",
            "--asc",
        ]);
        let filters = harness.filters.to_filters();

        assert_eq!(filters.tokens, vec!["seo", "tool"]);
        assert_eq!(filters.include, "audit");
        assert_eq!(filters.volume.min, Some(100.0));
        assert_eq!(filters.serp_features, vec!["Featured Snippet", "video"]);
        assert_eq!(harness.filters.include_match, MatchType::All);
        assert_eq!(
            harness.filters.to_sort(),
            SortSpec::new(SortColumn::Keyword, SortDirection::Asc)
        );
    }
}
