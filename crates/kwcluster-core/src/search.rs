//! Client-side filter semantics shared by the bulk fetch path and the materializer.
//!
//! Provides consistent matching rules for keyword rows:
//! - Comma-separated text terms combined with `any` (OR) or `all` (AND)
//! - Case-insensitive substring matching (Unicode lowercase on both sides)
//! - Token and SERP feature filters with AND semantics

use std::collections::HashSet;

use crate::models::{Keyword, KeywordFilters, MatchType, View};

/// Parse an include/exclude filter into individual search terms.
///
/// Terms are separated by ',' and each term is trimmed and lowercased.
///
/// # Examples
/// - "shoes" -> ["shoes"]
/// - "shoes, running" -> ["shoes", "running"]
/// - "shoes,,running" -> ["shoes", "running"] (empty terms ignored)
/// - "" -> []
pub fn parse_filter_terms(query: &str) -> Vec<String> {
    query
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Check if text contains a search term, ignoring case.
pub fn text_contains_term(text: &str, term: &str) -> bool {
    text.to_lowercase().contains(&term.to_lowercase())
}

/// Lowercased fields an include/exclude term is matched against.
/// Grouped rows are also searchable by their group name.
fn searchable_fields(row: &Keyword, view: View) -> Vec<String> {
    let mut fields = vec![row.text.to_lowercase()];
    if view.is_grouped_like() {
        if let Some(name) = row.group_name.as_deref() {
            fields.push(name.to_lowercase());
        }
    }
    fields
}

fn normalized_set(values: &[String]) -> HashSet<String> {
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Evaluate already lowercased `terms` against the row's searchable fields.
/// An empty term list never matches.
pub fn row_matches_terms(row: &Keyword, view: View, terms: &[String], match_type: MatchType) -> bool {
    if terms.is_empty() {
        return false;
    }
    let fields = searchable_fields(row, view);
    let term_matches = |term: &String| fields.iter().any(|field| field.contains(term.as_str()));
    match match_type {
        MatchType::Any => terms.iter().any(term_matches),
        MatchType::All => terms.iter().all(term_matches),
    }
}

/// Compiled form of `KeywordFilters` for evaluating many rows.
#[derive(Debug, Clone)]
pub struct KeywordPredicate<'a> {
    filters: &'a KeywordFilters,
    view: View,
    include_terms: Vec<String>,
    exclude_terms: Vec<String>,
    include_match: MatchType,
    exclude_match: MatchType,
    tokens: HashSet<String>,
    serp_features: HashSet<String>,
}

impl<'a> KeywordPredicate<'a> {
    pub fn new(
        filters: &'a KeywordFilters,
        view: View,
        include_match: MatchType,
        exclude_match: MatchType,
    ) -> Self {
        Self {
            filters,
            view,
            include_terms: parse_filter_terms(&filters.include),
            exclude_terms: parse_filter_terms(&filters.exclude),
            include_match,
            exclude_match,
            tokens: normalized_set(&filters.tokens),
            serp_features: normalized_set(&filters.serp_features),
        }
    }

    pub fn matches(&self, row: &Keyword) -> bool {
        if !self.tokens.is_empty() {
            let row_tokens = normalized_set(&row.tokens);
            if !self.tokens.is_subset(&row_tokens) {
                return false;
            }
        }

        if !self.include_terms.is_empty()
            && !row_matches_terms(row, self.view, &self.include_terms, self.include_match)
        {
            return false;
        }

        if !self.exclude_terms.is_empty()
            && row_matches_terms(row, self.view, &self.exclude_terms, self.exclude_match)
        {
            return false;
        }

        if !self.serp_features.is_empty()
            && !self.serp_features.is_subset(&normalized_set(&row.serp_features))
        {
            return false;
        }

        self.filters.volume.contains(row.volume as f64)
            && self.filters.length.contains(row.length as f64)
            && self.filters.difficulty.contains(row.difficulty)
            && self.filters.rating.contains(row.rating)
    }
}

/// Keep the rows that pass every active filter, preserving input order.
pub fn filter_rows(
    rows: &[Keyword],
    filters: &KeywordFilters,
    view: View,
    include_match: MatchType,
    exclude_match: MatchType,
) -> Vec<Keyword> {
    let predicate = KeywordPredicate::new(filters, view, include_match, exclude_match);
    rows.iter().filter(|row| predicate.matches(row)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NumericRange;

    fn row(id: i64, text: &str, tokens: &[&str]) -> Keyword {
        let mut kw = Keyword::new(id, 1, text, View::Grouped);
        kw.tokens = tokens.iter().map(|t| t.to_string()).collect();
        kw
    }

    fn ids(rows: &[Keyword]) -> Vec<i64> {
        rows.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_parse_filter_terms() {
        assert_eq!(parse_filter_terms("Shoes"), vec!["shoes"]);
        assert_eq!(parse_filter_terms(" shoes , running "), vec!["shoes", "running"]);
        assert_eq!(parse_filter_terms("shoes,,running"), vec!["shoes", "running"]);
        assert!(parse_filter_terms("").is_empty());
    }

    #[test]
    fn test_text_contains_term() {
        assert!(text_contains_term("Running Shoes", "shoes"));
        assert!(text_contains_term("Running Shoes", "NING SH"));
        assert!(!text_contains_term("Running Shoes", "boots"));
        assert!(text_contains_term("abc", ""));
        assert!(!text_contains_term("ab", "abc"));
        assert!(text_contains_term("Über Schuhe", "über"));
        assert!(text_contains_term("ÉCOLE paris", "école"));
    }

    #[test]
    fn test_include_folds_non_ascii_case() {
        let universe = vec![
            row(1, "Über Schuhe", &[]),
            row(2, "ÉCOLE paris", &[]),
            row(3, "running shoes", &[]),
        ];
        let filters = KeywordFilters {
            include: "über, école".to_string(),
            ..Default::default()
        };
        let kept = filter_rows(&universe, &filters, View::Ungrouped, MatchType::Any, MatchType::Any);
        assert_eq!(ids(&kept), vec![1, 2]);

        let filters = KeywordFilters {
            exclude: "ÜBER".to_string(),
            ..Default::default()
        };
        let kept = filter_rows(&universe, &filters, View::Ungrouped, MatchType::Any, MatchType::Any);
        assert_eq!(ids(&kept), vec![2, 3]);
    }

    #[test]
    fn test_serp_features_ignore_case() {
        let mut snippet = row(1, "seo", &[]);
        snippet.serp_features = vec!["Featured Snippet".to_string(), "Video".to_string()];
        let plain = row(2, "seo tools", &[]);

        let filters = KeywordFilters {
            serp_features: vec!["featured snippet".to_string()],
            ..Default::default()
        };
        let kept = filter_rows(&[snippet, plain], &filters, View::Ungrouped, MatchType::Any, MatchType::Any);
        assert_eq!(ids(&kept), vec![1]);
    }

    #[test]
    fn test_token_filter_requires_every_token() {
        let universe = vec![row(1, "x", &["a", "b"]), row(2, "y", &["a"]), row(3, "z", &["b", "c"])];
        let filters = KeywordFilters {
            tokens: vec!["a".to_string()],
            ..Default::default()
        };
        let kept = filter_rows(&universe, &filters, View::Grouped, MatchType::Any, MatchType::Any);
        assert_eq!(ids(&kept), vec![1, 2]);

        let filters = KeywordFilters {
            tokens: vec!["a".to_string(), "b".to_string()],
            ..Default::default()
        };
        let kept = filter_rows(&universe, &filters, View::Grouped, MatchType::Any, MatchType::Any);
        assert_eq!(ids(&kept), vec![1]);
    }

    #[test]
    fn test_include_any_and_all() {
        let universe = vec![
            row(1, "running shoes", &[]),
            row(2, "running socks", &[]),
            row(3, "walking boots", &[]),
        ];
        let filters = KeywordFilters {
            include: "running, shoes".to_string(),
            ..Default::default()
        };
        let any = filter_rows(&universe, &filters, View::Grouped, MatchType::Any, MatchType::Any);
        assert_eq!(ids(&any), vec![1, 2]);
        let all = filter_rows(&universe, &filters, View::Grouped, MatchType::All, MatchType::Any);
        assert_eq!(ids(&all), vec![1]);
    }

    #[test]
    fn test_exclude_any_and_all() {
        let universe = vec![
            row(1, "running shoes", &[]),
            row(2, "running socks", &[]),
            row(3, "walking boots", &[]),
        ];
        let filters = KeywordFilters {
            exclude: "running, shoes".to_string(),
            ..Default::default()
        };
        let any = filter_rows(&universe, &filters, View::Grouped, MatchType::Any, MatchType::Any);
        assert_eq!(ids(&any), vec![3]);
        let all = filter_rows(&universe, &filters, View::Grouped, MatchType::Any, MatchType::All);
        assert_eq!(ids(&all), vec![2, 3]);
    }

    #[test]
    fn test_include_matches_group_name_only_in_grouped_views() {
        let mut child = row(1, "trail runners", &[]);
        child.group_name = Some("running shoes".to_string());
        let filters = KeywordFilters {
            include: "shoes".to_string(),
            ..Default::default()
        };

        let grouped = filter_rows(&[child.clone()], &filters, View::Grouped, MatchType::Any, MatchType::Any);
        assert_eq!(grouped.len(), 1);
        let ungrouped = filter_rows(&[child], &filters, View::Ungrouped, MatchType::Any, MatchType::Any);
        assert!(ungrouped.is_empty());
    }

    #[test]
    fn test_serp_features_and_numeric_bounds() {
        let mut a = row(1, "a", &[]);
        a.serp_features = vec!["video".to_string(), "faq".to_string()];
        a.volume = 500;
        let mut b = row(2, "b", &[]);
        b.serp_features = vec!["video".to_string()];
        b.volume = 500;
        let mut c = row(3, "c", &[]);
        c.serp_features = vec!["video".to_string(), "faq".to_string()];
        c.volume = 50;

        let filters = KeywordFilters {
            serp_features: vec!["video".to_string(), "faq".to_string()],
            volume: NumericRange::new(Some(100.0), None),
            ..Default::default()
        };
        let kept = filter_rows(&[a, b, c], &filters, View::Grouped, MatchType::Any, MatchType::Any);
        assert_eq!(ids(&kept), vec![1]);
    }
}
