//! Rebuilds the displayable root rows of a view.
//!
//! With an include/exclude text filter active, a grouped page may contain
//! children whose parent did not match. The UI needs exactly one header row per
//! visible group, so a stand-in parent is synthesized from the first row seen.

use std::collections::HashMap;

use crate::models::{Keyword, View};

/// Root rows ("parent" or standalone) for `view`.
///
/// Stand-ins are clones; rows held by the store are never modified.
pub fn materialize(view: View, rows: &[Keyword], include: &str, exclude: &str) -> Vec<Keyword> {
    let text_filter_active = !include.trim().is_empty() || !exclude.trim().is_empty();
    if !view.is_grouped_like() || !text_filter_active {
        return rows.to_vec();
    }

    let mut output: Vec<Keyword> = Vec::new();
    // group_id -> (index in output, has real parent)
    let mut groups: HashMap<&str, (usize, bool)> = HashMap::new();

    for row in rows {
        let Some(group_id) = row.group_id.as_deref() else {
            output.push(row.clone());
            continue;
        };

        match groups.get_mut(group_id) {
            None => {
                let mut representative = row.clone();
                representative.is_parent = true;
                groups.insert(group_id, (output.len(), row.is_parent));
                output.push(representative);
            }
            Some((index, has_parent)) => {
                if row.is_parent && !*has_parent {
                    output[*index] = row.clone();
                    *has_parent = true;
                }
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grouped(id: i64, text: &str, group: &str, is_parent: bool) -> Keyword {
        let mut kw = Keyword::new(id, 1, text, View::Grouped);
        kw.group_id = Some(group.to_string());
        kw.is_parent = is_parent;
        kw
    }

    #[test]
    fn test_ungrouped_rows_pass_through() {
        let rows = vec![Keyword::new(1, 1, "a", View::Ungrouped)];
        assert_eq!(materialize(View::Ungrouped, &rows, "a", ""), rows);
    }

    #[test]
    fn test_grouped_without_text_filter_passes_through() {
        let rows = vec![grouped(2, "child", "g", false)];
        let out = materialize(View::Grouped, &rows, "  ", "");
        assert_eq!(out, rows);
        assert!(!out[0].is_parent);
    }

    #[test]
    fn test_orphan_child_becomes_stand_in_parent() {
        let rows = vec![grouped(2, "child match", "G", false)];
        let out = materialize(View::Grouped, &rows, "match", "");
        assert_eq!(out.len(), 1);
        assert!(out[0].is_parent);
        assert_eq!(out[0].text, "child match");
        assert_eq!(out[0].id, 2);
    }

    #[test]
    fn test_real_parent_preferred_even_when_seen_later() {
        let rows = vec![
            grouped(2, "child", "G", false),
            grouped(1, "P", "G", true),
            grouped(3, "other child", "H", false),
        ];
        let out = materialize(View::Confirmed, &rows, "", "x");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, 1);
        assert_eq!(out[0].text, "P");
        assert_eq!(out[1].id, 3);
        assert!(out.iter().all(|r| r.is_parent));
    }

    #[test]
    fn test_first_seen_group_order_and_standalone_rows() {
        let mut standalone = Keyword::new(9, 1, "solo", View::Grouped);
        standalone.group_id = None;
        let rows = vec![
            grouped(4, "b child", "B", false),
            standalone.clone(),
            grouped(5, "a child", "A", false),
            grouped(6, "b child 2", "B", false),
        ];
        let out = materialize(View::Grouped, &rows, "child", "");
        let ids: Vec<i64> = out.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![4, 9, 5]);
    }

    #[test]
    fn test_input_rows_are_not_modified() {
        let rows = vec![grouped(2, "child", "G", false)];
        let _ = materialize(View::Grouped, &rows, "child", "");
        assert!(!rows[0].is_parent);
    }
}
