//! Identifier validation
//!
//! Caller-supplied column names are checked against the per-request
//! ColumnMeta snapshot before they are interpolated into generated SQL.
//! This is the sole defense against injection via column, sort, or filter
//! names: anything not present in the snapshot never reaches the SQL text.
//!
//! Unknown names are not errors. A user typing a filter on a since-dropped
//! column must not break the page, so invalid sort columns fall back to
//! the first column by ordinal and invalid filter columns are dropped.

use crate::engine::types::{ColumnFilter, ColumnMeta, SortDirection, SortSpec};

/// Exact, case-sensitive membership check against the snapshot.
///
/// Case handling follows the catalog: the snapshot carries names in the
/// catalog's collation, and candidates must match them exactly.
pub fn is_known_column(columns: &[ColumnMeta], candidate: &str) -> bool {
    columns.iter().any(|c| c.name == candidate)
}

/// Resolves the effective sort column and direction.
///
/// A validated `SortSpec` wins; otherwise the first column by ordinal with
/// ascending direction. `None` only when the table has zero columns, which
/// forces the pagination-sequence fallback downstream.
pub fn effective_sort(
    columns: &[ColumnMeta],
    sort: Option<&SortSpec>,
) -> Option<(String, SortDirection)> {
    if let Some(spec) = sort {
        if is_known_column(columns, &spec.column) {
            return Some((spec.column.clone(), spec.direction));
        }
        tracing::debug!(column = %spec.column, "unknown sort column, falling back to first ordinal");
    }
    columns
        .first()
        .map(|c| (c.name.clone(), SortDirection::Asc))
}

/// Drops filters whose column is not in the snapshot, without erroring.
pub fn retain_valid_filters(columns: &[ColumnMeta], filters: Vec<ColumnFilter>) -> Vec<ColumnFilter> {
    filters
        .into_iter()
        .filter(|f| {
            let known = is_known_column(columns, &f.column);
            if !known {
                tracing::debug!(column = %f.column, "dropping filter on unknown column");
            }
            known
        })
        .collect()
}

/// Screens a caller-supplied visible-column list against the snapshot,
/// preserving request order. `None` (or a list that screens to empty)
/// means all columns.
pub fn retain_visible_columns(
    columns: &[ColumnMeta],
    visible: Option<&[String]>,
) -> Vec<String> {
    let all = || columns.iter().map(|c| c.name.clone()).collect::<Vec<_>>();
    match visible {
        None => all(),
        Some(requested) => {
            let kept: Vec<String> = requested
                .iter()
                .filter(|name| is_known_column(columns, name))
                .cloned()
                .collect();
            if kept.is_empty() {
                all()
            } else {
                kept
            }
        }
    }
}
