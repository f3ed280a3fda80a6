//! Foreign-key display resolution
//!
//! For each foreign-key column on a table, picks a "display" column on the
//! referenced table so the grid can show a human-readable value next to
//! (or instead of) the raw key. Metadata for all distinct referenced
//! tables is fetched in a single batched catalog round trip.
//!
//! The column choice is a best-effort heuristic, not a guarantee; it is
//! pluggable via [`DisplayColumnStrategy`].

use std::collections::HashMap;

use crate::engine::error::EngineResult;
use crate::engine::traits::SchemaCatalog;
use crate::engine::types::{ColumnMeta, DisplayBinding, ForeignKeyEdge, TableRef};

/// Column names that make good display values, in priority order.
const WELL_KNOWN_DISPLAY_NAMES: [&str; 4] = ["name", "title", "description", "code"];

/// Type names counted as the string family for display purposes.
fn is_string_type(data_type: &str) -> bool {
    let upper = data_type.to_uppercase();
    upper.contains("CHAR")      // char, varchar, nchar, nvarchar, character varying
        || upper.contains("TEXT")
        || upper.contains("CLOB")
        || upper == "STRING"
}

/// Picks the display column for a referenced table, given its columns in
/// ordinal order. `None` means the foreign key renders as key-only
/// regardless of the requested mode.
pub trait DisplayColumnStrategy: Send + Sync {
    fn pick(&self, columns: &[ColumnMeta]) -> Option<String>;
}

/// Default strategy: a well-known name (`name`, `title`, `description`,
/// `code`, case-insensitive, in that priority order), else the first
/// string-typed column by ordinal.
pub struct WellKnownNameStrategy;

impl DisplayColumnStrategy for WellKnownNameStrategy {
    fn pick(&self, columns: &[ColumnMeta]) -> Option<String> {
        for wanted in WELL_KNOWN_DISPLAY_NAMES {
            if let Some(col) = columns.iter().find(|c| c.name.eq_ignore_ascii_case(wanted)) {
                return Some(col.name.clone());
            }
        }
        columns
            .iter()
            .find(|c| is_string_type(&c.data_type))
            .map(|c| c.name.clone())
    }
}

/// Resolves display bindings for every foreign-key edge on a table.
///
/// All distinct referenced tables are looked up in one `columns_batch`
/// call; edges whose referenced table yields no display column produce no
/// binding.
pub async fn resolve_bindings(
    catalog: &dyn SchemaCatalog,
    edges: &[ForeignKeyEdge],
    strategy: &dyn DisplayColumnStrategy,
) -> EngineResult<Vec<DisplayBinding>> {
    if edges.is_empty() {
        return Ok(Vec::new());
    }

    let mut referenced: Vec<TableRef> = Vec::new();
    for edge in edges {
        let table = edge.referenced();
        if !referenced.contains(&table) {
            referenced.push(table);
        }
    }

    let columns_by_table: HashMap<TableRef, Vec<ColumnMeta>> =
        catalog.columns_batch(&referenced).await?;

    let mut bindings = Vec::new();
    for edge in edges {
        let table = edge.referenced();
        let Some(columns) = columns_by_table.get(&table) else {
            continue;
        };
        if let Some(display_column) = strategy.pick(columns) {
            bindings.push(DisplayBinding {
                fk_column: edge.column.clone(),
                referenced: table,
                referenced_column: edge.referenced_column.clone(),
                display_column,
            });
        } else {
            tracing::debug!(
                fk_column = %edge.column,
                referenced = %table,
                "no display column resolved, foreign key renders key-only"
            );
        }
    }

    Ok(bindings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_col(name: &str) -> ColumnMeta {
        ColumnMeta::new(name, "character varying")
    }

    #[test]
    fn well_known_name_beats_earlier_string_column() {
        // `other` is string-typed and ordinally earlier, but `code` is a
        // priority name match.
        let columns = vec![
            ColumnMeta::new("id", "integer"),
            string_col("other"),
            string_col("code"),
        ];
        let picked = WellKnownNameStrategy.pick(&columns);
        assert_eq!(picked.as_deref(), Some("code"));
    }

    #[test]
    fn priority_order_among_well_known_names() {
        let columns = vec![string_col("code"), string_col("title")];
        let picked = WellKnownNameStrategy.pick(&columns);
        assert_eq!(picked.as_deref(), Some("title"));
    }

    #[test]
    fn name_match_is_case_insensitive() {
        let columns = vec![ColumnMeta::new("id", "integer"), string_col("Name")];
        let picked = WellKnownNameStrategy.pick(&columns);
        assert_eq!(picked.as_deref(), Some("Name"));
    }

    #[test]
    fn falls_back_to_first_string_typed_column() {
        let columns = vec![
            ColumnMeta::new("id", "integer"),
            ColumnMeta::new("amount", "numeric"),
            ColumnMeta::new("label_a", "text"),
            ColumnMeta::new("label_b", "text"),
        ];
        let picked = WellKnownNameStrategy.pick(&columns);
        assert_eq!(picked.as_deref(), Some("label_a"));
    }

    #[test]
    fn no_string_column_yields_no_binding() {
        let columns = vec![
            ColumnMeta::new("id", "integer"),
            ColumnMeta::new("amount", "numeric"),
        ];
        assert!(WellKnownNameStrategy.pick(&columns).is_none());
    }

    #[test]
    fn string_family_detection() {
        assert!(is_string_type("character varying"));
        assert!(is_string_type("NVARCHAR"));
        assert!(is_string_type("text"));
        assert!(!is_string_type("integer"));
        assert!(!is_string_type("bytea"));
    }
}
