//! Result Shaper
//!
//! Post-processes raw result sets per foreign-key display mode before they
//! reach the caller: strips the pagination-sequence helper column, and in
//! display-only mode replaces each foreign-key column's identity with its
//! resolved display value.

use crate::engine::planner::ROW_SEQ_COLUMN;
use crate::engine::types::{DisplayBinding, FkDisplayMode, QueryResult};

/// Shapes a raw result set for the caller.
///
/// KeyOnly and KeyDisplay pass through: the planner already selected
/// exactly what those modes expose. DisplayOnly drops the key column when
/// still present and renames `<fk>_display` to the key column's original
/// name, so the caller sees one field carrying the human-readable value
/// under the original column identity. The row-sequence helper column is
/// stripped in every mode.
pub fn shape(
    mut result: QueryResult,
    fk_mode: FkDisplayMode,
    bindings: &[DisplayBinding],
) -> QueryResult {
    if let Some(idx) = result.column_index(ROW_SEQ_COLUMN) {
        remove_column(&mut result, idx);
    }

    if fk_mode == FkDisplayMode::DisplayOnly {
        for binding in bindings {
            let alias = binding.display_alias();
            if result.column_index(&alias).is_none() {
                // Edge without a selected display column; nothing to relabel.
                continue;
            }
            if let Some(key_idx) = result.column_index(&binding.fk_column) {
                remove_column(&mut result, key_idx);
            }
            if let Some(display_idx) = result.column_index(&alias) {
                result.columns[display_idx].name = binding.fk_column.clone();
            }
        }
    }

    result
}

fn remove_column(result: &mut QueryResult, idx: usize) {
    result.columns.remove(idx);
    for row in &mut result.rows {
        if idx < row.values.len() {
            row.values.remove(idx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{ColumnInfo, Row, TableRef, Value};

    fn column(name: &str) -> ColumnInfo {
        ColumnInfo {
            name: name.to_string(),
            data_type: "text".to_string(),
            nullable: true,
        }
    }

    fn manager_binding() -> DisplayBinding {
        DisplayBinding {
            fk_column: "manager_id".to_string(),
            referenced: TableRef::new("public", "employees"),
            referenced_column: "id".to_string(),
            display_column: "name".to_string(),
        }
    }

    fn result_with(columns: Vec<ColumnInfo>, rows: Vec<Vec<Value>>) -> QueryResult {
        QueryResult {
            columns,
            rows: rows.into_iter().map(|values| Row { values }).collect(),
            execution_time_ms: 0.0,
        }
    }

    #[test]
    fn key_only_passes_through() {
        let result = result_with(
            vec![column("id"), column("manager_id")],
            vec![vec![Value::Int(1), Value::Int(7)]],
        );
        let shaped = shape(result.clone(), FkDisplayMode::KeyOnly, &[manager_binding()]);
        assert_eq!(shaped, result);
    }

    #[test]
    fn key_display_exposes_both_fields() {
        let result = result_with(
            vec![column("id"), column("manager_id"), column("manager_id_display")],
            vec![vec![
                Value::Int(1),
                Value::Int(7),
                Value::Text("Ada".to_string()),
            ]],
        );
        let shaped = shape(result, FkDisplayMode::KeyDisplay, &[manager_binding()]);
        let names: Vec<&str> = shaped.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "manager_id", "manager_id_display"]);
    }

    #[test]
    fn display_only_relabels_display_value_to_key_name() {
        // Planner already excluded the key column from the select list.
        let result = result_with(
            vec![column("id"), column("manager_id_display")],
            vec![vec![Value::Int(1), Value::Text("Ada".to_string())]],
        );
        let shaped = shape(result, FkDisplayMode::DisplayOnly, &[manager_binding()]);
        let names: Vec<&str> = shaped.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "manager_id"]);
        assert_eq!(shaped.rows[0].values[1], Value::Text("Ada".to_string()));
    }

    #[test]
    fn display_only_drops_key_column_when_still_present() {
        // An executor that returned both the key and the display column.
        let result = result_with(
            vec![column("id"), column("manager_id"), column("manager_id_display")],
            vec![vec![
                Value::Int(1),
                Value::Int(7),
                Value::Text("Ada".to_string()),
            ]],
        );
        let shaped = shape(result, FkDisplayMode::DisplayOnly, &[manager_binding()]);
        let names: Vec<&str> = shaped.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "manager_id"]);
        assert_eq!(shaped.rows[0].values[1], Value::Text("Ada".to_string()));
    }

    #[test]
    fn row_sequence_helper_is_stripped_in_every_mode() {
        let result = result_with(
            vec![column("id"), column(ROW_SEQ_COLUMN)],
            vec![vec![Value::Int(1), Value::Int(51)]],
        );
        let shaped = shape(result, FkDisplayMode::KeyOnly, &[]);
        let names: Vec<&str> = shaped.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id"]);
        assert_eq!(shaped.rows[0].values.len(), 1);
    }

    #[test]
    fn binding_without_selected_display_column_is_ignored() {
        let result = result_with(
            vec![column("id"), column("manager_id")],
            vec![vec![Value::Int(1), Value::Int(7)]],
        );
        let shaped = shape(result, FkDisplayMode::DisplayOnly, &[manager_binding()]);
        let names: Vec<&str> = shaped.columns.iter().map(|c| c.name.as_str()).collect();
        // The key column survives: with no display value selected there is
        // nothing to replace it with.
        assert_eq!(names, vec!["id", "manager_id"]);
    }
}
