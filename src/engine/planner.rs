//! Query Planner
//!
//! Builds a structured, parameterized query plan from a validated browse
//! request: base select list, optional foreign-key display joins, bound
//! filter predicates, an order clause, and a pagination strategy. The same
//! plan renders three ways: the parameterized data query, the count query
//! sharing its WHERE clause, and a literal human-readable text the caller
//! can save as a reusable query.
//!
//! The planner trusts its inputs to be pre-validated (see `validation`);
//! it never re-verifies table existence. Planning a missing table
//! succeeds, and execution fails downstream with a relation-not-found
//! class error that is surfaced as-is.

use serde::{Deserialize, Serialize};

use crate::engine::dialect::SqlDialect;
use crate::engine::types::{
    ColumnFilter, DisplayBinding, FkDisplayMode, SortDirection, TableRef, Value,
};

/// Alias for the base table in generated queries.
const BASE_ALIAS: &str = "t";

/// Name of the helper column carrying the synthetic row sequence in the
/// windowed pagination fallback. Stripped by the result shaper.
pub const ROW_SEQ_COLUMN: &str = "__row_seq";

/// How a page of rows is carved out of the ordered (or unordered) relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationStrategy {
    /// Plain LIMIT/OFFSET on the ordered relation. Preferred.
    OffsetLimit,
    /// Wrap the base query in a derived table that assigns a row sequence
    /// number ordered by a constant, then filter the sequence range. Used
    /// when no sort column can be established; functionally equivalent to
    /// LIMIT/OFFSET at the cost of an extra derived-table layer.
    RowSequence,
}

/// One entry of the select list
#[derive(Debug, Clone, Serialize, Deserialize)]
enum SelectItem {
    /// A column of the base table
    Base { column: String },
    /// A display column pulled in through a foreign-key join
    Joined {
        join_alias: String,
        column: String,
        output_alias: String,
    },
}

/// A LEFT JOIN to a foreign-key referenced table
#[derive(Debug, Clone, Serialize, Deserialize)]
struct JoinClause {
    table: TableRef,
    alias: String,
    /// Column on the base table
    fk_column: String,
    /// Column on the referenced table
    referenced_column: String,
}

/// Parameterized query plan for one browse request.
///
/// Built fresh per request and discarded with it; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPlan {
    dialect: SqlDialect,
    table: TableRef,
    select_list: Vec<SelectItem>,
    joins: Vec<JoinClause>,
    /// Validated filters, in bind order
    filters: Vec<ColumnFilter>,
    order_by: Option<(String, SortDirection)>,
    pagination: PaginationStrategy,
    offset: u64,
    limit: u32,
}

impl QueryPlan {
    /// Assembles a plan from validated request state.
    ///
    /// `visible_columns`, `sort`, and `filters` must already have passed
    /// identifier validation; `bindings` come from foreign-key display
    /// resolution. `sort: None` means the table has no sortable column and
    /// selects the row-sequence pagination fallback.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        dialect: SqlDialect,
        table: &TableRef,
        visible_columns: &[String],
        sort: Option<(String, SortDirection)>,
        filters: Vec<ColumnFilter>,
        bindings: &[DisplayBinding],
        fk_mode: FkDisplayMode,
        offset: u64,
        limit: u32,
    ) -> Self {
        // Only bindings whose key column is actually selected matter.
        let active: Vec<&DisplayBinding> = if fk_mode.needs_joins() {
            bindings
                .iter()
                .filter(|b| visible_columns.iter().any(|c| *c == b.fk_column))
                .collect()
        } else {
            Vec::new()
        };

        let mut select_list: Vec<SelectItem> = Vec::new();
        for column in visible_columns {
            let replaced_by_display = fk_mode == FkDisplayMode::DisplayOnly
                && active.iter().any(|b| b.fk_column == *column);
            if !replaced_by_display {
                select_list.push(SelectItem::Base {
                    column: column.clone(),
                });
            }
        }
        for binding in &active {
            select_list.push(SelectItem::Joined {
                join_alias: binding.join_alias(),
                column: binding.display_column.clone(),
                output_alias: binding.display_alias(),
            });
        }

        let joins: Vec<JoinClause> = active
            .iter()
            .map(|b| JoinClause {
                table: b.referenced.clone(),
                alias: b.join_alias(),
                fk_column: b.fk_column.clone(),
                referenced_column: b.referenced_column.clone(),
            })
            .collect();

        let pagination = if sort.is_some() {
            PaginationStrategy::OffsetLimit
        } else {
            PaginationStrategy::RowSequence
        };

        Self {
            dialect,
            table: table.clone(),
            select_list,
            joins,
            filters,
            order_by: sort,
            pagination,
            offset,
            limit,
        }
    }

    pub fn pagination(&self) -> PaginationStrategy {
        self.pagination
    }

    /// Bind parameters for both the data and the count query, in
    /// placeholder order: one `%pattern%` text per filter.
    pub fn params(&self) -> Vec<Value> {
        self.filters
            .iter()
            .map(|f| Value::Text(format!("%{}%", f.pattern)))
            .collect()
    }

    /// The parameterized data query.
    pub fn data_sql(&self) -> String {
        let mut next_param = 1usize;
        self.render_data(&mut |_| {
            let placeholder = self.dialect.placeholder(next_param);
            next_param += 1;
            placeholder
        })
    }

    /// The count query: same WHERE clause, no joins and no ORDER BY.
    ///
    /// Foreign-key LEFT JOINs are excluded on the assumption that the
    /// referenced columns are effectively unique, so they cannot change
    /// the row count. A join to a non-unique referenced column would make
    /// the data query return more rows than this count reports; that is a
    /// known count-accuracy limitation, not something hidden here.
    pub fn count_sql(&self) -> String {
        let mut next_param = 1usize;
        let mut sql = format!(
            "SELECT COUNT(*) FROM {} AS {}",
            self.dialect.qualified_table(&self.table),
            self.dialect.quote_ident(BASE_ALIAS)
        );
        let where_sql = self.render_where(&mut |_| {
            let placeholder = self.dialect.placeholder(next_param);
            next_param += 1;
            placeholder
        });
        sql.push_str(&where_sql);
        sql
    }

    /// A literal, human-readable rendering of the same plan, with bind
    /// values inlined as dialect-escaped literals. This is the text
    /// returned to the caller as the page's saved-query equivalent.
    pub fn display_sql(&self) -> String {
        let dialect = self.dialect;
        self.render_data(&mut |value| dialect.format_value(value))
    }

    // ==================== Rendering ====================

    fn render_data(&self, render_param: &mut dyn FnMut(&Value) -> String) -> String {
        match self.pagination {
            PaginationStrategy::OffsetLimit => {
                let mut sql = format!(
                    "SELECT {} FROM {}{}",
                    self.render_select_list(),
                    self.render_from(),
                    self.render_where(render_param)
                );
                if let Some((column, direction)) = &self.order_by {
                    sql.push_str(&format!(
                        " ORDER BY {}.{} {}",
                        self.dialect.quote_ident(BASE_ALIAS),
                        self.dialect.quote_ident(column),
                        direction.as_sql()
                    ));
                }
                sql.push_str(&format!(" LIMIT {} OFFSET {}", self.limit, self.offset));
                sql
            }
            PaginationStrategy::RowSequence => {
                // No establishable order: number the rows with a
                // constant-ordered window and filter the sequence range.
                let seq_start = self.offset + 1;
                let seq_end = self.offset + self.limit as u64;
                format!(
                    "SELECT * FROM (SELECT {}, ROW_NUMBER() OVER (ORDER BY (SELECT NULL)) AS {} FROM {}{}) AS {} WHERE {} BETWEEN {} AND {}",
                    self.render_select_list(),
                    self.dialect.quote_ident(ROW_SEQ_COLUMN),
                    self.render_from(),
                    self.render_where(render_param),
                    self.dialect.quote_ident("numbered"),
                    self.dialect.quote_ident(ROW_SEQ_COLUMN),
                    seq_start,
                    seq_end
                )
            }
        }
    }

    fn render_select_list(&self) -> String {
        if self.select_list.is_empty() {
            // Zero visible columns: select everything and let execution
            // decide whether the relation is usable.
            return format!("{}.*", self.dialect.quote_ident(BASE_ALIAS));
        }
        self.select_list
            .iter()
            .map(|item| match item {
                SelectItem::Base { column } => format!(
                    "{}.{}",
                    self.dialect.quote_ident(BASE_ALIAS),
                    self.dialect.quote_ident(column)
                ),
                SelectItem::Joined {
                    join_alias,
                    column,
                    output_alias,
                } => format!(
                    "{}.{} AS {}",
                    self.dialect.quote_ident(join_alias),
                    self.dialect.quote_ident(column),
                    self.dialect.quote_ident(output_alias)
                ),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn render_from(&self) -> String {
        let mut from = format!(
            "{} AS {}",
            self.dialect.qualified_table(&self.table),
            self.dialect.quote_ident(BASE_ALIAS)
        );
        for join in &self.joins {
            from.push_str(&format!(
                " LEFT JOIN {} AS {} ON {}.{} = {}.{}",
                self.dialect.qualified_table(&join.table),
                self.dialect.quote_ident(&join.alias),
                self.dialect.quote_ident(BASE_ALIAS),
                self.dialect.quote_ident(&join.fk_column),
                self.dialect.quote_ident(&join.alias),
                self.dialect.quote_ident(&join.referenced_column)
            ));
        }
        from
    }

    fn render_where(&self, render_param: &mut dyn FnMut(&Value) -> String) -> String {
        if self.filters.is_empty() {
            return String::new();
        }
        let predicates: Vec<String> = self
            .filters
            .iter()
            .map(|f| {
                let bound = Value::Text(format!("%{}%", f.pattern));
                format!(
                    "{}.{} LIKE {}",
                    self.dialect.quote_ident(BASE_ALIAS),
                    self.dialect.quote_ident(&f.column),
                    render_param(&bound)
                )
            })
            .collect();
        format!(" WHERE {}", predicates.join(" AND "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders_table() -> TableRef {
        TableRef::new("public", "orders")
    }

    fn base_plan(sort: Option<(String, SortDirection)>, filters: Vec<ColumnFilter>) -> QueryPlan {
        QueryPlan::build(
            SqlDialect::Postgres,
            &orders_table(),
            &["id".to_string(), "customer_id".to_string()],
            sort,
            filters,
            &[],
            FkDisplayMode::KeyOnly,
            50,
            50,
        )
    }

    fn manager_binding() -> DisplayBinding {
        DisplayBinding {
            fk_column: "manager_id".to_string(),
            referenced: TableRef::new("public", "employees"),
            referenced_column: "id".to_string(),
            display_column: "name".to_string(),
        }
    }

    #[test]
    fn offset_limit_renders_order_and_range() {
        let plan = base_plan(Some(("id".to_string(), SortDirection::Asc)), Vec::new());
        let sql = plan.data_sql();
        assert_eq!(
            sql,
            "SELECT \"t\".\"id\", \"t\".\"customer_id\" FROM \"public\".\"orders\" AS \"t\" \
             ORDER BY \"t\".\"id\" ASC LIMIT 50 OFFSET 50"
        );
        assert_eq!(plan.pagination(), PaginationStrategy::OffsetLimit);
    }

    #[test]
    fn no_sort_column_selects_row_sequence_fallback() {
        let plan = base_plan(None, Vec::new());
        let sql = plan.data_sql();
        assert_eq!(plan.pagination(), PaginationStrategy::RowSequence);
        assert!(sql.contains("ROW_NUMBER() OVER (ORDER BY (SELECT NULL))"));
        assert!(sql.contains("\"__row_seq\" BETWEEN 51 AND 100"));
    }

    #[test]
    fn filters_become_bound_like_predicates() {
        let filters = vec![
            ColumnFilter {
                column: "customer_id".to_string(),
                pattern: "42".to_string(),
            },
            ColumnFilter {
                column: "id".to_string(),
                pattern: "7".to_string(),
            },
        ];
        let plan = base_plan(Some(("id".to_string(), SortDirection::Asc)), filters);
        let sql = plan.data_sql();
        assert!(sql.contains("WHERE \"t\".\"customer_id\" LIKE $1 AND \"t\".\"id\" LIKE $2"));
        assert_eq!(
            plan.params(),
            vec![
                Value::Text("%42%".to_string()),
                Value::Text("%7%".to_string())
            ]
        );
    }

    #[test]
    fn count_query_shares_where_but_not_joins_or_order() {
        let filters = vec![ColumnFilter {
            column: "id".to_string(),
            pattern: "9".to_string(),
        }];
        let plan = QueryPlan::build(
            SqlDialect::Postgres,
            &orders_table(),
            &["id".to_string(), "manager_id".to_string()],
            Some(("id".to_string(), SortDirection::Asc)),
            filters,
            &[manager_binding()],
            FkDisplayMode::KeyDisplay,
            0,
            100,
        );
        let count = plan.count_sql();
        assert_eq!(
            count,
            "SELECT COUNT(*) FROM \"public\".\"orders\" AS \"t\" WHERE \"t\".\"id\" LIKE $1"
        );
        assert!(!count.contains("JOIN"));
        assert!(!count.contains("ORDER BY"));
    }

    #[test]
    fn key_display_adds_join_and_aliased_display_column() {
        let plan = QueryPlan::build(
            SqlDialect::Postgres,
            &orders_table(),
            &["id".to_string(), "manager_id".to_string()],
            Some(("id".to_string(), SortDirection::Asc)),
            Vec::new(),
            &[manager_binding()],
            FkDisplayMode::KeyDisplay,
            0,
            100,
        );
        let sql = plan.data_sql();
        assert!(sql.contains("\"t\".\"manager_id\""));
        assert!(sql.contains("\"fk_manager_id\".\"name\" AS \"manager_id_display\""));
        assert!(sql.contains(
            "LEFT JOIN \"public\".\"employees\" AS \"fk_manager_id\" \
             ON \"t\".\"manager_id\" = \"fk_manager_id\".\"id\""
        ));
    }

    #[test]
    fn display_only_excludes_key_column_from_base_select() {
        let plan = QueryPlan::build(
            SqlDialect::Postgres,
            &orders_table(),
            &["id".to_string(), "manager_id".to_string()],
            Some(("id".to_string(), SortDirection::Asc)),
            Vec::new(),
            &[manager_binding()],
            FkDisplayMode::DisplayOnly,
            0,
            100,
        );
        let sql = plan.data_sql();
        assert!(!sql.contains("\"t\".\"manager_id\","));
        assert!(sql.contains("\"fk_manager_id\".\"name\" AS \"manager_id_display\""));
        assert!(sql.contains("LEFT JOIN"));
    }

    #[test]
    fn key_only_never_joins() {
        let plan = QueryPlan::build(
            SqlDialect::Postgres,
            &orders_table(),
            &["id".to_string(), "manager_id".to_string()],
            Some(("id".to_string(), SortDirection::Asc)),
            Vec::new(),
            &[manager_binding()],
            FkDisplayMode::KeyOnly,
            0,
            100,
        );
        let sql = plan.data_sql();
        assert!(!sql.contains("JOIN"));
        assert!(!sql.contains("_display"));
    }

    #[test]
    fn display_sql_inlines_literals() {
        let filters = vec![ColumnFilter {
            column: "customer_id".to_string(),
            pattern: "o'brien".to_string(),
        }];
        let plan = base_plan(Some(("id".to_string(), SortDirection::Asc)), filters);
        let text = plan.display_sql();
        assert!(text.contains("LIKE '%o''brien%'"));
        assert!(!text.contains('$'));
    }

    #[test]
    fn display_sql_is_deterministic() {
        let make = || {
            base_plan(
                Some(("id".to_string(), SortDirection::Desc)),
                vec![ColumnFilter {
                    column: "id".to_string(),
                    pattern: "1".to_string(),
                }],
            )
        };
        assert_eq!(make().display_sql(), make().display_sql());
    }

    #[test]
    fn mysql_placeholders_are_positionless() {
        let plan = QueryPlan::build(
            SqlDialect::MySql,
            &orders_table(),
            &["id".to_string()],
            Some(("id".to_string(), SortDirection::Asc)),
            vec![ColumnFilter {
                column: "id".to_string(),
                pattern: "5".to_string(),
            }],
            &[],
            FkDisplayMode::KeyOnly,
            0,
            10,
        );
        assert!(plan.data_sql().contains("`t`.`id` LIKE ?"));
    }
}
