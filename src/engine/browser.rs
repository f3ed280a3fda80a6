//! Table Browser
//!
//! Request-scoped orchestration of a browse request: snapshot the schema,
//! validate identifiers, resolve foreign-key display bindings, plan the
//! query, execute count + data, and shape the result page.
//!
//! The browser holds explicit catalog and executor handles. There is no
//! process-global connection state: tests and embedders can run any number
//! of browsers over independent (or fake) connections concurrently.

use std::sync::Arc;

use tracing::{field, instrument};

use crate::engine::dialect::SqlDialect;
use crate::engine::error::EngineResult;
use crate::engine::fk_display::{
    resolve_bindings, DisplayColumnStrategy, WellKnownNameStrategy,
};
use crate::engine::planner::QueryPlan;
use crate::engine::saved_query;
use crate::engine::shaping::shape;
use crate::engine::traits::{QueryExecutor, SchemaCatalog};
use crate::engine::types::{
    BrowseOptions, DisplayBinding, QueryResult, RequestId, TablePage, TableRef, Value,
};
use crate::engine::validation;

/// Browses tables of one connected database through a generic grid.
///
/// Cheap to clone; all request state lives on the stack of each call.
#[derive(Clone)]
pub struct TableBrowser {
    catalog: Arc<dyn SchemaCatalog>,
    executor: Arc<dyn QueryExecutor>,
    dialect: SqlDialect,
    display_strategy: Arc<dyn DisplayColumnStrategy>,
}

impl TableBrowser {
    pub fn new(
        catalog: Arc<dyn SchemaCatalog>,
        executor: Arc<dyn QueryExecutor>,
        dialect: SqlDialect,
    ) -> Self {
        Self {
            catalog,
            executor,
            dialect,
            display_strategy: Arc::new(WellKnownNameStrategy),
        }
    }

    /// Replaces the foreign-key display-column heuristic.
    pub fn with_display_strategy(mut self, strategy: Arc<dyn DisplayColumnStrategy>) -> Self {
        self.display_strategy = strategy;
        self
    }

    /// Fetches one page of table data with pagination, sorting, filtering,
    /// and foreign-key display resolution.
    #[instrument(
        skip(self, options),
        fields(
            table = %table,
            request_id = field::Empty,
            page = options.effective_page(),
            page_size = options.effective_page_size(),
            fk_mode = ?options.fk_mode,
        )
    )]
    pub async fn fetch_page(
        &self,
        table: &TableRef,
        options: &BrowseOptions,
    ) -> EngineResult<TablePage> {
        let request_id = RequestId::new();
        tracing::Span::current().record("request_id", field::display(request_id.0));

        let (plan, bindings) = self.derive_plan(table, options).await?;
        let params = plan.params();

        let count_result = self.executor.run(&plan.count_sql(), &params).await?;
        let total_rows = extract_count(&count_result);

        let data_result = self.executor.run(&plan.data_sql(), &params).await?;
        let shaped = shape(data_result, options.fk_mode, &bindings);

        tracing::debug!(
            total_rows,
            returned = shaped.rows.len(),
            "page fetched"
        );

        Ok(TablePage::new(
            shaped,
            total_rows,
            options.effective_page(),
            options.effective_page_size(),
            saved_query::reconstruct(&plan),
        ))
    }

    /// Regenerates the query text for the current grid state, without
    /// executing anything. Suitable for "save as query".
    #[instrument(skip(self, options), fields(table = %table))]
    pub async fn saved_query_text(
        &self,
        table: &TableRef,
        options: &BrowseOptions,
    ) -> EngineResult<String> {
        let (plan, _) = self.derive_plan(table, options).await?;
        Ok(saved_query::reconstruct(&plan))
    }

    /// Builds the query plan for a request: one catalog snapshot, identifier
    /// validation, and (when the mode needs joins) one batched foreign-key
    /// metadata lookup.
    async fn derive_plan(
        &self,
        table: &TableRef,
        options: &BrowseOptions,
    ) -> EngineResult<(QueryPlan, Vec<DisplayBinding>)> {
        let columns = self.catalog.columns(table).await?;

        let visible =
            validation::retain_visible_columns(&columns, options.visible_columns.as_deref());
        let filters = validation::retain_valid_filters(&columns, options.filters.clone());
        let sort = validation::effective_sort(&columns, options.sort.as_ref());

        let bindings = if options.fk_mode.needs_joins() {
            let edges = self.catalog.foreign_keys(table).await?;
            resolve_bindings(
                self.catalog.as_ref(),
                &edges,
                self.display_strategy.as_ref(),
            )
            .await?
        } else {
            Vec::new()
        };

        let plan = QueryPlan::build(
            self.dialect,
            table,
            &visible,
            sort,
            filters,
            &bindings,
            options.fk_mode,
            options.offset(),
            options.effective_page_size(),
        );

        Ok((plan, bindings))
    }
}

/// Reads the scalar out of a COUNT(*) result. A malformed result counts
/// as zero rather than failing the page.
fn extract_count(result: &QueryResult) -> u64 {
    result
        .rows
        .first()
        .and_then(|row| row.values.first())
        .map(|value| match value {
            Value::Int(i) => (*i).max(0) as u64,
            Value::Float(f) => f.max(0.0) as u64,
            Value::Text(s) => s.parse::<u64>().unwrap_or(0),
            _ => 0,
        })
        .unwrap_or(0)
}
