//! Saved-query text generation
//!
//! Lets the user save the current grid view as a reusable query. The text
//! is regenerated by re-rendering the structured plan that execution
//! already uses, so the saved text and the executed query can never drift
//! apart. An earlier design patched the previously generated text in place
//! (swap the pagination clause, splice the select list); re-rendering
//! replaces that entirely.

use crate::engine::planner::QueryPlan;

/// Renders the query text for the plan derived from the current grid
/// state: visible columns, sort, filters, foreign-key display mode, and
/// page. Deterministic: identical state yields identical text.
pub fn reconstruct(plan: &QueryPlan) -> String {
    plan.display_sql()
}
