//! Universal data types for the grid browsing engine
//!
//! These types give a normalized representation of schema metadata,
//! browse requests, and result sets, independent of the backing database.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a single browse request, used for log correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifies a browsable relation: schema plus table name.
///
/// Hash/Eq so it can key batched catalog lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: String,
    pub name: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

// ==================== Schema Metadata ====================

/// Column metadata, one per column, ordered by ordinal position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    /// Declared type name (database-specific)
    pub data_type: String,
    /// Declared maximum length for character types, if any
    pub max_length: Option<u32>,
    pub nullable: bool,
    pub is_primary_key: bool,
}

impl ColumnMeta {
    /// Convenience constructor for non-key columns.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            max_length: None,
            nullable: true,
            is_primary_key: false,
        }
    }
}

/// Foreign-key edge from a column of the owning table to a referenced table.
///
/// Invariant: `column` exists in the owning table's ColumnMeta set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyEdge {
    /// The column in the owning table
    pub column: String,
    pub referenced_schema: String,
    pub referenced_table: String,
    pub referenced_column: String,
    /// The constraint name (optional)
    pub constraint_name: Option<String>,
}

impl ForeignKeyEdge {
    /// The referenced relation as a TableRef.
    pub fn referenced(&self) -> TableRef {
        TableRef::new(&self.referenced_schema, &self.referenced_table)
    }
}

/// Resolved mapping from a foreign-key column to the column on the
/// referenced table chosen to represent it to a human reader.
///
/// Derived per request from ForeignKeyEdge + referenced-table metadata;
/// never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayBinding {
    pub fk_column: String,
    pub referenced: TableRef,
    pub referenced_column: String,
    /// A string-typed column of the referenced table
    pub display_column: String,
}

impl DisplayBinding {
    /// Alias under which the planner selects the display column.
    pub fn display_alias(&self) -> String {
        format!("{}_display", self.fk_column)
    }

    /// Alias for the joined referenced table, derived from the FK column so
    /// two edges to the same table cannot collide.
    pub fn join_alias(&self) -> String {
        format!("fk_{}", self.fk_column)
    }
}

// ==================== Browse Request ====================

/// Sort direction for query results
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Single-column sort request. At most one active sort per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

/// Substring filter on one column. Rendered as a bound `LIKE '%pattern%'`
/// predicate, never concatenated into the SQL text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnFilter {
    pub column: String,
    pub pattern: String,
}

/// Controls how foreign-key columns are presented to the caller
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FkDisplayMode {
    /// Raw key value only, no joins
    #[default]
    KeyOnly,
    /// Key plus a separately-aliased human-readable display value
    KeyDisplay,
    /// Display value only, re-labeled to the key column's name
    DisplayOnly,
}

impl FkDisplayMode {
    /// Whether this mode requires joins to the referenced tables.
    pub fn needs_joins(&self) -> bool {
        !matches!(self, FkDisplayMode::KeyOnly)
    }
}

/// Options for browsing table data with pagination, sorting, and filtering
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BrowseOptions {
    /// Page number (1-based)
    pub page: Option<u32>,
    /// Page size (default: 100, max: 1000)
    pub page_size: Option<u32>,
    /// Columns to select; unknown names are dropped, None means all
    pub visible_columns: Option<Vec<String>>,
    /// Column to sort by; unknown names fall back to the first column
    pub sort: Option<SortSpec>,
    /// Substring filters; entries on unknown columns are dropped
    #[serde(default)]
    pub filters: Vec<ColumnFilter>,
    /// Foreign-key presentation mode
    #[serde(default)]
    pub fk_mode: FkDisplayMode,
}

impl BrowseOptions {
    pub const DEFAULT_PAGE_SIZE: u32 = 100;
    pub const MAX_PAGE_SIZE: u32 = 1000;

    /// Returns the effective page number (1-based, floored at 1)
    pub fn effective_page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Returns the effective page size, clamped to [1, 1000]
    pub fn effective_page_size(&self) -> u32 {
        self.page_size
            .unwrap_or(Self::DEFAULT_PAGE_SIZE)
            .clamp(1, Self::MAX_PAGE_SIZE)
    }

    /// Returns the row offset for pagination
    pub fn offset(&self) -> u64 {
        (self.effective_page() as u64 - 1) * self.effective_page_size() as u64
    }
}

// ==================== Values & Result Sets ====================

/// Universal value representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(#[serde(with = "base64_bytes")] Vec<u8>),
    Json(serde_json::Value),
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Column descriptor for a result set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

/// A single row of data (indexed by column order)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub values: Vec<Value>,
}

/// Query execution result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column information
    pub columns: Vec<ColumnInfo>,
    /// Result rows
    pub rows: Vec<Row>,
    /// Execution time in milliseconds
    pub execution_time_ms: f64,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            execution_time_ms: 0.0,
        }
    }

    /// Ordinal of a column by name, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// One page of browsed table data with pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablePage {
    /// The data rows for the current page
    pub result: QueryResult,
    /// Total number of rows matching the filters (before pagination)
    pub total_rows: u64,
    /// Current page (1-based)
    pub page: u32,
    /// Page size used
    pub page_size: u32,
    /// Total number of pages
    pub total_pages: u32,
    /// Human-readable SQL equivalent of this page, suitable for saving
    /// as a reusable query
    pub query_text: String,
}

impl TablePage {
    /// Creates a page from a shaped result plus pagination info
    pub fn new(
        result: QueryResult,
        total_rows: u64,
        page: u32,
        page_size: u32,
        query_text: String,
    ) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            ((total_rows + page_size as u64 - 1) / page_size as u64) as u32
        };
        Self {
            result,
            total_rows,
            page,
            page_size,
            total_pages,
            query_text,
        }
    }
}
