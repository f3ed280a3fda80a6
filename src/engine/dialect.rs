//! SQL Dialect
//!
//! Driver-specific rendering rules: identifier quoting, bind placeholders,
//! and literal formatting for the human-readable query text shown to the
//! user alongside each page.

use serde::{Deserialize, Serialize};

use crate::engine::types::{TableRef, Value};

/// SQL dialect for the supported database drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlDialect {
    Postgres,
    MySql,
    Sqlite,
}

impl SqlDialect {
    pub fn from_driver_id(driver_id: &str) -> Option<Self> {
        match driver_id.to_lowercase().as_str() {
            "postgres" | "postgresql" => Some(SqlDialect::Postgres),
            "mysql" | "mariadb" => Some(SqlDialect::MySql),
            "sqlite" => Some(SqlDialect::Sqlite),
            _ => None,
        }
    }

    /// Quote an identifier according to the dialect
    pub fn quote_ident(&self, name: &str) -> String {
        match self {
            SqlDialect::Postgres | SqlDialect::Sqlite => {
                format!("\"{}\"", name.replace('"', "\"\""))
            }
            SqlDialect::MySql => {
                format!("`{}`", name.replace('`', "``"))
            }
        }
    }

    /// Format a qualified table name (schema.table)
    pub fn qualified_table(&self, table: &TableRef) -> String {
        match self {
            SqlDialect::Postgres | SqlDialect::MySql => format!(
                "{}.{}",
                self.quote_ident(&table.schema),
                self.quote_ident(&table.name)
            ),
            // SQLite has no schemas worth qualifying
            SqlDialect::Sqlite => self.quote_ident(&table.name),
        }
    }

    /// Bind placeholder for the 1-based parameter position
    pub fn placeholder(&self, position: usize) -> String {
        match self {
            SqlDialect::Postgres => format!("${}", position),
            SqlDialect::MySql | SqlDialect::Sqlite => "?".to_string(),
        }
    }

    /// Format a value as a SQL literal
    pub fn format_value(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => match self {
                SqlDialect::Postgres => if *b { "TRUE" } else { "FALSE" }.to_string(),
                SqlDialect::MySql | SqlDialect::Sqlite => {
                    if *b { "1" } else { "0" }.to_string()
                }
            },
            Value::Int(i) => i.to_string(),
            Value::Float(f) => {
                if f.is_nan() {
                    "'NaN'".to_string()
                } else if f.is_infinite() {
                    if *f > 0.0 { "'Infinity'" } else { "'-Infinity'" }.to_string()
                } else {
                    format!("{}", f)
                }
            }
            Value::Text(s) => self.escape_string(s),
            Value::Bytes(b) => self.format_bytes(b),
            Value::Json(j) => {
                let json_str = serde_json::to_string(j).unwrap_or_else(|_| "null".to_string());
                self.escape_string(&json_str)
            }
        }
    }

    /// Escape a string for SQL
    fn escape_string(&self, s: &str) -> String {
        match self {
            SqlDialect::Postgres => {
                let mut escaped = String::with_capacity(s.len());
                let mut needs_e_prefix = false;

                for ch in s.chars() {
                    match ch {
                        '\\' => escaped.push_str("\\\\"),
                        '\'' => escaped.push_str("''"),
                        '\n' => {
                            needs_e_prefix = true;
                            escaped.push_str("\\n");
                        }
                        '\r' => {
                            needs_e_prefix = true;
                            escaped.push_str("\\r");
                        }
                        '\t' => {
                            needs_e_prefix = true;
                            escaped.push_str("\\t");
                        }
                        _ => escaped.push(ch),
                    }
                }

                if needs_e_prefix {
                    format!("E'{}'", escaped)
                } else {
                    format!("'{}'", escaped)
                }
            }
            SqlDialect::MySql => {
                let escaped = s
                    .replace('\\', "\\\\")
                    .replace('\'', "''")
                    .replace('\n', "\\n")
                    .replace('\r', "\\r")
                    .replace('\t', "\\t")
                    .replace('\0', "\\0");
                format!("'{}'", escaped)
            }
            SqlDialect::Sqlite => {
                format!("'{}'", s.replace('\'', "''"))
            }
        }
    }

    /// Format bytes as a SQL literal
    fn format_bytes(&self, bytes: &[u8]) -> String {
        let hex_string: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        match self {
            SqlDialect::Postgres => format!("'\\x{}'", hex_string),
            SqlDialect::MySql | SqlDialect::Sqlite => format!("X'{}'", hex_string),
        }
    }
}
