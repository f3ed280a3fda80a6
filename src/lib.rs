// relgrid - Schema-driven relational grid browsing engine
// Core library

pub mod engine;
pub mod observability;

pub use engine::browser::TableBrowser;
pub use engine::error::{EngineError, EngineResult};
pub use engine::types::{BrowseOptions, FkDisplayMode, TablePage, TableRef};
