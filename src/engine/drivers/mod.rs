// Backend drivers
// One connected backend implements both SchemaCatalog and QueryExecutor.

pub mod postgres;
