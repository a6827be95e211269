//! Tool definitions: declared metadata and JSON-Schema contracts.

pub mod loader;
pub mod types;

pub use loader::{load_definition, load_definition_from_source};
pub use types::{validate_object_schema, ToolDefinition};
