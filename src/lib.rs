//! Toolpack - tool packaging and embedding pipeline
//!
//! Bundles a tool's source into one self-contained file, reads its
//! declarative definition, embeds the definition's metadata and persists
//! everything as a `definition.json` artifact ready for semantic search.

pub mod artifact;
pub mod bundler;
pub mod cli;
pub mod config;
pub mod definition;
pub mod embedding;
pub mod error;
pub mod index;
pub mod pipeline;
pub mod script;

// Re-export key types for convenience
pub use artifact::{extend, EmbeddingMetadata, StoredDefinition, ToolArtifact, DEFINITION_FILE};
pub use bundler::{Bundle, Bundler};
pub use config::{Config, EmbeddingEndpoint};
pub use definition::{load_definition, ToolDefinition};
pub use embedding::{EmbeddingClient, EMBEDDING_DIMENSION, MODEL_NAME};
pub use error::{PackagingError, Result, Stage, ToolPackagingError};
pub use index::{SearchHit, ToolIndex};
pub use pipeline::{discover_entries, BatchReport, Packaged, Pipeline, ToolEntry};
