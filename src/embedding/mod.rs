//! Embedding generation for tool search metadata.

pub mod client;

pub use client::{
    parse_embedding_body, EmbeddingClient, EmbeddingVector, EMBEDDING_DIMENSION, MODEL_NAME,
};

use crate::definition::ToolDefinition;

/// Build the text embedded for a tool: id, name, description, author and
/// every keyword in declared order, joined by single spaces.
pub fn embedding_prompt(definition: &ToolDefinition) -> String {
    [
        definition.id.as_str(),
        definition.name.as_str(),
        definition.description.as_str(),
        definition.author.as_str(),
    ]
    .into_iter()
    .chain(definition.keywords.iter().map(String::as_str))
    .collect::<Vec<_>>()
    .join(" ")
}
