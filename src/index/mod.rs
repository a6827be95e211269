//! Semantic search over packaged tools.
//!
//! Loads the embeddings stored in each `definition.json` and ranks tools by
//! cosine similarity against a query embedding.

use crate::artifact::{list_tool_folders, EmbeddingMetadata, StoredDefinition, DEFINITION_FILE};
use crate::definition::ToolDefinition;
use crate::embedding::{EMBEDDING_DIMENSION, MODEL_NAME};
use crate::error::{PackagingError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use serde::Serialize;
use std::path::Path;

/// Summary of an indexed tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedTool {
    pub id: String,
    pub name: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub name: String,
    /// Cosine similarity, -1.0 to 1.0, higher is more relevant.
    pub score: f64,
}

pub struct ToolIndex {
    tools: Vec<IndexedTool>,
    /// L2-normalised embeddings, one row of `EMBEDDING_DIMENSION` per tool.
    embeddings: Array2<f64>,
}

impl ToolIndex {
    /// Build an index from stored definitions. Entries without an
    /// embedding, embedded with another model, or whose vector is not
    /// [`EMBEDDING_DIMENSION`] long are skipped.
    pub fn from_definitions(definitions: impl IntoIterator<Item = StoredDefinition>) -> Result<Self> {
        let mut definitions: Vec<(ToolDefinition, EmbeddingMetadata)> = definitions
            .into_iter()
            .filter_map(|stored| match stored.embedding_metadata {
                Some(metadata) => Some((stored.definition, metadata)),
                None => {
                    tracing::warn!(tool_id = %stored.definition.id, "Skipping tool without embedding");
                    None
                }
            })
            .filter(|(definition, metadata)| {
                if metadata.model_name != MODEL_NAME {
                    tracing::warn!(
                        tool_id = %definition.id,
                        model = %metadata.model_name,
                        "Skipping tool embedded with a different model"
                    );
                    return false;
                }
                if metadata.embeddings.len() != EMBEDDING_DIMENSION {
                    tracing::warn!(
                        tool_id = %definition.id,
                        dimension = metadata.embeddings.len(),
                        expected = EMBEDDING_DIMENSION,
                        "Skipping tool with mismatched embedding dimension"
                    );
                    return false;
                }
                true
            })
            .collect();
        definitions.sort_by(|a, b| a.0.id.cmp(&b.0.id));

        let mut tools = Vec::with_capacity(definitions.len());
        let mut data = Vec::with_capacity(definitions.len() * EMBEDDING_DIMENSION);
        for (definition, metadata) in definitions {
            data.extend(normalized(ArrayView1::from(metadata.embeddings.as_slice())).iter());
            tools.push(IndexedTool {
                id: definition.id,
                name: definition.name,
                keywords: definition.keywords,
            });
        }

        let embeddings = Array2::from_shape_vec((tools.len(), EMBEDDING_DIMENSION), data)
            .map_err(|e| PackagingError::Search(format!("failed to build embedding matrix: {}", e)))?;

        tracing::info!(tools = tools.len(), "Tool index built");
        Ok(Self { tools, embeddings })
    }

    /// Load every readable `definition.json` under `tools_dir`.
    pub async fn load(tools_dir: &Path) -> Result<Self> {
        let mut definitions = Vec::new();
        for folder in list_tool_folders(tools_dir).await? {
            let path = folder.join(DEFINITION_FILE);
            if !path.is_file() {
                continue;
            }
            match StoredDefinition::load(&path).await {
                Ok(stored) => definitions.push(stored),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable artifact")
                }
            }
        }
        Self::from_definitions(definitions)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Indexed tools in id order.
    pub fn list(&self) -> &[IndexedTool] {
        &self.tools
    }

    pub fn dimension(&self) -> usize {
        self.embeddings.ncols()
    }

    /// Rank tools against `query` and return the best `top_k`.
    pub fn search(&self, query: &[f64], top_k: usize) -> Result<Vec<SearchHit>> {
        if top_k == 0 {
            return Err(PackagingError::Search("top_k must be at least 1".to_string()));
        }
        if self.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension() {
            return Err(PackagingError::Search(format!(
                "query has {} dimensions, index has {}",
                query.len(),
                self.dimension()
            )));
        }

        let query = normalized(ArrayView1::from(query));
        // Rows are normalised, so cosine similarity is a dot product.
        let scores = self.embeddings.dot(&query);

        let mut ranked: Vec<(usize, f64)> = scores.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(ranked
            .into_iter()
            .take(top_k)
            .map(|(idx, score)| SearchHit {
                id: self.tools[idx].id.clone(),
                name: self.tools[idx].name.clone(),
                score,
            })
            .collect())
    }
}

fn normalized(v: ArrayView1<'_, f64>) -> Array1<f64> {
    let norm = v.dot(&v).sqrt();
    if norm > 0.0 {
        &v / norm
    } else {
        v.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::extend;
    use serde_json::json;

    fn definition(id: &str) -> ToolDefinition {
        ToolDefinition::from_value(json!({
            "id": id,
            "name": id.to_uppercase(),
            "description": "d",
            "author": "a",
            "keywords": [id],
            "configurations": { "type": "object", "properties": {} },
            "parameters": { "type": "object", "properties": {} },
            "result": { "type": "object", "properties": {} }
        }))
        .unwrap()
    }

    fn stored(id: &str, embeddings: Vec<f64>, model: &str) -> StoredDefinition {
        extend(definition(id), String::new(), embeddings, model).into()
    }

    /// Full-size vector with the given leading components.
    fn vector(head: &[f64]) -> Vec<f64> {
        let mut v = vec![0.0; EMBEDDING_DIMENSION];
        v[..head.len()].copy_from_slice(head);
        v
    }

    #[test]
    fn test_search_ranks_by_cosine() {
        let index = ToolIndex::from_definitions(vec![
            stored("east", vector(&[1.0, 0.0]), MODEL_NAME),
            stored("north", vector(&[0.0, 3.0]), MODEL_NAME),
            stored("northeast", vector(&[2.0, 2.0]), MODEL_NAME),
        ])
        .unwrap();

        let hits = index.search(&vector(&[0.0, 1.0]), 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "north");
        assert!((hits[0].score - 1.0).abs() < 1e-9);
        assert_eq!(hits[1].id, "northeast");
    }

    #[test]
    fn test_other_models_skipped() {
        let index = ToolIndex::from_definitions(vec![
            stored("a", vector(&[1.0]), MODEL_NAME),
            stored("b", vector(&[1.0]), "nomic-embed-text"),
        ])
        .unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.list()[0].id, "a");
    }

    #[test]
    fn test_stray_dimension_does_not_evict_valid_tools() {
        // "aaa" sorts first but has the wrong length.
        let index = ToolIndex::from_definitions(vec![
            stored("aaa", vec![1.0, 0.0, 0.0], MODEL_NAME),
            stored("b", vector(&[1.0]), MODEL_NAME),
            stored("c", vector(&[0.0, 1.0]), MODEL_NAME),
        ])
        .unwrap();

        let ids: Vec<&str> = index.list().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["b", "c"]);
        assert_eq!(index.dimension(), EMBEDDING_DIMENSION);
    }

    #[test]
    fn test_definitions_without_embedding_skipped() {
        let bare = StoredDefinition {
            definition: definition("bare"),
            code: None,
            embedding_metadata: None,
        };
        let index =
            ToolIndex::from_definitions(vec![bare, stored("a", vector(&[1.0]), MODEL_NAME)]).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_query_dimension_checked() {
        let index = ToolIndex::from_definitions(vec![stored("a", vector(&[1.0]), MODEL_NAME)]).unwrap();
        assert!(index.search(&[1.0, 0.0, 0.0], 1).is_err());
        assert!(index.search(&vector(&[1.0]), 0).is_err());
    }

    #[test]
    fn test_empty_index() {
        let index = ToolIndex::from_definitions(Vec::new()).unwrap();
        assert!(index.is_empty());
        assert!(index.search(&vector(&[1.0]), 3).unwrap().is_empty());
    }

    #[test]
    fn test_list_sorted_by_id() {
        let index = ToolIndex::from_definitions(vec![
            stored("zeta", vector(&[1.0]), MODEL_NAME),
            stored("alpha", vector(&[1.0]), MODEL_NAME),
        ])
        .unwrap();
        let ids: Vec<&str> = index.list().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["alpha", "zeta"]);
    }
}
