//! Packaged tool artifacts and their persistence.
//!
//! An artifact is the tool definition extended with its bundled code and
//! embedding metadata, stored as `definition.json` next to `index.<ext>`.

use crate::definition::ToolDefinition;
use crate::embedding::EmbeddingVector;
use crate::error::{PackagingError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the persisted artifact inside a tool's output folder.
pub const DEFINITION_FILE: &str = "definition.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingMetadata {
    pub model_name: String,
    pub embeddings: EmbeddingVector,
}

/// The persisted output of one packaging run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolArtifact {
    #[serde(flatten)]
    pub definition: ToolDefinition,
    pub code: String,
    pub embedding_metadata: EmbeddingMetadata,
}

/// Merge a definition, its bundled code and its embedding into an artifact.
///
/// Pure: every input is moved into the result unchanged.
pub fn extend(
    definition: ToolDefinition,
    code: String,
    embeddings: EmbeddingVector,
    model_name: &str,
) -> ToolArtifact {
    ToolArtifact {
        definition,
        code,
        embedding_metadata: EmbeddingMetadata {
            model_name: model_name.to_string(),
            embeddings,
        },
    }
}

impl ToolArtifact {
    pub fn id(&self) -> &str {
        &self.definition.id
    }

    /// Replace the embedding, keeping definition and code.
    pub fn with_embeddings(self, embeddings: EmbeddingVector, model_name: &str) -> Self {
        extend(self.definition, self.code, embeddings, model_name)
    }

    /// Pretty-printed JSON with 2-space indentation.
    pub fn to_json_pretty(&self) -> Result<String> {
        to_json_pretty(self)
    }

    /// Write `definition.json` into `folder`, replacing any previous file atomically.
    pub async fn persist(&self, folder: &Path) -> Result<PathBuf> {
        persist_definition_file(folder, self.id(), self).await
    }

    /// Read a persisted artifact and re-check its definition.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            PackagingError::DefinitionLoad(format!("cannot read {}: {}", path.display(), e))
        })?;
        let artifact: ToolArtifact = serde_json::from_str(&text).map_err(|e| {
            PackagingError::DefinitionLoad(format!("{}: {}", path.display(), e))
        })?;
        artifact.definition.validate()?;
        Ok(artifact)
    }
}

/// A `definition.json` as found on disk. Files written by hand, or by older
/// tooling, may carry only the definition; packaged ones also have `code`
/// and `embedding_metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDefinition {
    #[serde(flatten)]
    pub definition: ToolDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_metadata: Option<EmbeddingMetadata>,
}

impl StoredDefinition {
    pub fn id(&self) -> &str {
        &self.definition.id
    }

    /// Set the embedding, keeping every other field as stored.
    pub fn with_embeddings(self, embeddings: EmbeddingVector, model_name: &str) -> Self {
        Self {
            embedding_metadata: Some(EmbeddingMetadata {
                model_name: model_name.to_string(),
                embeddings,
            }),
            ..self
        }
    }

    /// Read a `definition.json` and check its definition.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            PackagingError::DefinitionLoad(format!("cannot read {}: {}", path.display(), e))
        })?;
        let stored: StoredDefinition = serde_json::from_str(&text).map_err(|e| {
            PackagingError::DefinitionLoad(format!("{}: {}", path.display(), e))
        })?;
        stored.definition.validate()?;
        Ok(stored)
    }

    pub async fn persist(&self, folder: &Path) -> Result<PathBuf> {
        persist_definition_file(folder, self.id(), self).await
    }
}

impl From<ToolArtifact> for StoredDefinition {
    fn from(artifact: ToolArtifact) -> Self {
        Self {
            definition: artifact.definition,
            code: Some(artifact.code),
            embedding_metadata: Some(artifact.embedding_metadata),
        }
    }
}

fn to_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    let mut json = serde_json::to_string_pretty(value).map_err(|e| {
        PackagingError::persist(DEFINITION_FILE, format!("serialization failed: {}", e))
    })?;
    json.push('\n');
    Ok(json)
}

async fn persist_definition_file<T: Serialize>(folder: &Path, tool_id: &str, value: &T) -> Result<PathBuf> {
    let path = folder.join(DEFINITION_FILE);
    write_atomic(&path, to_json_pretty(value)?.as_bytes()).await?;

    tracing::info!(
        tool_id = %tool_id,
        path = %path.display(),
        "Artifact persisted"
    );
    Ok(path)
}

/// Write `contents` to `path` through a temporary sibling file and a rename,
/// so readers never observe a partially written file.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| PackagingError::persist(parent, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| PackagingError::persist(path, "path has no file name"))?;
    let tmp = parent.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    if let Err(e) = tokio::fs::write(&tmp, contents).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(PackagingError::persist(path, e));
    }
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(PackagingError::persist(path, e));
    }
    Ok(())
}

/// Sub-directories of `dir`, sorted by name.
pub async fn list_tool_folders(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut folders = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            folders.push(entry.path());
        }
    }
    folders.sort();
    Ok(folders)
}
