use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PackagingError {
    #[error("Bundling failed for {}: {reason}", path.display())]
    Bundle { path: PathBuf, reason: String },

    #[error("Invalid tool definition: {0}")]
    DefinitionLoad(String),

    #[error("Failed to fetch embeddings: {0}")]
    EmbeddingFetch(String),

    #[error("Failed to persist {}: {reason}", path.display())]
    Persist { path: PathBuf, reason: String },

    #[error("Search failed: {0}")]
    Search(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PackagingError {
    pub(crate) fn bundle(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PackagingError::Bundle {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn persist(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        PackagingError::Persist {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<reqwest::Error> for PackagingError {
    fn from(err: reqwest::Error) -> Self {
        PackagingError::EmbeddingFetch(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PackagingError>;

/// Pipeline stage a tool was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Bundle,
    LoadDefinition,
    Embed,
    Extend,
    Persist,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Bundle => "bundle",
            Stage::LoadDefinition => "load_definition",
            Stage::Embed => "embed",
            Stage::Extend => "extend",
            Stage::Persist => "persist",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure of one tool's pipeline, tagged with the tool and the stage.
///
/// `tool` is the definition id once it is known, otherwise the entry path.
#[derive(Error, Debug)]
#[error("tool '{tool}' failed at stage {stage}: {source}")]
pub struct ToolPackagingError {
    pub tool: String,
    pub stage: Stage,
    #[source]
    pub source: PackagingError,
}

impl ToolPackagingError {
    pub fn new(tool: impl Into<String>, stage: Stage, source: PackagingError) -> Self {
        Self {
            tool: tool.into(),
            stage,
            source,
        }
    }
}
