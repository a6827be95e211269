//! Packaging pipeline orchestration.
//!
//! Each tool goes through Bundle → LoadDefinition → Embed → Extend → Persist,
//! strictly in that order. Tools in a batch are processed one at a time and
//! a failing tool never stops the ones after it.

mod report;

pub use report::{BatchReport, Packaged};

use crate::artifact::{
    self, extend, list_tool_folders, StoredDefinition, ToolArtifact, DEFINITION_FILE,
};
use crate::bundler::Bundler;
use crate::definition::load_definition;
use crate::embedding::{embedding_prompt, EmbeddingClient};
use crate::error::{PackagingError, Result, Stage, ToolPackagingError};
use std::collections::HashSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// One tool to package: its entry source and the folder receiving
/// `index.<ext>` and `definition.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolEntry {
    pub entry_path: PathBuf,
    pub output_folder: PathBuf,
}

impl ToolEntry {
    pub fn new(entry_path: impl Into<PathBuf>, output_folder: impl Into<PathBuf>) -> Self {
        Self {
            entry_path: entry_path.into(),
            output_folder: output_folder.into(),
        }
    }

    /// Bundled code file name, keeping the entry's language.
    pub fn code_file_name(&self) -> String {
        let ext = self
            .entry_path
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| matches!(*e, "ts" | "js" | "mjs"))
            .unwrap_or("ts");
        format!("index.{}", ext)
    }
}

/// Progress of a single tool through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackagingState {
    Pending,
    Bundled,
    DefinitionLoaded,
    Embedded,
    Persisted,
    Failed(Stage),
}

impl fmt::Display for PackagingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackagingState::Pending => f.write_str("pending"),
            PackagingState::Bundled => f.write_str("bundled"),
            PackagingState::DefinitionLoaded => f.write_str("definition_loaded"),
            PackagingState::Embedded => f.write_str("embedded"),
            PackagingState::Persisted => f.write_str("persisted"),
            PackagingState::Failed(stage) => write!(f, "failed({})", stage),
        }
    }
}

/// Paths and ids already claimed during one batch.
#[derive(Default)]
struct RunClaims {
    ids: HashSet<String>,
    folders: HashSet<PathBuf>,
}

/// Tracks one tool's state and tags errors with the tool and stage.
struct ToolRun {
    label: String,
}

impl ToolRun {
    fn new(label: String) -> Self {
        tracing::debug!(tool = %label, state = %PackagingState::Pending, "Tool state");
        Self { label }
    }

    fn advance(&self, state: PackagingState) {
        tracing::debug!(tool = %self.label, state = %state, "Tool state");
    }

    fn fail(&self, stage: Stage, source: PackagingError) -> ToolPackagingError {
        self.advance(PackagingState::Failed(stage));
        ToolPackagingError::new(self.label.clone(), stage, source)
    }
}

pub struct Pipeline {
    bundler: Bundler,
    embedder: EmbeddingClient,
}

impl Pipeline {
    pub fn new(embedder: EmbeddingClient) -> Self {
        Self {
            bundler: Bundler::new(),
            embedder,
        }
    }

    /// Package a single tool. Any stage failure aborts it; `definition.json`
    /// is only written after every earlier stage succeeded.
    pub async fn package_tool(
        &self,
        entry: &ToolEntry,
    ) -> std::result::Result<ToolArtifact, ToolPackagingError> {
        self.package(entry, &mut RunClaims::default()).await
    }

    /// Package many tools in order, collecting one result per entry.
    pub async fn run(
        &self,
        entries: &[ToolEntry],
    ) -> Vec<std::result::Result<ToolArtifact, ToolPackagingError>> {
        tracing::info!(tools = entries.len(), "Starting batch packaging");
        let mut claims = RunClaims::default();
        let mut results = Vec::with_capacity(entries.len());
        for entry in entries {
            let result = self.package(entry, &mut claims).await;
            if let Err(e) = &result {
                tracing::error!(tool = %e.tool, stage = %e.stage, error = %e.source, "Tool packaging failed, continuing");
            }
            results.push(result);
        }
        results
    }

    async fn package(
        &self,
        entry: &ToolEntry,
        claims: &mut RunClaims,
    ) -> std::result::Result<ToolArtifact, ToolPackagingError> {
        let mut run = ToolRun::new(entry.entry_path.display().to_string());
        if !claims.folders.insert(normalize(&entry.output_folder)) {
            return Err(run.fail(
                Stage::Persist,
                PackagingError::persist(
                    &entry.output_folder,
                    "output folder already used by another tool in this run",
                ),
            ));
        }

        // Bundle and write the code artifact.
        let code_path = entry.output_folder.join(entry.code_file_name());
        let bundler = self.bundler;
        let entry_path = entry.entry_path.clone();
        let bundle = tokio::task::spawn_blocking(move || bundler.bundle(&entry_path))
            .await
            .map_err(|e| {
                PackagingError::bundle(&entry.entry_path, format!("bundler task failed: {}", e))
            })
            .and_then(|r| r)
            .map_err(|e| run.fail(Stage::Bundle, e))?;
        artifact::write_atomic(&code_path, bundle.code.as_bytes())
            .await
            .map_err(|e| run.fail(Stage::Bundle, e))?;
        run.advance(PackagingState::Bundled);

        // Read the definition back from the bundled output.
        let bundled_path = code_path.clone();
        let definition = tokio::task::spawn_blocking(move || load_definition(&bundled_path))
            .await
            .map_err(|e| {
                PackagingError::DefinitionLoad(format!("definition loader task failed: {}", e))
            })
            .and_then(|r| r)
            .map_err(|e| run.fail(Stage::LoadDefinition, e))?;
        run.label = definition.id.clone();
        if !claims.ids.insert(definition.id.clone()) {
            return Err(run.fail(
                Stage::LoadDefinition,
                PackagingError::DefinitionLoad(format!(
                    "duplicate tool id '{}' in this run",
                    definition.id
                )),
            ));
        }
        run.advance(PackagingState::DefinitionLoaded);
        tracing::info!(tool_id = %definition.id, name = %definition.name, "Tool definition loaded");

        let embeddings = self
            .embedder
            .get_embeddings(&embedding_prompt(&definition))
            .await
            .map_err(|e| run.fail(Stage::Embed, e))?;
        run.advance(PackagingState::Embedded);

        let artifact = extend(definition, bundle.code, embeddings, self.embedder.model_name());
        artifact
            .persist(&entry.output_folder)
            .await
            .map_err(|e| run.fail(Stage::Persist, e))?;
        run.advance(PackagingState::Persisted);

        Ok(artifact)
    }

    /// Recompute the embedding of every tool under `tools_dir` and rewrite
    /// its `definition.json` in place.
    ///
    /// A `definition.json` holding only the definition gets its
    /// `embedding_metadata` added; other stored fields are kept. Folders
    /// without `definition.json` are skipped. Fails only when `tools_dir`
    /// itself cannot be read.
    pub async fn refresh(
        &self,
        tools_dir: &Path,
    ) -> Result<Vec<std::result::Result<StoredDefinition, ToolPackagingError>>> {
        let folders = list_tool_folders(tools_dir).await?;
        tracing::info!(tools_dir = %tools_dir.display(), folders = folders.len(), "Refreshing tool embeddings");

        let mut results = Vec::new();
        for folder in folders {
            let definition_path = folder.join(DEFINITION_FILE);
            if !definition_path.is_file() {
                tracing::warn!(path = %definition_path.display(), "Tool definition not found, skipping");
                continue;
            }
            let result = self.refresh_one(&folder).await;
            if let Err(e) = &result {
                tracing::error!(tool = %e.tool, stage = %e.stage, error = %e.source, "Embedding refresh failed, continuing");
            }
            results.push(result);
        }
        Ok(results)
    }

    async fn refresh_one(
        &self,
        folder: &Path,
    ) -> std::result::Result<StoredDefinition, ToolPackagingError> {
        let label = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| folder.display().to_string());
        let mut run = ToolRun::new(label);

        let stored = StoredDefinition::load(&folder.join(DEFINITION_FILE))
            .await
            .map_err(|e| run.fail(Stage::LoadDefinition, e))?;
        run.label = stored.id().to_string();
        run.advance(PackagingState::DefinitionLoaded);

        let embeddings = self
            .embedder
            .get_embeddings(&embedding_prompt(&stored.definition))
            .await
            .map_err(|e| run.fail(Stage::Embed, e))?;
        run.advance(PackagingState::Embedded);

        let stored = stored.with_embeddings(embeddings, self.embedder.model_name());
        stored
            .persist(folder)
            .await
            .map_err(|e| run.fail(Stage::Persist, e))?;
        run.advance(PackagingState::Persisted);

        tracing::info!(tool_id = %stored.id(), "Embedding refreshed");
        Ok(stored)
    }
}

/// Find tool projects under `apps_dir`: sub-directories with `src/index.ts`
/// (or `src/index.js`), sorted by name, each packaged into `out_dir/<name>`.
pub async fn discover_entries(apps_dir: &Path, out_dir: &Path) -> Result<Vec<ToolEntry>> {
    let mut entries = Vec::new();
    for folder in list_tool_folders(apps_dir).await? {
        let Some(name) = folder.file_name() else {
            continue;
        };
        let entry = ["src/index.ts", "src/index.js"]
            .iter()
            .map(|rel| folder.join(rel))
            .find(|p| p.is_file());
        match entry {
            Some(entry_path) => entries.push(ToolEntry::new(entry_path, out_dir.join(name))),
            None => tracing::debug!(folder = %folder.display(), "No tool entry point, skipping"),
        }
    }
    Ok(entries)
}

/// Lexically normalise a path so `./out/a` and `out/a/` compare equal.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_file_name_follows_entry() {
        assert_eq!(ToolEntry::new("a/src/index.ts", "out").code_file_name(), "index.ts");
        assert_eq!(ToolEntry::new("a/src/main.js", "out").code_file_name(), "index.js");
        assert_eq!(ToolEntry::new("a/src/tool", "out").code_file_name(), "index.ts");
        assert_eq!(ToolEntry::new("a/src/view.tsx", "out").code_file_name(), "index.ts");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("./out/a/")), normalize(Path::new("out/a")));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(PackagingState::Failed(Stage::Embed).to_string(), "failed(embed)");
        assert_eq!(PackagingState::Persisted.to_string(), "persisted");
    }
}
