use crate::artifact::{StoredDefinition, ToolArtifact};
use crate::error::{Stage, ToolPackagingError};

/// Output of a successful pipeline step, identified by its tool id.
pub trait Packaged {
    fn tool_id(&self) -> &str;
}

impl Packaged for ToolArtifact {
    fn tool_id(&self) -> &str {
        self.id()
    }
}

impl Packaged for StoredDefinition {
    fn tool_id(&self) -> &str {
        self.id()
    }
}

/// Outcome summary of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Ids of tools that were packaged, in run order.
    pub succeeded: Vec<String>,
    pub failures: Vec<ToolPackagingError>,
}

impl BatchReport {
    pub fn from_results<T: Packaged>(
        results: impl IntoIterator<Item = Result<T, ToolPackagingError>>,
    ) -> Self {
        let mut report = Self::default();
        for result in results {
            match result {
                Ok(done) => report.succeeded.push(done.tool_id().to_string()),
                Err(e) => report.failures.push(e),
            }
        }
        report
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failures.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failures_at(&self, stage: Stage) -> usize {
        self.failures.iter().filter(|f| f.stage == stage).count()
    }

    /// Log the batch summary. Individual failures are logged as they happen.
    pub fn log(&self) {
        if self.has_failures() {
            let failed: Vec<&str> = self.failures.iter().map(|f| f.tool.as_str()).collect();
            tracing::warn!(
                total = self.total(),
                succeeded = self.succeeded.len(),
                failed = ?failed,
                "Batch finished with failures"
            );
        } else {
            tracing::info!(total = self.total(), "Batch finished successfully");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PackagingError;

    #[test]
    fn test_empty_report() {
        let report = BatchReport::from_results(Vec::<Result<ToolArtifact, _>>::new());
        assert_eq!(report.total(), 0);
        assert!(!report.has_failures());
    }

    #[test]
    fn test_failures_counted_by_stage() {
        let results: Vec<Result<ToolArtifact, _>> = vec![
            Err(ToolPackagingError::new(
                "a",
                Stage::Embed,
                PackagingError::EmbeddingFetch("HTTP 500".to_string()),
            )),
            Err(ToolPackagingError::new(
                "b",
                Stage::LoadDefinition,
                PackagingError::DefinitionLoad("bad".to_string()),
            )),
        ];
        let report = BatchReport::from_results(results);

        assert!(report.has_failures());
        assert_eq!(report.total(), 2);
        assert_eq!(report.failures_at(Stage::Embed), 1);
        assert_eq!(report.failures_at(Stage::Persist), 0);
    }
}
