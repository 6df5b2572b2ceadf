// Reference Library
// Sources of reference texts for the composite target profile. A snapshot
// is taken once at the start of a run.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::models::ReferenceDocument;
use super::capabilities::ReferenceLibrary;
use super::errors::{HumanizeError, HumanizeResult};

const REFERENCE_EXTENSIONS: [&str; 3] = ["txt", "md", "markdown"];

/// Fixed in-memory set of reference documents.
#[derive(Debug, Clone, Default)]
pub struct StaticLibrary {
    documents: Vec<ReferenceDocument>,
}

impl StaticLibrary {
    pub fn new(documents: Vec<ReferenceDocument>) -> Self {
        Self { documents }
    }
}

#[async_trait]
impl ReferenceLibrary for StaticLibrary {
    async fn snapshot(&self) -> HumanizeResult<Vec<ReferenceDocument>> {
        Ok(self.documents.clone())
    }
}

/// Every `.txt`/`.md` file directly inside a directory, weight 1.
#[derive(Debug, Clone)]
pub struct DirectoryLibrary {
    dir: PathBuf,
}

impl DirectoryLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ReferenceLibrary for DirectoryLibrary {
    async fn snapshot(&self) -> HumanizeResult<Vec<ReferenceDocument>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(|e| {
            HumanizeError::Validation(format!(
                "cannot read reference dir {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| HumanizeError::Validation(format!("reference dir listing failed: {}", e)))?
        {
            let path = entry.path();
            let wanted = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| REFERENCE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if wanted && path.is_file() {
                paths.push(path);
            }
        }
        // read_dir order is platform dependent
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
                HumanizeError::Validation(format!("cannot read {}: {}", path.display(), e))
            })?;
            if text.trim().is_empty() {
                debug!(path = %path.display(), "[REFERENCES] skipping empty file");
                continue;
            }
            documents.push(ReferenceDocument::new(text));
        }

        info!(
            dir = %self.dir.display(),
            count = documents.len(),
            "[REFERENCES] snapshot loaded"
        );
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_static_snapshot() {
        let library = StaticLibrary::new(vec![ReferenceDocument::new("One short text.")]);
        let docs = library.snapshot().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].weight, 1.0);
    }

    #[tokio::test]
    async fn test_directory_snapshot_filters_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "Second essay body.").unwrap();
        fs::write(dir.path().join("a.md"), "First essay body.").unwrap();
        fs::write(dir.path().join("notes.json"), "{}").unwrap();
        fs::write(dir.path().join("empty.txt"), "   \n").unwrap();

        let docs = DirectoryLibrary::new(dir.path()).snapshot().await.unwrap();
        let texts: Vec<&str> = docs.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, vec!["First essay body.", "Second essay body."]);
    }

    #[tokio::test]
    async fn test_missing_directory_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = DirectoryLibrary::new(dir.path().join("nope"));
        assert!(matches!(missing.snapshot().await, Err(HumanizeError::Validation(_))));
    }
}
