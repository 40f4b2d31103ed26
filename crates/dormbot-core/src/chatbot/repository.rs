//! Where dormitory listings come from.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use crate::models::Dormitory;

/// Source of the current dormitory list.
///
/// Called once per chatbot message so answers always reflect the latest
/// listings; implementations should not cache.
#[async_trait]
pub trait DormRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Dormitory>>;
}

/// Reads a JSON array of dormitories from disk on every call.
pub struct JsonFileDorms {
    path: PathBuf,
}

impl JsonFileDorms {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DormRepository for JsonFileDorms {
    async fn list(&self) -> Result<Vec<Dormitory>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read dormitory file {}", self.path.display()))?;

        let dorms: Vec<Dormitory> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse dormitory file {}", self.path.display()))?;

        debug!(count = dorms.len(), path = %self.path.display(), "Loaded dormitories");
        Ok(dorms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_fresh_on_every_call() {
        let tmp = std::env::temp_dir().join("dormbot_test_repository");
        let _ = std::fs::create_dir_all(&tmp);
        let path = tmp.join("dorms.json");

        std::fs::write(&path, r#"[{"name": "A"}]"#).unwrap();
        let repo = JsonFileDorms::new(&path);
        assert_eq!(repo.list().await.unwrap().len(), 1);

        std::fs::write(&path, r#"[{"name": "A"}, {"name": "B", "price_monthly": "2500"}]"#).unwrap();
        let dorms = repo.list().await.unwrap();
        assert_eq!(dorms.len(), 2);
        assert_eq!(dorms[1].price_monthly, Some(2500.0));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let repo = JsonFileDorms::new("/definitely/not/here/dorms.json");
        let err = repo.list().await.unwrap_err();
        assert!(err.to_string().contains("Failed to read dormitory file"));
    }
}
