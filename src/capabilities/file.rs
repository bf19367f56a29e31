//! `file` capability: plain file access for rule scripts.

use std::path::Path;

use tokio::io::AsyncWriteExt;

use crate::error::CapabilityError;

/// Outcome of a file operation. `content` is only filled by reads.
#[derive(Debug, Default)]
pub struct FileResult {
    pub error: Option<CapabilityError>,
    pub content: String,
}

impl FileResult {
    fn from_io(path: &Path, result: std::io::Result<String>) -> Self {
        match result {
            Ok(content) => Self {
                error: None,
                content,
            },
            Err(source) => Self {
                error: Some(CapabilityError::File {
                    path: path.display().to_string(),
                    source,
                }),
                content: String::new(),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FileCapability;

impl FileCapability {
    pub async fn exists(&self, path: impl AsRef<Path>) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    pub async fn read(&self, path: impl AsRef<Path>) -> FileResult {
        let path = path.as_ref();
        FileResult::from_io(path, tokio::fs::read_to_string(path).await)
    }

    /// Create or truncate the file and write `content`.
    pub async fn write(&self, path: impl AsRef<Path>, content: &str) -> FileResult {
        let path = path.as_ref();
        let result = tokio::fs::write(path, content).await.map(|_| String::new());
        FileResult::from_io(path, result)
    }

    /// Append `content`, creating the file if needed.
    pub async fn append(&self, path: impl AsRef<Path>, content: &str) -> FileResult {
        let path = path.as_ref();
        let result: std::io::Result<String> = async {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await?;
            file.write_all(content.as_bytes()).await?;
            file.flush().await?;
            Ok::<_, std::io::Error>(String::new())
        }
        .await;
        FileResult::from_io(path, result)
    }

    pub async fn remove(&self, path: impl AsRef<Path>) -> FileResult {
        let path = path.as_ref();
        let result = tokio::fs::remove_file(path).await.map(|_| String::new());
        FileResult::from_io(path, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_append_read_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        let file = FileCapability;

        assert!(!file.exists(&path).await);
        assert!(file.write(&path, "one\n").await.is_ok());
        assert!(file.append(&path, "two\n").await.is_ok());
        assert_eq!(file.read(&path).await.content, "one\ntwo\n");
        assert!(file.exists(&path).await);

        assert!(file.remove(&path).await.is_ok());
        assert!(!file.exists(&path).await);
    }

    #[tokio::test]
    async fn missing_file_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileCapability.read(dir.path().join("absent")).await;
        assert!(matches!(result.error, Some(CapabilityError::File { .. })));
        assert!(result.content.is_empty());
    }
}
