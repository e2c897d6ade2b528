use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct StoredFile {
    pub file_name: String,
    pub path: PathBuf,
    pub size: u64,
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn save(&self, file_name: &str, data: &[u8]) -> std::io::Result<StoredFile>;

    async fn open(&self, stored: &StoredFile) -> std::io::Result<Vec<u8>>;
}

/// Keeps uploads on local disk. Files are never cleaned up.
pub struct LocalFileStorage {
    base_path: PathBuf,
}

impl LocalFileStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn save(&self, file_name: &str, data: &[u8]) -> std::io::Result<StoredFile> {
        fs::create_dir_all(&self.base_path).await?;

        let path = self
            .base_path
            .join(format!("{}_{}", Uuid::new_v4(), sanitize_file_name(file_name)));
        fs::write(&path, data).await?;

        Ok(StoredFile {
            file_name: file_name.to_string(),
            path,
            size: data.len() as u64,
        })
    }

    async fn open(&self, stored: &StoredFile) -> std::io::Result<Vec<u8>> {
        fs::read(&stored.path).await
    }
}

fn sanitize_file_name(file_name: &str) -> String {
    let base = Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();

    let cleaned = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>();

    if cleaned.trim_matches(|c| c == '.' || c == '_').is_empty() {
        "upload.pdf".to_string()
    } else {
        cleaned
    }
}
