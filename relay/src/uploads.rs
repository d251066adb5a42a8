use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// Directory holding the crop images submitted for pest detection.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub async fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.dir.join(stored_name(Local::now(), original_name));
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!("Saved upload to {}", path.display());
        Ok(path)
    }
}

/// `<YYYYmmdd_HHMMSS>_<name>`, keeping only the last path component and replacing spaces.
pub fn stored_name(at: DateTime<Local>, original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .find(|part| !part.is_empty() && *part != "." && *part != "..")
        .unwrap_or("upload");
    format!("{}_{}", at.format("%Y%m%d_%H%M%S"), base.replace(' ', "_"))
}
