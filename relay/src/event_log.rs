//! Append-only text logs of request outcomes, one file per event source.
//!
//! Lines look like `[2025-06-01 09:30:00] Chat: how to treat blight | Status: Response OK`.

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    Chat,
    Pest,
    Transcribe,
}

impl EventSource {
    fn file_name(&self) -> &'static str {
        match self {
            EventSource::Chat => "chat_logs.txt",
            EventSource::Pest => "pest_uploads.txt",
            EventSource::Transcribe => "system.log",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            EventSource::Chat => "Chat",
            EventSource::Pest => "Pest",
            EventSource::Transcribe => "Transcribe",
        }
    }
}

pub fn format_line(
    at: DateTime<Local>,
    source: EventSource,
    subject: &str,
    status: &str,
) -> String {
    format!(
        "[{}] {}: {} | Status: {}\n",
        at.format("%Y-%m-%d %H:%M:%S"),
        source.label(),
        subject,
        status
    )
}

#[derive(Debug, Clone)]
pub struct EventLog {
    dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl EventLog {
    pub async fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn path_for(&self, source: EventSource) -> PathBuf {
        self.dir.join(source.file_name())
    }

    /// Appends one line. Failures are logged and swallowed so a full disk never fails a request.
    pub async fn record(&self, source: EventSource, subject: &str, status: &str) {
        let line = format_line(Local::now(), source, subject, status);
        let path = self.path_for(source);

        let _guard = self.write_lock.lock().await;
        if let Err(e) = append(&path, &line).await {
            tracing::warn!("Could not write event log {}: {:?}", path.display(), e);
        }
    }
}

async fn append(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn line_format_matches_the_log_files() {
        let at = Local.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(
            format_line(at, EventSource::Chat, "which fertilizer for paddy?", "Response OK"),
            "[2025-03-04 05:06:07] Chat: which fertilizer for paddy? | Status: Response OK\n"
        );
        assert_eq!(
            format_line(at, EventSource::Pest, "leaf.jpg", "Detection OK"),
            "[2025-03-04 05:06:07] Pest: leaf.jpg | Status: Detection OK\n"
        );
    }

    #[tokio::test]
    async fn records_append_per_source() {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::open(dir.path().join("logs")).await.unwrap();

        log.record(EventSource::Chat, "first", "Response OK").await;
        log.record(EventSource::Chat, "second", "Chat generation failed").await;
        log.record(EventSource::Pest, "leaf.png", "Detection OK").await;

        let chat = std::fs::read_to_string(log.path_for(EventSource::Chat)).unwrap();
        let lines: Vec<&str> = chat.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("Chat: first | Status: Response OK"));
        assert!(lines[1].ends_with("Chat: second | Status: Chat generation failed"));

        let pest = std::fs::read_to_string(log.path_for(EventSource::Pest)).unwrap();
        assert!(pest.ends_with("Pest: leaf.png | Status: Detection OK\n"));
        assert!(!log.path_for(EventSource::Transcribe).exists());
    }
}
