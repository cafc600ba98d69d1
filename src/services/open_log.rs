//! Append-only record of first-seen opens

use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::errors::AppResult;
use crate::models::OpenEvent;

/// Open log file. Each append opens, writes one line and closes the file;
/// appends from this process are serialised so lines never interleave.
#[derive(Debug)]
pub struct OpenLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl OpenLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, event: &OpenEvent) -> AppResult<()> {
        let mut line = event.log_line();
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Last `limit` lines, oldest first. Missing log yields an empty list.
    pub async fn tail(&self, limit: usize) -> AppResult<Vec<String>> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut tail = VecDeque::with_capacity(limit);
        for line in contents.lines() {
            if tail.len() == limit {
                tail.pop_front();
            }
            tail.push_back(line.trim().to_string());
        }

        Ok(tail.into())
    }
}
