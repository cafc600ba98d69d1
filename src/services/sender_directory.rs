//! Flat-file directory of senders and their outbound-mail credentials

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, trace};

use crate::errors::AppResult;
use crate::models::SenderRecord;

const FIELD_DELIMITER: char = '|';

/// Sender lookup backed by `identity|display name|credential` lines.
///
/// The file is read on every call so edits take effect without a restart.
#[derive(Debug, Clone)]
pub struct SenderDirectory {
    path: PathBuf,
}

impl SenderDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn lookup(&self, identity: &str) -> AppResult<Option<SenderRecord>> {
        Ok(self.load().await?.remove(identity))
    }

    /// Load every well-formed record; a missing file is an empty directory
    pub async fn load(&self) -> AppResult<HashMap<String, SenderRecord>> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Sender directory not found, treating as empty");
                return Ok(HashMap::new());
            }
            Err(e) => return Err(e.into()),
        };

        Ok(parse_directory(&contents))
    }
}

pub fn parse_directory(contents: &str) -> HashMap<String, SenderRecord> {
    let mut senders = HashMap::new();

    for (line_no, line) in contents.lines().enumerate() {
        match parse_line(line) {
            Some(record) => {
                senders.insert(record.identity.clone(), record);
            }
            None => trace!(line = line_no + 1, "Skipping malformed sender line"),
        }
    }

    senders
}

fn parse_line(line: &str) -> Option<SenderRecord> {
    let parts: Vec<&str> = line.trim().split(FIELD_DELIMITER).collect();
    match parts.as_slice() {
        [identity, display_name, credential] => {
            Some(SenderRecord::new(*identity, *display_name, *credential))
        }
        _ => None,
    }
}
