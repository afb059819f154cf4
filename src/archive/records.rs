// SPDX-License-Identifier: MPL-2.0

//! Append-only record file of archived non-media messages.
//!
//! One CSV row per record, no header, columns
//! `user_id, payload, item_id, timestamp`. Rows are written in traversal
//! order and flushed as they go, so an aborted run keeps everything archived
//! up to that point.

use crate::direct::Message;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("record file already closed")]
    Closed,
}

static LINE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n\t]+").expect("valid line break pattern"));

static CONTROL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{Cc}").expect("valid control char pattern"));

/// Make message text safe for a line-oriented record: runs of line breaks
/// and tabs collapse to one space, other control characters are dropped.
pub fn sanitize(text: &str) -> String {
    let flattened = LINE_BREAKS.replace_all(text, " ");
    CONTROL_CHARS.replace_all(&flattened, "").into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub user_id: String,
    pub payload: String,
    pub item_id: String,
    pub timestamp: String,
}

impl Record {
    pub fn from_message(message: &Message, payload: &str) -> Self {
        Self {
            user_id: message.user_id.clone(),
            payload: sanitize(payload),
            item_id: message.item_id.clone(),
            timestamp: message.timestamp.clone(),
        }
    }
}

pub struct RecordStore {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl RecordStore {
    /// Create (or truncate) the record file at `path`.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, RecordError> {
        let path = path.into();
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)?;

        Ok(Self { path, writer })
    }

    pub fn append(&mut self, record: &Record) -> Result<(), RecordError> {
        self.writer.serialize(record)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and release the file handle, returning the path for replay.
    pub fn close(self) -> Result<PathBuf, RecordError> {
        let Self { path, mut writer } = self;
        writer.flush()?;
        drop(writer);
        Ok(path)
    }

    /// Read back every record in the order it was appended.
    pub fn replay_all(path: &Path) -> Result<Vec<Record>, RecordError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)?;

        reader
            .deserialize()
            .map(|row| row.map_err(RecordError::from))
            .collect()
    }
}
