// SPDX-License-Identifier: MPL-2.0

mod locator;
mod media;
mod records;
mod retraction;
mod traversal;

pub use locator::ThreadLocator;
pub use media::{FetchOutcome, HttpMediaSource, MediaError, MediaFetcher, MediaSource};
pub use records::{Record, RecordError, RecordStore};
pub use retraction::{RetractionPass, RetractionSummary, TimestampOrder};
pub use traversal::{ArchivalTraversal, ArchiveSummary, MediaFailurePolicy, ThreadPager};

use crate::direct::ClientError;
use thiserror::Error;

/// Everything that can end a run. Per-item deletion failures are not here:
/// the retraction pass reports them and moves on.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("login failed: {0}")]
    Auth(#[source] ClientError),
    #[error("could not list inbox: {0}")]
    Inbox(#[source] ClientError),
    #[error("no thread titled {0:?}")]
    ThreadNotFound(String),
    #[error("could not fetch thread page: {0}")]
    ThreadFetch(#[source] ClientError),
    #[error("media download failed for item {item_id}: {source}")]
    MediaFetch {
        item_id: String,
        #[source]
        source: MediaError,
    },
    #[error("record file error: {0}")]
    Record(#[from] RecordError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("interrupted")]
    Interrupted,
}
