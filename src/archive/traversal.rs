// SPDX-License-Identifier: MPL-2.0

//! The archival walk over one thread.
//!
//! [`ThreadPager`] turns cursor pagination into a one-pass sequence of
//! messages. [`ArchivalTraversal`] drains it, sending each message either to
//! the media fetcher or to the record store, never both.

use crate::archive::media::media_file_name;
use crate::archive::{ArchiveError, FetchOutcome, MediaFetcher, MediaSource, Record, RecordStore};
use crate::direct::{ClientError, Message, MessageKind, MessagingClient, Session};
use serde::Deserialize;
use std::collections::VecDeque;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PagerState {
    /// More pages may follow `cursor`.
    Open,
    /// The last page has been fetched; drain the buffer and stop.
    Exhausted,
    /// The service repeated a cursor; drain the buffer, then fail.
    Stalled,
    /// Finished for good, successfully or not.
    Done,
}

/// Lazily pages through a thread's history, oldest cursor last.
///
/// Messages come out in the order the service returns them. Once the pager
/// has returned `Ok(None)` or an error it stays finished; there is no restart.
pub struct ThreadPager<'a, C> {
    client: &'a C,
    session: &'a Session,
    thread_id: &'a str,
    cursor: String,
    buffered: VecDeque<Message>,
    pages_fetched: usize,
    state: PagerState,
}

impl<'a, C: MessagingClient> ThreadPager<'a, C> {
    pub fn new(client: &'a C, session: &'a Session, thread_id: &'a str) -> Self {
        Self {
            client,
            session,
            thread_id,
            cursor: String::new(),
            buffered: VecDeque::new(),
            pages_fetched: 0,
            state: PagerState::Open,
        }
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    pub async fn next(&mut self) -> Result<Option<Message>, ArchiveError> {
        loop {
            if let Some(message) = self.buffered.pop_front() {
                return Ok(Some(message));
            }

            match self.state {
                PagerState::Open => {}
                PagerState::Exhausted | PagerState::Done => {
                    self.state = PagerState::Done;
                    return Ok(None);
                }
                PagerState::Stalled => {
                    self.state = PagerState::Done;
                    return Err(ArchiveError::ThreadFetch(ClientError::InvalidResponse(
                        "thread cursor did not advance".into(),
                    )));
                }
            }

            let page = match self
                .client
                .list_thread_page(self.session, self.thread_id, &self.cursor)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    self.state = PagerState::Done;
                    return Err(ArchiveError::ThreadFetch(e));
                }
            };
            self.pages_fetched += 1;

            debug!(
                target: "archive",
                page = self.pages_fetched,
                items = page.items.len(),
                has_older = page.has_older,
                "thread page"
            );

            self.buffered.extend(page.items);
            if !page.has_older {
                self.state = PagerState::Exhausted;
            } else if page.oldest_cursor.is_empty() || page.oldest_cursor == self.cursor {
                self.state = PagerState::Stalled;
            } else {
                self.cursor = page.oldest_cursor;
            }
        }
    }
}

/// What to do when a single media download fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFailurePolicy {
    /// End the run with the error.
    #[default]
    Abort,
    /// Log it and carry on with the next message.
    Skip,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub pages: usize,
    pub records: usize,
    pub downloaded: usize,
    pub bytes_downloaded: usize,
    pub already_present: usize,
    pub media_skipped: usize,
}

pub struct ArchivalTraversal<'a, S> {
    records: &'a mut RecordStore,
    fetcher: &'a MediaFetcher<S>,
    media_dir: &'a Path,
    media_failures: MediaFailurePolicy,
}

impl<'a, S: MediaSource> ArchivalTraversal<'a, S> {
    pub fn new(
        records: &'a mut RecordStore,
        fetcher: &'a MediaFetcher<S>,
        media_dir: &'a Path,
        media_failures: MediaFailurePolicy,
    ) -> Self {
        Self {
            records,
            fetcher,
            media_dir,
            media_failures,
        }
    }

    /// Drain `pager` to the end. A failed page fetch ends the walk; whatever
    /// was archived before it stays on disk.
    pub async fn run<C: MessagingClient>(
        mut self,
        mut pager: ThreadPager<'_, C>,
    ) -> Result<ArchiveSummary, ArchiveError> {
        let mut summary = ArchiveSummary::default();

        while let Some(message) = pager.next().await? {
            match message.classify() {
                MessageKind::Image { url } => {
                    self.download(&message, url, "jpg", &mut summary).await?;
                }
                MessageKind::Video { url } => {
                    self.download(&message, url, "mp4", &mut summary).await?;
                }
                MessageKind::Record { payload } => {
                    self.records.append(&Record::from_message(&message, &payload))?;
                    summary.records += 1;
                }
            }
        }

        summary.pages = pager.pages_fetched();
        Ok(summary)
    }

    async fn download(
        &self,
        message: &Message,
        url: &str,
        ext: &str,
        summary: &mut ArchiveSummary,
    ) -> Result<(), ArchiveError> {
        let target = self.media_dir.join(media_file_name(&message.item_id, ext));

        match self.fetcher.fetch_if_absent(url, &target).await {
            Ok(FetchOutcome::Downloaded { bytes }) => {
                summary.downloaded += 1;
                summary.bytes_downloaded += bytes;
            }
            Ok(FetchOutcome::AlreadyPresent) => summary.already_present += 1,
            Err(source) => match self.media_failures {
                MediaFailurePolicy::Abort => {
                    return Err(ArchiveError::MediaFetch {
                        item_id: message.item_id.clone(),
                        source,
                    });
                }
                MediaFailurePolicy::Skip => {
                    warn!(target: "archive", item_id = %message.item_id, error = %source, "skipping media");
                    summary.media_skipped += 1;
                }
            },
        }
        Ok(())
    }
}
