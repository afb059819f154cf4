// SPDX-License-Identifier: MPL-2.0

use std::future::Future;
use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::archive::{
    ArchivalTraversal, ArchiveError, ArchiveSummary, MediaFailurePolicy, MediaFetcher,
    MediaSource, RecordError, RecordStore, RetractionPass, RetractionSummary, ThreadLocator,
    ThreadPager, TimestampOrder,
};
use crate::config::{LOGOUT_TIMEOUT, RECORD_FILE_NAME};
use crate::direct::{MessagingClient, Session};

/// What one run should do.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub thread_title: String,
    pub output_dir: PathBuf,
    pub remove_after_backup: bool,
    pub reverse: bool,
    pub media_failures: MediaFailurePolicy,
    pub timestamp_order: TimestampOrder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub thread_id: String,
    pub archive: ArchiveSummary,
    pub retraction: Option<RetractionSummary>,
}

/// One backup run: login, locate the thread, archive it, optionally retract.
///
/// The application owns the record file for the whole run. Every exit path,
/// including an interrupt, goes through [`Application::shutdown`].
pub struct Application<C, S> {
    client: C,
    fetcher: MediaFetcher<S>,
    options: RunOptions,
    records: Option<RecordStore>,
    session: Option<Session>,
}

impl<C: MessagingClient, S: MediaSource> Application<C, S> {
    /// Create the output directory and open (truncate) the record file.
    pub fn new(client: C, source: S, options: RunOptions) -> Result<Self, ArchiveError> {
        std::fs::create_dir_all(&options.output_dir)?;
        let records = RecordStore::create(options.output_dir.join(RECORD_FILE_NAME))?;

        Ok(Self {
            client,
            fetcher: MediaFetcher::new(source),
            options,
            records: Some(records),
            session: None,
        })
    }

    /// Run to completion, first fatal error, or until `interrupt` resolves.
    /// Shutdown has happened by the time this returns.
    pub async fn run<F>(&mut self, interrupt: F) -> Result<RunReport, ArchiveError>
    where
        F: Future<Output = ()>,
    {
        let outcome = tokio::select! {
            result = self.execute() => result,
            () = interrupt => Err(ArchiveError::Interrupted),
        };

        match &outcome {
            Ok(report) => info!(target: "app", thread_id = %report.thread_id, "finished"),
            Err(ArchiveError::Interrupted) => warn!(target: "app", "interrupted, shutting down"),
            Err(e) => error!(target: "app", error = %e, "run failed"),
        }

        self.shutdown().await;
        outcome
    }

    async fn execute(&mut self) -> Result<RunReport, ArchiveError> {
        info!(target: "app", "logging in");
        let session = self.client.login().await.map_err(ArchiveError::Auth)?;
        info!(target: "app", user_id = %session.user_id, username = %session.username, "logged in");
        let session = &*self.session.insert(session);

        let thread_id = ThreadLocator::new(&self.client, session)
            .locate(&self.options.thread_title)
            .await?;
        info!(
            target: "app",
            title = %self.options.thread_title,
            thread_id = %thread_id,
            "thread found"
        );

        let records = self.records.as_mut().ok_or(RecordError::Closed)?;
        let pager = ThreadPager::new(&self.client, session, &thread_id);
        let archive = ArchivalTraversal::new(
            records,
            &self.fetcher,
            &self.options.output_dir,
            self.options.media_failures,
        )
        .run(pager)
        .await?;
        info!(
            target: "app",
            pages = archive.pages,
            records = archive.records,
            downloaded = archive.downloaded,
            bytes = archive.bytes_downloaded,
            already_present = archive.already_present,
            media_skipped = archive.media_skipped,
            "thread archived"
        );

        let record_path = self
            .records
            .take()
            .ok_or(RecordError::Closed)?
            .close()?;

        let retraction = if self.options.remove_after_backup {
            let replayed = RecordStore::replay_all(&record_path)?;
            let summary = RetractionPass::new(
                &self.client,
                session,
                &thread_id,
                self.options.timestamp_order,
            )
            .run(replayed, self.options.reverse)
            .await;
            info!(
                target: "app",
                deleted = summary.deleted,
                failed = summary.failed,
                "retraction finished"
            );
            Some(summary)
        } else {
            None
        };

        Ok(RunReport {
            thread_id,
            archive,
            retraction,
        })
    }

    /// Close the record file if still open and log out if logged in.
    /// Safe to call more than once; errors are logged, not returned. The
    /// logout is bounded by [`LOGOUT_TIMEOUT`] since a second Ctrl-C cannot
    /// cut it short.
    pub async fn shutdown(&mut self) {
        if let Some(store) = self.records.take() {
            if let Err(e) = store.close() {
                error!(target: "app", error = %e, "could not close record file");
            }
        }

        if let Some(session) = self.session.take() {
            match tokio::time::timeout(LOGOUT_TIMEOUT, self.client.logout(&session)).await {
                Ok(Ok(())) => info!(target: "app", "logged out"),
                Ok(Err(e)) => error!(target: "app", error = %e, "logout failed"),
                Err(_) => error!(target: "app", "logout timed out"),
            }
        }
    }
}
