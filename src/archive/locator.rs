// SPDX-License-Identifier: MPL-2.0

use crate::archive::ArchiveError;
use crate::direct::{ClientError, MessagingClient, Session};
use tracing::debug;

/// Resolves a thread title to its id by walking the inbox, newest page first.
pub struct ThreadLocator<'a, C> {
    client: &'a C,
    session: &'a Session,
}

impl<'a, C: MessagingClient> ThreadLocator<'a, C> {
    pub fn new(client: &'a C, session: &'a Session) -> Self {
        Self { client, session }
    }

    /// First exact title match wins; paging stops as soon as it is found.
    pub async fn locate(&self, title: &str) -> Result<String, ArchiveError> {
        let mut cursor = String::new();

        loop {
            let page = self
                .client
                .list_inbox_page(self.session, &cursor)
                .await
                .map_err(ArchiveError::Inbox)?;

            debug!(target: "archive", threads = page.threads.len(), cursor = %cursor, "inbox page");

            if let Some(thread) = page.threads.into_iter().find(|t| t.thread_title == title) {
                return Ok(thread.thread_id);
            }

            if !page.has_older {
                return Err(ArchiveError::ThreadNotFound(title.to_string()));
            }

            // A cursor that does not move would page forever.
            if page.oldest_cursor.is_empty() || page.oldest_cursor == cursor {
                return Err(ArchiveError::Inbox(ClientError::InvalidResponse(
                    "inbox cursor did not advance".into(),
                )));
            }
            cursor = page.oldest_cursor;
        }
    }
}
