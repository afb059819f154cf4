// SPDX-License-Identifier: MPL-2.0

use crate::archive::Record;
use crate::direct::{MessagingClient, Session};
use chrono::DateTime;
use serde::Deserialize;
use std::cmp::Ordering;
use tracing::{error, info};

/// How persisted timestamps are compared when ordering deletions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampOrder {
    /// Integer timestamps by value; anything unparsable sorts after them, as text.
    #[default]
    Numeric,
    /// Plain string comparison of the persisted field.
    Lexical,
}

impl TimestampOrder {
    fn compare(self, a: &str, b: &str) -> Ordering {
        match self {
            TimestampOrder::Lexical => a.cmp(b),
            TimestampOrder::Numeric => {
                match (a.trim().parse::<i128>(), b.trim().parse::<i128>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => a.cmp(b),
                }
            }
        }
    }

    /// Stable sort by timestamp; equal timestamps keep replay order either way.
    pub fn sort(self, records: &mut [Record], reverse: bool) {
        records.sort_by(|a, b| {
            let ord = self.compare(&a.timestamp, &b.timestamp);
            if reverse { ord.reverse() } else { ord }
        });
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetractionSummary {
    pub considered: usize,
    pub not_own: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Deletes the account's own archived messages from the remote thread.
///
/// Nothing remembers earlier deletions: running it twice asks the service to
/// delete the same items again.
pub struct RetractionPass<'a, C> {
    client: &'a C,
    session: &'a Session,
    thread_id: &'a str,
    order: TimestampOrder,
}

impl<'a, C: MessagingClient> RetractionPass<'a, C> {
    pub fn new(
        client: &'a C,
        session: &'a Session,
        thread_id: &'a str,
        order: TimestampOrder,
    ) -> Self {
        Self {
            client,
            session,
            thread_id,
            order,
        }
    }

    /// One delete request per own record. Failures are logged and counted,
    /// never returned.
    pub async fn run(&self, mut records: Vec<Record>, reverse: bool) -> RetractionSummary {
        self.order.sort(&mut records, reverse);

        let mut summary = RetractionSummary {
            considered: records.len(),
            ..Default::default()
        };

        for record in &records {
            if !self.session.owns(&record.user_id) {
                summary.not_own += 1;
                continue;
            }

            match self
                .client
                .delete_message(self.session, self.thread_id, &record.item_id)
                .await
            {
                Ok(status) if status.is_ok() => {
                    info!(
                        target: "archive",
                        item_id = %record.item_id,
                        sent_at = %describe_timestamp(&record.timestamp),
                        "direct item deleted"
                    );
                    summary.deleted += 1;
                }
                Ok(status) => {
                    error!(target: "archive", item_id = %record.item_id, status = %status.status, "delete refused");
                    summary.failed += 1;
                }
                Err(e) => {
                    error!(target: "archive", item_id = %record.item_id, error = %e, "could not remove direct item");
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}

/// Render a remote timestamp (seconds, milliseconds or microseconds since the
/// epoch) for log lines, falling back to the raw value.
fn describe_timestamp(raw: &str) -> String {
    let Ok(value) = raw.trim().parse::<i64>() else {
        return raw.to_string();
    };
    let parsed = if value.abs() >= 100_000_000_000_000 {
        DateTime::from_timestamp_micros(value)
    } else if value.abs() >= 100_000_000_000 {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    };
    parsed.map_or_else(|| raw.to_string(), |dt| dt.to_rfc3339())
}
