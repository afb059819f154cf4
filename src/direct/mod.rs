// SPDX-License-Identifier: MPL-2.0

mod client;
mod types;

pub use client::{ClientError, Credentials, DirectClient, MessagingClient};
pub use types::{Message, MessageKind, Session};

#[cfg(test)]
pub use types::{
    DeleteStatus, ImageVersions, InboxPage, MediaPayload, MediaVariant, ThreadPage, ThreadSummary,
};
