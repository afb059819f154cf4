// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Deserializer};

/// The logged-in account. Every authenticated call takes it explicitly.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub username: String,
    pub token: String,
}

impl Session {
    /// Whether `user_id` (as persisted in a record) names this account.
    /// Numeric ids compare by value so `"0042"` and `"42"` agree.
    pub fn owns(&self, user_id: &str) -> bool {
        let ours = self.user_id.trim();
        let theirs = user_id.trim();
        match (ours.parse::<u64>(), theirs.parse::<u64>()) {
            (Ok(a), Ok(b)) => a == b,
            _ => ours == theirs,
        }
    }
}

/// Identifiers arrive as JSON strings or JSON numbers depending on the endpoint.
pub(crate) fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Str(String),
        Int(i64),
        Uint(u64),
        Float(f64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Str(s) => s,
        Id::Int(n) => n.to_string(),
        Id::Uint(n) => n.to_string(),
        Id::Float(n) => n.to_string(),
    })
}

fn de_id_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<serde_json::Value>::deserialize(deserializer)?
        .map(|v| de_id(v).map_err(serde::de::Error::custom))
        .transpose()
        .map(Option::unwrap_or_default)
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ThreadSummary {
    #[serde(deserialize_with = "de_id")]
    pub thread_id: String,
    #[serde(default)]
    pub thread_title: String,
}

/// One page of the inbox listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboxPage {
    #[serde(default)]
    pub threads: Vec<ThreadSummary>,
    #[serde(default)]
    pub has_older: bool,
    #[serde(default)]
    pub oldest_cursor: String,
}

/// One page of a single thread's message history.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadPage {
    #[serde(default)]
    pub items: Vec<Message>,
    #[serde(default)]
    pub has_older: bool,
    #[serde(default)]
    pub oldest_cursor: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    #[serde(deserialize_with = "de_id")]
    pub item_id: String,
    #[serde(default, deserialize_with = "de_id_default")]
    pub user_id: String,
    #[serde(default, deserialize_with = "de_id_default")]
    pub timestamp: String,
    pub item_type: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub media: Option<MediaPayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaPayload {
    #[serde(default)]
    pub media_type: u8,
    #[serde(default)]
    pub image_versions2: Option<ImageVersions>,
    #[serde(default)]
    pub video_versions: Vec<MediaVariant>,
}

/// Resolution variants of an image, best first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageVersions {
    #[serde(default)]
    pub candidates: Vec<MediaVariant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaVariant {
    pub url: String,
}

pub const MEDIA_TYPE_IMAGE: u8 = 1;
pub const MEDIA_TYPE_VIDEO: u8 = 2;

/// What the archival walk does with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind<'a> {
    Image { url: &'a str },
    Video { url: &'a str },
    Record { payload: String },
}

impl Message {
    /// Media with a usable first variant becomes a file; everything else
    /// (including media we cannot download) becomes exactly one record.
    pub fn classify(&self) -> MessageKind<'_> {
        if self.item_type == "media" {
            if let Some(media) = &self.media {
                match media.media_type {
                    MEDIA_TYPE_IMAGE => {
                        let first = media
                            .image_versions2
                            .as_ref()
                            .and_then(|v| v.candidates.first());
                        if let Some(variant) = first {
                            return MessageKind::Image { url: &variant.url };
                        }
                    }
                    MEDIA_TYPE_VIDEO => {
                        if let Some(variant) = media.video_versions.first() {
                            return MessageKind::Video { url: &variant.url };
                        }
                    }
                    _ => {}
                }
            }
        }

        let payload = if self.item_type == "text" {
            self.text.clone().unwrap_or_default()
        } else {
            self.item_type.clone()
        };
        MessageKind::Record { payload }
    }
}

/// Outcome of a delete request as reported by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteStatus {
    #[serde(default)]
    pub status: String,
}

impl DeleteStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
