// SPDX-License-Identifier: MPL-2.0

//! Download-if-absent for message media.
//!
//! The target path is the cache key: if a file already exists there, nothing
//! is fetched. Bodies are streamed into a `.part` sibling and renamed into
//! place, so a failed download never leaves a truncated file under the final
//! name.

use crate::direct::ClientError;
use futures_util::StreamExt;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] ClientError),
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Where media bytes come from.
pub trait MediaSource {
    /// Write the body behind `url` into `sink`, returning the byte count.
    async fn download(&self, url: &str, sink: &mut File) -> Result<usize, MediaError>;
}

/// Plain HTTP(S) download. Media URLs are pre-signed CDN links and need no session.
pub struct HttpMediaSource {
    http: reqwest::Client,
}

impl HttpMediaSource {
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(Self { http })
    }
}

impl MediaSource for HttpMediaSource {
    async fn download(&self, url: &str, sink: &mut File) -> Result<usize, MediaError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClientError::Network(format!("HTTP {}", response.status())).into());
        }

        let mut written = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ClientError::Network(e.to_string()))?;
            sink.write_all(&chunk).await?;
            written += chunk.len();
        }
        Ok(written)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Downloaded { bytes: usize },
    AlreadyPresent,
}

pub struct MediaFetcher<S> {
    source: S,
}

impl<S: MediaSource> MediaFetcher<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub async fn fetch_if_absent(
        &self,
        url: &str,
        target: &Path,
    ) -> Result<FetchOutcome, MediaError> {
        if fs::metadata(target).await.is_ok() {
            debug!(target: "archive", path = %target.display(), "media already present");
            return Ok(FetchOutcome::AlreadyPresent);
        }

        let partial = partial_path(target);
        let bytes = match self.write_partial(url, &partial).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = fs::remove_file(&partial).await;
                return Err(e);
            }
        };
        if let Err(e) = fs::rename(&partial, target).await {
            let _ = fs::remove_file(&partial).await;
            return Err(MediaError::Io(e));
        }

        debug!(target: "archive", path = %target.display(), bytes, "media downloaded");
        Ok(FetchOutcome::Downloaded { bytes })
    }

    async fn write_partial(&self, url: &str, partial: &Path) -> Result<usize, MediaError> {
        let mut file = File::create(partial).await?;
        let bytes = self.source.download(url, &mut file).await?;
        file.flush().await?;
        Ok(bytes)
    }
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = OsString::from(target.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

/// `{item_id}.{ext}`, with every byte outside `[A-Za-z0-9._-]` percent-encoded.
/// Separators cannot survive, and distinct ids always get distinct names.
pub fn media_file_name(item_id: &str, ext: &str) -> String {
    let mut stem = String::with_capacity(item_id.len());
    for b in item_id.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' => stem.push(b as char),
            _ => stem.push_str(&format!("%{b:02X}")),
        }
    }
    format!("{stem}.{ext}")
}
