// SPDX-License-Identifier: MPL-2.0

use crate::direct::types::{DeleteStatus, InboxPage, Session, ThreadPage, de_id};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("not authenticated")]
    NotAuthenticated,
}

/// The remote messaging service as the archiver sees it.
///
/// Implementations hold no login state of their own: `login` hands back a
/// [`Session`] and every other call takes it explicitly.
pub trait MessagingClient {
    async fn login(&self) -> Result<Session, ClientError>;

    async fn logout(&self, session: &Session) -> Result<(), ClientError>;

    /// One page of inbox threads. An empty cursor starts at the newest page.
    async fn list_inbox_page(
        &self,
        session: &Session,
        cursor: &str,
    ) -> Result<InboxPage, ClientError>;

    /// One page of a thread's messages. An empty cursor starts at the newest page.
    async fn list_thread_page(
        &self,
        session: &Session,
        thread_id: &str,
        cursor: &str,
    ) -> Result<ThreadPage, ClientError>;

    async fn delete_message(
        &self,
        session: &Session,
        thread_id: &str,
        item_id: &str,
    ) -> Result<DeleteStatus, ClientError>;
}

/// Account credentials, only ever sent to the login endpoint.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct LoginEnvelope {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    token: Option<String>,
    logged_in_user: Option<LoggedInUser>,
}

#[derive(Deserialize)]
struct LoggedInUser {
    #[serde(deserialize_with = "de_id")]
    pk: String,
    #[serde(default)]
    username: String,
}

#[derive(Deserialize)]
struct InboxEnvelope {
    inbox: Option<InboxPage>,
}

#[derive(Deserialize)]
struct ThreadEnvelope {
    thread: Option<ThreadPage>,
}

/// JSON-over-HTTPS client for the direct messaging endpoints.
pub struct DirectClient {
    http: reqwest::Client,
    service_url: String,
    credentials: Credentials,
}

impl DirectClient {
    pub fn with_service(
        credentials: Credentials,
        service_url: &str,
        user_agent: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http,
            service_url: service_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Build `{service}/{path}`, appending the cursor only when there is one.
    fn endpoint(&self, path: &str, cursor: &str) -> Result<Url, ClientError> {
        let mut url = Url::parse(&format!("{}/{}", self.service_url, path))
            .map_err(|e| ClientError::InvalidResponse(format!("invalid endpoint: {e}")))?;
        if !cursor.is_empty() {
            url.query_pairs_mut().append_pair("cursor", cursor);
        }
        Ok(url)
    }

    fn authorized(
        &self,
        request: reqwest::RequestBuilder,
        session: &Session,
    ) -> reqwest::RequestBuilder {
        request
            .header(AUTHORIZATION, format!("Bearer {}", session.token))
            .header(COOKIE, format!("sessionid={}", session.token))
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        debug!(target: "direct", url = %response.url(), status = %status, "response");
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ClientError::NotAuthenticated);
        }
        if !status.is_success() {
            return Err(ClientError::Network(format!("HTTP {status}")));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    /// Pull `sessionid` out of the login response cookies.
    fn session_cookie(response: &reqwest::Response) -> Option<String> {
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|cookie| {
                let pair = cookie.split(';').next()?.trim();
                pair.strip_prefix("sessionid=").map(str::to_string)
            })
            .filter(|v| !v.is_empty())
    }
}

impl MessagingClient for DirectClient {
    async fn login(&self) -> Result<Session, ClientError> {
        let url = self.endpoint("accounts/login/", "")?;
        debug!(target: "direct", username = %self.credentials.username, "login");
        let response = self
            .http
            .post(url)
            .form(&[
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        debug!(target: "direct", status = %response.status(), "login response");
        if !response.status().is_success() {
            return Err(ClientError::Auth(format!("HTTP {}", response.status())));
        }

        let cookie = Self::session_cookie(&response);
        let envelope: LoginEnvelope = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        if envelope.status != "ok" {
            return Err(ClientError::Auth(
                envelope.message.unwrap_or(envelope.status),
            ));
        }

        let user = envelope
            .logged_in_user
            .ok_or_else(|| ClientError::InvalidResponse("missing logged_in_user".into()))?;
        let token = envelope
            .token
            .or(cookie)
            .ok_or_else(|| ClientError::Auth("no session token issued".into()))?;

        Ok(Session {
            user_id: user.pk,
            username: if user.username.is_empty() {
                self.credentials.username.clone()
            } else {
                user.username
            },
            token,
        })
    }

    async fn logout(&self, session: &Session) -> Result<(), ClientError> {
        let url = self.endpoint("accounts/logout/", "")?;
        debug!(target: "direct", "logout");
        let response = self
            .authorized(self.http.post(url), session)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        debug!(target: "direct", status = %response.status(), "logout response");
        if !response.status().is_success() {
            return Err(ClientError::Network(format!("HTTP {}", response.status())));
        }
        Ok(())
    }

    async fn list_inbox_page(
        &self,
        session: &Session,
        cursor: &str,
    ) -> Result<InboxPage, ClientError> {
        let url = self.endpoint("direct_v2/inbox/", cursor)?;
        debug!(target: "direct", cursor, "list inbox page");
        let response = self
            .authorized(self.http.get(url), session)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let envelope: InboxEnvelope = Self::read_json(response).await?;
        envelope
            .inbox
            .ok_or_else(|| ClientError::InvalidResponse("missing inbox".into()))
    }

    async fn list_thread_page(
        &self,
        session: &Session,
        thread_id: &str,
        cursor: &str,
    ) -> Result<ThreadPage, ClientError> {
        let url = self.endpoint(&format!("direct_v2/threads/{thread_id}/"), cursor)?;
        debug!(target: "direct", thread_id, cursor, "list thread page");
        let response = self
            .authorized(self.http.get(url), session)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let envelope: ThreadEnvelope = Self::read_json(response).await?;
        envelope
            .thread
            .ok_or_else(|| ClientError::InvalidResponse("missing thread".into()))
    }

    async fn delete_message(
        &self,
        session: &Session,
        thread_id: &str,
        item_id: &str,
    ) -> Result<DeleteStatus, ClientError> {
        let url = self.endpoint(
            &format!("direct_v2/threads/{thread_id}/items/{item_id}/delete/"),
            "",
        )?;
        debug!(target: "direct", thread_id, item_id, "delete item");
        let response = self
            .authorized(self.http.post(url), session)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Self::read_json(response).await
    }
}
