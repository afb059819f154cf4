// SPDX-License-Identifier: MPL-2.0

//! In-memory collaborators shared by the unit tests.

use crate::archive::{MediaError, MediaSource};
use crate::direct::{
    ClientError, DeleteStatus, ImageVersions, InboxPage, MediaPayload, MediaVariant, Message,
    MessagingClient, Session, ThreadPage, ThreadSummary,
};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::Notify;

pub fn text_message(item_id: &str, user_id: &str, text: &str, timestamp: &str) -> Message {
    Message {
        item_id: item_id.to_string(),
        user_id: user_id.to_string(),
        timestamp: timestamp.to_string(),
        item_type: "text".to_string(),
        text: Some(text.to_string()),
        media: None,
    }
}

pub fn action_message(item_id: &str, user_id: &str, item_type: &str, timestamp: &str) -> Message {
    Message {
        item_id: item_id.to_string(),
        user_id: user_id.to_string(),
        timestamp: timestamp.to_string(),
        item_type: item_type.to_string(),
        text: None,
        media: None,
    }
}

pub fn image_message(item_id: &str, user_id: &str, url: &str, timestamp: &str) -> Message {
    Message {
        item_id: item_id.to_string(),
        user_id: user_id.to_string(),
        timestamp: timestamp.to_string(),
        item_type: "media".to_string(),
        text: None,
        media: Some(MediaPayload {
            media_type: 1,
            image_versions2: Some(ImageVersions {
                candidates: vec![MediaVariant {
                    url: url.to_string(),
                }],
            }),
            video_versions: Vec::new(),
        }),
    }
}

pub fn video_message(item_id: &str, user_id: &str, url: &str, timestamp: &str) -> Message {
    Message {
        item_id: item_id.to_string(),
        user_id: user_id.to_string(),
        timestamp: timestamp.to_string(),
        item_type: "media".to_string(),
        text: None,
        media: Some(MediaPayload {
            media_type: 2,
            image_versions2: None,
            video_versions: vec![MediaVariant {
                url: url.to_string(),
            }],
        }),
    }
}

/// `older` is the cursor of the next page, `None` for the last page.
pub fn inbox_page(threads: &[(&str, &str)], older: Option<&str>) -> InboxPage {
    InboxPage {
        threads: threads
            .iter()
            .map(|(id, title)| ThreadSummary {
                thread_id: id.to_string(),
                thread_title: title.to_string(),
            })
            .collect(),
        has_older: older.is_some(),
        oldest_cursor: older.unwrap_or_default().to_string(),
    }
}

pub fn thread_page(items: Vec<Message>, older: Option<&str>) -> ThreadPage {
    ThreadPage {
        items,
        has_older: older.is_some(),
        oldest_cursor: older.unwrap_or_default().to_string(),
    }
}

#[derive(Default)]
pub struct Calls {
    pub logins: usize,
    pub logouts: usize,
    pub inbox_cursors: Vec<String>,
    pub thread_cursors: Vec<String>,
    pub deletes: Vec<(String, String)>,
}

/// A messaging service that replays scripted pages in call order.
pub struct ScriptedClient {
    user_id: String,
    login_fails: bool,
    logout_hangs: bool,
    inbox: Vec<InboxPage>,
    thread: Vec<ThreadPage>,
    failing_thread_page: Option<usize>,
    hanging_thread_page: Option<usize>,
    delete_statuses: HashMap<String, Option<String>>,
    pub stalled: Arc<Notify>,
    calls: Mutex<Calls>,
}

impl ScriptedClient {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            login_fails: false,
            logout_hangs: false,
            inbox: Vec::new(),
            thread: Vec::new(),
            failing_thread_page: None,
            hanging_thread_page: None,
            delete_statuses: HashMap::new(),
            stalled: Arc::new(Notify::new()),
            calls: Mutex::new(Calls::default()),
        }
    }

    pub fn session(&self) -> Session {
        Session {
            user_id: self.user_id.clone(),
            username: "me".to_string(),
            token: "token".to_string(),
        }
    }

    pub fn with_inbox(mut self, pages: Vec<InboxPage>) -> Self {
        self.inbox = pages;
        self
    }

    pub fn with_thread(mut self, pages: Vec<ThreadPage>) -> Self {
        self.thread = pages;
        self
    }

    pub fn failing_login(mut self) -> Self {
        self.login_fails = true;
        self
    }

    /// Logout never completes.
    pub fn hanging_logout(mut self) -> Self {
        self.logout_hangs = true;
        self
    }

    /// The nth thread page request (zero based) yields no data.
    pub fn failing_thread_page(mut self, index: usize) -> Self {
        self.failing_thread_page = Some(index);
        self
    }

    /// The nth thread page request (zero based) never completes; `stalled` is notified.
    pub fn hanging_thread_page(mut self, index: usize) -> Self {
        self.hanging_thread_page = Some(index);
        self
    }

    /// Reply to a delete of `item_id` with `status`, or a transport error for `None`.
    pub fn delete_reply(mut self, item_id: &str, status: Option<&str>) -> Self {
        self.delete_statuses
            .insert(item_id.to_string(), status.map(str::to_string));
        self
    }

    pub fn calls(&self) -> std::sync::MutexGuard<'_, Calls> {
        self.calls.lock().unwrap()
    }
}

impl MessagingClient for ScriptedClient {
    async fn login(&self) -> Result<Session, ClientError> {
        self.calls().logins += 1;
        if self.login_fails {
            return Err(ClientError::Auth("bad password".to_string()));
        }
        Ok(self.session())
    }

    async fn logout(&self, _session: &Session) -> Result<(), ClientError> {
        self.calls().logouts += 1;
        if self.logout_hangs {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn list_inbox_page(
        &self,
        _session: &Session,
        cursor: &str,
    ) -> Result<InboxPage, ClientError> {
        let index = {
            let mut calls = self.calls();
            calls.inbox_cursors.push(cursor.to_string());
            calls.inbox_cursors.len() - 1
        };
        self.inbox
            .get(index)
            .cloned()
            .ok_or_else(|| ClientError::Network("no scripted inbox page".to_string()))
    }

    async fn list_thread_page(
        &self,
        _session: &Session,
        _thread_id: &str,
        cursor: &str,
    ) -> Result<ThreadPage, ClientError> {
        let index = {
            let mut calls = self.calls();
            calls.thread_cursors.push(cursor.to_string());
            calls.thread_cursors.len() - 1
        };
        if self.hanging_thread_page == Some(index) {
            self.stalled.notify_one();
            std::future::pending::<()>().await;
        }
        if self.failing_thread_page == Some(index) {
            return Err(ClientError::InvalidResponse("missing thread".to_string()));
        }
        self.thread
            .get(index)
            .cloned()
            .ok_or_else(|| ClientError::Network("no scripted thread page".to_string()))
    }

    async fn delete_message(
        &self,
        _session: &Session,
        thread_id: &str,
        item_id: &str,
    ) -> Result<DeleteStatus, ClientError> {
        self.calls()
            .deletes
            .push((thread_id.to_string(), item_id.to_string()));
        match self.delete_statuses.get(item_id) {
            Some(Some(status)) => Ok(DeleteStatus {
                status: status.clone(),
            }),
            Some(None) => Err(ClientError::Network("connection reset".to_string())),
            None => Ok(DeleteStatus {
                status: "ok".to_string(),
            }),
        }
    }
}

impl<T: MessagingClient> MessagingClient for &T {
    async fn login(&self) -> Result<Session, ClientError> {
        (**self).login().await
    }

    async fn logout(&self, session: &Session) -> Result<(), ClientError> {
        (**self).logout(session).await
    }

    async fn list_inbox_page(
        &self,
        session: &Session,
        cursor: &str,
    ) -> Result<InboxPage, ClientError> {
        (**self).list_inbox_page(session, cursor).await
    }

    async fn list_thread_page(
        &self,
        session: &Session,
        thread_id: &str,
        cursor: &str,
    ) -> Result<ThreadPage, ClientError> {
        (**self).list_thread_page(session, thread_id, cursor).await
    }

    async fn delete_message(
        &self,
        session: &Session,
        thread_id: &str,
        item_id: &str,
    ) -> Result<DeleteStatus, ClientError> {
        (**self).delete_message(session, thread_id, item_id).await
    }
}

/// Serves fixed bodies per URL and counts every fetch.
#[derive(Default)]
pub struct CountingSource {
    failing: HashSet<String>,
    fetched: Mutex<Vec<String>>,
}

impl CountingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

impl MediaSource for CountingSource {
    async fn download(&self, url: &str, sink: &mut File) -> Result<usize, MediaError> {
        self.fetched.lock().unwrap().push(url.to_string());
        if self.failing.contains(url) {
            return Err(ClientError::Network("connection refused".to_string()).into());
        }
        let body = format!("bytes of {url}").into_bytes();
        sink.write_all(&body).await?;
        Ok(body.len())
    }
}

impl<T: MediaSource> MediaSource for &T {
    async fn download(&self, url: &str, sink: &mut File) -> Result<usize, MediaError> {
        (**self).download(url, sink).await
    }
}

/// Collects formatted log lines for the duration of a test.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    /// Route this thread's events at debug and above into the capture.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

pub struct MockResponse {
    status: u16,
    body: Vec<u8>,
    content_type: &'static str,
    cookie: Option<String>,
}

#[derive(Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub authorization: Option<String>,
}

/// A local HTTP server answering requests with scripted responses, in order.
pub struct MockServer {
    addr: SocketAddr,
    handle: Option<JoinHandle<Vec<RecordedRequest>>>,
}

impl MockServer {
    pub fn start(responses: Vec<MockResponse>) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();

        let handle = std::thread::spawn(move || {
            let mut seen = Vec::new();
            for scripted in responses {
                let request = server.recv().unwrap();
                seen.push(RecordedRequest {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    authorization: request
                        .headers()
                        .iter()
                        .find(|h| h.field.equiv("Authorization"))
                        .map(|h| h.value.as_str().to_string()),
                });

                let mut response =
                    tiny_http::Response::from_data(scripted.body).with_status_code(scripted.status);
                response.add_header(
                    tiny_http::Header::from_bytes(
                        &b"Content-Type"[..],
                        scripted.content_type.as_bytes(),
                    )
                    .unwrap(),
                );
                if let Some(cookie) = scripted.cookie {
                    response.add_header(
                        tiny_http::Header::from_bytes(&b"Set-Cookie"[..], cookie.as_bytes())
                            .unwrap(),
                    );
                }
                request.respond(response).unwrap();
            }
            seen
        });

        Self {
            addr,
            handle: Some(handle),
        }
    }

    pub fn json(status: u16, body: &str) -> MockResponse {
        MockResponse {
            status,
            body: body.as_bytes().to_vec(),
            content_type: "application/json",
            cookie: None,
        }
    }

    pub fn json_with_cookie(status: u16, body: &str, cookie: &str) -> MockResponse {
        MockResponse {
            cookie: Some(cookie.to_string()),
            ..Self::json(status, body)
        }
    }

    pub fn bytes(status: u16, body: &[u8]) -> MockResponse {
        MockResponse {
            status,
            body: body.to_vec(),
            content_type: "application/octet-stream",
            cookie: None,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Wait until every scripted response was served and return what was asked.
    pub fn finish(mut self) -> Vec<RecordedRequest> {
        self.handle.take().unwrap().join().unwrap()
    }
}
