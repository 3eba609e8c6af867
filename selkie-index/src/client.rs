//! The backend client: retrying link ingestion over HTTP and single-shot
//! query exchanges over a per-call websocket.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use reqwest::StatusCode;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::IndexConfig;
use crate::deadline::{bounded, effective_deadline};
use crate::endpoint::{self, Transport};
use crate::error::{IndexError, Result};
use crate::response::{self, SearchResult};
use crate::retry::{self, Attempt};

/// Marker the backend embeds in a failure body when it could not derive
/// any text from the submitted page.
const NO_CONTENT_MARKER: &str = "no text found";

/// Cap on how much of a failure body is kept for diagnostics.
const MAX_ERROR_BODY: usize = 4 * 1024;

/// Identity headers sent with every ingestion request; the backend
/// expects a browser-shaped pair.
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:147.0) Gecko/20100101 Firefox/147.0";
const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Supplies page content for the ingestion fallback path.
///
/// When the backend reports it could not derive text from a submitted
/// page, the client asks its content source for a `(title, text)` pair
/// and resubmits once. Extraction failures are tolerated: the submission
/// falls back to the URL string itself for both fields.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn extract(&self, url: &str) -> anyhow::Result<(String, String)>;
}

enum AddStatus {
    Created,
    ServerError { status: u16, body: String },
    Unexpected { status: u16, body: String },
}

enum SubmitOutcome {
    Created,
    NeedsContent,
}

/// Client for the remote indexing/search backend.
///
/// Holds no per-call state beyond its immutable configuration; a single
/// instance is safe to share and call concurrently. Every operation takes
/// a [`CancellationToken`] and an optional caller deadline, and the
/// client itself produces no log output: failures are described entirely
/// by the [`IndexError`] they return.
pub struct IndexClient {
    config: IndexConfig,
    add_endpoint: Url,
    search_endpoint: Url,
    http: reqwest::Client,
    content: Option<Arc<dyn ContentSource>>,
}

impl std::fmt::Debug for IndexClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexClient")
            .field("config", &self.config)
            .field("add_endpoint", &self.add_endpoint)
            .field("search_endpoint", &self.search_endpoint)
            .finish_non_exhaustive()
    }
}

impl IndexClient {
    /// Build a client, validating `config` and resolving both endpoints
    /// eagerly so a bad configuration fails here rather than mid-retry.
    pub fn new(config: IndexConfig) -> Result<Self> {
        config.validate()?;
        let add_endpoint = endpoint::resolve(&config.base_url, &config.add_path, Transport::Http)?;
        let search_endpoint =
            endpoint::resolve(&config.base_url, &config.search_path, Transport::WebSocket)?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| IndexError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            add_endpoint,
            search_endpoint,
            http,
            content: None,
        })
    }

    /// Attach a content source for the no-extractable-text fallback.
    #[must_use]
    pub fn with_content_source(mut self, source: Arc<dyn ContentSource>) -> Self {
        self.content = Some(source);
        self
    }

    /// The resolved ingestion endpoint.
    pub fn add_endpoint(&self) -> &Url {
        &self.add_endpoint
    }

    /// The resolved query endpoint.
    pub fn search_endpoint(&self) -> &Url {
        &self.search_endpoint
    }

    /// Submit a link for indexing.
    ///
    /// Success means exactly 201 Created. Transport failures and 5xx
    /// responses are retried under the configured policy; any other
    /// status is terminal. When the first attempt fails because the
    /// backend found no text on the page, one extra send carrying
    /// non-empty title and text fields is made (see [`ContentSource`]).
    pub async fn submit_url(
        &self,
        url: &str,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Result<()> {
        let url = url.trim();
        if url.is_empty() {
            return Err(IndexError::Config("url is required".into()));
        }
        let form = form_fields(url, "", "");
        let outcome = retry::with_retries(&self.config.retry, cancel, |attempt| {
            let form = &form;
            async move {
                match self.send_add(form, cancel, deadline).await {
                    Ok(AddStatus::Created) => Attempt::Done(SubmitOutcome::Created),
                    Ok(AddStatus::ServerError { status, body }) => {
                        if attempt == 0 && body.contains(NO_CONTENT_MARKER) {
                            Attempt::Done(SubmitOutcome::NeedsContent)
                        } else {
                            Attempt::Retry(IndexError::Status { status, body })
                        }
                    }
                    Ok(AddStatus::Unexpected { status, body }) => {
                        if attempt == 0 && body.contains(NO_CONTENT_MARKER) {
                            Attempt::Done(SubmitOutcome::NeedsContent)
                        } else {
                            Attempt::Fatal(IndexError::Status { status, body })
                        }
                    }
                    Err(err) if err.is_retryable() => Attempt::Retry(err),
                    Err(err) => Attempt::Fatal(err),
                }
            }
        })
        .await?;

        match outcome {
            SubmitOutcome::Created => Ok(()),
            SubmitOutcome::NeedsContent => self.submit_with_content(url, cancel, deadline).await,
        }
    }

    /// The single follow-up send after a no-text failure. Not retried.
    async fn submit_with_content(
        &self,
        url: &str,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Result<()> {
        let (title, text) = self.fallback_content(url, cancel, deadline).await?;
        let form = form_fields(url, &title, &text);
        match self.send_add(&form, cancel, deadline).await? {
            AddStatus::Created => Ok(()),
            AddStatus::ServerError { status, body } | AddStatus::Unexpected { status, body } => {
                Err(IndexError::Status { status, body })
            }
        }
    }

    /// Derive non-empty `(title, text)` for the fallback send: from the
    /// attached content source when it yields anything, the URL string
    /// otherwise. Extraction is best effort; only cancellation aborts.
    async fn fallback_content(
        &self,
        url: &str,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Result<(String, String)> {
        if let Some(source) = &self.content {
            let op_deadline = effective_deadline(self.config.timeout, deadline);
            let extracted =
                bounded("content extraction", op_deadline, cancel, async {
                    Ok(source.extract(url).await)
                })
                .await;
            match extracted {
                Err(IndexError::Cancelled) => return Err(IndexError::Cancelled),
                Ok(Ok((title, text))) => {
                    let title = title.trim();
                    let text = text.trim();
                    if !title.is_empty() || !text.is_empty() {
                        let or_url = |value: &str| {
                            if value.is_empty() {
                                url.to_owned()
                            } else {
                                value.to_owned()
                            }
                        };
                        return Ok((or_url(title), or_url(text)));
                    }
                }
                Err(_) | Ok(Err(_)) => {}
            }
        }
        Ok((url.to_owned(), url.to_owned()))
    }

    /// One POST to the ingestion endpoint, bounded per operation.
    async fn send_add(
        &self,
        form: &[(String, String)],
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Result<AddStatus> {
        let op_deadline = effective_deadline(self.config.timeout, deadline);
        let request = self
            .http
            .post(self.add_endpoint.clone())
            .header(reqwest::header::ACCEPT, ACCEPT)
            .form(&form);
        let response = bounded("add request", op_deadline, cancel, async {
            request
                .send()
                .await
                .map_err(|e| IndexError::Transport(format!("add request failed: {e}")))
        })
        .await?;

        let status = response.status();
        if status == StatusCode::CREATED {
            return Ok(AddStatus::Created);
        }

        // Failure bodies are diagnostic only; read errors are tolerated
        // but cancellation still aborts.
        let body = match bounded("add response body", op_deadline, cancel, async {
            response
                .text()
                .await
                .map_err(|e| IndexError::Transport(format!("read add response: {e}")))
        })
        .await
        {
            Ok(body) => truncate_body(body),
            Err(IndexError::Cancelled) => return Err(IndexError::Cancelled),
            Err(_) => String::new(),
        };

        if status.is_server_error() {
            Ok(AddStatus::ServerError {
                status: status.as_u16(),
                body,
            })
        } else {
            Ok(AddStatus::Unexpected {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// Query the backend for ranked results.
    ///
    /// Each attempt dials a fresh websocket, performs one write/read
    /// exchange, and releases the connection whatever the outcome.
    /// Abnormal closes and transport faults are retried; a normal close
    /// before the reply and undecodable payloads are terminal.
    /// `limit == 0` means no truncation.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # async fn example() -> selkie_index::Result<()> {
    /// use tokio_util::sync::CancellationToken;
    ///
    /// let config = selkie_index::IndexConfig {
    ///     base_url: "https://index.local".to_string(),
    ///     ..Default::default()
    /// };
    /// let client = selkie_index::IndexClient::new(config)?;
    /// let results = client
    ///     .search("rust borrow checker", 5, &CancellationToken::new(), None)
    ///     .await?;
    /// for hit in &results {
    ///     println!("{}: {}", hit.title, hit.url);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Result<Vec<SearchResult>> {
        #[derive(serde::Serialize)]
        struct Query<'a> {
            text: &'a str,
        }
        let payload = serde_json::to_string(&Query { text: query })
            .map_err(|e| IndexError::Parse(format!("encode search request: {e}")))?;

        retry::with_retries(&self.config.retry, cancel, |_| {
            let payload = &payload;
            async move {
                match self.search_once(payload, limit, cancel, deadline).await {
                    Ok(results) => Attempt::Done(results),
                    Err(err) if err.is_retryable() => Attempt::Retry(err),
                    Err(err) => Attempt::Fatal(err),
                }
            }
        })
        .await
    }

    /// One dial / one exchange / one close.
    async fn search_once(
        &self,
        payload: &str,
        limit: usize,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Result<Vec<SearchResult>> {
        let dial_deadline = effective_deadline(self.config.timeout, deadline);
        let mut ws = bounded("search dial", dial_deadline, cancel, async {
            tokio_tungstenite::connect_async(self.search_endpoint.as_str())
                .await
                .map(|(stream, _)| stream)
                .map_err(|e| IndexError::Transport(format!("search dial failed: {e}")))
        })
        .await?;

        let result = self.round_trip(&mut ws, payload, limit, cancel, deadline).await;
        match &result {
            // Force-close on cancellation; a close handshake would wait
            // on the peer.
            Err(IndexError::Cancelled) => drop(ws),
            _ => {
                let _ = ws.close(None).await;
            }
        }
        result
    }

    async fn round_trip(
        &self,
        ws: &mut WsStream,
        payload: &str,
        limit: usize,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Result<Vec<SearchResult>> {
        let write_deadline = effective_deadline(self.config.timeout, deadline);
        bounded("search write", write_deadline, cancel, async {
            ws.send(Message::Text(payload.to_owned()))
                .await
                .map_err(|e| IndexError::Transport(format!("write search request: {e}")))
        })
        .await?;

        let read_deadline = effective_deadline(self.config.timeout, deadline);
        let message = bounded("search read", read_deadline, cancel, async {
            loop {
                match ws.next().await {
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                    Some(Ok(message)) => break Ok(message),
                    Some(Err(e)) => {
                        break Err(IndexError::Transport(format!("read search response: {e}")))
                    }
                    None => {
                        break Err(IndexError::Transport(
                            "connection closed before response".into(),
                        ))
                    }
                }
            }
        })
        .await?;

        let raw = match message {
            Message::Text(text) => text.into_bytes(),
            Message::Binary(data) => data,
            Message::Close(Some(frame)) if frame.code == CloseCode::Normal => {
                return Err(IndexError::Closed)
            }
            Message::Close(Some(frame)) => {
                return Err(IndexError::Transport(format!(
                    "connection closed abnormally: {} {}",
                    u16::from(frame.code),
                    frame.reason
                )))
            }
            Message::Close(None) => {
                return Err(IndexError::Transport(
                    "connection closed without status".into(),
                ))
            }
            other => {
                return Err(IndexError::Transport(format!(
                    "unexpected websocket frame: {other:?}"
                )))
            }
        };

        response::parse_results(&raw, limit)
    }
}

fn form_fields(url: &str, title: &str, text: &str) -> Vec<(String, String)> {
    let mut fields = vec![("url".to_owned(), url.to_owned())];
    if !title.trim().is_empty() {
        fields.push(("title".to_owned(), title.to_owned()));
    }
    if !text.trim().is_empty() {
        fields.push(("text".to_owned(), text.to_owned()));
    }
    fields
}

fn truncate_body(body: String) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= MAX_ERROR_BODY {
        return trimmed.to_owned();
    }
    let mut end = MAX_ERROR_BODY;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> IndexConfig {
        IndexConfig {
            base_url,
            timeout: Duration::from_secs(5),
            retry: crate::RetryPolicy {
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
                max_attempts: 2,
            },
            ..Default::default()
        }
    }

    fn client_for(server: &MockServer) -> IndexClient {
        IndexClient::new(test_config(server.uri())).unwrap()
    }

    struct FixedContent;

    #[async_trait]
    impl ContentSource for FixedContent {
        async fn extract(&self, _url: &str) -> anyhow::Result<(String, String)> {
            Ok(("Example Title".to_string(), "Example body text".to_string()))
        }
    }

    struct FailingContent;

    #[async_trait]
    impl ContentSource for FailingContent {
        async fn extract(&self, _url: &str) -> anyhow::Result<(String, String)> {
            anyhow::bail!("fetch failed")
        }
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let body = "é".repeat(MAX_ERROR_BODY);
        let truncated = truncate_body(body);
        assert!(truncated.len() <= MAX_ERROR_BODY);
        assert!(truncated.chars().all(|c| c == 'é'));
    }

    #[test]
    fn form_skips_blank_title_and_text() {
        let fields = form_fields("https://x.example", " ", "");
        assert_eq!(fields.len(), 1);
        let fields = form_fields("https://x.example", "T", "B");
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let err = IndexClient::new(IndexConfig::default()).unwrap_err();
        assert!(matches!(err, IndexError::Config(_)));
    }

    #[test]
    fn endpoints_are_resolved_per_transport() {
        let client = IndexClient::new(IndexConfig {
            base_url: "https://index.local".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.add_endpoint().as_str(), "https://index.local/add");
        assert_eq!(client.search_endpoint().as_str(), "wss://index.local/search");
    }

    #[tokio::test]
    async fn submit_succeeds_on_created() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/add"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("url=https%3A%2F%2Fexample.com%2Fpost"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let cancel = CancellationToken::new();
        client
            .submit_url("https://example.com/post", &cancel, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn submit_retries_server_errors_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/add"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/add"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let cancel = CancellationToken::new();
        client
            .submit_url("https://example.com/a", &cancel, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn submit_exhausts_retry_budget_on_persistent_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/add"))
            .respond_with(ResponseTemplate::new(500).set_body_string("db down"))
            .expect(3)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let cancel = CancellationToken::new();
        let err = client
            .submit_url("https://example.com/a", &cancel, None)
            .await
            .unwrap_err();
        match err {
            IndexError::Exhausted { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, IndexError::Status { status: 500, .. }));
            }
            other => panic!("expected Exhausted, got {other}"),
        }
    }

    #[tokio::test]
    async fn submit_treats_ok_as_terminal_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/add"))
            .respond_with(ResponseTemplate::new(200).set_body_string("accepted"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let cancel = CancellationToken::new();
        let err = client
            .submit_url("https://example.com/a", &cancel, None)
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::Status { status: 200, .. }));
    }

    #[tokio::test]
    async fn no_text_failure_triggers_one_fallback_send_with_url_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/add"))
            .respond_with(ResponseTemplate::new(500).set_body_string(
                "failed to process document error=\"no text found\"",
            ))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/add"))
            .and(body_string_contains("title=https%3A%2F%2Fexample.com%2Fbare"))
            .and(body_string_contains("text=https%3A%2F%2Fexample.com%2Fbare"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let cancel = CancellationToken::new();
        client
            .submit_url("https://example.com/bare", &cancel, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn fallback_send_uses_the_content_source_when_attached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/add"))
            .respond_with(ResponseTemplate::new(500).set_body_string("no text found"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/add"))
            .and(body_string_contains("title=Example+Title"))
            .and(body_string_contains("text=Example+body+text"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).with_content_source(Arc::new(FixedContent));
        let cancel = CancellationToken::new();
        client
            .submit_url("https://example.com/page", &cancel, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn failed_extraction_falls_back_to_the_url_string() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/add"))
            .respond_with(ResponseTemplate::new(500).set_body_string("no text found"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/add"))
            .and(body_string_contains("title=https%3A%2F%2Fexample.com%2Fp"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).with_content_source(Arc::new(FailingContent));
        let cancel = CancellationToken::new();
        client
            .submit_url("https://example.com/p", &cancel, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn no_text_failure_after_the_first_attempt_is_an_ordinary_retry() {
        // The marker only matters on attempt zero; later attempts retry.
        let server = MockServer::start().await;
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        Mock::given(method("POST"))
            .and(path("/add"))
            .respond_with(move |_: &wiremock::Request| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                match n {
                    0 => ResponseTemplate::new(503).set_body_string("overloaded"),
                    1 => ResponseTemplate::new(500).set_body_string("no text found"),
                    _ => ResponseTemplate::new(201),
                }
            })
            .expect(3)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let cancel = CancellationToken::new();
        client
            .submit_url("https://example.com/a", &cancel, None)
            .await
            .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancellation_aborts_an_in_flight_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/add"))
            .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(30)))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });
        let started = std::time::Instant::now();
        let err = client
            .submit_url("https://example.com/a", &cancel, None)
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn caller_deadline_tighter_than_timeout_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/add"))
            .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(30)))
            .mount(&server)
            .await;

        let config = IndexConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(60),
            retry: crate::RetryPolicy {
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(1),
                max_attempts: 0,
            },
            ..Default::default()
        };
        let client = IndexClient::new(config).unwrap();
        let cancel = CancellationToken::new();
        let deadline = Instant::now() + Duration::from_millis(100);
        let err = client
            .submit_url("https://example.com/a", &cancel, Some(deadline))
            .await
            .unwrap_err();
        match err {
            IndexError::Exhausted { source, .. } => {
                assert!(matches!(*source, IndexError::Timeout(_)));
            }
            other => panic!("expected Exhausted(Timeout), got {other}"),
        }
    }

    #[tokio::test]
    async fn empty_url_is_rejected_before_any_request() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        let cancel = CancellationToken::new();
        let err = client.submit_url("  ", &cancel, None).await.unwrap_err();
        assert!(matches!(err, IndexError::Config(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
