//! In-memory response recording.
//!
//! # Responsibilities
//! - Snapshot the inbound request before it is handed to the forwarder
//! - Capture status, headers and body of the response as it is written
//! - Hand the finished exchange to the analysis pipeline
//!
//! # Design Decisions
//! - Terminal observer: nothing written here is forwarded anywhere
//! - The request snapshot is an owned clone, never shared with the live request
//! - Body capture is capped; bytes past the cap are counted, not stored

use axum::http::{HeaderMap, Method, Request, StatusCode, Uri, Version};

use crate::http::request::X_REQUEST_ID;
use crate::http::sink::{ResponseSink, SinkError};

/// Immutable copy of the parts of a request coverage analysis reads.
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
}

impl RequestSnapshot {
    /// Clone method, URI, version and headers of a live request.
    pub fn capture<B>(request: &Request<B>) -> Self {
        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            version: request.version(),
            headers: request.headers().clone(),
        }
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Request ID assigned by the request ID layer, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok())
    }
}

/// A completed request/response pair, owned by the ingestion worker after hand-off.
#[derive(Debug, Clone)]
pub struct RecordedExchange {
    pub request: RequestSnapshot,
    /// `None` when no status was ever written.
    pub status: Option<StatusCode>,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    /// Body bytes beyond the capture limit.
    pub body_truncated_bytes: usize,
}

/// Sink that keeps a response in memory.
#[derive(Debug)]
pub struct ResponseRecorder {
    request: RequestSnapshot,
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
    body_limit: usize,
    truncated: usize,
}

impl ResponseRecorder {
    /// Recorder with no body limit.
    pub fn new(request: RequestSnapshot) -> Self {
        Self::with_body_limit(request, usize::MAX)
    }

    pub fn with_body_limit(request: RequestSnapshot, body_limit: usize) -> Self {
        Self {
            request,
            status: None,
            headers: HeaderMap::new(),
            body: Vec::new(),
            body_limit,
            truncated: 0,
        }
    }

    pub fn request(&self) -> &RequestSnapshot {
        &self.request
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_exchange(self) -> RecordedExchange {
        RecordedExchange {
            request: self.request,
            status: self.status,
            headers: self.headers,
            body: self.body,
            body_truncated_bytes: self.truncated,
        }
    }
}

impl ResponseSink for ResponseRecorder {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_head(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    fn write_body(&mut self, data: &[u8]) -> Result<usize, SinkError> {
        self.write_head(StatusCode::OK);

        let room = self.body_limit.saturating_sub(self.body.len());
        let kept = room.min(data.len());
        self.body.extend_from_slice(&data[..kept]);
        self.truncated += data.len() - kept;
        Ok(data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::HeaderValue;

    fn snapshot() -> RequestSnapshot {
        let request = Request::builder()
            .method("GET")
            .uri("http://example.com/pets/?limit=5")
            .header(X_REQUEST_ID, "req-1")
            .body(Body::empty())
            .unwrap();
        RequestSnapshot::capture(&request)
    }

    #[test]
    fn test_snapshot_is_independent_of_request() {
        let mut request = Request::builder()
            .uri("/pets?limit=5")
            .header("x-a", "1")
            .body(Body::empty())
            .unwrap();
        let snapshot = RequestSnapshot::capture(&request);

        request.headers_mut().insert("x-a", HeaderValue::from_static("2"));
        *request.uri_mut() = Uri::from_static("/other");

        assert_eq!(snapshot.headers["x-a"], "1");
        assert_eq!(snapshot.path(), "/pets");
        assert_eq!(snapshot.query(), Some("limit=5"));
    }

    #[test]
    fn test_write_head_is_idempotent() {
        let mut recorder = ResponseRecorder::new(snapshot());
        assert_eq!(recorder.status(), None);

        recorder.write_head(StatusCode::NOT_FOUND);
        recorder.write_head(StatusCode::OK);
        assert_eq!(recorder.status(), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_write_body_implies_ok_and_appends() {
        let mut recorder = ResponseRecorder::new(snapshot());
        assert_eq!(recorder.write_body(b"hello ").unwrap(), 6);
        assert_eq!(recorder.write_body(b"world").unwrap(), 5);
        recorder.write_head(StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(recorder.status(), Some(StatusCode::OK));
        assert_eq!(recorder.body(), b"hello world");
    }

    #[test]
    fn test_body_limit() {
        let mut recorder = ResponseRecorder::with_body_limit(snapshot(), 4);
        assert_eq!(recorder.write_body(b"abc").unwrap(), 3);
        assert_eq!(recorder.write_body(b"defg").unwrap(), 4);

        let exchange = recorder.into_exchange();
        assert_eq!(exchange.body, b"abcd");
        assert_eq!(exchange.body_truncated_bytes, 3);
        assert_eq!(exchange.request.request_id(), Some("req-1"));
    }
}
