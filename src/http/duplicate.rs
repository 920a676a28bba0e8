//! Fan-out response writer.
//!
//! Every header, status and body write goes to a primary sink (the client)
//! and then to a secondary sink (the recorder).
//!
//! # Design Decisions
//! - Headers are buffered locally until the head is committed, then copied
//!   value by value into both sinks
//! - A failed primary write is returned as is and the secondary is skipped
//! - Readiness is the primary's alone; the recorder always accepts writes
//! - The outcome of a secondary write is deliberately discarded: the
//!   secondary is an in-memory observer and must never fail a client response

use std::task::{Context, Poll};

use axum::http::{HeaderMap, StatusCode};

use crate::http::sink::{copy_headers, ResponseSink, SinkError};

/// Writes one response to a primary and a secondary sink.
#[derive(Debug)]
pub struct DuplicatingResponseWriter<P, S> {
    headers: HeaderMap,
    primary: P,
    secondary: S,
    head_written: bool,
}

impl<P: ResponseSink, S: ResponseSink> DuplicatingResponseWriter<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self {
            headers: HeaderMap::new(),
            primary,
            secondary,
            head_written: false,
        }
    }

    pub fn head_written(&self) -> bool {
        self.head_written
    }

    /// Commit an implicit `200 OK` head if the handler wrote nothing.
    pub fn finish(&mut self) {
        self.write_head(StatusCode::OK);
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub fn secondary(&self) -> &S {
        &self.secondary
    }

    pub fn into_inner(self) -> (P, S) {
        (self.primary, self.secondary)
    }
}

impl<P: ResponseSink, S: ResponseSink> ResponseSink for DuplicatingResponseWriter<P, S> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_head(&mut self, status: StatusCode) {
        if self.head_written {
            return;
        }
        self.head_written = true;

        copy_headers(&self.headers, self.primary.headers_mut());
        copy_headers(&self.headers, self.secondary.headers_mut());
        self.primary.write_head(status);
        self.secondary.write_head(status);
    }

    fn write_body(&mut self, data: &[u8]) -> Result<usize, SinkError> {
        self.write_head(StatusCode::OK);

        let written = self.primary.write_body(data)?;
        // Ignored on purpose: recording problems never reach the client.
        let _ = self.secondary.write_body(data);
        Ok(written)
    }

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), SinkError>> {
        self.primary.poll_ready(cx)
    }

    fn abort(&mut self) {
        self.write_head(StatusCode::BAD_GATEWAY);
        self.primary.abort();
        self.secondary.abort();
    }
}
