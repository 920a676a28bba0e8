//! Response write sinks.
//!
//! A sink receives one response in three kinds of calls: header mutation,
//! a single effective status write, and any number of body writes. The
//! forwarding handler only ever sees `&mut dyn ResponseSink`.
//!
//! Streaming writers wait on [`ready`] before each body write so a slow
//! client slows the upstream read instead of growing a buffer.

use std::task::{Context, Poll};

use axum::http::{HeaderMap, StatusCode};
use thiserror::Error;

/// Failure of a body write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The client went away; nothing more can be delivered.
    #[error("client disconnected")]
    ClientGone,

    /// No room for another chunk; wait on [`ready`] first.
    #[error("sink full")]
    Full,

    #[error("sink closed")]
    Closed,
}

/// Destination for one response.
pub trait ResponseSink: Send {
    /// Headers not yet committed; mutations after `write_head` have no effect.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Commit status and headers. Only the first call takes effect.
    fn write_head(&mut self, status: StatusCode);

    /// Append body bytes, committing a `200 OK` head first if none was written.
    fn write_body(&mut self, data: &[u8]) -> Result<usize, SinkError>;

    /// Ready when the next `write_body` can be accepted without buffering.
    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), SinkError>> {
        Poll::Ready(Ok(()))
    }

    /// End the body with an error instead of a clean end of stream.
    fn abort(&mut self) {}
}

/// Wait until `sink` accepts another body write.
pub async fn ready(sink: &mut dyn ResponseSink) -> Result<(), SinkError> {
    std::future::poll_fn(|cx| sink.poll_ready(cx)).await
}

/// Replace each key of `target` present in `source` with owned copies of all its values.
pub(crate) fn copy_headers(source: &HeaderMap, target: &mut HeaderMap) {
    for key in source.keys() {
        target.remove(key);
        for value in source.get_all(key) {
            target.append(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_copy_headers_replaces_full_value_list() {
        let mut source = HeaderMap::new();
        source.append("set-cookie", HeaderValue::from_static("a=1"));
        source.append("set-cookie", HeaderValue::from_static("b=2"));
        source.insert("content-type", HeaderValue::from_static("text/plain"));

        let mut target = HeaderMap::new();
        target.insert("set-cookie", HeaderValue::from_static("stale=0"));
        target.insert("x-kept", HeaderValue::from_static("yes"));

        copy_headers(&source, &mut target);

        let cookies: Vec<_> = target.get_all("set-cookie").iter().collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
        assert_eq!(target["content-type"], "text/plain");
        assert_eq!(target["x-kept"], "yes");
    }
}
