//! Sink writing to the real client connection.
//!
//! # Data Flow
//! ```text
//! forwarding task                         axum handler
//!     write_head ── oneshot (status, headers) ──▶ PendingResponse::into_response
//!     write_body ── bounded mpsc (Bytes) ───────▶ streamed response body
//!     abort      ── error frame ────────────────▶ body error, connection reset
//!     drop       ── channel closed ─────────────▶ end of body
//! ```
//!
//! # Design Decisions
//! - The head is released to hyper as soon as it is written, so the client
//!   does not wait for the whole body to be forwarded
//! - At most [`BODY_CHANNEL_CHUNKS`] chunks wait for the client; `poll_ready`
//!   reserves a slot and stays pending while the client is not reading
//! - A closed channel means the client is gone; body writes then fail

use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio::sync::mpsc::error::{SendError, TrySendError};
use tokio::sync::mpsc::{self, OwnedPermit};
use tokio::sync::oneshot;

use crate::http::sink::{ResponseSink, SinkError};

/// Body chunks buffered between the forwarding task and hyper.
pub const BODY_CHANNEL_CHUNKS: usize = 16;

type Head = (StatusCode, HeaderMap);
type Frame = Result<Bytes, io::Error>;
type Reserve = Pin<Box<dyn Future<Output = Result<OwnedPermit<Frame>, SendError<()>>> + Send>>;

/// Primary sink for one proxied response.
pub struct ClientSink {
    headers: HeaderMap,
    head_tx: Option<oneshot::Sender<Head>>,
    body_tx: mpsc::Sender<Frame>,
    permit: Option<OwnedPermit<Frame>>,
    reserving: Option<Reserve>,
}

/// The handler side of a [`ClientSink`].
#[derive(Debug)]
pub struct PendingResponse {
    head_rx: oneshot::Receiver<Head>,
    body_rx: mpsc::Receiver<Frame>,
}

/// Create a connected sink / pending response pair.
pub fn client_channel() -> (ClientSink, PendingResponse) {
    let (head_tx, head_rx) = oneshot::channel();
    let (body_tx, body_rx) = mpsc::channel(BODY_CHANNEL_CHUNKS);
    (
        ClientSink {
            headers: HeaderMap::new(),
            head_tx: Some(head_tx),
            body_tx,
            permit: None,
            reserving: None,
        },
        PendingResponse { head_rx, body_rx },
    )
}

impl ClientSink {
    /// Queue one frame, using a reserved slot when `poll_ready` obtained one.
    fn send_frame(&mut self, frame: Frame) -> Result<(), SinkError> {
        if let Some(permit) = self.permit.take() {
            permit.send(frame);
            return Ok(());
        }
        self.body_tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => SinkError::Full,
            TrySendError::Closed(_) => SinkError::ClientGone,
        })
    }
}

fn reserve_slot(body_tx: &mpsc::Sender<Frame>) -> Reserve {
    Box::pin(body_tx.clone().reserve_owned())
}

impl fmt::Debug for ClientSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSink")
            .field("head_written", &self.head_tx.is_none())
            .field("slot_reserved", &self.permit.is_some())
            .finish_non_exhaustive()
    }
}

impl ResponseSink for ClientSink {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_head(&mut self, status: StatusCode) {
        let Some(head_tx) = self.head_tx.take() else {
            return;
        };
        let headers = std::mem::take(&mut self.headers);
        if head_tx.send((status, headers)).is_err() {
            tracing::debug!(status = %status, "Client went away before response head");
        }
    }

    fn write_body(&mut self, data: &[u8]) -> Result<usize, SinkError> {
        self.write_head(StatusCode::OK);
        if data.is_empty() {
            return Ok(0);
        }
        self.send_frame(Ok(Bytes::copy_from_slice(data)))?;
        Ok(data.len())
    }

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), SinkError>> {
        if self.permit.is_some() {
            return Poll::Ready(Ok(()));
        }
        let body_tx = &self.body_tx;
        let reserving = self.reserving.get_or_insert_with(|| reserve_slot(body_tx));
        let reserved = ready!(reserving.as_mut().poll(cx));
        self.reserving = None;

        match reserved {
            Ok(permit) => {
                self.permit = Some(permit);
                Poll::Ready(Ok(()))
            }
            Err(_) => Poll::Ready(Err(SinkError::ClientGone)),
        }
    }

    fn abort(&mut self) {
        self.write_head(StatusCode::BAD_GATEWAY);
        let frame = Err(io::Error::other("upstream body interrupted"));
        if self.send_frame(frame).is_err() {
            tracing::debug!("Could not signal body error to client");
        }
    }
}

impl PendingResponse {
    /// Wait for the head and build a response streaming the rest of the body.
    ///
    /// If the sink is dropped without a head, the forwarding task died and
    /// the client gets `502 Bad Gateway`. An error frame fails the body so
    /// hyper drops the connection instead of ending the message cleanly.
    pub async fn into_response(self) -> Response {
        let Ok((status, headers)) = self.head_rx.await else {
            tracing::error!("Response sink dropped without writing a response");
            return (StatusCode::BAD_GATEWAY, "Upstream response was not produced").into_response();
        };

        let stream = futures_util::stream::unfold(self.body_rx, |mut rx| async move {
            rx.recv().await.map(|frame| (frame, rx))
        });

        let mut response = Response::new(Body::from_stream(stream));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::sink::ready as sink_ready;
    use axum::http::HeaderValue;
    use futures_util::StreamExt;
    use std::time::Duration;

    #[tokio::test]
    async fn test_head_and_body_reach_response() {
        let (mut sink, pending) = client_channel();
        sink.headers_mut()
            .insert("content-type", HeaderValue::from_static("text/plain"));
        sink.write_head(StatusCode::ACCEPTED);
        sink.write_body(b"part one, ").unwrap();
        sink.write_body(b"part two").unwrap();
        drop(sink);

        let response = pending.into_response().await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers()["content-type"], "text/plain");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"part one, part two");
    }

    #[tokio::test]
    async fn test_write_after_client_gone_fails() {
        let (mut sink, pending) = client_channel();
        drop(pending);

        sink.write_head(StatusCode::OK);
        assert_eq!(sink.write_body(b"lost"), Err(SinkError::ClientGone));
    }

    #[tokio::test]
    async fn test_dropped_sink_without_head_is_bad_gateway() {
        let (sink, pending) = client_channel();
        drop(sink);

        let response = pending.into_response().await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_stalled_client_holds_back_writer() {
        let (mut sink, pending) = client_channel();
        sink.write_head(StatusCode::OK);
        for _ in 0..BODY_CHANNEL_CHUNKS {
            sink_ready(&mut sink).await.unwrap();
            sink.write_body(b"chunk").unwrap();
        }

        let stalled = tokio::time::timeout(Duration::from_millis(50), sink_ready(&mut sink)).await;
        assert!(stalled.is_err());
        assert_eq!(sink.write_body(b"chunk"), Err(SinkError::Full));

        // Draining one frame frees exactly one slot.
        let response = pending.into_response().await;
        let mut body = response.into_body().into_data_stream();
        assert_eq!(&body.next().await.unwrap().unwrap()[..], b"chunk");

        tokio::time::timeout(Duration::from_secs(1), sink_ready(&mut sink))
            .await
            .expect("slot freed after read")
            .unwrap();
        assert_eq!(sink.write_body(b"chunk"), Ok(5));
    }

    #[tokio::test]
    async fn test_ready_reports_client_gone() {
        let (mut sink, pending) = client_channel();
        drop(pending);

        assert_eq!(sink_ready(&mut sink).await, Err(SinkError::ClientGone));
    }

    #[tokio::test]
    async fn test_abort_fails_response_body() {
        let (mut sink, pending) = client_channel();
        sink.write_head(StatusCode::OK);
        sink.write_body(b"partial").unwrap();
        sink.abort();
        drop(sink);

        let response = pending.into_response().await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(axum::body::to_bytes(response.into_body(), usize::MAX).await.is_err());
    }
}
