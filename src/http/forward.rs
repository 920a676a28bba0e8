//! Single-host HTTP forwarding.
//!
//! # Responsibilities
//! - Rewrite the inbound URI onto the forward target
//! - Strip hop-by-hop headers in both directions
//! - Stream the upstream response into the sink chunk by chunk
//!
//! # Design Decisions
//! - `Host` is rewritten to the target authority so name-based upstreams
//!   route the request to the right site
//! - Each chunk waits for sink readiness, so upstream reads follow the
//!   client's pace
//! - A body error mid-stream aborts the sink rather than ending it cleanly
//! - Connect or protocol failures become `502`, a missed deadline `504`
//! - Forwarding stops as soon as the primary sink reports the client gone

use std::time::Duration;

use axum::body::Body;
use axum::http::uri::{Authority, Scheme};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request, StatusCode, Uri};
use futures_util::StreamExt;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use thiserror::Error;

use crate::http::sink::{copy_headers, ready, ResponseSink};
use crate::pipeline::ForwardHandler;

/// Headers meaningful only for a single transport-level connection.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "proxy-connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid forward URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Reverse proxy to one upstream origin.
#[derive(Clone)]
pub struct HttpForwarder {
    client: Client<HttpConnector, Body>,
    scheme: Scheme,
    authority: Authority,
    host_header: HeaderValue,
    base_path: String,
    base_query: Option<String>,
    timeout: Duration,
}

impl HttpForwarder {
    /// Forwarder for an absolute `http://host[:port][/path]` target.
    pub fn new(target: &str, timeout: Duration) -> Result<Self, ForwardError> {
        let invalid = |reason: &str| ForwardError::InvalidUrl {
            url: target.to_string(),
            reason: reason.to_string(),
        };

        let parsed = url::Url::parse(target).map_err(|e| invalid(&e.to_string()))?;
        if parsed.scheme() != "http" {
            return Err(invalid("only http targets are supported"));
        }
        let host = parsed.host_str().ok_or_else(|| invalid("missing host"))?;
        let authority = match parsed.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let authority: Authority = authority.parse().map_err(|_| invalid("bad authority"))?;
        let host_header =
            HeaderValue::from_str(authority.as_str()).map_err(|_| invalid("bad authority"))?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self {
            client,
            scheme: Scheme::HTTP,
            authority,
            host_header,
            base_path: parsed.path().trim_end_matches('/').to_string(),
            base_query: parsed.query().filter(|q| !q.is_empty()).map(str::to_string),
            timeout,
        })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// The inbound URI re-targeted at the upstream origin.
    fn upstream_uri(&self, original: &Uri) -> Result<Uri, axum::http::Error> {
        let path = if self.base_path.is_empty() {
            original.path().to_string()
        } else {
            format!("{}/{}", self.base_path, original.path().trim_start_matches('/'))
        };

        let query = match (self.base_query.as_deref(), original.query()) {
            (Some(base), Some(own)) => Some(format!("{}&{}", base, own)),
            (Some(base), None) => Some(base.to_string()),
            (None, own) => own.map(str::to_string),
        };

        let path_and_query = match query {
            Some(q) => format!("{}?{}", path, q),
            None => path,
        };

        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
    }
}

impl ForwardHandler for HttpForwarder {
    async fn serve(&self, sink: &mut dyn ResponseSink, request: Request<Body>) {
        let (mut parts, body) = request.into_parts();
        let method = parts.method.clone();
        let path = parts.uri.path().to_string();

        parts.uri = match self.upstream_uri(&parts.uri) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(error = %e, path = %path, "Cannot build upstream URI");
                write_error(sink, StatusCode::BAD_GATEWAY, "Invalid upstream URI");
                return;
            }
        };
        strip_hop_by_hop(&mut parts.headers);
        parts.headers.insert(header::HOST, self.host_header.clone());

        let upstream = Request::from_parts(parts, body);
        let response = match tokio::time::timeout(self.timeout, self.client.request(upstream)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::warn!(method = %method, path = %path, error = %e, "Upstream error");
                write_error(sink, StatusCode::BAD_GATEWAY, "Upstream request failed");
                return;
            }
            Err(_) => {
                tracing::warn!(
                    method = %method,
                    path = %path,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Upstream timed out"
                );
                write_error(sink, StatusCode::GATEWAY_TIMEOUT, "Upstream request timed out");
                return;
            }
        };

        let (parts, incoming) = response.into_parts();
        copy_headers(&parts.headers, sink.headers_mut());
        strip_hop_by_hop(sink.headers_mut());
        sink.write_head(parts.status);

        let mut stream = Body::new(incoming).into_data_stream();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => {
                    let written = match ready(sink).await {
                        Ok(()) => sink.write_body(&bytes),
                        Err(e) => Err(e),
                    };
                    if let Err(e) = written {
                        tracing::debug!(path = %path, error = %e, "Client stopped reading");
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "Upstream body interrupted");
                    sink.abort();
                    break;
                }
            }
        }
    }
}

fn write_error(sink: &mut dyn ResponseSink, status: StatusCode, message: &str) {
    sink.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    sink.write_head(status);
    let _ = sink.write_body(message.as_bytes());
}

/// Remove standard hop-by-hop headers and any named in `Connection`.
pub(crate) fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}
