//! One request/response cycle and its classification

use crate::error::RequestError;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, Method, Response, StatusCode};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// Marker sent as `User-Agent` unless the caller supplies one.
pub const CLIENT_MARKER: &str = concat!("volley/", env!("CARGO_PKG_VERSION"));

/// What a response counted as.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// 200, or 405 which load generation treats the same way
    Success { size: u64, elapsed: Duration },
    /// 301 or 307 that was handed back instead of followed
    Redirect { size: u64, elapsed: Duration },
    ServerError { status: u16 },
    Unclassified { status: u16 },
}

/// Approximate wire size of a header block.
///
/// Each distinct name costs its length plus `": \r\n"` plus the length of
/// every value; the block ends with one `"\r\n"`.
pub fn estimate_header_size(headers: &HeaderMap) -> u64 {
    let mut size = "\r\n".len();
    for name in headers.keys() {
        size += name.as_str().len() + ": \r\n".len();
        size += headers
            .get_all(name)
            .iter()
            .map(|value| value.len())
            .sum::<usize>();
    }
    size as u64
}

/// Converts parsed `name:value` pairs into request headers.
///
/// Pairs the HTTP stack refuses are logged and skipped.
pub fn wire_headers(headers: &BTreeMap<String, String>) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => warn!(header = %name, "dropping header the http stack rejects"),
        }
    }
    map
}

/// Performs exactly one request against `url` and classifies the response.
///
/// `header_timeout` bounds the wait for response headers; the body read is
/// bounded only by the client's own timeout.
pub async fn do_request(
    client: &Client,
    headers: &HeaderMap,
    method: &Method,
    url: &str,
    body: Option<&Bytes>,
    header_timeout: Option<Duration>,
) -> Result<Outcome, RequestError> {
    let url = Url::parse(url).map_err(|e| RequestError::Build(format!("{url}: {e}")))?;

    let mut builder = client
        .request(method.clone(), url)
        .header(USER_AGENT, HeaderValue::from_static(CLIENT_MARKER));
    if let Some(body) = body {
        builder = builder.body(body.clone());
    }
    let mut request = builder
        .build()
        .map_err(|e| RequestError::Build(e.to_string()))?;
    for (name, value) in headers {
        request.headers_mut().insert(name.clone(), value.clone());
    }

    let start = Instant::now();
    let sent = client.execute(request);
    let response = match header_timeout {
        Some(limit) => tokio::time::timeout(limit, sent)
            .await
            .map_err(|_| RequestError::Timeout(limit))?,
        None => sent.await,
    };

    let response = match response {
        Ok(response) => response,
        // the follow policy stops on its last hop, so what remains here
        // (e.g. an unusable Location) carries no response
        Err(e) if e.is_redirect() => {
            debug!(error = %e, "redirect policy error");
            return Err(RequestError::EmptyResponse(e.to_string()));
        }
        Err(e) if e.is_builder() => return Err(RequestError::Build(e.to_string())),
        Err(e) => return Err(RequestError::Transport(e)),
    };

    let status = response.status();
    let header_size = estimate_header_size(response.headers());
    let content_length = response.content_length();
    let body_len = read_body(response).await;

    let outcome = match status {
        StatusCode::OK | StatusCode::METHOD_NOT_ALLOWED => Outcome::Success {
            size: body_len + header_size,
            elapsed: start.elapsed(),
        },
        StatusCode::MOVED_PERMANENTLY | StatusCode::TEMPORARY_REDIRECT => Outcome::Redirect {
            size: content_length.unwrap_or(0) + header_size,
            elapsed: start.elapsed(),
        },
        status if status.as_u16() >= 500 => Outcome::ServerError {
            status: status.as_u16(),
        },
        status => Outcome::Unclassified {
            status: status.as_u16(),
        },
    };
    Ok(outcome)
}

/// Drains the body and returns its length, or 0 if the read fails.
async fn read_body(response: Response) -> u64 {
    let mut stream = response.bytes_stream();
    let mut len = 0;
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => len += bytes.len() as u64,
            Err(e) => {
                warn!(error = %e, "failed to read response body");
                return 0;
            }
        }
    }
    len
}
