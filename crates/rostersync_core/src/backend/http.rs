//! Blocking HTTP plumbing shared by the remote backends.

use crate::error::{RosterError, RosterResult};
use reqwest::blocking::{Client, Response};
use reqwest::{StatusCode, Url};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ERROR_BODY_CHARS: usize = 200;

pub(crate) fn build_client(target: &str) -> RosterResult<Client> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|err| {
            RosterError::transient(target, format!("failed to build HTTP client: {err}"))
        })
}

pub(crate) fn send_failed(target: &str, err: &reqwest::Error) -> RosterError {
    RosterError::transient(target, format!("request failed: {err}"))
}

/// Turns a non-success response into `TransientIo`, keeping a short body excerpt.
pub(crate) fn unexpected_status(target: &str, status: StatusCode, body: &str) -> RosterError {
    let excerpt: String = body
        .replace(['\n', '\r'], " ")
        .chars()
        .take(MAX_ERROR_BODY_CHARS)
        .collect();
    RosterError::transient(target, format!("unexpected status {status}: {}", excerpt.trim()))
}

pub(crate) fn read_body(target: &str, response: Response) -> RosterResult<Vec<u8>> {
    response
        .bytes()
        .map(|bytes| bytes.to_vec())
        .map_err(|err| {
            RosterError::transient(target, format!("failed to read response body: {err}"))
        })
}

/// Normalizes a base URL: adds `http://` when no scheme is given, drops trailing `/`.
pub(crate) fn normalize_base_url(raw: &str) -> RosterResult<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(RosterError::validation("endpoint cannot be empty"));
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("http://{trimmed}"))
    }
}

/// Appends `segments` to `base`, percent-encoding each one.
///
/// A segment is never split, so `?`, `#` or `%` inside a key stay part of
/// the path.
pub(crate) fn segment_url<'a>(
    base: &str,
    segments: impl IntoIterator<Item = &'a str>,
) -> RosterResult<Url> {
    let mut url = Url::parse(base)
        .map_err(|err| RosterError::validation(format!("invalid endpoint `{base}`: {err}")))?;
    url.path_segments_mut()
        .map_err(|()| RosterError::validation(format!("endpoint `{base}` cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Splits a slash-separated key into path segments.
pub(crate) fn key_segments(key: &str) -> impl Iterator<Item = &str> {
    key.trim_start_matches('/').split('/')
}
