//! Object-store backend: one object per kind in a named bucket.

use super::http::{
    build_client, key_segments, normalize_base_url, read_body, segment_url, send_failed,
    unexpected_status,
};
use super::PersistenceBackend;
use crate::config::BackendKind;
use crate::error::RosterResult;
use crate::logging::LogSink;
use crate::model::EntityKind;
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};

/// Minimal object API consumed by `ObjectStoreBackend`.
pub trait ObjectStoreClient {
    /// Object bytes, or `None` when the key does not exist.
    ///
    /// A missing bucket is a configuration failure, not a missing key.
    fn get_object(&self, bucket: &str, key: &str) -> RosterResult<Option<Vec<u8>>>;

    fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> RosterResult<()>;
}

#[derive(Debug)]
pub struct ObjectStoreBackend<C> {
    client: C,
    bucket: String,
    user_key: String,
    group_key: String,
    log: LogSink,
}

impl<C: ObjectStoreClient> ObjectStoreBackend<C> {
    /// Objects are `<prefix><user_object>` and `<prefix><group_object>` in `bucket`.
    pub fn new(
        client: C,
        bucket: &str,
        prefix: &str,
        user_object: &str,
        group_object: &str,
        log: LogSink,
    ) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            user_key: format!("{prefix}{user_object}"),
            group_key: format!("{prefix}{group_object}"),
            log,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::User => &self.user_key,
            EntityKind::Group => &self.group_key,
        }
    }
}

impl<C: ObjectStoreClient> PersistenceBackend for ObjectStoreBackend<C> {
    fn backend_kind(&self) -> BackendKind {
        BackendKind::ObjectStore
    }

    fn location(&self, kind: EntityKind) -> String {
        format!("{}/{}", self.bucket, self.key(kind))
    }

    fn log_sink(&self) -> &LogSink {
        &self.log
    }

    fn read_snapshot(&self, kind: EntityKind) -> RosterResult<Option<Vec<u8>>> {
        self.client.get_object(&self.bucket, self.key(kind))
    }

    fn write_snapshot(&self, kind: EntityKind, bytes: &[u8]) -> RosterResult<()> {
        self.client.put_object(&self.bucket, self.key(kind), bytes)
    }
}

/// Path-style S3-compatible REST client (`{endpoint}/{bucket}/{key}`).
///
/// Sends an optional bearer token. Signature-based auth schemes are left to
/// a fronting proxy or a custom `ObjectStoreClient`.
#[derive(Debug)]
pub struct HttpObjectStoreClient {
    endpoint: String,
    token: Option<String>,
    http: Client,
}

impl HttpObjectStoreClient {
    pub fn new(endpoint: &str, token: Option<String>) -> RosterResult<Self> {
        let endpoint = normalize_base_url(endpoint)?;
        segment_url(&endpoint, [])?;
        let http = build_client(&endpoint)?;
        Ok(Self {
            endpoint,
            token,
            http,
        })
    }

    /// `{endpoint}/{bucket}/{key}` with every segment percent-encoded.
    pub fn object_url(&self, bucket: &str, key: &str) -> RosterResult<Url> {
        segment_url(
            &self.endpoint,
            std::iter::once(bucket).chain(key_segments(key)),
        )
    }
}

impl ObjectStoreClient for HttpObjectStoreClient {
    fn get_object(&self, bucket: &str, key: &str) -> RosterResult<Option<Vec<u8>>> {
        let target = format!("{bucket}/{key}");
        let mut request = self.http.get(self.object_url(bucket, key)?);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().map_err(|err| send_failed(&target, &err))?;

        let status = response.status();
        if status.is_success() {
            return read_body(&target, response).map(Some);
        }
        let body = response.text().unwrap_or_default();
        if status == StatusCode::NOT_FOUND && !body.contains("NoSuchBucket") {
            return Ok(None);
        }
        Err(unexpected_status(&target, status, &body))
    }

    fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> RosterResult<()> {
        let target = format!("{bucket}/{key}");
        let mut request = self
            .http
            .put(self.object_url(bucket, key)?)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_vec());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().map_err(|err| send_failed(&target, &err))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().unwrap_or_default();
        Err(unexpected_status(&target, status, &text))
    }
}
