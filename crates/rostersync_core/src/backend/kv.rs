//! Distributed key-value backend: one key per kind under a namespace.

use super::http::{
    build_client, key_segments, normalize_base_url, read_body, segment_url, send_failed,
    unexpected_status,
};
use super::PersistenceBackend;
use crate::config::BackendKind;
use crate::error::{RosterError, RosterResult};
use crate::logging::LogSink;
use crate::model::EntityKind;
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};

/// Consul's documented default agent address.
pub const DEFAULT_CONSUL_ADDRESS: &str = "127.0.0.1:8500";
const CONSUL_ADDRESS_ENV: &str = "CONSUL_HTTP_ADDR";
const CONSUL_TOKEN_ENV: &str = "CONSUL_HTTP_TOKEN";
const CONSUL_TOKEN_HEADER: &str = "X-Consul-Token";

/// Read-after-write consistent get/put consumed by `KeyValueBackend`.
pub trait KvClient {
    /// Value bytes, or `None` when the key does not exist.
    fn get(&self, key: &str) -> RosterResult<Option<Vec<u8>>>;

    fn put(&self, key: &str, value: &[u8]) -> RosterResult<()>;
}

#[derive(Debug)]
pub struct KeyValueBackend<C> {
    client: C,
    user_key: String,
    group_key: String,
    log: LogSink,
}

impl<C: KvClient> KeyValueBackend<C> {
    /// Keys are `<namespace>/<user_object>` and `<namespace>/<group_object>`.
    pub fn new(
        client: C,
        namespace: &str,
        user_object: &str,
        group_object: &str,
        log: LogSink,
    ) -> Self {
        let namespace = namespace.trim_end_matches('/');
        Self {
            client,
            user_key: format!("{namespace}/{user_object}"),
            group_key: format!("{namespace}/{group_object}"),
            log,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn key(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::User => &self.user_key,
            EntityKind::Group => &self.group_key,
        }
    }
}

impl<C: KvClient> PersistenceBackend for KeyValueBackend<C> {
    fn backend_kind(&self) -> BackendKind {
        BackendKind::KeyValue
    }

    fn location(&self, kind: EntityKind) -> String {
        self.key(kind).to_string()
    }

    fn log_sink(&self) -> &LogSink {
        &self.log
    }

    fn read_snapshot(&self, kind: EntityKind) -> RosterResult<Option<Vec<u8>>> {
        self.client.get(self.key(kind))
    }

    fn write_snapshot(&self, kind: EntityKind, bytes: &[u8]) -> RosterResult<()> {
        self.client.put(self.key(kind), bytes)
    }
}

/// Consul agent HTTP KV client (`/v1/kv/<key>`).
#[derive(Debug)]
pub struct ConsulKvClient {
    address: String,
    token: Option<String>,
    http: Client,
}

impl ConsulKvClient {
    pub fn new(address: &str, token: Option<String>) -> RosterResult<Self> {
        let address = normalize_base_url(address)?;
        segment_url(&address, [])?;
        let http = build_client(&address)?;
        Ok(Self {
            address,
            token,
            http,
        })
    }

    /// Explicit values win; otherwise `CONSUL_HTTP_ADDR` / `CONSUL_HTTP_TOKEN`,
    /// then the default agent address.
    pub fn from_env_defaults(address: Option<&str>, token: Option<String>) -> RosterResult<Self> {
        let address = address
            .map(str::to_string)
            .or_else(|| std::env::var(CONSUL_ADDRESS_ENV).ok())
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONSUL_ADDRESS.to_string());
        let token = token
            .or_else(|| std::env::var(CONSUL_TOKEN_ENV).ok())
            .filter(|value| !value.trim().is_empty());
        Self::new(&address, token)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// `{address}/v1/kv/{key}` with every segment percent-encoded.
    pub fn key_url(&self, key: &str) -> RosterResult<Url> {
        segment_url(&self.address, ["v1", "kv"].into_iter().chain(key_segments(key)))
    }

    fn with_token(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        match &self.token {
            Some(token) => request.header(CONSUL_TOKEN_HEADER, token),
            None => request,
        }
    }
}

impl KvClient for ConsulKvClient {
    fn get(&self, key: &str) -> RosterResult<Option<Vec<u8>>> {
        let mut url = self.key_url(key)?;
        url.set_query(Some("raw"));
        let request = self.http.get(url);
        let response = self
            .with_token(request)
            .send()
            .map_err(|err| send_failed(key, &err))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => read_body(key, response).map(Some),
            status => {
                let body = response.text().unwrap_or_default();
                Err(unexpected_status(key, status, &body))
            }
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> RosterResult<()> {
        let request = self.http.put(self.key_url(key)?).body(value.to_vec());
        let response = self
            .with_token(request)
            .send()
            .map_err(|err| send_failed(key, &err))?;

        let status = response.status();
        let body = response.text().unwrap_or_default();
        if !status.is_success() {
            return Err(unexpected_status(key, status, &body));
        }
        // Consul answers `true`/`false`; `false` means the write was not applied.
        if body.trim() != "true" {
            return Err(RosterError::transient(
                key,
                format!("write not applied: {}", body.trim()),
            ));
        }
        Ok(())
    }
}
