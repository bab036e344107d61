#![allow(dead_code)]

use log::{Log, Metadata, Record};
use rostersync_core::backend::KvClient;
use rostersync_core::{
    DownstreamLookup, DownstreamMutate, DownstreamRecord, EntityKind, RosterError, RosterResult,
};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::net::TcpListener;
use std::rc::Rc;
use std::sync::Mutex;
use tokio::runtime::Runtime;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Shared, ordered record of side effects across fakes.
pub type Journal = Rc<RefCell<Vec<String>>>;

pub fn journal() -> Journal {
    Rc::new(RefCell::new(Vec::new()))
}

// ---------------------------------------------------------------------------
// Log capture

#[derive(Default)]
pub struct CaptureLog {
    lines: Mutex<Vec<String>>,
}

impl CaptureLog {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

impl Log for CaptureLog {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        self.lines
            .lock()
            .unwrap()
            .push(format!("{} {}", record.level(), record.args()));
    }

    fn flush(&self) {}
}

// ---------------------------------------------------------------------------
// Downstream fake

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub name: String,
    pub id: String,
}

impl Entity {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            id: format!("id-{name}"),
        }
    }
}

impl DownstreamRecord for Entity {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Directory where `present` entities answer exact lookups and only
/// `listed` ones show up in the capped listing call.
pub struct FakeDirectory {
    present: RefCell<BTreeSet<(EntityKind, String)>>,
    listed: RefCell<BTreeSet<(EntityKind, String)>>,
    broken_lookups: RefCell<BTreeSet<String>>,
    listing_down: RefCell<bool>,
    mutations_down: RefCell<bool>,
    journal: Journal,
}

impl FakeDirectory {
    pub fn new(journal: Journal) -> Self {
        Self {
            present: RefCell::new(BTreeSet::new()),
            listed: RefCell::new(BTreeSet::new()),
            broken_lookups: RefCell::new(BTreeSet::new()),
            listing_down: RefCell::new(false),
            mutations_down: RefCell::new(false),
            journal,
        }
    }

    /// Exists downstream but is missing from the capped listing.
    pub fn with_hidden(self, kind: EntityKind, names: &[&str]) -> Self {
        for name in names {
            self.present.borrow_mut().insert((kind, name.to_string()));
        }
        self
    }

    /// Exists downstream and appears in the listing.
    pub fn with_listed(self, kind: EntityKind, names: &[&str]) -> Self {
        for name in names {
            self.present.borrow_mut().insert((kind, name.to_string()));
            self.listed.borrow_mut().insert((kind, name.to_string()));
        }
        self
    }

    pub fn break_lookup(&self, name: &str) {
        self.broken_lookups.borrow_mut().insert(name.to_string());
    }

    pub fn break_listing(&self) {
        *self.listing_down.borrow_mut() = true;
    }

    pub fn break_mutations(&self) {
        *self.mutations_down.borrow_mut() = true;
    }

    pub fn exists(&self, kind: EntityKind, name: &str) -> bool {
        self.present.borrow().contains(&(kind, name.to_string()))
    }

    fn record(&self, entry: String) {
        self.journal.borrow_mut().push(entry);
    }
}

impl DownstreamLookup for FakeDirectory {
    type Record = Entity;

    fn find_by_name(&self, kind: EntityKind, name: &str) -> RosterResult<Entity> {
        self.record(format!("find {kind} {name}"));
        if self.broken_lookups.borrow().contains(name) {
            return Err(RosterError::downstream("503 service unavailable"));
        }
        if self.exists(kind, name) {
            Ok(Entity::named(name))
        } else {
            Err(RosterError::not_found(kind, name))
        }
    }

    fn list_all(&self, kind: EntityKind) -> RosterResult<Vec<Entity>> {
        self.record(format!("list {kind}"));
        if *self.listing_down.borrow() {
            return Err(RosterError::transient("directory", "connection reset"));
        }
        Ok(self
            .listed
            .borrow()
            .iter()
            .filter(|(listed_kind, _)| *listed_kind == kind)
            .map(|(_, name)| Entity::named(name))
            .collect())
    }
}

impl DownstreamMutate for FakeDirectory {
    fn create(&self, kind: EntityKind, record: &Entity) -> RosterResult<Entity> {
        self.record(format!("create {kind} {}", record.name));
        if *self.mutations_down.borrow() {
            return Err(RosterError::downstream("create rejected"));
        }
        self.present.borrow_mut().insert((kind, record.name.clone()));
        Ok(Entity::named(&record.name))
    }

    fn delete(&self, kind: EntityKind, name: &str) -> RosterResult<()> {
        self.record(format!("delete {kind} {name}"));
        if *self.mutations_down.borrow() {
            return Err(RosterError::downstream("delete rejected"));
        }
        self.present.borrow_mut().remove(&(kind, name.to_string()));
        self.listed.borrow_mut().remove(&(kind, name.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory key-value store

pub struct MemoryKv {
    values: RefCell<BTreeMap<String, Vec<u8>>>,
    unreachable: RefCell<bool>,
    failing_puts: RefCell<BTreeSet<String>>,
    journal: Journal,
}

impl MemoryKv {
    pub fn new(journal: Journal) -> Self {
        Self {
            values: RefCell::new(BTreeMap::new()),
            unreachable: RefCell::new(false),
            failing_puts: RefCell::new(BTreeSet::new()),
            journal,
        }
    }

    pub fn with_value(self, key: &str, value: &str) -> Self {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.as_bytes().to_vec());
        self
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.values
            .borrow()
            .get(key)
            .map(|bytes| String::from_utf8(bytes.clone()).unwrap())
    }

    pub fn names(&self, key: &str) -> BTreeSet<String> {
        let value = self.value(key).unwrap_or_else(|| "{}".to_string());
        let map: BTreeMap<String, bool> = serde_json::from_str(&value).unwrap();
        map.into_keys().collect()
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.borrow_mut() = unreachable;
    }

    pub fn fail_puts_to(&self, key: &str) {
        self.failing_puts.borrow_mut().insert(key.to_string());
    }
}

impl KvClient for MemoryKv {
    fn get(&self, key: &str) -> RosterResult<Option<Vec<u8>>> {
        if *self.unreachable.borrow() {
            return Err(RosterError::transient(key, "connection refused"));
        }
        Ok(self.values.borrow().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> RosterResult<()> {
        self.journal.borrow_mut().push(format!("put {key}"));
        if *self.unreachable.borrow() || self.failing_puts.borrow().contains(key) {
            return Err(RosterError::transient(key, "connection refused"));
        }
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// HTTP stubs

/// Wiremock server driven from synchronous tests.
///
/// The blocking clients under test must not run inside the async runtime, so
/// only mounting and inspection go through `block_on`.
pub struct HttpStub {
    server: MockServer,
    runtime: Runtime,
}

impl HttpStub {
    pub fn start() -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let server = runtime.block_on(MockServer::start());
        Self { server, runtime }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn mount(&self, mock: Mock) {
        self.runtime.block_on(mock.mount(&self.server));
    }

    /// Answers `verb path` once with `status` and `body`.
    pub fn respond_once(&self, verb: &str, route: &str, status: u16, body: &str) {
        self.mount(
            Mock::given(method(verb))
                .and(path(route))
                .respond_with(ResponseTemplate::new(status).set_body_string(body))
                .up_to_n_times(1),
        );
    }

    pub fn requests(&self) -> Vec<Request> {
        self.runtime
            .block_on(self.server.received_requests())
            .unwrap_or_default()
    }
}

pub fn header(request: &Request, name: &str) -> Option<String> {
    request
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// An address nothing listens on.
pub fn unreachable_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{address}")
}
