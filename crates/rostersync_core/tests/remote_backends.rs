mod support;

use rostersync_core::backend::{
    ConsulKvClient, HttpObjectStoreClient, KeyValueBackend, KvClient, ObjectStoreBackend,
    ObjectStoreClient,
};
use rostersync_core::{EntityKind, LogSink, PersistenceBackend, RosterError, RosterStore};
use support::{header, unreachable_base_url, HttpStub};

const CONSUL_USERS: &str = "/v1/kv/rostersync/users";
const CONSUL_GROUPS: &str = "/v1/kv/rostersync/groups";
const OBJECT_USERS: &str = "/identity-sync/rostersync-Users.json";
const OBJECT_GROUPS: &str = "/identity-sync/rostersync-Groups.json";

fn consul_backend(base_url: &str, token: Option<&str>) -> KeyValueBackend<ConsulKvClient> {
    let client = ConsulKvClient::new(base_url, token.map(str::to_string)).unwrap();
    KeyValueBackend::new(client, "rostersync", "users", "groups", LogSink::discard())
}

fn object_backend(base_url: &str) -> ObjectStoreBackend<HttpObjectStoreClient> {
    let client = HttpObjectStoreClient::new(base_url, Some("s3cr3t".to_string())).unwrap();
    ObjectStoreBackend::new(
        client,
        "identity-sync",
        "rostersync-",
        "Users.json",
        "Groups.json",
        LogSink::discard(),
    )
}

#[test]
fn consul_missing_keys_load_as_empty() {
    let stub = HttpStub::start();
    stub.respond_once("GET", CONSUL_USERS, 404, "");
    stub.respond_once("GET", CONSUL_GROUPS, 404, "");
    let backend = consul_backend(&stub.uri(), None);
    let mut roster = RosterStore::new();

    backend.load(&mut roster).unwrap();

    assert!(roster.is_empty(EntityKind::User));
    assert!(roster.is_empty(EntityKind::Group));
    let requests = stub.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|request| request.url.query() == Some("raw")));
}

#[test]
fn consul_values_hydrate_roster_and_send_token() {
    let stub = HttpStub::start();
    stub.respond_once("GET", CONSUL_USERS, 200, r#"{"alice@example.com": true}"#);
    stub.respond_once("GET", CONSUL_GROUPS, 200, r#"{"admins": true, "ops": true}"#);
    let backend = consul_backend(&stub.uri(), Some("acl-token"));
    let mut roster = RosterStore::new();

    backend.load(&mut roster).unwrap();

    assert!(roster.contains(EntityKind::User, "alice@example.com"));
    assert_eq!(roster.len(EntityKind::Group), 2);
    let requests = stub.requests();
    assert_eq!(header(&requests[0], "x-consul-token").as_deref(), Some("acl-token"));
}

#[test]
fn consul_three_outcomes_are_distinguishable() {
    let missing = HttpStub::start();
    missing.respond_once("GET", CONSUL_USERS, 404, "");
    let found = consul_backend(&missing.uri(), None)
        .load_kind(EntityKind::User)
        .unwrap();
    assert!(found.is_none());

    let garbled = HttpStub::start();
    garbled.respond_once("GET", CONSUL_USERS, 200, "not json");
    let corrupt = consul_backend(&garbled.uri(), None)
        .load_kind(EntityKind::User)
        .unwrap_err();
    assert!(matches!(corrupt, RosterError::CorruptState { .. }));

    let offline = consul_backend(&unreachable_base_url(), None)
        .load_kind(EntityKind::User)
        .unwrap_err();
    assert!(matches!(offline, RosterError::TransientIo { .. }));
}

#[test]
fn consul_forbidden_is_transient() {
    let stub = HttpStub::start();
    stub.respond_once("GET", CONSUL_GROUPS, 403, "Permission denied");

    let err = consul_backend(&stub.uri(), None)
        .load_kind(EntityKind::Group)
        .unwrap_err();

    assert!(err.is_transient());
    assert!(err.to_string().contains("403"));
}

#[test]
fn consul_put_writes_snapshot_and_checks_acknowledgement() {
    let stub = HttpStub::start();
    stub.respond_once("PUT", CONSUL_USERS, 200, "true");
    stub.respond_once("PUT", CONSUL_USERS, 200, "false");
    let client = ConsulKvClient::new(&stub.uri(), None).unwrap();

    client.put("rostersync/users", b"{}\n").unwrap();
    let rejected = client.put("rostersync/users", b"{}\n").unwrap_err();
    assert!(rejected.is_transient());

    let requests = stub.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].method.as_str(), "PUT");
    assert_eq!(requests[0].body, b"{}\n");
}

#[test]
fn consul_keys_with_reserved_characters_stay_in_the_path() {
    let stub = HttpStub::start();
    stub.respond_once("PUT", "/v1/kv/sync%3Fv=2/users", 200, "true");
    let client = ConsulKvClient::new(&stub.uri(), None).unwrap();

    client.put("sync?v=2/users", b"{}\n").unwrap();

    let requests = stub.requests();
    assert_eq!(requests[0].url.path(), "/v1/kv/sync%3Fv=2/users");
    assert_eq!(requests[0].url.query(), None);
}

#[test]
fn object_store_missing_key_is_empty_but_missing_bucket_is_not() {
    let stub = HttpStub::start();
    stub.respond_once("GET", OBJECT_USERS, 404, "<Error><Code>NoSuchKey</Code></Error>");
    stub.respond_once("GET", OBJECT_GROUPS, 404, "<Error><Code>NoSuchBucket</Code></Error>");
    let backend = object_backend(&stub.uri());

    assert!(backend.load_kind(EntityKind::User).unwrap().is_none());
    let err = backend.load_kind(EntityKind::Group).unwrap_err();
    assert!(err.is_transient());

    let requests = stub.requests();
    assert_eq!(header(&requests[0], "authorization").as_deref(), Some("Bearer s3cr3t"));
}

#[test]
fn object_store_store_then_load_round_trips() {
    let mut roster = RosterStore::new();
    roster.add_name(EntityKind::User, "alice@example.com");
    roster.add_name(EntityKind::Group, "admins");

    let writes = HttpStub::start();
    writes.respond_once("PUT", OBJECT_USERS, 200, "");
    writes.respond_once("PUT", OBJECT_GROUPS, 200, "");
    object_backend(&writes.uri()).store(&roster).unwrap();
    let stored = writes.requests();
    assert_eq!(stored.len(), 2);
    assert_eq!(
        header(&stored[0], "content-type").as_deref(),
        Some("application/json")
    );

    let user_body = String::from_utf8(stored[0].body.clone()).unwrap();
    let group_body = String::from_utf8(stored[1].body.clone()).unwrap();
    let reads = HttpStub::start();
    reads.respond_once("GET", OBJECT_USERS, 200, &user_body);
    reads.respond_once("GET", OBJECT_GROUPS, 200, &group_body);
    let mut reloaded = RosterStore::new();
    object_backend(&reads.uri()).load(&mut reloaded).unwrap();

    assert_eq!(reloaded, roster);
}

#[test]
fn object_store_unreachable_endpoint_is_transient() {
    let client = HttpObjectStoreClient::new(&unreachable_base_url(), None).unwrap();
    let err = client
        .put_object("identity-sync", "rostersync-Users.json", b"{}")
        .unwrap_err();
    assert!(matches!(err, RosterError::TransientIo { .. }));
}
