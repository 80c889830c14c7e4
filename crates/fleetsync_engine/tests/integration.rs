//! Integration tests for the reconciliation engine over mock endpoints.

use fleetsync_endpoint::{EndpointError, MockEndpoint, ServerEndpoint};
use fleetsync_engine::{EngineError, FleetServer, Reconciler, RunState};
use fleetsync_model::{ClientRecord, DirectoryEntry, IdentityKey, ServerHandle};
use fleetsync_store::DirectoryStore;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

fn record(raw: &str, credential: &str) -> ClientRecord {
    ClientRecord::new(raw, credential, format!("sub-{}", credential))
        .with_attribute("enable", json!(true))
}

fn reconciler(mocks: &[Arc<MockEndpoint>], store_dir: &Path) -> Reconciler {
    let store = DirectoryStore::open(store_dir, true).unwrap();
    let servers = mocks
        .iter()
        .map(|mock| {
            FleetServer::new(
                mock.name().to_string(),
                1,
                Arc::clone(mock) as Arc<dyn ServerEndpoint>,
            )
        })
        .collect();
    Reconciler::new(servers, store)
}

fn entry(label: &str, contact: &str, handles: &[(&str, &str)]) -> DirectoryEntry {
    let map: BTreeMap<String, ServerHandle> = handles
        .iter()
        .map(|(server, cred)| {
            (
                server.to_string(),
                ServerHandle::new(*cred, format!("sub-{}", cred)),
            )
        })
        .collect();
    DirectoryEntry::new(&IdentityKey::new(label, contact), map)
}

#[test]
fn single_server_client_replicates_everywhere() {
    // alice exists on berlin only; berlin and paris are reachable and the
    // store is empty.
    let berlin = Arc::new(MockEndpoint::with_clients(
        "berlin",
        vec![record("alice|@alice", "c1")],
    ));
    let paris = Arc::new(MockEndpoint::new("paris"));
    let dir = tempfile::tempdir().unwrap();
    let engine = reconciler(&[Arc::clone(&berlin), Arc::clone(&paris)], dir.path());

    let report = engine.reconcile().unwrap();

    // paris gained a client with the same identity and the template's IDs.
    let pushed = paris.clients();
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0].raw_identity, "alice|@alice");
    assert_eq!(pushed[0].credential_id, "c1");

    // The directory records berlin only; paris's copy was pushed this run
    // but not observed, so its handle appears on the next run.
    let directory = engine.directory().unwrap();
    assert_eq!(directory.len(), 1);
    assert_eq!(directory[0].label, "alice");
    assert_eq!(directory[0].contact, "@alice");
    assert_eq!(
        directory[0].handles.keys().collect::<Vec<_>>(),
        vec!["berlin"]
    );
    assert_eq!(directory[0].handles["berlin"].credential_id, "c1");

    assert_eq!(report.clients_pushed(), 1);
    assert_eq!(report.entries_created(), 1);
    assert_eq!(engine.state(), RunState::Completed);
}

#[test]
fn runs_converge_then_become_noops() {
    let berlin = Arc::new(MockEndpoint::with_clients(
        "berlin",
        vec![record("alice|@alice", "c1")],
    ));
    let paris = Arc::new(MockEndpoint::new("paris"));
    let dir = tempfile::tempdir().unwrap();
    let engine = reconciler(&[Arc::clone(&berlin), Arc::clone(&paris)], dir.path());

    // Run 1: pushes alice to paris, creates the entry with berlin's handle.
    let first = engine.reconcile().unwrap();
    assert_eq!(first.clients_pushed(), 1);
    assert_eq!(first.entries_created(), 1);

    // Run 2: no pushes left; the entry picks up paris's now-observed copy.
    let second = engine.reconcile().unwrap();
    assert_eq!(second.clients_pushed(), 0);
    assert_eq!(second.entries_updated(), 1);

    // Run 3: the fleet and the directory agree; nothing happens at all.
    let third = engine.reconcile().unwrap();
    assert!(third.is_noop());
}

#[test]
fn converged_fleet_is_a_noop_immediately() {
    let berlin = Arc::new(MockEndpoint::with_clients(
        "berlin",
        vec![record("alice|@alice", "c1")],
    ));
    let paris = Arc::new(MockEndpoint::with_clients(
        "paris",
        vec![record("alice|@alice", "c2")],
    ));
    let dir = tempfile::tempdir().unwrap();
    let engine = reconciler(&[Arc::clone(&berlin), Arc::clone(&paris)], dir.path());

    let store = engine.store();
    store
        .save_all(&[entry("alice", "@alice", &[("berlin", "c1"), ("paris", "c2")])])
        .unwrap();

    let report = engine.reconcile().unwrap();
    assert!(report.is_noop());
}

#[test]
fn convergence_across_three_servers() {
    let berlin = Arc::new(MockEndpoint::with_clients(
        "berlin",
        vec![record("alice|@alice", "c1")],
    ));
    let paris = Arc::new(MockEndpoint::with_clients("paris", vec![record("bob", "c2")]));
    let oslo = Arc::new(MockEndpoint::new("oslo"));
    let dir = tempfile::tempdir().unwrap();
    let engine = reconciler(
        &[Arc::clone(&berlin), Arc::clone(&paris), Arc::clone(&oslo)],
        dir.path(),
    );

    engine.reconcile().unwrap();

    for mock in [&berlin, &paris, &oslo] {
        let identities: Vec<IdentityKey> =
            mock.clients().iter().map(|c| c.identity_key()).collect();
        assert!(identities.contains(&IdentityKey::new("alice", "@alice")));
        assert!(identities.contains(&IdentityKey::new("bob", "")));
    }
}

#[test]
fn unreachable_server_blocks_deletion() {
    // bob is recorded on berlin and paris; berlin now reports him absent
    // and paris is unreachable. His absence is unconfirmed: no deletion.
    let berlin = Arc::new(MockEndpoint::new("berlin"));
    let paris = Arc::new(MockEndpoint::with_clients(
        "paris",
        vec![record("bob|id:42", "c9")],
    ));
    paris.set_list_error(Some(EndpointError::unreachable("connect timeout")));

    let dir = tempfile::tempdir().unwrap();
    let engine = reconciler(&[Arc::clone(&berlin), Arc::clone(&paris)], dir.path());
    engine
        .store()
        .save_all(&[entry("bob", "id:42", &[("berlin", "c8"), ("paris", "c9")])])
        .unwrap();

    let report = engine.reconcile().unwrap();
    assert_eq!(report.entries_removed(), 0);
    assert_eq!(report.servers_reachable, 1);

    let directory = engine.directory().unwrap();
    assert_eq!(directory.len(), 1);
    assert_eq!(directory[0].handles.len(), 2);

    // paris recovers: bob reappears in the aggregate (template from
    // paris) and is pushed back onto berlin.
    paris.set_list_error(None);
    let report = engine.reconcile().unwrap();
    assert_eq!(report.clients_pushed(), 1);
    assert_eq!(
        berlin.clients()[0].identity_key(),
        IdentityKey::new("bob", "id:42")
    );

    // This run observed bob on paris only; berlin's restored copy is
    // picked up (and the entry re-widened) on the following run.
    let directory = engine.directory().unwrap();
    assert_eq!(directory[0].handles.keys().collect::<Vec<_>>(), vec!["paris"]);

    let report = engine.reconcile().unwrap();
    assert_eq!(report.entries_updated(), 1);
    let directory = engine.directory().unwrap();
    assert_eq!(directory[0].handles.len(), 2);
}

#[test]
fn confirmed_absence_deletes_entry() {
    let berlin = Arc::new(MockEndpoint::new("berlin"));
    let paris = Arc::new(MockEndpoint::new("paris"));
    let dir = tempfile::tempdir().unwrap();
    let engine = reconciler(&[Arc::clone(&berlin), Arc::clone(&paris)], dir.path());
    engine
        .store()
        .save_all(&[entry("carol", "@carol", &[("berlin", "c5")])])
        .unwrap();

    // Both servers answered and neither has carol: the entry goes.
    let report = engine.reconcile().unwrap();
    assert_eq!(report.entries_removed(), 1);
    assert!(engine.directory().unwrap().is_empty());
    assert!(report
        .lines()
        .iter()
        .any(|line| line == "removed carol|@carol from the directory"));
}

#[test]
fn pushed_template_attributes_are_first_observed() {
    // alice exists on berlin and paris with divergent attributes; berlin
    // is first in configuration order, so its record is the template.
    let berlin_record = record("alice|@alice", "c1").with_attribute("totalGB", json!(5));
    let paris_record = record("alice|@alice", "c2").with_attribute("totalGB", json!(99));

    let berlin = Arc::new(MockEndpoint::with_clients("berlin", vec![berlin_record.clone()]));
    let paris = Arc::new(MockEndpoint::with_clients("paris", vec![paris_record]));
    let oslo = Arc::new(MockEndpoint::new("oslo"));

    let dir = tempfile::tempdir().unwrap();
    let engine = reconciler(
        &[Arc::clone(&berlin), Arc::clone(&paris), Arc::clone(&oslo)],
        dir.path(),
    );
    engine.reconcile().unwrap();

    let pushed = oslo.clients();
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0].attributes, berlin_record.attributes);
    assert_eq!(pushed[0].credential_id, "c1");
}

#[test]
fn failed_fetch_excludes_server_from_writes() {
    let berlin = Arc::new(MockEndpoint::with_clients(
        "berlin",
        vec![record("alice|@alice", "c1")],
    ));
    let paris = Arc::new(MockEndpoint::new("paris"));
    paris.set_list_error(Some(EndpointError::AuthFailed("bad credentials".into())));
    let oslo = Arc::new(MockEndpoint::new("oslo"));

    let dir = tempfile::tempdir().unwrap();
    let engine = reconciler(
        &[Arc::clone(&berlin), Arc::clone(&paris), Arc::clone(&oslo)],
        dir.path(),
    );

    let report = engine.reconcile().unwrap();

    // oslo received the replica; paris, excluded from the run, received
    // nothing at all.
    assert_eq!(oslo.clients().len(), 1);
    assert!(paris.pushed().is_empty());
    assert_eq!(report.servers_reachable, 2);
    assert_eq!(report.clients_pushed(), 1);
}

#[test]
fn push_failure_is_recorded_and_does_not_abort() {
    let berlin = Arc::new(MockEndpoint::with_clients(
        "berlin",
        vec![record("alice|@alice", "c1")],
    ));
    let paris = Arc::new(MockEndpoint::new("paris"));
    paris.set_upsert_error(Some(EndpointError::Api("duplicate email".into())));

    let dir = tempfile::tempdir().unwrap();
    let engine = reconciler(&[Arc::clone(&berlin), Arc::clone(&paris)], dir.path());

    let report = engine.reconcile().unwrap();
    assert_eq!(report.push_failures(), 1);
    assert_eq!(report.clients_pushed(), 0);

    // The run still completed and still created the directory entry from
    // what was actually observed.
    assert_eq!(engine.directory().unwrap().len(), 1);
    assert_eq!(engine.state(), RunState::Completed);
}

#[test]
fn no_reachable_servers_aborts_before_planning() {
    let berlin = Arc::new(MockEndpoint::new("berlin"));
    let paris = Arc::new(MockEndpoint::new("paris"));
    berlin.set_list_error(Some(EndpointError::unreachable("down")));
    paris.set_list_error(Some(EndpointError::unreachable("down")));

    let dir = tempfile::tempdir().unwrap();
    let engine = reconciler(&[Arc::clone(&berlin), Arc::clone(&paris)], dir.path());
    engine
        .store()
        .save_all(&[entry("alice", "@alice", &[("berlin", "c1")])])
        .unwrap();

    let err = engine.reconcile().unwrap_err();
    assert!(matches!(err, EngineError::NoReachableServers));
    assert_eq!(engine.state(), RunState::Error);

    // Nothing was persisted; the directory is exactly as seeded.
    assert_eq!(engine.directory().unwrap().len(), 1);
}

#[test]
fn corrupt_store_is_fatal_to_the_run() {
    let berlin = Arc::new(MockEndpoint::with_clients(
        "berlin",
        vec![record("alice|@alice", "c1")],
    ));
    let dir = tempfile::tempdir().unwrap();
    let engine = reconciler(&[Arc::clone(&berlin)], dir.path());

    std::fs::write(dir.path().join("directory.json"), b"{ not json").unwrap();

    let err = engine.reconcile().unwrap_err();
    assert!(matches!(err, EngineError::Store(_)));
    assert_eq!(engine.state(), RunState::Error);
}

#[test]
fn provisioning_records_only_confirmed_servers() {
    let berlin = Arc::new(MockEndpoint::new("berlin"));
    let paris = Arc::new(MockEndpoint::new("paris"));
    paris.set_upsert_error(Some(EndpointError::unreachable("down")));

    let dir = tempfile::tempdir().unwrap();
    let engine = reconciler(&[Arc::clone(&berlin), Arc::clone(&paris)], dir.path());

    let outcome = engine.provision("dave", "@dave").unwrap();
    assert!(outcome.succeeded_anywhere());
    assert_eq!(outcome.results.len(), 2);
    assert!(outcome.results[0].success);
    assert!(outcome.results[0].url.is_some());
    assert!(!outcome.results[1].success);

    // Only berlin is recorded; paris converges on a later run.
    let directory = engine.directory().unwrap();
    assert_eq!(directory.len(), 1);
    assert_eq!(
        directory[0].handles.keys().collect::<Vec<_>>(),
        vec!["berlin"]
    );

    // berlin's copy carries the freshly-minted credential.
    let pushed = berlin.clients();
    assert_eq!(pushed[0].raw_identity, "dave|@dave");
    assert_eq!(
        pushed[0].credential_id,
        directory[0].handles["berlin"].credential_id
    );
}

#[test]
fn provisioning_everywhere_failed_writes_nothing() {
    let berlin = Arc::new(MockEndpoint::new("berlin"));
    berlin.set_upsert_error(Some(EndpointError::Api("quota exceeded".into())));

    let dir = tempfile::tempdir().unwrap();
    let engine = reconciler(&[Arc::clone(&berlin)], dir.path());

    let outcome = engine.provision("erin", "").unwrap();
    assert!(!outcome.succeeded_anywhere());
    assert!(engine.directory().unwrap().is_empty());
}

#[test]
fn provisioned_identity_survives_reconciliation() {
    // End to end: provision on a partial fleet, then let reconciliation
    // finish the job.
    let berlin = Arc::new(MockEndpoint::new("berlin"));
    let paris = Arc::new(MockEndpoint::new("paris"));
    paris.set_upsert_error(Some(EndpointError::unreachable("down")));

    let dir = tempfile::tempdir().unwrap();
    let engine = reconciler(&[Arc::clone(&berlin), Arc::clone(&paris)], dir.path());

    engine.provision("frank", "id:7").unwrap();

    paris.set_upsert_error(None);
    let report = engine.reconcile().unwrap();
    assert_eq!(report.clients_pushed(), 1);
    assert_eq!(paris.clients()[0].identity_key(), IdentityKey::new("frank", "id:7"));

    // Next run observes paris's copy and completes the entry.
    engine.reconcile().unwrap();
    assert_eq!(engine.directory().unwrap()[0].handles.len(), 2);
}
