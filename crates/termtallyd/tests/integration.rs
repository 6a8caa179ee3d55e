//! Integration tests for termtallyd
//!
//! These tests verify the end-to-end behavior of the daemon's components.

use std::sync::Arc;
use std::time::Duration;
use termtally_config::{HostConfig, MonitorConfig, ReaderFormat, parse_config};
use termtally_core::Scheduler;
use termtally_host_api::{MockReader, SessionRecord, SessionState};
use termtally_host_cmd::CommandReader;
use termtally_store::{AuditEventType, SqliteStore, Store};
use termtally_util::{RemoteSessionId, Username};
use tokio::sync::watch;

fn make_test_config(hosts: &[&str]) -> MonitorConfig {
    let mut toml = String::from(
        r#"
        config_version = 1

        [service]
        poll_interval_seconds = 60

        [reader]
        ignored_users = ["admin"]
        "#,
    );
    for host in hosts {
        toml.push_str(&format!("\n[[hosts]]\nid = \"{}\"\n", host));
    }
    parse_config(&toml).unwrap()
}

fn total(store: &dyn Store, user: &str) -> u64 {
    store.get_total(&Username::new(user)).unwrap().total_seconds
}

#[test]
fn test_config_parsing() {
    let config = make_test_config(&["server1", "server2"]);
    assert_eq!(config.hosts.len(), 2);
    assert_eq!(config.hosts[0], HostConfig::new("server1"));
    assert_eq!(config.service.poll_interval, Duration::from_secs(60));
    assert_eq!(config.reader.format, ReaderFormat::Quser);
    assert!(config.service.flush_on_shutdown);
}

#[tokio::test]
async fn test_cycle_with_mock_reader() {
    let config = make_test_config(&["server1", "server2"]);
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let reader = Arc::new(MockReader::new());
    let mut scheduler = Scheduler::new(&config, store.clone(), reader.clone());
    let (_tx, rx) = watch::channel(false);

    reader.set_sessions(
        "server1",
        vec![
            SessionRecord::active("2", "alice"),
            SessionRecord::active("3", "admin"),
        ],
    );
    reader.set_sessions(
        "server2",
        vec![SessionRecord::new("5", "bob", SessionState::Disconnected)],
    );

    let report = scheduler.run_cycle(&rx).await;
    assert_eq!(report.hosts_polled, 2);
    assert_eq!(report.sessions_seen, 1);
    assert_eq!(report.started, 1);

    reader.set_sessions("server1", vec![]);
    let report = scheduler.run_cycle(&rx).await;
    assert_eq!(report.ended, 1);
    assert_eq!(report.committed, 1);

    let totals = store.get_all().unwrap();
    assert_eq!(totals.len(), 1);
    assert_eq!(totals[0].username.as_str(), "alice");
}

#[tokio::test]
async fn test_restart_keeps_totals() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sessions.db");
    let config = make_test_config(&["server1"]);
    let reader = Arc::new(MockReader::new());
    reader.set_sessions("server1", vec![SessionRecord::active("2", "alice")]);

    // First run ends with a graceful shutdown while alice is connected
    {
        let store = Arc::new(SqliteStore::open(&db_path).unwrap());
        store.add_minutes(&Username::new("alice"), 10.0).unwrap();

        let mut scheduler = Scheduler::new(&config, store.clone(), reader.clone());
        let (_tx, rx) = watch::channel(false);
        scheduler.run_cycle(&rx).await;
        let report = scheduler.shutdown();
        assert_eq!(report.finalized, 1);
        assert_eq!(report.pending, 0);
    }

    // Second run sees the same session as a new one
    let store = Arc::new(SqliteStore::open(&db_path).unwrap());
    let before = total(store.as_ref(), "alice");
    assert!(before >= 600);

    let mut scheduler = Scheduler::new(&config, store.clone(), reader.clone());
    let (_tx, rx) = watch::channel(false);
    let report = scheduler.run_cycle(&rx).await;
    assert_eq!(report.started, 1);
    assert!(total(store.as_ref(), "alice") >= before);

    let audits = store.get_recent_audits(100).unwrap();
    assert!(
        audits
            .iter()
            .any(|a| matches!(a.event, AuditEventType::SessionStarted { .. }))
    );
}

#[tokio::test]
async fn test_failed_host_does_not_stop_loop() {
    let config = make_test_config(&["down", "up"]);
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let reader = Arc::new(MockReader::new());
    reader.set_failing("down", true);
    reader.set_sessions("up", vec![SessionRecord::active("1", "carol")]);

    let mut scheduler = Scheduler::new(&config, store.clone(), reader.clone());
    let (_tx, rx) = watch::channel(false);

    for _ in 0..3 {
        let report = scheduler.run_cycle(&rx).await;
        assert_eq!(report.hosts_failed, 1);
        assert_eq!(report.hosts_polled, 2);
    }
    assert_eq!(reader.read_count(), 6);
    assert_eq!(scheduler.engine().ledger().tracked_count(), 1);
}

#[tokio::test]
async fn test_command_reader_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let listing = dir.path().join("quser.txt");
    std::fs::write(
        &listing,
        " USERNAME  SESSIONNAME  ID  STATE  IDLE TIME  LOGON TIME\n\
         >dave  rdp-tcp#1  4  Active  .  10/19/2026 9:00 AM\n \
         admin  console  1  Active  none  10/19/2026 8:00 AM\n",
    )
    .unwrap();

    let toml = format!(
        r#"
        config_version = 1

        [reader]
        format = "quser"
        command = ["sh", "-c", "cat '{}'", "{{host}}"]
        timeout_seconds = 5

        [[hosts]]
        id = "server1"
        "#,
        listing.display()
    );
    let config = parse_config(&toml).unwrap();

    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let reader = Arc::new(CommandReader::new(config.reader.clone()));
    let mut scheduler = Scheduler::new(&config, store.clone(), reader);
    let (_tx, rx) = watch::channel(false);

    let report = scheduler.run_cycle(&rx).await;
    assert_eq!(report.hosts_failed, 0);
    assert_eq!(report.sessions_seen, 1);

    let tracked = scheduler
        .engine()
        .ledger()
        .sessions(&"server1".into())
        .unwrap();
    assert!(tracked.contains_key(&RemoteSessionId::new("4")));
}

#[test]
fn test_two_instances_share_totals() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sessions.db");

    let a = SqliteStore::open(&db_path).unwrap();
    let b = SqliteStore::open(&db_path).unwrap();
    let user = Username::new("erin");

    a.add_minutes(&user, 1.0).unwrap();
    b.add_minutes(&user, 2.0).unwrap();
    a.add_minutes(&user, 0.5).unwrap();

    assert_eq!(total(&a, "erin"), 210);
    assert_eq!(total(&b, "erin"), 210);
}
