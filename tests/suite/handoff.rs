//! Ack and screenshot handoff between a web process and a worker process.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use steward_core::{ManualClock, ScreenshotPayload, Steward};

use crate::common::{T0, config_in, harness, harness_with};

fn capture(request: &str) -> ScreenshotPayload {
    ScreenshotPayload {
        session_id: "room-42".to_string(),
        request_id: request.to_string(),
        mime_type: "image/webp".to_string(),
        data: "UklGRhIAAABXRUJQVlA4TAYAAAAvAAAAAAfQ//73v/+BiOh/AAA=".to_string(),
        captured_at: None,
    }
}

#[test]
fn screenshot_is_delivered_exactly_once() {
    let h = harness();
    let shot = capture("req-1");

    h.steward.screenshots().store(shot.clone());
    assert_eq!(h.steward.screenshots().take("room-42", "req-1"), Some(shot));
    assert_eq!(h.steward.screenshots().take("room-42", "req-1"), None);
}

#[test]
fn worker_process_takes_screenshot_stored_by_web_process() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(T0));
    let shot = capture("req-2");

    let web = Steward::with_clock(config_in(dir.path(), |_| {}), Arc::<ManualClock>::clone(&clock));
    web.screenshots().store(shot.clone());
    web.screenshots().engine().flush();

    let worker = Steward::with_clock(config_in(dir.path(), |_| {}), Arc::<ManualClock>::clone(&clock));
    assert_eq!(worker.screenshots().take("room-42", "req-2"), Some(shot));
    assert_eq!(worker.screenshots().take("room-42", "req-2"), None);
}

#[test]
fn ack_on_disk_survives_restart() {
    let h = harness();
    let session_dir = h.dir.path().join("acks").join("room-42");
    fs::create_dir_all(&session_dir).unwrap();
    fs::write(
        session_dir.join("17.json"),
        json!({
            "payload": {"sessionId": "room-42", "seq": 17, "clientId": "tab-1", "timestamp": T0},
            "storedAt": T0,
        })
        .to_string(),
    )
    .unwrap();

    let ack = h.steward.acks().get("room-42", 17).expect("recovered from disk");
    assert_eq!(ack.client_id, "tab-1");
    assert_eq!(h.steward.acks().get("room-42", 17), Some(ack));
}

#[test]
fn inboxes_live_in_separate_subdirectories() {
    let h = harness();
    h.steward.acks().record("room-42", 1, "tab-1", T0);
    h.steward.screenshots().store(capture("1"));
    h.steward.acks().engine().flush();
    h.steward.screenshots().engine().flush();

    assert!(h.dir.path().join("acks/room-42/1.json").exists());
    assert!(h.dir.path().join("screenshots/room-42/1.json").exists());
    assert!(h.steward.acks().get("room-42", 1).is_some());
}

#[test]
fn expired_records_disappear_from_both_tiers() {
    let h = harness_with(|env| env.inbox_retention_ms = Some(60_000));
    h.steward.acks().record("room-42", 3, "tab-1", T0);
    h.steward.screenshots().store(capture("late"));

    h.clock.advance(Duration::from_secs(61));
    assert_eq!(h.steward.acks().get("room-42", 3), None);
    assert_eq!(h.steward.screenshots().take("room-42", "late"), None);

    let acks = h.steward.acks().sweep_now();
    let shots = h.steward.screenshots().sweep_now();
    assert_eq!(acks.memory_removed + shots.memory_removed, 0, "already evicted on read");
    assert!(!h.dir.path().join("acks/room-42").exists());
    assert!(!h.dir.path().join("screenshots/room-42").exists());
}
