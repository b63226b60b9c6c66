//! Serialized, deduplicated mutations through the facade.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use steward_core::{Execution, IdempotencyKey, ResourceKey};
use tokio::time::sleep;

use crate::common::harness;

#[tokio::test(start_paused = true)]
async fn widget_edits_apply_in_call_order() {
    let h = harness();
    let widget = ResourceKey::new("board-7:sticky-3").unwrap();
    let applied = Arc::new(Mutex::new(Vec::new()));

    let edits: Vec<_> = ["move", "resize", "recolor"]
        .into_iter()
        .enumerate()
        .map(|(i, edit)| {
            let applied = Arc::clone(&applied);
            h.steward.mutate(
                &widget,
                &IdempotencyKey::generate(),
                move || async move {
                    // Later edits finish faster; ordering must still hold.
                    sleep(Duration::from_millis(30 - 10 * i as u64)).await;
                    applied.lock().unwrap().push(edit);
                    Ok::<_, Infallible>(edit)
                },
            )
        })
        .collect();

    for edit in edits {
        assert!(matches!(edit.await, Ok(Execution::Completed(_))));
    }
    assert_eq!(*applied.lock().unwrap(), vec!["move", "resize", "recolor"]);
    assert!(!h.steward.arbiter().is_busy(&widget));
}

#[tokio::test(start_paused = true)]
async fn agent_retry_is_deduplicated() {
    let h = harness();
    let widget = ResourceKey::new("board-7:frame-1").unwrap();
    let op = IdempotencyKey::new("agent-run-9:step-2").unwrap();
    let runs = Arc::new(Mutex::new(0_u32));

    for _ in 0..3 {
        let runs = Arc::clone(&runs);
        let _ = h
            .steward
            .mutate(&widget, &op, move || async move {
                *runs.lock().unwrap() += 1;
                Ok::<_, Infallible>(())
            })
            .await
            .unwrap();
    }
    assert_eq!(*runs.lock().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_edit_surfaces_error_and_can_be_retried() {
    let h = harness();
    let widget = ResourceKey::new("board-1:shape-4").unwrap();
    let op = IdempotencyKey::new("op-1").unwrap();

    let failed = h
        .steward
        .mutate(&widget, &op, || async { Err::<(), _>("document locked") })
        .await;
    assert_eq!(failed, Err("document locked"));

    let retried = h
        .steward
        .mutate(&widget, &op, || async { Ok::<_, &str>(5) })
        .await;
    assert_eq!(retried, Ok(Execution::Completed(5)));
}
