//! Proxy admission and budget charging through the facade.

use std::time::Duration;

use steward_core::{Admission, Denial};

use crate::common::{harness, harness_with};

#[test]
fn rate_limit_denies_with_retry_after_then_recovers() {
    let h = harness_with(|env| env.rate_limit_per_minute = Some(2));

    let first = h.steward.admit_proxy("llm", "user-1").into_result().unwrap();
    first.release();
    let second = h.steward.admit_proxy("llm", "user-1").into_result().unwrap();
    assert_eq!(second.remaining(), 0);
    drop(second);

    let denied = h.steward.admit_proxy("llm", "user-1");
    let Admission::Denied(Denial::RateLimited {
        current,
        limit,
        retry_after_secs,
        ..
    }) = denied
    else {
        panic!("expected rate limit, got {denied:?}");
    };
    assert_eq!((current, limit), (3, 2));
    assert!(retry_after_secs > 0);

    h.clock.advance(Duration::from_secs(60));
    assert!(h.steward.admit_proxy("llm", "user-1").is_admitted());
}

#[test]
fn stream_limit_holds_until_permit_drops() {
    let h = harness_with(|env| env.max_concurrent_streams = Some(2));

    let a = h.steward.admit_proxy("tts", "user-1").into_result().unwrap();
    let _b = h.steward.admit_proxy("tts", "user-1").into_result().unwrap();
    assert_eq!(h.steward.streams_in_flight("tts", "user-1"), 2);

    let denied = h.steward.admit_proxy("tts", "user-1").into_result().unwrap_err();
    assert!(matches!(
        denied,
        Denial::TooManyStreams {
            in_flight: 2,
            limit: 2,
            ..
        }
    ));
    assert_eq!(denied.status_code(), 429);
    assert_eq!(denied.retry_after_secs(), 1);

    drop(a);
    assert_eq!(h.steward.streams_in_flight("tts", "user-1"), 1);
    assert!(h.steward.admit_proxy("tts", "user-1").is_admitted());
}

#[test]
fn stream_denial_still_consumes_rate_slot() {
    let h = harness_with(|env| {
        env.rate_limit_per_minute = Some(2);
        env.max_concurrent_streams = Some(1);
    });

    let held = h.steward.admit_proxy("llm", "u").into_result().unwrap();
    assert!(matches!(
        h.steward.admit_proxy("llm", "u").denial(),
        Some(Denial::TooManyStreams { .. })
    ));
    held.release();

    assert!(matches!(
        h.steward.admit_proxy("llm", "u").denial(),
        Some(Denial::RateLimited { .. })
    ));
}

#[test]
fn callers_and_purposes_are_limited_independently() {
    let h = harness_with(|env| env.max_concurrent_streams = Some(1));

    let _a = h.steward.admit_proxy("llm", "user-1").into_result().unwrap();
    let _b = h.steward.admit_proxy("llm", "user-2").into_result().unwrap();
    let c = h.steward.admit_proxy("tts", "user-1").into_result().unwrap();
    assert_eq!(c.key(), "tts:user-1");
}

#[test]
fn budget_ceiling_rejects_overrun() {
    let h = harness_with(|env| {
        env.budget_ceiling = Some(10);
        env.budget_window_ms = Some(1_000);
    });

    assert!(h.steward.charge("tokens", 4).is_admitted());
    assert!(h.steward.charge("tokens", 5).is_admitted());

    let denial = h.steward.charge("tokens", 3).into_result().unwrap_err();
    let Denial::BudgetExceeded {
        used,
        limit,
        retry_after_secs,
        ..
    } = denial
    else {
        panic!("expected budget denial, got {denial:?}");
    };
    assert_eq!((used, limit), (12, 10));
    assert!(retry_after_secs > 0);

    h.clock.advance(Duration::from_secs(1));
    let fresh = h.steward.charge("tokens", 3).into_result().unwrap();
    assert_eq!(fresh.used, 3);
}

#[test]
fn default_limits_admit_ordinary_traffic() {
    let h = harness();
    for _ in 0..10 {
        let permit = h.steward.admit_proxy("llm", "user-1").into_result().unwrap();
        permit.release();
    }
    assert_eq!(h.steward.streams_in_flight("llm", "user-1"), 0);
}
