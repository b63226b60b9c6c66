//! Durable inbox for cross-process handoff records.
//!
//! Two instantiations share one engine ([`DurableInbox`]):
//!
//! - [`AckInbox`]: delivery acknowledgements, readable until they expire.
//! - [`ScreenshotInbox`]: captured screenshots, consumed by the first `take`.
//!
//! Writes land in memory synchronously and are mirrored to
//! `<root>/<session>/<item>.json` by a background worker, so a process that
//! restarts before a record is consumed can still recover it. Records past
//! their retention read as absent; a sweep piggybacking on ordinary calls, at
//! most once per interval, deletes them from both tiers.

mod ack;
mod envelope;
mod error;
mod mirror;
mod screenshot;
mod settings;
mod store;

pub use ack::{AckInbox, AckRecord};
pub use error::InboxError;
pub use mirror::SweepReport;
pub use screenshot::{ScreenshotInbox, ScreenshotPayload};
pub use settings::{
    ACK_DIR, DEFAULT_RETENTION, DEFAULT_SWEEP_INTERVAL, InboxSettings, MIN_RETENTION,
    SCREENSHOT_DIR,
};
pub use store::DurableInbox;
