//! Screenshot handoff.
//!
//! The browser uploads a capture that an agent worker requested; the worker
//! takes it exactly once.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use steward_types::Clock;

use crate::error::InboxError;
use crate::mirror::SweepReport;
use crate::settings::InboxSettings;
use crate::store::DurableInbox;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotPayload {
    pub session_id: String,
    pub request_id: String,
    pub mime_type: String,
    /// Base64-encoded image bytes, as uploaded.
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<u64>,
}

#[derive(Debug)]
pub struct ScreenshotInbox {
    engine: DurableInbox<ScreenshotPayload>,
}

impl ScreenshotInbox {
    pub fn open(settings: &InboxSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            engine: DurableInbox::open(settings, clock),
        }
    }

    pub fn open_strict(settings: &InboxSettings, clock: Arc<dyn Clock>) -> Result<Self, InboxError> {
        Ok(Self {
            engine: DurableInbox::open_strict(settings, clock)?,
        })
    }

    pub fn store(&self, payload: ScreenshotPayload) {
        tracing::debug!(
            session = %payload.session_id,
            request = %payload.request_id,
            bytes = payload.data.len(),
            "Stored screenshot"
        );
        let (session, request) = (payload.session_id.clone(), payload.request_id.clone());
        self.engine.put(&session, &request, payload);
    }

    /// Consume the capture for `(session_id, request_id)`.
    #[must_use]
    pub fn take(&self, session_id: &str, request_id: &str) -> Option<ScreenshotPayload> {
        self.engine.take(session_id, request_id)
    }

    pub fn sweep_now(&self) -> SweepReport {
        self.engine.sweep_now()
    }

    #[must_use]
    pub fn engine(&self) -> &DurableInbox<ScreenshotPayload> {
        &self.engine
    }
}
