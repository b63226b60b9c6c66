//! Delivery acknowledgements.
//!
//! A client confirms it applied a pushed update by posting `(session, seq)`.
//! The marker stays readable until retention expires, so a worker that polls
//! late (or restarts) still observes it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use steward_types::Clock;

use crate::error::InboxError;
use crate::mirror::SweepReport;
use crate::settings::InboxSettings;
use crate::store::DurableInbox;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckRecord {
    pub session_id: String,
    pub seq: u64,
    pub client_id: String,
    /// Client-reported acknowledgement time, Unix milliseconds.
    pub timestamp: u64,
}

#[derive(Debug)]
pub struct AckInbox {
    engine: DurableInbox<AckRecord>,
}

impl AckInbox {
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

    pub fn record(
        &self,
        session_id: &str,
        seq: u64,
        client_id: &str,
        timestamp: u64,
    ) -> AckRecord {
        let record = AckRecord {
            session_id: session_id.to_string(),
            seq,
            client_id: client_id.to_string(),
            timestamp,
        };
        self.engine.put(session_id, &seq.to_string(), record.clone());
        tracing::debug!(session = session_id, seq, client = client_id, "Recorded ack");
        record
    }

    #[must_use]
    pub fn get(&self, session_id: &str, seq: u64) -> Option<AckRecord> {
        self.engine.get(session_id, &seq.to_string())
    }

    pub fn sweep_now(&self) -> SweepReport {
        self.engine.sweep_now()
    }

    /// The underlying engine, for flushing and mirror diagnostics.
    #[must_use]
    pub fn engine(&self) -> &DurableInbox<AckRecord> {
        &self.engine
    }
}
