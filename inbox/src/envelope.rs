//! On-disk record format: `{"payload": ..., "storedAt": <unix ms>}`.

use std::fs;
use std::io;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Envelope<P> {
    /// Older writers named this field `record`.
    #[serde(alias = "record")]
    pub(crate) payload: P,
    pub(crate) stored_at: u64,
}

/// Just the stamp; lets the sweep skip decoding payloads it is about to delete.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Stamp {
    pub(crate) stored_at: u64,
}

pub(crate) fn encode<P: Serialize>(payload: &P, stored_at: u64) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(&Envelope {
        payload,
        stored_at,
    })
}

#[derive(Debug)]
pub(crate) enum DiskRead<P> {
    Missing,
    Corrupt(String),
    Found(Envelope<P>),
}

pub(crate) fn read<P: DeserializeOwned>(path: &Path) -> io::Result<DiskRead<P>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(DiskRead::Missing),
        Err(e) => return Err(e),
    };
    Ok(match serde_json::from_slice(&bytes) {
        Ok(envelope) => DiskRead::Found(envelope),
        Err(e) => DiskRead::Corrupt(e.to_string()),
    })
}

pub(crate) fn read_stamp(path: &Path) -> Option<u64> {
    let bytes = fs::read(path).ok()?;
    serde_json::from_slice::<Stamp>(&bytes)
        .ok()
        .map(|s| s.stored_at)
}
