//! Record codec: `ResumeRecord` <-> the string stored in the key-value store.

use thiserror::Error;
use uuid::Uuid;

use crate::models::resume::ResumeRecord;

/// Namespace of every resume record key. Nothing else is written under it.
pub const RECORD_KEY_PREFIX: &str = "resume:";

#[derive(Debug, Error)]
#[error("record codec error: {0}")]
pub struct CodecError(#[from] serde_json::Error);

/// Key a record with the given id is stored under, e.g. `resume:<uuid>`.
pub fn record_key(id: Uuid) -> String {
    format!("{RECORD_KEY_PREFIX}{id}")
}

pub fn encode(record: &ResumeRecord) -> Result<String, CodecError> {
    Ok(serde_json::to_string(record)?)
}

pub fn decode(raw: &str) -> Result<ResumeRecord, CodecError> {
    Ok(serde_json::from_str(raw)?)
}
