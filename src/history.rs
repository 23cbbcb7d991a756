//! Persistent record of settled rounds
//!
//! One record per completed round, keyed by request id, plus a newest-first
//! index keyed by inverted settlement time. The state machine never reads
//! this store; it exists for operators and the `/rounds` endpoint.

use crate::errors::StoreError;
use crate::raffle::{Amount, RequestId};
use crate::storage::RocksStore;
use serde::{Deserialize, Serialize};
use std::path::Path;

const ROUND_PREFIX: &str = "round:req:";
const RECENT_INDEX_PREFIX: &[u8] = b"round:index:recent:";

/// Everything worth keeping about a settled round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round_id: String,
    pub request_id: RequestId,
    pub winner: String,
    pub pot: Amount,
    pub player_count: usize,
    /// Unix seconds at which the winner was finalized.
    pub decided_at: u64,
    pub vrf_output: String,
    pub vrf_proof: String,
    pub vrf_public_key: String,
}

pub struct RoundStore {
    store: RocksStore,
}

impl RoundStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Ok(Self {
            store: RocksStore::open(path)?,
        })
    }

    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Ok(Self {
            store: RocksStore::open_read_only(path)?,
        })
    }

    fn round_key(request_id: RequestId) -> Vec<u8> {
        format!("{ROUND_PREFIX}{request_id}").into_bytes()
    }

    // Key layout: prefix | inv_decided_at(be) | request_id(be), so a forward
    // scan yields newest rounds first.
    fn recent_index_key(decided_at: u64, request_id: RequestId) -> Vec<u8> {
        let inv_time = u64::MAX - decided_at;
        let mut key = Vec::with_capacity(RECENT_INDEX_PREFIX.len() + 16);
        key.extend_from_slice(RECENT_INDEX_PREFIX);
        key.extend_from_slice(&inv_time.to_be_bytes());
        key.extend_from_slice(&request_id.to_be_bytes());
        key
    }

    pub fn store_round(&self, record: &RoundRecord) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(record).map_err(|e| {
            StoreError::WriteFailed(format!(
                "failed to encode round for request {}: {e}",
                record.request_id
            ))
        })?;

        self.store.batch_write(&[
            (Self::round_key(record.request_id), bytes),
            (
                Self::recent_index_key(record.decided_at, record.request_id),
                Vec::new(),
            ),
        ])
    }

    pub fn load_round(&self, request_id: RequestId) -> Result<Option<RoundRecord>, StoreError> {
        let Some(bytes) = self.store.get(&Self::round_key(request_id)) else {
            return Ok(None);
        };

        let record = serde_json::from_slice(&bytes).map_err(|e| {
            StoreError::CorruptedData(format!(
                "failed to decode round for request {request_id}: {e}"
            ))
        })?;
        Ok(Some(record))
    }

    /// The most recently settled rounds, newest first.
    pub fn load_recent(&self, limit: usize) -> Result<Vec<RoundRecord>, StoreError> {
        let rows = self.store.scan_prefix(RECENT_INDEX_PREFIX, limit.max(1));

        let mut rounds = Vec::with_capacity(rows.len());
        for (key, _) in rows {
            if key.len() < RECENT_INDEX_PREFIX.len() + 16 {
                continue;
            }
            let mut id_bytes = [0u8; 8];
            id_bytes.copy_from_slice(&key[key.len() - 8..]);
            let request_id = RequestId::from_be_bytes(id_bytes);

            if let Some(record) = self.load_round(request_id)? {
                rounds.push(record);
            } else {
                tracing::warn!(request_id, "round index entry without a record");
            }
        }
        Ok(rounds)
    }
}
