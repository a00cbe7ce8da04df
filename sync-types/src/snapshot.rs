//! The persisted resume point for a device.
//!
//! Deliberately minimal: no payloads, no breaker state, no attempt
//! counters. Everything else is rebuilt by re-running the saga against
//! the live device. Encryption and the actual storage medium are the
//! storage port's concern; this module only fixes the record and its
//! canonical byte encoding.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{DeviceId, EventOffset, PageSize};

/// Snapshot codec errors.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// MessagePack encoding failed.
    #[error("snapshot encoding failed: {0}")]
    Encode(#[source] rmp_serde::encode::Error),

    /// MessagePack decoding failed.
    #[error("snapshot decoding failed: {0}")]
    Decode(#[source] rmp_serde::decode::Error),
}

/// The minimal durable record for crash-safe resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSnapshot {
    /// Device the snapshot belongs to; also the storage key.
    pub device: DeviceId,
    /// Exclusive high-water mark of durably delivered offsets.
    pub last_acked_exclusive: EventOffset,
    /// Page size in effect when the snapshot was taken.
    pub page_size: PageSize,
    /// Human-readable saga position, for observability only.
    pub saga_cursor: String,
}

impl SyncSnapshot {
    /// Create a snapshot record.
    pub fn new(
        device: DeviceId,
        last_acked_exclusive: EventOffset,
        page_size: PageSize,
        saga_cursor: impl Into<String>,
    ) -> Self {
        Self {
            device,
            last_acked_exclusive,
            page_size,
            saga_cursor: saga_cursor.into(),
        }
    }

    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        rmp_serde::to_vec(self).map_err(SnapshotError::Encode)
    }

    /// Deserialize from MessagePack bytes.
    ///
    /// Storage adapters should treat a decode failure as "no snapshot";
    /// a corrupted resume point must never block a cold start.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        rmp_serde::from_slice(bytes).map_err(SnapshotError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_roundtrip() {
        let snapshot = SyncSnapshot::new(
            DeviceId::new("dev-1").unwrap(),
            EventOffset::new(50),
            PageSize::new(50).unwrap(),
            "Acked:50",
        );

        let bytes = snapshot.to_bytes().unwrap();
        let restored = SyncSnapshot::from_bytes(&bytes).unwrap();

        assert_eq!(snapshot, restored);
    }

    #[test]
    fn corrupted_bytes_fail_to_decode() {
        assert!(SyncSnapshot::from_bytes(&[0xFF, 0x00, 0x13]).is_err());
        assert!(SyncSnapshot::from_bytes(&[]).is_err());
    }

    #[test]
    fn encoding_is_compact() {
        let snapshot = SyncSnapshot::new(
            DeviceId::new("aa:bb:cc:dd:ee:ff").unwrap(),
            EventOffset::new(u64::MAX),
            PageSize::new(200).unwrap(),
            "Acked:18446744073709551615",
        );
        let bytes = snapshot.to_bytes().unwrap();
        assert!(bytes.len() < 128);
    }
}
