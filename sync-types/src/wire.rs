//! GATT payload layout shared by BLE adapters and test fakes.
//!
//! The peripheral exposes three characteristic operations, all
//! little-endian:
//!
//! - count read: a payload of at least 4 bytes, the first 4 being the
//!   `u32` total event count;
//! - page request write: 8 bytes, `u32 offset || u32 count`;
//! - ack write: 4 bytes, the `u32` exclusive high-water mark.
//!
//! Malformed payloads and out-of-range offsets are protocol errors, not
//! panics. Platform GATT status codes map onto the error taxonomy via
//! [`error_from_gatt_status`].

use crate::{DomainError, EventCount, EventOffset, PageSize};

/// Minimum length of a count-read payload.
pub const COUNT_PAYLOAD_LEN: usize = 4;

/// Length of a page-request payload.
pub const PAGE_REQUEST_LEN: usize = 8;

/// Length of an ack payload.
pub const ACK_PAYLOAD_LEN: usize = 4;

/// GATT status: success.
pub const GATT_SUCCESS: i32 = 0;
/// GATT status: connection timed out.
pub const GATT_CONN_TIMEOUT: i32 = 8;
/// GATT status: peer terminated the connection.
pub const GATT_CONN_TERMINATED_BY_PEER: i32 = 19;
/// GATT status: the platform stack gave up (the catch-all 133).
pub const GATT_STACK_ERROR: i32 = 133;

/// Decode a count-read payload into the device's total event count.
pub fn decode_event_count(payload: &[u8]) -> Result<EventCount, DomainError> {
    let bytes: [u8; COUNT_PAYLOAD_LEN] = payload
        .get(..COUNT_PAYLOAD_LEN)
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| {
            DomainError::Protocol(format!(
                "count payload too short: {} bytes, need {}",
                payload.len(),
                COUNT_PAYLOAD_LEN
            ))
        })?;
    Ok(EventCount::new(u32::from_le_bytes(bytes) as u64))
}

/// Encode a page request for `count` events starting at `offset`.
pub fn encode_page_request(
    offset: EventOffset,
    count: PageSize,
) -> Result<[u8; PAGE_REQUEST_LEN], DomainError> {
    let offset = u32_offset(offset)?;
    let mut payload = [0u8; PAGE_REQUEST_LEN];
    payload[..4].copy_from_slice(&offset.to_le_bytes());
    payload[4..].copy_from_slice(&count.value().to_le_bytes());
    Ok(payload)
}

/// Encode an acknowledgement write for everything below `up_to`.
pub fn encode_ack(up_to: EventOffset) -> Result<[u8; ACK_PAYLOAD_LEN], DomainError> {
    Ok(u32_offset(up_to)?.to_le_bytes())
}

/// Map a platform GATT status code onto the error taxonomy.
///
/// Returns `None` for success. Codes 8 and 19 are link-level failures
/// (transport), 133 means the platform stack itself is unavailable, and
/// anything else unexpected from this peripheral is a protocol error.
pub fn error_from_gatt_status(code: i32) -> Option<DomainError> {
    match code {
        GATT_SUCCESS => None,
        GATT_CONN_TIMEOUT | GATT_CONN_TERMINATED_BY_PEER => Some(DomainError::Transport {
            message: format!("gatt failure (status {})", code),
            code: Some(code),
        }),
        GATT_STACK_ERROR => Some(DomainError::Unexpected(format!(
            "platform gatt stack unavailable (status {})",
            code
        ))),
        other => Some(DomainError::Protocol(format!(
            "unexpected gatt status {}",
            other
        ))),
    }
}

fn u32_offset(offset: EventOffset) -> Result<u32, DomainError> {
    u32::try_from(offset.value()).map_err(|_| {
        DomainError::Protocol(format!("offset {} exceeds the u32 wire range", offset))
    })
}
