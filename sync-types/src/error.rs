//! Error taxonomy for BLE-Sync.
//!
//! Errors are values that flow through events, not exceptional control
//! flow. The taxonomy drives behaviour: transport errors are retried and
//! breaker-gated, permission and user-action errors surface straight to
//! the host, protocol errors indicate a configuration problem.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors recognized by the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum DomainError {
    /// A platform permission is missing; the host must prompt the user.
    #[error("permission required: {0}")]
    PermissionRequired(String),

    /// The user must act (confirm a pairing dialog, toggle the radio).
    #[error("user action required: {0}")]
    UserActionRequired(String),

    /// The radio link failed; usually transient.
    #[error("transport error: {message}")]
    Transport {
        /// Human-readable description of the failure.
        message: String,
        /// Platform GATT status code, when one was reported.
        code: Option<i32>,
    },

    /// The peer violated the wire protocol; retrying will not help.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Something the engine has no better classification for.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl DomainError {
    /// Whether retrying the failed operation can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Unexpected(_))
    }

    /// Whether failures of this kind feed the stage circuit breaker.
    pub fn is_breaker_gated(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Protocol(_) | Self::Unexpected(_)
        )
    }
}

/// Why a retry was scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetryReason {
    /// A GATT operation failed in a way that usually clears itself.
    TemporaryGattError,
    /// The radio was busy with another operation.
    RadioBusy,
    /// Backing off after a failure before trying again.
    BackoffAfterFailure,
    /// Any other reason, described free-form.
    Custom(String),
}

impl fmt::Display for RetryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TemporaryGattError => write!(f, "temporary gatt error"),
            Self::RadioBusy => write!(f, "radio busy"),
            Self::BackoffAfterFailure => write!(f, "backoff after failure"),
            Self::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

/// Why a connection was lost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisconnectReason {
    /// The peripheral closed the link.
    PeerClosed,
    /// An operation or the link itself timed out.
    Timeout,
    /// The GATT stack reported an error.
    GattError,
    /// Any other reason, described free-form.
    Custom(String),
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerClosed => write!(f, "peer closed"),
            Self::Timeout => write!(f, "timeout"),
            Self::GattError => write!(f, "gatt error"),
            Self::Custom(msg) => write!(f, "{}", msg),
        }
    }
}
