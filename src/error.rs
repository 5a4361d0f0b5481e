//! Error types for the subscription ledger.

use crate::rights::Role;
use crate::types::{ActivityId, ThreadId, UserId};
use thiserror::Error;

/// Main error type for ledger, store, and collaborator operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },

    #[error("Invalid store format: {0}")]
    InvalidFormat(String),

    #[error("Store is locked by another process")]
    Locked,

    #[error("Store not initialized")]
    NotInitialized,

    #[error("Activity not found: {0}")]
    ActivityNotFound(ActivityId),

    #[error("Activity already exists: {0}")]
    ActivityExists(ActivityId),

    #[error("Feedback thread not found: {0}")]
    ThreadNotFound(ThreadId),

    #[error("User {user} is not allowed to {action}")]
    Unauthorized { user: UserId, action: String },

    #[error("User {user} already holds role {role:?} or a stronger one")]
    RoleAlreadyHeld { user: UserId, role: Role },
}

impl From<rmp_serde::encode::Error> for LedgerError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        LedgerError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for LedgerError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        LedgerError::Deserialization(e.to_string())
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
