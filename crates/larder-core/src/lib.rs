//! Authorization and donation lifecycle engines for Larder.
//!
//! This crate ties the record store together into the `Engine`, the central
//! API for provisioning users under the hierarchical permission model,
//! checking credentials, and moving donations through their
//! pending → claimed → completed lifecycle while aggregating items. The
//! permission rules (`validate_grant`) and lifecycle rules
//! (`validate_transition`) are pure functions, testable without a store.

pub mod auth;
pub mod concurrency;
pub mod engine;
pub mod lifecycle;

pub use auth::{hash_password, normalize_scan_count, validate_grant, verify_password};
pub use concurrency::StoreLock;
pub use engine::{Engine, WriteOutcome};
pub use lifecycle::{validate_transition, StatusFilter};
pub use larder_store::{
    BarcodeCode, BarcodeRecord, DonationId, DonationRecord, DonationState, ItemId, ItemRecord,
    Permissions, UserId, UserRecord,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("store error: {0}")]
    Store(larder_store::StoreError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("donation not found: {0}")]
    DonationNotFound(DonationId),
    #[error("barcode not found: {0}")]
    BarcodeNotFound(String),
    #[error("invalid credentials for user '{0}'")]
    InvalidCredentials(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("ownership conflict: user '{user}' is owned by {owner}, not '{parent}'")]
    OwnershipConflict {
        user: String,
        owner: String,
        parent: String,
    },
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("duplicate {table} key: {key}")]
    DuplicateKey { table: &'static str, key: String },
    #[error("item count overflow: {0}")]
    CountOverflow(String),
    #[error("store inconsistency: {0}")]
    Inconsistent(String),
}

/// Store-level not-found and duplicate errors are lifted into their engine
/// kinds so callers match on one enum.
impl From<larder_store::StoreError> for CoreError {
    fn from(e: larder_store::StoreError) -> Self {
        use larder_store::StoreError;
        match e {
            StoreError::UserNotFound(id) => CoreError::UserNotFound(id),
            StoreError::BarcodeNotFound(code) => CoreError::BarcodeNotFound(code),
            StoreError::DonationNotFound(id) => CoreError::DonationNotFound(id),
            StoreError::DuplicateKey { table, key } => CoreError::DuplicateKey { table, key },
            other => CoreError::Store(other),
        }
    }
}

impl CoreError {
    /// Failures caused by who is asking rather than by store state.
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidCredentials(_)
                | CoreError::PermissionDenied(_)
                | CoreError::OwnershipConflict { .. }
        )
    }
}
