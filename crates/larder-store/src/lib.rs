//! Durable record store for Larder.
//!
//! This crate provides the storage layer: `StoreLayout` for directory structure
//! management, one typed table per record kind (`UserStore`, `BarcodeStore`,
//! `DonationStore`, `ItemStore`), numeric id `Sequence`s, and
//! `verify_store_integrity` for checksum and reference checks. Every record is
//! written atomically and carries a blake3 checksum that is verified on read.

pub mod barcodes;
pub mod donations;
pub mod integrity;
pub mod items;
pub mod layout;
pub mod record;
pub mod sequence;
pub mod types;
pub mod users;

pub use barcodes::{BarcodeRecord, BarcodeStore};
pub use donations::{DonationRecord, DonationState, DonationStore};
pub use integrity::{verify_store_integrity, IntegrityFailure, IntegrityReport, TableReport};
pub use items::{ItemRecord, ItemStore, NewItem};
pub use layout::{StoreLayout, STORE_FORMAT_VERSION};
pub use record::validate_key;
pub use sequence::Sequence;
pub use types::{BarcodeCode, DonationId, ItemId, UserId};
pub use users::{Permissions, UserRecord, UserStore};

use std::path::Path;
use thiserror::Error;

/// Fsync a directory to ensure that a preceding `rename()` is durable.
///
/// POSIX does not guarantee a rename survives a crash until the parent
/// directory itself has been synced.
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("integrity check failed for record '{key}': expected {expected}, got {actual}")]
    IntegrityFailure {
        key: String,
        expected: String,
        actual: String,
    },
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("barcode not found: {0}")]
    BarcodeNotFound(String),
    #[error("donation not found: {0}")]
    DonationNotFound(DonationId),
    #[error("duplicate key in {table}: {key}")]
    DuplicateKey { table: &'static str, key: String },
    #[error("store format version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("invalid permission mask: {0}")]
    InvalidPermissions(String),
}
