use crate::record::write_atomic;
use crate::types::DonationId;
use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Current store format version. Incremented on incompatible layout changes.
pub const STORE_FORMAT_VERSION: u32 = 1;
const VERSION_FILE: &str = "version";

/// Directory layout for the Larder record store.
///
/// Manages paths for every table, the id sequences, the lock file, and the
/// store version marker. All subdirectories are created lazily on
/// [`initialize`](Self::initialize).
#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreVersion {
    format_version: u32,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn store_dir(&self) -> PathBuf {
        self.root.join("store")
    }

    #[inline]
    pub fn users_dir(&self) -> PathBuf {
        self.store_dir().join("users")
    }

    #[inline]
    pub fn barcodes_dir(&self) -> PathBuf {
        self.store_dir().join("barcodes")
    }

    #[inline]
    pub fn donations_dir(&self) -> PathBuf {
        self.store_dir().join("donations")
    }

    #[inline]
    pub fn items_dir(&self) -> PathBuf {
        self.store_dir().join("items")
    }

    /// Items are grouped per donation so that listing one donation's items
    /// never scans the others.
    #[inline]
    pub fn donation_items_dir(&self, donation: DonationId) -> PathBuf {
        self.items_dir().join(donation.to_string())
    }

    #[inline]
    pub fn sequences_dir(&self) -> PathBuf {
        self.store_dir().join("sequences")
    }

    #[inline]
    pub fn lock_file(&self) -> PathBuf {
        self.store_dir().join(".lock")
    }

    pub fn is_initialized(&self) -> bool {
        self.store_dir().join(VERSION_FILE).exists()
    }

    pub fn initialize(&self) -> Result<(), StoreError> {
        fs::create_dir_all(self.users_dir())?;
        fs::create_dir_all(self.barcodes_dir())?;
        fs::create_dir_all(self.donations_dir())?;
        fs::create_dir_all(self.items_dir())?;
        fs::create_dir_all(self.sequences_dir())?;

        let version_path = self.store_dir().join(VERSION_FILE);
        if version_path.exists() {
            self.verify_version()?;
        } else {
            let ver = StoreVersion {
                format_version: STORE_FORMAT_VERSION,
            };
            let content = serde_json::to_string_pretty(&ver)?;
            write_atomic(&self.store_dir(), &version_path, content.as_bytes())?;
        }

        Ok(())
    }

    pub fn verify_version(&self) -> Result<(), StoreError> {
        let version_path = self.store_dir().join(VERSION_FILE);
        let content = fs::read_to_string(&version_path)?;
        let ver: StoreVersion = serde_json::from_str(&content)?;

        if ver.format_version != STORE_FORMAT_VERSION {
            return Err(StoreError::VersionMismatch {
                expected: STORE_FORMAT_VERSION,
                found: ver.format_version,
            });
        }
        Ok(())
    }
}
