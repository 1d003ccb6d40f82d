use crate::CoreError;
use fs2::FileExt;
use larder_store::StoreLayout;
use std::fs::{self, File, OpenOptions};
use tracing::debug;

/// Exclusive advisory lock on `store/.lock`, held for one check-then-act
/// sequence. Released on drop.
///
/// Every engine mutation takes this lock and none takes it twice, so
/// engines in other threads or processes serialize on it.
pub struct StoreLock {
    file: File,
}

impl StoreLock {
    /// Block until the store lock is ours.
    pub fn acquire(layout: &StoreLayout) -> Result<Self, CoreError> {
        let path = layout.lock_file();
        fs::create_dir_all(layout.store_dir())?;
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        if file.try_lock_exclusive().is_err() {
            debug!("store lock {} is busy, waiting", path.display());
            file.lock_exclusive()?;
        }
        Ok(Self { file })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
