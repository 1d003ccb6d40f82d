use crate::layout::StoreLayout;
use crate::record::write_atomic;
use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize)]
struct SequenceState {
    last: u64,
}

/// Monotonic id allocator for one table.
///
/// Ids start at 1 and are never reused. Allocation is not locked here;
/// callers serialize mutations through the store lock.
#[derive(Debug, Clone)]
pub struct Sequence {
    dir: PathBuf,
    path: PathBuf,
}

impl Sequence {
    pub fn new(layout: &StoreLayout, table: &str) -> Self {
        let dir = layout.sequences_dir();
        let path = dir.join(table);
        Self { dir, path }
    }

    /// Last id handed out, or 0 if none has been.
    pub fn current(&self) -> Result<u64, StoreError> {
        if !self.path.exists() {
            return Ok(0);
        }
        let content = fs::read_to_string(&self.path)?;
        let state: SequenceState = serde_json::from_str(&content)?;
        Ok(state.last)
    }

    pub fn next(&self) -> Result<u64, StoreError> {
        let next = self.current()? + 1;
        fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string(&SequenceState { last: next })?;
        write_atomic(&self.dir, &self.path, content.as_bytes())?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_starts_at_one_and_increments() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        let seq = Sequence::new(&layout, "donations");
        assert_eq!(seq.current().unwrap(), 0);
        assert_eq!(seq.next().unwrap(), 1);
        assert_eq!(seq.next().unwrap(), 2);
        assert_eq!(seq.current().unwrap(), 2);
    }

    #[test]
    fn sequences_are_independent_per_table() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        let donations = Sequence::new(&layout, "donations");
        let items = Sequence::new(&layout, "items");
        donations.next().unwrap();
        donations.next().unwrap();
        assert_eq!(items.next().unwrap(), 1);
    }

    #[test]
    fn sequence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        Sequence::new(&layout, "items").next().unwrap();
        assert_eq!(Sequence::new(&layout, "items").next().unwrap(), 2);
    }
}
