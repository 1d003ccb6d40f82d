use crate::layout::StoreLayout;
use crate::record::{load_records, read_record, scan_records, write_record};
use crate::sequence::Sequence;
use crate::types::{DonationId, UserId};
use crate::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DonationState {
    Pending,
    Claimed,
    Completed,
}

impl std::fmt::Display for DonationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DonationState::Pending => write!(f, "pending"),
            DonationState::Claimed => write!(f, "claimed"),
            DonationState::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DonationRecord {
    pub id: DonationId,
    pub provider: UserId,
    /// `None` until the donation is claimed.
    pub receiver: Option<UserId>,
    pub created_at: DateTime<Utc>,
    /// `None` until the donation is completed.
    pub completed_at: Option<DateTime<Utc>>,
}

impl DonationRecord {
    /// Completion dominates: a completed donation is `Completed` whether or
    /// not it was ever claimed.
    pub fn state(&self) -> DonationState {
        match (&self.receiver, &self.completed_at) {
            (_, Some(_)) => DonationState::Completed,
            (Some(_), None) => DonationState::Claimed,
            (None, None) => DonationState::Pending,
        }
    }
}

pub struct DonationStore {
    layout: StoreLayout,
    sequence: Sequence,
}

impl DonationStore {
    pub fn new(layout: StoreLayout) -> Self {
        let sequence = Sequence::new(&layout, "donations");
        Self { layout, sequence }
    }

    /// Allocate an id and write a new, not yet completed donation.
    pub fn insert(
        &self,
        provider: UserId,
        receiver: Option<UserId>,
        created_at: DateTime<Utc>,
    ) -> Result<DonationRecord, StoreError> {
        let id = DonationId::new(self.sequence.next()?);
        let donation = DonationRecord {
            id,
            provider,
            receiver,
            created_at,
            completed_at: None,
        };
        self.put(&donation)?;
        Ok(donation)
    }

    pub fn put(&self, donation: &DonationRecord) -> Result<(), StoreError> {
        write_record(
            &self.layout.donations_dir(),
            &donation.id.to_string(),
            donation,
        )
    }

    pub fn get(&self, id: DonationId) -> Result<DonationRecord, StoreError> {
        let key = id.to_string();
        let path = self.layout.donations_dir().join(&key);
        if !path.exists() {
            return Err(StoreError::DonationNotFound(id));
        }
        read_record(&path, &key)
    }

    pub fn exists(&self, id: DonationId) -> bool {
        self.layout.donations_dir().join(id.to_string()).exists()
    }

    /// All donations in id order.
    pub fn list(&self) -> Result<Vec<DonationRecord>, StoreError> {
        let mut donations: Vec<DonationRecord> =
            load_records(&self.layout.donations_dir(), "donation")?;
        donations.sort_by_key(|d| d.id);
        Ok(donations)
    }

    #[allow(clippy::type_complexity)]
    pub fn list_with_errors(
        &self,
    ) -> Result<Vec<Result<DonationRecord, (String, StoreError)>>, StoreError> {
        scan_records(&self.layout.donations_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_donation_store() -> (tempfile::TempDir, DonationStore) {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        layout.initialize().unwrap();
        (dir, DonationStore::new(layout))
    }

    #[test]
    fn insert_assigns_increasing_ids() {
        let (_dir, store) = test_donation_store();
        let a = store.insert("Pearl".into(), None, Utc::now()).unwrap();
        let b = store.insert("Pearl".into(), None, Utc::now()).unwrap();
        assert_eq!(a.id.get(), 1);
        assert_eq!(b.id.get(), 2);
        assert_eq!(store.get(b.id).unwrap(), b);
    }

    #[test]
    fn state_follows_receiver_and_completion() {
        let (_dir, store) = test_donation_store();
        let mut d = store.insert("Pearl".into(), None, Utc::now()).unwrap();
        assert_eq!(d.state(), DonationState::Pending);

        d.receiver = Some("Ruby".into());
        assert_eq!(d.state(), DonationState::Claimed);

        d.completed_at = Some(Utc::now());
        assert_eq!(d.state(), DonationState::Completed);

        d.receiver = None;
        assert_eq!(d.state(), DonationState::Completed);
    }

    #[test]
    fn pre_claimed_insert() {
        let (_dir, store) = test_donation_store();
        let d = store
            .insert("Pearl".into(), Some("Ruby".into()), Utc::now())
            .unwrap();
        assert_eq!(store.get(d.id).unwrap().state(), DonationState::Claimed);
    }

    #[test]
    fn put_updates_in_place() {
        let (_dir, store) = test_donation_store();
        let mut d = store.insert("Pearl".into(), None, Utc::now()).unwrap();
        d.completed_at = Some(Utc::now());
        store.put(&d).unwrap();
        assert_eq!(store.get(d.id).unwrap().state(), DonationState::Completed);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn missing_donation_not_found() {
        let (_dir, store) = test_donation_store();
        assert!(!store.exists(DonationId::new(9)));
        assert!(matches!(
            store.get(DonationId::new(9)),
            Err(StoreError::DonationNotFound(_))
        ));
    }

    #[test]
    fn list_orders_numerically() {
        let (_dir, store) = test_donation_store();
        for _ in 0..11 {
            store.insert("Pearl".into(), None, Utc::now()).unwrap();
        }
        let ids: Vec<u64> = store.list().unwrap().iter().map(|d| d.id.get()).collect();
        assert_eq!(ids, (1..=11).collect::<Vec<_>>());
    }

    #[test]
    fn state_display() {
        assert_eq!(DonationState::Pending.to_string(), "pending");
        assert_eq!(DonationState::Claimed.to_string(), "claimed");
        assert_eq!(DonationState::Completed.to_string(), "completed");
    }
}
