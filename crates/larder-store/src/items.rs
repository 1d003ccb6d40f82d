use crate::layout::StoreLayout;
use crate::record::{load_records, scan_records, write_record};
use crate::sequence::Sequence;
use crate::types::{BarcodeCode, DonationId, ItemId};
use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemRecord {
    pub id: ItemId,
    pub donation_id: DonationId,
    #[serde(default)]
    pub barcode: Option<BarcodeCode>,
    pub title: String,
    pub count: i64,
    pub unit: String,
}

impl ItemRecord {
    /// Whether this item aggregates additions of `title` measured in `unit`.
    pub fn matches_key(&self, title: &str, unit: &str) -> bool {
        self.title == title && self.unit == unit
    }
}

/// Fields for an item that has not been assigned an id yet.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub donation_id: DonationId,
    pub barcode: Option<BarcodeCode>,
    pub title: String,
    pub count: i64,
    pub unit: String,
}

pub struct ItemStore {
    layout: StoreLayout,
    sequence: Sequence,
}

impl ItemStore {
    pub fn new(layout: StoreLayout) -> Self {
        let sequence = Sequence::new(&layout, "items");
        Self { layout, sequence }
    }

    pub fn insert(&self, item: NewItem) -> Result<ItemRecord, StoreError> {
        let id = ItemId::new(self.sequence.next()?);
        let record = ItemRecord {
            id,
            donation_id: item.donation_id,
            barcode: item.barcode,
            title: item.title,
            count: item.count,
            unit: item.unit,
        };
        self.put(&record)?;
        Ok(record)
    }

    pub fn put(&self, item: &ItemRecord) -> Result<(), StoreError> {
        let dir = self.layout.donation_items_dir(item.donation_id);
        fs::create_dir_all(&dir)?;
        write_record(&dir, &item.id.to_string(), item)
    }

    /// The item in `donation` aggregating `(title, unit)`, if one exists.
    ///
    /// Unlike the listing, any unreadable item in the donation fails the
    /// lookup, since it may be the match.
    pub fn find_by_key(
        &self,
        donation: DonationId,
        title: &str,
        unit: &str,
    ) -> Result<Option<ItemRecord>, StoreError> {
        let mut items = Vec::new();
        for result in scan_records::<ItemRecord>(&self.layout.donation_items_dir(donation))? {
            items.push(result.map_err(|(_, e)| e)?);
        }
        items.sort_by_key(|i| i.id);
        Ok(items.into_iter().find(|item| item.matches_key(title, unit)))
    }

    /// Items of one donation in id order; empty if it has none.
    pub fn list_for_donation(&self, donation: DonationId) -> Result<Vec<ItemRecord>, StoreError> {
        let mut items: Vec<ItemRecord> =
            load_records(&self.layout.donation_items_dir(donation), "item")?;
        items.sort_by_key(|i| i.id);
        Ok(items)
    }

    /// Every item in the store, grouped by donation directory.
    #[allow(clippy::type_complexity)]
    pub fn list_all_with_errors(
        &self,
    ) -> Result<Vec<Result<ItemRecord, (String, StoreError)>>, StoreError> {
        let dir = self.layout.items_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut results = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                let group = entry.file_name().to_string_lossy().into_owned();
                for result in scan_records::<ItemRecord>(&entry.path())? {
                    results.push(result.map_err(|(name, e)| (format!("{group}/{name}"), e)));
                }
            }
        }
        Ok(results)
    }
}
