use crate::layout::StoreLayout;
use crate::record::{load_records, read_record, scan_records, validate_key, write_record};
use crate::types::BarcodeCode;
use crate::StoreError;
use serde::{Deserialize, Serialize};

/// Lookup entry resolving a scanned code to an item title and unit label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BarcodeRecord {
    pub code: BarcodeCode,
    pub title: String,
    pub unit: String,
}

pub struct BarcodeStore {
    layout: StoreLayout,
}

impl BarcodeStore {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    /// Register a barcode. Barcodes are immutable: an existing code is
    /// rejected with `DuplicateKey` and left untouched.
    pub fn insert(&self, barcode: &BarcodeRecord) -> Result<(), StoreError> {
        validate_key("barcode", &barcode.code)?;
        if self.exists(&barcode.code) {
            return Err(StoreError::DuplicateKey {
                table: "barcodes",
                key: barcode.code.to_string(),
            });
        }
        write_record(&self.layout.barcodes_dir(), &barcode.code, barcode)
    }

    pub fn get(&self, code: &str) -> Result<BarcodeRecord, StoreError> {
        validate_key("barcode", code)?;
        let path = self.layout.barcodes_dir().join(code);
        if !path.exists() {
            return Err(StoreError::BarcodeNotFound(code.to_owned()));
        }
        read_record(&path, code)
    }

    pub fn exists(&self, code: &str) -> bool {
        validate_key("barcode", code).is_ok() && self.layout.barcodes_dir().join(code).exists()
    }

    pub fn list(&self) -> Result<Vec<BarcodeRecord>, StoreError> {
        let mut barcodes: Vec<BarcodeRecord> =
            load_records(&self.layout.barcodes_dir(), "barcode")?;
        barcodes.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(barcodes)
    }

    #[allow(clippy::type_complexity)]
    pub fn list_with_errors(
        &self,
    ) -> Result<Vec<Result<BarcodeRecord, (String, StoreError)>>, StoreError> {
        scan_records(&self.layout.barcodes_dir())
    }
}
