use crate::barcodes::BarcodeStore;
use crate::donations::DonationStore;
use crate::items::ItemStore;
use crate::layout::StoreLayout;
use crate::users::UserStore;
use crate::StoreError;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct TableReport {
    pub checked: usize,
    pub passed: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct IntegrityReport {
    pub users: TableReport,
    pub barcodes: TableReport,
    pub donations: TableReport,
    pub items: TableReport,
    pub failed: Vec<IntegrityFailure>,
}

impl IntegrityReport {
    pub fn checked(&self) -> usize {
        self.users.checked + self.barcodes.checked + self.donations.checked + self.items.checked
    }

    pub fn passed(&self) -> usize {
        self.users.passed + self.barcodes.passed + self.donations.passed + self.items.passed
    }
}

#[derive(Debug, Serialize)]
pub struct IntegrityFailure {
    pub table: &'static str,
    pub key: String,
    pub reason: String,
}

fn read_failure(table: &'static str, key: String, e: &StoreError) -> IntegrityFailure {
    let reason = match e {
        StoreError::IntegrityFailure { actual, .. } => format!("checksum mismatch: got {actual}"),
        other => format!("read error: {other}"),
    };
    IntegrityFailure { table, key, reason }
}

/// Verify every record checksum, then check references between tables.
///
/// A record counts as passed only if it reads cleanly and every record it
/// references (parent user, donation, barcode) exists.
pub fn verify_store_integrity(layout: &StoreLayout) -> Result<IntegrityReport, StoreError> {
    let users = UserStore::new(layout.clone()).list_with_errors()?;
    let barcodes = BarcodeStore::new(layout.clone()).list_with_errors()?;
    let donations = DonationStore::new(layout.clone()).list_with_errors()?;
    let items = ItemStore::new(layout.clone()).list_all_with_errors()?;

    let mut report = IntegrityReport {
        users: TableReport {
            checked: users.len(),
            passed: 0,
        },
        barcodes: TableReport {
            checked: barcodes.len(),
            passed: 0,
        },
        donations: TableReport {
            checked: donations.len(),
            passed: 0,
        },
        items: TableReport {
            checked: items.len(),
            passed: 0,
        },
        failed: Vec::new(),
    };

    let user_ids: HashSet<String> = users
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|u| u.user_id.to_string())
        .collect();
    let codes: HashSet<String> = barcodes
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|b| b.code.to_string())
        .collect();
    let donation_ids: HashSet<u64> = donations
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|d| d.id.get())
        .collect();

    for result in users {
        match result {
            Ok(user) => match &user.parent_id {
                Some(parent) if !user_ids.contains(parent.as_str()) => {
                    report.failed.push(IntegrityFailure {
                        table: "users",
                        key: user.user_id.to_string(),
                        reason: format!("parent '{parent}' does not exist"),
                    });
                }
                _ => report.users.passed += 1,
            },
            Err((key, e)) => report.failed.push(read_failure("users", key, &e)),
        }
    }

    for result in barcodes {
        match result {
            Ok(_) => report.barcodes.passed += 1,
            Err((key, e)) => report.failed.push(read_failure("barcodes", key, &e)),
        }
    }

    for result in donations {
        match result {
            Ok(_) => report.donations.passed += 1,
            Err((key, e)) => report.failed.push(read_failure("donations", key, &e)),
        }
    }

    for result in items {
        match result {
            Ok(item) => {
                let key = format!("{}/{}", item.donation_id, item.id);
                if !donation_ids.contains(&item.donation_id.get()) {
                    report.failed.push(IntegrityFailure {
                        table: "items",
                        key,
                        reason: format!("donation {} does not exist", item.donation_id),
                    });
                } else if let Some(code) = item.barcode.as_ref().filter(|c| !codes.contains(c.as_str())) {
                    report.failed.push(IntegrityFailure {
                        table: "items",
                        key,
                        reason: format!("barcode '{code}' is not registered"),
                    });
                } else {
                    report.items.passed += 1;
                }
            }
            Err((key, e)) => report.failed.push(read_failure("items", key, &e)),
        }
    }

    Ok(report)
}
