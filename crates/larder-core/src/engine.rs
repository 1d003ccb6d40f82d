use crate::auth::{hash_password, normalize_scan_count, validate_grant, verify_password};
use crate::concurrency::StoreLock;
use crate::lifecycle::{validate_transition, StatusFilter};
use crate::CoreError;
use chrono::{DateTime, Utc};
use larder_store::{
    validate_key, BarcodeCode, BarcodeRecord, BarcodeStore, DonationId, DonationRecord,
    DonationState, DonationStore, ItemId, ItemRecord, ItemStore, NewItem, Permissions,
    StoreLayout, UserId, UserRecord, UserStore,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// What a successful [`Engine::write_user`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    /// The store had no users; the new user became root with the full mask.
    Bootstrapped,
    Created,
    /// An existing user owned by the same parent had its mask replaced.
    Updated,
}

impl std::fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteOutcome::Bootstrapped => write!(f, "bootstrapped"),
            WriteOutcome::Created => write!(f, "created"),
            WriteOutcome::Updated => write!(f, "updated"),
        }
    }
}

/// Central engine for user provisioning and the donation lifecycle.
///
/// Every mutating method holds the store lock from its first read to its
/// last write, so check-then-act sequences (grant checks, item aggregation,
/// claims) are not interleaved across threads or processes.
pub struct Engine {
    layout: StoreLayout,
    users: UserStore,
    barcodes: BarcodeStore,
    donations: DonationStore,
    items: ItemStore,
}

impl Engine {
    /// Create an engine rooted at the given store directory.
    ///
    /// Nothing is written until the first mutation or [`initialize`](Self::initialize).
    pub fn new(store_root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = store_root.into();
        let layout = StoreLayout::new(&root);
        Self {
            users: UserStore::new(layout.clone()),
            barcodes: BarcodeStore::new(layout.clone()),
            donations: DonationStore::new(layout.clone()),
            items: ItemStore::new(layout.clone()),
            layout,
        }
    }

    pub fn store_layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn initialize(&self) -> Result<(), CoreError> {
        let _lock = self.lock()?;
        Ok(())
    }

    fn lock(&self) -> Result<StoreLock, CoreError> {
        let lock = StoreLock::acquire(&self.layout)?;
        self.layout.initialize()?;
        Ok(lock)
    }

    // Users

    /// True once the first user has been written.
    pub fn is_bootstrapped(&self) -> Result<bool, CoreError> {
        Ok(!self.users.is_empty()?)
    }

    /// Check a user id / password pair. Unknown users are simply invalid.
    pub fn validate_credentials(&self, user_id: &str, password: &str) -> Result<bool, CoreError> {
        if !self.users.exists(user_id) {
            debug!("credential check for unknown user '{user_id}'");
            return Ok(false);
        }
        let user = self.users.get(user_id)?;
        Ok(verify_password(password, &user.password_hash))
    }

    /// Validate credentials and require that the user holds every bit of `required`.
    pub fn authorize(
        &self,
        user_id: &str,
        password: &str,
        required: Permissions,
    ) -> Result<UserRecord, CoreError> {
        if !self.validate_credentials(user_id, password)? {
            warn!("rejected credentials for '{user_id}'");
            return Err(CoreError::InvalidCredentials(user_id.to_owned()));
        }
        let user = self.users.get(user_id)?;
        if !user.permissions.contains(required) {
            return Err(CoreError::PermissionDenied(format!(
                "user '{user_id}' ({}) lacks {}",
                user.permissions,
                required.names().join("+")
            )));
        }
        Ok(user)
    }

    /// Create a user, or update the mask of a user owned by `parent_id`.
    ///
    /// The first user ever written becomes root: it gets [`Permissions::FULL`]
    /// whatever was requested and has no parent. After that, `parent_id` must
    /// name an existing user whose mask permits the grant (see
    /// [`validate_grant`]). An existing user is only updated when its stored
    /// parent is `parent_id`; its password is never changed here.
    pub fn write_user(
        &self,
        parent_id: Option<&str>,
        user_id: &str,
        requested: Permissions,
        password: &str,
    ) -> Result<WriteOutcome, CoreError> {
        let _lock = self.lock()?;
        validate_key("user id", user_id)?;

        if self.users.is_empty()? {
            let granted = validate_grant(Permissions::NONE, requested, true)?;
            if let Some(parent) = parent_id {
                debug!("ignoring parent '{parent}' for bootstrap user '{user_id}'");
            }
            self.users.insert(&UserRecord {
                user_id: user_id.into(),
                parent_id: None,
                permissions: granted,
                password_hash: hash_password(password),
                created_at: Utc::now(),
            })?;
            self.confirm_permissions(user_id, granted)?;
            info!("bootstrapped store with root user '{user_id}' ({granted})");
            return Ok(WriteOutcome::Bootstrapped);
        }

        let parent_id = parent_id.ok_or_else(|| {
            CoreError::PermissionDenied(format!(
                "user '{user_id}' needs a parent once the store is bootstrapped"
            ))
        })?;
        let parent = self.users.get(parent_id)?;
        let granted = validate_grant(parent.permissions, requested, false).map_err(|e| {
            warn!("'{parent_id}' ({}) may not grant {requested} to '{user_id}': {e}", parent.permissions);
            e
        })?;

        let outcome = if self.users.exists(user_id) {
            let mut user = self.users.get(user_id)?;
            if user.parent_id.as_deref() != Some(parent_id) {
                let owner = user
                    .parent_id
                    .as_ref()
                    .map_or_else(|| "no one".to_owned(), |p| format!("'{p}'"));
                warn!("'{parent_id}' does not own '{user_id}'; leaving it unchanged");
                return Err(CoreError::OwnershipConflict {
                    user: user_id.to_owned(),
                    owner,
                    parent: parent_id.to_owned(),
                });
            }
            user.permissions = granted;
            self.users.put(&user)?;
            info!("updated '{user_id}' permissions to {granted}");
            WriteOutcome::Updated
        } else {
            self.users.insert(&UserRecord {
                user_id: user_id.into(),
                parent_id: Some(parent_id.into()),
                permissions: granted,
                password_hash: hash_password(password),
                created_at: Utc::now(),
            })?;
            info!("created user '{user_id}' under '{parent_id}' ({granted})");
            WriteOutcome::Created
        };

        self.confirm_permissions(user_id, granted)?;
        Ok(outcome)
    }

    fn confirm_permissions(&self, user_id: &str, expected: Permissions) -> Result<(), CoreError> {
        let stored = self.users.get(user_id)?.permissions;
        if stored == expected {
            Ok(())
        } else {
            Err(CoreError::Inconsistent(format!(
                "user '{user_id}' has mask {stored} after writing {expected}"
            )))
        }
    }

    /// Replace a user's password after checking the current one.
    pub fn change_password(
        &self,
        user_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), CoreError> {
        let _lock = self.lock()?;
        if !self.validate_credentials(user_id, old_password)? {
            warn!("rejected password change for '{user_id}'");
            return Err(CoreError::InvalidCredentials(user_id.to_owned()));
        }
        let mut user = self.users.get(user_id)?;
        user.password_hash = hash_password(new_password);
        self.users.put(&user)?;
        info!("changed password for '{user_id}'");
        Ok(())
    }

    pub fn get_user(&self, user_id: &str) -> Result<UserRecord, CoreError> {
        Ok(self.users.get(user_id)?)
    }

    pub fn list_users(&self) -> Result<Vec<UserRecord>, CoreError> {
        Ok(self.users.list()?)
    }

    // Barcodes

    /// Register a barcode. Existing codes are rejected with `DuplicateKey`.
    pub fn add_barcode(
        &self,
        code: &str,
        title: &str,
        unit: &str,
    ) -> Result<BarcodeRecord, CoreError> {
        let _lock = self.lock()?;
        let barcode = BarcodeRecord {
            code: code.into(),
            title: title.to_owned(),
            unit: unit.to_owned(),
        };
        self.barcodes.insert(&barcode)?;
        info!("registered barcode {code} as '{title}' ({unit})");
        Ok(barcode)
    }

    pub fn get_barcode(&self, code: &str) -> Result<BarcodeRecord, CoreError> {
        Ok(self.barcodes.get(code)?)
    }

    pub fn list_barcodes(&self) -> Result<Vec<BarcodeRecord>, CoreError> {
        Ok(self.barcodes.list()?)
    }

    // Donations

    /// Open a donation for `provider`. Supplying `receiver` creates it
    /// already claimed.
    pub fn start_donation(
        &self,
        provider: &str,
        receiver: Option<&str>,
    ) -> Result<DonationId, CoreError> {
        let _lock = self.lock()?;
        validate_key("provider id", provider)?;
        if let Some(r) = receiver {
            validate_key("receiver id", r)?;
        }
        let donation = self
            .donations
            .insert(provider.into(), receiver.map(UserId::from), Utc::now())?;
        info!(
            "started donation {} for '{provider}' ({})",
            donation.id,
            donation.state()
        );
        Ok(donation.id)
    }

    /// Add `count` of `title` in `unit` to a donation, merging into the
    /// existing `(title, unit)` item if there is one.
    pub fn add_item_manual(
        &self,
        donation: DonationId,
        title: &str,
        count: i64,
        unit: &str,
    ) -> Result<ItemId, CoreError> {
        let _lock = self.lock()?;
        if !self.donations.exists(donation) {
            return Err(CoreError::DonationNotFound(donation));
        }
        self.aggregate_item(donation, None, title, unit, count)
    }

    /// Add a scanned barcode to a donation. Counts below 1 are recorded as 1.
    pub fn add_item_barcode(
        &self,
        donation: DonationId,
        code: &str,
        count: i64,
    ) -> Result<ItemId, CoreError> {
        let _lock = self.lock()?;
        if !self.donations.exists(donation) {
            return Err(CoreError::DonationNotFound(donation));
        }
        let barcode = self.barcodes.get(code)?;
        let count = normalize_scan_count(count);
        self.aggregate_item(
            donation,
            Some(barcode.code),
            &barcode.title,
            &barcode.unit,
            count,
        )
    }

    fn aggregate_item(
        &self,
        donation: DonationId,
        barcode: Option<BarcodeCode>,
        title: &str,
        unit: &str,
        count: i64,
    ) -> Result<ItemId, CoreError> {
        if let Some(mut item) = self.items.find_by_key(donation, title, unit)? {
            item.count = item.count.checked_add(count).ok_or_else(|| {
                CoreError::CountOverflow(format!(
                    "item {} '{title}' at {} + {count}",
                    item.id, item.count
                ))
            })?;
            if barcode.is_some() {
                item.barcode = barcode;
            }
            self.items.put(&item)?;
            debug!(
                "donation {donation}: '{title}' ({unit}) now {} (item {})",
                item.count, item.id
            );
            Ok(item.id)
        } else {
            let item = self.items.insert(NewItem {
                donation_id: donation,
                barcode,
                title: title.to_owned(),
                count,
                unit: unit.to_owned(),
            })?;
            debug!(
                "donation {donation}: new item {} '{title}' x{count} {unit}",
                item.id
            );
            Ok(item.id)
        }
    }

    pub fn get_donation(&self, donation: DonationId) -> Result<DonationRecord, CoreError> {
        Ok(self.donations.get(donation)?)
    }

    /// Donations started by `provider`, selected by `filter`.
    ///
    /// An empty filter returns nothing without reading the store.
    pub fn list_donations(
        &self,
        provider: &str,
        filter: StatusFilter,
    ) -> Result<Vec<DonationRecord>, CoreError> {
        if filter.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .donations
            .list()?
            .into_iter()
            .filter(|d| d.provider == provider && filter.matches(d.state()))
            .collect())
    }

    /// Donations claimed by `receiver`, selected by `filter`.
    pub fn list_receiver_donations(
        &self,
        receiver: &str,
        filter: StatusFilter,
    ) -> Result<Vec<DonationRecord>, CoreError> {
        if filter.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .donations
            .list()?
            .into_iter()
            .filter(|d| {
                d.receiver.as_deref() == Some(receiver) && filter.matches(d.state())
            })
            .collect())
    }

    /// Every donation, from any provider, that has not been completed.
    pub fn list_open_donations(&self) -> Result<Vec<DonationRecord>, CoreError> {
        Ok(self
            .donations
            .list()?
            .into_iter()
            .filter(|d| d.completed_at.is_none())
            .collect())
    }

    pub fn get_items(&self, donation: DonationId) -> Result<Vec<ItemRecord>, CoreError> {
        Ok(self.items.list_for_donation(donation)?)
    }

    /// Assign `receiver` to a pending donation.
    ///
    /// Claimed or completed donations are rejected unchanged. The write is
    /// read back before success is reported.
    pub fn claim(&self, donation: DonationId, receiver: &str) -> Result<(), CoreError> {
        let _lock = self.lock()?;
        validate_key("receiver id", receiver)?;
        let mut record = self.donations.get(donation)?;
        validate_transition(record.state(), DonationState::Claimed).map_err(|e| {
            warn!("'{receiver}' cannot claim donation {donation}: {e}");
            e
        })?;

        record.receiver = Some(receiver.into());
        self.donations.put(&record)?;

        let stored = self.donations.get(donation)?;
        if stored.receiver.as_deref() != Some(receiver) || stored.completed_at.is_some() {
            return Err(CoreError::Inconsistent(format!(
                "donation {donation} did not record claim by '{receiver}'"
            )));
        }
        info!("donation {donation} claimed by '{receiver}'");
        Ok(())
    }

    /// Stamp a pending or claimed donation as completed now.
    ///
    /// Completing an already completed donation is an invalid transition and
    /// leaves the original completion time in place.
    pub fn complete(&self, donation: DonationId) -> Result<DateTime<Utc>, CoreError> {
        let _lock = self.lock()?;
        let record = self.donations.get(donation)?;
        self.stamp_completed(record)
    }

    /// [`Engine::complete`] on behalf of `user_id`, who must be the
    /// donation's provider or its receiver at the time of the call.
    pub fn complete_as(
        &self,
        donation: DonationId,
        user_id: &str,
    ) -> Result<DateTime<Utc>, CoreError> {
        let _lock = self.lock()?;
        let record = self.donations.get(donation)?;
        if record.provider != user_id && record.receiver.as_deref() != Some(user_id) {
            warn!("'{user_id}' is not a party to donation {donation}");
            return Err(CoreError::PermissionDenied(format!(
                "'{user_id}' is neither provider nor receiver of donation {donation}"
            )));
        }
        self.stamp_completed(record)
    }

    fn stamp_completed(&self, mut record: DonationRecord) -> Result<DateTime<Utc>, CoreError> {
        validate_transition(record.state(), DonationState::Completed)?;

        let now = Utc::now();
        record.completed_at = Some(now);
        self.donations.put(&record)?;
        info!("donation {} completed", record.id);
        Ok(now)
    }
}
