use crate::layout::StoreLayout;
use crate::record::{load_records, read_record, scan_records, validate_key, write_record};
use crate::types::UserId;
use crate::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::ops::BitOr;
use std::str::FromStr;

/// 4-bit capability mask: admin, organization, receiver, provider (MSB first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Permissions(u8);

impl Permissions {
    pub const NONE: Self = Self(0);
    pub const PROVIDER: Self = Self(0b0001);
    pub const RECEIVER: Self = Self(0b0010);
    pub const ORGANIZATION: Self = Self(0b0100);
    pub const ADMIN: Self = Self(0b1000);
    /// Both role bits.
    pub const ROLES: Self = Self(0b0011);
    pub const FULL: Self = Self(0b1111);

    pub const fn from_bits(bits: u8) -> Option<Self> {
        if bits & !Self::FULL.0 == 0 {
            Some(Self(bits))
        } else {
            None
        }
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// The role bits (receiver, provider) of this mask.
    #[inline]
    pub const fn roles(self) -> Self {
        Self(self.0 & Self::ROLES.0)
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Lowercase names of the set bits, most significant first.
    pub fn names(self) -> Vec<&'static str> {
        [
            (Self::ADMIN, "admin"),
            (Self::ORGANIZATION, "organization"),
            (Self::RECEIVER, "receiver"),
            (Self::PROVIDER, "provider"),
        ]
        .into_iter()
        .filter(|(bit, _)| self.contains(*bit))
        .map(|(_, name)| name)
        .collect()
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "admin" => Some(Self::ADMIN),
            "organization" | "org" => Some(Self::ORGANIZATION),
            "receiver" => Some(Self::RECEIVER),
            "provider" => Some(Self::PROVIDER),
            "full" | "all" => Some(Self::FULL),
            "none" => Some(Self::NONE),
            _ => None,
        }
    }
}

impl BitOr for Permissions {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04b}", self.0)
    }
}

impl TryFrom<u8> for Permissions {
    type Error = StoreError;
    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        Self::from_bits(bits)
            .ok_or_else(|| StoreError::InvalidPermissions(format!("{bits:#b} exceeds 4 bits")))
    }
}

impl From<Permissions> for u8 {
    fn from(p: Permissions) -> u8 {
        p.0
    }
}

/// Accepts `0b0110`, `0x6`, `6`, or names joined by `+` (`organization+receiver`).
impl FromStr for Permissions {
    type Err = StoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let invalid = || StoreError::InvalidPermissions(format!("cannot parse '{s}'"));
        let bits = if let Some(bin) = s.strip_prefix("0b") {
            u8::from_str_radix(bin, 2).map_err(|_| invalid())?
        } else if let Some(hex) = s.strip_prefix("0x") {
            u8::from_str_radix(hex, 16).map_err(|_| invalid())?
        } else if s.bytes().all(|b| b.is_ascii_digit()) && !s.is_empty() {
            s.parse::<u8>().map_err(|_| invalid())?
        } else {
            let mut mask = Self::NONE;
            for part in s.split('+') {
                mask = mask | Self::from_name(part.trim()).ok_or_else(invalid)?;
            }
            return Ok(mask);
        };
        Self::try_from(bits)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: UserId,
    /// Owning user. `None` only for the bootstrap user.
    pub parent_id: Option<UserId>,
    pub permissions: Permissions,
    /// SHA-256 hex digest of the password.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

pub struct UserStore {
    layout: StoreLayout,
}

impl UserStore {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    /// Insert a new user; fails with `DuplicateKey` if the id is taken.
    pub fn insert(&self, user: &UserRecord) -> Result<(), StoreError> {
        validate_key("user id", &user.user_id)?;
        if self.exists(&user.user_id) {
            return Err(StoreError::DuplicateKey {
                table: "users",
                key: user.user_id.to_string(),
            });
        }
        self.put(user)
    }

    /// Insert or overwrite the user keyed by `user.user_id`.
    pub fn put(&self, user: &UserRecord) -> Result<(), StoreError> {
        validate_key("user id", &user.user_id)?;
        write_record(&self.layout.users_dir(), &user.user_id, user)
    }

    pub fn get(&self, user_id: &str) -> Result<UserRecord, StoreError> {
        validate_key("user id", user_id)?;
        let path = self.layout.users_dir().join(user_id);
        if !path.exists() {
            return Err(StoreError::UserNotFound(user_id.to_owned()));
        }
        read_record(&path, user_id)
    }

    pub fn exists(&self, user_id: &str) -> bool {
        validate_key("user id", user_id).is_ok() && self.layout.users_dir().join(user_id).exists()
    }

    /// True when no user record has ever been written.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        let dir = self.layout.users_dir();
        if !dir.exists() {
            return Ok(true);
        }
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file()
                && !entry.file_name().to_string_lossy().starts_with('.')
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn list(&self) -> Result<Vec<UserRecord>, StoreError> {
        let mut users: Vec<UserRecord> = load_records(&self.layout.users_dir(), "user")?;
        users.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(users)
    }

    #[allow(clippy::type_complexity)]
    pub fn list_with_errors(
        &self,
    ) -> Result<Vec<Result<UserRecord, (String, StoreError)>>, StoreError> {
        scan_records(&self.layout.users_dir())
    }
}
