//! Credential hashing and the hierarchical permission rules.
//!
//! The capability lattice is `admin > organization > {receiver, provider}`.
//! A parent may only grant what it could itself hold under that lattice, and
//! may never grant a role bit it lacks.

use crate::CoreError;
use larder_store::Permissions;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// SHA-256 hex digest of a password.
pub fn hash_password(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
}

/// Compare a password against a stored digest in constant time.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let candidate = hash_password(password);
    candidate.as_bytes().ct_eq(stored_hash.as_bytes()).into()
}

/// Decide the mask a user ends up with when `parent` grants `requested`.
///
/// The bootstrap grant ignores both masks and yields [`Permissions::FULL`].
/// Otherwise, in order:
/// 1. the admin bit requires an admin parent;
/// 2. the organization bit requires an admin parent;
/// 3. at least one role bit must be requested, and every requested role bit
///    must be held by the parent.
pub fn validate_grant(
    parent: Permissions,
    requested: Permissions,
    bootstrap: bool,
) -> Result<Permissions, CoreError> {
    if bootstrap {
        return Ok(Permissions::FULL);
    }

    if requested.contains(Permissions::ADMIN) && !parent.contains(Permissions::ADMIN) {
        return Err(CoreError::PermissionDenied(
            "only an admin may grant admin".to_owned(),
        ));
    }

    if requested.contains(Permissions::ORGANIZATION) && !parent.contains(Permissions::ADMIN) {
        return Err(CoreError::PermissionDenied(
            "only an admin may grant organization".to_owned(),
        ));
    }

    let roles = requested.roles();
    if roles.is_empty() {
        return Err(CoreError::PermissionDenied(
            "at least one of receiver or provider must be granted".to_owned(),
        ));
    }
    if !parent.roles().contains(roles) {
        let missing: Vec<_> = roles
            .names()
            .into_iter()
            .filter(|name| !parent.names().contains(name))
            .collect();
        return Err(CoreError::PermissionDenied(format!(
            "parent does not hold role {}",
            missing.join("+")
        )));
    }

    Ok(requested)
}

/// Barcode scans count at least one unit each, so zero and negative counts
/// are raised to 1.
pub const fn normalize_scan_count(count: i64) -> i64 {
    if count < 1 {
        1
    } else {
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(bits: u8) -> Permissions {
        Permissions::from_bits(bits).unwrap()
    }

    fn all_masks() -> impl Iterator<Item = Permissions> {
        (0u8..16).map(mask)
    }

    #[test]
    fn hash_is_sha256_hex() {
        assert_eq!(
            hash_password("admin"),
            "8c6976e5b5410415bde908bd4dee15dfb167a9c873fc4bb8a81f6f2ab448a918"
        );
    }

    #[test]
    fn verify_password_matches_only_same_input() {
        let stored = hash_password("hunter2");
        assert!(verify_password("hunter2", &stored));
        assert!(!verify_password("hunter3", &stored));
        assert!(!verify_password("hunter2", ""));
    }

    #[test]
    fn bootstrap_always_yields_full_mask() {
        for requested in all_masks() {
            assert_eq!(
                validate_grant(Permissions::NONE, requested, true).unwrap(),
                Permissions::FULL
            );
        }
    }

    #[test]
    fn admin_can_grant_everything_with_a_role() {
        for requested in all_masks().filter(|m| !m.roles().is_empty()) {
            assert_eq!(
                validate_grant(Permissions::FULL, requested, false).unwrap(),
                requested
            );
        }
    }

    #[test]
    fn non_admin_cannot_grant_admin_or_organization() {
        let org = Permissions::ORGANIZATION | Permissions::ROLES;
        assert!(validate_grant(org, Permissions::ADMIN | Permissions::PROVIDER, false).is_err());
        assert!(
            validate_grant(org, Permissions::ORGANIZATION | Permissions::PROVIDER, false).is_err()
        );
        assert!(validate_grant(org, Permissions::PROVIDER, false).is_ok());
    }

    #[test]
    fn role_must_be_requested() {
        assert!(validate_grant(Permissions::FULL, Permissions::ADMIN, false).is_err());
        assert!(validate_grant(Permissions::FULL, Permissions::NONE, false).is_err());
    }

    #[test]
    fn parent_cannot_grant_role_it_lacks() {
        let provider_org = Permissions::ORGANIZATION | Permissions::PROVIDER;
        let err = validate_grant(provider_org, Permissions::RECEIVER, false).unwrap_err();
        assert!(err.to_string().contains("receiver"));
        assert!(validate_grant(provider_org, Permissions::ROLES, false).is_err());
        assert_eq!(
            validate_grant(provider_org, Permissions::PROVIDER, false).unwrap(),
            Permissions::PROVIDER
        );
    }

    // Exhaustive over every (parent, requested) pair.
    #[test]
    fn accepted_grants_never_exceed_parent_roles() {
        for parent in all_masks() {
            for requested in all_masks() {
                if let Ok(granted) = validate_grant(parent, requested, false) {
                    assert_eq!(granted, requested);
                    assert!(parent.roles().contains(granted.roles()));
                    assert!(!granted.roles().is_empty());
                    if granted.intersects(Permissions::ADMIN | Permissions::ORGANIZATION) {
                        assert!(parent.contains(Permissions::ADMIN));
                    }
                }
            }
        }
    }

    #[test]
    fn scan_count_normalization() {
        assert_eq!(normalize_scan_count(0), 1);
        assert_eq!(normalize_scan_count(-4), 1);
        assert_eq!(normalize_scan_count(1), 1);
        assert_eq!(normalize_scan_count(12), 12);
    }
}
