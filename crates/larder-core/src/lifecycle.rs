use crate::CoreError;
use larder_store::DonationState;

/// Donations only move forward: pending → claimed → completed, with pending
/// allowed to complete directly. Nothing leaves `Completed`.
pub fn validate_transition(from: DonationState, to: DonationState) -> Result<(), CoreError> {
    let valid = matches!(
        (from, to),
        (DonationState::Pending, DonationState::Claimed | DonationState::Completed)
            | (DonationState::Claimed, DonationState::Completed)
    );

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// Two-flag selector over the status partitions of a donation listing.
///
/// The pending flag selects donations whose completion is unset (pending and
/// claimed); the completed flag selects completed ones. The flags are ORed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusFilter {
    pub pending: bool,
    pub completed: bool,
}

impl StatusFilter {
    pub const NONE: Self = Self {
        pending: false,
        completed: false,
    };
    pub const PENDING: Self = Self {
        pending: true,
        completed: false,
    };
    pub const COMPLETED: Self = Self {
        pending: false,
        completed: true,
    };
    pub const ALL: Self = Self {
        pending: true,
        completed: true,
    };

    /// `0b01` selects pending, `0b10` completed; higher bits are ignored.
    pub const fn from_bits(bits: u8) -> Self {
        Self {
            pending: bits & 0b01 != 0,
            completed: bits & 0b10 != 0,
        }
    }

    pub const fn is_empty(self) -> bool {
        !self.pending && !self.completed
    }

    pub fn matches(self, state: DonationState) -> bool {
        match state {
            DonationState::Pending | DonationState::Claimed => self.pending,
            DonationState::Completed => self.completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions() {
        assert!(validate_transition(DonationState::Pending, DonationState::Claimed).is_ok());
        assert!(validate_transition(DonationState::Pending, DonationState::Completed).is_ok());
        assert!(validate_transition(DonationState::Claimed, DonationState::Completed).is_ok());
    }

    #[test]
    fn invalid_transitions() {
        assert!(validate_transition(DonationState::Claimed, DonationState::Claimed).is_err());
        assert!(validate_transition(DonationState::Completed, DonationState::Claimed).is_err());
        assert!(validate_transition(DonationState::Completed, DonationState::Completed).is_err());
        assert!(validate_transition(DonationState::Claimed, DonationState::Pending).is_err());
        assert!(validate_transition(DonationState::Completed, DonationState::Pending).is_err());
        assert!(validate_transition(DonationState::Pending, DonationState::Pending).is_err());
    }

    #[test]
    fn invalid_transition_names_states() {
        let err = validate_transition(DonationState::Completed, DonationState::Claimed).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid state transition: completed -> claimed"
        );
    }

    #[test]
    fn filter_from_bits() {
        assert_eq!(StatusFilter::from_bits(0b00), StatusFilter::NONE);
        assert_eq!(StatusFilter::from_bits(0b01), StatusFilter::PENDING);
        assert_eq!(StatusFilter::from_bits(0b10), StatusFilter::COMPLETED);
        assert_eq!(StatusFilter::from_bits(0b11), StatusFilter::ALL);
        assert_eq!(StatusFilter::from_bits(0b111), StatusFilter::ALL);
        assert!(StatusFilter::from_bits(0b100).is_empty());
    }

    #[test]
    fn filter_partitions() {
        let states = [
            DonationState::Pending,
            DonationState::Claimed,
            DonationState::Completed,
        ];
        for state in states {
            assert!(!StatusFilter::NONE.matches(state));
            assert!(StatusFilter::ALL.matches(state));
            assert_ne!(
                StatusFilter::PENDING.matches(state),
                StatusFilter::COMPLETED.matches(state)
            );
        }
        assert!(StatusFilter::PENDING.matches(DonationState::Claimed));
    }
}
