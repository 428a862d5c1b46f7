//! Recoverable action failures.
//!
//! Every player or AI action returns `Result<_, ActionError>`. A failed
//! action never leaves partial state behind.

/// Why an action was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// A field, slot, machine or queue position does not exist.
    #[error("index out of range")]
    InvalidIndex,
    /// Paying would drive money negative.
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },
    /// The target exists but is in the wrong state for this action.
    #[error("precondition failed: {0}")]
    PreconditionFailed(#[from] Rejection),
}

/// The specific precondition an action violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("slot is occupied")]
    SlotOccupied,
    #[error("slot is empty")]
    SlotEmpty,
    #[error("crop id 0 cannot be planted")]
    InvalidCrop,
    #[error("crop is not mature")]
    NotMature,
    #[error("crop is not growing")]
    NotGrowing,
    #[error("crop is already sick")]
    AlreadySick,
    #[error("crop is not sick")]
    NotSick,
    #[error("sickness is disabled for this mission")]
    SicknessDisabled,
    #[error("field does not hold animals")]
    NotAnimalField,
    #[error("no empty slot")]
    NoEmptySlot,
    #[error("already at max level")]
    AtMaxLevel,
    #[error("machine is locked")]
    MachineLocked,
    #[error("machine is broken")]
    MachineBroken,
    #[error("machine is not broken")]
    NotBroken,
    #[error("machine is not producing")]
    NotProducing,
    #[error("machine is not idle")]
    NotIdle,
    #[error("machine is already unlocked")]
    AlreadyUnlocked,
    #[error("queue is full")]
    QueueFull,
    #[error("queue is empty")]
    QueueEmpty,
    #[error("nothing in production")]
    NothingInFlight,
    #[error("the product in production cannot be moved")]
    InFlightPinned,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_converts_into_action_error() {
        let err: ActionError = Rejection::QueueFull.into();
        assert_eq!(err, ActionError::PreconditionFailed(Rejection::QueueFull));
        assert_eq!(err.to_string(), "precondition failed: queue is full");
    }

    #[test]
    fn funds_message_names_both_amounts() {
        let err = ActionError::InsufficientFunds {
            needed: 300,
            available: 120,
        };
        assert_eq!(err.to_string(), "insufficient funds: need 300, have 120");
    }
}
