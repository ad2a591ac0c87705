//! Booking lifecycle rules shared by every surface that mutates a booking.
use crate::domain::models::BookingStatus;

/// Reason recorded on requests that lose the slot race.
pub const AUTO_CANCEL_REASON: &str =
    "Automatically cancelled - another request was approved for this time slot";

impl BookingStatus {
    /// Legal transitions: pending -> approved/rejected/cancelled,
    /// approved -> completed/cancelled. Everything else is terminal.
    pub fn can_transition(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (Approved, Completed)
                | (Approved, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BookingStatus::Rejected | BookingStatus::Completed | BookingStatus::Cancelled
        )
    }

    /// Statuses that occupy a slot from the scheduling point of view.
    /// Pending is included so claimed-but-unapproved times are already
    /// hidden from the availability listing.
    pub fn blocks_slot(self) -> bool {
        matches!(
            self,
            BookingStatus::Pending | BookingStatus::Approved | BookingStatus::Completed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingStatus::*;

    const ALL: [BookingStatus; 5] = [Pending, Approved, Rejected, Completed, Cancelled];

    #[test]
    fn pending_fans_out() {
        assert!(Pending.can_transition(Approved));
        assert!(Pending.can_transition(Rejected));
        assert!(Pending.can_transition(Cancelled));
        assert!(!Pending.can_transition(Completed));
        assert!(!Pending.can_transition(Pending));
    }

    #[test]
    fn approved_can_only_complete_or_cancel() {
        assert!(Approved.can_transition(Completed));
        assert!(Approved.can_transition(Cancelled));
        assert!(!Approved.can_transition(Approved));
        assert!(!Approved.can_transition(Rejected));
        assert!(!Approved.can_transition(Pending));
    }

    #[test]
    fn terminal_states_allow_nothing() {
        for from in [Rejected, Completed, Cancelled] {
            assert!(from.is_terminal());
            for to in ALL {
                assert!(!from.can_transition(to), "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn slot_blocking_states() {
        assert!(Pending.blocks_slot());
        assert!(Approved.blocks_slot());
        assert!(Completed.blocks_slot());
        assert!(!Rejected.blocks_slot());
        assert!(!Cancelled.blocks_slot());
    }
}
