use crate::{entities::sea_orm_active_enums::ReviewStatus, error::ActionError};

/// What a reviewer or president does to a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchAction {
    Approve,
    Reject,
    Edit,
}

/// Batch state machine. Approved and rejected are terminal.
pub fn transition(current: ReviewStatus, action: BatchAction) -> Result<ReviewStatus, ActionError> {
    match (current, action) {
        (ReviewStatus::Pending, BatchAction::Approve) => Ok(ReviewStatus::Approved),
        (ReviewStatus::Pending, BatchAction::Reject) => Ok(ReviewStatus::Rejected),
        (ReviewStatus::Pending, BatchAction::Edit) => Ok(ReviewStatus::Pending),
        (_, BatchAction::Edit) => Err(ActionError::BatchNotEditable),
        (_, BatchAction::Approve | BatchAction::Reject) => Err(ActionError::BatchNotPending),
    }
}

/// Registration status as a projection of its batches: approved once something
/// is approved and nothing waits for review, rejected only when every batch
/// was rejected, pending otherwise.
pub fn derive_registration_status(
    batches: impl IntoIterator<Item = ReviewStatus>,
) -> ReviewStatus {
    let mut any = false;
    let mut pending = false;
    let mut approved = false;

    for status in batches {
        any = true;
        match status {
            ReviewStatus::Pending => pending = true,
            ReviewStatus::Approved => approved = true,
            ReviewStatus::Rejected => {}
        }
    }

    if !any || pending {
        ReviewStatus::Pending
    } else if approved {
        ReviewStatus::Approved
    } else {
        ReviewStatus::Rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReviewStatus::*;

    #[test]
    fn pending_batches_move_forward_once() {
        assert_eq!(transition(Pending, BatchAction::Approve).unwrap(), Approved);
        assert_eq!(transition(Pending, BatchAction::Reject).unwrap(), Rejected);
        assert_eq!(transition(Pending, BatchAction::Edit).unwrap(), Pending);
    }

    #[test]
    fn reviewed_batches_are_terminal() {
        for status in [Approved, Rejected] {
            assert!(matches!(
                transition(status, BatchAction::Approve),
                Err(ActionError::BatchNotPending)
            ));
            assert!(matches!(
                transition(status, BatchAction::Reject),
                Err(ActionError::BatchNotPending)
            ));
            assert!(matches!(
                transition(status, BatchAction::Edit),
                Err(ActionError::BatchNotEditable)
            ));
        }
    }

    #[test]
    fn registration_status_follows_batches() {
        assert_eq!(derive_registration_status([]), Pending);
        assert_eq!(derive_registration_status([Pending]), Pending);
        assert_eq!(derive_registration_status([Approved, Pending]), Pending);
        assert_eq!(derive_registration_status([Approved, Rejected]), Approved);
        assert_eq!(derive_registration_status([Approved, Approved]), Approved);
        assert_eq!(derive_registration_status([Rejected, Rejected]), Rejected);
        assert_eq!(derive_registration_status([Rejected, Pending]), Pending);
    }
}
