use strum::Display;

use crate::entities::RequestState;
use crate::errors::{ServiceError, ServiceResult};

/// Interactive actions on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RequestAction {
    SubmitToProductOwner,
    AcceptByProductOwner,
    RequestChange,
    ApproveByAdmin,
    RejectByAdmin,
}

/// Target state of `action` from `from`, or `InvalidStatus` when the move is illegal.
///
/// Sync-forced moves to `change_requested` bypass this table.
pub fn transition(from: RequestState, action: RequestAction) -> ServiceResult<RequestState> {
    use RequestAction::*;
    use RequestState::*;

    match (from, action) {
        (New | ChangeRequested, SubmitToProductOwner) => Ok(PendingPo),
        (PendingPo, AcceptByProductOwner) => Ok(WaitingAdmin),
        (PendingPo, RequestChange) => Ok(ChangeRequested),
        (WaitingAdmin, ApproveByAdmin) => Ok(Approved),
        (WaitingAdmin, RejectByAdmin) => Ok(Rejected),
        (state, action) => Err(ServiceError::InvalidStatus(format!(
            "Cannot {} a request in state '{}'",
            action, state
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    #[rstest]
    #[case(RequestState::New, RequestAction::SubmitToProductOwner, RequestState::PendingPo)]
    #[case(RequestState::ChangeRequested, RequestAction::SubmitToProductOwner, RequestState::PendingPo)]
    #[case(RequestState::PendingPo, RequestAction::AcceptByProductOwner, RequestState::WaitingAdmin)]
    #[case(RequestState::PendingPo, RequestAction::RequestChange, RequestState::ChangeRequested)]
    #[case(RequestState::WaitingAdmin, RequestAction::ApproveByAdmin, RequestState::Approved)]
    #[case(RequestState::WaitingAdmin, RequestAction::RejectByAdmin, RequestState::Rejected)]
    fn legal_transitions(
        #[case] from: RequestState,
        #[case] action: RequestAction,
        #[case] to: RequestState,
    ) {
        assert_eq!(transition(from, action).unwrap(), to);
    }

    #[rstest]
    #[case(RequestState::New, RequestAction::AcceptByProductOwner)]
    #[case(RequestState::New, RequestAction::ApproveByAdmin)]
    #[case(RequestState::PendingPo, RequestAction::SubmitToProductOwner)]
    #[case(RequestState::PendingPo, RequestAction::ApproveByAdmin)]
    #[case(RequestState::WaitingAdmin, RequestAction::RequestChange)]
    #[case(RequestState::Approved, RequestAction::RejectByAdmin)]
    #[case(RequestState::Rejected, RequestAction::ApproveByAdmin)]
    #[case(RequestState::Rejected, RequestAction::SubmitToProductOwner)]
    fn illegal_transitions(#[case] from: RequestState, #[case] action: RequestAction) {
        assert_matches!(transition(from, action), Err(ServiceError::InvalidStatus(_)));
    }

    #[test]
    fn error_names_the_action_and_state() {
        let err = transition(RequestState::Approved, RequestAction::RejectByAdmin).unwrap_err();
        assert_eq!(
            err.user_message(),
            "Cannot reject_by_admin a request in state 'approved'"
        );
    }
}
