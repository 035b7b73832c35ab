//! [`Command`] definition.

pub mod authorize_user_session;
pub mod close_contract;
pub mod create_contract;
pub mod create_user_session;
pub mod delete_user_session;
pub mod mark_contract_closed;
pub mod notify_contract_participants;
pub mod request_deposit;
pub mod request_deposit_refund;
pub mod sign_in;
pub mod sign_up;
pub mod submit_timesheet;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    authorize_user_session::AuthorizeUserSession,
    close_contract::CloseContract, create_contract::CreateContract,
    create_user_session::CreateUserSession,
    delete_user_session::DeleteUserSession,
    mark_contract_closed::MarkContractClosed,
    notify_contract_participants::NotifyContractParticipants,
    request_deposit::RequestDeposit,
    request_deposit_refund::RequestDepositRefund, sign_in::SignIn,
    sign_up::SignUp, submit_timesheet::SubmitTimesheet,
};
