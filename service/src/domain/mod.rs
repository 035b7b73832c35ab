//! Domain definitions.

pub mod billing;
pub mod company;
pub mod contract;
pub mod job_request;
pub mod notification;
pub mod offer;
pub mod timesheet;
pub mod user;

pub use self::{
    company::Company, contract::Contract, job_request::JobRequest,
    notification::Notification, offer::Offer, timesheet::Timesheet,
    user::User,
};
