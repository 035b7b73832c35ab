//! GraphQL API definitions.

pub mod contract;
mod mutation;
mod query;
pub mod scalar;
mod subscription;
pub mod timesheet;
pub mod user;

use crate::define_error;

pub use self::{
    contract::Contract, mutation::Mutation, query::Query,
    subscription::Subscription, timesheet::Timesheet, user::User,
};

/// GraphQL schema.
pub type Schema = juniper::RootNode<'static, Query, Mutation, Subscription>;

define_error! {
    enum PrivilegeError {
        #[code = "NO_COMPANY"]
        #[status = FORBIDDEN]
        #[message = "Authenticated employer must belong to a company"]
        Company,
    }
}

define_error! {
    enum PaginationError {
        #[code = "AMBIGUOUS_PAGINATION_ARGUMENTS"]
        #[status = BAD_REQUEST]
        #[message = "Ambiguous pagination arguments"]
        Ambiguous,
    }
}
