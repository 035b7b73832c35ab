//! Billing records definitions.
//!
//! Charging and paying out is done by an external billing processor, so only
//! requests and their outcomes are recorded here.

pub mod deposit;
pub mod payment;
pub mod payment_source;

use common::define_kind;
use derive_more::{AsRef, Display};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};

pub use self::{
    deposit::Deposit, payment::TimesheetPayment, payment_source::PaymentSource,
};

define_kind! {
    #[doc = "Status of a payment processed by the billing processor."]
    enum Status {
        #[doc = "Payment is requested, but not processed yet."]
        Pending = 1,

        #[doc = "Payment succeeded."]
        Succeeded = 2,

        #[doc = "Payment failed."]
        Failed = 3,

        #[doc = "Refund of a succeeded payment is requested."]
        Refunding = 4,

        #[doc = "Payment is refunded."]
        Refunded = 5,
    }
}

/// Account in the billing processor receiving payouts.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct PayoutAccount(String);

impl PayoutAccount {
    /// Creates a new [`PayoutAccount`] if the given `account` is not blank.
    #[must_use]
    pub fn new(account: impl Into<String>) -> Option<Self> {
        let account = account.into();
        (!account.trim().is_empty()).then_some(Self(account))
    }
}
