//! [`Contract`] read model definition.

use common::{Date, DateTime};

use crate::domain::contract;
#[cfg(doc)]
use crate::domain::{Company, Contract, Timesheet, User};

/// Selector of active [`Contract`]s whose last day has passed.
#[derive(Clone, Copy, Debug)]
pub struct Expired {
    /// Current [`Date`].
    pub today: Date,
}

/// Selector of active [`Contract`]s having a failed deposit or a failed
/// [`Timesheet`] payment.
#[derive(Clone, Copy, Debug)]
pub struct Unpaid {
    /// Only failures happened before this moment are considered.
    pub failed_before: DateTime,
}

/// Selector of active [`Contract`]s where the contractor or the supplier
/// [`Company`] has no account for payouts.
#[derive(Clone, Copy, Debug)]
pub struct WithoutPayout {
    /// Only [`Contract`]s signed before this moment are considered.
    pub created_before: contract::CreationDateTime,
}

/// Selector of active [`Contract`]s between different [`Company`]s, so
/// billed weekly.
#[derive(Clone, Copy, Debug)]
pub struct Billable;

pub mod list {
    //! [`Contract`]s list definitions.

    use common::{define_pagination, Date};

    use crate::domain::{company, contract, user};
    #[cfg(doc)]
    use crate::domain::{Company, Contract, User};

    define_pagination!(Cursor, Node, Filter);

    /// Node in a [`Connection`].
    pub type Node = contract::Id;

    /// Cursor pointing to a specific [`Contract`] in a list.
    pub type Cursor = contract::Id;

    /// Filter for [`Selector`].
    #[derive(Clone, Copy, Debug)]
    pub struct Filter {
        /// [`Participant`] whose [`Contract`]s are listed.
        pub participant: Participant,

        /// [`Period`] the listed [`Contract`]s belong to.
        pub period: Option<Period>,

        /// [`Side`] the listed [`Contract`]s belong to.
        pub side: Option<Side>,

        /// Whether to list active or closed [`Contract`]s only.
        pub is_active: Option<bool>,

        /// [`Date`] the [`Period`] is relative to.
        pub today: Date,
    }

    /// Participant of the listed [`Contract`]s.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub enum Participant {
        /// Contractor [`User`].
        Employee(user::Id),

        /// [`Company`] being either the customer or the supplier.
        Company(company::Id),
    }

    /// Period of a [`Contract`] relative to a [`Date`].
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub enum Period {
        /// The [`Date`] is within the [`Contract`].
        Current,

        /// The [`Contract`] has finished before the [`Date`].
        Past,

        /// The [`Contract`] starts after the [`Date`].
        Future,
    }

    impl Period {
        /// Indicates whether the span between the provided dates (both
        /// inclusive) belongs to this [`Period`] relative to `today`.
        #[must_use]
        pub fn contains(self, start: Date, end: Date, today: Date) -> bool {
            match self {
                Self::Current => start <= today && today <= end,
                Self::Past => end < today,
                Self::Future => today < start,
            }
        }
    }

    /// Side of a [`Company`] in a [`Contract`].
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub enum Side {
        /// The [`Company`] is the customer: the work comes in for its job
        /// requests.
        Incoming,

        /// The [`Company`] is the supplier: its employees go out to work.
        Outgoing,
    }

    #[cfg(test)]
    mod spec {
        use crate::domain::contract::spec::date;

        use super::Period;

        #[test]
        fn splits_periods_around_today() {
            let (start, end) = (date("2030-01-01"), date("2030-01-14"));

            for (today, expected) in [
                ("2029-12-31", Period::Future),
                ("2030-01-01", Period::Current),
                ("2030-01-14", Period::Current),
                ("2030-01-15", Period::Past),
            ] {
                let today = date(today);
                for period in [Period::Current, Period::Past, Period::Future] {
                    assert_eq!(
                        period.contains(start, end, today),
                        period == expected,
                        "{period:?} at {today}",
                    );
                }
            }
        }
    }
}
