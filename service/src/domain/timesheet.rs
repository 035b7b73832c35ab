//! [`Timesheet`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, Date, DateTimeOf, Money, Percent};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    contract::{self, Hours, Week},
    Contract,
};

/// Hours worked during a single [`Week`] of a [`Contract`].
#[derive(Clone, Debug)]
pub struct Timesheet {
    /// ID of this [`Timesheet`].
    pub id: Id,

    /// ID of the [`Contract`] this [`Timesheet`] belongs to.
    pub contract_id: contract::Id,

    /// Number of reported [`Hours`].
    pub hours_count: Hours,

    /// First day of the reported [`Week`].
    pub date_started: Date,

    /// Last day of the reported [`Week`].
    pub date_finished: Date,

    /// [`DateTime`] when this [`Timesheet`] was submitted.
    pub created_at: CreationDateTime,
}

impl Timesheet {
    /// Creates a new [`Timesheet`] of the provided [`Contract`]'s [`Week`].
    #[must_use]
    pub fn new(
        contract_id: contract::Id,
        week: Week,
        hours_count: Hours,
    ) -> Self {
        Self {
            id: Id::new(),
            contract_id,
            hours_count,
            date_started: week.date_started,
            date_finished: week.date_finished,
            created_at: CreationDateTime::now(),
        }
    }

    /// Returns the [`Week`] this [`Timesheet`] reports.
    #[must_use]
    pub fn week(&self) -> Week {
        Week {
            date_started: self.date_started,
            date_finished: self.date_finished,
        }
    }

    /// Indicates whether this [`Timesheet`] reports the last [`Week`] of the
    /// provided [`Contract`].
    #[must_use]
    pub fn is_latest(&self, contract: &Contract) -> bool {
        self.date_finished == contract.date_finished
    }

    /// Returns the amount charged for this [`Timesheet`] at the provided
    /// hourly `rate`.
    #[must_use]
    pub fn amount(&self, rate: Money) -> Money {
        (rate * Decimal::from(self.hours_count)).round()
    }

    /// Splits the [`Timesheet::amount()`] according to the provided
    /// [`PayoutShares`].
    #[must_use]
    pub fn amounts(&self, rate: Money, shares: PayoutShares) -> Amounts {
        let customer = self.amount(rate);
        Amounts {
            customer,
            supplier: shares.supplier.of(customer),
            contractor: shares.contractor.of(customer),
        }
    }
}

/// ID of a [`Timesheet`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Shares of a [`Timesheet`] amount paid out to its recipients.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct PayoutShares {
    /// Share of the supplier company.
    pub supplier: Percent,

    /// Share of the contractor.
    pub contractor: Percent,
}

impl Default for PayoutShares {
    #[expect(unsafe_code, reason = "constants are within range")]
    fn default() -> Self {
        // SAFETY: Both values are within the `0..=100` range.
        unsafe {
            Self {
                supplier: Percent::new_unchecked(Decimal::TEN),
                contractor: Percent::new_unchecked(Decimal::from(80)),
            }
        }
    }
}

/// Split of a [`Timesheet`] amount.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Amounts {
    /// Amount charged from the customer.
    pub customer: Money,

    /// Amount paid out to the supplier.
    pub supplier: Money,

    /// Amount paid out to the contractor.
    pub contractor: Money,
}

/// [`DateTime`] when a [`Timesheet`] was submitted.
pub type CreationDateTime = DateTimeOf<(Timesheet, unit::Creation)>;

#[cfg(test)]
mod spec {
    use common::{money::Currency, Money, Percent};
    use rust_decimal::Decimal;

    use crate::domain::contract::{spec::contract, Hours};

    use super::{PayoutShares, Timesheet};

    #[test]
    fn splits_amount_by_shares() {
        let c = contract("2030-01-01", "2030-01-10");
        let week = c.schedule().last().unwrap();
        let ts = Timesheet::new(c.id, week, Hours::new(7).unwrap());
        let rate = Money {
            amount: Decimal::new(3333, 2),
            currency: Currency::Usd,
        };
        let shares = PayoutShares {
            supplier: Percent::new(Decimal::from(10)).unwrap(),
            contractor: Percent::new(Decimal::from(80)).unwrap(),
        };

        let amounts = ts.amounts(rate, shares);

        assert_eq!(amounts.customer.amount, Decimal::new(23331, 2));
        assert_eq!(amounts.supplier.amount, Decimal::new(2333, 2));
        assert_eq!(amounts.contractor.amount, Decimal::new(18665, 2));
        assert!(ts.is_latest(&c));
        assert_eq!(ts.week(), week);
    }

    #[test]
    fn only_last_week_is_latest() {
        let c = contract("2030-01-01", "2030-01-14");
        let first = c.schedule().next().unwrap();

        let ts = Timesheet::new(c.id, first, Hours::new(1).unwrap());

        assert!(!ts.is_latest(&c));
    }
}
