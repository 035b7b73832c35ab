//! [`TimesheetPayment`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf, Money};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use uuid::Uuid;

use crate::domain::{billing::Status, timesheet};
#[cfg(doc)]
use crate::domain::Timesheet;

/// Payment for the hours reported in a [`Timesheet`], recorded by the billing
/// processor.
#[derive(Clone, Debug)]
pub struct TimesheetPayment {
    /// ID of this [`TimesheetPayment`].
    pub id: Id,

    /// ID of the paid [`Timesheet`].
    pub timesheet_id: timesheet::Id,

    /// [`Status`] of this [`TimesheetPayment`].
    pub status: Status,

    /// Amount charged from the customer.
    pub amount: Money,

    /// Amount paid out to the supplier.
    pub supplier_amount: Money,

    /// Amount paid out to the contractor.
    pub contractor_amount: Money,

    /// [`DateTime`] when this [`TimesheetPayment`] was created.
    pub created_at: CreationDateTime,
}

/// ID of a [`TimesheetPayment`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
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

/// [`DateTime`] when a [`TimesheetPayment`] was created.
pub type CreationDateTime = DateTimeOf<(TimesheetPayment, unit::Creation)>;
