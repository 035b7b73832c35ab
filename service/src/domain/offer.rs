//! [`Offer`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, Date, DateTimeOf, Money};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::{Contract, JobRequest, User};
use crate::domain::{contract::Hours, job_request, user};

/// Proposal of a [`JobRequest`] to a contractor, becoming a [`Contract`] once
/// accepted by every side.
#[derive(Clone, Debug)]
pub struct Offer {
    /// ID of this [`Offer`].
    pub id: Id,

    /// ID of the offered [`JobRequest`].
    pub job_request_id: job_request::Id,

    /// ID of the contractor [`User`].
    pub contractor_id: user::Id,

    /// Hourly rate of the contractor.
    pub capacity_rate: Money,

    /// Offered weekly [`Hours`].
    pub hours_per_week: Hours,

    /// First day of the work.
    pub date_started: Date,

    /// Duration of the work.
    pub weeks: Weeks,

    /// Indicator whether the customer accepted this [`Offer`].
    pub customer_accepted: bool,

    /// Indicator whether the supplier accepted this [`Offer`].
    pub supplier_accepted: bool,

    /// Indicator whether the contractor accepted this [`Offer`].
    pub contractor_accepted: bool,

    /// [`DateTime`] when this [`Offer`] was closed.
    pub closed_at: Option<ClosingDateTime>,

    /// [`DateTime`] when this [`Offer`] was created.
    pub created_at: CreationDateTime,
}

impl Offer {
    /// Indicates whether this [`Offer`] is not closed yet.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.closed_at.is_none()
    }

    /// Returns the last day of the work (inclusive).
    #[must_use]
    pub fn date_finished(&self) -> Date {
        self.date_started.add_days(i64::from(self.weeks.0) * 7 - 1)
    }

    /// Indicates whether this [`Offer`] shares at least one day with the
    /// provided span (both ends inclusive).
    #[must_use]
    pub fn overlaps(&self, start: Date, end: Date) -> bool {
        self.date_started <= end && start <= self.date_finished()
    }

    /// Closes this [`Offer`], unless it's closed already.
    pub fn close(&mut self) -> bool {
        if self.closed_at.is_some() {
            return false;
        }
        self.closed_at = Some(ClosingDateTime::now());
        true
    }
}

/// ID of an [`Offer`].
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

/// Positive number of weeks.
#[derive(Clone, Copy, Debug, Display, Eq, Into, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Weeks(i16);

impl Weeks {
    /// Creates new [`Weeks`] if the given `weeks` is positive.
    #[must_use]
    pub fn new(weeks: i16) -> Option<Self> {
        (weeks > 0).then_some(Self(weeks))
    }
}

/// [`DateTime`] when an [`Offer`] was created.
pub type CreationDateTime = DateTimeOf<(Offer, unit::Creation)>;

/// [`DateTime`] when an [`Offer`] was closed.
pub type ClosingDateTime = DateTimeOf<(Offer, unit::Closing)>;

#[cfg(test)]
pub(crate) mod spec {
    use common::{money::Currency, Date, Money};
    use rust_decimal::Decimal;

    use crate::domain::{contract::Hours, job_request, user};

    use super::{CreationDateTime, Id, Offer, Weeks};

    fn date(s: &str) -> Date {
        s.parse().unwrap()
    }

    pub(crate) fn offer(start: &str, weeks: i16, hours: i16) -> Offer {
        Offer {
            id: Id::new(),
            job_request_id: job_request::Id::new(),
            contractor_id: user::Id::new(),
            capacity_rate: Money {
                amount: Decimal::from(30),
                currency: Currency::Usd,
            },
            hours_per_week: Hours::new(hours).unwrap(),
            date_started: date(start),
            weeks: Weeks::new(weeks).unwrap(),
            customer_accepted: false,
            supplier_accepted: false,
            contractor_accepted: false,
            closed_at: None,
            created_at: CreationDateTime::now(),
        }
    }

    #[test]
    fn finishes_on_last_day_of_last_week() {
        let finished = |weeks| offer("2030-01-01", weeks, 40).date_finished();

        assert_eq!(finished(1), date("2030-01-07"));
        assert_eq!(finished(2), date("2030-01-14"));
    }

    #[test]
    fn detects_overlapping_spans() {
        let o = offer("2030-01-08", 1, 20);

        assert!(o.overlaps(date("2030-01-01"), date("2030-01-08")));
        assert!(o.overlaps(date("2030-01-14"), date("2030-02-01")));
        assert!(o.overlaps(date("2030-01-10"), date("2030-01-11")));
        assert!(!o.overlaps(date("2030-01-01"), date("2030-01-07")));
        assert!(!o.overlaps(date("2030-01-15"), date("2030-01-20")));
    }

    #[test]
    fn closes_once() {
        let mut o = offer("2030-01-08", 1, 20);

        assert!(o.close());
        assert!(!o.is_active());
        assert!(!o.close());
        assert!(Weeks::new(0).is_none());
    }
}
