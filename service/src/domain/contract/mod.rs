//! [`Contract`] definitions.

pub mod schedule;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, Date, DateTimeOf, Money};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::{billing::PaymentSource, Company, JobRequest};
use crate::domain::{
    billing::payment_source, company, job_request, user, Offer, User,
};

pub use self::schedule::{Schedule, Week, WeekOutOfRange};

/// Agreement between a customer [`Company`] and a contractor for a bounded
/// period, billed weekly.
#[derive(Clone, Debug)]
pub struct Contract {
    /// ID of this [`Contract`].
    pub id: Id,

    /// ID of the contractor [`User`].
    pub employee_id: user::Id,

    /// ID of the [`JobRequest`] this [`Contract`] fulfills.
    pub job_request_id: job_request::Id,

    /// ID of the customer [`Company`] (the one of the [`JobRequest`]).
    pub customer_id: company::Id,

    /// ID of the supplier [`Company`] (the one of the contractor at signing
    /// time), if the contractor is not a freelancer.
    pub supplier_id: Option<company::Id>,

    /// ID of the [`PaymentSource`] the customer pays with.
    pub payment_source_id: Option<payment_source::Id>,

    /// First day of this [`Contract`].
    pub date_started: Date,

    /// Last day of this [`Contract`] (inclusive).
    pub date_finished: Date,

    /// Weekly allocation of [`Hours`].
    pub hours_per_week: Hours,

    /// Hourly rate of the contractor.
    pub capacity_rate: Money,

    /// [`Closing`] of this [`Contract`], if it's closed.
    pub closing: Option<Closing>,

    /// [`DateTime`] when this [`Contract`] was signed.
    pub created_at: CreationDateTime,
}

impl Contract {
    /// Signs a new [`Contract`] on the terms of the provided [`Offer`].
    #[must_use]
    pub fn sign(
        offer: &Offer,
        customer_id: company::Id,
        supplier_id: Option<company::Id>,
        payment_source_id: Option<payment_source::Id>,
    ) -> Self {
        Self {
            id: Id::new(),
            employee_id: offer.contractor_id,
            job_request_id: offer.job_request_id,
            customer_id,
            supplier_id,
            payment_source_id,
            date_started: offer.date_started,
            date_finished: offer.date_finished(),
            hours_per_week: offer.hours_per_week,
            capacity_rate: offer.capacity_rate,
            closing: None,
            created_at: CreationDateTime::now(),
        }
    }

    /// Indicates whether this [`Contract`] is not closed yet.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.closing.is_none()
    }

    /// Indicates whether the customer and the supplier of this [`Contract`]
    /// are the same [`Company`], so no billing happens.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.supplier_id == Some(self.customer_id)
    }

    /// Returns duration of this [`Contract`] in whole weeks.
    #[must_use]
    pub fn weeks(&self) -> i64 {
        (self.date_finished.days_since(self.date_started) + 1) / 7
    }

    /// Returns the cost of a single full week of this [`Contract`].
    #[must_use]
    pub fn weekly_cost(&self) -> Money {
        self.capacity_rate * Decimal::from(self.hours_per_week)
    }

    /// Returns [`Schedule`] of this [`Contract`].
    #[must_use]
    pub fn schedule(&self) -> Schedule {
        Schedule::new(self.date_started, self.date_finished)
    }

    /// Returns the [`Week`] of this [`Contract`] containing the provided
    /// `date`.
    ///
    /// # Errors
    ///
    /// If the `date` is outside of this [`Contract`].
    pub fn week_of(&self, date: Date) -> Result<Week, WeekOutOfRange> {
        self.schedule()
            .find(|w| w.contains(date))
            .ok_or(WeekOutOfRange(date))
    }

    /// Indicates whether the provided [`User`] is the customer of this
    /// [`Contract`].
    #[must_use]
    pub fn is_customer(&self, user: &User) -> bool {
        user.is_employer_of(self.customer_id)
    }

    /// Indicates whether the provided [`User`] is the supplier of this
    /// [`Contract`].
    #[must_use]
    pub fn is_supplier(&self, user: &User) -> bool {
        self.supplier_id.is_some_and(|id| user.is_employer_of(id))
    }

    /// Indicates whether the provided [`User`] participates in this
    /// [`Contract`] on any side.
    #[must_use]
    pub fn is_participant(&self, user: &User) -> bool {
        user.id == self.employee_id
            || self.is_customer(user)
            || self.is_supplier(user)
    }

    /// Closes this [`Contract`] for the provided [`ClosingReason`].
    ///
    /// An already closed [`Contract`] stays intact, so `false` is returned.
    pub fn close(
        &mut self,
        reason: ClosingReason,
        message: ClosingMessage,
        closed_by: Option<user::Id>,
    ) -> bool {
        if self.closing.is_some() {
            return false;
        }
        self.closing = Some(Closing {
            reason,
            message,
            closed_by,
            closed_at: ClosingDateTime::now(),
        });
        true
    }
}

/// ID of a [`Contract`].
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
    Ord,
    PartialEq,
    PartialOrd,
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

/// Number of working hours in a week.
#[derive(
    Clone, Copy, Debug, Display, Eq, Hash, Into, Ord, PartialEq, PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Hours(i16);

impl Hours {
    /// Maximum number of [`Hours`] (the whole week).
    pub const MAX: Self = Self(7 * 24);

    /// Full-time weekly allocation.
    pub const FULL_TIME: Self = Self(40);

    /// Creates new [`Hours`] if the given `hours` fit into a week.
    #[must_use]
    pub fn new(hours: i16) -> Option<Self> {
        (0..=Self::MAX.0).contains(&hours).then_some(Self(hours))
    }
}

impl From<Hours> for Decimal {
    fn from(hours: Hours) -> Self {
        hours.0.into()
    }
}

impl FromStr for Hours {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().ok().and_then(Self::new).ok_or("invalid `Hours`")
    }
}

/// Details of a [`Contract`] closing.
#[derive(Clone, Debug)]
pub struct Closing {
    /// [`ClosingReason`] of the [`Contract`] closing.
    pub reason: ClosingReason,

    /// [`ClosingMessage`] explaining the [`Contract`] closing.
    pub message: ClosingMessage,

    /// ID of the [`User`] who closed the [`Contract`] manually.
    pub closed_by: Option<user::Id>,

    /// [`DateTime`] when the [`Contract`] was closed.
    pub closed_at: ClosingDateTime,
}

define_kind! {
    #[doc = "Reason of a [`Contract`] closing."]
    enum ClosingReason {
        #[doc = "Closed by one of the participants."]
        Manually = 1,

        #[doc = "The last day of the [`Contract`] has passed."]
        Expired = 2,

        #[doc = "The customer has troubles with payments."]
        Unpaid = 3,

        #[doc = "One of the sides lacks an account for payouts."]
        NoPayoutAccount = 4,
    }
}

impl ClosingReason {
    /// Returns the fixed [`ClosingMessage`] of an automatic closing.
    ///
    /// [`None`] for [`ClosingReason::Manually`].
    #[must_use]
    pub fn message(self) -> Option<ClosingMessage> {
        let msg = match self {
            Self::Manually => return None,
            Self::Expired => "Closed automatically due to expiration.",
            Self::Unpaid => {
                "Closed automatically: client has troubles with payment."
            }
            Self::NoPayoutAccount => {
                "Closed automatically: one of the sides does not have an \
                 account for payouts."
            }
        };
        Some(ClosingMessage(msg.into()))
    }
}

/// Human-readable explanation of a [`Contract`] closing.
#[derive(AsRef, Clone, Debug, Default, Display, Eq, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct ClosingMessage(String);

impl ClosingMessage {
    /// Maximal length of a [`ClosingMessage`] in bytes.
    pub const MAX_LEN: usize = 2048;

    /// Creates a new [`ClosingMessage`] if the given `message` is not too
    /// long.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Option<Self> {
        let message = message.into().trim().to_owned();
        (message.len() <= Self::MAX_LEN).then_some(Self(message))
    }
}

impl FromStr for ClosingMessage {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("`ClosingMessage` is too long")
    }
}

/// Event happened to a [`Contract`].
///
/// Published after the owning transaction is committed.
#[derive(Clone, Debug)]
pub enum Event {
    /// [`Contract`] is signed.
    Signed(Contract),

    /// [`Contract`] is closed.
    Closed(Contract),

    /// An [`Offer`] is declined because it overlaps with a signed
    /// [`Contract`].
    OfferDeclined(Offer),
}

/// [`DateTime`] when a [`Contract`] was signed.
pub type CreationDateTime = DateTimeOf<(Contract, unit::Creation)>;

/// [`DateTime`] when a [`Contract`] was closed.
pub type ClosingDateTime = DateTimeOf<(Contract, unit::Closing)>;

#[cfg(test)]
pub(crate) mod spec {
    use common::{money::Currency, Date, Money};
    use rust_decimal::Decimal;

    use crate::domain::{company, job_request, user, User};

    use super::{
        ClosingMessage, ClosingReason, Contract, CreationDateTime, Hours, Id,
        Week,
    };

    pub(crate) fn date(s: &str) -> Date {
        s.parse().unwrap()
    }

    pub(crate) fn contract(start: &str, end: &str) -> Contract {
        Contract {
            id: Id::new(),
            employee_id: user::Id::new(),
            job_request_id: job_request::Id::new(),
            customer_id: company::Id::new(),
            supplier_id: Some(company::Id::new()),
            payment_source_id: None,
            date_started: date(start),
            date_finished: date(end),
            hours_per_week: Hours::new(40).unwrap(),
            capacity_rate: Money {
                amount: Decimal::new(2550, 2),
                currency: Currency::Usd,
            },
            closing: None,
            created_at: CreationDateTime::now(),
        }
    }

    #[test]
    fn computes_derived_terms() {
        let mut c = contract("2030-01-01", "2030-01-14");

        assert_eq!(c.weeks(), 2);
        assert_eq!(c.weekly_cost().amount, Decimal::from(1020));
        assert!(!c.is_internal());

        c.supplier_id = Some(c.customer_id);
        assert!(c.is_internal());

        c.supplier_id = None;
        assert!(!c.is_internal());
    }

    #[test]
    fn finds_week_of_date() {
        let c = contract("2030-01-01", "2030-01-10");

        assert_eq!(
            c.week_of(date("2030-01-09")).ok(),
            Some(Week {
                date_started: date("2030-01-08"),
                date_finished: date("2030-01-10"),
            }),
        );
        assert_eq!(
            c.week_of(date("2030-01-01")).ok().map(|w| w.date_finished),
            Some(date("2030-01-07")),
        );
        assert!(c.week_of(date("2029-12-31")).is_err());
        assert!(c.week_of(date("2030-01-11")).is_err());
    }

    #[test]
    fn closes_only_once() {
        let mut c = contract("2030-01-01", "2030-01-14");
        let closer = user::Id::new();

        assert!(c.close(
            ClosingReason::Manually,
            ClosingMessage::new("bye").unwrap(),
            Some(closer),
        ));
        assert!(!c.is_active());

        assert!(!c.close(
            ClosingReason::Expired,
            ClosingReason::Expired.message().unwrap(),
            None,
        ));

        let closing = c.closing.unwrap();
        assert_eq!(closing.reason, ClosingReason::Manually);
        assert_eq!(closing.message.as_ref(), "bye");
        assert_eq!(closing.closed_by, Some(closer));
    }

    #[test]
    fn recognizes_participants() {
        let c = contract("2030-01-01", "2030-01-14");
        let make_user = |id, role, company_id| User {
            id,
            name: user::Name::new("John").unwrap(),
            email: user::Email::new("john@example.com").unwrap(),
            password_hash: None,
            facebook_id: None,
            role,
            company_id,
            payout_account: None,
            created_at: user::CreationDateTime::now(),
            deleted_at: None,
        };

        let employee =
            make_user(c.employee_id, user::Role::Employee, c.supplier_id);
        let customer = make_user(
            user::Id::new(),
            user::Role::Employer,
            Some(c.customer_id),
        );
        let supplier =
            make_user(user::Id::new(), user::Role::Employer, c.supplier_id);
        let colleague = make_user(
            user::Id::new(),
            user::Role::Employee,
            Some(c.customer_id),
        );
        let stranger = make_user(user::Id::new(), user::Role::Employer, None);

        assert!(c.is_participant(&employee));
        assert!(c.is_participant(&customer) && c.is_customer(&customer));
        assert!(c.is_participant(&supplier) && c.is_supplier(&supplier));
        assert!(!c.is_participant(&colleague));
        assert!(!c.is_participant(&stranger));
    }

    #[test]
    fn bounds_closing_message() {
        assert!(ClosingMessage::new("").is_some());
        assert!(ClosingMessage::new("a".repeat(2048)).is_some());
        assert!(ClosingMessage::new("a".repeat(2049)).is_none());
        assert_eq!(ClosingReason::Manually.message(), None);
    }
}
