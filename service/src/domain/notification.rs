//! [`Notification`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::{Contract, Offer};
use crate::domain::{user, User};

/// Message to a [`User`] put into an outbox, which is delivered by an external
/// mailer.
#[derive(Clone, Debug)]
pub struct Notification {
    /// ID of this [`Notification`].
    pub id: Id,

    /// ID of the [`User`] to notify.
    pub recipient_id: user::Id,

    /// [`Kind`] of this [`Notification`].
    pub kind: Kind,

    /// ID of the entity this [`Notification`] is about.
    pub subject_id: Uuid,

    /// Text of this [`Notification`].
    pub message: String,

    /// [`DateTime`] when this [`Notification`] was created.
    pub created_at: CreationDateTime,
}

impl Notification {
    /// Creates a new [`Notification`] to the provided [`User`].
    #[must_use]
    pub fn new(
        recipient_id: user::Id,
        kind: Kind,
        subject_id: impl Into<Uuid>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Id::new(),
            recipient_id,
            kind,
            subject_id: subject_id.into(),
            message: message.into(),
            created_at: CreationDateTime::now(),
        }
    }
}

/// ID of a [`Notification`].
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

define_kind! {
    #[doc = "Kind of a [`Notification`]."]
    enum Kind {
        #[doc = "A [`Contract`] is signed."]
        ContractSigned = 1,

        #[doc = "A [`Contract`] is closed."]
        ContractClosed = 2,

        #[doc = "An [`Offer`] is declined."]
        OfferDeclined = 3,
    }
}

/// [`DateTime`] when a [`Notification`] was created.
pub type CreationDateTime = DateTimeOf<(Notification, unit::Creation)>;
