//! [`PaymentSource`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::company;
#[cfg(doc)]
use crate::domain::Company;

/// Payment method of a [`Company`] registered in the billing processor.
#[derive(Clone, Debug)]
pub struct PaymentSource {
    /// ID of this [`PaymentSource`].
    pub id: Id,

    /// ID of the [`Company`] owning this [`PaymentSource`].
    pub company_id: company::Id,

    /// [`Name`] of this [`PaymentSource`].
    pub name: Name,

    /// [`DateTime`] when this [`PaymentSource`] was created.
    pub created_at: CreationDateTime,
}

/// ID of a [`PaymentSource`].
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

/// Human-readable name of a [`PaymentSource`] (like `Visa *4242`).
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`] if the given `name` is not blank.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        (!name.trim().is_empty() && name.len() <= 256).then_some(Self(name))
    }
}

/// [`DateTime`] when a [`PaymentSource`] was created.
pub type CreationDateTime = DateTimeOf<(PaymentSource, unit::Creation)>;
