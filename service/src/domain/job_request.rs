//! [`JobRequest`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::Company;
use crate::domain::{company, contract::Hours};

/// Request for a capacity published by a customer [`Company`].
#[derive(Clone, Debug)]
pub struct JobRequest {
    /// ID of this [`JobRequest`].
    pub id: Id,

    /// ID of the [`Company`] which published this [`JobRequest`].
    pub company_id: company::Id,

    /// [`Name`] of this [`JobRequest`].
    pub name: Name,

    /// Requested weekly [`Hours`].
    pub hours_per_week: Hours,

    /// Indicator whether this [`JobRequest`] is open for the [`Company`]'s
    /// own employees only.
    pub is_internal: bool,

    /// Indicator whether this [`JobRequest`] still accepts contractors.
    pub is_active: bool,

    /// [`DateTime`] when this [`JobRequest`] was published.
    pub created_at: CreationDateTime,
}

/// ID of a [`JobRequest`].
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

/// Name of a [`JobRequest`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`] if the given `name` is not blank and fits
    /// 512 bytes.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        (name.trim() == name && !name.is_empty() && name.len() <= 512)
            .then_some(Self(name))
    }
}

/// [`DateTime`] when a [`JobRequest`] was published.
pub type CreationDateTime = DateTimeOf<(JobRequest, unit::Creation)>;
