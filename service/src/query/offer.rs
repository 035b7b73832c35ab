//! [`Query`] collection related to [`Offer`]s.

use common::operations::By;

use crate::{
    domain::{offer, user, Offer},
    read::Active,
};
#[cfg(doc)]
use crate::{domain::User, Query};

use super::DatabaseQuery;

/// Queries an [`Offer`] by its [`offer::Id`].
pub type ById = DatabaseQuery<By<Option<Offer>, offer::Id>>;

/// Queries active [`Offer`]s made to the [`User`] with the provided
/// [`user::Id`].
pub type ActiveOf = DatabaseQuery<By<Vec<Active<Offer>>, user::Id>>;
