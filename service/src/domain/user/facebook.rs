//! [Facebook] account definitions.
//!
//! [Facebook]: https://facebook.com

use derive_more::{AsRef, Display};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use secrecy::{zeroize::Zeroize, CloneableSecret};

use crate::domain::user::Email;

/// [Facebook] account resolved from an [`AccessToken`].
///
/// [Facebook]: https://facebook.com
#[derive(Clone, Debug)]
pub struct Account {
    /// ID of this [`Account`].
    pub id: AccountId,

    /// [`Email`] of this [`Account`], if shared by its owner.
    pub email: Option<Email>,
}

/// ID of a Facebook [`Account`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct AccountId(String);

impl AccountId {
    /// Creates a new [`AccountId`] if the given `id` is not blank.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        (!id.trim().is_empty()).then_some(Self(id))
    }
}

/// Access token issued by Facebook to a third-party application.
#[derive(AsRef, Clone, Debug, Eq, PartialEq)]
#[as_ref(str)]
pub struct AccessToken(String);

impl AccessToken {
    /// Creates a new [`AccessToken`] if the given `token` is not blank.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        (!token.trim().is_empty()).then_some(Self(token))
    }
}

impl CloneableSecret for AccessToken {}
impl Zeroize for AccessToken {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}
