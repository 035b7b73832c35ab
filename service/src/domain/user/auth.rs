//! Authentication [`Strategy`] definitions.

use std::collections::HashSet;

use common::define_kind;
use derive_more::{Display, Error};
use secrecy::SecretBox;

#[cfg(doc)]
use crate::domain::User;
use crate::domain::user::{facebook, Email, Password};

define_kind! {
    #[doc = "Way of signing a [`User`] up or in."]
    enum Strategy {
        #[doc = "[`Email`] and [`Password`] pair."]
        Password = 1,

        #[doc = "Facebook [`facebook::AccessToken`]."]
        Facebook = 2,
    }
}

/// Registry of enabled authentication [`Strategy`]s.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Registry(HashSet<Strategy>);

impl Registry {
    /// Creates a new [`Registry`] with the provided [`Strategy`]s enabled.
    #[must_use]
    pub fn new(strategies: impl IntoIterator<Item = Strategy>) -> Self {
        Self(strategies.into_iter().collect())
    }

    /// Enables the provided [`Strategy`].
    pub fn add(&mut self, strategy: Strategy) {
        _ = self.0.insert(strategy);
    }

    /// Disables the provided [`Strategy`].
    pub fn remove(&mut self, strategy: Strategy) {
        _ = self.0.remove(&strategy);
    }

    /// Resolves the requested [`Strategy`] by its case-insensitive `name`.
    ///
    /// # Errors
    ///
    /// If the `name` is missing, unknown or the [`Strategy`] is disabled.
    pub fn find(
        &self,
        name: Option<&str>,
    ) -> Result<Strategy, StrategyNotDefined> {
        name.and_then(|n| n.trim().parse::<Strategy>().ok())
            .filter(|s| self.0.contains(s))
            .ok_or(StrategyNotDefined)
    }
}

/// Error of resolving a [`Strategy`] not present in a [`Registry`].
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("Authentication strategy is not defined")]
pub struct StrategyNotDefined;

/// Raw credentials provided for authentication.
///
/// Which fields are required depends on the used [`Strategy`].
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    /// [`Email`] to log in with.
    pub email: Option<Email>,

    /// [`Password`] to log in with.
    pub password: Option<SecretBox<Password>>,

    /// [`facebook::AccessToken`] to log in with.
    pub facebook_token: Option<SecretBox<facebook::AccessToken>>,
}

/// Field of [`Credentials`].
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Credential {
    /// [`Credentials::email`].
    #[display("email")]
    Email,

    /// [`Credentials::password`].
    #[display("password")]
    Password,

    /// [`Credentials::facebook_token`].
    #[display("facebookToken")]
    FacebookToken,
}

impl Credentials {
    /// Returns the [`Credentials::email`], if provided.
    ///
    /// # Errors
    ///
    /// With [`Credential::Email`] if it's missing.
    pub fn email(&self) -> Result<&Email, Credential> {
        self.email.as_ref().ok_or(Credential::Email)
    }

    /// Returns the [`Credentials::password`], if provided.
    ///
    /// # Errors
    ///
    /// With [`Credential::Password`] if it's missing.
    pub fn password(&self) -> Result<&SecretBox<Password>, Credential> {
        self.password.as_ref().ok_or(Credential::Password)
    }

    /// Returns the [`Credentials::facebook_token`], if provided.
    ///
    /// # Errors
    ///
    /// With [`Credential::FacebookToken`] if it's missing.
    pub fn facebook_token(
        &self,
    ) -> Result<&SecretBox<facebook::AccessToken>, Credential> {
        self.facebook_token
            .as_ref()
            .ok_or(Credential::FacebookToken)
    }
}

#[cfg(test)]
mod spec {
    use super::{Registry, Strategy};

    #[test]
    fn finds_enabled_strategies_case_insensitively() {
        let registry = Registry::new(Strategy::ALL.iter().copied());

        assert_eq!(
            registry.find(Some("password")).ok(),
            Some(Strategy::Password),
        );
        assert_eq!(
            registry.find(Some("FaceBook")).ok(),
            Some(Strategy::Facebook),
        );
    }

    #[test]
    fn rejects_unknown_or_disabled_strategies() {
        let mut registry = Registry::new([Strategy::Password]);

        assert!(registry.find(None).is_err());
        assert!(registry.find(Some("")).is_err());
        assert!(registry.find(Some("google")).is_err());
        assert!(registry.find(Some("facebook")).is_err());

        registry.add(Strategy::Facebook);
        assert!(registry.find(Some("facebook")).is_ok());

        registry.remove(Strategy::Password);
        assert!(registry.find(Some("password")).is_err());
    }
}
