//! [`Session`] definitions.

use std::{str::FromStr, time::Duration};

use common::{unit, DateTime, DateTimeOf};
use derive_more::{AsRef, Display};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::User;
use crate::domain::user;

/// Server-side [`User`] session.
#[derive(Clone, Debug)]
pub struct Session {
    /// Opaque [`Token`] identifying this [`Session`].
    pub token: Token,

    /// ID of the [`User`] this [`Session`] belongs to.
    pub user_id: user::Id,

    /// [`DateTime`] when this [`Session`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Session`] expires.
    pub expires_at: ExpirationDateTime,
}

impl Session {
    /// Issues a new [`Session`] for the provided [`User`] living for the
    /// provided `ttl`.
    #[must_use]
    pub fn issue(user_id: user::Id, ttl: Duration) -> Self {
        let now = DateTime::now();
        Self {
            token: Token::generate(),
            user_id,
            created_at: now.coerce(),
            expires_at: (now + ttl).coerce(),
        }
    }

    /// Indicates whether this [`Session`] is expired at the provided moment.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime) -> bool {
        self.expires_at <= now.coerce()
    }

    /// Slides the expiration of this [`Session`] forward if less than a half
    /// of the provided `ttl` remains.
    ///
    /// Returns `true` if this [`Session`] has been prolonged.
    pub fn prolong(&mut self, ttl: Duration, now: DateTime) -> bool {
        if (now + ttl / 2).coerce() <= self.expires_at {
            return false;
        }
        self.expires_at = (now + ttl).coerce();
        true
    }
}

/// Access token of a [`Session`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Token(String);

impl Token {
    /// Generates a new random [`Token`].
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Creates a new [`Token`] without checking its contents.
    ///
    /// # Safety
    ///
    /// The provided `token` must be a valid [`Token`] representation.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub const unsafe fn new_unchecked(token: String) -> Self {
        Self(token)
    }
}

impl FromStr for Token {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        (s.len() == 32 && s.bytes().all(|b| b.is_ascii_hexdigit()))
            .then(|| Self(s.to_ascii_lowercase()))
            .ok_or("invalid `Token`")
    }
}

/// [`DateTime`] when a [`Session`] was created.
pub type CreationDateTime = DateTimeOf<(Session, unit::Creation)>;

/// [`DateTime`] of a [`Session`] expiration.
pub type ExpirationDateTime = DateTimeOf<(Session, unit::Expiration)>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;

    use crate::domain::user;

    use super::{Session, Token};

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    #[test]
    fn issues_opaque_tokens() {
        let first = Session::issue(user::Id::new(), DAY);
        let second = Session::issue(first.user_id, DAY);

        assert_ne!(first.token, second.token);
        assert_eq!(first.token.as_ref().len(), 32);
        assert_eq!(first.token.as_ref().parse::<Token>(), Ok(first.token));
        assert!("not-a-token".parse::<Token>().is_err());
    }

    #[test]
    fn expires() {
        let session = Session::issue(user::Id::new(), DAY);

        assert!(!session.is_expired_at(DateTime::now()));
        assert!(session.is_expired_at(DateTime::now() + 2 * DAY));
    }

    #[test]
    fn prolongs_only_past_half_of_ttl() {
        let ttl = 30 * DAY;
        let mut session = Session::issue(user::Id::new(), ttl);
        let initial = session.expires_at;

        assert!(!session.prolong(ttl, DateTime::now() + DAY));
        assert_eq!(session.expires_at, initial);

        assert!(session.prolong(ttl, DateTime::now() + 20 * DAY));
        assert!(session.expires_at > initial);
    }
}
