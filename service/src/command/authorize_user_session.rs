//! [`Command`] for authorizing a [`User`] by its [`Session`].

use common::{
    operations::{By, Insert, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        user::{self, session, Session},
        User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for authorizing a [`User`] by its [`Session`].
///
/// Prolongs the [`Session`] once a half of its lifetime has passed.
#[derive(Clone, Debug, From)]
pub struct AuthorizeUserSession {
    /// [`session::Token`] to authorize with.
    pub token: session::Token,
}

impl<Db, Fb> Command<AuthorizeUserSession> for Service<Db, Fb>
where
    Db: Database<
            Select<By<Option<Session>, session::Token>>,
            Ok = Option<Session>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Insert<Session>, Err = Traced<database::Error>>,
{
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeUserSession { token } = cmd;
        let now = DateTime::now();

        let mut session = self
            .database()
            .execute(Select(By::<Option<Session>, _>::new(token)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|s| !s.is_expired_at(now))
            .ok_or(E::SessionNotExists)
            .map_err(tracerr::wrap!())?;

        _ = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(session.user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(User::is_active)
            .ok_or(E::UserNotExists(session.user_id))
            .map_err(tracerr::wrap!())?;

        if session.prolong(self.config().session_ttl, now) {
            self.database()
                .execute(Insert(session.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        Ok(session)
    }
}

/// Error of [`AuthorizeUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Session`] does not exist or is expired.
    #[display("`Session` does not exist or is expired")]
    SessionNotExists,

    /// [`User`] the [`Session`] belongs to does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use crate::{
        command::{CreateUserSession, DeleteUserSession},
        domain::{user, User},
        infra::{database::Memory, facebook},
        Command as _, Config, Service,
    };

    use super::{AuthorizeUserSession, ExecutionError as E};

    fn employee() -> User {
        User {
            id: user::Id::new(),
            name: user::Name::new("Jane Doe").unwrap(),
            email: user::Email::new("jane@example.com").unwrap(),
            password_hash: None,
            facebook_id: None,
            role: user::Role::Employee,
            company_id: None,
            payout_account: None,
            created_at: user::CreationDateTime::now(),
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn authorizes_until_deleted() {
        let db = Memory::default();
        let (service, _bg) = Service::new(
            Config::default(),
            db.clone(),
            facebook::Stub::default(),
        );
        let user = employee();
        _ = db.state().users.insert(user.id, user.clone());

        let first = service
            .execute(CreateUserSession {
                user_id: user.id,
                previous: None,
            })
            .await
            .unwrap();
        let session = service
            .execute(AuthorizeUserSession::from(first.token.clone()))
            .await
            .unwrap();
        assert_eq!(session.user_id, user.id);

        let second = service
            .execute(CreateUserSession {
                user_id: user.id,
                previous: Some(first.token.clone()),
            })
            .await
            .unwrap();
        assert_ne!(second.token, first.token);
        let err = service
            .execute(AuthorizeUserSession::from(first.token))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::SessionNotExists), "{err}");

        service
            .execute(DeleteUserSession {
                token: second.token.clone(),
            })
            .await
            .unwrap();
        let err = service
            .execute(AuthorizeUserSession::from(second.token))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::SessionNotExists), "{err}");
    }

    #[tokio::test]
    async fn prolongs_half_expired_session() {
        let db = Memory::default();
        let config = Config {
            session_ttl: Duration::from_secs(60 * 60),
            ..Config::default()
        };
        let (service, _bg) =
            Service::new(config, db.clone(), facebook::Stub::default());
        let user = employee();
        _ = db.state().users.insert(user.id, user.clone());

        let mut session = service
            .execute(CreateUserSession {
                user_id: user.id,
                previous: None,
            })
            .await
            .unwrap();
        session.expires_at = session.expires_at - Duration::from_secs(45 * 60);
        let stale = session.expires_at;
        _ = db
            .state()
            .sessions
            .insert(session.token.clone(), session.clone());

        let authorized = service
            .execute(AuthorizeUserSession::from(session.token.clone()))
            .await
            .unwrap();
        assert!(authorized.expires_at > stale);
        assert!(db.state().sessions[&session.token].expires_at > stale);
    }
}
