//! [`Command`] for signing a [`User`] in.

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use secrecy::ExposeSecret as _;
use tracerr::Traced;

use crate::{
    domain::{
        user::{
            self,
            auth::{self, Credential, Credentials, Strategy},
            facebook,
        },
        User,
    },
    infra::{database, facebook as fb, Database, Facebook},
    Service,
};

use super::Command;

/// [`Command`] for signing a [`User`] in with one of the enabled
/// [`Strategy`]s.
#[derive(Clone, Debug)]
pub struct SignIn {
    /// Name of the [`Strategy`] to sign in with.
    pub strategy: Option<String>,

    /// [`Credentials`] required by the [`Strategy`].
    pub credentials: Credentials,
}

impl<Db, Fb> Command<SignIn> for Service<Db, Fb>
where
    Db: for<'e> Database<
            Select<By<Option<User>, &'e user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + for<'i> Database<
            Select<By<Option<User>, &'i facebook::AccountId>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        >,
    Fb: for<'t> Facebook<
        Select<By<Option<facebook::Account>, &'t facebook::AccessToken>>,
        Ok = Option<facebook::Account>,
        Err = Traced<fb::Error>,
    >,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: SignIn) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SignIn {
            strategy,
            credentials,
        } = cmd;

        let strategy = self
            .config()
            .auth
            .find(strategy.as_deref())
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let user = match strategy {
            Strategy::Password => {
                let email =
                    credentials.email().map_err(tracerr::from_and_wrap!(=> E))?;
                let password = credentials
                    .password()
                    .map_err(tracerr::from_and_wrap!(=> E))?;

                let user = self
                    .database()
                    .execute(Select(By::<Option<User>, _>::new(email)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .ok_or(E::AccountNotFound)
                    .map_err(tracerr::wrap!())?;
                let matches = user
                    .password_hash
                    .as_ref()
                    .is_some_and(|h| h.verify(password.expose_secret()));
                if !matches {
                    return Err(tracerr::new!(E::WrongCredentials));
                }
                user
            }
            Strategy::Facebook => {
                let token = credentials
                    .facebook_token()
                    .map_err(tracerr::from_and_wrap!(=> E))?;

                let account = self
                    .facebook()
                    .execute(Select(By::new(token.expose_secret())))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .ok_or(E::InvalidExternalToken)
                    .map_err(tracerr::wrap!())?;

                self.database()
                    .execute(Select(By::<Option<User>, _>::new(&account.id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .ok_or(E::AccountNotFound)
                    .map_err(tracerr::wrap!())?
            }
        };

        if !user.is_active() {
            return Err(tracerr::new!(E::UserNotActive(user.id)));
        }

        Ok(user)
    }
}

/// Error of [`SignIn`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// No [`User`] is registered with the provided [`Credentials`].
    #[display("Account is not found")]
    AccountNotFound,

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Facebook`] error.
    #[display("`Facebook` operation failed: {_0}")]
    #[from]
    Facebook(fb::Error),

    /// [`facebook::AccessToken`] is rejected by Facebook.
    #[display("Facebook access token is invalid")]
    InvalidExternalToken,

    /// [`Credential`] required by the [`Strategy`] is missing.
    #[display("`{_0}` credential is missing")]
    #[from]
    MissingCredential(#[error(not(source))] Credential),

    /// Requested [`Strategy`] is not enabled.
    #[display("{_0}")]
    #[from]
    StrategyNotDefined(auth::StrategyNotDefined),

    /// [`User`] is deleted.
    #[display("`User(id: {_0})` is not active")]
    UserNotActive(#[error(not(source))] user::Id),

    /// Password doesn't match.
    #[display("Wrong credentials")]
    WrongCredentials,
}

#[cfg(test)]
mod spec {
    use secrecy::SecretBox;

    use crate::{
        command::SignUp,
        domain::user::{
            self,
            auth::{Credentials, Strategy},
            facebook,
        },
        infra::{database::Memory, facebook::Stub},
        Command as _, Config, Service,
    };

    use super::{ExecutionError as E, SignIn};

    fn password_credentials(email: &str, password: &str) -> Credentials {
        Credentials {
            email: user::Email::new(email),
            password: user::Password::new(password)
                .map(|p| SecretBox::new(Box::new(p))),
            facebook_token: None,
        }
    }

    fn sign_up(strategy: &str, credentials: Credentials) -> SignUp {
        SignUp {
            strategy: Some(strategy.into()),
            credentials,
            name: user::Name::new("Jane Doe").unwrap(),
            role: user::Role::Employee,
            company_id: None,
        }
    }

    fn service(fb: Stub) -> Service<Memory, Stub> {
        Service::new(Config::default(), Memory::default(), fb).0
    }

    #[tokio::test]
    async fn signs_in_with_password() {
        let service = service(Stub::default());
        let user = service
            .execute(sign_up(
                "password",
                password_credentials("jane@example.com", "secret"),
            ))
            .await
            .unwrap();

        let signed_in = service
            .execute(SignIn {
                strategy: Some("Password".into()),
                credentials: password_credentials("JANE@example.com", "secret"),
            })
            .await
            .unwrap();
        assert_eq!(signed_in.id, user.id);

        let err = service
            .execute(SignIn {
                strategy: Some("password".into()),
                credentials: password_credentials("jane@example.com", "wrong"),
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::WrongCredentials), "{err}");

        let err = service
            .execute(SignIn {
                strategy: Some("password".into()),
                credentials: password_credentials("john@example.com", "secret"),
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::AccountNotFound), "{err}");
    }

    #[tokio::test]
    async fn rejects_unknown_strategy() {
        let service = service(Stub::default());

        for strategy in [None, Some("google"), Some("")] {
            let err = service
                .execute(SignIn {
                    strategy: strategy.map(Into::into),
                    credentials: password_credentials("a@example.com", "pwd"),
                })
                .await
                .unwrap_err();
            assert!(matches!(err.as_ref(), E::StrategyNotDefined(_)), "{err}");
        }
    }

    #[tokio::test]
    async fn rejects_missing_credential() {
        let service = service(Stub::default());

        let err = service
            .execute(SignIn {
                strategy: Some(Strategy::Facebook.to_string()),
                credentials: password_credentials("a@example.com", "pwd"),
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::MissingCredential(_)), "{err}");
    }

    #[tokio::test]
    async fn signs_in_with_facebook() {
        let account = facebook::Account {
            id: facebook::AccountId::new("100500").unwrap(),
            email: user::Email::new("fb@example.com"),
        };
        let service = service(Stub::default().with("valid", account));
        let token = |t: &str| Credentials {
            facebook_token: facebook::AccessToken::new(t)
                .map(|t| SecretBox::new(Box::new(t))),
            ..Credentials::default()
        };

        let user = service
            .execute(sign_up("facebook", token("valid")))
            .await
            .unwrap();
        assert_eq!(AsRef::<str>::as_ref(&user.email), "fb@example.com");
        assert!(user.password_hash.is_none());

        let signed_in = service
            .execute(SignIn {
                strategy: Some("facebook".into()),
                credentials: token("valid"),
            })
            .await
            .unwrap();
        assert_eq!(signed_in.id, user.id);

        let err = service
            .execute(SignIn {
                strategy: Some("facebook".into()),
                credentials: token("expired"),
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::InvalidExternalToken), "{err}");
    }
}
