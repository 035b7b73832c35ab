//! [`Command`] for signing a new [`User`] up.

use argon2::password_hash;
use common::operations::{By, Commit, Insert, Select, Transact, Transacted};
use derive_more::{Display, Error, From};
use secrecy::ExposeSecret as _;
use tracerr::Traced;

use crate::{
    domain::{
        company,
        user::{
            self,
            auth::{self, Credential, Credentials, Strategy},
            facebook,
        },
        Company, User,
    },
    infra::{database, facebook as fb, Database, Facebook},
    Service,
};

use super::Command;

/// [`Command`] for signing a new [`User`] up with one of the enabled
/// [`Strategy`]s.
#[derive(Clone, Debug)]
pub struct SignUp {
    /// Name of the [`Strategy`] to sign up with.
    pub strategy: Option<String>,

    /// [`Credentials`] required by the [`Strategy`].
    pub credentials: Credentials,

    /// [`user::Name`] of the new [`User`].
    pub name: user::Name,

    /// [`user::Role`] of the new [`User`].
    pub role: user::Role,

    /// ID of the [`Company`] the new [`User`] works for, if any.
    pub company_id: Option<company::Id>,
}

impl<Db, Fb> Command<SignUp> for Service<Db, Fb>
where
    Db: for<'e> Database<
            Select<By<Option<User>, &'e user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + for<'i> Database<
            Select<By<Option<User>, &'i facebook::AccountId>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Company>, company::Id>>,
            Ok = Option<Company>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<User>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Fb: for<'t> Facebook<
        Select<By<Option<facebook::Account>, &'t facebook::AccessToken>>,
        Ok = Option<facebook::Account>,
        Err = Traced<fb::Error>,
    >,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: SignUp) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SignUp {
            strategy,
            credentials,
            name,
            role,
            company_id,
        } = cmd;

        let strategy = self
            .config()
            .auth
            .find(strategy.as_deref())
            .map_err(tracerr::from_and_wrap!(=> E))?;

        if role == user::Role::Employer && company_id.is_none() {
            return Err(tracerr::new!(E::CompanyRequired));
        }
        if let Some(id) = company_id {
            _ = self
                .database()
                .execute(Select(By::<Option<Company>, _>::new(id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::CompanyNotExists(id))
                .map_err(tracerr::wrap!())?;
        }

        let (email, password, facebook_id) = match strategy {
            Strategy::Password => {
                let email = credentials
                    .email()
                    .map_err(tracerr::from_and_wrap!(=> E))?
                    .clone();
                let password = credentials
                    .password()
                    .map_err(tracerr::from_and_wrap!(=> E))?;
                (email, Some(password), None)
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

                let occupied = self
                    .database()
                    .execute(Select(By::<Option<User>, _>::new(&account.id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .is_some();
                if occupied {
                    return Err(tracerr::new!(E::FacebookAccountOccupied));
                }

                let email = credentials
                    .email
                    .clone()
                    .or(account.email)
                    .ok_or(E::MissingCredential(Credential::Email))
                    .map_err(tracerr::wrap!())?;
                (email, credentials.password.as_ref(), Some(account.id))
            }
        };

        let occupied = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(&email)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .is_some();
        if occupied {
            return Err(tracerr::new!(E::EmailOccupied(email)));
        }

        let password_hash = password
            .map(|p| user::PasswordHash::new(p.expose_secret()))
            .transpose()
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let user = User {
            id: user::Id::new(),
            name,
            email,
            password_hash,
            facebook_id,
            role,
            company_id,
            payout_account: None,
            created_at: user::CreationDateTime::now(),
            deleted_at: None,
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let inserted = tx.execute(Insert(user.clone())).await;
        // Concurrent sign-up may win the race after the checks above.
        if let Err(e) = &inserted {
            if e.as_ref().is_unique_violation(Some("users_email_key")) {
                return Err(tracerr::new!(E::EmailOccupied(user.email)));
            }
            if e.as_ref().is_unique_violation(Some("users_facebook_id_key")) {
                return Err(tracerr::new!(E::FacebookAccountOccupied));
            }
        }
        inserted
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(user)
    }
}

/// Error of [`SignUp`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Company`] with the provided ID does not exist.
    #[display("`Company(id: {_0})` does not exist")]
    CompanyNotExists(#[error(not(source))] company::Id),

    /// Employer must work for a [`Company`].
    #[display("Employer must belong to a `Company`")]
    CompanyRequired,

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`user::Email`] is already occupied.
    #[display("`{_0}` email is occupied")]
    EmailOccupied(#[error(not(source))] user::Email),

    /// [`Facebook`] error.
    #[display("`Facebook` operation failed: {_0}")]
    #[from]
    Facebook(fb::Error),

    /// [`facebook::Account`] is already bound to another [`User`].
    #[display("Facebook account is occupied")]
    FacebookAccountOccupied,

    /// [`facebook::AccessToken`] is rejected by Facebook.
    #[display("Facebook access token is invalid")]
    InvalidExternalToken,

    /// [`Credential`] required by the [`Strategy`] is missing.
    #[display("`{_0}` credential is missing")]
    #[from]
    MissingCredential(#[error(not(source))] Credential),

    /// [`user::Password`] hashing failed.
    #[display("Failed to hash password: {_0}")]
    #[from]
    PasswordHash(password_hash::Error),

    /// Requested [`Strategy`] is not enabled.
    #[display("{_0}")]
    #[from]
    StrategyNotDefined(auth::StrategyNotDefined),
}
