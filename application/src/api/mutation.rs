//! GraphQL [`Mutation`]s definitions.

use juniper::graphql_object;
use secrecy::SecretBox;
use service::{
    command,
    domain::{
        self,
        contract::Hours,
        user::{auth::Credentials, facebook},
    },
    query, Command as _, Query as _,
};

use crate::{api, define_error, AsError, Context, Error, Session};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Creates a new `User` with the provided credentials and signs it in.
    ///
    /// Which credentials are required depends on the `strategy`:
    /// - `password` requires `email` and `password`;
    /// - `facebook` requires `facebookToken`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `STRATEGY_NOT_DEFINED` - the `strategy` is unknown or disabled;
    /// - `MISSING_CREDENTIAL` - a credential required by the `strategy` is
    ///                          not provided;
    /// - `INVALID_EXTERNAL_TOKEN` - the `facebookToken` is not accepted by
    ///                              Facebook;
    /// - `EMAIL_OCCUPIED` - the `UserEmail` is occupied by another `User`;
    /// - `FACEBOOK_ACCOUNT_OCCUPIED` - the Facebook account is linked to
    ///                                 another `User`;
    /// - `COMPANY_REQUIRED` - an employer is registered without a company;
    /// - `COMPANY_NOT_EXISTS` - the specified company does not exist.
    #[expect(clippy::too_many_arguments, reason = "GraphQL arguments")]
    #[tracing::instrument(
        skip_all,
        fields(
            company_id = ?company_id,
            email = ?email.as_ref().map(ToString::to_string),
            gql.name = "signUp",
            name = %name,
            otel.name = Self::SPAN_NAME,
            role = ?role,
            strategy = ?strategy,
        ),
    )]
    pub async fn sign_up(
        strategy: Option<String>,
        email: Option<api::user::Email>,
        password: Option<api::user::Password>,
        facebook_token: Option<String>,
        name: api::user::Name,
        role: api::user::Role,
        company_id: Option<api::contract::CompanyId>,
        ctx: &Context,
    ) -> Result<api::user::session::CreateResult, Error> {
        let user = ctx
            .service()
            .execute(command::SignUp {
                strategy,
                credentials: credentials(email, password, facebook_token),
                name: name.into(),
                role: role.into(),
                company_id: company_id.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        create_session(user, None, ctx).await
    }

    /// Signs in the `User` with the provided credentials.
    ///
    /// If the request is already authenticated, its `Session` is replaced
    /// with the created one.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `STRATEGY_NOT_DEFINED` - the `strategy` is unknown or disabled;
    /// - `MISSING_CREDENTIAL` - a credential required by the `strategy` is
    ///                          not provided;
    /// - `ACCOUNT_NOT_FOUND` - no `User` is registered with the provided
    ///                         credentials;
    /// - `WRONG_CREDENTIALS` - the provided password does not match;
    /// - `INVALID_EXTERNAL_TOKEN` - the `facebookToken` is not accepted by
    ///                              Facebook;
    /// - `USER_NOT_ACTIVE` - the `User` is deleted.
    #[tracing::instrument(
        skip_all,
        fields(
            email = ?email.as_ref().map(ToString::to_string),
            gql.name = "signIn",
            otel.name = Self::SPAN_NAME,
            strategy = ?strategy,
        ),
    )]
    pub async fn sign_in(
        strategy: Option<String>,
        email: Option<api::user::Email>,
        password: Option<api::user::Password>,
        facebook_token: Option<String>,
        ctx: &Context,
    ) -> Result<api::user::session::CreateResult, Error> {
        let previous = ctx.try_current_session().await?.map(|s| s.token);
        let user = ctx
            .service()
            .execute(command::SignIn {
                strategy,
                credentials: credentials(email, password, facebook_token),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        create_session(user, previous, ctx).await
    }

    /// Deletes the current `Session`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authenticated.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "signOut",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn sign_out(ctx: &Context) -> Result<bool, Error> {
        let token = ctx.current_session().await?.token;
        ctx.service()
            .execute(command::DeleteUserSession { token })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|()| true)
    }

    /// Signs a `Contract` on the terms of the specified `Offer`.
    ///
    /// Must be initiated by an employer of the customer company.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `OFFER_NOT_EXISTS` - the `Offer` does not exist;
    /// - `OFFER_INACTIVE` - the `Offer` is already closed;
    /// - `OFFER_NOT_APPROVED` - the `Offer` is not accepted by the
    ///                          contractor or the supplier;
    /// - `JOB_REQUEST_NOT_EXISTS` - the job request does not exist;
    /// - `JOB_REQUEST_INACTIVE` - the job request is closed;
    /// - `JOB_REQUEST_INTERNAL` - the job request is internal, while the
    ///                            contractor is from another company;
    /// - `PAYMENT_SOURCE_REQUIRED` - no `paymentSourceId` is provided for
    ///                               a non-internal `Contract`;
    /// - `PAYMENT_SOURCE_NOT_EXISTS` - the payment source does not exist or
    ///                                 belongs to another company;
    /// - `NOT_OFFER_CUSTOMER` - the current `User` is not an employer of
    ///                          the customer company.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createContract",
            offer_id = %offer_id,
            otel.name = Self::SPAN_NAME,
            payment_source_id = ?payment_source_id,
        ),
    )]
    pub async fn create_contract(
        offer_id: api::contract::OfferId,
        payment_source_id: Option<api::contract::PaymentSourceId>,
        ctx: &Context,
    ) -> Result<api::Contract, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::CreateContract {
                offer_id: offer_id.into(),
                initiator_id: my_id.into(),
                payment_source_id: payment_source_id.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Closes the specified `Contract` manually.
    ///
    /// Closing an already closed `Contract` returns it intact.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `CONTRACT_NOT_EXISTS` - the `Contract` does not exist;
    /// - `NOT_CONTRACT_PARTICIPANT` - the current `User` doesn't participate
    ///                                in the `Contract`.
    #[tracing::instrument(
        skip_all,
        fields(
            contract_id = %contract_id,
            gql.name = "closeContract",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn close_contract(
        contract_id: api::contract::Id,
        message: Option<api::contract::ClosingMessage>,
        ctx: &Context,
    ) -> Result<api::Contract, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::CloseContract {
                contract_id: contract_id.into(),
                initiator_id: my_id.into(),
                message: message.map(Into::into).unwrap_or_default(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Submits a `Timesheet` for the current week of the specified
    /// `Contract`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_HOURS` - `hours` don't fit into a week;
    /// - `CONTRACT_NOT_EXISTS` - the `Contract` does not exist;
    /// - `NOT_CONTRACT_EMPLOYEE` - the current `User` is not the contractor
    ///                             of the `Contract`;
    /// - `INTERNAL_CONTRACT` - the `Contract` is internal;
    /// - `WEEK_OUT_OF_RANGE` - today is outside of the `Contract`;
    /// - `TIMESHEET_ALREADY_SUBMITTED` - a `Timesheet` for the current week
    ///                                   is submitted already.
    #[tracing::instrument(
        skip_all,
        fields(
            contract_id = %contract_id,
            gql.name = "submitTimesheet",
            hours = hours,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn submit_timesheet(
        contract_id: api::contract::Id,
        hours: i32,
        ctx: &Context,
    ) -> Result<api::Timesheet, Error> {
        let hours = i16::try_from(hours)
            .ok()
            .and_then(Hours::new)
            .ok_or_else(|| TimesheetError::InvalidHours.into())
            .map_err(ctx.error())?;
        let my_id = ctx.current_session().await?.user_id;

        let timesheet = ctx
            .service()
            .execute(command::SubmitTimesheet {
                contract_id: contract_id.into(),
                initiator_id: my_id.into(),
                hours,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;
        let contract = ctx
            .service()
            .execute(query::contract::ById::by(timesheet.contract_id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| api::query::ContractError::NotExists.into())
            .map_err(ctx.error())?;

        Ok(api::Timesheet::new(
            timesheet,
            contract.capacity_rate,
            ctx.service().config().payout_shares,
        ))
    }
}

/// Assembles [`Credentials`] out of the provided GraphQL arguments.
///
/// Blank `facebook_token` is considered as missing.
fn credentials(
    email: Option<api::user::Email>,
    password: Option<api::user::Password>,
    facebook_token: Option<String>,
) -> Credentials {
    Credentials {
        email: email.map(Into::into),
        password: password
            .map(|p| SecretBox::init_with(move || p.into())),
        facebook_token: facebook_token
            .and_then(facebook::AccessToken::new)
            .map(|t| SecretBox::init_with(move || t)),
    }
}

/// Creates a new `Session` for the provided [`domain::User`] and makes it
/// the current one.
async fn create_session(
    user: domain::User,
    previous: Option<domain::user::session::Token>,
    ctx: &Context,
) -> Result<api::user::session::CreateResult, Error> {
    let session = ctx
        .service()
        .execute(command::CreateUserSession {
            user_id: user.id,
            previous,
        })
        .await
        .map_err(AsError::into_error)
        .map_err(ctx.error())?;

    ctx.set_current_session(Session {
        user_id: session.user_id.into(),
        token: session.token.clone(),
        expires_at: session.expires_at.coerce(),
    })
    .await;

    Ok(api::user::session::CreateResult::new(session, user))
}

define_error! {
    enum TimesheetError {
        #[code = "INVALID_HOURS"]
        #[status = BAD_REQUEST]
        #[message = "Hours must be within a week"]
        InvalidHours,
    }
}

define_error! {
    enum CredentialsError {
        #[code = "STRATEGY_NOT_DEFINED"]
        #[status = BAD_REQUEST]
        #[message = "Authentication strategy is not defined"]
        StrategyNotDefined,

        #[code = "MISSING_CREDENTIAL"]
        #[status = BAD_REQUEST]
        #[message = "Credential required by the strategy is not provided"]
        MissingCredential,

        #[code = "INVALID_EXTERNAL_TOKEN"]
        #[status = UNAUTHORIZED]
        #[message = "Provided external token is not accepted"]
        InvalidExternalToken,

        #[code = "USER_NOT_ACTIVE"]
        #[status = FORBIDDEN]
        #[message = "`User` is not active"]
        UserNotActive,
    }
}

impl AsError for command::sign_up::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "EMAIL_OCCUPIED"]
                #[status = CONFLICT]
                #[message = "`UserEmail` is occupied by another `User`"]
                EmailOccupied,

                #[code = "FACEBOOK_ACCOUNT_OCCUPIED"]
                #[status = CONFLICT]
                #[message = "Facebook account is linked to another `User`"]
                FacebookAccountOccupied,

                #[code = "COMPANY_REQUIRED"]
                #[status = BAD_REQUEST]
                #[message = "Employer must belong to a company"]
                CompanyRequired,

                #[code = "COMPANY_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "Company with the specified ID does not exist"]
                CompanyNotExists,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::Facebook(e) => return e.try_as_error(),
            Self::PasswordHash(_) => return None,
            Self::CompanyNotExists(_) => Error::CompanyNotExists.into(),
            Self::CompanyRequired => Error::CompanyRequired.into(),
            Self::EmailOccupied(_) => Error::EmailOccupied.into(),
            Self::FacebookAccountOccupied => {
                Error::FacebookAccountOccupied.into()
            }
            Self::InvalidExternalToken => {
                CredentialsError::InvalidExternalToken.into()
            }
            Self::MissingCredential(_) => {
                CredentialsError::MissingCredential.into()
            }
            Self::StrategyNotDefined(_) => {
                CredentialsError::StrategyNotDefined.into()
            }
        })
    }
}

impl AsError for command::sign_in::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "ACCOUNT_NOT_FOUND"]
                #[status = NOT_FOUND]
                #[message = "No `User` is registered with the provided \
                             credentials"]
                AccountNotFound,

                #[code = "WRONG_CREDENTIALS"]
                #[status = FORBIDDEN]
                #[message = "Provided credentials does not match any `User`"]
                WrongCredentials,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::Facebook(e) => return e.try_as_error(),
            Self::AccountNotFound => Error::AccountNotFound.into(),
            Self::WrongCredentials => Error::WrongCredentials.into(),
            Self::InvalidExternalToken => {
                CredentialsError::InvalidExternalToken.into()
            }
            Self::MissingCredential(_) => {
                CredentialsError::MissingCredential.into()
            }
            Self::StrategyNotDefined(_) => {
                CredentialsError::StrategyNotDefined.into()
            }
            Self::UserNotActive(_) => CredentialsError::UserNotActive.into(),
        })
    }
}

impl AsError for command::create_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::UserNotActive(_) => {
                Some(CredentialsError::UserNotActive.into())
            }
            Self::UserNotExists(_) => None,
        }
    }
}

impl AsError for command::create_contract::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "OFFER_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`Offer` with the specified ID does not exist"]
                OfferNotExists,

                #[code = "OFFER_INACTIVE"]
                #[status = CONFLICT]
                #[message = "`Offer` is closed"]
                OfferInactive,

                #[code = "OFFER_NOT_APPROVED"]
                #[status = CONFLICT]
                #[message = "`Offer` is not accepted by the contractor or \
                             the supplier"]
                OfferNotApproved,

                #[code = "JOB_REQUEST_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "Job request of the `Offer` does not exist"]
                JobRequestNotExists,

                #[code = "JOB_REQUEST_INACTIVE"]
                #[status = CONFLICT]
                #[message = "Job request of the `Offer` is closed"]
                JobRequestInactive,

                #[code = "JOB_REQUEST_INTERNAL"]
                #[status = CONFLICT]
                #[message = "Job request is internal, while the contractor \
                             is from another company"]
                JobRequestInternal,

                #[code = "PAYMENT_SOURCE_REQUIRED"]
                #[status = BAD_REQUEST]
                #[message = "Payment source is required"]
                PaymentSourceRequired,

                #[code = "PAYMENT_SOURCE_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "Payment source with the specified ID does not \
                             exist"]
                PaymentSourceNotExists,

                #[code = "NOT_OFFER_CUSTOMER"]
                #[status = FORBIDDEN]
                #[message = "Authenticated `User` must be an employer of \
                             the customer company"]
                NotOfferCustomer,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::UserNotExists(_) => return None,
            Self::JobRequestInactive(_) => Error::JobRequestInactive.into(),
            Self::JobRequestInternal(_) => Error::JobRequestInternal.into(),
            Self::JobRequestNotExists(_) => Error::JobRequestNotExists.into(),
            Self::NotOfferCustomer(_) => Error::NotOfferCustomer.into(),
            Self::OfferInactive(_) => Error::OfferInactive.into(),
            Self::OfferNotApproved(_) => Error::OfferNotApproved.into(),
            Self::OfferNotExists(_) => Error::OfferNotExists.into(),
            Self::PaymentSourceNotExists(_) => {
                Error::PaymentSourceNotExists.into()
            }
            Self::PaymentSourceRequired => Error::PaymentSourceRequired.into(),
        })
    }
}

impl AsError for command::close_contract::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "NOT_CONTRACT_PARTICIPANT"]
                #[status = FORBIDDEN]
                #[message = "Authenticated `User` doesn't participate in \
                             the `Contract`"]
                NotParticipant,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::MarkClosed(e) => e.try_as_error(),
            Self::UserNotExists(_) => None,
            Self::ContractNotExists(_) => {
                Some(api::query::ContractError::NotExists.into())
            }
            Self::NotParticipant(_) => Some(Error::NotParticipant.into()),
        }
    }
}

impl AsError for command::mark_contract_closed::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ContractNotExists(_) => {
                Some(api::query::ContractError::NotExists.into())
            }
        }
    }
}

impl AsError for command::submit_timesheet::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "TIMESHEET_ALREADY_SUBMITTED"]
                #[status = CONFLICT]
                #[message = "`Timesheet` for the current week is submitted \
                             already"]
                AlreadySubmitted,

                #[code = "INTERNAL_CONTRACT"]
                #[status = CONFLICT]
                #[message = "Timesheets are not available for internal \
                             contracts"]
                InternalContract,

                #[code = "NOT_CONTRACT_EMPLOYEE"]
                #[status = FORBIDDEN]
                #[message = "Authenticated `User` must be the contractor of \
                             the `Contract`"]
                NotContractEmployee,

                #[code = "WEEK_OUT_OF_RANGE"]
                #[status = CONFLICT]
                #[message = "No current week in the `Contract`"]
                WeekOutOfRange,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::ContractNotExists(_) => {
                api::query::ContractError::NotExists.into()
            }
            Self::AlreadySubmitted(_) => Error::AlreadySubmitted.into(),
            Self::InternalContract(_) => Error::InternalContract.into(),
            Self::NotContractEmployee(_) => Error::NotContractEmployee.into(),
            Self::WeekOutOfRange(_) => Error::WeekOutOfRange.into(),
        })
    }
}

#[cfg(test)]
mod spec {
    use service::{
        command::{close_contract, submit_timesheet},
        domain::{contract, user},
    };

    use crate::AsError as _;

    #[test]
    fn describes_timesheet_rejections() {
        let err = submit_timesheet::ExecutionError::InternalContract(
            contract::Id::new(),
        )
        .as_error();
        assert_eq!(err.code, "INTERNAL_CONTRACT");
        assert_eq!(err.status_code, http::StatusCode::CONFLICT);
        assert_eq!(
            err.message,
            "Timesheets are not available for internal contracts",
        );

        let err = submit_timesheet::ExecutionError::ContractNotExists(
            contract::Id::new(),
        )
        .as_error();
        assert_eq!(err.code, "CONTRACT_NOT_EXISTS");
        assert_eq!(err.status_code, http::StatusCode::NOT_FOUND);
    }

    #[test]
    fn forbids_closing_by_outsider() {
        let err = close_contract::ExecutionError::NotParticipant(
            user::Id::new(),
        )
        .as_error();
        assert_eq!(err.code, "NOT_CONTRACT_PARTICIPANT");
        assert_eq!(err.status_code, http::StatusCode::FORBIDDEN);
    }
}
