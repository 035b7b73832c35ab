//! GraphQL [`Query`]s definitions.

use common::Date;
use juniper::graphql_object;
use service::{domain, query, read, Query as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the currently authenticated `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "myUser",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn my_user(ctx: &Context) -> Result<api::User, Error> {
        my_user(ctx).await.map(Into::into)
    }

    /// Returns the `Contract` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `CONTRACT_NOT_EXISTS` - the `Contract` with the specified ID does
    ///                           not exist or the current `User` doesn't
    ///                           participate in it.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "contract",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn contract(
        id: api::contract::Id,
        ctx: &Context,
    ) -> Result<api::Contract, Error> {
        participated_contract(id, ctx).await.map(Into::into)
    }

    /// Fetches the page of `Contract`s the current `User` participates in.
    ///
    /// Employees see their own `Contract`s and may narrow them by `period`.
    /// Employers see the `Contract`s of their company and may narrow them by
    /// `side`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AMBIGUOUS_PAGINATION_ARGUMENTS` - the pagination arguments are
    ///                                      ambiguous;
    /// - `NO_COMPANY` - the current `User` is an employer without a
    ///                  company.
    #[expect(clippy::too_many_arguments, reason = "GraphQL arguments")]
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            before = ?before,
            first = ?first,
            gql.name = "contracts",
            is_active = ?is_active,
            last = ?last,
            otel.name = Self::SPAN_NAME,
            period = ?period,
            side = ?side,
        ),
    )]
    pub async fn contracts(
        first: Option<i32>,
        after: Option<api::contract::list::Cursor>,
        last: Option<i32>,
        before: Option<api::contract::list::Cursor>,
        period: Option<api::contract::Period>,
        side: Option<api::contract::Side>,
        is_active: Option<bool>,
        ctx: &Context,
    ) -> Result<api::contract::list::Connection, Error> {
        const DEFAULT_PAGE_SIZE: i32 = 10;

        let arguments = read::contract::list::Arguments::new(
            first,
            after.map(Into::into),
            last,
            before.map(Into::into),
            DEFAULT_PAGE_SIZE,
        )
        .ok_or_else(|| api::PaginationError::Ambiguous.into())
        .map_err(ctx.error())?;

        let me = my_user(ctx).await?;
        let participant = match me.role {
            domain::user::Role::Employee => {
                read::contract::list::Participant::Employee(me.id)
            }
            domain::user::Role::Employer => me
                .company_id
                .map(read::contract::list::Participant::Company)
                .ok_or_else(|| api::PrivilegeError::Company.into())
                .map_err(ctx.error())?,
        };

        ctx.service()
            .execute(query::contracts::List::by(
                read::contract::list::Selector {
                    arguments,
                    filter: read::contract::list::Filter {
                        participant,
                        period: period.map(Into::into),
                        side: side.map(Into::into),
                        is_active,
                        today: Date::today(),
                    },
                },
            ))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the weeks of the active `Contract` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `CONTRACT_NOT_EXISTS` - the `Contract` with the specified ID does
    ///                           not exist;
    /// - `NOT_CONTRACT_PARTICIPANT` - the current `User` doesn't participate
    ///                                in the `Contract`;
    /// - `CONTRACT_NOT_ACTIVE` - the `Contract` is closed.
    #[tracing::instrument(
        skip_all,
        fields(
            contract_id = %contract_id,
            gql.name = "schedule",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn schedule(
        contract_id: api::contract::Id,
        ctx: &Context,
    ) -> Result<Vec<api::contract::Week>, Error> {
        let me = my_user(ctx).await?;
        let contract = existing_contract(contract_id, ctx).await?;
        schedule_of(&contract, &me)
            .map(|weeks| weeks.map(Into::into).collect())
            .map_err(Error::from)
            .map_err(ctx.error())
    }
}

/// Loads the currently authenticated [`domain::User`].
///
/// # Errors
///
/// If the current session is not authenticated, or its [`domain::User`]
/// doesn't exist anymore.
pub(crate) async fn my_user(ctx: &Context) -> Result<domain::User, Error> {
    let my_id = ctx.current_session().await?.user_id;
    ctx.service()
        .execute(query::user::ById::by(my_id.into()))
        .await
        .map_err(AsError::into_error)
        .map_err(ctx.error())?
        .ok_or_else(|| UserError::NotExists.into())
        .map_err(ctx.error())
}

/// Loads the [`domain::Contract`] with the provided ID, if the currently
/// authenticated [`domain::User`] participates in it.
///
/// # Errors
///
/// If the [`domain::Contract`] doesn't exist, or the current
/// [`domain::User`] is not its participant.
async fn participated_contract(
    id: api::contract::Id,
    ctx: &Context,
) -> Result<domain::Contract, Error> {
    let me = my_user(ctx).await?;
    Some(existing_contract(id, ctx).await?)
        .filter(|c| c.is_participant(&me))
        .ok_or_else(|| ContractError::NotExists.into())
        .map_err(ctx.error())
}

/// Loads the [`domain::Contract`] with the provided ID.
///
/// # Errors
///
/// If the [`domain::Contract`] doesn't exist.
async fn existing_contract(
    id: api::contract::Id,
    ctx: &Context,
) -> Result<domain::Contract, Error> {
    ctx.service()
        .execute(query::contract::ById::by(id.into()))
        .await
        .map_err(AsError::into_error)
        .map_err(ctx.error())?
        .ok_or_else(|| ContractError::NotExists.into())
        .map_err(ctx.error())
}

/// Returns the weeks of the provided [`domain::Contract`] as seen by the
/// provided [`domain::User`].
///
/// # Errors
///
/// If the [`domain::User`] doesn't participate in the [`domain::Contract`],
/// or the [`domain::Contract`] is closed.
fn schedule_of(
    contract: &domain::Contract,
    me: &domain::User,
) -> Result<domain::contract::Schedule, ContractError> {
    if !contract.is_participant(me) {
        return Err(ContractError::NotParticipant);
    }
    if !contract.is_active() {
        return Err(ContractError::NotActive);
    }
    Ok(contract.schedule())
}

define_error! {
    enum ContractError {
        #[code = "CONTRACT_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Contract` with the specified ID does not exist"]
        NotExists,

        #[code = "CONTRACT_NOT_ACTIVE"]
        #[status = NOT_FOUND]
        #[message = "`Contract` with the specified ID is closed"]
        NotActive,

        #[code = "NOT_CONTRACT_PARTICIPANT"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` doesn't participate in the \
                     `Contract`"]
        NotParticipant,
    }
}

define_error! {
    enum UserError {
        #[code = "USER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`User` with the specified ID does not exist"]
        NotExists,
    }
}

#[cfg(test)]
mod spec {
    use common::{Date, Money};
    use service::domain::{
        company,
        contract::{self, ClosingMessage, ClosingReason, Hours},
        job_request, user, Contract, User,
    };

    use super::{schedule_of, ContractError};

    fn user(company_id: Option<company::Id>) -> User {
        let id = user::Id::new();
        User {
            id,
            name: user::Name::new("Jane Doe").unwrap(),
            email: user::Email::new(format!("{id}@example.com")).unwrap(),
            password_hash: None,
            facebook_id: None,
            role: if company_id.is_some() {
                user::Role::Employer
            } else {
                user::Role::Employee
            },
            company_id,
            payout_account: None,
            created_at: user::CreationDateTime::now(),
            deleted_at: None,
        }
    }

    fn contract(employee: &User) -> Contract {
        Contract {
            id: contract::Id::new(),
            employee_id: employee.id,
            job_request_id: job_request::Id::new(),
            customer_id: company::Id::new(),
            supplier_id: None,
            payment_source_id: None,
            date_started: "2030-01-01".parse().unwrap(),
            date_finished: "2030-01-14".parse().unwrap(),
            hours_per_week: Hours::new(40).unwrap(),
            capacity_rate: "25.50USD".parse::<Money>().unwrap(),
            closing: None,
            created_at: contract::CreationDateTime::now(),
        }
    }

    #[test]
    fn shows_schedule_to_participants() {
        let employee = user(None);
        let c = contract(&employee);
        let customer = user(Some(c.customer_id));

        for me in [&employee, &customer] {
            let weeks = schedule_of(&c, me).unwrap().collect::<Vec<_>>();
            assert_eq!(weeks.len(), 2);
            assert_eq!(
                weeks[1].date_finished,
                "2030-01-14".parse::<Date>().unwrap(),
            );
        }
    }

    #[test]
    fn forbids_schedule_to_outsiders() {
        let employee = user(None);
        let c = contract(&employee);

        for outsider in [user(None), user(Some(company::Id::new()))] {
            let err = schedule_of(&c, &outsider).unwrap_err();
            assert!(matches!(err, ContractError::NotParticipant), "{err}");
            assert_eq!(
                crate::Error::from(err).status_code,
                http::StatusCode::FORBIDDEN,
            );
        }
    }

    #[test]
    fn hides_schedule_of_closed_contract() {
        let employee = user(None);
        let mut c = contract(&employee);
        assert!(c.close(
            ClosingReason::Manually,
            ClosingMessage::default(),
            Some(employee.id),
        ));

        let err = schedule_of(&c, &employee).unwrap_err();
        assert!(matches!(err, ContractError::NotActive), "{err}");
        assert_eq!(
            crate::Error::from(err).status_code,
            http::StatusCode::NOT_FOUND,
        );
    }
}
