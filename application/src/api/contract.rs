//! [`Contract`]-related definitions.

use common::{Date, DateTime, Money};
use derive_more::{AsRef, Display, From, Into};
use futures::{future, TryFutureExt as _};
use juniper::{graphql_object, GraphQLEnum, GraphQLObject, GraphQLScalar};
use service::{domain, query, read, Query as _};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    AsError, Context, Error,
};

/// A [`Contract`] between a customer company and a contractor.
#[derive(Clone, Debug)]
pub struct Contract {
    /// ID of this [`Contract`].
    pub id: Id,

    /// [`domain::Contract`] representing this [`Contract`].
    contract: OnceCell<domain::Contract>,
}

impl From<domain::Contract> for Contract {
    fn from(contract: domain::Contract) -> Self {
        Self {
            id: contract.id.into(),
            contract: OnceCell::new_with(Some(contract)),
        }
    }
}

impl Contract {
    /// Creates a new [`Contract`] with the provided ID.
    ///
    /// # Safety
    ///
    /// Caller must ensure that [`Contract`] with the provided ID exists,
    /// otherwise accessing this [`Contract`] will result with an error.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            contract: OnceCell::new(),
        }
    }

    /// Returns the [`domain::Contract`] representing this [`Contract`].
    ///
    /// # Errors
    ///
    /// Error if the [`domain::Contract`] doesn't exist.
    pub(crate) async fn contract(
        &self,
        ctx: &Context,
    ) -> Result<&domain::Contract, Error> {
        let id = self.id.into();
        self.contract
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::contract::ById::by(id))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
                    .and_then(|c| {
                        future::ready(c.ok_or_else(|| {
                            api::query::ContractError::NotExists.into()
                        }))
                    })
            })
            .await
    }
}

/// A `Contract` between a customer company and a contractor.
#[graphql_object(context = Context)]
impl Contract {
    /// Unique identifier of this `Contract`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Contractor doing the work under this `Contract`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.employee",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn employee(&self, ctx: &Context) -> Result<api::User, Error> {
        let id = self.contract(ctx).await?.employee_id;
        #[expect(unsafe_code, reason = "`Contract` references existing `User`")]
        let employee = unsafe { api::User::new_unchecked(id) };
        Ok(employee)
    }

    /// ID of the customer company.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.customerId",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn customer_id(&self, ctx: &Context) -> Result<CompanyId, Error> {
        Ok(self.contract(ctx).await?.customer_id.into())
    }

    /// ID of the supplier company, if the contractor is not a freelancer.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.supplierId",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn supplier_id(
        &self,
        ctx: &Context,
    ) -> Result<Option<CompanyId>, Error> {
        Ok(self.contract(ctx).await?.supplier_id.map(Into::into))
    }

    /// First day of this `Contract`.
    pub async fn date_started(&self, ctx: &Context) -> Result<Date, Error> {
        Ok(self.contract(ctx).await?.date_started)
    }

    /// Last day of this `Contract` (inclusive).
    pub async fn date_finished(&self, ctx: &Context) -> Result<Date, Error> {
        Ok(self.contract(ctx).await?.date_finished)
    }

    /// Weekly allocation of hours.
    pub async fn hours_per_week(&self, ctx: &Context) -> Result<i32, Error> {
        Ok(i16::from(self.contract(ctx).await?.hours_per_week).into())
    }

    /// Hourly rate of the contractor.
    pub async fn capacity_rate(&self, ctx: &Context) -> Result<Money, Error> {
        Ok(self.contract(ctx).await?.capacity_rate)
    }

    /// Cost of a single full week of this `Contract`.
    pub async fn weekly_cost(&self, ctx: &Context) -> Result<Money, Error> {
        Ok(self.contract(ctx).await?.weekly_cost())
    }

    /// Indicator whether the customer and the supplier of this `Contract`
    /// are the same company.
    pub async fn is_internal(&self, ctx: &Context) -> Result<bool, Error> {
        Ok(self.contract(ctx).await?.is_internal())
    }

    /// Indicator whether this `Contract` is not closed yet.
    pub async fn is_active(&self, ctx: &Context) -> Result<bool, Error> {
        Ok(self.contract(ctx).await?.is_active())
    }

    /// Details of this `Contract` closing, if it's closed.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.closing",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn closing(
        &self,
        ctx: &Context,
    ) -> Result<Option<Closing>, Error> {
        Ok(self.contract(ctx).await?.closing.clone().map(Into::into))
    }

    /// `DateTime` when this `Contract` was signed.
    pub async fn created_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.contract(ctx).await?.created_at.coerce())
    }

    /// `Timesheet`s submitted for this `Contract`, ordered by their weeks.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.timesheets",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn timesheets(
        &self,
        ctx: &Context,
    ) -> Result<Vec<api::Timesheet>, Error> {
        let contract = self.contract(ctx).await?;
        let shares = ctx.service().config().payout_shares;
        ctx.service()
            .execute(query::timesheet::ByContractId::by(contract.id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|ts| {
                ts.into_iter()
                    .map(|t| {
                        api::Timesheet::new(t, contract.capacity_rate, shares)
                    })
                    .collect()
            })
    }

    /// `Deposit` of this `Contract`, if requested.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.deposit",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn deposit(
        &self,
        ctx: &Context,
    ) -> Result<Option<Deposit>, Error> {
        ctx.service()
            .execute(query::billing::DepositByContractId::by(self.id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|d| d.map(Into::into))
    }

    /// Sums of the succeeded payments made under this `Contract`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Contract.paymentsAmount",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn payments_amount(
        &self,
        ctx: &Context,
    ) -> Result<PaymentsAmount, Error> {
        let currency = self.contract(ctx).await?.capacity_rate.currency;
        let amount = ctx
            .service()
            .execute(query::billing::PaymentsAmountByContractId::by(
                self.id.into(),
            ))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;
        let money = |amount| Money { amount, currency };
        Ok(PaymentsAmount {
            customer_paid: money(amount.customer_paid),
            supplier_received: money(amount.supplier_received),
            contractor_received: money(amount.contractor_received),
        })
    }
}

/// Unique identifier of a `Contract`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::contract::Id)]
#[into(domain::contract::Id)]
#[graphql(name = "ContractId", transparent)]
pub struct Id(Uuid);

/// Unique identifier of a `Company`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::company::Id)]
#[into(domain::company::Id)]
#[graphql(name = "CompanyId", transparent)]
pub struct CompanyId(Uuid);

/// Unique identifier of an `Offer`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::offer::Id)]
#[into(domain::offer::Id)]
#[graphql(name = "OfferId", transparent)]
pub struct OfferId(Uuid);

/// Unique identifier of a `PaymentSource`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::billing::payment_source::Id)]
#[into(domain::billing::payment_source::Id)]
#[graphql(name = "PaymentSourceId", transparent)]
pub struct PaymentSourceId(Uuid);

/// Explanation of a `Contract` closing.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ContractClosingMessage",
    with = scalar::Via::<domain::contract::ClosingMessage>,
)]
pub struct ClosingMessage(domain::contract::ClosingMessage);

/// Details of a `Contract` closing.
#[derive(Clone, Debug, GraphQLObject)]
#[graphql(context = Context, name = "ContractClosing")]
pub struct Closing {
    /// Reason of the closing.
    pub reason: ClosingReason,

    /// Explanation of the closing.
    pub message: ClosingMessage,

    /// `User` who closed the `Contract` manually.
    pub closed_by: Option<api::User>,

    /// `DateTime` when the `Contract` was closed.
    pub closed_at: DateTime,
}

impl From<domain::contract::Closing> for Closing {
    fn from(closing: domain::contract::Closing) -> Self {
        let domain::contract::Closing {
            reason,
            message,
            closed_by,
            closed_at,
        } = closing;
        #[expect(
            unsafe_code,
            reason = "`Contract` is closed by an existing `User`"
        )]
        let closed_by =
            closed_by.map(|id| unsafe { api::User::new_unchecked(id) });
        Self {
            reason: reason.into(),
            message: message.into(),
            closed_by,
            closed_at: closed_at.coerce(),
        }
    }
}

/// Reason of a `Contract` closing.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "ContractClosingReason")]
pub enum ClosingReason {
    /// Closed by one of the participants.
    Manually,

    /// The last day of the `Contract` has passed.
    Expired,

    /// The customer has troubles with payments.
    Unpaid,

    /// One of the sides lacks an account for payouts.
    NoPayoutAccount,
}

impl From<domain::contract::ClosingReason> for ClosingReason {
    fn from(reason: domain::contract::ClosingReason) -> Self {
        use domain::contract::ClosingReason as R;

        match reason {
            R::Manually => Self::Manually,
            R::Expired => Self::Expired,
            R::Unpaid => Self::Unpaid,
            R::NoPayoutAccount => Self::NoPayoutAccount,
        }
    }
}

/// Billing week of a `Contract`.
#[derive(Clone, Copy, Debug, GraphQLObject)]
#[graphql(name = "ContractWeek", context = Context)]
pub struct Week {
    /// First day of this week.
    pub date_started: Date,

    /// Last day of this week (inclusive).
    pub date_finished: Date,
}

impl From<domain::contract::Week> for Week {
    fn from(week: domain::contract::Week) -> Self {
        Self {
            date_started: week.date_started,
            date_finished: week.date_finished,
        }
    }
}

/// Deposit held from the customer for a `Contract`.
#[derive(Clone, Copy, Debug, GraphQLObject)]
#[graphql(name = "ContractDeposit", context = Context)]
pub struct Deposit {
    /// Held amount (the weekly cost of the `Contract`).
    pub amount: Money,

    /// Status of the deposit payment.
    pub status: PaymentStatus,

    /// `DateTime` when the deposit was requested.
    pub created_at: DateTime,

    /// `DateTime` when the deposit was last updated.
    pub updated_at: DateTime,
}

impl From<domain::billing::Deposit> for Deposit {
    fn from(deposit: domain::billing::Deposit) -> Self {
        Self {
            amount: deposit.amount,
            status: deposit.status.into(),
            created_at: deposit.created_at.coerce(),
            updated_at: deposit.updated_at.coerce(),
        }
    }
}

/// Status of a payment processed by the billing processor.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
pub enum PaymentStatus {
    /// Payment is requested, but not processed yet.
    Pending,

    /// Payment succeeded.
    Succeeded,

    /// Payment failed.
    Failed,

    /// Refund of a succeeded payment is requested.
    Refunding,

    /// Payment is refunded.
    Refunded,
}

impl From<domain::billing::Status> for PaymentStatus {
    fn from(status: domain::billing::Status) -> Self {
        use domain::billing::Status as S;

        match status {
            S::Pending => Self::Pending,
            S::Succeeded => Self::Succeeded,
            S::Failed => Self::Failed,
            S::Refunding => Self::Refunding,
            S::Refunded => Self::Refunded,
        }
    }
}

/// Sums of the succeeded payments made under a `Contract`.
#[derive(Clone, Copy, Debug, GraphQLObject)]
#[graphql(name = "ContractPaymentsAmount", context = Context)]
pub struct PaymentsAmount {
    /// Charged from the customer.
    pub customer_paid: Money,

    /// Paid out to the supplier company.
    pub supplier_received: Money,

    /// Paid out to the contractor.
    pub contractor_received: Money,
}

/// Period of a `Contract` relative to today.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "ContractPeriod")]
pub enum Period {
    /// Today is within the `Contract`.
    Current,

    /// The `Contract` has finished before today.
    Past,

    /// The `Contract` starts after today.
    Future,
}

impl From<Period> for read::contract::list::Period {
    fn from(period: Period) -> Self {
        match period {
            Period::Current => Self::Current,
            Period::Past => Self::Past,
            Period::Future => Self::Future,
        }
    }
}

/// Side of the employer's company in a `Contract`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "ContractSide")]
pub enum Side {
    /// The company is the customer.
    Incoming,

    /// The company is the supplier.
    Outgoing,
}

impl From<Side> for read::contract::list::Side {
    fn from(side: Side) -> Self {
        match side {
            Side::Incoming => Self::Incoming,
            Side::Outgoing => Self::Outgoing,
        }
    }
}

pub mod list {
    //! Definitions related to [`Contract`] list.

    use derive_more::{AsRef, From, Into};
    use juniper::{graphql_object, GraphQLScalar};
    use service::read;

    use crate::{api::scalar, Context};

    use super::{Contract, Id};

    /// Cursor for the `Contract` list.
    #[derive(AsRef, Clone, Copy, Debug, From, GraphQLScalar, Into)]
    #[from(Id, read::contract::list::Cursor)]
    #[graphql(
        name = "ContractListCursor",
        with = scalar::Via::<read::contract::list::Cursor>,
    )]
    pub struct Cursor(pub read::contract::list::Cursor);

    /// Edge in the [`Contract`] list.
    #[derive(Clone, Copy, Debug, From, Into)]
    pub struct Edge(read::contract::list::Edge);

    /// Edge in the `Contract` list.
    #[graphql_object(name = "ContractListEdge", context = Context)]
    impl Edge {
        /// Cursor of this `ContractListEdge`.
        #[must_use]
        pub fn cursor(&self) -> Cursor {
            self.0.cursor.into()
        }

        /// Node of this `ContractListEdge`.
        #[must_use]
        pub fn node(&self) -> Contract {
            #[expect(
                unsafe_code,
                reason = "`Edge` loaded from repository guarantees \
                          `Contract` existence"
            )]
            unsafe {
                Contract::new_unchecked(self.0.node)
            }
        }
    }

    /// Connection of the [`Contract`] list.
    #[derive(Clone, Debug, From, Into)]
    pub struct Connection(read::contract::list::Connection);

    /// Connection of the `Contract` list.
    #[graphql_object(name = "ContractListConnection", context = Context)]
    impl Connection {
        /// Edges in this `ContractListConnection`.
        #[must_use]
        pub fn edges(&self) -> Vec<Edge> {
            self.0.edges.iter().copied().map(Into::into).collect()
        }

        /// Information about the page.
        #[must_use]
        pub fn page_info(&self) -> PageInfo {
            PageInfo {
                info: self.0.page_info(),
                start_cursor: self.0.edges.first().map(|e| e.cursor.into()),
                end_cursor: self.0.edges.last().map(|e| e.cursor.into()),
            }
        }
    }

    /// Information about a [`Connection`] page.
    #[derive(Clone, Copy, Debug)]
    pub struct PageInfo {
        /// Underlying [`read::contract::list::PageInfo`].
        info: read::contract::list::PageInfo,

        /// Start cursor of the page.
        start_cursor: Option<Cursor>,

        /// End cursor of the page.
        end_cursor: Option<Cursor>,
    }

    /// Information about a `ContractListConnection` page.
    #[graphql_object(name = "ContractListPageInfo", context = Context)]
    impl PageInfo {
        /// Indicator whether there is a next page.
        #[must_use]
        pub fn has_next_page(&self) -> bool {
            self.info.has_next_page
        }

        /// Indicator whether there is a previous page.
        #[must_use]
        pub fn has_previous_page(&self) -> bool {
            self.info.has_previous_page
        }

        /// Start cursor of the page.
        #[must_use]
        pub fn start_cursor(&self) -> &Option<Cursor> {
            &self.start_cursor
        }

        /// End cursor of the page.
        #[must_use]
        pub fn end_cursor(&self) -> &Option<Cursor> {
            &self.end_cursor
        }
    }
}
