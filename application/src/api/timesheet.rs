//! [`Timesheet`]-related definitions.

use common::{Date, DateTime, Money};
use derive_more::{Display, From, Into};
use juniper::{graphql_object, GraphQLObject, GraphQLScalar};
use service::{domain, query, Query as _};
use uuid::Uuid;

use crate::{api, AsError, Context, Error};

/// Weekly report of hours worked under a `Contract`.
#[derive(Clone, Debug)]
pub struct Timesheet {
    /// Underlying [`domain::Timesheet`].
    timesheet: domain::Timesheet,

    /// Split of the [`domain::Timesheet`] amount.
    amounts: domain::timesheet::Amounts,
}

impl Timesheet {
    /// Wraps the provided [`domain::Timesheet`] billed at the provided
    /// hourly `rate`.
    #[must_use]
    pub fn new(
        timesheet: domain::Timesheet,
        rate: Money,
        shares: domain::timesheet::PayoutShares,
    ) -> Self {
        let amounts = timesheet.amounts(rate, shares);
        Self { timesheet, amounts }
    }
}

/// Weekly report of hours worked under a `Contract`.
#[graphql_object(context = Context)]
impl Timesheet {
    /// Unique identifier of this `Timesheet`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.timesheet.id.into()
    }

    /// ID of the `Contract` this `Timesheet` belongs to.
    #[must_use]
    pub fn contract_id(&self) -> api::contract::Id {
        self.timesheet.contract_id.into()
    }

    /// Number of hours worked during the week.
    #[must_use]
    pub fn hours_count(&self) -> i32 {
        i16::from(self.timesheet.hours_count).into()
    }

    /// First day of the reported week.
    #[must_use]
    pub fn date_started(&self) -> Date {
        self.timesheet.date_started
    }

    /// Last day of the reported week (inclusive).
    #[must_use]
    pub fn date_finished(&self) -> Date {
        self.timesheet.date_finished
    }

    /// Split of the amount billed for this `Timesheet`.
    #[must_use]
    pub fn amounts(&self) -> Amounts {
        self.amounts.into()
    }

    /// `DateTime` when this `Timesheet` was submitted.
    #[must_use]
    pub fn created_at(&self) -> DateTime {
        self.timesheet.created_at.coerce()
    }

    /// Payments requested for this `Timesheet`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Timesheet.payments",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn payments(&self, ctx: &Context) -> Result<Vec<Payment>, Error> {
        ctx.service()
            .execute(query::billing::PaymentsByTimesheetId::by(
                self.timesheet.id,
            ))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|ps| ps.into_iter().map(Into::into).collect())
    }
}

/// Unique identifier of a `Timesheet`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::timesheet::Id)]
#[into(domain::timesheet::Id)]
#[graphql(name = "TimesheetId", transparent)]
pub struct Id(Uuid);

/// Split of a `Timesheet` amount.
#[derive(Clone, Copy, Debug, GraphQLObject)]
#[graphql(name = "TimesheetAmounts", context = Context)]
pub struct Amounts {
    /// Charged from the customer.
    pub customer: Money,

    /// Paid out to the supplier company.
    pub supplier: Money,

    /// Paid out to the contractor.
    pub contractor: Money,
}

impl From<domain::timesheet::Amounts> for Amounts {
    fn from(amounts: domain::timesheet::Amounts) -> Self {
        let domain::timesheet::Amounts {
            customer,
            supplier,
            contractor,
        } = amounts;
        Self {
            customer,
            supplier,
            contractor,
        }
    }
}

/// Payment requested for a `Timesheet`.
#[derive(Clone, Copy, Debug, GraphQLObject)]
#[graphql(name = "TimesheetPayment", context = Context)]
pub struct Payment {
    /// Status of this payment.
    pub status: api::contract::PaymentStatus,

    /// Amount charged from the customer.
    pub amount: Money,

    /// Amount paid out to the supplier company.
    pub supplier_amount: Money,

    /// Amount paid out to the contractor.
    pub contractor_amount: Money,

    /// `DateTime` when this payment was requested.
    pub created_at: DateTime,
}

impl From<domain::billing::TimesheetPayment> for Payment {
    fn from(payment: domain::billing::TimesheetPayment) -> Self {
        Self {
            status: payment.status.into(),
            amount: payment.amount,
            supplier_amount: payment.supplier_amount,
            contractor_amount: payment.contractor_amount,
            created_at: payment.created_at.coerce(),
        }
    }
}
