//! Billing-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Select},
    Money,
};
use tracerr::Traced;

use crate::{
    domain::{
        billing::{Deposit, Status, TimesheetPayment},
        contract, timesheet,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::billing::PaymentsAmount,
};

impl<C> Database<Select<By<Option<Deposit>, contract::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Deposit>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Deposit>, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let contract_id: contract::Id = by.into_inner();

        const SQL: &str = "\
            SELECT contract_id, amount, amount_currency, status, \
                   created_at, updated_at \
            FROM deposits \
            WHERE contract_id = $1::UUID";
        self.query_opt(SQL, &[&contract_id])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| {
                row.map(|row| Deposit {
                    contract_id: row.get("contract_id"),
                    amount: Money {
                        amount: row.get("amount"),
                        currency: row.get("amount_currency"),
                    },
                    status: row.get("status"),
                    created_at: row.get("created_at"),
                    updated_at: row.get("updated_at"),
                })
            })
    }
}

impl<C> Database<Insert<Deposit>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(deposit): Insert<Deposit>,
    ) -> Result<Self::Ok, Self::Err> {
        let Deposit {
            contract_id,
            amount,
            status,
            created_at,
            updated_at,
        } = deposit;

        const SQL: &str = "\
            INSERT INTO deposits (\
                contract_id, amount, amount_currency, status, \
                created_at, updated_at\
            ) \
            VALUES (\
                $1::UUID, $2::NUMERIC, $3::INT2, $4::INT2, \
                $5::TIMESTAMPTZ, $6::TIMESTAMPTZ\
            ) \
            ON CONFLICT (contract_id) DO UPDATE \
            SET status = EXCLUDED.status, \
                updated_at = EXCLUDED.updated_at";
        self.exec(
            SQL,
            &[
                &contract_id,
                &amount.amount,
                &amount.currency,
                &status,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Select<By<Vec<TimesheetPayment>, timesheet::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<TimesheetPayment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<TimesheetPayment>, timesheet::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let timesheet_id: timesheet::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, timesheet_id, status, \
                   amount, supplier_amount, contractor_amount, currency, \
                   created_at \
            FROM timesheet_payments \
            WHERE timesheet_id = $1::UUID \
            ORDER BY created_at ASC";
        Ok(self
            .query(SQL, &[&timesheet_id])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                let money = |column: &str| Money {
                    amount: row.get(column),
                    currency: row.get("currency"),
                };
                TimesheetPayment {
                    id: row.get("id"),
                    timesheet_id: row.get("timesheet_id"),
                    status: row.get("status"),
                    amount: money("amount"),
                    supplier_amount: money("supplier_amount"),
                    contractor_amount: money("contractor_amount"),
                    created_at: row.get("created_at"),
                }
            })
            .collect())
    }
}

impl<C> Database<Select<By<PaymentsAmount, contract::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = PaymentsAmount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<PaymentsAmount, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let contract_id: contract::Id = by.into_inner();

        const SQL: &str = "\
            SELECT COALESCE(SUM(p.amount), 0) AS customer_paid, \
                   COALESCE(SUM(p.supplier_amount), 0) AS supplier_received, \
                   COALESCE(SUM(p.contractor_amount), 0) \
                       AS contractor_received \
            FROM timesheet_payments AS p \
            INNER JOIN timesheets AS t ON t.id = p.timesheet_id \
            WHERE t.contract_id = $1::UUID \
              AND p.status = $2::INT2";
        self.query_opt(SQL, &[&contract_id, &Status::Succeeded])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| {
                row.map(|row| PaymentsAmount {
                    customer_paid: row.get("customer_paid"),
                    supplier_received: row.get("supplier_received"),
                    contractor_received: row.get("contractor_received"),
                })
                .unwrap_or_default()
            })
    }
}
