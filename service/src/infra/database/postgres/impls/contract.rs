//! [`Contract`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::{
    operations::{By, Insert, Lock, Select},
    Money,
};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        billing,
        contract::{self, Closing, ClosingMessage},
        Contract,
    },
    infra::{
        database::{
            self,
            postgres::{Connection, Tx},
            Postgres,
        },
        Database,
    },
    read::{
        self,
        contract::list::{Participant, Period, Side},
    },
};

/// Reads a [`Contract`] from the provided `contracts` table [`Row`].
fn contract_from_row(row: &Row) -> Contract {
    let closing = row
        .get::<_, Option<contract::ClosingReason>>("closing_reason")
        .zip(row.get::<_, Option<contract::ClosingDateTime>>("closed_at"))
        .map(|(reason, closed_at)| Closing {
            reason,
            message: row
                .get::<_, Option<ClosingMessage>>("closing_message")
                .unwrap_or_default(),
            closed_by: row.get("closed_by"),
            closed_at,
        });
    Contract {
        id: row.get("id"),
        employee_id: row.get("employee_id"),
        job_request_id: row.get("job_request_id"),
        customer_id: row.get("customer_id"),
        supplier_id: row.get("supplier_id"),
        payment_source_id: row.get("payment_source_id"),
        date_started: row.get("date_started"),
        date_finished: row.get("date_finished"),
        hours_per_week: row.get("hours_per_week"),
        capacity_rate: Money {
            amount: row.get("capacity_rate"),
            currency: row.get("capacity_rate_currency"),
        },
        closing,
        created_at: row.get("created_at"),
    }
}

impl<C, IDs> Database<Select<By<HashMap<contract::Id, Contract>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[contract::Id]>,
{
    type Ok = HashMap<contract::Id, Contract>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<contract::Id, Contract>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[contract::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let limit = i32::try_from(ids.len()).unwrap_or(i32::MAX);

        const SQL: &str = "\
            SELECT id, employee_id, job_request_id, \
                   customer_id, supplier_id, payment_source_id, \
                   date_started, date_finished, \
                   hours_per_week, capacity_rate, capacity_rate_currency, \
                   closing_reason, closing_message, closed_by, closed_at, \
                   created_at \
            FROM contracts \
            WHERE id IN (SELECT unnest($1::UUID[]) LIMIT $2::INT4) \
            LIMIT $2::INT4";
        Ok(self
            .query(SQL, &[&ids, &limit])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(contract_from_row)
            .map(|c| (c.id, c))
            .collect())
    }
}

impl<C> Database<Select<By<Option<Contract>, contract::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<contract::Id, Contract>, [contract::Id; 1]>>,
        Ok = HashMap<contract::Id, Contract>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Contract>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Contract>, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<C> Database<Insert<Contract>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(contract): Insert<Contract>,
    ) -> Result<Self::Ok, Self::Err> {
        let Contract {
            id,
            employee_id,
            job_request_id,
            customer_id,
            supplier_id,
            payment_source_id,
            date_started,
            date_finished,
            hours_per_week,
            capacity_rate,
            closing,
            created_at,
        } = contract;
        let (closing_reason, closing_message, closed_by, closed_at) =
            closing.map_or((None, None, None, None), |c| {
                let Closing {
                    reason,
                    message,
                    closed_by,
                    closed_at,
                } = c;
                (Some(reason), Some(message), closed_by, Some(closed_at))
            });

        const SQL: &str = "\
            INSERT INTO contracts (\
                id, employee_id, job_request_id, \
                customer_id, supplier_id, payment_source_id, \
                date_started, date_finished, \
                hours_per_week, capacity_rate, capacity_rate_currency, \
                closing_reason, closing_message, closed_by, closed_at, \
                created_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, \
                $4::UUID, $5::UUID, $6::UUID, \
                $7::DATE, $8::DATE, \
                $9::INT2, $10::NUMERIC, $11::INT2, \
                $12::INT2, $13::TEXT, $14::UUID, $15::TIMESTAMPTZ, \
                $16::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET payment_source_id = EXCLUDED.payment_source_id, \
                closing_reason = EXCLUDED.closing_reason, \
                closing_message = EXCLUDED.closing_message, \
                closed_by = EXCLUDED.closed_by, \
                closed_at = EXCLUDED.closed_at";
        self.exec(
            SQL,
            &[
                &id,
                &employee_id,
                &job_request_id,
                &customer_id,
                &supplier_id,
                &payment_source_id,
                &date_started,
                &date_finished,
                &hours_per_week,
                &capacity_rate.amount,
                &capacity_rate.currency,
                &closing_reason,
                &closing_message,
                &closed_by,
                &closed_at,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl Database<Lock<By<Contract, contract::Id>>> for Postgres<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Contract, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: contract::Id = by.into_inner();
        self.advisory_lock("contracts", id.into())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Select<By<Vec<contract::Id>, read::contract::Expired>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<contract::Id>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<contract::Id>, read::contract::Expired>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::contract::Expired { today } = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM contracts \
            WHERE closed_at IS NULL \
              AND date_finished < $1::DATE \
            ORDER BY id ASC";
        self.query(SQL, &[&today])
            .await
            .map_err(tracerr::wrap!())
            .map(|rows| rows.into_iter().map(|row| row.get("id")).collect())
    }
}

impl<C> Database<Select<By<Vec<contract::Id>, read::contract::Unpaid>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<contract::Id>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<contract::Id>, read::contract::Unpaid>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::contract::Unpaid { failed_before } = by.into_inner();

        const SQL: &str = "\
            SELECT c.id \
            FROM contracts AS c \
            WHERE c.closed_at IS NULL \
              AND (EXISTS (\
                       SELECT 1 \
                       FROM deposits AS d \
                       WHERE d.contract_id = c.id \
                         AND d.status = $1::INT2 \
                         AND d.created_at < $2::TIMESTAMPTZ\
                   ) \
                   OR EXISTS (\
                       SELECT 1 \
                       FROM timesheet_payments AS p \
                       INNER JOIN timesheets AS t ON t.id = p.timesheet_id \
                       WHERE t.contract_id = c.id \
                         AND p.status = $1::INT2 \
                         AND p.created_at < $2::TIMESTAMPTZ\
                   )) \
            ORDER BY c.id ASC";
        self.query(SQL, &[&billing::Status::Failed, &failed_before])
            .await
            .map_err(tracerr::wrap!())
            .map(|rows| rows.into_iter().map(|row| row.get("id")).collect())
    }
}

impl<C>
    Database<Select<By<Vec<contract::Id>, read::contract::WithoutPayout>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<contract::Id>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<contract::Id>, read::contract::WithoutPayout>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::contract::WithoutPayout { created_before } = by.into_inner();

        const SQL: &str = "\
            SELECT c.id \
            FROM contracts AS c \
            INNER JOIN users AS u ON u.id = c.employee_id \
            LEFT JOIN companies AS s ON s.id = c.supplier_id \
            WHERE c.closed_at IS NULL \
              AND c.created_at < $1::TIMESTAMPTZ \
              AND (u.payout_account IS NULL \
                   OR (s.id IS NOT NULL AND s.payout_account IS NULL)) \
            ORDER BY c.id ASC";
        self.query(SQL, &[&created_before])
            .await
            .map_err(tracerr::wrap!())
            .map(|rows| rows.into_iter().map(|row| row.get("id")).collect())
    }
}

impl<C> Database<Select<By<Vec<contract::Id>, read::contract::Billable>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<contract::Id>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<contract::Id>, read::contract::Billable>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            SELECT id \
            FROM contracts \
            WHERE closed_at IS NULL \
              AND supplier_id IS DISTINCT FROM customer_id \
            ORDER BY id ASC";
        self.query(SQL, &[])
            .await
            .map_err(tracerr::wrap!())
            .map(|rows| rows.into_iter().map(|row| row.get("id")).collect())
    }
}

impl<C>
    Database<
        Select<By<read::contract::list::Page, read::contract::list::Selector>>,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = read::contract::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::contract::list::Page, read::contract::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::contract::list::Selector {
            arguments,
            filter:
                read::contract::list::Filter {
                    participant,
                    period,
                    side,
                    is_active,
                    today,
                },
        } = by.into_inner();

        let limit =
            i32::try_from(arguments.limit()).unwrap_or(i32::MAX - 1) + 1;

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&limit];

        let cursor_idx = arguments.cursor().map(|c| {
            ps.push(c);
            ps.len()
        });
        let participant_filtering = match &participant {
            Participant::Employee(id) => {
                ps.push(id);
                format!("employee_id = ${}::UUID", ps.len())
            }
            Participant::Company(id) => {
                ps.push(id);
                let idx = ps.len();
                match side {
                    Some(Side::Incoming) => {
                        format!("customer_id = ${idx}::UUID")
                    }
                    Some(Side::Outgoing) => {
                        format!("supplier_id = ${idx}::UUID")
                    }
                    None => format!(
                        "(customer_id = ${idx}::UUID \
                          OR supplier_id = ${idx}::UUID)",
                    ),
                }
            }
        };
        let today_idx = period.map(|p| {
            ps.push(&today);
            (p, ps.len())
        });

        let sql = format!(
            "SELECT id \
             FROM contracts \
             WHERE {participant_filtering} \
                   {cursor} \
                   {period_filtering} \
                   {activity_filtering} \
             ORDER BY id {order} \
             LIMIT $1::INT4",
            cursor = cursor_idx.into_iter().format_with("", |idx, f| {
                let op = arguments.kind().operator();
                f(&format_args!("AND id {op} ${idx}::UUID"))
            }),
            period_filtering =
                today_idx.into_iter().format_with("", |(p, idx), f| match p {
                    Period::Current => f(&format_args!(
                        "AND date_started <= ${idx}::DATE \
                         AND date_finished >= ${idx}::DATE"
                    )),
                    Period::Past => {
                        f(&format_args!("AND date_finished < ${idx}::DATE"))
                    }
                    Period::Future => {
                        f(&format_args!("AND date_started > ${idx}::DATE"))
                    }
                }),
            activity_filtering = match is_active {
                Some(true) => "AND closed_at IS NULL",
                Some(false) => "AND closed_at IS NOT NULL",
                None => "",
            },
            order = arguments.kind().order().sql(),
        );
        let rows = self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?;

        let has_more = rows.len() > arguments.limit();
        let edges = rows
            .into_iter()
            .take(arguments.limit())
            .map(|row| {
                let id = row.get("id");
                (id, id)
            })
            .collect::<Vec<_>>();

        Ok(read::contract::list::Page::new(&arguments, edges, has_more))
    }
}
