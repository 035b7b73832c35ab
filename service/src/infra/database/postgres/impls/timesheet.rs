//! [`Timesheet`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select};
use tracerr::Traced;

use crate::{
    domain::{contract, Timesheet},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Select<By<Vec<Timesheet>, contract::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Timesheet>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Timesheet>, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let contract_id: contract::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, contract_id, hours_count, \
                   date_started, date_finished, created_at \
            FROM timesheets \
            WHERE contract_id = $1::UUID \
            ORDER BY date_started ASC";
        Ok(self
            .query(SQL, &[&contract_id])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| Timesheet {
                id: row.get("id"),
                contract_id: row.get("contract_id"),
                hours_count: row.get("hours_count"),
                date_started: row.get("date_started"),
                date_finished: row.get("date_finished"),
                created_at: row.get("created_at"),
            })
            .collect())
    }
}

impl<C> Database<Insert<Timesheet>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(timesheet): Insert<Timesheet>,
    ) -> Result<Self::Ok, Self::Err> {
        let Timesheet {
            id,
            contract_id,
            hours_count,
            date_started,
            date_finished,
            created_at,
        } = timesheet;

        const SQL: &str = "\
            INSERT INTO timesheets (\
                id, contract_id, hours_count, \
                date_started, date_finished, created_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::INT2, \
                $4::DATE, $5::DATE, $6::TIMESTAMPTZ\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &contract_id,
                &hours_count,
                &date_started,
                &date_finished,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}
