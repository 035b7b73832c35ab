//! [`Offer`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Select},
    Money,
};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{offer, user, Offer},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::Active,
};

/// Columns of the `offers` table, in the order [`offer_from_row()`] expects.
const COLUMNS: &str = "\
    id, job_request_id, contractor_id, \
    capacity_rate, capacity_rate_currency, \
    hours_per_week, date_started, weeks, \
    customer_accepted, supplier_accepted, contractor_accepted, \
    closed_at, created_at";

/// Reads an [`Offer`] from the provided [`Row`] selected with [`COLUMNS`].
fn offer_from_row(row: &Row) -> Offer {
    Offer {
        id: row.get("id"),
        job_request_id: row.get("job_request_id"),
        contractor_id: row.get("contractor_id"),
        capacity_rate: Money {
            amount: row.get("capacity_rate"),
            currency: row.get("capacity_rate_currency"),
        },
        hours_per_week: row.get("hours_per_week"),
        date_started: row.get("date_started"),
        weeks: row.get("weeks"),
        customer_accepted: row.get("customer_accepted"),
        supplier_accepted: row.get("supplier_accepted"),
        contractor_accepted: row.get("contractor_accepted"),
        closed_at: row.get("closed_at"),
        created_at: row.get("created_at"),
    }
}

impl<C> Database<Select<By<Option<Offer>, offer::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Offer>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Offer>, offer::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: offer::Id = by.into_inner();

        let sql = format!("SELECT {COLUMNS} FROM offers WHERE id = $1::UUID");
        self.query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.as_ref().map(offer_from_row))
    }
}

impl<C> Database<Select<By<Vec<Active<Offer>>, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Active<Offer>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Active<Offer>>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let contractor_id: user::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM offers \
             WHERE contractor_id = $1::UUID \
               AND closed_at IS NULL \
             ORDER BY date_started ASC, id ASC",
        );
        Ok(self
            .query(&sql, &[&contractor_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(offer_from_row)
            .map(Active)
            .collect())
    }
}

impl<C> Database<Insert<Offer>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(offer): Insert<Offer>,
    ) -> Result<Self::Ok, Self::Err> {
        let Offer {
            id,
            job_request_id,
            contractor_id,
            capacity_rate,
            hours_per_week,
            date_started,
            weeks,
            customer_accepted,
            supplier_accepted,
            contractor_accepted,
            closed_at,
            created_at,
        } = offer;

        const SQL: &str = "\
            INSERT INTO offers (\
                id, job_request_id, contractor_id, \
                capacity_rate, capacity_rate_currency, \
                hours_per_week, date_started, weeks, \
                customer_accepted, supplier_accepted, contractor_accepted, \
                closed_at, created_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, \
                $4::NUMERIC, $5::INT2, \
                $6::INT2, $7::DATE, $8::INT2, \
                $9::BOOLEAN, $10::BOOLEAN, $11::BOOLEAN, \
                $12::TIMESTAMPTZ, $13::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET customer_accepted = EXCLUDED.customer_accepted, \
                supplier_accepted = EXCLUDED.supplier_accepted, \
                contractor_accepted = EXCLUDED.contractor_accepted, \
                closed_at = EXCLUDED.closed_at";
        self.exec(
            SQL,
            &[
                &id,
                &job_request_id,
                &contractor_id,
                &capacity_rate.amount,
                &capacity_rate.currency,
                &hours_per_week,
                &date_started,
                &weeks,
                &customer_accepted,
                &supplier_accepted,
                &contractor_accepted,
                &closed_at,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}
