//! [`Company`]-related [`Database`] implementations.

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    domain::{
        billing::{payment_source, PaymentSource},
        company, Company,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Select<By<Option<Company>, company::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Company>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Company>, company::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: company::Id = by.into_inner();

        const SQL: &str = "\
            SELECT name, payout_account, created_at \
            FROM companies \
            WHERE id = $1::UUID";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| Company {
                id,
                name: row.get("name"),
                payout_account: row.get("payout_account"),
                created_at: row.get("created_at"),
            }))
    }
}

impl<C> Database<Select<By<Option<PaymentSource>, payment_source::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<PaymentSource>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<PaymentSource>, payment_source::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: payment_source::Id = by.into_inner();

        const SQL: &str = "\
            SELECT company_id, name, created_at \
            FROM payment_sources \
            WHERE id = $1::UUID";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| PaymentSource {
                id,
                company_id: row.get("company_id"),
                name: row.get("name"),
                created_at: row.get("created_at"),
            }))
    }
}
