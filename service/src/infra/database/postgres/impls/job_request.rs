//! [`JobRequest`]-related [`Database`] implementations.

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    domain::{job_request, JobRequest},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Select<By<Option<JobRequest>, job_request::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<JobRequest>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<JobRequest>, job_request::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: job_request::Id = by.into_inner();

        const SQL: &str = "\
            SELECT company_id, name, hours_per_week, \
                   is_internal, is_active, created_at \
            FROM job_requests \
            WHERE id = $1::UUID";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| JobRequest {
                id,
                company_id: row.get("company_id"),
                name: row.get("name"),
                hours_per_week: row.get("hours_per_week"),
                is_internal: row.get("is_internal"),
                is_active: row.get("is_active"),
                created_at: row.get("created_at"),
            }))
    }
}
