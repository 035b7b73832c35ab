//! [`Database`] implementations.

#![allow(
    clippy::items_after_statements,
    reason = "`const SQL` after statements"
)]
#![allow(clippy::too_many_lines, reason = "SQL-related code a bit verbose")]

mod billing;
mod company;
mod contract;
mod job_request;
mod notification;
mod offer;
mod timesheet;
mod user;

use async_trait::async_trait;
use common::operations::{Commit, Transact};
use refinery_core::{
    traits::r#async::{AsyncQuery, AsyncTransaction},
    AsyncMigrate, Migration,
};
use tracerr::Traced;
use uuid::Uuid;
use xxhash_rust::xxh3;

use crate::infra::{database, postgres, Database};

use super::{Connection as _, NonTx, Postgres, Tx};

impl Postgres<Tx> {
    /// Acquires an advisory lock of the entity with the provided `id`, held
    /// until the end of this transaction.
    ///
    /// The `namespace` separates IDs of different entities.
    async fn advisory_lock(
        &self,
        namespace: &str,
        id: Uuid,
    ) -> Result<(), Traced<database::Error>> {
        // WARNING: Avoid changing the hashed data, because concurrently
        //          running old and new versions must produce the same keys.
        let mut hasher = xxh3::Xxh3Builder::new().build();
        hasher.update(namespace.as_bytes());
        hasher.update(id.as_bytes());
        let key = i64::from_le_bytes(hasher.digest().to_le_bytes());

        const SQL: &str = "SELECT pg_advisory_xact_lock($1::INT8)";
        self.query_opt(SQL, &[&key])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl Database<Transact> for Postgres<NonTx> {
    type Ok = Postgres<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(Postgres(Tx::from_non_tx(self.0.clone())))
    }
}

impl Database<Transact> for Postgres<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Postgres<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        self.commit().await.map_err(tracerr::wrap!())
    }
}

#[async_trait]
impl AsyncTransaction for Postgres {
    type Error = Traced<database::Error>;

    async fn execute(
        &mut self,
        queries: &[&str],
    ) -> Result<usize, Self::Error> {
        let mut conn =
            self.0.connection().await.map_err(tracerr::wrap!())?;
        AsyncTransaction::execute(&mut **conn, queries)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

#[async_trait]
impl AsyncQuery<Vec<Migration>> for Postgres {
    async fn query(
        &mut self,
        query: &str,
    ) -> Result<Vec<Migration>, <Self as AsyncTransaction>::Error> {
        let mut conn =
            self.0.connection().await.map_err(tracerr::wrap!())?;
        AsyncQuery::query(&mut **conn, query)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

impl AsyncMigrate for Postgres {}
