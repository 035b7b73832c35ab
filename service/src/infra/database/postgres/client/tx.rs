//! [`Tx`] client definitions.

use std::{mem, sync::Arc};

use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tokio_postgres::{types::ToSql, Row, ToStatement};
use tracerr::Traced;

use crate::infra::database::{
    self,
    postgres::{self, connection, Connection},
};

use super::NonTx;

/// Transactional Postgres database client.
///
/// The transaction is begun lazily on the first statement, and every clone
/// of a [`Tx`] client shares it.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`connection::Pool`] to take the [`Connection`] from.
    pool: connection::Pool,

    /// [`State`] of the transaction.
    state: Arc<Mutex<State>>,
}

/// State of a [`Tx`] client transaction.
#[derive(Debug, Default)]
enum State {
    /// No statements have been run yet.
    #[default]
    Idle,

    /// Transaction is running.
    Started(connection::Tx),

    /// Transaction is committed.
    Finished,
}

impl Tx {
    /// Creates a new [`Tx`] client from the provided [`NonTx`] client.
    #[must_use]
    pub fn from_non_tx(client: NonTx) -> Self {
        Self {
            pool: client.pool,
            state: Arc::default(),
        }
    }

    /// Returns the underlying [`Connection`] of this [`Tx`] client, beginning
    /// the transaction if it's not started yet.
    async fn connection(
        &self,
    ) -> Result<MappedMutexGuard<'_, connection::Tx>, Traced<database::Error>>
    {
        let mut state = self.state.lock().await;
        if matches!(*state, State::Idle) {
            let conn = self
                .pool
                .get()
                .await
                .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                .map_err(tracerr::map_from)?;
            *state = State::Started(
                connection::Tx::begin(conn)
                    .await
                    .map_err(tracerr::wrap!())?,
            );
        }

        MutexGuard::try_map(state, |s| match s {
            State::Started(tx) => Some(tx),
            State::Idle | State::Finished => None,
        })
        .map_err(|_| {
            tracerr::map_from(tracerr::new!(postgres::Error::TxFinished))
        })
    }

    /// Commits this [`Tx`] client.
    ///
    /// Nothing is done if no statements have been run.
    ///
    /// # Errors
    ///
    /// If failed to commit transaction of this [`Tx`] client.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let state =
            mem::replace(&mut *self.state.lock().await, State::Finished);
        match state {
            State::Started(tx) => tx.commit().await.map_err(tracerr::wrap!()),
            State::Idle | State::Finished => Ok(()),
        }
    }
}

impl Connection for Tx {
    async fn query<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .query(stmt, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn query_opt<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Option<Row>, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .query_opt(stmt, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn exec<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .exec(stmt, params)
            .await
            .map_err(tracerr::wrap!())
    }
}
