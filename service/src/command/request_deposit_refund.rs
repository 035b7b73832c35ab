//! [`Command`] for requesting a refund of a [`Contract`]'s [`Deposit`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::From;
use tracerr::Traced;

use crate::{
    domain::{billing::Deposit, contract, Contract},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for requesting a refund of a [`Contract`]'s [`Deposit`].
///
/// Only a succeeded [`Deposit`] is refunded. Returns the [`Deposit`] in its
/// current state, if any.
#[derive(Clone, Copy, Debug, From)]
pub struct RequestDepositRefund {
    /// ID of the [`Contract`] to refund the [`Deposit`] of.
    pub contract_id: contract::Id,
}

impl<Db, Fb> Command<RequestDepositRefund> for Service<Db, Fb>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Contract, contract::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Deposit>, contract::Id>>,
            Ok = Option<Deposit>,
            Err = Traced<database::Error>,
        > + Database<Insert<Deposit>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Option<Deposit>;
    type Err = ExecutionError;

    async fn execute(
        &self,
        RequestDepositRefund { contract_id }: RequestDepositRefund,
    ) -> Result<Self::Ok, Self::Err> {
        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::wrap!())?;

        tx.execute(Lock(By::<Contract, _>::new(contract_id)))
            .await
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let Some(mut deposit) = tx
            .execute(Select(By::<Option<Deposit>, _>::new(contract_id)))
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };
        if deposit.request_refund() {
            tx.execute(Insert(deposit.clone()))
                .await
                .map_err(tracerr::wrap!())
                .map(drop)?;
            tx.execute(Commit)
                .await
                .map_err(tracerr::wrap!())
                .map(drop)?;
        }

        Ok(Some(deposit))
    }
}

/// Error of [`RequestDepositRefund`] [`Command`] execution.
pub type ExecutionError = Traced<database::Error>;
