//! [`Command`] for requesting a [`Deposit`] of a [`Contract`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{billing::Deposit, contract, Contract},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for requesting a [`Deposit`] of a [`Contract`] equal to its
/// weekly cost.
///
/// Idempotent: an already requested [`Deposit`] is returned as is.
#[derive(Clone, Copy, Debug, From)]
pub struct RequestDeposit {
    /// ID of the [`Contract`] to request a [`Deposit`] for.
    pub contract_id: contract::Id,
}

impl<Db, Fb> Command<RequestDeposit> for Service<Db, Fb>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Contract, contract::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Contract>, contract::Id>>,
            Ok = Option<Contract>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Deposit>, contract::Id>>,
            Ok = Option<Deposit>,
            Err = Traced<database::Error>,
        > + Database<Insert<Deposit>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Deposit;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        RequestDeposit { contract_id }: RequestDeposit,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let contract = tx
            .execute(Select(By::<Option<Contract>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ContractNotExists(contract_id))
            .map_err(tracerr::wrap!())?;
        if contract.is_internal() {
            return Err(tracerr::new!(E::InternalContract(contract_id)));
        }

        if let Some(deposit) = tx
            .execute(Select(By::<Option<Deposit>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
        {
            return Ok(deposit);
        }

        let deposit = Deposit::request(contract_id, contract.weekly_cost());
        tx.execute(Insert(deposit.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(deposit)
    }
}

/// Error of [`RequestDeposit`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Contract`] with the provided ID does not exist.
    #[display("`Contract(id: {_0})` does not exist")]
    ContractNotExists(#[error(not(source))] contract::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Internal [`Contract`]s are not billed.
    #[display("`Contract(id: {_0})` is internal")]
    InternalContract(#[error(not(source))] contract::Id),
}
