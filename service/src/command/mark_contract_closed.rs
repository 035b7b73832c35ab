//! [`Command`] for marking a [`Contract`] as closed.

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        contract::{self, ClosingMessage, ClosingReason},
        user, Contract,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for marking a [`Contract`] as closed.
///
/// Shared by manual and automatic closings. An already closed [`Contract`]
/// is left intact.
#[derive(Clone, Debug)]
pub struct MarkContractClosed {
    /// ID of the [`Contract`] to be closed.
    pub contract_id: contract::Id,

    /// [`ClosingReason`] of the closing.
    pub reason: ClosingReason,

    /// [`ClosingMessage`] explaining the closing.
    pub message: ClosingMessage,

    /// ID of the [`User`] closing the [`Contract`], if closed manually.
    ///
    /// [`User`]: crate::domain::User
    pub closed_by: Option<user::Id>,
}

impl MarkContractClosed {
    /// Creates a new [`MarkContractClosed`] [`Command`] of an automatic
    /// closing for the provided [`ClosingReason`].
    #[must_use]
    pub fn automatically(
        contract_id: contract::Id,
        reason: ClosingReason,
    ) -> Self {
        Self {
            contract_id,
            reason,
            message: reason.message().unwrap_or_default(),
            closed_by: None,
        }
    }
}

/// Output of [`MarkContractClosed`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// [`Contract`] in its current state.
    pub contract: Contract,

    /// Indicates whether the [`Contract`] has been closed by this
    /// [`Command`], rather than before it.
    pub closed: bool,
}

impl<Db, Fb> Command<MarkContractClosed> for Service<Db, Fb>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Contract, contract::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Contract>, contract::Id>>,
            Ok = Option<Contract>,
            Err = Traced<database::Error>,
        > + Database<Insert<Contract>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: MarkContractClosed,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let MarkContractClosed {
            contract_id,
            reason,
            message,
            closed_by,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent modifications.
        tx.execute(Lock(By::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut contract = tx
            .execute(Select(By::<Option<Contract>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ContractNotExists(contract_id))
            .map_err(tracerr::wrap!())?;

        let closed = contract.close(reason, message, closed_by);
        if closed {
            tx.execute(Insert(contract.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        if closed {
            log::info!("`Contract(id: {contract_id})` closed: {reason}");
            self.publish(contract::Event::Closed(contract.clone()));
        }

        Ok(Output { contract, closed })
    }
}

/// Error of [`MarkContractClosed`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Contract`] with the provided ID does not exist.
    #[display("`Contract(id: {_0})` does not exist")]
    ContractNotExists(#[error(not(source))] contract::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),
}
