//! [`CloseUnpaidContracts`] [`Task`].

use std::{convert::Infallible, error::Error, time::Duration};

use common::{
    operations::{By, Perform, Select, Start},
    DateTime,
};
use smart_default::SmartDefault;
use tracerr::Traced;
use tracing as log;

use crate::{
    command::{mark_contract_closed, MarkContractClosed},
    domain::contract::{self, ClosingReason},
    infra::{database, Database},
    read, Command, Service,
};

use super::Task;

/// Configuration for [`CloseUnpaidContracts`] [`Task`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Interval between sweeps.
    #[default(Duration::from_secs(60 * 60))]
    pub interval: Duration,

    /// Time given to the customer for fixing a failed payment.
    #[default(Duration::from_secs(7 * 24 * 60 * 60))]
    pub grace: Duration,
}

/// [`Task`] closing active [`Contract`]s whose deposit or weekly payment has
/// been failing for longer than [`Config::grace`].
///
/// [`Contract`]: crate::domain::Contract
#[derive(Clone, Copy, Debug)]
pub struct CloseUnpaidContracts<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<S> CloseUnpaidContracts<S> {
    /// Creates a new [`CloseUnpaidContracts`] [`Task`].
    #[must_use]
    pub const fn new(config: Config, service: S) -> Self {
        Self { config, service }
    }
}

impl<Db, Fb> Task<Start<By<CloseUnpaidContracts<Self>, Config>>>
    for Service<Db, Fb>
where
    CloseUnpaidContracts<Self>: Task<Perform<()>, Ok = (), Err: Error>,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<CloseUnpaidContracts<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = CloseUnpaidContracts::new(config, self.clone());
        match super::repeat(&task, "CloseUnpaidContracts", config.interval)
            .await
        {}
    }
}

impl<Db, Fb> Task<Perform<()>> for CloseUnpaidContracts<Service<Db, Fb>>
where
    Db: Database<
        Select<By<Vec<contract::Id>, read::contract::Unpaid>>,
        Ok = Vec<contract::Id>,
        Err = Traced<database::Error>,
    >,
    Service<Db, Fb>: Command<
        MarkContractClosed,
        Ok = mark_contract_closed::Output,
        Err = Traced<mark_contract_closed::ExecutionError>,
    >,
{
    type Ok = ();
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let failed_before = DateTime::now() - self.config.grace;
        let ids = self
            .service
            .database()
            .execute(Select(By::new(read::contract::Unpaid { failed_before })))
            .await
            .map_err(tracerr::wrap!())?;

        for id in ids {
            let cmd =
                MarkContractClosed::automatically(id, ClosingReason::Unpaid);
            _ = self.service.execute(cmd).await.map_err(|e| {
                log::error!(
                    "`task::CloseUnpaidContracts` failed to close \
                     `Contract(id: {id})`: {e}",
                );
            });
        }
        Ok(())
    }
}

/// Error of [`CloseUnpaidContracts`] execution.
pub type ExecutionError = Traced<database::Error>;
