//! [`CloseExpiredContracts`] [`Task`].

use std::{convert::Infallible, error::Error, time::Duration};

use common::{
    operations::{By, Perform, Select, Start},
    Date,
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

/// Configuration for [`CloseExpiredContracts`] [`Task`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Interval between sweeps.
    #[default(Duration::from_secs(60 * 60))]
    pub interval: Duration,
}

/// [`Task`] closing active [`Contract`]s whose last day has passed.
///
/// [`Contract`]: crate::domain::Contract
#[derive(Clone, Copy, Debug)]
pub struct CloseExpiredContracts<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<S> CloseExpiredContracts<S> {
    /// Creates a new [`CloseExpiredContracts`] [`Task`].
    #[must_use]
    pub const fn new(config: Config, service: S) -> Self {
        Self { config, service }
    }
}

impl<Db, Fb> Task<Start<By<CloseExpiredContracts<Self>, Config>>>
    for Service<Db, Fb>
where
    CloseExpiredContracts<Self>: Task<Perform<()>, Ok = (), Err: Error>,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<CloseExpiredContracts<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = CloseExpiredContracts::new(config, self.clone());
        match super::repeat(&task, "CloseExpiredContracts", config.interval)
            .await
        {}
    }
}

impl<Db, Fb> Task<Perform<()>> for CloseExpiredContracts<Service<Db, Fb>>
where
    Db: Database<
        Select<By<Vec<contract::Id>, read::contract::Expired>>,
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
        let ids = self
            .service
            .database()
            .execute(Select(By::new(read::contract::Expired {
                today: Date::today(),
            })))
            .await
            .map_err(tracerr::wrap!())?;

        for id in ids {
            let cmd =
                MarkContractClosed::automatically(id, ClosingReason::Expired);
            _ = self.service.execute(cmd).await.map_err(|e| {
                log::error!(
                    "`task::CloseExpiredContracts` failed to close \
                     `Contract(id: {id})`: {e}",
                );
            });
        }
        Ok(())
    }
}

/// Error of [`CloseExpiredContracts`] execution.
pub type ExecutionError = Traced<database::Error>;
