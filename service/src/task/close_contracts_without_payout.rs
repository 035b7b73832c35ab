//! [`CloseContractsWithoutPayout`] [`Task`].

use std::{convert::Infallible, error::Error, time::Duration};

use common::operations::{By, Perform, Select, Start};
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

/// Configuration for [`CloseContractsWithoutPayout`] [`Task`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Interval between sweeps.
    #[default(Duration::from_secs(60 * 60))]
    pub interval: Duration,

    /// Time given to the payees for setting up their payout accounts after
    /// a [`Contract`] is signed.
    ///
    /// [`Contract`]: crate::domain::Contract
    #[default(Duration::from_secs(7 * 24 * 60 * 60))]
    pub grace: Duration,
}

/// [`Task`] closing active [`Contract`]s whose contractor or supplier
/// [`Company`] still has no account for payouts.
///
/// [`Company`]: crate::domain::Company
/// [`Contract`]: crate::domain::Contract
#[derive(Clone, Copy, Debug)]
pub struct CloseContractsWithoutPayout<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<S> CloseContractsWithoutPayout<S> {
    /// Creates a new [`CloseContractsWithoutPayout`] [`Task`].
    #[must_use]
    pub const fn new(config: Config, service: S) -> Self {
        Self { config, service }
    }
}

impl<Db, Fb> Task<Start<By<CloseContractsWithoutPayout<Self>, Config>>>
    for Service<Db, Fb>
where
    CloseContractsWithoutPayout<Self>: Task<Perform<()>, Ok = (), Err: Error>,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<CloseContractsWithoutPayout<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = CloseContractsWithoutPayout::new(config, self.clone());
        let name = "CloseContractsWithoutPayout";
        match super::repeat(&task, name, config.interval).await {}
    }
}

impl<Db, Fb> Task<Perform<()>>
    for CloseContractsWithoutPayout<Service<Db, Fb>>
where
    Db: Database<
        Select<By<Vec<contract::Id>, read::contract::WithoutPayout>>,
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
        let created_before =
            contract::CreationDateTime::now() - self.config.grace;
        let ids = self
            .service
            .database()
            .execute(Select(By::new(read::contract::WithoutPayout {
                created_before,
            })))
            .await
            .map_err(tracerr::wrap!())?;

        for id in ids {
            let cmd = MarkContractClosed::automatically(
                id,
                ClosingReason::NoPayoutAccount,
            );
            _ = self.service.execute(cmd).await.map_err(|e| {
                log::error!(
                    "`task::CloseContractsWithoutPayout` failed to close \
                     `Contract(id: {id})`: {e}",
                );
            });
        }
        Ok(())
    }
}

/// Error of [`CloseContractsWithoutPayout`] execution.
pub type ExecutionError = Traced<database::Error>;
