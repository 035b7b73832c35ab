//! Service contains the business logic of the application.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;
pub mod task;

use std::{error::Error, time::Duration};

use common::operations::{By, Start};
use smart_default::SmartDefault;
use tokio::sync::broadcast;

#[cfg(doc)]
use infra::{Database, Facebook};

use crate::domain::{
    contract::{self, Hours},
    timesheet::PayoutShares,
    user::auth::{Registry, Strategy},
};

pub use self::{command::Command, query::Query, task::Task};

/// [`Service`] configuration.
#[derive(Clone, Debug, SmartDefault)]
pub struct Config {
    /// Enabled authentication [`Strategy`]s.
    #[default(Registry::new(Strategy::ALL.iter().copied()))]
    pub auth: Registry,

    /// Time a [`domain::user::Session`] stays valid without being used.
    #[default(Duration::from_secs(30 * 24 * 60 * 60))]
    pub session_ttl: Duration,

    /// Maximum [`Hours`] a contractor may be booked for during a week.
    #[default(Hours::FULL_TIME)]
    pub max_hours_per_week: Hours,

    /// Shares of a [`domain::Timesheet`] amount paid out to the payees.
    pub payout_shares: PayoutShares,

    /// Capacity of the [`contract::Event`]s bus.
    #[default(256)]
    pub events_capacity: usize,

    /// [`task::CloseExpiredContracts`] configuration.
    pub close_expired_contracts: task::close_expired_contracts::Config,

    /// [`task::CloseUnpaidContracts`] configuration.
    pub close_unpaid_contracts: task::close_unpaid_contracts::Config,

    /// [`task::CloseContractsWithoutPayout`] configuration.
    pub close_contracts_without_payout:
        task::close_contracts_without_payout::Config,

    /// [`task::FillEmptyTimesheets`] configuration.
    pub fill_empty_timesheets: task::fill_empty_timesheets::Config,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db, Fb> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,

    /// [`Facebook`] Graph API client of this [`Service`].
    facebook: Fb,

    /// Bus of committed [`contract::Event`]s.
    events: broadcast::Sender<contract::Event>,
}

impl<Db, Fb> Service<Db, Fb> {
    /// Creates a new [`Service`] with the provided parameters.
    ///
    /// Returned [`task::Background`] runs the periodic [`Task`]s and the
    /// [`contract::Event`]s dispatching.
    pub fn new(
        config: Config,
        database: Db,
        facebook: Fb,
    ) -> (Self, task::Background)
    where
        Self: Task<
                Start<
                    By<
                        task::CloseExpiredContracts<Self>,
                        task::close_expired_contracts::Config,
                    >,
                >,
                Ok = (),
                Err: Error,
            > + Task<
                Start<
                    By<
                        task::CloseUnpaidContracts<Self>,
                        task::close_unpaid_contracts::Config,
                    >,
                >,
                Ok = (),
                Err: Error,
            > + Task<
                Start<
                    By<
                        task::CloseContractsWithoutPayout<Self>,
                        task::close_contracts_without_payout::Config,
                    >,
                >,
                Ok = (),
                Err: Error,
            > + Task<
                Start<
                    By<
                        task::FillEmptyTimesheets<Self>,
                        task::fill_empty_timesheets::Config,
                    >,
                >,
                Ok = (),
                Err: Error,
            > + Task<
                Start<
                    By<
                        task::DispatchContractEvents<Self>,
                        broadcast::Receiver<contract::Event>,
                    >,
                >,
                Ok = (),
                Err: Error,
            > + Clone
            + 'static,
    {
        let (events, _) = broadcast::channel(config.events_capacity.max(1));
        let this = Service {
            config,
            database,
            facebook,
            events,
        };

        let mut bg = task::Background::default();

        let (svc, rx) = (this.clone(), this.subscribe());
        bg.spawn(async move {
            svc.execute(Start(By::<task::DispatchContractEvents<_>, _>::new(
                rx,
            )))
            .await
        });

        let svc = this.clone();
        bg.spawn(async move {
            let cfg = svc.config().close_expired_contracts;
            svc.execute(Start(By::<task::CloseExpiredContracts<_>, _>::new(
                cfg,
            )))
            .await
        });

        let svc = this.clone();
        bg.spawn(async move {
            let cfg = svc.config().close_unpaid_contracts;
            svc.execute(Start(By::<task::CloseUnpaidContracts<_>, _>::new(
                cfg,
            )))
            .await
        });

        let svc = this.clone();
        bg.spawn(async move {
            let cfg = svc.config().close_contracts_without_payout;
            svc.execute(Start(
                By::<task::CloseContractsWithoutPayout<_>, _>::new(cfg),
            ))
            .await
        });

        let svc = this.clone();
        bg.spawn(async move {
            let cfg = svc.config().fill_empty_timesheets;
            svc.execute(Start(By::<task::FillEmptyTimesheets<_>, _>::new(
                cfg,
            )))
            .await
        });

        (this, bg)
    }

    /// Returns [`Config`] of this [`Service`].
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Returns [`Facebook`] Graph API client of this [`Service`].
    #[must_use]
    pub fn facebook(&self) -> &Fb {
        &self.facebook
    }

    /// Subscribes to [`contract::Event`]s published after this moment.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<contract::Event> {
        self.events.subscribe()
    }

    /// Publishes the provided [`contract::Event`] to the current subscribers.
    ///
    /// Must be called only after the transaction producing the `event` is
    /// committed.
    pub(crate) fn publish(&self, event: contract::Event) {
        // No subscribers is fine.
        _ = self.events.send(event);
    }
}
