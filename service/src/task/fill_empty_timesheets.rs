//! [`FillEmptyTimesheets`] [`Task`].

use std::{
    collections::HashSet, convert::Infallible, error::Error, time::Duration,
};

use common::{
    operations::{
        By, Commit, Insert, Lock, Perform, Select, Start, Transact, Transacted,
    },
    Date,
};
use smart_default::SmartDefault;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{contract, Contract, Timesheet},
    infra::{database, Database},
    read, Service,
};

use super::Task;

/// Configuration for [`FillEmptyTimesheets`] [`Task`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Interval between sweeps.
    #[default(Duration::from_secs(60 * 60))]
    pub interval: Duration,
}

/// [`Task`] submitting [`Timesheet`]s with the full weekly hours for every
/// passed [`contract::Week`] of a billable [`Contract`] left unreported.
#[derive(Clone, Copy, Debug)]
pub struct FillEmptyTimesheets<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<S> FillEmptyTimesheets<S> {
    /// Creates a new [`FillEmptyTimesheets`] [`Task`].
    #[must_use]
    pub const fn new(config: Config, service: S) -> Self {
        Self { config, service }
    }
}

impl<Db, Fb> Task<Start<By<FillEmptyTimesheets<Self>, Config>>>
    for Service<Db, Fb>
where
    FillEmptyTimesheets<Self>: Task<Perform<()>, Ok = (), Err: Error>,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<FillEmptyTimesheets<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = FillEmptyTimesheets::new(config, self.clone());
        match super::repeat(&task, "FillEmptyTimesheets", config.interval)
            .await
        {}
    }
}

impl<Db, Fb> Task<Perform<()>> for FillEmptyTimesheets<Service<Db, Fb>>
where
    Db: Database<
            Select<By<Vec<contract::Id>, read::contract::Billable>>,
            Ok = Vec<contract::Id>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Contract, contract::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Contract>, contract::Id>>,
            Ok = Option<Contract>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Timesheet>, contract::Id>>,
            Ok = Vec<Timesheet>,
            Err = Traced<database::Error>,
        > + Database<Insert<Timesheet>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let ids = self
            .service
            .database()
            .execute(Select(By::new(read::contract::Billable)))
            .await
            .map_err(tracerr::wrap!())?;

        let today = Date::today();
        for id in ids {
            match self.fill(id, today).await {
                Ok(0) => {}
                Ok(n) => log::info!(
                    "Filled {n} empty `Timesheet`s of `Contract(id: {id})`",
                ),
                Err(e) => log::error!(
                    "`task::FillEmptyTimesheets` failed to fill \
                     `Contract(id: {id})`: {e}",
                ),
            }
        }
        Ok(())
    }
}

impl<Db, Fb> FillEmptyTimesheets<Service<Db, Fb>>
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
            Select<By<Vec<Timesheet>, contract::Id>>,
            Ok = Vec<Timesheet>,
            Err = Traced<database::Error>,
        > + Database<Insert<Timesheet>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    /// Submits the missing [`Timesheet`]s of the weeks of the specified
    /// [`Contract`] finished before `today`, returning their number.
    async fn fill(
        &self,
        id: contract::Id,
        today: Date,
    ) -> Result<usize, ExecutionError> {
        let tx = self
            .service
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::wrap!())?;

        tx.execute(Lock(By::<Contract, _>::new(id)))
            .await
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let Some(contract) = tx
            .execute(Select(By::<Option<Contract>, _>::new(id)))
            .await
            .map_err(tracerr::wrap!())?
            .filter(Contract::is_active)
        else {
            return Ok(0);
        };

        let submitted = tx
            .execute(Select(By::<Vec<Timesheet>, _>::new(id)))
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|t| t.date_started)
            .collect::<HashSet<_>>();

        let missing = contract
            .schedule()
            .take_while(|w| w.date_finished < today)
            .filter(|w| !submitted.contains(&w.date_started))
            .map(|w| Timesheet::new(id, w, contract.hours_per_week))
            .collect::<Vec<_>>();
        if missing.is_empty() {
            return Ok(0);
        }

        for timesheet in &missing {
            tx.execute(Insert(timesheet.clone()))
                .await
                .map_err(tracerr::wrap!())
                .map(drop)?;
        }
        tx.execute(Commit)
            .await
            .map_err(tracerr::wrap!())
            .map(drop)?;

        Ok(missing.len())
    }
}

/// Error of [`FillEmptyTimesheets`] execution.
pub type ExecutionError = Traced<database::Error>;

#[cfg(test)]
mod spec {
    use std::collections::HashSet;

    use common::{operations::Perform, Date};

    use crate::{
        domain::{contract, Timesheet},
        infra::{database::Memory, facebook},
        Config, Service,
    };

    use super::{Config as TaskConfig, FillEmptyTimesheets, Task as _};

    #[tokio::test]
    async fn fills_passed_weeks_once() {
        let db = Memory::default();
        let (service, _bg) = Service::new(
            Config::default(),
            db.clone(),
            facebook::Stub::default(),
        );

        let today = Date::today();
        let c = contract::spec::contract(
            &today.add_days(-21).to_string(),
            &today.add_days(13).to_string(),
        );
        let first = c.schedule().next().unwrap();
        let hours = contract::Hours::new(12).unwrap();
        {
            let mut state = db.state();
            state.timesheets.push(Timesheet::new(c.id, first, hours));
            _ = state.contracts.insert(c.id, c.clone());
        }

        let task = FillEmptyTimesheets::new(TaskConfig::default(), service);
        task.execute(Perform(())).await.unwrap();
        task.execute(Perform(())).await.unwrap();

        let state = db.state();
        let weeks = state
            .timesheets
            .iter()
            .filter(|t| t.contract_id == c.id)
            .map(|t| (t.date_started, t.hours_count))
            .collect::<Vec<_>>();
        let unique = weeks.iter().map(|(d, _)| *d).collect::<HashSet<_>>();
        assert_eq!(weeks.len(), 3);
        assert_eq!(unique.len(), 3);
        assert!(weeks.contains(&(first.date_started, hours)));
        assert!(weeks
            .iter()
            .filter(|(d, _)| *d != first.date_started)
            .all(|(_, h)| *h == c.hours_per_week));
    }

    #[tokio::test]
    async fn skips_internal_contracts() {
        let db = Memory::default();
        let (service, _bg) = Service::new(
            Config::default(),
            db.clone(),
            facebook::Stub::default(),
        );

        let today = Date::today();
        let mut c = contract::spec::contract(
            &today.add_days(-21).to_string(),
            &today.add_days(13).to_string(),
        );
        c.supplier_id = Some(c.customer_id);
        _ = db.state().contracts.insert(c.id, c);

        FillEmptyTimesheets::new(TaskConfig::default(), service)
            .execute(Perform(()))
            .await
            .unwrap();

        assert!(db.state().timesheets.is_empty());
    }
}
