//! [`Command`] for submitting a [`Timesheet`] of the current [`Week`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    Date,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        contract::{self, Hours, Week, WeekOutOfRange},
        user, Contract, Timesheet,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// Name of the unique constraint allowing a single [`Timesheet`] per
/// [`Week`].
pub(crate) const UNIQUE_WEEK_CONSTRAINT: &str =
    "timesheets_contract_id_date_started_key";

/// [`Command`] for submitting a [`Timesheet`] of the current [`Week`].
#[derive(Clone, Copy, Debug)]
pub struct SubmitTimesheet {
    /// ID of the [`Contract`] to submit the [`Timesheet`] for.
    pub contract_id: contract::Id,

    /// ID of the [`User`] submitting the [`Timesheet`].
    ///
    /// [`User`]: crate::domain::User
    pub initiator_id: user::Id,

    /// Number of [`Hours`] worked.
    pub hours: Hours,
}

impl<Db, Fb> Command<SubmitTimesheet> for Service<Db, Fb>
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
    type Ok = Timesheet;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: SubmitTimesheet,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SubmitTimesheet {
            contract_id,
            initiator_id,
            hours,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent submissions.
        tx.execute(Lock(By::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let contract = tx
            .execute(Select(By::<Option<Contract>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(Contract::is_active)
            .ok_or(E::ContractNotExists(contract_id))
            .map_err(tracerr::wrap!())?;
        if contract.employee_id != initiator_id {
            return Err(tracerr::new!(E::NotContractEmployee(initiator_id)));
        }
        if contract.is_internal() {
            return Err(tracerr::new!(E::InternalContract(contract_id)));
        }

        let week = contract
            .week_of(Date::today())
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let submitted = tx
            .execute(Select(By::<Vec<Timesheet>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .iter()
            .any(|t| t.date_started == week.date_started);
        if submitted {
            return Err(tracerr::new!(E::AlreadySubmitted(week)));
        }

        let timesheet = Timesheet::new(contract_id, week, hours);
        let inserted = tx.execute(Insert(timesheet.clone())).await;
        if let Err(e) = &inserted {
            if e.as_ref().is_unique_violation(Some(UNIQUE_WEEK_CONSTRAINT)) {
                return Err(tracerr::new!(E::AlreadySubmitted(week)));
            }
        }
        inserted
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(timesheet)
    }
}

/// Error of [`SubmitTimesheet`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Timesheet`] of the [`Week`] is submitted already.
    #[display(
        "`Timesheet` of {} - {} week is submitted already",
        _0.date_started,
        _0.date_finished,
    )]
    AlreadySubmitted(#[error(not(source))] Week),

    /// Active [`Contract`] with the provided ID does not exist.
    #[display("`Contract(id: {_0})` does not exist")]
    ContractNotExists(#[error(not(source))] contract::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Timesheet`]s are not available for internal [`Contract`]s.
    #[display("Timesheets are not available for internal contracts")]
    InternalContract(#[error(not(source))] contract::Id),

    /// [`User`] is not the employee of the [`Contract`].
    ///
    /// [`User`]: crate::domain::User
    #[display("`User(id: {_0})` is not the `Contract` employee")]
    NotContractEmployee(#[error(not(source))] user::Id),

    /// Today is outside of the [`Contract`].
    #[display("{_0}")]
    #[from]
    WeekOutOfRange(WeekOutOfRange),
}

#[cfg(test)]
mod spec {
    use common::Date;

    use crate::{
        domain::{
            contract::{self, Hours},
            user,
        },
        infra::{database::Memory, facebook},
        Command as _, Config, Service,
    };

    use super::{ExecutionError as E, SubmitTimesheet};

    type TestService = Service<Memory, facebook::Stub>;

    fn setup(start: i64, end: i64) -> (TestService, Memory) {
        let db = Memory::default();
        let (service, _) = Service::new(
            Config::default(),
            db.clone(),
            facebook::Stub::default(),
        );
        let today = Date::today();
        let c = contract::spec::contract(
            &today.add_days(start).to_string(),
            &today.add_days(end).to_string(),
        );
        _ = db.state().contracts.insert(c.id, c);
        (service, db)
    }

    #[tokio::test]
    async fn submits_once_per_week() {
        let (service, db) = setup(-3, 10);
        let c = db.state().contracts.values().next().cloned().unwrap();
        let cmd = SubmitTimesheet {
            contract_id: c.id,
            initiator_id: c.employee_id,
            hours: Hours::new(32).unwrap(),
        };

        let timesheet = service.execute(cmd).await.unwrap();
        assert_eq!(timesheet.date_started, c.date_started);
        assert_eq!(timesheet.hours_count, cmd.hours);

        let err = service.execute(cmd).await.unwrap_err();
        assert!(matches!(err.as_ref(), E::AlreadySubmitted(_)), "{err}");
        assert_eq!(db.state().timesheets.len(), 1);
    }

    #[tokio::test]
    async fn relies_on_unique_week_constraint() {
        let (service, db) = setup(-3, 10);
        let c = db.state().contracts.values().next().cloned().unwrap();
        let cmd = SubmitTimesheet {
            contract_id: c.id,
            initiator_id: c.employee_id,
            hours: Hours::new(20).unwrap(),
        };
        drop(service.execute(cmd).await.unwrap());
        db.state().hide_timesheets = true;

        let err = service.execute(cmd).await.unwrap_err();

        assert!(matches!(err.as_ref(), E::AlreadySubmitted(_)), "{err}");
        assert_eq!(db.state().timesheets.len(), 1);
    }

    #[tokio::test]
    async fn rejects_foreign_or_out_of_range_submissions() {
        let (service, db) = setup(1, 10);
        let c = db.state().contracts.values().next().cloned().unwrap();

        let err = service
            .execute(SubmitTimesheet {
                contract_id: c.id,
                initiator_id: user::Id::new(),
                hours: Hours::FULL_TIME,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::NotContractEmployee(_)), "{err}");

        let err = service
            .execute(SubmitTimesheet {
                contract_id: c.id,
                initiator_id: c.employee_id,
                hours: Hours::FULL_TIME,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::WeekOutOfRange(_)), "{err}");
    }

    #[tokio::test]
    async fn rejects_internal_contracts() {
        let (service, db) = setup(-3, 10);
        let c = {
            let mut state = db.state();
            let c = state.contracts.values_mut().next().unwrap();
            c.supplier_id = Some(c.customer_id);
            c.clone()
        };

        let err = service
            .execute(SubmitTimesheet {
                contract_id: c.id,
                initiator_id: c.employee_id,
                hours: Hours::FULL_TIME,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::InternalContract(_)), "{err}");
    }
}
