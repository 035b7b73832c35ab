//! In-memory [`Database`] used in tests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use common::operations::{By, Commit, Delete, Insert, Lock, Select, Transact};
use derive_more::{Display, Error as StdError};
use tracerr::Traced;

use crate::{
    domain::{
        billing::{
            self, payment_source, Deposit, PaymentSource, TimesheetPayment,
        },
        company, contract, job_request, offer, timesheet,
        user::{self, facebook, session, Session},
        Company, Contract, JobRequest, Notification, Offer, Timesheet, User,
    },
    command::submit_timesheet::UNIQUE_WEEK_CONSTRAINT,
    infra::{database, Database},
    read::{self, billing::PaymentsAmount, Active},
};

/// [`Database`] keeping everything in memory.
///
/// Clones share the same [`State`], and a [`Transact`]ed [`Memory`] is just
/// a clone applying changes immediately, so [`Commit`] and [`Lock`] do
/// nothing.
#[derive(Clone, Debug, Default)]
pub struct Memory(Arc<Mutex<State>>);

/// Stored data of a [`Memory`] database.
#[derive(Debug, Default)]
pub struct State {
    /// Stored [`User`]s.
    pub users: HashMap<user::Id, User>,

    /// Stored [`Session`]s.
    pub sessions: HashMap<session::Token, Session>,

    /// Stored [`Company`]s.
    pub companies: HashMap<company::Id, Company>,

    /// Stored [`PaymentSource`]s.
    pub payment_sources: HashMap<payment_source::Id, PaymentSource>,

    /// Stored [`JobRequest`]s.
    pub job_requests: HashMap<job_request::Id, JobRequest>,

    /// Stored [`Offer`]s.
    pub offers: HashMap<offer::Id, Offer>,

    /// Stored [`Contract`]s.
    pub contracts: HashMap<contract::Id, Contract>,

    /// Stored [`Timesheet`]s.
    pub timesheets: Vec<Timesheet>,

    /// Makes stored [`Timesheet`]s invisible to selects, as if they were
    /// inserted by a concurrent transaction.
    pub hide_timesheets: bool,

    /// Stored [`Deposit`]s.
    pub deposits: HashMap<contract::Id, Deposit>,

    /// Stored [`TimesheetPayment`]s.
    pub payments: Vec<TimesheetPayment>,

    /// Stored [`Notification`]s.
    pub notifications: Vec<Notification>,
}

impl Memory {
    /// Returns exclusive access to the [`State`] of this [`Memory`].
    pub fn state(&self) -> MutexGuard<'_, State> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Result of a [`Memory`] operation.
type Result<T> = std::result::Result<T, Traced<database::Error>>;

/// [`Memory`] database error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Unique constraint with the provided name is violated.
    #[display("Unique constraint `{_0}` is violated")]
    UniqueViolation(#[error(not(source))] &'static str),
}

impl Database<Transact> for Memory {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<()> {
        Ok(())
    }
}

impl Database<Lock<By<User, user::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Lock<By<User, user::Id>>) -> Result<()> {
        Ok(())
    }
}

impl Database<Lock<By<Contract, contract::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Contract, contract::Id>>,
    ) -> Result<()> {
        Ok(())
    }
}

impl Database<Select<By<Option<User>, user::Id>>> for Memory {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok> {
        Ok(self.state().users.get(&by.into_inner()).cloned())
    }
}

impl<'e> Database<Select<By<Option<User>, &'e user::Email>>> for Memory {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'e user::Email>>,
    ) -> Result<Self::Ok> {
        let email = by.into_inner();
        Ok(self
            .state()
            .users
            .values()
            .find(|u| &u.email == email)
            .cloned())
    }
}

impl<'i> Database<Select<By<Option<User>, &'i facebook::AccountId>>>
    for Memory
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'i facebook::AccountId>>,
    ) -> Result<Self::Ok> {
        let id = by.into_inner();
        Ok(self
            .state()
            .users
            .values()
            .find(|u| u.facebook_id.as_ref() == Some(id))
            .cloned())
    }
}

impl Database<Select<By<Vec<User>, read::user::EmployersOf>>> for Memory {
    type Ok = Vec<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<User>, read::user::EmployersOf>>,
    ) -> Result<Self::Ok> {
        let read::user::EmployersOf(company_id) = by.into_inner();
        let mut employers = self
            .state()
            .users
            .values()
            .filter(|u| u.is_active() && u.is_employer_of(company_id))
            .cloned()
            .collect::<Vec<_>>();
        employers.sort_by_key(|u| u.id);
        Ok(employers)
    }
}

impl Database<Insert<User>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Insert(user): Insert<User>) -> Result<()> {
        _ = self.state().users.insert(user.id, user);
        Ok(())
    }
}

impl Database<Select<By<Option<Session>, session::Token>>> for Memory {
    type Ok = Option<Session>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Session>, session::Token>>,
    ) -> Result<Self::Ok> {
        Ok(self.state().sessions.get(&by.into_inner()).cloned())
    }
}

impl Database<Insert<Session>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Insert(session): Insert<Session>) -> Result<()> {
        _ = self
            .state()
            .sessions
            .insert(session.token.clone(), session);
        Ok(())
    }
}

impl Database<Delete<By<Session, session::Token>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Session, session::Token>>,
    ) -> Result<()> {
        _ = self.state().sessions.remove(&by.into_inner());
        Ok(())
    }
}

impl Database<Select<By<Option<Company>, company::Id>>> for Memory {
    type Ok = Option<Company>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Company>, company::Id>>,
    ) -> Result<Self::Ok> {
        Ok(self.state().companies.get(&by.into_inner()).cloned())
    }
}

impl Database<Select<By<Option<PaymentSource>, payment_source::Id>>>
    for Memory
{
    type Ok = Option<PaymentSource>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<PaymentSource>, payment_source::Id>>,
    ) -> Result<Self::Ok> {
        Ok(self.state().payment_sources.get(&by.into_inner()).cloned())
    }
}

impl Database<Select<By<Option<JobRequest>, job_request::Id>>> for Memory {
    type Ok = Option<JobRequest>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<JobRequest>, job_request::Id>>,
    ) -> Result<Self::Ok> {
        Ok(self.state().job_requests.get(&by.into_inner()).cloned())
    }
}

impl Database<Select<By<Option<Offer>, offer::Id>>> for Memory {
    type Ok = Option<Offer>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Offer>, offer::Id>>,
    ) -> Result<Self::Ok> {
        Ok(self.state().offers.get(&by.into_inner()).cloned())
    }
}

impl Database<Select<By<Vec<Active<Offer>>, user::Id>>> for Memory {
    type Ok = Vec<Active<Offer>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Active<Offer>>, user::Id>>,
    ) -> Result<Self::Ok> {
        let contractor_id = by.into_inner();
        Ok(self
            .state()
            .offers
            .values()
            .filter(|o| o.contractor_id == contractor_id && o.is_active())
            .cloned()
            .map(Active)
            .collect())
    }
}

impl Database<Insert<Offer>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Insert(offer): Insert<Offer>) -> Result<()> {
        _ = self.state().offers.insert(offer.id, offer);
        Ok(())
    }
}

impl Database<Select<By<Option<Contract>, contract::Id>>> for Memory {
    type Ok = Option<Contract>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Contract>, contract::Id>>,
    ) -> Result<Self::Ok> {
        Ok(self.state().contracts.get(&by.into_inner()).cloned())
    }
}

impl Database<Insert<Contract>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Insert(contract): Insert<Contract>) -> Result<()> {
        _ = self.state().contracts.insert(contract.id, contract);
        Ok(())
    }
}

impl State {
    /// Returns sorted IDs of the active [`Contract`]s matching the provided
    /// predicate.
    fn active_contracts(
        &self,
        mut f: impl FnMut(&Self, &Contract) -> bool,
    ) -> Vec<contract::Id> {
        let mut ids = self
            .contracts
            .values()
            .filter(|c| c.is_active() && f(self, c))
            .map(|c| c.id)
            .collect::<Vec<_>>();
        ids.sort();
        ids
    }
}

impl Database<Select<By<Vec<contract::Id>, read::contract::Expired>>>
    for Memory
{
    type Ok = Vec<contract::Id>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<contract::Id>, read::contract::Expired>>,
    ) -> Result<Self::Ok> {
        let read::contract::Expired { today } = by.into_inner();
        Ok(self
            .state()
            .active_contracts(|_, c| c.date_finished < today))
    }
}

impl Database<Select<By<Vec<contract::Id>, read::contract::Unpaid>>>
    for Memory
{
    type Ok = Vec<contract::Id>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<contract::Id>, read::contract::Unpaid>>,
    ) -> Result<Self::Ok> {
        let read::contract::Unpaid { failed_before } = by.into_inner();
        Ok(self.state().active_contracts(|s, c| {
            let deposit_failed = s.deposits.get(&c.id).is_some_and(|d| {
                d.status == billing::Status::Failed
                    && d.created_at.coerce() < failed_before
            });
            let payment_failed = s.payments.iter().any(|p| {
                p.status == billing::Status::Failed
                    && p.created_at.coerce() < failed_before
                    && s.timesheets.iter().any(|t| {
                        t.id == p.timesheet_id && t.contract_id == c.id
                    })
            });
            deposit_failed || payment_failed
        }))
    }
}

impl
    Database<Select<By<Vec<contract::Id>, read::contract::WithoutPayout>>>
    for Memory
{
    type Ok = Vec<contract::Id>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<contract::Id>, read::contract::WithoutPayout>,
        >,
    ) -> Result<Self::Ok> {
        let read::contract::WithoutPayout { created_before } = by.into_inner();
        Ok(self.state().active_contracts(|s, c| {
            let employee_lacks = s
                .users
                .get(&c.employee_id)
                .is_some_and(|u| u.payout_account.is_none());
            let supplier_lacks = c
                .supplier_id
                .and_then(|id| s.companies.get(&id))
                .is_some_and(|co| co.payout_account.is_none());
            c.created_at < created_before && (employee_lacks || supplier_lacks)
        }))
    }
}

impl Database<Select<By<Vec<contract::Id>, read::contract::Billable>>>
    for Memory
{
    type Ok = Vec<contract::Id>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<contract::Id>, read::contract::Billable>>,
    ) -> Result<Self::Ok> {
        Ok(self.state().active_contracts(|_, c| !c.is_internal()))
    }
}

impl Database<Select<By<Vec<Timesheet>, contract::Id>>> for Memory {
    type Ok = Vec<Timesheet>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Timesheet>, contract::Id>>,
    ) -> Result<Self::Ok> {
        let contract_id = by.into_inner();
        let state = self.state();
        if state.hide_timesheets {
            return Ok(vec![]);
        }
        let mut timesheets = state
            .timesheets
            .iter()
            .filter(|t| t.contract_id == contract_id)
            .cloned()
            .collect::<Vec<_>>();
        timesheets.sort_by_key(|t| t.date_started);
        Ok(timesheets)
    }
}

impl Database<Insert<Timesheet>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Insert(ts): Insert<Timesheet>) -> Result<()> {
        let mut state = self.state();
        let occupied = state.timesheets.iter().any(|t| {
            t.contract_id == ts.contract_id && t.date_started == ts.date_started
        });
        if occupied {
            return Err(tracerr::new!(database::Error::from(
                Error::UniqueViolation(UNIQUE_WEEK_CONSTRAINT),
            )));
        }
        state.timesheets.push(ts);
        Ok(())
    }
}

impl Database<Select<By<Option<Deposit>, contract::Id>>> for Memory {
    type Ok = Option<Deposit>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Deposit>, contract::Id>>,
    ) -> Result<Self::Ok> {
        Ok(self.state().deposits.get(&by.into_inner()).cloned())
    }
}

impl Database<Insert<Deposit>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Insert(deposit): Insert<Deposit>) -> Result<()> {
        _ = self.state().deposits.insert(deposit.contract_id, deposit);
        Ok(())
    }
}

impl Database<Select<By<Vec<TimesheetPayment>, timesheet::Id>>> for Memory {
    type Ok = Vec<TimesheetPayment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<TimesheetPayment>, timesheet::Id>>,
    ) -> Result<Self::Ok> {
        let timesheet_id = by.into_inner();
        Ok(self
            .state()
            .payments
            .iter()
            .filter(|p| p.timesheet_id == timesheet_id)
            .cloned()
            .collect())
    }
}

impl Database<Select<By<PaymentsAmount, contract::Id>>> for Memory {
    type Ok = PaymentsAmount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<PaymentsAmount, contract::Id>>,
    ) -> Result<Self::Ok> {
        let contract_id = by.into_inner();
        let state = self.state();
        Ok(state
            .payments
            .iter()
            .filter(|p| {
                p.status == billing::Status::Succeeded
                    && state.timesheets.iter().any(|t| {
                        t.id == p.timesheet_id && t.contract_id == contract_id
                    })
            })
            .fold(PaymentsAmount::default(), |mut sum, p| {
                sum.customer_paid += p.amount.amount;
                sum.supplier_received += p.supplier_amount.amount;
                sum.contractor_received += p.contractor_amount.amount;
                sum
            }))
    }
}

impl Database<Insert<Notification>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, Insert(n): Insert<Notification>) -> Result<()> {
        self.state().notifications.push(n);
        Ok(())
    }
}
