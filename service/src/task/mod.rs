//! Background [`Task`]s definitions.

mod background;
pub mod close_contracts_without_payout;
pub mod close_expired_contracts;
pub mod close_unpaid_contracts;
pub mod dispatch_contract_events;
pub mod fill_empty_timesheets;

use std::{convert::Infallible, fmt::Display, time::Duration};

use common::operations::Perform;
use tokio::time;
use tracing as log;

pub use common::Handler as Task;

pub use self::{
    background::Background,
    close_contracts_without_payout::CloseContractsWithoutPayout,
    close_expired_contracts::CloseExpiredContracts,
    close_unpaid_contracts::CloseUnpaidContracts,
    dispatch_contract_events::DispatchContractEvents,
    fill_empty_timesheets::FillEmptyTimesheets,
};

/// Performs the provided [`Task`] once per `period` forever, logging its
/// failures.
async fn repeat<T>(task: &T, name: &str, period: Duration) -> Infallible
where
    T: Task<Perform<()>, Ok = ()>,
    T::Err: Display,
{
    let mut interval = time::interval(period);
    loop {
        let _ = interval.tick().await;
        _ = task.execute(Perform(())).await.map_err(|e| {
            log::error!("`task::{name}` failed: {e}");
        });
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{operations::Perform, Date};

    use crate::{
        domain::{
            billing::{self, Deposit, PayoutAccount},
            contract::{self, ClosingReason},
            user, User,
        },
        infra::{database::Memory, facebook},
        Config, Service,
    };

    use super::{
        close_contracts_without_payout, close_expired_contracts,
        close_unpaid_contracts, CloseContractsWithoutPayout,
        CloseExpiredContracts, CloseUnpaidContracts, Task as _,
    };

    const MONTH: Duration = Duration::from_secs(30 * 24 * 60 * 60);

    #[tokio::test]
    async fn expired_contract_is_not_closed_again_as_unpaid() {
        let db = Memory::default();
        let (service, _bg) = Service::new(
            Config::default(),
            db.clone(),
            facebook::Stub::default(),
        );

        let today = Date::today();
        let c = contract::spec::contract(
            &today.add_days(-30).to_string(),
            &today.add_days(-1).to_string(),
        );
        let mut deposit = Deposit::request(c.id, c.weekly_cost());
        deposit.status = billing::Status::Failed;
        deposit.created_at = deposit.created_at - MONTH;
        {
            let mut state = db.state();
            _ = state.deposits.insert(c.id, deposit);
            _ = state.contracts.insert(c.id, c.clone());
        }

        CloseExpiredContracts::new(
            close_expired_contracts::Config::default(),
            service.clone(),
        )
        .execute(Perform(()))
        .await
        .unwrap();
        let closing = db.state().contracts[&c.id].closing.clone().unwrap();
        assert_eq!(closing.reason, ClosingReason::Expired);

        CloseUnpaidContracts::new(
            close_unpaid_contracts::Config::default(),
            service,
        )
        .execute(Perform(()))
        .await
        .unwrap();
        let after = db.state().contracts[&c.id].closing.clone().unwrap();
        assert_eq!(after.reason, ClosingReason::Expired);
        assert_eq!(after.closed_at, closing.closed_at);
    }

    #[tokio::test]
    async fn closes_unpaid_contract_after_grace() {
        let db = Memory::default();
        let (service, _bg) = Service::new(
            Config::default(),
            db.clone(),
            facebook::Stub::default(),
        );

        let today = Date::today();
        let (start, end) = (
            today.add_days(-10).to_string(),
            today.add_days(30).to_string(),
        );
        let (late, fresh) = (
            contract::spec::contract(&start, &end),
            contract::spec::contract(&start, &end),
        );
        {
            let mut state = db.state();
            for (c, age) in [(&late, MONTH), (&fresh, Duration::ZERO)] {
                let mut deposit = Deposit::request(c.id, c.weekly_cost());
                deposit.status = billing::Status::Failed;
                deposit.created_at = deposit.created_at - age;
                _ = state.deposits.insert(c.id, deposit);
                _ = state.contracts.insert(c.id, c.clone());
            }
        }

        CloseUnpaidContracts::new(
            close_unpaid_contracts::Config::default(),
            service,
        )
        .execute(Perform(()))
        .await
        .unwrap();

        let state = db.state();
        let closing = state.contracts[&late.id].closing.clone().unwrap();
        assert_eq!(closing.reason, ClosingReason::Unpaid);
        assert!(state.contracts[&fresh.id].is_active());
    }

    #[tokio::test]
    async fn closes_contract_without_payout_account_after_grace() {
        let db = Memory::default();
        let (service, _bg) = Service::new(
            Config::default(),
            db.clone(),
            facebook::Stub::default(),
        );

        let today = Date::today();
        let (start, end) = (
            today.add_days(-30).to_string(),
            today.add_days(30).to_string(),
        );
        let (mut unpaid, mut paid, mut fresh) = (
            contract::spec::contract(&start, &end),
            contract::spec::contract(&start, &end),
            contract::spec::contract(&start, &end),
        );
        {
            let mut state = db.state();
            for (c, account, age) in [
                (&mut unpaid, None, MONTH),
                (&mut paid, PayoutAccount::new("acct_1"), MONTH),
                (&mut fresh, None, Duration::ZERO),
            ] {
                c.supplier_id = None;
                c.created_at = c.created_at - age;
                let id = c.employee_id;
                _ = state.users.insert(
                    id,
                    User {
                        id,
                        name: user::Name::new("Jane Doe").unwrap(),
                        email: user::Email::new(format!("{id}@example.com"))
                            .unwrap(),
                        password_hash: None,
                        facebook_id: None,
                        role: user::Role::Employee,
                        company_id: None,
                        payout_account: account,
                        created_at: user::CreationDateTime::now(),
                        deleted_at: None,
                    },
                );
                _ = state.contracts.insert(c.id, c.clone());
            }
        }

        CloseContractsWithoutPayout::new(
            close_contracts_without_payout::Config::default(),
            service,
        )
        .execute(Perform(()))
        .await
        .unwrap();

        let state = db.state();
        let closing = state.contracts[&unpaid.id].closing.clone().unwrap();
        assert_eq!(closing.reason, ClosingReason::NoPayoutAccount);
        assert!(state.contracts[&paid.id].is_active());
        assert!(state.contracts[&fresh.id].is_active());
    }
}
