//! [`Command`] for closing a [`Contract`] by one of its participants.

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        contract::{self, ClosingMessage, ClosingReason},
        user, Contract, User,
    },
    infra::{database, Database},
    Service,
};

use super::{mark_contract_closed, Command, MarkContractClosed};

/// [`Command`] for closing a [`Contract`] by one of its participants.
#[derive(Clone, Debug)]
pub struct CloseContract {
    /// ID of the [`Contract`] to be closed.
    pub contract_id: contract::Id,

    /// ID of the [`User`] closing the [`Contract`].
    pub initiator_id: user::Id,

    /// [`ClosingMessage`] explaining the closing.
    pub message: ClosingMessage,
}

impl<Db, Fb> Command<CloseContract> for Service<Db, Fb>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Contract>, contract::Id>>,
            Ok = Option<Contract>,
            Err = Traced<database::Error>,
        >,
    Self: Command<
        MarkContractClosed,
        Ok = mark_contract_closed::Output,
        Err = Traced<mark_contract_closed::ExecutionError>,
    >,
{
    type Ok = Contract;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CloseContract,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CloseContract {
            contract_id,
            initiator_id,
            message,
        } = cmd;

        let initiator = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(initiator_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(initiator_id))
            .map_err(tracerr::wrap!())?;

        let contract = self
            .database()
            .execute(Select(By::<Option<Contract>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ContractNotExists(contract_id))
            .map_err(tracerr::wrap!())?;
        if !contract.is_participant(&initiator) {
            return Err(tracerr::new!(E::NotParticipant(initiator_id)));
        }

        self.execute(MarkContractClosed {
            contract_id,
            reason: ClosingReason::Manually,
            message,
            closed_by: Some(initiator_id),
        })
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(|out| out.contract)
    }
}

/// Error of [`CloseContract`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Contract`] with the provided ID does not exist.
    #[display("`Contract(id: {_0})` does not exist")]
    ContractNotExists(#[error(not(source))] contract::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`MarkContractClosed`] failed.
    #[display("Failed to close `Contract`: {_0}")]
    #[from]
    MarkClosed(mark_contract_closed::ExecutionError),

    /// [`User`] doesn't participate in the [`Contract`].
    #[display("`User(id: {_0})` is not a `Contract` participant")]
    NotParticipant(#[error(not(source))] user::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::{
            company,
            contract::{self, ClosingMessage, ClosingReason},
            user::{self, Role},
            Contract, User,
        },
        infra::{database::Memory, facebook},
        Command as _, Config, Service,
    };

    use super::{CloseContract, ExecutionError as E};

    fn setup() -> (Service<Memory, facebook::Stub>, Memory, Contract, User) {
        let db = Memory::default();
        let (service, _) = Service::new(
            Config::default(),
            db.clone(),
            facebook::Stub::default(),
        );
        let mut c = contract::spec::contract("2030-01-01", "2030-01-14");
        let employee = user::spec::user(Role::Employee, None);
        c.employee_id = employee.id;
        {
            let mut state = db.state();
            _ = state.users.insert(employee.id, employee.clone());
            _ = state.contracts.insert(c.id, c.clone());
        }
        (service, db, c, employee)
    }

    #[tokio::test]
    async fn closes_manually_by_participant() {
        let (service, db, c, _) = setup();
        let customer = user::spec::user(Role::Employer, Some(c.customer_id));
        _ = db.state().users.insert(customer.id, customer.clone());

        let closed = service
            .execute(CloseContract {
                contract_id: c.id,
                initiator_id: customer.id,
                message: ClosingMessage::new("Budget is over").unwrap(),
            })
            .await
            .unwrap();

        let closing = closed.closing.unwrap();
        assert_eq!(closing.reason, ClosingReason::Manually);
        assert_eq!(closing.closed_by, Some(customer.id));
        assert_eq!(closing.message.as_ref(), "Budget is over");
        assert!(!db.state().contracts[&c.id].is_active());
    }

    #[tokio::test]
    async fn forbids_closing_by_outsider() {
        let (service, db, c, _) = setup();
        let company_id = company::Id::new();
        let outsider = user::spec::user(Role::Employer, Some(company_id));
        _ = db.state().users.insert(outsider.id, outsider.clone());

        let err = service
            .execute(CloseContract {
                contract_id: c.id,
                initiator_id: outsider.id,
                message: ClosingMessage::default(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::NotParticipant(_)), "{err}");
        assert!(db.state().contracts[&c.id].is_active());
    }

    #[tokio::test]
    async fn keeps_first_closing() {
        let (service, db, c, employee) = setup();
        {
            let mut state = db.state();
            let stored = state.contracts.get_mut(&c.id).unwrap();
            assert!(stored.close(
                ClosingReason::Expired,
                ClosingMessage::default(),
                None,
            ));
        }
        let before = db.state().contracts[&c.id].closing.clone().unwrap();

        let after = service
            .execute(CloseContract {
                contract_id: c.id,
                initiator_id: employee.id,
                message: ClosingMessage::new("Leaving").unwrap(),
            })
            .await
            .unwrap()
            .closing
            .unwrap();

        assert_eq!(after.reason, ClosingReason::Expired);
        assert_eq!(after.closed_by, None);
        assert_eq!(after.closed_at, before.closed_at);
    }
}
