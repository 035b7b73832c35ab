//! [`DispatchContractEvents`] [`Task`].

use std::{convert::Infallible, error::Error};

use common::operations::{By, Insert, Perform, Start};
use derive_more::{Display, Error as StdError, From};
use tokio::sync::broadcast::{self, error::RecvError};
use tracerr::Traced;
use tracing as log;

use crate::{
    command::{
        request_deposit, NotifyContractParticipants, RequestDeposit,
        RequestDepositRefund,
    },
    domain::{billing::Deposit, contract, notification, Notification},
    infra::{database, Database},
    Command, Service,
};

use super::Task;

/// [`Task`] reacting on committed [`contract::Event`]s: requests and refunds
/// deposits and notifies the affected users.
#[derive(Clone, Copy, Debug)]
pub struct DispatchContractEvents<S> {
    /// [`Service`] instance.
    service: S,
}

impl<S> DispatchContractEvents<S> {
    /// Creates a new [`DispatchContractEvents`] [`Task`].
    #[must_use]
    pub const fn new(service: S) -> Self {
        Self { service }
    }
}

impl<Db, Fb>
    Task<
        Start<
            By<
                DispatchContractEvents<Self>,
                broadcast::Receiver<contract::Event>,
            >,
        >,
    > for Service<Db, Fb>
where
    DispatchContractEvents<Self>:
        Task<Perform<contract::Event>, Ok = (), Err: Error>,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<
            By<
                DispatchContractEvents<Self>,
                broadcast::Receiver<contract::Event>,
            >,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let mut events = by.into_inner();
        let task = DispatchContractEvents::new(self.clone());

        loop {
            let event = match events.recv().await {
                Ok(ev) => ev,
                Err(RecvError::Lagged(n)) => {
                    log::warn!(
                        "`task::DispatchContractEvents` skipped {n} events",
                    );
                    continue;
                }
                Err(RecvError::Closed) => return Ok(()),
            };
            _ = task.execute(Perform(event)).await.map_err(|e| {
                log::error!("`task::DispatchContractEvents` failed: {e}");
            });
        }
    }
}

impl<Db, Fb> Task<Perform<contract::Event>>
    for DispatchContractEvents<Service<Db, Fb>>
where
    Db: Database<Insert<Notification>, Err = Traced<database::Error>>,
    Service<Db, Fb>: Command<
            RequestDeposit,
            Ok = Deposit,
            Err = Traced<request_deposit::ExecutionError>,
        > + Command<
            RequestDepositRefund,
            Ok = Option<Deposit>,
            Err = Traced<database::Error>,
        > + Command<
            NotifyContractParticipants,
            Ok = Vec<Notification>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        Perform(event): Perform<contract::Event>,
    ) -> Result<Self::Ok, Self::Err> {
        use contract::Event as Ev;
        use ExecutionError as E;

        match event {
            Ev::Signed(contract) => {
                if !contract.is_internal() {
                    _ = self
                        .service
                        .execute(RequestDeposit::from(contract.id))
                        .await
                        .map_err(tracerr::map_from_and_wrap!(=> E))?;
                }
                let message = format!(
                    "`Contract` from {} to {} is signed.",
                    contract.date_started, contract.date_finished,
                );
                _ = self
                    .service
                    .execute(NotifyContractParticipants {
                        contract,
                        kind: notification::Kind::ContractSigned,
                        message,
                    })
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
            }
            Ev::Closed(contract) => {
                _ = self
                    .service
                    .execute(RequestDepositRefund::from(contract.id))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
                let message = contract
                    .closing
                    .as_ref()
                    .map(|c| c.message.to_string())
                    .unwrap_or_default();
                _ = self
                    .service
                    .execute(NotifyContractParticipants {
                        contract,
                        kind: notification::Kind::ContractClosed,
                        message,
                    })
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
            }
            Ev::OfferDeclined(offer) => {
                let notification = Notification::new(
                    offer.contractor_id,
                    notification::Kind::OfferDeclined,
                    offer.id,
                    "`Offer` is declined: it overlaps with a signed \
                     `Contract`.",
                );
                self.service
                    .database()
                    .execute(Insert(notification))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
            }
        }
        Ok(())
    }
}

/// Error of [`DispatchContractEvents`] execution.
#[derive(Debug, Display, From, StdError)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`RequestDeposit`] failed.
    #[display("Failed to request deposit: {_0}")]
    #[from]
    Deposit(request_deposit::ExecutionError),
}

#[cfg(test)]
mod spec {
    use common::operations::Perform;
    use uuid::Uuid;

    use crate::{
        domain::{
            billing,
            contract::{self, ClosingMessage, ClosingReason},
            notification, offer, user,
        },
        infra::{database::Memory, facebook},
        Config, Service,
    };

    use super::{DispatchContractEvents, Task as _};

    #[tokio::test]
    async fn requests_and_refunds_deposit() {
        let db = Memory::default();
        let (service, _bg) = Service::new(
            Config::default(),
            db.clone(),
            facebook::Stub::default(),
        );
        let task = DispatchContractEvents::new(service);

        let mut c = contract::spec::contract("2030-01-01", "2030-01-14");
        _ = db.state().contracts.insert(c.id, c.clone());

        task.execute(Perform(contract::Event::Signed(c.clone())))
            .await
            .unwrap();
        {
            let mut state = db.state();
            let deposit = state.deposits.get_mut(&c.id).unwrap();
            assert_eq!(deposit.status, billing::Status::Pending);
            assert_eq!(deposit.amount, c.weekly_cost());
            deposit.status = billing::Status::Succeeded;

            assert_eq!(state.notifications.len(), 1);
            assert_eq!(state.notifications[0].recipient_id, c.employee_id);
        }

        _ = c.close(
            ClosingReason::Manually,
            ClosingMessage::new("Project cancelled").unwrap(),
            Some(user::Id::new()),
        );
        task.execute(Perform(contract::Event::Closed(c.clone())))
            .await
            .unwrap();

        let state = db.state();
        assert_eq!(state.deposits[&c.id].status, billing::Status::Refunding);
        let closed = state
            .notifications
            .iter()
            .find(|n| n.kind == notification::Kind::ContractClosed)
            .unwrap();
        assert_eq!(closed.message, "Project cancelled");
    }

    #[tokio::test]
    async fn skips_deposit_of_internal_contract() {
        let db = Memory::default();
        let (service, _bg) = Service::new(
            Config::default(),
            db.clone(),
            facebook::Stub::default(),
        );

        let mut c = contract::spec::contract("2030-01-01", "2030-01-14");
        c.supplier_id = Some(c.customer_id);
        _ = db.state().contracts.insert(c.id, c.clone());

        DispatchContractEvents::new(service)
            .execute(Perform(contract::Event::Signed(c)))
            .await
            .unwrap();

        let state = db.state();
        assert!(state.deposits.is_empty());
        assert_eq!(state.notifications.len(), 1);
    }

    #[tokio::test]
    async fn notifies_contractor_of_declined_offer() {
        let db = Memory::default();
        let (service, _bg) = Service::new(
            Config::default(),
            db.clone(),
            facebook::Stub::default(),
        );
        let o = offer::spec::offer("2030-01-01", 2, 20);

        DispatchContractEvents::new(service)
            .execute(Perform(contract::Event::OfferDeclined(o.clone())))
            .await
            .unwrap();

        let state = db.state();
        assert_eq!(state.notifications.len(), 1);
        let n = &state.notifications[0];
        assert_eq!(n.recipient_id, o.contractor_id);
        assert_eq!(n.kind, notification::Kind::OfferDeclined);
        assert_eq!(n.subject_id, Uuid::from(o.id));
    }
}
