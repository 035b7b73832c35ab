//! [`Command`] for notifying participants of a [`Contract`].

use std::collections::HashSet;

use common::operations::{By, Commit, Insert, Select, Transact, Transacted};
use tracerr::Traced;

use crate::{
    domain::{notification, user, Contract, Notification, User},
    infra::{database, Database},
    read::user::EmployersOf,
    Service,
};

use super::Command;

/// [`Command`] for notifying participants of a [`Contract`]: its employee
/// and the employers of its customer and supplier companies.
#[derive(Clone, Debug)]
pub struct NotifyContractParticipants {
    /// [`Contract`] to notify the participants of.
    pub contract: Contract,

    /// [`notification::Kind`] of the [`Notification`]s.
    pub kind: notification::Kind,

    /// Message of the [`Notification`]s.
    pub message: String,
}

impl<Db, Fb> Command<NotifyContractParticipants> for Service<Db, Fb>
where
    Db: Database<
            Select<By<Vec<User>, EmployersOf>>,
            Ok = Vec<User>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Insert<Notification>,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Vec<Notification>;
    type Err = ExecutionError;

    async fn execute(
        &self,
        cmd: NotifyContractParticipants,
    ) -> Result<Self::Ok, Self::Err> {
        let NotifyContractParticipants {
            contract,
            kind,
            message,
        } = cmd;

        let mut recipients = vec![contract.employee_id];
        let companies = [Some(contract.customer_id), contract.supplier_id];
        for company_id in companies.into_iter().flatten() {
            recipients.extend(
                self.database()
                    .execute(Select(By::new(EmployersOf(company_id))))
                    .await
                    .map_err(tracerr::wrap!())?
                    .into_iter()
                    .map(|u| u.id),
            );
        }
        let mut seen = HashSet::<user::Id>::new();
        recipients.retain(|id| seen.insert(*id));

        let notifications = recipients
            .into_iter()
            .map(|id| Notification::new(id, kind, contract.id, message.clone()))
            .collect::<Vec<_>>();

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::wrap!())?;
        for n in &notifications {
            tx.execute(Insert(n.clone()))
                .await
                .map_err(tracerr::wrap!())
                .map(drop)?;
        }
        tx.execute(Commit)
            .await
            .map_err(tracerr::wrap!())
            .map(drop)?;

        Ok(notifications)
    }
}

/// Error of [`NotifyContractParticipants`] [`Command`] execution.
pub type ExecutionError = Traced<database::Error>;
