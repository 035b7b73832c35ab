//! [`Command`] for deleting a [`Session`].

use common::operations::{By, Delete};
use derive_more::From;
use tracerr::Traced;

use crate::{
    domain::user::{session, Session},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for deleting a [`Session`] (signing out).
#[derive(Clone, Debug, From)]
pub struct DeleteUserSession {
    /// [`session::Token`] of the [`Session`] to delete.
    pub token: session::Token,
}

impl<Db, Fb> Command<DeleteUserSession> for Service<Db, Fb>
where
    Db: Database<
        Delete<By<Session, session::Token>>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = ExecutionError;

    async fn execute(
        &self,
        DeleteUserSession { token }: DeleteUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        self.database()
            .execute(Delete(By::new(token)))
            .await
            .map_err(tracerr::map_from_and_wrap!())
            .map(drop)
    }
}

/// Error of [`DeleteUserSession`] [`Command`] execution.
pub type ExecutionError = Traced<database::Error>;
