//! [`Notification`]-related [`Database`] implementations.

use common::operations::Insert;
use tracerr::Traced;

use crate::{
    domain::Notification,
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Insert<Notification>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(notification): Insert<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        let Notification {
            id,
            recipient_id,
            kind,
            subject_id,
            message,
            created_at,
        } = notification;

        const SQL: &str = "\
            INSERT INTO notifications (\
                id, recipient_id, kind, subject_id, message, created_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::INT2, $4::UUID, $5::TEXT, \
                $6::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO NOTHING";
        self.exec(
            SQL,
            &[&id, &recipient_id, &kind, &subject_id, &message, &created_at],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}
