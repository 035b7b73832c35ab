//! GraphQL [`Subscription`]s definitions.

use common::DateTime;
use futures::{
    future,
    stream::{self, BoxStream},
    FutureExt as _, StreamExt as _,
};
use juniper::graphql_subscription;
use service::domain::contract;
use tokio::sync::broadcast::error::RecvError;

use crate::{api, context, Context, Error};

/// Root of all GraphQL subscription.
#[derive(Clone, Copy, Debug)]
pub struct Subscription;

#[graphql_subscription(context = Context)]
impl Subscription {
    /// Subscription waiting for the current authenticated session to expire.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - if the current session is not
    ///                              authenticated or session expired.
    pub async fn wait_session(
        &self,
        ctx: &Context,
    ) -> Result<BoxStream<'static, Result<bool, Error>>, Error> {
        let session = ctx.current_session().await?;
        let timeout = session.expires_at - DateTime::now();
        Ok(stream::once(
            tokio::time::sleep(timeout).map(|()| {
                Err(context::AuthError::AuthorizationRequired.into())
            }),
        )
        .boxed())
    }

    /// Subscription to the `Contract`s closing, which the current
    /// authenticated `User` participates in.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - if the current session is not
    ///                              authenticated or session expired.
    pub async fn contract_closed(
        &self,
        ctx: &Context,
    ) -> Result<BoxStream<'static, Result<api::Contract, Error>>, Error> {
        let me = api::query::my_user(ctx).await?;
        let events = ctx.service().subscribe();

        Ok(stream::unfold(events, |mut events| async move {
            loop {
                match events.recv().await {
                    Ok(contract::Event::Closed(c)) => return Some((c, events)),
                    Ok(
                        contract::Event::Signed(_)
                        | contract::Event::OfferDeclined(_),
                    ) => {}
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(
                            "`contractClosed` subscription skipped {n} \
                             `Contract` events",
                        );
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
        .filter(move |c| future::ready(c.is_participant(&me)))
        .map(|c| Ok(c.into()))
        .boxed())
    }
}
