//! [Facebook Graph API][1] client.
//!
//! [1]: https://developers.facebook.com/docs/graph-api

use std::time::Duration;

use common::operations::{By, Select};
use derive_more::{Display, Error as StdError, From};
use serde::Deserialize;
use smart_default::SmartDefault;
use tracerr::Traced;

use crate::domain::user::{self, facebook};

/// Facebook operation.
pub use common::Handler as Facebook;

/// [`GraphApi`] configuration.
#[derive(Clone, Debug, SmartDefault)]
pub struct Config {
    /// Base URL of the Graph API.
    #[default("https://graph.facebook.com".into())]
    pub url: String,

    /// Timeout of a single Graph API request.
    #[default(Duration::from_secs(10))]
    pub timeout: Duration,
}

/// [Facebook Graph API][1] client.
///
/// [1]: https://developers.facebook.com/docs/graph-api
#[derive(Clone, Debug)]
pub struct GraphApi {
    /// HTTP client performing requests.
    client: reqwest::Client,

    /// Base URL of the Graph API.
    url: String,
}

impl GraphApi {
    /// Creates a new [`GraphApi`] client with the provided [`Config`].
    ///
    /// # Errors
    ///
    /// If the underlying HTTP client cannot be initialized.
    pub fn new(config: &Config) -> Result<Self, Traced<Error>> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(tracerr::from_and_wrap!(=> Error))?;
        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_owned(),
        })
    }
}

/// Body of a successful `GET /me` response.
#[derive(Debug, Deserialize)]
struct Me {
    /// ID of the account.
    id: String,

    /// Email of the account, if shared.
    email: Option<String>,
}

impl<'t>
    Facebook<Select<By<Option<facebook::Account>, &'t facebook::AccessToken>>>
    for GraphApi
{
    type Ok = Option<facebook::Account>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Option<facebook::Account>, &'t facebook::AccessToken>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let token = by.into_inner();

        let resp = self
            .client
            .get(format!("{}/me", self.url))
            .query(&[("fields", "id,email"), ("access_token", token.as_ref())])
            .send()
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))?;
        // Graph API answers with an error status on invalid tokens.
        if !resp.status().is_success() {
            return Ok(None);
        }

        let Me { id, email } =
            resp.json().await.map_err(tracerr::from_and_wrap!(=> Error))?;
        Ok(facebook::AccountId::new(id).map(|id| facebook::Account {
            id,
            email: email.and_then(user::Email::new),
        }))
    }
}

/// [`Facebook`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// HTTP request to the Graph API failed.
    #[display("Graph API request failed: {_0}")]
    Request(reqwest::Error),
}

/// [`Facebook`] double resolving predefined [`facebook::AccessToken`]s.
#[cfg(test)]
#[derive(Clone, Debug, Default)]
pub struct Stub(
    std::collections::HashMap<String, facebook::Account>,
);

#[cfg(test)]
impl Stub {
    /// Makes the provided `token` resolve into the provided
    /// [`facebook::Account`].
    #[must_use]
    pub fn with(mut self, token: &str, account: facebook::Account) -> Self {
        _ = self.0.insert(token.into(), account);
        self
    }
}

#[cfg(test)]
impl<'t>
    Facebook<Select<By<Option<facebook::Account>, &'t facebook::AccessToken>>>
    for Stub
{
    type Ok = Option<facebook::Account>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Option<facebook::Account>, &'t facebook::AccessToken>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.0.get(by.into_inner().as_ref()).cloned())
    }
}
