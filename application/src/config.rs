//! [`Config`]-related definitions.

use std::time;

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use serde::Deserialize;
use service::{
    domain::{
        contract::Hours,
        timesheet::PayoutShares,
        user::auth::{Registry, Strategy},
    },
    infra::facebook,
    task::{
        close_contracts_without_payout, close_expired_contracts,
        close_unpaid_contracts, fill_empty_timesheets,
    },
};
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: Server,

    /// Service configuration.
    pub service: Service,

    /// Postgres configuration.
    pub postgres: Postgres,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    #[default(vec!["*".to_owned()])]
    pub origins: Vec<String>,
}

/// Service configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Service {
    /// Names of the enabled authentication strategies.
    #[default(vec!["password".to_owned(), "facebook".to_owned()])]
    pub auth_strategies: Vec<String>,

    /// Time a user session stays valid without being used.
    #[default(time::Duration::from_secs(30 * 24 * 60 * 60))]
    #[serde(with = "humantime_serde")]
    pub session_ttl: time::Duration,

    /// Maximum hours a contractor may be booked for during a week.
    #[default(40)]
    pub max_hours_per_week: i16,

    /// Shares of a timesheet amount paid out to the payees.
    pub payout_shares: PayoutShares,

    /// Capacity of the contract events bus.
    #[default(256)]
    pub events_capacity: usize,

    /// Facebook Graph API configuration.
    pub facebook: Facebook,

    /// Service tasks configuration.
    pub tasks: Tasks,
}

impl TryFrom<Service> for service::Config {
    type Error = ConfigError;

    fn try_from(value: Service) -> Result<Self, Self::Error> {
        let Service {
            auth_strategies,
            session_ttl,
            max_hours_per_week,
            payout_shares,
            events_capacity,
            facebook: _,
            tasks:
                Tasks {
                    close_expired_contracts,
                    close_unpaid_contracts,
                    close_contracts_without_payout,
                    fill_empty_timesheets,
                },
        } = value;

        let auth = auth_strategies
            .iter()
            .map(|name| {
                name.trim().parse::<Strategy>().map_err(|_| {
                    ConfigError::Message(format!(
                        "unknown authentication strategy `{name}`",
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let max_hours_per_week = Hours::new(max_hours_per_week)
            .ok_or_else(|| {
                ConfigError::Message(format!(
                    "`max_hours_per_week` must be within `0..={}`, \
                     found: {max_hours_per_week}",
                    Hours::MAX,
                ))
            })?;

        Ok(Self {
            auth: Registry::new(auth),
            session_ttl,
            max_hours_per_week,
            payout_shares,
            events_capacity,
            close_expired_contracts: close_expired_contracts::Config {
                interval: close_expired_contracts.interval,
            },
            close_unpaid_contracts: close_unpaid_contracts::Config {
                interval: close_unpaid_contracts.interval,
                grace: close_unpaid_contracts.grace,
            },
            close_contracts_without_payout:
                close_contracts_without_payout::Config {
                    interval: close_contracts_without_payout.interval,
                    grace: close_contracts_without_payout.grace,
                },
            fill_empty_timesheets: fill_empty_timesheets::Config {
                interval: fill_empty_timesheets.interval,
            },
        })
    }
}

/// [Facebook Graph API][1] configuration.
///
/// [1]: https://developers.facebook.com/docs/graph-api
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Facebook {
    /// Base URL of the Graph API.
    #[default("https://graph.facebook.com".to_owned())]
    pub url: String,

    /// Timeout of a single Graph API request.
    #[default(time::Duration::from_secs(10))]
    #[serde(with = "humantime_serde")]
    pub timeout: time::Duration,
}

impl From<Facebook> for facebook::Config {
    fn from(value: Facebook) -> Self {
        let Facebook { url, timeout } = value;
        Self { url, timeout }
    }
}

/// Service tasks configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Tasks {
    /// `CloseExpiredContracts` task configuration.
    pub close_expired_contracts: Task,

    /// `CloseUnpaidContracts` task configuration.
    #[default(GracedTask {
        interval: HOUR,
        grace: 7 * DAY,
    })]
    pub close_unpaid_contracts: GracedTask,

    /// `CloseContractsWithoutPayout` task configuration.
    #[default(GracedTask {
        interval: HOUR,
        grace: 7 * DAY,
    })]
    pub close_contracts_without_payout: GracedTask,

    /// `FillEmptyTimesheets` task configuration.
    pub fill_empty_timesheets: Task,
}

/// Service task configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Task {
    /// Task execution interval.
    #[default(HOUR)]
    #[serde(with = "humantime_serde")]
    pub interval: time::Duration,
}

/// Configuration of a service task tolerating troubles for some time.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct GracedTask {
    /// Task execution interval.
    #[default(HOUR)]
    #[serde(with = "humantime_serde")]
    pub interval: time::Duration,

    /// Time a trouble is tolerated before acting on it.
    #[default(DAY)]
    #[serde(with = "humantime_serde")]
    pub grace: time::Duration,
}

/// One hour.
const HOUR: time::Duration = time::Duration::from_secs(60 * 60);

/// One day.
const DAY: time::Duration = time::Duration::from_secs(24 * 60 * 60);

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("postgres".to_owned())]
    pub dbname: String,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use service::domain::contract::Hours;

    use super::{Service, DAY, HOUR};

    #[test]
    fn converts_default_service_config() {
        let conf = service::Config::try_from(Service::default()).unwrap();

        assert_eq!(conf.max_hours_per_week, Hours::FULL_TIME);
        assert!(conf.auth.find(Some("password")).is_ok());
        assert!(conf.auth.find(Some("facebook")).is_ok());
        assert_eq!(conf.close_expired_contracts.interval, HOUR);
        assert_eq!(conf.close_unpaid_contracts.grace, 7 * DAY);
        assert_eq!(conf.close_contracts_without_payout.grace, 7 * DAY);
    }

    #[test]
    fn rejects_invalid_service_config() {
        let unknown_strategy = Service {
            auth_strategies: vec!["google".to_owned()],
            ..Service::default()
        };
        assert!(service::Config::try_from(unknown_strategy).is_err());

        let too_many_hours = Service {
            max_hours_per_week: 24 * 7 + 1,
            ..Service::default()
        };
        assert!(service::Config::try_from(too_many_hours).is_err());
    }

    #[test]
    fn enables_only_listed_strategies() {
        let conf = service::Config::try_from(Service {
            auth_strategies: vec![" Password ".to_owned()],
            ..Service::default()
        })
        .unwrap();

        assert!(conf.auth.find(Some("password")).is_ok());
        assert!(conf.auth.find(Some("facebook")).is_err());
    }
}
