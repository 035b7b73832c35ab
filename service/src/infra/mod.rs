//! Infrastructure layer.

pub mod database;
pub mod facebook;

pub use self::{database::Database, facebook::Facebook};
#[cfg(feature = "postgres")]
pub use self::database::{postgres, Postgres};
