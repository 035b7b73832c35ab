//! [`Query`] collection related to [`Timesheet`]s.

use common::operations::By;

use crate::domain::{contract, Timesheet};
#[cfg(doc)]
use crate::{domain::Contract, Query};

use super::DatabaseQuery;

/// Queries all [`Timesheet`]s of a [`Contract`], ordered by their weeks.
pub type ByContractId = DatabaseQuery<By<Vec<Timesheet>, contract::Id>>;
