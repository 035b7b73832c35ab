//! [`Query`] collection related to a single [`JobRequest`].

use common::operations::By;

use crate::domain::{job_request, JobRequest};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`JobRequest`] by its [`job_request::Id`].
pub type ById = DatabaseQuery<By<Option<JobRequest>, job_request::Id>>;
