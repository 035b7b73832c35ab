//! [`User`] read model definition.
//!
//! [`User`]: crate::domain::User

use crate::domain::company;
#[cfg(doc)]
use crate::domain::{Company, User};

/// Selector of the employer [`User`]s of a [`Company`].
#[derive(Clone, Copy, Debug)]
pub struct EmployersOf(pub company::Id);
