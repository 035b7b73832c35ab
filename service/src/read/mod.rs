//! Read entities definitions.

pub mod billing;
pub mod contract;
pub mod user;

/// Wrapper around an entity indicating that it's active (not closed).
#[derive(Clone, Copy, Debug)]
pub struct Active<T>(pub T);
