//! Billing read models definitions.

use rust_decimal::Decimal;

#[cfg(doc)]
use crate::domain::{billing::TimesheetPayment, Contract};

/// Total amounts of the succeeded [`TimesheetPayment`]s of a [`Contract`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PaymentsAmount {
    /// Amount paid by the customer.
    pub customer_paid: Decimal,

    /// Amount received by the supplier.
    pub supplier_received: Decimal,

    /// Amount received by the contractor.
    pub contractor_received: Decimal,
}
