//! [`Query`] collection related to billing records.

use common::operations::By;

use crate::{
    domain::{
        billing::{payment_source, Deposit, PaymentSource, TimesheetPayment},
        contract, timesheet,
    },
    read::billing::PaymentsAmount,
};
#[cfg(doc)]
use crate::{
    domain::{Contract, Timesheet},
    Query,
};

use super::DatabaseQuery;

/// Queries the [`Deposit`] of a [`Contract`].
pub type DepositByContractId = DatabaseQuery<By<Option<Deposit>, contract::Id>>;

/// Queries [`TimesheetPayment`]s of a [`Timesheet`].
pub type PaymentsByTimesheetId =
    DatabaseQuery<By<Vec<TimesheetPayment>, timesheet::Id>>;

/// Queries [`PaymentsAmount`] of a [`Contract`].
pub type PaymentsAmountByContractId =
    DatabaseQuery<By<PaymentsAmount, contract::Id>>;

/// Queries a [`PaymentSource`] by its [`payment_source::Id`].
pub type PaymentSourceById =
    DatabaseQuery<By<Option<PaymentSource>, payment_source::Id>>;
