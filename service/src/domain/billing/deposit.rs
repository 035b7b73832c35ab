//! [`Deposit`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf, Money};

use crate::domain::{billing::Status, contract};
#[cfg(doc)]
use crate::domain::Contract;

/// Security deposit charged from the customer when a cross-company
/// [`Contract`] is signed.
#[derive(Clone, Debug)]
pub struct Deposit {
    /// ID of the [`Contract`] this [`Deposit`] secures.
    pub contract_id: contract::Id,

    /// Charged amount, equal to a weekly cost of the [`Contract`].
    pub amount: Money,

    /// [`Status`] of this [`Deposit`].
    pub status: Status,

    /// [`DateTime`] when this [`Deposit`] was requested.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Deposit`] was modified last time.
    pub updated_at: ModificationDateTime,
}

impl Deposit {
    /// Creates a new [`Status::Pending`] [`Deposit`] request.
    #[must_use]
    pub fn request(contract_id: contract::Id, amount: Money) -> Self {
        let now = CreationDateTime::now();
        Self {
            contract_id,
            amount,
            status: Status::Pending,
            created_at: now,
            updated_at: now.coerce(),
        }
    }

    /// Requests a refund of this [`Deposit`].
    ///
    /// Only a [`Status::Succeeded`] [`Deposit`] can be refunded, so `false` is
    /// returned for any other one.
    pub fn request_refund(&mut self) -> bool {
        if self.status != Status::Succeeded {
            return false;
        }
        self.status = Status::Refunding;
        self.updated_at = ModificationDateTime::now();
        true
    }
}

/// [`DateTime`] when a [`Deposit`] was requested.
pub type CreationDateTime = DateTimeOf<(Deposit, unit::Creation)>;

/// [`DateTime`] when a [`Deposit`] was modified.
pub type ModificationDateTime = DateTimeOf<(Deposit, unit::Modification)>;

#[cfg(test)]
mod spec {
    use common::{money::Currency, Money};
    use rust_decimal::Decimal;

    use crate::domain::{billing::Status, contract};

    use super::Deposit;

    #[test]
    fn refunds_only_succeeded() {
        let amount = Money {
            amount: Decimal::from(400),
            currency: Currency::Usd,
        };
        let mut deposit = Deposit::request(contract::Id::new(), amount);

        assert!(!deposit.request_refund());
        assert_eq!(deposit.status, Status::Pending);

        deposit.status = Status::Succeeded;
        assert!(deposit.request_refund());
        assert_eq!(deposit.status, Status::Refunding);

        assert!(!deposit.request_refund());
        assert_eq!(deposit.status, Status::Refunding);
    }
}
