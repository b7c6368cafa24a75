//! Financial ledger attached to every order
//!
//! All amounts are [`Decimal`] fixed-point values; nothing in the ledger ever
//! goes through binary floating point. The methods here are the only code
//! paths that write to [`Financial`], and each of them leaves
//! `balance_amount == total_price - advance_amount` true.

use crate::core::error::ValidationError;
use crate::core::order::{Financial, Payment, PaymentType};
use rust_decimal::{Decimal, RoundingStrategy};

/// Default advance for a total: `total * ratio`, rounded to whole currency units
///
/// Midpoints round away from zero, so a 50% split of 1001 asks for 501.
pub fn default_advance(total: Decimal, ratio: Decimal) -> Decimal {
    (total * ratio).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

impl Financial {
    /// Record the approved price and advance, deriving the balance
    ///
    /// Rejects negative amounts and an advance larger than the total. On
    /// error nothing is modified.
    pub fn set_price(&mut self, total: Decimal, advance: Decimal) -> Result<(), ValidationError> {
        if total.is_sign_negative() && !total.is_zero() {
            return Err(ValidationError::NegativeAmount {
                field: "totalPrice".to_string(),
                value: total.to_string(),
            });
        }
        if advance.is_sign_negative() && !advance.is_zero() {
            return Err(ValidationError::NegativeAmount {
                field: "advanceAmount".to_string(),
                value: advance.to_string(),
            });
        }
        if advance > total {
            return Err(ValidationError::AdvanceExceedsTotal {
                advance: advance.to_string(),
                total: total.to_string(),
            });
        }

        self.total_price = total;
        self.advance_amount = advance;
        self.balance_amount = total - advance;
        self.is_paid = self.advance_collected() >= self.advance_amount;
        Ok(())
    }

    /// Append a payment and recompute `is_paid`
    ///
    /// Advance payments may not exceed what is left of the advance, and
    /// balance payments may not exceed what is left of the bill, so the sum
    /// of advance payments equals `advance_amount` exactly once paid.
    pub fn record_payment(&mut self, payment: Payment) -> Result<(), ValidationError> {
        if payment.amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositivePayment {
                amount: payment.amount.to_string(),
            });
        }

        let due = match payment.kind {
            PaymentType::Advance => self.advance_amount - self.advance_collected(),
            PaymentType::Balance => self.outstanding(),
        };
        if payment.amount > due {
            return Err(ValidationError::field(
                "amount",
                format!("{} exceeds the {} amount due ({})", payment.amount, kind_name(payment.kind), due),
            ));
        }

        self.payments.push(payment);
        self.is_paid = self.advance_collected() >= self.advance_amount;
        Ok(())
    }

    /// Sum of payments of type `advance`
    pub fn advance_collected(&self) -> Decimal {
        self.collected(PaymentType::Advance)
    }

    /// Sum of every payment regardless of type
    pub fn total_collected(&self) -> Decimal {
        self.payments.iter().map(|p| p.amount).sum()
    }

    /// What the customer still owes on the whole bill
    pub fn outstanding(&self) -> Decimal {
        (self.total_price - self.total_collected()).max(Decimal::ZERO)
    }

    /// Whether the ledger invariants hold
    pub fn is_consistent(&self) -> bool {
        let balance_ok = self.balance_amount == self.total_price - self.advance_amount;
        let advance_ok = !self.is_paid || self.advance_collected() == self.advance_amount;
        let bounds_ok = self.advance_amount >= Decimal::ZERO && self.advance_amount <= self.total_price;
        balance_ok && advance_ok && bounds_ok
    }

    fn collected(&self, kind: PaymentType) -> Decimal {
        self.payments
            .iter()
            .filter(|p| p.kind == kind)
            .map(|p| p.amount)
            .sum()
    }
}

fn kind_name(kind: PaymentType) -> &'static str {
    match kind {
        PaymentType::Advance => "advance",
        PaymentType::Balance => "balance",
    }
}
