//! Invoice balance mutator.
//!
//! Pure functions computing the `(paid_amount, balance_amount, status)`
//! triple for an invoice. The status is always derived from the pair
//! `(total_amount, paid_amount)`; it is never set independently.

use tracing::warn;

use billkeep_core::{Amount, DomainError, DomainResult, clamp_non_negative};

use crate::invoice::PaymentStatus;

/// The derived balance triple of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceState {
    pub paid_amount: Amount,
    pub balance_amount: Amount,
    pub status: PaymentStatus,
}

impl BalanceState {
    fn derive(total: Amount, paid: Amount) -> Self {
        Self {
            paid_amount: paid,
            balance_amount: clamp_non_negative(total - paid),
            status: status_for(total, paid),
        }
    }
}

/// Derive the payment status from `(total, paid)`.
///
/// `Paid` iff the balance reaches zero with something paid, `Unpaid` iff
/// nothing is paid, `Partial` otherwise.
pub fn status_for(total: Amount, paid: Amount) -> PaymentStatus {
    if paid <= 0 {
        PaymentStatus::Unpaid
    } else if paid >= total {
        PaymentStatus::Paid
    } else {
        PaymentStatus::Partial
    }
}

/// Seed the balance state of a freshly created (or re-totaled) invoice.
///
/// `paid_now` is clamped to `[0, total]`; rejecting an excess up-front
/// payment is the caller's job before this point.
pub fn initial_state(total: Amount, paid_now: Amount) -> BalanceState {
    let paid = clamp_non_negative(paid_now).min(total);
    BalanceState::derive(total, paid)
}

/// Apply a signed payment delta to an invoice's balance.
///
/// A positive delta is an inbound bill-wise payment and must not exceed the
/// remaining balance. A negative delta is a reversal (payment deletion or
/// invoice cleanup); if records have drifted inconsistent, the paid amount
/// is floored at zero and a data-integrity warning is emitted rather than
/// failing the request.
pub fn payment_delta(total: Amount, paid: Amount, delta: Amount) -> DomainResult<BalanceState> {
    let balance = clamp_non_negative(total - paid);
    if delta > 0 && delta > balance {
        return Err(DomainError::AmountExceedsBalance);
    }

    let mut new_paid = paid + delta;
    if new_paid < 0 {
        warn!(
            paid,
            delta,
            "payment reversal underflows paid amount; flooring at zero"
        );
        new_paid = 0;
    }
    Ok(BalanceState::derive(total, new_paid))
}

/// Recompute the balance state after an invoice total edit.
///
/// The existing paid amount is carried over; shrinking the total below it
/// is rejected so bill-wise allocations can never exceed the invoice.
pub fn retotal(new_total: Amount, paid: Amount) -> DomainResult<BalanceState> {
    if new_total < 0 {
        return Err(DomainError::validation("invoice total cannot be negative"));
    }
    if new_total < paid {
        return Err(DomainError::TotalBelowPaid);
    }
    Ok(initial_state(new_total, paid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn status_is_a_pure_function_of_total_and_paid() {
        assert_eq!(status_for(1000, 0), PaymentStatus::Unpaid);
        assert_eq!(status_for(1000, 400), PaymentStatus::Partial);
        assert_eq!(status_for(1000, 1000), PaymentStatus::Paid);
    }

    #[test]
    fn initial_state_clamps_excess_paid() {
        let s = initial_state(500, 900);
        assert_eq!(s.paid_amount, 500);
        assert_eq!(s.balance_amount, 0);
        assert_eq!(s.status, PaymentStatus::Paid);
    }

    #[test]
    fn initial_state_clamps_negative_paid() {
        let s = initial_state(500, -10);
        assert_eq!(s.paid_amount, 0);
        assert_eq!(s.balance_amount, 500);
        assert_eq!(s.status, PaymentStatus::Unpaid);
    }

    #[test]
    fn delta_beyond_balance_is_rejected() {
        let err = payment_delta(1000, 400, 700).unwrap_err();
        assert_eq!(err, DomainError::AmountExceedsBalance);
    }

    #[test]
    fn delta_up_to_balance_settles_invoice() {
        let s = payment_delta(1000, 400, 600).unwrap();
        assert_eq!(s.paid_amount, 1000);
        assert_eq!(s.balance_amount, 0);
        assert_eq!(s.status, PaymentStatus::Paid);
    }

    #[test]
    fn reversal_floors_paid_at_zero() {
        let s = payment_delta(1000, 100, -300).unwrap();
        assert_eq!(s.paid_amount, 0);
        assert_eq!(s.balance_amount, 1000);
        assert_eq!(s.status, PaymentStatus::Unpaid);
    }

    #[test]
    fn retotal_rejects_total_below_paid() {
        let err = retotal(300, 400).unwrap_err();
        assert_eq!(err, DomainError::TotalBelowPaid);
    }

    #[test]
    fn retotal_keeps_existing_paid() {
        let s = retotal(1200, 400).unwrap();
        assert_eq!(s.paid_amount, 400);
        assert_eq!(s.balance_amount, 800);
        assert_eq!(s.status, PaymentStatus::Partial);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: after any sequence of accepted deltas, the balance
        /// equals `max(0, total - paid)` and the status matches the
        /// derivation rule.
        #[test]
        fn balance_invariant_holds_under_any_delta_sequence(
            total in 1i64..1_000_000i64,
            deltas in prop::collection::vec(-500_000i64..500_000i64, 1..20)
        ) {
            let mut paid = 0i64;
            for delta in deltas {
                if let Ok(state) = payment_delta(total, paid, delta) {
                    prop_assert_eq!(
                        state.balance_amount,
                        (total - state.paid_amount).max(0)
                    );
                    prop_assert!(state.paid_amount >= 0);
                    prop_assert!(state.paid_amount <= total);
                    prop_assert_eq!(state.status, status_for(total, state.paid_amount));
                    paid = state.paid_amount;
                }
            }
        }
    }
}
