//! # Money Module
//!
//! Provides the `Money` type used for every balance, fare and transaction
//! amount in the ledger.
//!
//! ## Why Integer Minor Units?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  With floats, a card recharged with 0.1 and 0.2 holds                  │
//! │    0.30000000000000004  ❌ and the ledger sum drifts from the balance   │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    balance_cents (i64) = Σ transactions.amount_cents (i64)              │
//! │    Reconciliation is an exact equality check, never an epsilon         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use transit_core::money::Money;
//!
//! let balance = Money::from_cents(5000);
//! let fare = Money::from_cents(2500);
//!
//! // Guarded arithmetic for balance mutations
//! assert_eq!(balance.checked_sub(fare), Some(Money::from_cents(2500)));
//! assert_eq!(fare.checked_sub(balance), None); // would go negative
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: transaction amounts carry a sign (credit +, debit -)
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Balances use `checked_sub`**: a balance can never be driven below zero
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Recharge amount ──► Card.balance_cents ◄── Purchase fare               │
/// │         │                    ▲                    │                     │
/// │         ▼                    │                    ▼                     │
/// │  Transaction(+amount) ── Σ reconcile ──── Transaction(-fare)            │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use transit_core::money::Money;
    ///
    /// let fare = Money::from_cents(2500);
    /// assert_eq!(fare.cents(), 2500);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value, saturating at `i64::MAX` cents.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.saturating_abs())
    }

    /// Adds two values, returning `None` on i64 overflow.
    ///
    /// ## Example
    /// ```rust
    /// use transit_core::money::Money;
    ///
    /// let top = Money::from_cents(i64::MAX);
    /// assert_eq!(top.checked_add(Money::from_cents(1)), None);
    /// ```
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Subtracts `other`, returning `None` when the result would be negative.
    ///
    /// This is the in-memory twin of the guarded `UPDATE` used by the store:
    /// a balance minus a fare either stays non-negative or the debit fails.
    ///
    /// ## Example
    /// ```rust
    /// use transit_core::money::Money;
    ///
    /// let balance = Money::from_cents(50);
    /// assert_eq!(balance.checked_sub(Money::from_cents(100)), None);
    /// assert_eq!(balance.checked_sub(Money::from_cents(50)), Some(Money::zero()));
    /// ```
    #[inline]
    pub const fn checked_sub(&self, other: Money) -> Option<Money> {
        match self.0.checked_sub(other.0) {
            Some(v) if v >= 0 => Some(Money(v)),
            _ => None,
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the amount with two minor digits, e.g. `$25.00`.
///
/// ## Note
/// Meant for logs and error messages. Presentation layers format for locale.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Negation turns a fare into the signed debit amount.
impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Summing transaction amounts yields the ledger sum for reconciliation.
impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(2599);
        assert_eq!(money.cents(), 2599);
        assert_eq!(money.major(), 25);
        assert_eq!(money.minor(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(2500).to_string(), "$25.00");
        assert_eq!(Money::from_cents(-2500).to_string(), "-$25.00");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::zero().to_string(), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(5000);
        let b = Money::from_cents(2500);

        assert_eq!((a + b).cents(), 7500);
        assert_eq!((a - b).cents(), 2500);
        assert_eq!((-b).cents(), -2500);

        let mut c = a;
        c -= b;
        c += Money::from_cents(1);
        assert_eq!(c.cents(), 2501);
    }

    #[test]
    fn test_checked_sub_never_goes_negative() {
        let balance = Money::from_cents(50);
        assert_eq!(balance.checked_sub(Money::from_cents(100)), None);
        assert_eq!(balance.checked_sub(Money::from_cents(50)), Some(Money::zero()));
        assert_eq!(
            balance.checked_sub(Money::from_cents(20)),
            Some(Money::from_cents(30))
        );
    }

    #[test]
    fn test_checked_add_overflow() {
        assert_eq!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)), None);
        assert_eq!(
            Money::from_cents(10).checked_add(Money::from_cents(5)),
            Some(Money::from_cents(15))
        );
    }

    #[test]
    fn test_sum_matches_running_balance() {
        // Recharge 5000, purchase 2500, inquiry 0, adjustment -100
        let amounts = [5000, -2500, 0, -100].map(Money::from_cents);
        let total: Money = amounts.iter().copied().sum();
        assert_eq!(total.cents(), 2400);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let negative = Money::from_cents(-100);
        assert!(negative.is_negative());
        assert_eq!(negative.abs().cents(), 100);
        assert_eq!(Money::from_cents(i64::MIN).abs().cents(), i64::MAX);
    }
}
