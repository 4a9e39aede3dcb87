//! # Fare Policy
//!
//! A trip costs one flat fare. The card class is stored on the card but has
//! no effect on the price.

use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::types::Card;
use crate::DEFAULT_FARE_CENTS;

/// Flat fare applied to every purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarePolicy {
    flat: Money,
}

impl FarePolicy {
    /// Creates a policy charging `fare` per trip.
    ///
    /// ## Example
    /// ```rust
    /// use transit_core::{FarePolicy, Money};
    ///
    /// let policy = FarePolicy::flat(Money::from_cents(2500)).unwrap();
    /// assert_eq!(policy.base_fare().cents(), 2500);
    /// assert!(FarePolicy::flat(Money::zero()).is_err());
    /// ```
    pub fn flat(fare: Money) -> CoreResult<Self> {
        if !fare.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "fare_cents".to_string(),
            }
            .into());
        }
        Ok(FarePolicy { flat: fare })
    }

    /// The configured fare.
    #[inline]
    pub fn base_fare(&self) -> Money {
        self.flat
    }

    /// Fare charged to this card.
    pub fn fare_for(&self, _card: &Card) -> Money {
        self.flat
    }
}

impl Default for FarePolicy {
    fn default() -> Self {
        FarePolicy {
            flat: Money::from_cents(DEFAULT_FARE_CENTS),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
