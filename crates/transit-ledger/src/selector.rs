//! # Selector
//!
//! Source of randomness for card numbers and staff picks.
//!
//! Seeded from configuration for reproducible runs, from OS entropy
//! otherwise. The generator sits behind a `parking_lot::Mutex` so one
//! selector can be shared by every service clone.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use transit_core::CARD_NUMBER_LEN;

/// Shared random source.
#[derive(Debug)]
pub struct Selector {
    rng: Mutex<StdRng>,
}

impl Selector {
    /// Deterministic selector.
    pub fn seeded(seed: u64) -> Self {
        Selector {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Selector seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Selector {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Seeded when `seed` is given, entropy otherwise.
    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(s) => Self::seeded(s),
            None => Self::from_entropy(),
        }
    }

    /// A uniformly random 16-digit card number. Leading zeros allowed.
    pub fn card_number(&self) -> String {
        let mut rng = self.rng.lock();
        (0..CARD_NUMBER_LEN)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }

    /// A uniformly random element, `None` when `items` is empty.
    pub fn pick<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        let mut rng = self.rng.lock();
        items.choose(&mut *rng)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use transit_core::validation::validate_card_number;

    #[test]
    fn test_card_number_format() {
        let selector = Selector::from_entropy();
        for _ in 0..50 {
            let number = selector.card_number();
            assert!(validate_card_number(&number).is_ok(), "bad number {number}");
        }
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let a = Selector::seeded(42);
        let b = Selector::seeded(42);
        assert_eq!(a.card_number(), b.card_number());

        let staff = vec!["S1".to_string(), "S2".to_string(), "S3".to_string()];
        assert_eq!(a.pick(&staff), b.pick(&staff));
    }

    #[test]
    fn test_pick_empty() {
        let selector = Selector::seeded(1);
        let empty: Vec<String> = Vec::new();
        assert!(selector.pick(&empty).is_none());
    }

    #[test]
    fn test_pick_reaches_every_element() {
        let selector = Selector::seeded(7);
        let staff = vec!["S1".to_string(), "S2".to_string()];
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            seen.insert(selector.pick(&staff).cloned());
        }
        assert_eq!(seen.len(), 2);
    }
}
