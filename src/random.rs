//! Random fixture generator
//!
//! Each test owns its own [`RandomGen`]. Seed it for a reproducible run:
//!
//! ```rust
//! use bank_ledger::random::RandomGen;
//!
//! let mut a = RandomGen::seeded(42);
//! let mut b = RandomGen::seeded(42);
//! assert_eq!(a.owner(), b.owner());
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::ledger::CreateAccountParams;
use crate::ledger::currency::COMMON_CURRENCIES;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const MIN_BALANCE: i64 = 0;
const MAX_BALANCE: i64 = 1_000_000;

#[derive(Debug, Clone)]
pub struct RandomGen {
    rng: StdRng,
}

impl RandomGen {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Uniform in `[min, max]`
    pub fn int(&mut self, min: i64, max: i64) -> i64 {
        self.rng.gen_range(min..=max)
    }

    /// Lowercase ASCII letters
    pub fn string(&mut self, n: usize) -> String {
        (0..n)
            .map(|_| ALPHABET[self.rng.gen_range(0..ALPHABET.len())] as char)
            .collect()
    }

    pub fn owner(&mut self) -> String {
        format!("user_{}", self.string(6))
    }

    pub fn money(&mut self) -> i64 {
        self.int(MIN_BALANCE, MAX_BALANCE)
    }

    pub fn positive_money(&mut self) -> i64 {
        self.int(1, MAX_BALANCE)
    }

    pub fn negative_money(&mut self) -> i64 {
        -self.int(1, MAX_BALANCE)
    }

    pub fn currency(&mut self) -> &'static str {
        COMMON_CURRENCIES[self.rng.gen_range(0..COMMON_CURRENCIES.len())]
    }

    pub fn account_params(&mut self) -> CreateAccountParams {
        CreateAccountParams {
            owner: self.owner(),
            balance: self.money(),
            currency: self.currency().to_string(),
        }
    }
}

impl Default for RandomGen {
    fn default() -> Self {
        Self::from_entropy()
    }
}
