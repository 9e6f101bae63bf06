//! Time-ordered keys for appended children.
//!
//! A key is 8 characters of millisecond timestamp followed by 12 random
//! characters, all drawn from an alphabet whose byte order matches its
//! numeric order. Keys therefore sort by creation time; keys generated in the
//! same millisecond by one generator increment the random part so they stay
//! strictly increasing.

use std::sync::{Mutex, PoisonError};

use rand::Rng;

/// Alphabet in ascending byte order.
const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const TIME_CHARS: usize = 8;
const RANDOM_CHARS: usize = 12;

/// Generates push keys.
#[derive(Debug, Default)]
pub struct PushKeyGenerator {
    state: Mutex<GeneratorState>,
}

#[derive(Debug, Default)]
struct GeneratorState {
    last_millis: i64,
    last_random: [u8; RANDOM_CHARS],
}

impl PushKeyGenerator {
    /// Create a generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate the next key for a write happening at `now_millis`.
    ///
    /// A clock that moves backwards is treated as standing still.
    pub fn next_key(&self, now_millis: i64) -> String {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if now_millis <= state.last_millis {
            increment(&mut state.last_random);
        } else {
            state.last_millis = now_millis;
            let mut rng = rand::rng();
            for digit in &mut state.last_random {
                *digit = rng.random_range(0..64);
            }
        }

        let mut key = String::with_capacity(TIME_CHARS + RANDOM_CHARS);
        let mut millis = state.last_millis;
        let mut time = [b'-'; TIME_CHARS];
        for slot in time.iter_mut().rev() {
            *slot = char_for(millis.rem_euclid(64));
            millis = millis.div_euclid(64);
        }
        key.extend(time.iter().map(|&b| char::from(b)));
        key.extend(
            state
                .last_random
                .iter()
                .map(|&digit| char::from(char_for(i64::from(digit)))),
        );
        key
    }
}

/// Add one to a base-64 number stored most significant digit first.
fn increment(digits: &mut [u8; RANDOM_CHARS]) {
    for digit in digits.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return;
        }
    }
}

fn char_for(index: i64) -> u8 {
    usize::try_from(index)
        .ok()
        .and_then(|i| PUSH_CHARS.get(i))
        .copied()
        .unwrap_or(b'-')
}
