//! # Jitter for requeue delays.
//!
//! [`Jitter`] adds randomness to computed backoff delays so that a batch of
//! messages failing together does not come back for redelivery in lockstep.
//!
//! - [`Jitter::None`] — no randomization, predictable delays
//! - [`Jitter::Full`] — random delay in [0, delay]
//! - [`Jitter::Equal`] — delay/2 + random[0, delay/2]

use std::time::Duration;

use rand::Rng;

/// Randomization applied to a computed requeue delay.
///
/// ## Trade-offs
/// - **None**: predictable, but a failed batch redelivers as a burst
/// - **Full**: maximum spreading, can shrink the delay to zero
/// - **Equal**: keeps at least half the delay (recommended)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Jitter {
    /// Use the exact computed delay.
    #[default]
    None,
    /// Random delay in [0, delay].
    Full,
    /// delay/2 + random[0, delay/2].
    Equal,
}

impl Jitter {
    /// Applies this jitter to the given delay.
    pub fn apply(&self, delay: Duration) -> Duration {
        match self {
            Jitter::None => delay,
            Jitter::Full => full_jitter(delay),
            Jitter::Equal => equal_jitter(delay),
        }
    }
}

/// Full jitter: random[0, delay]
fn full_jitter(delay: Duration) -> Duration {
    let ms = delay.as_millis() as u64;
    if ms == 0 {
        return Duration::ZERO;
    }
    let mut rng = rand::rng();
    Duration::from_millis(rng.random_range(0..=ms))
}

/// Equal jitter: delay/2 + random[0, delay/2]
fn equal_jitter(delay: Duration) -> Duration {
    let ms = delay.as_millis() as u64;
    if ms == 0 {
        return Duration::ZERO;
    }
    let half = ms / 2;
    let jitter = if half == 0 {
        0
    } else {
        rand::rng().random_range(0..=half)
    };
    Duration::from_millis(half + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_identity() {
        let d = Duration::from_millis(750);
        assert_eq!(Jitter::None.apply(d), d);
    }

    #[test]
    fn full_stays_within_bounds() {
        let d = Duration::from_millis(1000);
        for _ in 0..100 {
            assert!(Jitter::Full.apply(d) <= d);
        }
    }

    #[test]
    fn equal_keeps_at_least_half() {
        let d = Duration::from_millis(1000);
        for _ in 0..100 {
            let out = Jitter::Equal.apply(d);
            assert!(out >= Duration::from_millis(500));
            assert!(out <= d);
        }
    }

    #[test]
    fn zero_delay_stays_zero() {
        assert_eq!(Jitter::Full.apply(Duration::ZERO), Duration::ZERO);
        assert_eq!(Jitter::Equal.apply(Duration::ZERO), Duration::ZERO);
    }
}
