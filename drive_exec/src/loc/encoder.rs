//! Single wheel encoder

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Wraps one free running tick counter and turns it into wheel travel.
#[derive(Debug, Clone, Serialize)]
pub struct Encoder {
    /// Wheel travel per tick.
    ///
    /// Units: inches
    in_per_tick: f64,

    /// Raw counter value from the previous update, `None` until the first
    /// sample has been seen.
    last_ticks: Option<i32>,

    /// Ticks accumulated since the first sample, immune to counter wrap.
    total_ticks: i64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Encoder {
    pub fn new(in_per_tick: f64) -> Self {
        Self {
            in_per_tick,
            last_ticks: None,
            total_ticks: 0,
        }
    }

    /// Feed a new raw counter value, returning the wheel travel since the
    /// previous value.
    ///
    /// The first sample only seeds the encoder and returns zero. Counter
    /// wrap-around is handled by taking the shortest wrapping difference.
    pub fn update(&mut self, raw_ticks: i32) -> f64 {
        let delta = match self.last_ticks {
            Some(prev) => raw_ticks.wrapping_sub(prev) as i64,
            None => 0,
        };

        self.last_ticks = Some(raw_ticks);
        self.total_ticks += delta;

        delta as f64 * self.in_per_tick
    }

    /// Total wheel travel since the first sample.
    ///
    /// Units: inches
    pub fn distance_in(&self) -> f64 {
        self.total_ticks as f64 * self.in_per_tick
    }

    pub fn total_ticks(&self) -> i64 {
        self.total_ticks
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_first_sample_seeds() {
        let mut enc = Encoder::new(0.5);

        assert_eq!(enc.update(1000), 0.0);
        assert_abs_diff_eq!(enc.update(1010), 5.0);
        assert_abs_diff_eq!(enc.distance_in(), 5.0);
    }

    #[test]
    fn test_counter_wrap() {
        let mut enc = Encoder::new(1.0);

        enc.update(i32::MAX - 2);
        assert_abs_diff_eq!(enc.update(i32::MIN + 2), 5.0);

        enc.update(i32::MIN + 1);
        assert_abs_diff_eq!(enc.update(i32::MAX), -2.0);
        assert_eq!(enc.total_ticks(), 2);
    }
}
