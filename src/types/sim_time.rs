// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Simulated clock types.
//!
//! [`SimTime`] is an integer nanosecond clock shared by every entity in a
//! simulation. [`Timer`] pairs a start instant with a sampled duration and
//! is what all timed guards are built from.

use std::fmt::Display;
use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

/// Simulated time in nanoseconds.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SimTime(u64);

impl SimTime {
    /// Start of the simulation.
    pub const ZERO: Self = Self(0);
    /// Smallest representable step of the clock.
    pub const TICK: Self = Self(1);
    /// Infinite time, used to represent a point in time that is never reached.
    pub const NEVER: Self = Self(u64::MAX);

    /// Constructs a new [`SimTime`] from the given number of nanoseconds.
    pub const fn new(time_ns: u64) -> Self {
        Self(time_ns)
    }

    /// Constructs a new [`SimTime`] from the given number of seconds.
    ///
    /// The time is rounded to the nearest nanosecond.
    /// Values beyond the representable range saturate to [`SimTime::NEVER`].
    ///
    /// # Panics
    ///
    /// Panics if `time_secs` is negative or NaN.
    pub fn from_secs(time_secs: f64) -> Self {
        assert!(time_secs >= 0.0);
        let time_ns = (time_secs * 1e9).round() as u64;
        Self::new(time_ns)
    }

    /// Returns the exact number of nanoseconds the [`SimTime`] represents.
    pub const fn nanos(self) -> Option<u64> {
        match self {
            Self::NEVER => None,
            Self(t) => Some(t),
        }
    }

    /// Converts the [`SimTime`] to (fractional) milliseconds.
    pub fn as_millis(self) -> f64 {
        self.nanos()
            .map_or(f64::INFINITY, |nanos| nanos as f64 / 1e6)
    }

    /// Converts the [`SimTime`] to (fractional) seconds.
    pub fn as_secs(self) -> f64 {
        self.nanos()
            .map_or(f64::INFINITY, |nanos| nanos as f64 / 1e9)
    }

    /// Returns `self - earlier`, or zero if `earlier` is later than `self`.
    pub const fn saturating_sub(self, earlier: SimTime) -> SimTime {
        Self(self.0.saturating_sub(earlier.0))
    }

    /// Returns `self + other`, saturating at [`SimTime::NEVER`].
    pub const fn saturating_add(self, other: SimTime) -> SimTime {
        Self(self.0.saturating_add(other.0))
    }
}

impl Add<SimTime> for SimTime {
    type Output = Self;
    fn add(self, other: SimTime) -> Self {
        self.saturating_add(other)
    }
}

impl AddAssign<SimTime> for SimTime {
    fn add_assign(&mut self, other: SimTime) {
        *self = self.saturating_add(other);
    }
}

impl Sub<SimTime> for SimTime {
    type Output = Self;
    fn sub(self, other: SimTime) -> Self {
        self.saturating_sub(other)
    }
}

impl Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self == &SimTime::NEVER {
            write!(f, "never")
        } else if self.0 < 1_000 {
            write!(f, "{} ns", self.0)
        } else if self.0 < 1_000_000 {
            write!(f, "{:.0} us", self.0 as f64 / 1e3)
        } else if self.0 < 1_000_000_000 {
            write!(f, "{:.1} ms", self.as_millis())
        } else {
            write!(f, "{:.3} s", self.as_secs())
        }
    }
}

/// A running timer with a sampled duration.
///
/// The timer has expired once strictly more than `duration` has elapsed
/// since `started`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Timer {
    started: SimTime,
    duration: SimTime,
}

impl Timer {
    /// Starts a new timer at `now`.
    pub const fn start(now: SimTime, duration: SimTime) -> Self {
        Self {
            started: now,
            duration,
        }
    }

    /// Returns `true` iff the elapsed time exceeds the duration.
    pub fn expired(&self, now: SimTime) -> bool {
        now.saturating_sub(self.started) > self.duration
    }

    /// Returns the first instant at which [`Timer::expired`] holds.
    pub fn fires_at(&self) -> SimTime {
        self.started + self.duration + SimTime::TICK
    }

    /// Returns the sampled duration.
    pub const fn duration(&self) -> SimTime {
        self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic() {
        let mut time = SimTime::new(1_000_000);
        assert!((time.as_secs() - 1e-3).abs() < f64::EPSILON);
        assert!((time.as_millis() - 1.0).abs() < f64::EPSILON);
        time += SimTime::new(1_000_000);
        assert!((time.as_secs() - 2e-3).abs() < f64::EPSILON);

        let time = SimTime::from_secs(0.1);
        assert!((time.as_secs() - 0.1).abs() < f64::EPSILON);
        assert_eq!(SimTime::from_secs(1e30), SimTime::NEVER);
        assert_eq!(SimTime::NEVER.as_secs(), f64::INFINITY);
    }

    #[test]
    fn arithmetic_saturates() {
        assert_eq!(SimTime::new(3) - SimTime::new(5), SimTime::ZERO);
        assert_eq!(SimTime::NEVER + SimTime::TICK, SimTime::NEVER);
    }

    #[test]
    fn display() {
        assert_eq!(SimTime::new(12).to_string(), "12 ns");
        assert_eq!(SimTime::from_secs(1.5).to_string(), "1.500 s");
        assert_eq!(SimTime::NEVER.to_string(), "never");
    }

    #[test]
    fn timer_expiry_is_strict() {
        let timer = Timer::start(SimTime::new(100), SimTime::new(50));
        assert!(!timer.expired(SimTime::new(100)));
        assert!(!timer.expired(SimTime::new(150)));
        assert!(timer.expired(SimTime::new(151)));
        assert_eq!(timer.fires_at(), SimTime::new(151));
    }

    #[test]
    fn zero_duration_timer() {
        let timer = Timer::start(SimTime::ZERO, SimTime::ZERO);
        assert!(!timer.expired(SimTime::ZERO));
        assert_eq!(timer.fires_at(), SimTime::TICK);
    }
}
