// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Retry backoff policies for page reads
//!
//! A policy is a pure function from the number of consecutive failed (or
//! empty) reads to a delay and a retry decision. The walker owns the attempt
//! counter; policies hold no mutable state.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt::Debug;
use std::time::Duration;

/// Outcome of consulting a backoff policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffDecision {
    /// How long to wait before the next attempt
    pub delay: Duration,
    /// False once the attempt budget is spent
    pub retry: bool,
}

/// Maps a consecutive-attempt count to a delay and retry decision
///
/// Implementations must be deterministic, never shrink the delay as
/// `attempt` grows, and return `retry = false` for every
/// `attempt >= max_attempts()`.
pub trait BackoffPolicy: Send + Sync + Debug {
    fn decide(&self, attempt: u32) -> BackoffDecision;

    /// Hard cap on consecutive attempts
    fn max_attempts(&self) -> u32;
}

/// Delay growth between attempts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Growth {
    /// Same delay for every attempt
    Constant,
    /// `base * factor^(attempt - 1)`, capped at `max_delay`
    Exponential { factor: f64, max_delay: Duration },
}

/// Seeded multiplicative jitter
///
/// Each attempt's delay is stretched by a factor in `[1, 1 + max_fraction)`
/// drawn from an RNG seeded with `seed` and the attempt number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jitter {
    pub seed: u64,
    pub max_fraction: f64,
}

/// Bounded retry policy with configurable growth
#[derive(Debug, Clone, PartialEq)]
pub struct RetryBackoff {
    base: Duration,
    max_attempts: u32,
    growth: Growth,
    jitter: Option<Jitter>,
}

impl RetryBackoff {
    /// Constant delay, `max_attempts` attempts
    ///
    /// A budget of zero is raised to one: a policy that never allows a first
    /// attempt would make every walk fail without reading.
    pub fn new(base: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            max_attempts: max_attempts.max(1),
            growth: Growth::Constant,
            jitter: None,
        }
    }

    /// Exponential delay starting at `base`
    pub fn exponential(base: Duration, factor: f64, max_delay: Duration, max_attempts: u32) -> Self {
        let factor = if factor.is_finite() && factor >= 1.0 {
            factor
        } else {
            1.0
        };
        Self {
            growth: Growth::Exponential {
                factor,
                max_delay: max_delay.max(base),
            },
            ..Self::new(base, max_attempts)
        }
    }

    pub fn with_jitter(mut self, seed: u64, max_fraction: f64) -> Self {
        let max_fraction = if max_fraction.is_finite() {
            max_fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.jitter = Some(Jitter { seed, max_fraction });
        self
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn growth(&self) -> Growth {
        self.growth
    }

    /// Un-jittered delay for one attempt
    fn raw_delay(&self, attempt: u32) -> Duration {
        match self.growth {
            Growth::Constant => self.base,
            Growth::Exponential { factor, max_delay } => {
                let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
                let nanos = self.base.as_nanos() as f64 * factor.powi(exp);
                if !nanos.is_finite() || nanos >= max_delay.as_nanos() as f64 {
                    max_delay
                } else {
                    Duration::from_nanos(nanos.round() as u64)
                }
            }
        }
    }

    fn jittered_delay(&self, attempt: u32, jitter: Jitter) -> Duration {
        let raw = self.raw_delay(attempt);
        if jitter.max_fraction == 0.0 {
            return raw;
        }
        let mut rng = StdRng::seed_from_u64(jitter.seed ^ u64::from(attempt).rotate_left(32));
        let stretch = 1.0 + rng.gen_range(0.0..jitter.max_fraction);
        Duration::try_from_secs_f64(raw.as_secs_f64() * stretch).unwrap_or(Duration::MAX)
    }
}

impl BackoffPolicy for RetryBackoff {
    fn decide(&self, attempt: u32) -> BackoffDecision {
        let retry = attempt < self.max_attempts;
        // Attempts past the cap never wait, so bound the running maximum there.
        let last = attempt.min(self.max_attempts);
        let delay = match self.jitter {
            None => self.raw_delay(last),
            // Running maximum keeps jittered delays non-decreasing.
            Some(jitter) => (0..=last)
                .map(|a| self.jittered_delay(a, jitter))
                .max()
                .unwrap_or(self.base),
        };
        BackoffDecision { delay, retry }
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for RetryBackoff {
    /// 50ms constant, 100 attempts
    fn default() -> Self {
        Self::new(Duration::from_millis(50), 100)
    }
}
