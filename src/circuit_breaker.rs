//! # Circuit Breaker Module
//!
//! This module implements the circuit breaker pattern for recognition calls.
//! It prevents piling requests onto a recognition service that keeps
//! failing by temporarily rejecting attempts after repeated failures.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::config::RecognitionConfig;

#[derive(Debug, Default)]
struct BreakerState {
    failure_count: u32,
    last_failure_time: Option<Instant>,
}

/// Circuit breaker for recognition operations
///
/// # State Machine
///
/// - **Closed**: Normal operation, requests pass through
/// - **Open**: Failure threshold exceeded, requests fail fast
/// - **Half-Open**: Reset timeout elapsed, the next request is let through
///
/// # Configuration
///
/// Uses `RecognitionConfig` for:
/// - `circuit_breaker_threshold`: Failures before opening (default: 5)
/// - `circuit_breaker_reset_secs`: Time before attempting reset (default: 60s)
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    threshold: u32,
    reset_after: Duration,
}

impl CircuitBreaker {
    /// Create a new circuit breaker from the recognition configuration
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bankroll_bot::config::RecognitionConfig;
    /// use bankroll_bot::circuit_breaker::CircuitBreaker;
    ///
    /// let circuit_breaker = CircuitBreaker::new(&RecognitionConfig::default());
    /// assert!(!circuit_breaker.is_open());
    /// ```
    pub fn new(config: &RecognitionConfig) -> Self {
        Self {
            state: Mutex::new(BreakerState::default()),
            threshold: config.circuit_breaker_threshold.max(1),
            reset_after: Duration::from_secs(config.circuit_breaker_reset_secs),
        }
    }

    /// Check if the circuit is open (blocking requests)
    ///
    /// Once the reset timeout has elapsed the breaker closes again and
    /// the next request is allowed through.
    pub fn is_open(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if state.failure_count >= self.threshold {
            if let Some(last_time) = state.last_failure_time {
                if last_time.elapsed() < self.reset_after {
                    return true;
                }
                *state = BreakerState::default();
            }
        }
        false
    }

    /// Record a failed call
    pub fn record_failure(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.failure_count = state.failure_count.saturating_add(1);
        state.last_failure_time = Some(Instant::now());
    }

    /// Record a successful call, closing the circuit
    pub fn record_success(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = BreakerState::default();
    }
}
