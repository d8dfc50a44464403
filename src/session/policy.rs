//! Reconnect policy

use std::time::Duration;

use crate::config::ReconnectConfig;

/// Outcome of a failure under the reconnect policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Try again after `delay`
    Retry {
        /// Wait before the next attempt
        delay: Duration,
    },
    /// Budget exhausted
    GiveUp {
        /// Attempts made
        attempts: u32,
    },
}

/// Bounded retry with linear backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Attempts allowed before the first successful connection
    pub initial_max_attempts: u32,
    /// Attempts allowed after a mid-session drop
    pub steady_max_attempts: u32,
    /// Backoff step; attempt `n` waits `n × step`
    pub backoff_step: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_config(&ReconnectConfig::default())
    }
}

impl ReconnectPolicy {
    /// Builds the policy from its configuration section
    pub fn from_config(config: &ReconnectConfig) -> Self {
        Self {
            initial_max_attempts: config.initial_max_attempts,
            steady_max_attempts: config.steady_max_attempts,
            backoff_step: Duration::from_millis(config.backoff_step_ms),
        }
    }

    /// Returns the attempt limit for the current phase
    pub fn limit(&self, has_connected_once: bool) -> u32 {
        if has_connected_once {
            self.steady_max_attempts
        } else {
            self.initial_max_attempts
        }
    }

    /// Returns the delay before attempt `attempt`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_step.saturating_mul(attempt)
    }

    /// Decides what follows failure number `attempt`
    pub fn decide(&self, attempt: u32, has_connected_once: bool) -> ReconnectDecision {
        if attempt >= self.limit(has_connected_once) {
            ReconnectDecision::GiveUp { attempts: attempt }
        } else {
            ReconnectDecision::Retry {
                delay: self.backoff_delay(attempt),
            }
        }
    }
}

/// Status message shown while a retry is pending
pub fn retry_message(delay: Duration) -> String {
    let seconds = ((delay.as_millis() as f64) / 1000.0).round().max(1.0) as u64;
    format!("Re-connecting in {} second(s).", seconds)
}
