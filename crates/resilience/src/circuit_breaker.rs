//! Generic per-key circuit breaker (C17).
//!
//! Tracks success/failure counts per key (a translator target language, a
//! synth voice, a downstream service name, ...) and temporarily disables a
//! key that fails repeatedly. After a cooldown it enters a half-open
//! state where one probe determines whether to close or re-open.
//!
//! ```text
//! ┌────────┐  N failures   ┌────────┐  cooldown   ┌──────────┐
//! │ Closed ├──────────────►│  Open  ├────────────►│ HalfOpen │
//! └───▲────┘               └────────┘             └────┬─────┘
//!     │                         ▲                      │
//!     │  success                │  failure              │
//!     └─────────────────────────┴──────────────────────┘
//! ```

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Instant;

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
struct KeyHealth {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
}

impl Default for KeyHealth {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown_secs: 60,
        }
    }
}

pub struct CircuitBreaker<K> {
    config: CircuitBreakerConfig,
    keys: Mutex<HashMap<K, KeyHealth>>,
}

impl<K: Eq + Hash + Clone> CircuitBreaker<K> {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            keys: Mutex::new(HashMap::new()),
        }
    }

    pub fn record_success(&self, key: K) {
        let mut keys = self.keys.lock();
        let health = keys.entry(key).or_default();
        health.state = CircuitState::Closed;
        health.consecutive_failures = 0;
    }

    pub fn record_failure(&self, key: K) {
        let mut keys = self.keys.lock();
        let health = keys.entry(key).or_default();
        health.consecutive_failures += 1;
        health.last_failure_at = Some(Instant::now());
        if health.consecutive_failures >= self.config.failure_threshold {
            health.state = CircuitState::Open;
        }
    }

    /// Whether a call to `key` should be attempted right now.
    pub fn should_attempt(&self, key: K) -> bool {
        let mut keys = self.keys.lock();
        let health = keys.entry(key).or_default();
        match health.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let cooldown_elapsed = health
                    .last_failure_at
                    .is_none_or(|t| t.elapsed().as_secs() >= self.config.cooldown_secs);
                if cooldown_elapsed {
                    health.state = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn state(&self, key: K) -> CircuitState {
        self.keys.lock().get(&key).map_or(CircuitState::Closed, |h| h.state)
    }

    pub fn reset(&self) {
        self.keys.lock().clear();
    }
}
