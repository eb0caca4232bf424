//! Circuit breaker guarding the postings repository.
//!
//! `Closed` → `Open` after `max_failures` consecutive failures. Once
//! `reset_timeout` has passed since the last failure the next call becomes the
//! single half-open trial: success closes the circuit, failure re-opens it.
//! Every check-and-transition happens under one mutex.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub max_failures: u32,
    /// Time since the last failure before a half-open trial is allowed.
    pub reset_timeout: Duration,
}

impl CircuitBreakerConfig {
    pub fn new(max_failures: u32, reset_timeout: Duration) -> Self {
        Self {
            max_failures: max_failures.max(1),
            reset_timeout,
        }
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitMode {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitState {
    pub mode: CircuitMode,
    pub failure_count: u32,
    pub last_failure_at: Option<Instant>,
}

/// Serializable view of [`CircuitState`] for status reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitSnapshot {
    pub mode: CircuitMode,
    pub failure_count: u32,
    pub ms_since_last_failure: Option<u64>,
}

impl From<CircuitState> for CircuitSnapshot {
    fn from(state: CircuitState) -> Self {
        Self {
            mode: state.mode,
            failure_count: state.failure_count,
            ms_since_last_failure: state
                .last_failure_at
                .map(|at| at.elapsed().as_millis() as u64),
        }
    }
}

#[derive(Debug, Error)]
pub enum BreakerError<E> {
    #[error("Circuit is open; retry after {retry_after_ms}ms")]
    Open { retry_after_ms: u64 },

    #[error(transparent)]
    Inner(E),
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    trial_in_flight: bool,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                state: CircuitState {
                    mode: CircuitMode::Closed,
                    failure_count: 0,
                    last_failure_at: None,
                },
                trial_in_flight: false,
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Runs `op` if the circuit admits it, recording the outcome.
    /// Rejected calls never invoke `op`.
    pub async fn call<F, Fut, T, E>(&self, op: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut permit = self
            .try_acquire()
            .map_err(|retry_after_ms| BreakerError::Open { retry_after_ms })?;

        let result = op().await;
        permit.settle(result.is_ok());
        result.map_err(BreakerError::Inner)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Admits a call or returns how long until the circuit may let one through.
    fn try_acquire(&self) -> Result<Permit<'_>, u64> {
        let mut inner = self.lock();
        match inner.state.mode {
            CircuitMode::Closed => Ok(Permit::new(self, false)),
            CircuitMode::Open => {
                let elapsed = inner
                    .state
                    .last_failure_at
                    .map(|at| at.elapsed())
                    .unwrap_or(self.config.reset_timeout);
                if elapsed >= self.config.reset_timeout {
                    inner.state.mode = CircuitMode::HalfOpen;
                    inner.trial_in_flight = true;
                    info!(circuit = %self.name, "Circuit half-open; admitting one trial call");
                    Ok(Permit::new(self, true))
                } else {
                    let remaining = self.config.reset_timeout - elapsed;
                    Err(remaining.as_millis() as u64)
                }
            }
            CircuitMode::HalfOpen => {
                if inner.trial_in_flight {
                    Err(0)
                } else {
                    inner.trial_in_flight = true;
                    Ok(Permit::new(self, true))
                }
            }
        }
    }

    fn record_success(&self, trial: bool) {
        let mut inner = self.lock();
        match inner.state.mode {
            CircuitMode::Closed => inner.state.failure_count = 0,
            CircuitMode::HalfOpen if trial => {
                inner.state.mode = CircuitMode::Closed;
                inner.state.failure_count = 0;
                inner.trial_in_flight = false;
                info!(circuit = %self.name, "Circuit closed after successful trial call");
            }
            // A straggler from before the circuit opened; the trial decides.
            CircuitMode::HalfOpen | CircuitMode::Open => {}
        }
    }

    fn record_failure(&self, trial: bool) {
        let mut inner = self.lock();
        inner.state.failure_count = inner.state.failure_count.saturating_add(1);
        inner.state.last_failure_at = Some(Instant::now());
        match inner.state.mode {
            CircuitMode::Closed => {
                if inner.state.failure_count >= self.config.max_failures {
                    inner.state.mode = CircuitMode::Open;
                    warn!(
                        circuit = %self.name,
                        failures = inner.state.failure_count,
                        threshold = self.config.max_failures,
                        "Circuit opened after consecutive failures"
                    );
                }
            }
            CircuitMode::HalfOpen if trial => {
                inner.state.mode = CircuitMode::Open;
                inner.trial_in_flight = false;
                warn!(circuit = %self.name, "Circuit re-opened after failed trial call");
            }
            CircuitMode::HalfOpen | CircuitMode::Open => {}
        }
    }
}

/// Admission for one call. Dropping an unsettled permit counts as a failure,
/// so an abandoned trial call cannot leave the circuit stuck half-open.
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl<'a> Permit<'a> {
    fn new(breaker: &'a CircuitBreaker, trial: bool) -> Self {
        Self {
            breaker,
            trial,
            settled: false,
        }
    }

    fn settle(&mut self, success: bool) {
        self.settled = true;
        if success {
            self.breaker.record_success(self.trial);
        } else {
            self.breaker.record_failure(self.trial);
        }
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.trial {
            self.breaker.record_failure(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn breaker(max_failures: u32, reset_secs: u64) -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            CircuitBreakerConfig::new(max_failures, Duration::from_secs(reset_secs)),
        )
    }

    async fn fail(breaker: &CircuitBreaker) {
        let _ = breaker.call(|| async { Err::<(), _>("boom") }).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_after_max_failures() {
        let breaker = breaker(3, 10);
        fail(&breaker).await;
        fail(&breaker).await;
        assert_eq!(breaker.state().mode, CircuitMode::Closed);
        assert_eq!(breaker.state().failure_count, 2);

        fail(&breaker).await;
        assert_eq!(breaker.state().mode, CircuitMode::Open);
        assert!(breaker.state().last_failure_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_circuit_rejects_without_invoking() {
        let breaker = breaker(1, 10);
        fail(&breaker).await;

        let calls = AtomicUsize::new(0);
        let result = breaker
            .call(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, &str>(())
            })
            .await;

        assert!(matches!(result, Err(BreakerError::Open { retry_after_ms }) if retry_after_ms > 0));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_admits_exactly_one_trial() {
        let breaker = breaker(1, 10);
        fail(&breaker).await;
        tokio::time::advance(Duration::from_secs(11)).await;

        let trial = breaker.try_acquire().expect("trial admitted after reset timeout");
        assert_eq!(breaker.state().mode, CircuitMode::HalfOpen);
        assert!(breaker.try_acquire().is_err(), "second call must be rejected");
        drop(trial);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trial_success_closes_and_resets_count() {
        let breaker = breaker(2, 5);
        fail(&breaker).await;
        fail(&breaker).await;
        assert_eq!(breaker.state().mode, CircuitMode::Open);

        tokio::time::advance(Duration::from_secs(5)).await;
        let result = breaker.call(|| async { Ok::<_, &str>(42) }).await;

        assert_eq!(result.unwrap(), 42);
        let state = breaker.state();
        assert_eq!(state.mode, CircuitMode::Closed);
        assert_eq!(state.failure_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trial_failure_reopens_and_restarts_timer() {
        let breaker = breaker(1, 5);
        fail(&breaker).await;
        tokio::time::advance(Duration::from_secs(6)).await;

        fail(&breaker).await;
        assert_eq!(breaker.state().mode, CircuitMode::Open);

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(matches!(
            breaker.call(|| async { Ok::<_, &str>(()) }).await,
            Err(BreakerError::Open { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_trial_reopens() {
        let breaker = breaker(1, 5);
        fail(&breaker).await;
        tokio::time::advance(Duration::from_secs(5)).await;

        drop(breaker.try_acquire().unwrap());
        assert_eq!(breaker.state().mode, CircuitMode::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_consecutive_count() {
        let breaker = breaker(3, 5);
        fail(&breaker).await;
        fail(&breaker).await;
        let _ = breaker.call(|| async { Ok::<_, &str>(()) }).await;
        assert_eq!(breaker.state().failure_count, 0);
        fail(&breaker).await;
        assert_eq!(breaker.state().mode, CircuitMode::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_failures_open_once() {
        let breaker = std::sync::Arc::new(breaker(3, 60));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let breaker = std::sync::Arc::clone(&breaker);
            handles.push(tokio::spawn(async move { fail(&breaker).await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let state = breaker.state();
        assert_eq!(state.mode, CircuitMode::Open);
        // Calls rejected while open never reach record_failure.
        assert!(state.failure_count >= 3 && state.failure_count <= 8);
    }

    #[test]
    fn test_config_floors_threshold_at_one() {
        assert_eq!(CircuitBreakerConfig::new(0, Duration::ZERO).max_failures, 1);
    }
}
