//! Circuit breaker for downstream protection.
//!
//! # States
//! - Closed: normal operation, calls pass through and are recorded
//! - Open: downstream assumed down, calls fail fast
//! - Half-Open: a limited number of trial calls test recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure rate or slow-call rate >= threshold over the window
//! Open → Half-Open: wait duration elapsed
//! Half-Open → Closed: every permitted trial succeeded
//! Half-Open → Open: any trial failed
//! ```
//!
//! # Design Decisions
//! - One breaker per downstream target, shared through `Arc`
//! - Count-based sliding window (ring buffer of the last W outcomes)
//! - Mode, window and trial counters live behind a single mutex
//! - Every transition bumps a generation; outcomes from older permits are dropped
//! - A permit dropped without an outcome records a failure, so cancelled
//!   callers cannot leave the half-open trial budget exhausted

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;

/// Source of monotonic time, swappable in tests.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(PoisonError::into_inner);
        *elapsed += duration;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        let elapsed = *self.elapsed.lock().unwrap_or_else(PoisonError::into_inner);
        self.start + elapsed
    }
}

/// Breaker mode.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Breaker tuning, resolved from configuration once at startup.
#[derive(Debug, Clone)]
pub struct CircuitBreakerSettings {
    /// Percent, in (0, 100].
    pub failure_rate_threshold: f32,
    /// Percent, in (0, 100].
    pub slow_call_rate_threshold: f32,
    pub minimum_number_of_calls: u32,
    pub sliding_window_size: u32,
    pub wait_duration_in_open_state: Duration,
    pub slow_call_duration_threshold: Duration,
    pub automatic_transition_from_open_to_half_open: bool,
    pub permitted_number_of_calls_in_half_open_state: u32,
}

impl From<&CircuitBreakerConfig> for CircuitBreakerSettings {
    fn from(config: &CircuitBreakerConfig) -> Self {
        Self {
            failure_rate_threshold: config.failure_rate_threshold,
            slow_call_rate_threshold: config.slow_call_rate_threshold,
            minimum_number_of_calls: config.minimum_number_of_calls,
            sliding_window_size: config.sliding_window_size,
            wait_duration_in_open_state: config.wait_duration_in_open_state(),
            slow_call_duration_threshold: config.slow_call_duration_threshold(),
            automatic_transition_from_open_to_half_open: config
                .automatic_transition_from_open_to_half_open_enabled,
            permitted_number_of_calls_in_half_open_state: config
                .permitted_number_of_calls_in_half_open_state,
        }
    }
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self::from(&CircuitBreakerConfig::default())
    }
}

/// Whether a completed call succeeded from the breaker's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Success,
    Failure,
}

/// Proof that a call was admitted; handed back in [`CircuitBreaker::on_outcome`].
///
/// A permit dropped without an outcome (the call's future was cancelled) is
/// recorded as a failure, so a lost trial can never hold the half-open slots.
#[must_use = "a permit must be returned through on_outcome"]
pub struct CallPermit {
    generation: u64,
    acquired_at: Instant,
    core: Option<Arc<BreakerCore>>,
}

impl CallPermit {
    fn complete(mut self, outcome: OutcomeKind, duration: Duration) {
        if let Some(core) = self.core.take() {
            core.record(self.generation, outcome, duration);
        }
    }
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        if let Some(core) = self.core.take() {
            let elapsed = core.clock.now().saturating_duration_since(self.acquired_at);
            tracing::debug!(
                breaker = %core.name,
                generation = self.generation,
                "Permit dropped without an outcome, recording failure"
            );
            core.record(self.generation, OutcomeKind::Failure, elapsed);
        }
    }
}

impl fmt::Debug for CallPermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallPermit")
            .field("generation", &self.generation)
            .field("reported", &self.core.is_none())
            .finish()
    }
}

/// Result of asking the breaker for permission.
#[derive(Debug)]
pub enum Admission {
    Permitted(CallPermit),
    Rejected(CircuitState),
}

/// Point-in-time view of the breaker, for logging and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub buffered_calls: usize,
    pub failed_calls: usize,
    pub slow_calls: usize,
    pub failure_rate: f32,
    pub slow_call_rate: f32,
}

#[derive(Debug, Clone, Copy)]
struct Recorded {
    failed: bool,
    slow: bool,
}

/// Fixed-capacity ring buffer of the most recent outcomes.
#[derive(Debug)]
struct SlidingWindow {
    slots: VecDeque<Recorded>,
    capacity: usize,
    failed: usize,
    slow: usize,
}

impl SlidingWindow {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: VecDeque::with_capacity(capacity),
            capacity,
            failed: 0,
            slow: 0,
        }
    }

    fn push(&mut self, outcome: Recorded) {
        if self.slots.len() == self.capacity {
            if let Some(evicted) = self.slots.pop_front() {
                self.failed -= usize::from(evicted.failed);
                self.slow -= usize::from(evicted.slow);
            }
        }
        self.failed += usize::from(outcome.failed);
        self.slow += usize::from(outcome.slow);
        self.slots.push_back(outcome);
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn failure_rate(&self) -> f32 {
        percentage(self.failed, self.len())
    }

    fn slow_call_rate(&self) -> f32 {
        percentage(self.slow, self.len())
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.failed = 0;
        self.slow = 0;
    }
}

fn percentage(part: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        part as f32 * 100.0 / total as f32
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    window: SlidingWindow,
    opened_at: Option<Instant>,
    generation: u64,
    trials_issued: u32,
    trials_succeeded: u32,
    trials_slow: u32,
}

/// State shared between the breaker and its outstanding permits.
struct BreakerCore {
    name: String,
    settings: CircuitBreakerSettings,
    clock: Arc<dyn Clock>,
    inner: Mutex<BreakerInner>,
}

/// Sliding-window circuit breaker guarding one downstream target.
pub struct CircuitBreaker {
    core: Arc<BreakerCore>,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.core.name)
            .field("settings", &self.core.settings)
            .field("inner", &self.core.inner)
            .finish()
    }
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, settings: CircuitBreakerSettings) -> Self {
        Self::with_clock(name, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(name: impl Into<String>, settings: CircuitBreakerSettings, clock: Arc<dyn Clock>) -> Self {
        let window = SlidingWindow::new(settings.sliding_window_size as usize);
        let name = name.into();
        metrics::record_breaker_state(&name, CircuitState::Closed);
        Self {
            core: Arc::new(BreakerCore {
                name,
                settings,
                clock,
                inner: Mutex::new(BreakerInner {
                    state: CircuitState::Closed,
                    window,
                    opened_at: None,
                    generation: 0,
                    trials_issued: 0,
                    trials_succeeded: 0,
                    trials_slow: 0,
                }),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Ask to run one call against the downstream target.
    pub fn try_acquire(&self) -> Admission {
        let core = &self.core;
        let now = core.clock.now();
        let mut inner = core.lock();

        if inner.state == CircuitState::Open && core.open_expired(&inner, now) {
            core.transition(&mut inner, CircuitState::HalfOpen, now);
        }

        match inner.state {
            CircuitState::Closed => Admission::Permitted(self.permit(inner.generation, now)),
            CircuitState::HalfOpen
                if inner.trials_issued < core.settings.permitted_number_of_calls_in_half_open_state =>
            {
                inner.trials_issued += 1;
                tracing::debug!(
                    breaker = %core.name,
                    trial = inner.trials_issued,
                    "Trial call permitted"
                );
                Admission::Permitted(self.permit(inner.generation, now))
            }
            state => {
                tracing::warn!(breaker = %core.name, state = %state, "Call not permitted");
                metrics::record_call_not_permitted(&core.name);
                Admission::Rejected(state)
            }
        }
    }

    /// Record how an admitted call ended.
    pub fn on_outcome(&self, permit: CallPermit, outcome: OutcomeKind, duration: Duration) {
        permit.complete(outcome, duration);
    }

    /// Current mode. With automatic transition enabled an expired open state
    /// is reported (and recorded) as half-open.
    pub fn state(&self) -> CircuitState {
        let core = &self.core;
        let now = core.clock.now();
        let mut inner = core.lock();
        if core.settings.automatic_transition_from_open_to_half_open
            && inner.state == CircuitState::Open
            && core.open_expired(&inner, now)
        {
            core.transition(&mut inner, CircuitState::HalfOpen, now);
        }
        inner.state
    }

    /// Force the open-state expiry check regardless of the automatic flag.
    pub fn poll_open_expiry(&self) -> CircuitState {
        let core = &self.core;
        let now = core.clock.now();
        let mut inner = core.lock();
        if inner.state == CircuitState::Open && core.open_expired(&inner, now) {
            core.transition(&mut inner, CircuitState::HalfOpen, now);
        }
        inner.state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.core.lock();
        BreakerSnapshot {
            state: inner.state,
            buffered_calls: inner.window.len(),
            failed_calls: inner.window.failed,
            slow_calls: inner.window.slow,
            failure_rate: inner.window.failure_rate(),
            slow_call_rate: inner.window.slow_call_rate(),
        }
    }

    fn permit(&self, generation: u64, now: Instant) -> CallPermit {
        CallPermit {
            generation,
            acquired_at: now,
            core: Some(self.core.clone()),
        }
    }
}

impl BreakerCore {
    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, generation: u64, outcome: OutcomeKind, duration: Duration) {
        let now = self.clock.now();
        let mut inner = self.lock();

        if generation != inner.generation {
            tracing::debug!(
                breaker = %self.name,
                state = %inner.state,
                "Ignoring outcome of a call admitted before the last transition"
            );
            return;
        }

        let recorded = Recorded {
            failed: outcome == OutcomeKind::Failure,
            slow: duration >= self.settings.slow_call_duration_threshold,
        };

        match inner.state {
            CircuitState::Closed => {
                inner.window.push(recorded);
                let minimum = self
                    .settings
                    .minimum_number_of_calls
                    .min(self.settings.sliding_window_size) as usize;
                if inner.window.len() < minimum {
                    return;
                }

                let failure_rate = inner.window.failure_rate();
                let slow_call_rate = inner.window.slow_call_rate();
                if failure_rate >= self.settings.failure_rate_threshold {
                    tracing::warn!(
                        breaker = %self.name,
                        failure_rate = failure_rate,
                        "Failure rate exceeded: {}%",
                        failure_rate
                    );
                    self.transition(&mut inner, CircuitState::Open, now);
                } else if slow_call_rate >= self.settings.slow_call_rate_threshold {
                    tracing::warn!(
                        breaker = %self.name,
                        slow_call_rate = slow_call_rate,
                        "Slow call rate exceeded: {}%",
                        slow_call_rate
                    );
                    self.transition(&mut inner, CircuitState::Open, now);
                }
            }
            CircuitState::HalfOpen => {
                if recorded.failed {
                    tracing::warn!(breaker = %self.name, "Trial call failed");
                    self.transition(&mut inner, CircuitState::Open, now);
                    return;
                }

                inner.trials_succeeded += 1;
                inner.trials_slow += u32::from(recorded.slow);

                let permitted = self.settings.permitted_number_of_calls_in_half_open_state;
                if inner.trials_succeeded >= permitted {
                    let slow_rate = percentage(inner.trials_slow as usize, permitted as usize);
                    if slow_rate >= self.settings.slow_call_rate_threshold {
                        tracing::warn!(
                            breaker = %self.name,
                            slow_call_rate = slow_rate,
                            "Trial calls too slow"
                        );
                        self.transition(&mut inner, CircuitState::Open, now);
                    } else {
                        self.transition(&mut inner, CircuitState::Closed, now);
                    }
                }
            }
            // Unreachable while the generation matches: every transition bumps it.
            CircuitState::Open => {}
        }
    }

    fn open_expired(&self, inner: &BreakerInner, now: Instant) -> bool {
        inner
            .opened_at
            .map(|opened| now.saturating_duration_since(opened) >= self.settings.wait_duration_in_open_state)
            .unwrap_or(true)
    }

    fn transition(&self, inner: &mut BreakerInner, to: CircuitState, now: Instant) {
        let from = inner.state;
        inner.state = to;
        inner.generation += 1;
        inner.trials_issued = 0;
        inner.trials_succeeded = 0;
        inner.trials_slow = 0;

        match to {
            CircuitState::Open => {
                inner.opened_at = Some(now);
                inner.window.clear();
            }
            CircuitState::Closed => {
                inner.opened_at = None;
                inner.window.clear();
            }
            CircuitState::HalfOpen => {}
        }

        tracing::warn!(
            breaker = %self.name,
            from = %from,
            to = %to,
            "State transition: {} -> {}",
            from,
            to
        );
        metrics::record_breaker_transition(&self.name, from, to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> CircuitBreakerSettings {
        CircuitBreakerSettings {
            failure_rate_threshold: 50.0,
            slow_call_rate_threshold: 100.0,
            minimum_number_of_calls: 4,
            sliding_window_size: 4,
            wait_duration_in_open_state: Duration::from_secs(10),
            slow_call_duration_threshold: Duration::from_secs(2),
            automatic_transition_from_open_to_half_open: true,
            permitted_number_of_calls_in_half_open_state: 2,
        }
    }

    fn breaker(settings: CircuitBreakerSettings) -> (CircuitBreaker, MockClock) {
        let clock = MockClock::new();
        let breaker = CircuitBreaker::with_clock("test", settings, Arc::new(clock.clone()));
        (breaker, clock)
    }

    fn call(breaker: &CircuitBreaker, outcome: OutcomeKind) {
        call_taking(breaker, outcome, Duration::from_millis(10));
    }

    fn call_taking(breaker: &CircuitBreaker, outcome: OutcomeKind, duration: Duration) {
        match breaker.try_acquire() {
            Admission::Permitted(permit) => breaker.on_outcome(permit, outcome, duration),
            Admission::Rejected(state) => panic!("call rejected in state {}", state),
        }
    }

    fn open(breaker: &CircuitBreaker) {
        for _ in 0..4 {
            call(breaker, OutcomeKind::Failure);
        }
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn test_opens_once_window_reaches_failure_threshold() {
        let (breaker, _) = breaker(settings());

        call(&breaker, OutcomeKind::Failure);
        call(&breaker, OutcomeKind::Success);
        call(&breaker, OutcomeKind::Failure);
        // 2/3 failed, but the minimum number of calls is not reached yet
        assert_eq!(breaker.state(), CircuitState::Closed);

        call(&breaker, OutcomeKind::Success);
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.snapshot().buffered_calls, 0);
    }

    #[test]
    fn test_stays_closed_below_threshold() {
        let (breaker, _) = breaker(settings());
        for outcome in [
            OutcomeKind::Failure,
            OutcomeKind::Success,
            OutcomeKind::Success,
            OutcomeKind::Success,
            OutcomeKind::Success,
        ] {
            call(&breaker, outcome);
        }
        let snapshot = breaker.snapshot();
        assert_eq!(snapshot.state, CircuitState::Closed);
        assert_eq!(snapshot.buffered_calls, 4);
        assert_eq!(snapshot.failed_calls, 0);
    }

    #[test]
    fn test_window_evicts_oldest_outcome() {
        let (breaker, _) = breaker(CircuitBreakerSettings {
            failure_rate_threshold: 60.0,
            minimum_number_of_calls: 3,
            sliding_window_size: 3,
            ..settings()
        });

        for outcome in [
            OutcomeKind::Failure,
            OutcomeKind::Success,
            OutcomeKind::Success,
            OutcomeKind::Success,
            OutcomeKind::Failure,
        ] {
            call(&breaker, outcome);
        }
        assert_eq!(breaker.snapshot().failed_calls, 1);
        assert_eq!(breaker.state(), CircuitState::Closed);

        // [S, F, F] is 66%; without eviction it would be 3/6
        call(&breaker, OutcomeKind::Failure);
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn test_minimum_calls_capped_by_window_size() {
        let (breaker, _) = breaker(CircuitBreakerSettings {
            minimum_number_of_calls: 100,
            sliding_window_size: 2,
            ..settings()
        });
        call(&breaker, OutcomeKind::Failure);
        call(&breaker, OutcomeKind::Failure);
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn test_slow_calls_open_breaker() {
        let (breaker, _) = breaker(CircuitBreakerSettings {
            slow_call_rate_threshold: 75.0,
            ..settings()
        });
        for _ in 0..3 {
            call_taking(&breaker, OutcomeKind::Success, Duration::from_secs(2));
        }
        call(&breaker, OutcomeKind::Success);
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn test_open_rejects_until_wait_elapses() {
        let (breaker, clock) = breaker(settings());
        open(&breaker);

        clock.advance(Duration::from_secs(9));
        for _ in 0..5 {
            assert!(matches!(breaker.try_acquire(), Admission::Rejected(CircuitState::Open)));
        }

        clock.advance(Duration::from_secs(1));
        let trial = breaker.try_acquire();
        assert!(matches!(trial, Admission::Permitted(_)));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn test_half_open_admits_permitted_trials_then_closes() {
        let (breaker, clock) = breaker(settings());
        open(&breaker);
        clock.advance(Duration::from_secs(10));

        let first = match breaker.try_acquire() {
            Admission::Permitted(p) => p,
            other => panic!("expected permit, got {:?}", other),
        };
        let second = match breaker.try_acquire() {
            Admission::Permitted(p) => p,
            other => panic!("expected permit, got {:?}", other),
        };
        assert!(matches!(breaker.try_acquire(), Admission::Rejected(CircuitState::HalfOpen)));

        breaker.on_outcome(first, OutcomeKind::Success, Duration::from_millis(5));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.on_outcome(second, OutcomeKind::Success, Duration::from_millis(5));

        let snapshot = breaker.snapshot();
        assert_eq!(snapshot.state, CircuitState::Closed);
        assert_eq!(snapshot.buffered_calls, 0);
    }

    #[test]
    fn test_half_open_failure_reopens_and_restarts_wait() {
        let (breaker, clock) = breaker(settings());
        open(&breaker);
        clock.advance(Duration::from_secs(10));

        call(&breaker, OutcomeKind::Success);
        call(&breaker, OutcomeKind::Failure);
        assert_eq!(breaker.state(), CircuitState::Open);

        clock.advance(Duration::from_secs(5));
        assert!(matches!(breaker.try_acquire(), Admission::Rejected(CircuitState::Open)));
        clock.advance(Duration::from_secs(5));
        assert!(matches!(breaker.try_acquire(), Admission::Permitted(_)));
    }

    #[test]
    fn test_slow_trials_reopen() {
        let (breaker, clock) = breaker(CircuitBreakerSettings {
            slow_call_rate_threshold: 50.0,
            ..settings()
        });
        open(&breaker);
        clock.advance(Duration::from_secs(10));

        call_taking(&breaker, OutcomeKind::Success, Duration::from_secs(3));
        call(&breaker, OutcomeKind::Success);
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn test_stale_outcome_is_ignored() {
        let (breaker, clock) = breaker(settings());
        let stale = match breaker.try_acquire() {
            Admission::Permitted(p) => p,
            other => panic!("expected permit, got {:?}", other),
        };
        open(&breaker);
        clock.advance(Duration::from_secs(10));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.on_outcome(stale, OutcomeKind::Failure, Duration::from_millis(1));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        call(&breaker, OutcomeKind::Success);
        call(&breaker, OutcomeKind::Success);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn test_manual_transition_when_automatic_disabled() {
        let (breaker, clock) = breaker(CircuitBreakerSettings {
            automatic_transition_from_open_to_half_open: false,
            ..settings()
        });
        open(&breaker);
        clock.advance(Duration::from_secs(11));

        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.poll_open_expiry(), CircuitState::HalfOpen);
    }

    #[test]
    fn test_expired_open_moves_on_next_call_without_automatic_transition() {
        let (breaker, clock) = breaker(CircuitBreakerSettings {
            automatic_transition_from_open_to_half_open: false,
            ..settings()
        });
        open(&breaker);
        clock.advance(Duration::from_secs(10));

        let trial = breaker.try_acquire();
        assert!(matches!(trial, Admission::Permitted(_)));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }

    fn permit(breaker: &CircuitBreaker) -> CallPermit {
        match breaker.try_acquire() {
            Admission::Permitted(p) => p,
            other => panic!("expected permit, got {:?}", other),
        }
    }

    #[test]
    fn test_dropped_trial_reopens_instead_of_holding_slot() {
        let (breaker, clock) = breaker(settings());
        open(&breaker);
        clock.advance(Duration::from_secs(10));

        let first = permit(&breaker);
        let second = permit(&breaker);
        assert!(matches!(breaker.try_acquire(), Admission::Rejected(CircuitState::HalfOpen)));

        drop(first);
        assert_eq!(breaker.state(), CircuitState::Open);
        // outcome of the surviving trial belongs to the old generation
        breaker.on_outcome(second, OutcomeKind::Success, Duration::from_millis(5));
        assert_eq!(breaker.state(), CircuitState::Open);

        clock.advance(Duration::from_secs(10));
        call(&breaker, OutcomeKind::Success);
        call(&breaker, OutcomeKind::Success);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn test_dropped_permit_counts_as_failure_once() {
        let (breaker, clock) = breaker(settings());

        let abandoned = permit(&breaker);
        clock.advance(Duration::from_secs(3));
        drop(abandoned);

        let snapshot = breaker.snapshot();
        assert_eq!(snapshot.buffered_calls, 1);
        assert_eq!(snapshot.failed_calls, 1);
        assert_eq!(snapshot.slow_calls, 1);

        // a reported permit is not recorded again when it goes out of scope
        call(&breaker, OutcomeKind::Success);
        let snapshot = breaker.snapshot();
        assert_eq!(snapshot.buffered_calls, 2);
        assert_eq!(snapshot.failed_calls, 1);
    }

    #[test]
    fn test_concurrent_outcomes_are_not_lost() {
        let breaker = Arc::new(CircuitBreaker::new(
            "concurrent",
            CircuitBreakerSettings {
                minimum_number_of_calls: 1000,
                sliding_window_size: 1000,
                ..settings()
            },
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let breaker = breaker.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        call(&breaker, OutcomeKind::Success);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = breaker.snapshot();
        assert_eq!(snapshot.state, CircuitState::Closed);
        assert_eq!(snapshot.buffered_calls, 800);
    }
}
