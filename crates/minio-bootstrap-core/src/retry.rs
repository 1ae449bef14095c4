//! Bounded retry with a fixed interval.
//!
//! [`RetryPolicy`] caps a retried operation by attempt count and, optionally,
//! by total elapsed time. Time is read and spent through the [`Clock`] trait,
//! so the loop can be driven by [`ManualClock`] in tests without sleeping.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::warn;
use typed_builder::TypedBuilder;

/// Default number of connection attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

/// Default pause between connection attempts.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3);

/// Shortest time a single attempt is given, whatever the interval.
pub const MIN_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);

/// How often and how long to retry a failing operation.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use minio_bootstrap_core::RetryPolicy;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_attempts, 30);
/// assert_eq!(policy.interval, Duration::from_secs(3));
/// assert_eq!(policy.deadline, Some(Duration::from_secs(90)));
/// assert_eq!(policy.attempt_timeout, Some(Duration::from_secs(3)));
///
/// let unbounded = RetryPolicy::builder().max_attempts(5).build();
/// assert!(unbounded.deadline.is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one. Zero is treated as one.
    #[builder(default = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    /// Pause between a failed attempt and the next one.
    #[builder(default = DEFAULT_INTERVAL)]
    pub interval: Duration,

    /// Optional cap on total elapsed time, checked before each pause.
    #[builder(default)]
    pub deadline: Option<Duration>,

    /// Optional cap on a single attempt. Further shortened to whatever is
    /// left before the deadline.
    #[builder(default)]
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::bounded(DEFAULT_MAX_ATTEMPTS, DEFAULT_INTERVAL)
    }
}

impl RetryPolicy {
    /// A policy whose total run time stays close to `max_attempts * interval`.
    ///
    /// The deadline is `max_attempts * interval` (none when that is zero) and
    /// each attempt may take at most `interval`, but never less than
    /// [`MIN_ATTEMPT_TIMEOUT`].
    #[must_use]
    pub fn bounded(max_attempts: u32, interval: Duration) -> Self {
        let total = interval.saturating_mul(max_attempts);
        Self {
            max_attempts,
            interval,
            deadline: (!total.is_zero()).then_some(total),
            attempt_timeout: Some(interval.max(MIN_ATTEMPT_TIMEOUT)),
        }
    }

    /// Time the next attempt may take, given the time already spent.
    #[must_use]
    pub fn attempt_budget(&self, elapsed: Duration) -> Option<Duration> {
        let remaining = self.deadline.map(|d| d.saturating_sub(elapsed));
        match (self.attempt_timeout, remaining) {
            (Some(limit), Some(remaining)) => Some(limit.min(remaining)),
            (limit, remaining) => limit.or(remaining),
        }
    }
}

/// One invocation of a retried operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// 1-based attempt number.
    pub number: u32,
    /// How long this attempt may take, if bounded.
    pub timeout: Option<Duration>,
}

/// Why a retried operation gave up.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// Every allowed attempt failed.
    #[error("gave up after {attempts} attempts: {last_error}")]
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// Error from the final attempt.
        last_error: E,
    },

    /// The next pause would cross the deadline.
    #[error("deadline of {deadline:?} reached after {attempts} attempts: {last_error}")]
    DeadlineExceeded {
        /// Attempts made.
        attempts: u32,
        /// The configured deadline.
        deadline: Duration,
        /// Error from the final attempt.
        last_error: E,
    },
}

impl<E> RetryError<E> {
    /// Number of attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } | Self::DeadlineExceeded { attempts, .. } => *attempts,
        }
    }

    /// The error from the final attempt.
    pub fn into_last_error(self) -> E {
        match self {
            Self::Exhausted { last_error, .. } | Self::DeadlineExceeded { last_error, .. } => {
                last_error
            }
        }
    }
}

/// Source of monotonic time and sleeping.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;

    /// Suspend for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// [`Clock`] backed by the tokio timer.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    /// Create a clock whose origin is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// [`Clock`] that only advances when slept on, recording every pause.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use minio_bootstrap_core::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// assert_eq!(clock.now(), Duration::ZERO);
/// assert!(clock.sleeps().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    state: Mutex<ManualClockState>,
}

#[derive(Debug, Default)]
struct ManualClockState {
    now: Duration,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    /// Create a clock at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every pause requested so far, in order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().sleeps.clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.state.lock().now
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock();
        state.now += duration;
        state.sleeps.push(duration);
    }
}

/// Run `op` until it succeeds or `policy` gives up.
///
/// `op` receives an [`Attempt`] carrying the 1-based attempt number and the
/// time it may take; enforcing that timeout is up to `op`. A failed attempt is
/// followed by a pause of `policy.interval`, except after the final attempt.
///
/// # Errors
///
/// Returns [`RetryError`] carrying the last attempt's error when the attempt
/// budget or the deadline is exhausted.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    clock: &dyn Clock,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(Attempt) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let started = clock.now();
    let mut attempt = 0;

    loop {
        attempt += 1;
        let timeout = policy.attempt_budget(clock.now().saturating_sub(started));
        let last_error = match op(Attempt {
            number: attempt,
            timeout,
        })
        .await
        {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if attempt >= max_attempts {
            return Err(RetryError::Exhausted {
                attempts: attempt,
                last_error,
            });
        }

        if let Some(deadline) = policy.deadline {
            let elapsed = clock.now().saturating_sub(started);
            if elapsed + policy.interval >= deadline {
                return Err(RetryError::DeadlineExceeded {
                    attempts: attempt,
                    deadline,
                    last_error,
                });
            }
        }

        warn!(
            attempt,
            max_attempts,
            retry_in = ?policy.interval,
            error = %last_error,
            "attempt failed, retrying"
        );
        clock.sleep(policy.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_should_return_first_success_without_sleeping() {
        let clock = ManualClock::new();
        let result: Result<u32, RetryError<String>> =
            retry(&RetryPolicy::default(), &clock, |attempt| async move {
                Ok(attempt.number)
            })
            .await;

        assert_eq!(result.unwrap(), 1);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_should_make_exactly_thirty_attempts_three_seconds_apart() {
        let clock = ManualClock::new();
        let calls = AtomicU32::new(0);

        let result: Result<(), RetryError<&str>> =
            retry(&RetryPolicy::default(), &clock, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("connection refused") }
            })
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, RetryError::Exhausted { attempts: 30, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 30);

        let sleeps = clock.sleeps();
        assert_eq!(sleeps.len(), 29);
        assert!(sleeps.iter().all(|d| *d == Duration::from_secs(3)));
        assert_eq!(clock.now(), Duration::from_secs(87));
    }

    #[tokio::test]
    async fn test_should_succeed_after_transient_failures() {
        let clock = ManualClock::new();
        let result: Result<u32, RetryError<&str>> =
            retry(&RetryPolicy::default(), &clock, |attempt| async move {
                if attempt.number < 4 { Err("not ready") } else { Ok(attempt.number) }
            })
            .await;

        assert_eq!(result.unwrap(), 4);
        assert_eq!(clock.sleeps().len(), 3);
    }

    #[tokio::test]
    async fn test_should_stop_at_deadline() {
        let clock = ManualClock::new();
        let policy = RetryPolicy::builder()
            .max_attempts(100)
            .interval(Duration::from_secs(3))
            .deadline(Some(Duration::from_secs(10)))
            .build();

        let result: Result<(), RetryError<&str>> =
            retry(&policy, &clock, |_| async { Err("down") }).await;

        let err = result.unwrap_err();
        assert!(matches!(err, RetryError::DeadlineExceeded { attempts: 4, .. }));
        assert_eq!(err.into_last_error(), "down");
        assert!(clock.now() <= Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_should_treat_zero_attempts_as_one() {
        let clock = ManualClock::new();
        let policy = RetryPolicy::builder().max_attempts(0).build();

        let result: Result<(), RetryError<&str>> =
            retry(&policy, &clock, |_| async { Err("down") }).await;

        assert_eq!(result.unwrap_err().attempts(), 1);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_should_hand_each_attempt_the_time_left_before_deadline() {
        let clock = ManualClock::new();
        let policy = RetryPolicy::builder()
            .max_attempts(10)
            .interval(Duration::from_secs(3))
            .deadline(Some(Duration::from_secs(10)))
            .attempt_timeout(Some(Duration::from_secs(5)))
            .build();
        let budgets = Mutex::new(Vec::new());

        let result: Result<(), RetryError<&str>> = retry(&policy, &clock, |attempt| {
            budgets.lock().push(attempt.timeout);
            async { Err("down") }
        })
        .await;

        assert!(matches!(result, Err(RetryError::DeadlineExceeded { attempts: 4, .. })));
        assert_eq!(
            budgets.into_inner(),
            vec![
                Some(Duration::from_secs(5)),
                Some(Duration::from_secs(5)),
                Some(Duration::from_secs(4)),
                Some(Duration::from_secs(1)),
            ]
        );
    }

    #[test]
    fn test_should_bound_total_time_by_attempts_times_interval() {
        let policy = RetryPolicy::default();
        assert_eq!(policy, RetryPolicy::bounded(30, Duration::from_secs(3)));
        assert_eq!(policy.deadline, Some(Duration::from_secs(90)));
        assert_eq!(policy.attempt_budget(Duration::ZERO), Some(Duration::from_secs(3)));
        assert_eq!(policy.attempt_budget(Duration::from_secs(89)), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_should_give_attempts_a_floor_when_interval_is_zero() {
        let policy = RetryPolicy::bounded(3, Duration::ZERO);
        assert_eq!(policy.deadline, None);
        assert_eq!(policy.attempt_budget(Duration::from_secs(60)), Some(MIN_ATTEMPT_TIMEOUT));
    }

    #[test]
    fn test_should_leave_attempts_unbounded_without_limits() {
        let policy = RetryPolicy::builder().build();
        assert_eq!(policy.attempt_budget(Duration::ZERO), None);
    }
}
