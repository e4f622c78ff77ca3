//! Retry policy for transport attempts.
//!
//! The client wrapper makes one attempt, asks the [`RetryPredicate`] whether
//! the outcome is worth another try, and asks the [`RetryStrategy`] how long to
//! wait. When attempts run out the last outcome is returned as-is: a response
//! still flows on to the executor, a transport error surfaces to the caller.

use crate::transport::RawResponse;
use crate::Error;
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Extra attempts made after the first one by default.
pub const DEFAULT_MAX_EXTRA_ATTEMPTS: usize = 1;

/// Statuses that stop the retry loop even though some are not 2xx.
pub const GOOD_STATUS_CODES: [u16; 7] = [200, 301, 204, 402, 302, 305, 307];

/// The outcome of a single transport attempt.
pub type AttemptOutcome<'a> = std::result::Result<&'a RawResponse, &'a Error>;

/// Returns `true` if an attempt needs no retry: a response arrived and it is
/// either 2xx or one of [`GOOD_STATUS_CODES`].
pub fn is_good_response(outcome: AttemptOutcome<'_>) -> bool {
    match outcome {
        Ok(response) => {
            response.is_successful() || GOOD_STATUS_CODES.contains(&response.status.as_u16())
        }
        Err(_) => false,
    }
}

/// Defines how many extra attempts are made and how long to wait between them.
///
/// # Examples
///
/// ```
/// use encore_sdk::RetryStrategy;
/// use std::time::Duration;
///
/// // One extra attempt, no delay (the default)
/// let immediate = RetryStrategy::default();
/// assert_eq!(immediate.delay_for_attempt(1), Some(Duration::ZERO));
/// assert_eq!(immediate.delay_for_attempt(2), None);
///
/// // Exponential backoff: 100ms, 200ms, 400ms...
/// let exponential = RetryStrategy::ExponentialBackoff {
///     initial_delay: Duration::from_millis(100),
///     max_delay: Duration::from_secs(5),
///     max_extra_attempts: 3,
///     jitter: false,
/// };
/// assert_eq!(exponential.delay_for_attempt(3), Some(Duration::from_millis(400)));
/// ```
#[derive(Debug, Clone)]
pub enum RetryStrategy {
    /// Never retry.
    None,

    /// Retry straight away.
    Immediate {
        /// Extra attempts after the first one.
        max_extra_attempts: usize,
    },

    /// Retry with a fixed delay between attempts.
    Linear {
        /// The delay before each extra attempt.
        delay: Duration,
        /// Extra attempts after the first one.
        max_extra_attempts: usize,
    },

    /// Retry with exponentially increasing delays.
    ///
    /// Each retry waits for `initial_delay * 2^(attempt - 1)` (capped at `max_delay`).
    /// Optional jitter scales each delay to 50-100% of its value.
    ExponentialBackoff {
        /// The delay before the first extra attempt.
        initial_delay: Duration,
        /// The maximum delay between attempts.
        max_delay: Duration,
        /// Extra attempts after the first one.
        max_extra_attempts: usize,
        /// Whether to randomise delays.
        jitter: bool,
    },

    /// Custom retry logic.
    ///
    /// Takes the retry number (1-indexed) and returns the delay before that
    /// retry, or `None` to stop.
    Custom {
        delay_fn: fn(attempt: usize) -> Option<Duration>,
    },
}

impl Default for RetryStrategy {
    fn default() -> Self {
        RetryStrategy::Immediate {
            max_extra_attempts: DEFAULT_MAX_EXTRA_ATTEMPTS,
        }
    }
}

impl RetryStrategy {
    /// Returns the delay before the given retry, or `None` if retries are exhausted.
    ///
    /// # Arguments
    ///
    /// * `attempt` - The retry number (1-indexed, so 1 = first extra attempt)
    pub fn delay_for_attempt(&self, attempt: usize) -> Option<Duration> {
        match self {
            RetryStrategy::None => None,
            RetryStrategy::Immediate { max_extra_attempts } => {
                (attempt <= *max_extra_attempts).then_some(Duration::ZERO)
            }
            RetryStrategy::Linear {
                delay,
                max_extra_attempts,
            } => (attempt <= *max_extra_attempts).then_some(*delay),
            RetryStrategy::ExponentialBackoff {
                initial_delay,
                max_delay,
                max_extra_attempts,
                jitter,
            } => {
                if attempt > *max_extra_attempts {
                    return None;
                }

                let multiplier = 2u64.saturating_pow(attempt.saturating_sub(1) as u32);
                let base_delay =
                    initial_delay.saturating_mul(multiplier.try_into().unwrap_or(u32::MAX));
                let delay = base_delay.min(*max_delay);

                if *jitter {
                    let jitter_factor = rand::thread_rng().gen_range(0.5..=1.0);
                    Some(delay.mul_f64(jitter_factor))
                } else {
                    Some(delay)
                }
            }
            RetryStrategy::Custom { delay_fn } => delay_fn(attempt),
        }
    }

    /// Returns the maximum number of extra attempts, if bounded.
    pub fn max_extra_attempts(&self) -> Option<usize> {
        match self {
            RetryStrategy::None => Some(0),
            RetryStrategy::Immediate { max_extra_attempts }
            | RetryStrategy::Linear {
                max_extra_attempts, ..
            }
            | RetryStrategy::ExponentialBackoff {
                max_extra_attempts, ..
            } => Some(*max_extra_attempts),
            RetryStrategy::Custom { .. } => None,
        }
    }
}

/// Decides whether an attempt's outcome deserves another try.
///
/// # Examples
///
/// ```
/// use encore_sdk::retry::AttemptOutcome;
/// use encore_sdk::RetryPredicate;
///
/// struct RetryOnServiceUnavailable;
///
/// impl RetryPredicate for RetryOnServiceUnavailable {
///     fn should_retry(&self, outcome: AttemptOutcome<'_>, _attempt: usize) -> bool {
///         matches!(outcome, Ok(response) if response.status.as_u16() == 503)
///     }
/// }
/// ```
pub trait RetryPredicate: Send + Sync {
    /// # Arguments
    ///
    /// * `outcome` - The response or transport error of the attempt
    /// * `attempt` - The attempt number (1-indexed)
    fn should_retry(&self, outcome: AttemptOutcome<'_>, attempt: usize) -> bool;
}

/// Retry everything that is not a good response (see [`is_good_response`]).
#[derive(Debug, Clone, Copy)]
pub struct RetryUnlessGood;

impl RetryPredicate for RetryUnlessGood {
    fn should_retry(&self, outcome: AttemptOutcome<'_>, _attempt: usize) -> bool {
        !is_good_response(outcome)
    }
}

/// Retry only when no usable response was obtained.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnTransportError;

impl RetryPredicate for RetryOnTransportError {
    fn should_retry(&self, outcome: AttemptOutcome<'_>, _attempt: usize) -> bool {
        matches!(outcome, Err(e) if e.is_transport())
    }
}

/// When to retry and how long to wait.
#[derive(Clone)]
pub struct RetryPolicy {
    strategy: RetryStrategy,
    predicate: Arc<dyn RetryPredicate>,
}

impl RetryPolicy {
    pub fn new(strategy: RetryStrategy, predicate: Arc<dyn RetryPredicate>) -> Self {
        Self {
            strategy,
            predicate,
        }
    }

    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self::default().with_strategy(RetryStrategy::None)
    }

    pub fn with_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_predicate(mut self, predicate: Arc<dyn RetryPredicate>) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn strategy(&self) -> &RetryStrategy {
        &self.strategy
    }

    /// Returns the delay before the next attempt, or `None` to stop and keep
    /// `outcome`.
    pub fn next_delay(&self, outcome: AttemptOutcome<'_>, attempt: usize) -> Option<Duration> {
        if !self.predicate.should_retry(outcome, attempt) {
            return None;
        }
        self.strategy.delay_for_attempt(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            strategy: RetryStrategy::default(),
            predicate: Arc::new(RetryUnlessGood),
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}
