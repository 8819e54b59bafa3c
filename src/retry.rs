use std::num::NonZeroU32;
use std::time::Duration;

use crate::error::transport_error::Transient;

/// How often and how patiently a failed network attempt is repeated.
///
/// The default never gives up: long unattended migrations would rather hang on
/// a dead endpoint than abort halfway through a channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// `None` retries forever.
    pub max_attempts: Option<NonZeroU32>,
    pub delay: Duration,
}

/// Returned when a bounded policy runs out of attempts.
#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Either the operation failed in a way that must not be retried, or the
/// policy stopped retrying.
#[derive(Debug)]
pub enum RetryError<E> {
    Fatal(E),
    Exhausted(Exhausted<E>),
}

impl RetryPolicy {
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(12_100);

    pub fn unbounded(delay: Duration) -> Self {
        Self { max_attempts: None, delay }
    }

    pub fn bounded(max_attempts: NonZeroU32, delay: Duration) -> Self {
        Self { max_attempts: Some(max_attempts), delay }
    }

    /// Zero delay, unbounded. Mostly useful in tests.
    pub fn immediate() -> Self {
        Self::unbounded(Duration::ZERO)
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max.get())
    }

    /// Runs `operation` until it succeeds, fails fatally, or the policy gives up.
    /// `what` names the operation in the retry log lines.
    pub fn run<T, E, F>(&self, what: &str, mut operation: F) -> Result<T, RetryError<E>>
    where
        E: Transient + std::fmt::Display,
        F: FnMut() -> Result<T, E>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match operation() {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => return Err(RetryError::Fatal(err)),
                Err(err) if self.exhausted(attempts) => {
                    tracing::warn!("{} failed after {} attempts: {}", what, attempts, err);
                    return Err(RetryError::Exhausted(Exhausted { attempts, last_error: err }));
                }
                Err(err) => {
                    tracing::warn!(
                        "{} failed (attempt {}): {}; retrying in {:?}",
                        what,
                        attempts,
                        err,
                        self.delay
                    );
                    if !self.delay.is_zero() {
                        std::thread::sleep(self.delay);
                    }
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded(Self::DEFAULT_DELAY)
    }
}
