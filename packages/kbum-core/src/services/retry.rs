//! Retry policy for play attempts.
//!
//! A play call moves through `Attempting → {Succeeded, Retrying, Failed}`.
//! [`RetryPolicy::next_step`] is the transition function: given the retry
//! count so far and the outcome of the attempt, it decides the next state.
//! The session drives the loop; the policy never sleeps or touches the engine.

use std::time::Duration;

/// State of a play call after an attempt completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStep {
    /// The attempt succeeded. Terminal.
    Succeeded,
    /// Retry after `delay`, with the retry counter raised to `retry_count`.
    Retrying { retry_count: u32, delay: Duration },
    /// The budget is spent. Terminal; `attempts` includes the initial one.
    Failed { attempts: u32 },
}

/// Bounded retry with linear backoff: retry `n` waits `n * base_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Backoff before retry number `retry_count` (1-based).
    pub fn backoff_delay(&self, retry_count: u32) -> Duration {
        self.base_delay.saturating_mul(retry_count)
    }

    /// Decides the next state after an attempt made with `retry_count`
    /// retries already spent.
    pub fn next_step(&self, retry_count: u32, succeeded: bool) -> RetryStep {
        if succeeded {
            return RetryStep::Succeeded;
        }
        if retry_count < self.max_retries {
            let retry_count = retry_count + 1;
            RetryStep::Retrying {
                retry_count,
                delay: self.backoff_delay(retry_count),
            }
        } else {
            RetryStep::Failed {
                attempts: retry_count + 1,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_secs(2))
    }

    #[test]
    fn success_is_terminal_regardless_of_count() {
        assert_eq!(policy().next_step(0, true), RetryStep::Succeeded);
        assert_eq!(policy().next_step(3, true), RetryStep::Succeeded);
    }

    #[test]
    fn failures_back_off_linearly() {
        let p = policy();
        assert_eq!(
            p.next_step(0, false),
            RetryStep::Retrying {
                retry_count: 1,
                delay: Duration::from_secs(2)
            }
        );
        assert_eq!(
            p.next_step(2, false),
            RetryStep::Retrying {
                retry_count: 3,
                delay: Duration::from_secs(6)
            }
        );
    }

    #[test]
    fn failure_at_budget_is_terminal() {
        assert_eq!(
            policy().next_step(3, false),
            RetryStep::Failed { attempts: 4 }
        );
    }

    #[test]
    fn zero_budget_fails_after_single_attempt() {
        let p = RetryPolicy::new(0, Duration::from_secs(1));
        assert_eq!(p.next_step(0, false), RetryStep::Failed { attempts: 1 });
    }

    #[test]
    fn retry_count_never_exceeds_budget() {
        let p = policy();
        let mut count = 0;
        loop {
            match p.next_step(count, false) {
                RetryStep::Retrying { retry_count, .. } => {
                    assert!(retry_count <= p.max_retries());
                    count = retry_count;
                }
                RetryStep::Failed { attempts } => {
                    assert_eq!(attempts, p.max_retries() + 1);
                    break;
                }
                RetryStep::Succeeded => unreachable!(),
            }
        }
        assert_eq!(count, 3);
    }
}
