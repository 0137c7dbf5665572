// Retry policy for partially rejected batches
//
// The default policy never gives up: rejected records are resubmitted until
// the sink accepts them, with the wait doubling after every round. Caps on
// attempts or elapsed time are opt-in.

use std::time::Duration;

/// Wait before the first resubmission.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_backoff: Duration,
    /// Total submissions allowed for one batch, first attempt included
    pub max_attempts: Option<u32>,
    /// Upper bound on time spent on one batch, waits included
    pub max_elapsed: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl RetryPolicy {
    pub fn unlimited() -> Self {
        Self {
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_attempts: None,
            max_elapsed: None,
        }
    }

    pub fn with_initial_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.max_elapsed = Some(max_elapsed);
        self
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.initial_backoff)
    }

    /// Whether another submission may follow `attempts_made` submissions
    /// after waiting `next_wait`.
    pub fn allows_retry(&self, attempts_made: u32, elapsed: Duration, next_wait: Duration) -> bool {
        if let Some(max) = self.max_attempts {
            if attempts_made >= max {
                return false;
            }
        }
        if let Some(max) = self.max_elapsed {
            if elapsed.saturating_add(next_wait) > max {
                return false;
            }
        }
        true
    }
}

/// Exponential backoff state for one delivery.
///
/// Growth is uncapped; the value saturates at `Duration::MAX` instead of
/// overflowing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    next: Duration,
}

impl Backoff {
    pub fn new(initial: Duration) -> Self {
        Self { next: initial }
    }

    /// Wait that the next call to `advance` returns.
    pub fn peek(&self) -> Duration {
        self.next
    }

    /// Return the current wait and double it for the following round.
    pub fn advance(&mut self) -> Duration {
        let wait = self.next;
        self.next = self.next.saturating_mul(2);
        wait
    }
}
