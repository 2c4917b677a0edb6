use std::time::Duration;

/// Sleep seam. Production code blocks the thread; tests record the pauses
/// instead of serving them.
pub trait Clock {
    fn sleep(&self, duration: Duration);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Bounded-retry policy: up to `max_attempts` tries with exponential delays
/// between them, capped at `max_delay`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay to sleep after a failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Run `op` under `policy`, sleeping between attempts. Errors for which
/// `should_retry` returns false are returned immediately.
pub fn run_with_retry<T, E>(
    policy: &RetryPolicy,
    clock: &dyn Clock,
    mut should_retry: impl FnMut(&E) -> bool,
    mut op: impl FnMut() -> std::result::Result<T, E>,
) -> std::result::Result<T, E> {
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_attempts && should_retry(&err) => {
                clock.sleep(policy.delay_for(attempt));
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::RecordingClock;
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_delays_grow_exponentially_and_cap() {
        let p = policy();
        assert_eq!(p.delay_for(1), Duration::from_secs(2));
        assert_eq!(p.delay_for(2), Duration::from_secs(4));
        assert_eq!(p.delay_for(3), Duration::from_secs(8));
        assert_eq!(p.delay_for(10), Duration::from_secs(60));
    }

    #[test]
    fn test_retries_until_success() {
        let clock = RecordingClock::default();
        let mut calls = 0;
        let result: Result<i32, &str> = run_with_retry(&policy(), &clock, |_| true, || {
            calls += 1;
            if calls < 3 {
                Err("try again")
            } else {
                Ok(7)
            }
        });
        assert_eq!(result, Ok(7));
        assert_eq!(calls, 3);
        assert_eq!(
            *clock.sleeps.borrow(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[test]
    fn test_non_retryable_error_returns_immediately() {
        let clock = RecordingClock::default();
        let mut calls = 0;
        let result: Result<i32, &str> = run_with_retry(&policy(), &clock, |_| false, || {
            calls += 1;
            Err("fatal")
        });
        assert_eq!(result, Err("fatal"));
        assert_eq!(calls, 1);
        assert!(clock.sleeps.borrow().is_empty());
    }

    #[test]
    fn test_attempts_are_bounded() {
        let clock = RecordingClock::default();
        let mut calls = 0;
        let result: Result<i32, &str> = run_with_retry(&policy(), &clock, |_| true, || {
            calls += 1;
            Err("always")
        });
        assert_eq!(result, Err("always"));
        assert_eq!(calls, 5);
        assert_eq!(clock.sleeps.borrow().len(), 4);
    }
}
