use std::time::Duration;

/// Exponential retry delay: `initial`, then doubling up to `max`.
///
/// Owned by a single scheduling loop, so no interior locking.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Option<Duration>,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: None,
        }
    }

    /// Delay before the next retry.
    pub fn next_delay(&mut self) -> Duration {
        let next = match self.current {
            None => self.initial,
            Some(current) => current.saturating_mul(2).min(self.max),
        };
        self.current = Some(next);
        next
    }

    /// Forget previous failures; the next delay is `initial` again.
    pub fn reset(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<Duration> {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_first_delay_is_initial() {
        let mut backoff = Backoff::new(secs(1), secs(30));
        assert_eq!(backoff.current(), None);
        assert_eq!(backoff.next_delay(), secs(1));
    }

    #[test]
    fn test_doubles_until_capped() {
        let mut backoff = Backoff::new(secs(1), secs(10));
        let delays: Vec<_> = (0..7).map(|_| backoff.next_delay()).collect();
        assert_eq!(
            delays,
            vec![secs(1), secs(2), secs(4), secs(8), secs(10), secs(10), secs(10)]
        );
    }

    #[test]
    fn test_sequence_is_non_decreasing_and_bounded() {
        let mut backoff = Backoff::new(Duration::from_millis(300), secs(7));
        let mut previous = Duration::ZERO;
        for _ in 0..40 {
            let delay = backoff.next_delay();
            assert!(delay >= previous);
            assert!(delay >= Duration::from_millis(300));
            assert!(delay <= secs(7));
            previous = delay;
        }
    }

    #[test]
    fn test_reset_returns_to_initial() {
        let mut backoff = Backoff::new(secs(5), secs(3600));
        for _ in 0..5 {
            backoff.next_delay();
        }
        backoff.reset();
        assert_eq!(backoff.current(), None);
        assert_eq!(backoff.next_delay(), secs(5));
        assert_eq!(backoff.next_delay(), secs(10));
    }

    #[test]
    fn test_initial_equal_to_max() {
        let mut backoff = Backoff::new(secs(2), secs(2));
        assert_eq!(backoff.next_delay(), secs(2));
        assert_eq!(backoff.next_delay(), secs(2));
    }

    #[test]
    fn test_huge_durations_do_not_overflow() {
        let mut backoff = Backoff::new(Duration::MAX / 2 + Duration::from_secs(1), Duration::MAX);
        backoff.next_delay();
        assert_eq!(backoff.next_delay(), Duration::MAX);
    }
}
