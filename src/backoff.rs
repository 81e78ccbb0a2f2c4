use std::time::Duration;

/// Exponential reconnect delay: starts at `initial`, doubles per failure, capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
    attempts: u32,
}

impl Backoff {
    pub fn new(initial_ms: u64, max_ms: u64) -> Self {
        let initial = Duration::from_millis(initial_ms.max(1));
        let max = Duration::from_millis(max_ms.max(initial_ms.max(1)));
        Self {
            initial,
            max,
            current: initial,
            attempts: 0,
        }
    }

    /// Record a failed attempt and return how long to wait before the next one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.attempts = self.attempts.saturating_add(1);
        self.current = (self.current * 2).min(self.max);
        delay
    }

    /// Delay used after a healthy link drops; does not count as a failure.
    pub fn initial(&self) -> Duration {
        self.initial
    }

    /// Reset after a successful connect.
    pub fn reset(&mut self) {
        self.current = self.initial;
        self.attempts = 0;
    }

    /// Consecutive failures since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_until_capped() {
        let mut backoff = Backoff::new(100, 500);
        let delays: Vec<u64> = (0..5).map(|_| backoff.next_delay().as_millis() as u64).collect();
        assert_eq!(delays, vec![100, 200, 400, 500, 500]);
        assert_eq!(backoff.attempts(), 5);
    }

    #[test]
    fn reset_restores_initial_delay() {
        let mut backoff = Backoff::new(50, 1000);
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.attempts(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_millis(50));
    }

    #[test]
    fn initial_delay_leaves_attempts_untouched() {
        let backoff = Backoff::new(250, 1000);
        assert_eq!(backoff.initial(), Duration::from_millis(250));
        assert_eq!(backoff.attempts(), 0);
    }

    #[test]
    fn degenerate_bounds_are_normalised() {
        let mut backoff = Backoff::new(0, 0);
        assert_eq!(backoff.next_delay(), Duration::from_millis(1));
        assert_eq!(backoff.next_delay(), Duration::from_millis(1));
    }
}
