// daemon/src/daemon/breaker.rs

/// Two-state overload breaker driven by monitor samples.
///
/// Each opening gets a new generation; a scheduled close only applies to the
/// generation it was scheduled for, so a stale timer never closes a newer
/// opening and at most one timer is live per opening.
#[derive(Debug, Default, Clone)]
pub struct CircuitBreaker {
    open: bool,
    consecutive_overloads: u32,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerTransition {
    Opened { generation: u64 },
    Unchanged,
}

impl CircuitBreaker {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn consecutive_overloads(&self) -> u32 {
        self.consecutive_overloads
    }

    /// Feeds one sample. Overload counts up, a healthy sample counts down
    /// (never below zero). Overload seen while open is not counted.
    pub fn record_sample(&mut self, overloaded: bool, threshold: u32) -> BreakerTransition {
        if !overloaded {
            self.consecutive_overloads = self.consecutive_overloads.saturating_sub(1);
            return BreakerTransition::Unchanged;
        }
        if self.open {
            return BreakerTransition::Unchanged;
        }

        self.consecutive_overloads = self.consecutive_overloads.saturating_add(1);
        if self.consecutive_overloads < threshold {
            return BreakerTransition::Unchanged;
        }

        self.open = true;
        self.consecutive_overloads = 0;
        self.generation += 1;
        BreakerTransition::Opened { generation: self.generation }
    }

    /// Closes the breaker if it is still in the given opening.
    pub fn close(&mut self, generation: u64) -> bool {
        if self.open && self.generation == generation {
            self.open = false;
            self.consecutive_overloads = 0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_on_the_threshold_sample() {
        let mut breaker = CircuitBreaker::default();
        for _ in 0..4 {
            assert_eq!(breaker.record_sample(true, 5), BreakerTransition::Unchanged);
        }
        assert!(!breaker.is_open());
        assert_eq!(breaker.record_sample(true, 5), BreakerTransition::Opened { generation: 1 });
        assert!(breaker.is_open());
        assert_eq!(breaker.consecutive_overloads(), 0);
    }

    #[test]
    fn healthy_samples_count_down_without_underflow() {
        let mut breaker = CircuitBreaker::default();
        breaker.record_sample(true, 5);
        breaker.record_sample(true, 5);
        breaker.record_sample(false, 5);
        assert_eq!(breaker.consecutive_overloads(), 1);
        breaker.record_sample(false, 5);
        breaker.record_sample(false, 5);
        assert_eq!(breaker.consecutive_overloads(), 0);
    }

    #[test]
    fn overload_while_open_does_not_reopen() {
        let mut breaker = CircuitBreaker::default();
        for _ in 0..5 {
            breaker.record_sample(true, 5);
        }
        for _ in 0..10 {
            assert_eq!(breaker.record_sample(true, 5), BreakerTransition::Unchanged);
        }
        assert!(breaker.is_open());
        assert_eq!(breaker.consecutive_overloads(), 0);
    }

    #[test]
    fn reopening_after_close_needs_a_full_run_of_overloads() {
        let mut breaker = CircuitBreaker::default();
        for _ in 0..25 {
            breaker.record_sample(true, 5);
        }
        assert!(breaker.close(1));
        assert_eq!(breaker.consecutive_overloads(), 0);

        for _ in 0..4 {
            assert_eq!(breaker.record_sample(true, 5), BreakerTransition::Unchanged);
        }
        assert!(!breaker.is_open());
        assert_eq!(breaker.record_sample(true, 5), BreakerTransition::Opened { generation: 2 });
        assert!(breaker.is_open());
    }

    #[test]
    fn stale_generation_cannot_close() {
        let mut breaker = CircuitBreaker::default();
        for _ in 0..5 {
            breaker.record_sample(true, 5);
        }
        assert!(breaker.close(1));
        for _ in 0..5 {
            breaker.record_sample(true, 5);
        }
        assert!(!breaker.close(1));
        assert!(breaker.is_open());
        assert!(breaker.close(2));
    }
}
