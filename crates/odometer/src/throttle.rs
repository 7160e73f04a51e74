//! Time-based log throttling.

/// Lets a repeated warning through at most once per `interval` seconds of
/// frame time.
#[derive(Debug, Clone)]
pub struct WarnThrottle {
    interval: f64,
    last: Option<f64>,
    suppressed: u64,
}

impl WarnThrottle {
    pub fn new(interval: f64) -> Self {
        Self {
            interval,
            last: None,
            suppressed: 0,
        }
    }

    /// Returns `true` if a warning at `now` should be emitted.
    ///
    /// A clock that jumps backwards re-arms the throttle.
    pub fn should_emit(&mut self, now: f64) -> bool {
        let emit = match self.last {
            None => true,
            Some(last) => now < last || now - last >= self.interval,
        };
        if emit {
            self.last = Some(now);
        } else {
            self.suppressed += 1;
        }
        emit
    }

    /// Warnings swallowed since construction
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_warning_always_emitted() {
        let mut throttle = WarnThrottle::new(10.0);
        assert!(throttle.should_emit(100.0));
    }

    #[test]
    fn test_suppresses_within_interval() {
        let mut throttle = WarnThrottle::new(10.0);
        assert!(throttle.should_emit(0.0));
        assert!(!throttle.should_emit(0.1));
        assert!(!throttle.should_emit(9.9));
        assert!(throttle.should_emit(10.0));
        assert!(!throttle.should_emit(15.0));
        assert_eq!(throttle.suppressed(), 3);
    }

    #[test]
    fn test_backwards_clock_rearms() {
        let mut throttle = WarnThrottle::new(10.0);
        assert!(throttle.should_emit(50.0));
        assert!(throttle.should_emit(1.0));
        assert!(!throttle.should_emit(2.0));
    }
}
