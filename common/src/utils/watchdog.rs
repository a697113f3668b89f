use crate::metrics::Metrics;
use std::sync::Arc;
use tracing::error;

/// Counts consecutive attempts and reports when an optional ceiling is crossed.
/// A ceiling of `None` never triggers.
pub struct Watchdog {
    counter: u64,
    max_counter: Option<u64>,
    metrics: Arc<Metrics>,
}

impl Watchdog {
    pub fn new(max_counter: Option<u64>, metrics: Arc<Metrics>) -> Self {
        Self {
            counter: 0,
            max_counter,
            metrics,
        }
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Returns `true` once the counter went above the ceiling.
    pub fn increment(&mut self) -> bool {
        self.counter += 1;
        match self.max_counter {
            Some(max_counter) if self.counter > max_counter => {
                self.metrics.inc_critical_errors();
                error!(
                    "Watchdog triggered after {} attempts (limit {})",
                    self.counter, max_counter
                );
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlimited_watchdog_never_triggers() {
        let mut watchdog = Watchdog::new(None, Arc::new(Metrics::new()));
        for _ in 0..1000 {
            assert!(!watchdog.increment());
        }
        assert_eq!(watchdog.counter(), 1000);
    }

    #[test]
    fn test_watchdog_triggers_above_limit() {
        let metrics = Arc::new(Metrics::new());
        let mut watchdog = Watchdog::new(Some(2), metrics.clone());
        assert!(!watchdog.increment());
        assert!(!watchdog.increment());
        assert!(watchdog.increment());
        assert_eq!(metrics.critical_errors(), 1);
    }
}
