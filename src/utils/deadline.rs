//! Cooperative time budget for one decode call

use crate::error::BarcodeError;
use std::time::{Duration, Instant};

/// Result of a deadline check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// Keep going
    Continue,
    /// The budget is spent; the call must abort
    DeadlineExceeded,
}

/// Start time plus optional budget, checked at loop boundaries
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Option<Duration>,
}

impl Deadline {
    /// Start the clock now
    pub fn start(budget: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    /// Compare elapsed time against the budget; a zero budget is always exceeded
    pub fn status(&self) -> ScanStatus {
        match self.budget {
            Some(budget) if self.started.elapsed() >= budget => ScanStatus::DeadlineExceeded,
            _ => ScanStatus::Continue,
        }
    }

    /// `status()` mapped onto the crate error
    pub fn check(&self) -> Result<(), BarcodeError> {
        match self.status() {
            ScanStatus::Continue => Ok(()),
            ScanStatus::DeadlineExceeded => Err(BarcodeError::Timeout {
                elapsed_ms: self.started.elapsed().as_millis(),
                budget_ms: self.budget.map_or(0, |b| b.as_millis()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_never_expires() {
        let deadline = Deadline::start(None);
        assert_eq!(deadline.status(), ScanStatus::Continue);
        assert!(deadline.check().is_ok());
    }

    #[test]
    fn test_zero_budget_expires_immediately() {
        let deadline = Deadline::start(Some(Duration::ZERO));
        assert_eq!(deadline.status(), ScanStatus::DeadlineExceeded);
        assert!(deadline.check().unwrap_err().is_timeout());
    }

    #[test]
    fn test_generous_budget() {
        let deadline = Deadline::start(Some(Duration::from_secs(3600)));
        assert_eq!(deadline.status(), ScanStatus::Continue);
    }
}
