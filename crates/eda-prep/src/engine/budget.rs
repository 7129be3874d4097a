//! Time budget and cancellation for a single operation.
//!
//! Long scans call [`OperationBudget::tick`] once per row; the deadline and the
//! cancellation flag are only consulted every [`CHECK_INTERVAL`] rows.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use eda_prep::engine::{CancellationToken, OperationBudget};
//!
//! let token = CancellationToken::new();
//! let budget = OperationBudget::new(Duration::from_secs(120), token.clone());
//! assert!(budget.check().is_ok());
//!
//! token.cancel();
//! assert!(budget.check().is_err());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{PrepError, Result};

/// Rows processed between two budget checks.
pub const CHECK_INTERVAL: usize = 1024;

/// Thread-safe cancellation flag shared between the caller and a running
/// operation.
///
/// Clones share the same flag.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(CancellationToken: Send, Sync);

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Callable from any thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can guard another operation.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

/// Deadline plus cancellation guard for one operation.
#[derive(Debug, Clone)]
pub struct OperationBudget {
    started: Instant,
    limit: Duration,
    token: CancellationToken,
}

impl OperationBudget {
    /// Start the clock now.
    pub fn new(limit: Duration, token: CancellationToken) -> Self {
        Self {
            started: Instant::now(),
            limit,
            token,
        }
    }

    /// A budget that never expires and cannot be cancelled from outside.
    pub fn unlimited() -> Self {
        Self::new(Duration::MAX, CancellationToken::new())
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Fail with `Cancelled` or `Timeout` if the budget is spent.
    ///
    /// A zero limit is always spent.
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(PrepError::Cancelled);
        }
        let elapsed = self.elapsed();
        if elapsed >= self.limit {
            return Err(PrepError::Timeout {
                elapsed_ms: elapsed.as_millis(),
                limit_secs: self.limit.as_secs(),
            });
        }
        Ok(())
    }

    /// Per-row hook: checks the budget every [`CHECK_INTERVAL`] rows.
    #[inline]
    pub fn tick(&self, row: usize) -> Result<()> {
        if row % CHECK_INTERVAL == 0 {
            self.check()
        } else {
            Ok(())
        }
    }
}
