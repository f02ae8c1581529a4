// Single-flight guard for login and refresh

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::ApiError;

/// Ensures at most one instance of an operation runs at a time.
///
/// Callers that arrive while an operation is in flight wait for it and then
/// observe its outcome instead of starting their own: on success they see
/// the satisfied state, on failure they receive the same error.
#[derive(Default)]
pub struct SingleFlight {
    /// Number of completed flights
    generation: AtomicU64,

    /// Held for the duration of a flight; stores the last failure
    gate: Mutex<Option<Arc<ApiError>>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `op` unless `satisfied()` already holds.
    ///
    /// `satisfied` is checked before waiting and again after acquiring the
    /// gate, so an operation completed by another caller is never repeated.
    pub async fn run<S, F, Fut>(&self, satisfied: S, op: F) -> Result<(), ApiError>
    where
        S: Fn() -> bool,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), ApiError>>,
    {
        if satisfied() {
            return Ok(());
        }

        let observed = self.generation.load(Ordering::Acquire);
        let mut last_failure = self.gate.lock().await;

        if self.generation.load(Ordering::Acquire) != observed {
            // A flight finished while we were waiting; share its outcome
            if let Some(err) = last_failure.as_ref() {
                return Err(ApiError::Shared(Arc::clone(err)));
            }
        }

        if satisfied() {
            return Ok(());
        }

        let outcome = op().await;
        let result = match outcome {
            Ok(()) => {
                *last_failure = None;
                Ok(())
            }
            Err(err) => {
                let err = Arc::new(err);
                *last_failure = Some(Arc::clone(&err));
                Err(ApiError::Shared(err))
            }
        };
        self.generation.fetch_add(1, Ordering::AcqRel);

        result
    }

    /// Number of flights that have run to completion
    pub fn completed_flights(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}
