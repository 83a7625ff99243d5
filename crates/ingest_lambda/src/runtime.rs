use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::OnceCell;

/// Process-wide cold-start marker.
///
/// Stays set until a unit completes, so a failed first unit leaves its
/// redelivery stamped cold. Exactly one completion ever clears it.
#[derive(Debug)]
pub struct ColdStart(AtomicBool);

impl ColdStart {
    pub fn new() -> Self {
        Self(AtomicBool::new(true))
    }

    pub fn is_cold(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Marks the process warm. Returns `true` only for the call that flipped it.
    pub fn clear(&self) -> bool {
        self.0
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for ColdStart {
    fn default() -> Self {
        Self::new()
    }
}

/// State shared across invocations served by one process instance.
#[derive(Debug)]
pub struct RuntimeState<C> {
    cold_start: ColdStart,
    client: OnceCell<C>,
}

impl<C> RuntimeState<C> {
    pub fn new() -> Self {
        Self {
            cold_start: ColdStart::new(),
            client: OnceCell::new(),
        }
    }

    pub fn cold_start(&self) -> &ColdStart {
        &self.cold_start
    }

    /// Returns the shared client, running `init` at most once per process even
    /// when invocations race on the first call.
    pub async fn client_or_init<F, Fut>(&self, init: F) -> &C
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = C>,
    {
        self.client.get_or_init(init).await
    }
}

impl<C> Default for RuntimeState<C> {
    fn default() -> Self {
        Self::new()
    }
}
