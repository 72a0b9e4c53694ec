//! Shared helpers for the integration suites.

use std::sync::{Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;

// The timeout override is process-wide environment state, so suites that
// resolve timeouts serialize on this lock.
static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub fn serialized() -> MutexGuard<'static, ()> {
    init_tracing();
    ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
