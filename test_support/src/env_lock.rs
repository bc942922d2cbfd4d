//! Serialise environment mutations across tests.
//!
//! Configuration merging reads `BFFGEN_*` variables from the process
//! environment, so tests that set them must not overlap.

use std::fmt;
use std::sync::{Mutex, MutexGuard};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// RAII guard holding the global environment lock.
pub struct EnvLock {
    _guard: MutexGuard<'static, ()>,
}

impl fmt::Debug for EnvLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EnvLock")
    }
}

impl EnvLock {
    /// Block until no other test holds the lock.
    ///
    /// A poisoned lock is recovered: a panicking test has already restored
    /// its variables through [`crate::EnvVarGuard`].
    pub fn acquire() -> Self {
        let guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Self { _guard: guard }
    }
}
