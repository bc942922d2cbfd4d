//! Scoped environment variables for tests.
//!
//! `std::env::set_var` and `remove_var` are `unsafe` in Rust 2024. Hold an
//! [`EnvLock`](crate::EnvLock) for as long as any guard is alive.
//!
//! # Examples
//!
//! ```rust,ignore
//! use test_support::{EnvLock, EnvVarGuard};
//!
//! let _lock = EnvLock::acquire();
//! let _cache = EnvVarGuard::set("BFFGEN_CACHE_PATH", "/tmp/cache");
//! ```
use std::ffi::OsString;

/// Restores one environment variable to its previous state on drop.
#[derive(Debug)]
pub struct EnvVarGuard {
    name: String,
    previous: Option<OsString>,
}

impl EnvVarGuard {
    /// Set `name` to `value` until the guard drops.
    #[must_use]
    pub fn set(name: &str, value: &str) -> Self {
        let previous = std::env::var_os(name);
        // SAFETY: callers hold `EnvLock`, serialising environment mutation.
        unsafe { std::env::set_var(name, value) };
        Self {
            name: name.to_owned(),
            previous,
        }
    }

    /// Unset `name` until the guard drops.
    #[must_use]
    pub fn remove(name: &str) -> Self {
        let previous = std::env::var_os(name);
        // SAFETY: callers hold `EnvLock`, serialising environment mutation.
        unsafe { std::env::remove_var(name) };
        Self {
            name: name.to_owned(),
            previous,
        }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        // SAFETY: the lock is still held while guards drop.
        unsafe {
            match self.previous.take() {
                Some(value) => std::env::set_var(&self.name, value),
                None => std::env::remove_var(&self.name),
            }
        }
    }
}
