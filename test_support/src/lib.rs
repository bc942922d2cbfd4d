//! Test utilities shared by the integration tests.
//!
//! Provides model fixtures written into temporary directories, guards that
//! serialise `BFFGEN_*` environment mutations, and a runner for the built
//! `bffgen` binary.

pub mod bffgen;
pub mod env_lock;
pub mod env_var_guard;
pub mod model;

pub use env_lock::EnvLock;
pub use env_var_guard::EnvVarGuard;
