//! Content-derived identities for command steps.
//!
//! A command step is named after a SHA-256 digest of its disambiguator and
//! every output and byproduct path it declares. Two units declaring the same
//! generated file therefore produce steps with the same name, and
//! [`CommandDeduplicator`] keeps a single physical copy of them.
//!
//! # Examples
//!
//! ```
//! use bffgen::hasher::CommandDeduplicator;
//!
//! let mut dedup = CommandDeduplicator::new();
//! let first = dedup.identity("", &["gen/a.h".into()]).expect("identity");
//! let again = dedup.identity("", &["gen/a.h".into()]).expect("identity");
//! assert_eq!(first, again);
//! assert!(first.starts_with("cc-"));
//! ```

use std::collections::{HashMap, HashSet};

use sha2::{Digest, Sha256};

use crate::ir::{BuildUnit, IrGenError};

/// Number of hex digits kept from a digest.
pub const SHORT_HASH_LEN: usize = 7;

/// Full lowercase hex SHA-256 digest of `text`.
#[must_use]
pub fn digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// First [`SHORT_HASH_LEN`] hex digits of the SHA-256 digest of `text`.
///
/// # Examples
///
/// ```
/// assert_eq!(bffgen::hasher::short_hash(""), "e3b0c44");
/// ```
#[must_use]
pub fn short_hash(text: &str) -> String {
    let mut full = digest(text);
    full.truncate(SHORT_HASH_LEN);
    full
}

/// Hash key for a step: the disambiguator followed by `-path` per path.
#[must_use]
pub fn step_key(disambiguator: &str, paths: &[String]) -> String {
    let mut key = String::from(disambiguator);
    for path in paths {
        key.push('-');
        key.push_str(path);
    }
    key
}

/// Step name derived from a hash key.
#[must_use]
pub fn step_name(key: &str) -> String {
    format!("cc-{}", short_hash(key))
}

/// Identity table for one generation pass.
///
/// Names are handed out by [`identity`](Self::identity) while units are
/// assembled, and [`retain_first`](Self::retain_first) drops later copies of a
/// step once the units are in their final order.
#[derive(Debug, Default)]
pub struct CommandDeduplicator {
    names: HashMap<String, String>,
    emitted: HashSet<String>,
}

impl CommandDeduplicator {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the step declaring `paths` under `disambiguator`.
    ///
    /// # Errors
    ///
    /// Returns [`IrGenError::IdentityCollision`] when the name was already
    /// issued for a different key.
    pub fn identity(&mut self, disambiguator: &str, paths: &[String]) -> Result<String, IrGenError> {
        self.register_key(&step_key(disambiguator, paths))
    }

    /// Name the step with hash key `key`.
    ///
    /// # Errors
    ///
    /// Returns [`IrGenError::IdentityCollision`] when the name was already
    /// issued for a different key.
    pub fn register_key(&mut self, key: &str) -> Result<String, IrGenError> {
        let name = step_name(key);
        match self.names.get(&name) {
            Some(existing) if existing != key => Err(IrGenError::IdentityCollision {
                name,
                existing: existing.clone(),
                incoming: key.to_owned(),
            }),
            Some(_) => Ok(name),
            None => {
                self.names.insert(name.clone(), key.to_owned());
                Ok(name)
            }
        }
    }

    /// Keep only the first copy of each custom command across `units`.
    ///
    /// Units must already be in emission order. A unit losing its copy records
    /// the name in [`BuildUnit::referenced_steps`].
    pub fn retain_first(&mut self, units: &mut [BuildUnit]) {
        for unit in units.iter_mut() {
            let mut dropped = Vec::new();
            unit.commands.retain(|step| {
                if self.emitted.insert(step.name.clone()) {
                    true
                } else {
                    dropped.push(step.name.clone());
                    false
                }
            });
            for name in dropped {
                tracing::debug!(unit = %unit.name, step = %name, "dropping duplicate command step");
                unit.referenced_steps.insert(name);
            }
        }
    }

    /// Number of distinct names issued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Return `true` when no name has been issued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Forget every issued name and emitted step.
    pub fn clear(&mut self) {
        self.names.clear();
        self.emitted.clear();
    }
}
