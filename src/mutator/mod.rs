//! Idempotent edits to the shell configuration file.
//!
//! The file is treated as opaque text. Each [`MutationRule`] is applied in
//! order: the current content is read, rewritten in memory, and written
//! back before the next rule runs. Rules that find the file already in
//! their target state cause no write.
//!
//! ```text
//! read ──► rule.rewrite() ──► Some(new) ──► write
//!                        └──► None ──────► skip
//! ```

mod rules;

use std::path::{Path, PathBuf};

pub use rules::MutationRule;

use crate::error::{ProvisionError, Result};

/// Applies mutation rules to one configuration file on disk.
pub struct ConfigMutator {
    path: PathBuf,
}

impl ConfigMutator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `rules` in order and return how many of them rewrote the file.
    ///
    /// Fails with [`ProvisionError::MissingConfigFile`] when the file does not
    /// exist. Any read or write error is returned as is; the file is not
    /// restored.
    pub fn apply(&self, rules: &[MutationRule]) -> Result<usize> {
        if !self.path.exists() {
            return Err(ProvisionError::MissingConfigFile(self.path.clone()));
        }

        let mut rewrites = 0;
        for rule in rules {
            if self.apply_one(rule)? {
                rewrites += 1;
            }
        }
        Ok(rewrites)
    }

    fn apply_one(&self, rule: &MutationRule) -> Result<bool> {
        let current = std::fs::read_to_string(&self.path)
            .map_err(|e| ProvisionError::io(&self.path, e))?;

        match rule.rewrite(&current) {
            Some(updated) => {
                std::fs::write(&self.path, updated)
                    .map_err(|e| ProvisionError::io(&self.path, e))?;
                tracing::info!("Updated {} in {}", rule, self.path.display());
                Ok(true)
            }
            None => {
                tracing::info!("{} already configured, skipping", rule);
                Ok(false)
            }
        }
    }
}
