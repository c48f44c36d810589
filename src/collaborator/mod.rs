//! External collaborators invoked by the provisioner.
//!
//! Everything that touches the network, the package manager or the user
//! account goes through the [`Collaborator`] trait, so orchestration can be
//! exercised against a fake.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   Provisioner   │  ← Decides what runs and in which order
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ dyn Collaborator│  ← install / fetch / extract / chsh
//! └────────┬────────┘
//!          │
//!    ┌─────┴─────┐
//!    ▼           ▼
//! ┌──────┐   ┌──────┐
//! │System│   │ Fake │  ← Real shell-outs / recorded calls in tests
//! └──────┘   └──────┘
//! ```

pub mod archive;
#[cfg(test)]
pub mod fake;
pub mod system;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

pub use system::SystemCollaborator;

use crate::error::Result;

/// What a repository fetch did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoFetch {
    /// The destination did not exist and was cloned
    Cloned,
    /// The destination existed and was updated in place
    Updated,
}

impl RepoFetch {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepoFetch::Cloned => "cloned",
            RepoFetch::Updated => "updated",
        }
    }
}

#[async_trait]
pub trait Collaborator: Send + Sync {
    /// Install system packages by name.
    async fn install_packages(&self, names: &[String]) -> Result<()>;

    /// Download `url` to a temporary file and extract recognized font files into `dest`.
    ///
    /// Returns the number of files extracted.
    async fn fetch_archive(&self, url: &str, dest: &Path) -> Result<usize>;

    /// Rebuild the font cache for `dir`.
    async fn refresh_fonts(&self, dir: &Path) -> Result<()>;

    /// Clone `url` into `dest`, or update `dest` in place when it already exists.
    async fn fetch_repo(&self, url: &str, dest: &Path) -> Result<RepoFetch>;

    /// Run the shell framework's unattended installer targeting `dir`.
    async fn install_framework(&self, installer_url: &str, dir: &Path) -> Result<()>;

    /// Resolve a shell name (or absolute path) to an executable path.
    fn locate_shell(&self, name: &str) -> Result<PathBuf>;

    /// Set the invoking user's login shell.
    async fn change_shell(&self, shell: &Path) -> Result<()>;
}
