//! Recording collaborator for orchestration tests.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Collaborator, RepoFetch};
use crate::error::{ProvisionError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    InstallPackages(Vec<String>),
    FetchArchive(String, PathBuf),
    RefreshFonts(PathBuf),
    FetchRepo(String, PathBuf, RepoFetch),
    InstallFramework(String, PathBuf),
    ChangeShell(PathBuf),
}

/// Fake that records every call and simulates the side effects the
/// provisioner checks for (directories and the config file).
pub struct FakeCollaborator {
    calls: Mutex<Vec<Call>>,
    /// Content of the config file written by the framework installer; `None` writes nothing
    pub zshrc_template: Option<String>,
    pub zshrc_path: PathBuf,
    pub shell_path: PathBuf,
    pub fail_packages: bool,
    pub fail_font: bool,
    /// Fail the font fetch after the font directory was already written
    pub fail_font_partway: bool,
    pub fail_repo: bool,
}

impl FakeCollaborator {
    pub fn new(zshrc_path: impl Into<PathBuf>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            zshrc_template: Some(DEFAULT_TEMPLATE.to_string()),
            zshrc_path: zshrc_path.into(),
            shell_path: PathBuf::from("/usr/bin/zsh"),
            fail_packages: false,
            fail_font: false,
            fail_font_partway: false,
            fail_repo: false,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

pub const DEFAULT_TEMPLATE: &str = r#"# Path to your oh-my-zsh installation.
export ZSH="$HOME/.oh-my-zsh"

ZSH_THEME="robbyrussell"

plugins=(git)

source $ZSH/oh-my-zsh.sh
"#;

#[async_trait]
impl Collaborator for FakeCollaborator {
    async fn install_packages(&self, names: &[String]) -> Result<()> {
        self.record(Call::InstallPackages(names.to_vec()));
        if self.fail_packages {
            return Err(ProvisionError::command("apt-get", "exit status: 100"));
        }
        Ok(())
    }

    async fn fetch_archive(&self, url: &str, dest: &Path) -> Result<usize> {
        self.record(Call::FetchArchive(url.to_string(), dest.to_path_buf()));
        if self.fail_font {
            return Err(ProvisionError::Download {
                url: url.to_string(),
                status: 503,
            });
        }
        std::fs::create_dir_all(dest)?;
        std::fs::write(dest.join("Regular.ttf"), b"font")?;
        if self.fail_font_partway {
            return Err(ProvisionError::io(
                dest.join("Bold.ttf"),
                std::io::Error::other("no space left on device"),
            ));
        }
        Ok(1)
    }

    async fn refresh_fonts(&self, dir: &Path) -> Result<()> {
        self.record(Call::RefreshFonts(dir.to_path_buf()));
        Ok(())
    }

    async fn fetch_repo(&self, url: &str, dest: &Path) -> Result<RepoFetch> {
        let action = if dest.exists() {
            RepoFetch::Updated
        } else {
            RepoFetch::Cloned
        };
        self.record(Call::FetchRepo(url.to_string(), dest.to_path_buf(), action));
        if self.fail_repo {
            return Err(ProvisionError::command("git", "could not resolve host"));
        }
        std::fs::create_dir_all(dest)?;
        Ok(action)
    }

    async fn install_framework(&self, installer_url: &str, dir: &Path) -> Result<()> {
        self.record(Call::InstallFramework(
            installer_url.to_string(),
            dir.to_path_buf(),
        ));
        std::fs::create_dir_all(dir)?;
        if let Some(template) = &self.zshrc_template {
            std::fs::write(&self.zshrc_path, template)?;
        }
        Ok(())
    }

    fn locate_shell(&self, _name: &str) -> Result<PathBuf> {
        Ok(self.shell_path.clone())
    }

    async fn change_shell(&self, shell: &Path) -> Result<()> {
        self.record(Call::ChangeShell(shell.to_path_buf()));
        Ok(())
    }
}
