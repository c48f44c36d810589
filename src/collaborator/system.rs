//! Collaborator backed by the real system: apt, git, HTTP downloads and chsh.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::archive::{self, ArchiveKind};
use super::{Collaborator, RepoFetch};
use crate::error::{ProvisionError, Result};

pub struct SystemCollaborator {
    http: reqwest::Client,
    package_command: Vec<String>,
}

impl SystemCollaborator {
    pub fn new(package_command: Vec<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("zshup/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            package_command,
        })
    }

    /// Download `url` into a temporary file that is removed when dropped.
    pub async fn download(&self, url: &str, suffix: &str) -> Result<tempfile::NamedTempFile> {
        tracing::debug!("Downloading {}", url);
        let response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProvisionError::Download {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        let mut file = tempfile::Builder::new()
            .prefix("zshup-")
            .suffix(suffix)
            .tempfile()?;
        file.write_all(&bytes)?;
        file.flush()?;

        tracing::debug!("Downloaded {} bytes to {}", bytes.len(), file.path().display());
        Ok(file)
    }

    /// Run a command with captured output, failing on a non-zero exit.
    async fn run_command(&self, program: &str, args: &[String]) -> Result<String> {
        self.run_command_with_env(program, args, &[]).await
    }

    async fn run_command_with_env(
        &self,
        program: &str,
        args: &[String],
        envs: &[(&str, String)],
    ) -> Result<String> {
        tracing::debug!("Running {} {}", program, args.join(" "));

        let output = Command::new(program)
            .args(args)
            .envs(envs.iter().map(|(k, v)| (*k, v.as_str())))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ProvisionError::command(program, e.to_string()))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                output.status.to_string()
            } else {
                stderr
            };
            Err(ProvisionError::command(program, message))
        }
    }

    /// Run a command attached to the terminal, for steps that may prompt for a password.
    async fn run_interactive(&self, program: &str, args: &[String]) -> Result<()> {
        tracing::debug!("Running {} {}", program, args.join(" "));

        let status = Command::new(program)
            .args(args)
            .status()
            .await
            .map_err(|e| ProvisionError::command(program, e.to_string()))?;

        if status.success() {
            Ok(())
        } else {
            Err(ProvisionError::command(program, status.to_string()))
        }
    }
}

#[async_trait]
impl Collaborator for SystemCollaborator {
    async fn install_packages(&self, names: &[String]) -> Result<()> {
        let Some((program, prefix)) = self.package_command.split_first() else {
            return Err(ProvisionError::Config(
                "package_command must not be empty".to_string(),
            ));
        };

        let mut args = prefix.to_vec();
        args.extend(names.iter().cloned());
        self.run_interactive(program, &args).await
    }

    async fn fetch_archive(&self, url: &str, dest: &Path) -> Result<usize> {
        let kind = ArchiveKind::from_url(url)?;
        let download = self.download(url, kind.suffix()).await?;
        let staging = tempfile::tempdir()?;

        let (program, args) = kind.extract_command(download.path(), staging.path());
        self.run_command(program, &args).await?;

        let count = archive::install_fonts(staging.path(), dest)?;
        if count == 0 {
            return Err(anyhow::anyhow!("no font files found in {}", url).into());
        }
        Ok(count)
    }

    async fn refresh_fonts(&self, dir: &Path) -> Result<()> {
        self.run_command("fc-cache", &["-f".to_string(), dir.display().to_string()])
            .await
            .map(|_| ())
    }

    async fn fetch_repo(&self, url: &str, dest: &Path) -> Result<RepoFetch> {
        if dest.exists() {
            let args = vec![
                "-C".to_string(),
                dest.display().to_string(),
                "pull".to_string(),
                "--ff-only".to_string(),
            ];
            self.run_command("git", &args).await?;
            return Ok(RepoFetch::Updated);
        }

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ProvisionError::io(parent, e))?;
        }

        let args = vec![
            "clone".to_string(),
            "--depth".to_string(),
            "1".to_string(),
            url.to_string(),
            dest.display().to_string(),
        ];
        self.run_command("git", &args).await?;
        Ok(RepoFetch::Cloned)
    }

    async fn install_framework(&self, installer_url: &str, dir: &Path) -> Result<()> {
        let script = self.download(installer_url, ".sh").await?;
        let args = vec![
            script.path().display().to_string(),
            "--unattended".to_string(),
        ];
        let envs = [
            ("ZSH", dir.display().to_string()),
            ("RUNZSH", "no".to_string()),
            ("CHSH", "no".to_string()),
            ("KEEP_ZSHRC", "yes".to_string()),
        ];
        self.run_command_with_env("sh", &args, &envs).await.map(|_| ())
    }

    fn locate_shell(&self, name: &str) -> Result<PathBuf> {
        which::which(name).map_err(|source| ProvisionError::ShellNotFound {
            name: name.to_string(),
            source,
        })
    }

    async fn change_shell(&self, shell: &Path) -> Result<()> {
        let args = vec!["-s".to_string(), shell.display().to_string()];
        self.run_interactive("chsh", &args).await
    }
}
