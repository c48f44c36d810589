//! Provisioner - runs the provisioning steps in order.

use std::path::Path;

use chrono::Utc;

use super::types::{ProvisionState, StepId, StepStatus};
use crate::collaborator::Collaborator;
use crate::config::{HostEnv, ProvisionConfig, ResolvedPaths};
use crate::error::{ProvisionError, Result};
use crate::mutator::ConfigMutator;
use crate::tui::TextProgress;
use crate::utils::{is_same_shell, move_file};

pub struct Provisioner<C: Collaborator> {
    config: ProvisionConfig,
    env: HostEnv,
    paths: ResolvedPaths,
    collaborator: C,
    progress: TextProgress,
    state: ProvisionState,
}

impl<C: Collaborator> Provisioner<C> {
    pub fn new(config: ProvisionConfig, env: HostEnv, collaborator: C) -> Self {
        let paths = config.resolve(&env);
        Self {
            config,
            env,
            paths,
            collaborator,
            progress: TextProgress::new(),
            state: ProvisionState::default(),
        }
    }

    #[cfg(test)]
    pub fn with_progress(mut self, progress: TextProgress) -> Self {
        self.progress = progress;
        self
    }

    #[cfg(test)]
    pub fn state(&self) -> &ProvisionState {
        &self.state
    }

    #[cfg(test)]
    pub fn collaborator(&self) -> &C {
        &self.collaborator
    }

    /// Run every step in order, stopping at the first fatal failure.
    pub async fn run(&mut self) -> Result<ProvisionState> {
        tracing::info!("Starting provisioning for {}", self.env.home.display());
        self.progress.banner();

        self.state = ProvisionState::default();
        self.state.started_at = Some(Utc::now());

        for id in StepId::ALL {
            self.state.set_status(id, StepStatus::Running);
            self.progress.started(id);

            let outcome = self.run_step(id).await;
            if let Err(e) = self.finish(id, outcome) {
                self.progress.summary(&self.state);
                return Err(e);
            }
        }

        self.state.completed_at = Some(Utc::now());
        self.progress.summary(&self.state);
        tracing::info!("Provisioning completed");

        Ok(self.state.clone())
    }

    async fn run_step(&self, id: StepId) -> Result<StepStatus> {
        match id {
            StepId::Dependencies => self.install_dependencies().await,
            StepId::Font => self.install_font().await,
            StepId::Framework => self.install_framework().await,
            StepId::Theme => self.install_theme().await,
            StepId::PluginManager => self.configure_plugin_manager(),
            StepId::Plugins => self.install_plugins().await,
            StepId::ConfigFile => self.edit_config(),
            StepId::DefaultShell => self.change_default_shell().await,
            StepId::Relocate => self.relocate(),
        }
    }

    fn finish(&mut self, id: StepId, outcome: Result<StepStatus>) -> Result<()> {
        match outcome {
            Ok(status) => {
                self.progress.finished(id, &status);
                self.state.set_status(id, status);
                Ok(())
            }
            Err(e) => {
                let status = StepStatus::Failed(e.to_string());
                self.progress.finished(id, &status);
                self.state.set_status(id, status);

                if id.is_soft() {
                    tracing::error!("{} failed, continuing: {}", id.name(), e);
                    Ok(())
                } else {
                    tracing::error!("{} failed: {}", id.name(), e);
                    Err(e)
                }
            }
        }
    }

    async fn install_dependencies(&self) -> Result<StepStatus> {
        let packages = &self.config.packages;
        if packages.is_empty() {
            return Ok(StepStatus::Skipped("no packages configured".to_string()));
        }

        tracing::info!("Installing packages: {}", packages.join(" "));
        self.collaborator.install_packages(packages).await?;
        Ok(StepStatus::Done(Some(packages.join(", "))))
    }

    async fn install_font(&self) -> Result<StepStatus> {
        let font = &self.config.font;
        let dir = &self.paths.font_dir;

        if dir.exists() {
            tracing::info!("{} already installed at {}", font.name, dir.display());
            return Ok(StepStatus::Skipped("already installed".to_string()));
        }

        let count = match self.fetch_font(&font.url, dir).await {
            Ok(count) => count,
            Err(e) => {
                // The directory doubles as the installed marker.
                if dir.exists() {
                    if let Err(cleanup) = std::fs::remove_dir_all(dir) {
                        tracing::warn!("Could not remove {}: {}", dir.display(), cleanup);
                    }
                }
                return Err(e);
            }
        };

        tracing::info!("{} installed ({} files)", font.name, count);
        Ok(StepStatus::Done(Some(format!(
            "{} files in {}",
            count,
            dir.display()
        ))))
    }

    async fn fetch_font(&self, url: &str, dir: &Path) -> Result<usize> {
        let count = self.collaborator.fetch_archive(url, dir).await?;
        self.collaborator.refresh_fonts(dir).await?;
        Ok(count)
    }

    async fn install_framework(&self) -> Result<StepStatus> {
        let dir = &self.paths.framework_dir;

        let status = if dir.exists() {
            tracing::info!("oh-my-zsh already installed at {}", dir.display());
            StepStatus::Skipped("already installed".to_string())
        } else {
            self.collaborator
                .install_framework(&self.config.framework.installer_url, dir)
                .await?;
            tracing::info!("oh-my-zsh installed");
            StepStatus::Done(None)
        };

        // Every later edit targets this file.
        if !self.paths.zshrc.exists() {
            return Err(ProvisionError::MissingConfigFile(self.paths.zshrc.clone()));
        }

        Ok(status)
    }

    async fn install_theme(&self) -> Result<StepStatus> {
        let theme = &self.config.theme;
        let dest = self.paths.themes_dir.join(&theme.dir);

        let action = self.collaborator.fetch_repo(&theme.repo, &dest).await?;
        tracing::info!("Theme {} {}", theme.dir, action.as_str());
        Ok(StepStatus::Done(Some(format!(
            "{} {}",
            theme.dir,
            action.as_str()
        ))))
    }

    fn configure_plugin_manager(&self) -> Result<StepStatus> {
        let dir = &self.paths.plugins_dir;
        if dir.is_dir() {
            tracing::info!("Plugin directory {} already exists", dir.display());
            return Ok(StepStatus::Skipped("already configured".to_string()));
        }

        std::fs::create_dir_all(dir).map_err(|e| ProvisionError::io(dir, e))?;
        Ok(StepStatus::Done(Some(dir.display().to_string())))
    }

    async fn install_plugins(&self) -> Result<StepStatus> {
        let external: Vec<(&str, &str)> = self
            .config
            .plugins
            .iter()
            .filter_map(|p| p.repo.as_deref().map(|repo| (p.name.as_str(), repo)))
            .collect();

        if external.is_empty() {
            return Ok(StepStatus::Skipped("no external plugins".to_string()));
        }

        let mut fetched = Vec::with_capacity(external.len());
        for (name, repo) in external {
            let dest = self.paths.plugins_dir.join(name);
            let action = self.collaborator.fetch_repo(repo, &dest).await?;
            tracing::info!("Plugin {} {}", name, action.as_str());
            fetched.push(format!("{} {}", name, action.as_str()));
        }

        Ok(StepStatus::Done(Some(fetched.join(", "))))
    }

    fn edit_config(&self) -> Result<StepStatus> {
        let mutator = ConfigMutator::new(&self.paths.zshrc);
        let rewrites = mutator.apply(&self.config.mutation_rules())?;

        if rewrites == 0 {
            return Ok(StepStatus::Skipped("already up to date".to_string()));
        }
        Ok(StepStatus::Done(Some(format!(
            "{} edit(s) to {}",
            rewrites,
            mutator.path().display()
        ))))
    }

    async fn change_default_shell(&self) -> Result<StepStatus> {
        let target = self.collaborator.locate_shell(&self.config.shell)?;

        if let Some(current) = self.env.login_shell.as_deref() {
            if is_same_shell(current, &target) {
                tracing::info!("Login shell is already {}", current);
                return Ok(StepStatus::Skipped(format!("already {}", current)));
            }
        }

        self.collaborator.change_shell(&target).await?;
        tracing::info!("Login shell set to {}", target.display());
        Ok(StepStatus::Done(Some(format!("set to {}", target.display()))))
    }

    fn relocate(&self) -> Result<StepStatus> {
        let Some((from, to)) = &self.paths.relocate else {
            return Ok(StepStatus::Skipped("not configured".to_string()));
        };

        if from == to {
            return Ok(StepStatus::Skipped("already in place".to_string()));
        }

        if !from.exists() {
            tracing::warn!("{} not found, skipping relocation", from.display());
            return Ok(StepStatus::Skipped(format!("{} not found", from.display())));
        }

        move_file(from, to)?;
        tracing::info!("Moved {} to {}", from.display(), to.display());
        Ok(StepStatus::Done(Some(format!("moved to {}", to.display()))))
    }
}
