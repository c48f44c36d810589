use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ProvisionError, Result};
use crate::mutator::MutationRule;

/// Environment variable that points at an alternative config file.
pub const CONFIG_ENV: &str = "ZSHUP_CONFIG";

/// What to install and how to wire it into the shell configuration file.
///
/// Every field has a default, so an absent or partial `config.yaml`
/// still yields a complete configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    /// System packages installed before anything else
    pub packages: Vec<String>,
    /// Command prefix used to install `packages`
    pub package_command: Vec<String>,
    pub font: FontConfig,
    pub framework: FrameworkConfig,
    /// Shell configuration file edited by the mutator
    pub zshrc: String,
    pub theme: ThemeConfig,
    /// Ordered plugin list; entries with a `repo` are cloned into the custom plugins dir
    pub plugins: Vec<PluginConfig>,
    pub auto_update: AutoUpdateConfig,
    /// Line appended once at the end of the config file
    pub marker: String,
    /// Login shell to switch to (name or absolute path)
    pub shell: String,
    /// File moved from the working directory into the home directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relocate: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontConfig {
    pub name: String,
    pub url: String,
    /// Install directory; its presence marks the font as installed
    pub dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameworkConfig {
    pub dir: String,
    pub installer_url: String,
    /// Defaults to `<dir>/custom`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// Value written into `ZSH_THEME="..."`
    pub value: String,
    pub repo: String,
    /// Directory name under the custom themes dir
    pub dir: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
}

impl PluginConfig {
    pub fn builtin(name: &str) -> Self {
        Self {
            name: name.to_string(),
            repo: None,
        }
    }

    pub fn external(name: &str, repo: &str) -> Self {
        Self {
            name: name.to_string(),
            repo: Some(repo.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoUpdateConfig {
    pub line: String,
    pub anchor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

const FRAMEWORK_SOURCE_LINE: &str = "source $ZSH/oh-my-zsh.sh";

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            packages: ["zsh", "git", "curl", "wget", "unzip", "fontconfig", "fzf"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            package_command: ["sudo", "apt-get", "install", "-y"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            font: FontConfig {
                name: "Meslo Nerd Font".to_string(),
                url: "https://github.com/ryanoasis/nerd-fonts/releases/latest/download/Meslo.zip"
                    .to_string(),
                dir: "~/.local/share/fonts/Meslo".to_string(),
            },
            framework: FrameworkConfig {
                dir: "~/.oh-my-zsh".to_string(),
                installer_url:
                    "https://raw.githubusercontent.com/ohmyzsh/ohmyzsh/master/tools/install.sh"
                        .to_string(),
                custom_dir: None,
            },
            zshrc: "~/.zshrc".to_string(),
            theme: ThemeConfig {
                value: "powerlevel10k/powerlevel10k".to_string(),
                repo: "https://github.com/romkatv/powerlevel10k.git".to_string(),
                dir: "powerlevel10k".to_string(),
            },
            plugins: vec![
                PluginConfig::builtin("git"),
                PluginConfig::builtin("fzf"),
                PluginConfig::external(
                    "zsh-autosuggestions",
                    "https://github.com/zsh-users/zsh-autosuggestions.git",
                ),
                PluginConfig::external(
                    "zsh-syntax-highlighting",
                    "https://github.com/zsh-users/zsh-syntax-highlighting.git",
                ),
                PluginConfig::external(
                    "you-should-use",
                    "https://github.com/MichaelAquilina/zsh-you-should-use.git",
                ),
            ],
            auto_update: AutoUpdateConfig {
                line: "export DISABLE_AUTO_UPDATE=\"true\"".to_string(),
                anchor: FRAMEWORK_SOURCE_LINE.to_string(),
                after: Some("export ZSH=\"$HOME/.oh-my-zsh\"".to_string()),
            },
            marker: "[[ ! -f ~/.p10k.zsh ]] || source ~/.p10k.zsh".to_string(),
            shell: "zsh".to_string(),
            relocate: Some(".p10k.zsh".to_string()),
        }
    }
}

/// Facts about the invoking user, captured once at startup.
#[derive(Debug, Clone)]
pub struct HostEnv {
    pub home: PathBuf,
    pub cwd: PathBuf,
    /// Current login shell (`$SHELL`), if known
    pub login_shell: Option<String>,
}

impl HostEnv {
    pub fn detect() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| ProvisionError::Config("Could not determine home directory".to_string()))?;
        let cwd = std::env::current_dir()?;
        let login_shell = std::env::var("SHELL").ok().filter(|s| !s.is_empty());

        Ok(Self {
            home,
            cwd,
            login_shell,
        })
    }
}

/// Concrete filesystem locations derived from a config and a home directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPaths {
    pub zshrc: PathBuf,
    pub framework_dir: PathBuf,
    pub themes_dir: PathBuf,
    pub plugins_dir: PathBuf,
    pub font_dir: PathBuf,
    /// `(source, destination)` of the relocated file
    pub relocate: Option<(PathBuf, PathBuf)>,
}

/// Expand `~` against `home`; relative paths are taken relative to `home`.
pub fn expand_path(home: &Path, raw: &str) -> PathBuf {
    let expanded = shellexpand::tilde_with_context(raw, || Some(home.to_string_lossy()));
    let path = PathBuf::from(expanded.as_ref());
    if path.is_absolute() {
        path
    } else {
        home.join(path)
    }
}

impl ProvisionConfig {
    pub fn config_path(home: &Path) -> PathBuf {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.is_empty() => expand_path(home, &path),
            _ => home.join(".config").join("zshup").join("config.yaml"),
        }
    }

    /// Load the user config, falling back to defaults when no file exists.
    pub fn load(env: &HostEnv) -> Result<Self> {
        Self::load_from(&Self::config_path(&env.home))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ProvisionError::io(path, e))?;
        let config: ProvisionConfig = serde_yaml::from_str(&content)
            .map_err(|e| ProvisionError::Config(format!("Invalid config {}: {}", path.display(), e)))?;

        config.validate()?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Plugin names end up verbatim inside `plugins=(...)`, so they must be
    /// non-empty single words without parentheses.
    pub fn validate(&self) -> Result<()> {
        for plugin in &self.plugins {
            if plugin.name.is_empty()
                || plugin
                    .name
                    .chars()
                    .any(|c| c.is_whitespace() || c == '(' || c == ')')
            {
                return Err(ProvisionError::Config(format!(
                    "Invalid plugin name '{}'",
                    plugin.name
                )));
            }
        }

        if self.theme.value.trim().is_empty() || self.theme.value.contains('"') {
            return Err(ProvisionError::Config(format!(
                "Invalid theme '{}'",
                self.theme.value
            )));
        }

        if self.auto_update.anchor.is_empty() {
            return Err(ProvisionError::Config(
                "auto_update.anchor must not be empty".to_string(),
            ));
        }

        if self.package_command.is_empty() && !self.packages.is_empty() {
            return Err(ProvisionError::Config(
                "package_command must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins.iter().map(|p| p.name.clone()).collect()
    }

    pub fn resolve(&self, env: &HostEnv) -> ResolvedPaths {
        let home = env.home.as_path();
        let framework_dir = expand_path(home, &self.framework.dir);
        let custom_dir = self
            .framework
            .custom_dir
            .as_deref()
            .map(|dir| expand_path(home, dir))
            .unwrap_or_else(|| framework_dir.join("custom"));

        let relocate = self.relocate.as_deref().map(|name| {
            let file_name = Path::new(name)
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(name));
            (env.cwd.join(name), home.join(file_name))
        });

        ResolvedPaths {
            zshrc: expand_path(home, &self.zshrc),
            themes_dir: custom_dir.join("themes"),
            plugins_dir: custom_dir.join("plugins"),
            font_dir: expand_path(home, &self.font.dir),
            framework_dir,
            relocate,
        }
    }

    /// The ordered edits applied to the config file.
    ///
    /// The plugin rule runs last so that, without an anchor line, the
    /// rendered plugin line ends the file.
    pub fn mutation_rules(&self) -> Vec<MutationRule> {
        vec![
            MutationRule::ReplaceTheme {
                theme: self.theme.value.clone(),
            },
            MutationRule::InsertBefore {
                line: self.auto_update.line.clone(),
                anchor: self.auto_update.anchor.clone(),
                after: self.auto_update.after.clone(),
            },
            MutationRule::AppendOnce {
                line: self.marker.clone(),
            },
            MutationRule::Plugins {
                plugins: self.plugin_names(),
                anchor: FRAMEWORK_SOURCE_LINE.to_string(),
            },
        ]
    }
}
