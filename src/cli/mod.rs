use clap::Parser;

use crate::collaborator::SystemCollaborator;
use crate::config::{HostEnv, ProvisionConfig};
use crate::error::Result;
use crate::provisioner::Provisioner;

#[derive(Parser)]
#[command(name = "zshup")]
#[command(version)]
#[command(about = "One-shot zsh environment setup")]
#[command(long_about = "Installs zsh, a Nerd Font, oh-my-zsh, powerlevel10k and plugins, wires them into ~/.zshrc and makes zsh the login shell.\n\nSafe to re-run: finished steps are skipped and config edits are never duplicated.\n\nOptional settings are read from ~/.config/zshup/config.yaml (or $ZSHUP_CONFIG).")]
pub struct Cli {}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let env = HostEnv::detect()?;
        let config = ProvisionConfig::load(&env)?;
        let collaborator = SystemCollaborator::new(config.package_command.clone())?;

        Provisioner::new(config, env, collaborator).run().await?;
        Ok(())
    }
}
