use console::style;

use crate::provisioner::{ProvisionState, StepId, StepStatus};
use crate::utils::format_duration;

const BANNER: &str = r#"╔═══════════════════════════╗
║  z s h u p                ║
║  one-shot zsh setup       ║
╚═══════════════════════════╝"#;

/// Line-oriented progress output for a provisioning run.
#[derive(Debug, Clone, Copy)]
pub struct TextProgress {
    enabled: bool,
}

impl TextProgress {
    pub fn new() -> Self {
        Self { enabled: true }
    }

    /// Progress that prints nothing.
    #[cfg(test)]
    pub fn silent() -> Self {
        Self { enabled: false }
    }

    pub fn banner(&self) {
        if !self.enabled {
            return;
        }
        println!("{}", style(BANNER).cyan());
        println!();
    }

    pub fn started(&self, id: StepId) {
        if self.enabled {
            println!("  {} {}", style("→").cyan(), style(id.name()).white());
        }
    }

    pub fn finished(&self, id: StepId, status: &StepStatus) {
        if !self.enabled {
            return;
        }
        match status {
            StepStatus::Done(detail) => {
                println!("  {} {}", style("✓").green(), style(id.name()).dim());
                if let Some(detail) = detail {
                    println!("    {}", style(detail).dim().italic());
                }
            }
            StepStatus::Skipped(reason) => {
                println!(
                    "  {} {} {}",
                    style("○").dim(),
                    style(id.name()).dim(),
                    style(format!("({})", reason)).dim()
                );
            }
            StepStatus::Failed(msg) => {
                println!("  {} {}", style("✕").red(), style(id.name()).red());
                println!("    {}", style(msg).red());
            }
            StepStatus::Pending | StepStatus::Running => {}
        }
    }

    pub fn summary(&self, state: &ProvisionState) {
        if !self.enabled {
            return;
        }
        let failed = state.steps.iter().filter(|s| s.status.is_failed()).count();
        let elapsed = format_duration(state.elapsed_secs());

        println!();
        if state.completed() && failed == 0 {
            println!(
                "  {} {} {}",
                style("✓").green().bold(),
                style("Environment ready").white().bold(),
                style(format!("in {}", elapsed)).dim()
            );
            println!("    {}", style("Open a new terminal to start using zsh.").dim());
        } else if state.completed() {
            println!(
                "  {} {} {}",
                style("!").yellow().bold(),
                style(format!("Finished with {} soft failure(s)", failed)).yellow(),
                style(format!("in {}", elapsed)).dim()
            );
        } else {
            println!(
                "  {} {} {}",
                style("✕").red().bold(),
                style("Provisioning aborted").red(),
                style(format!("after {}", elapsed)).dim()
            );
        }
    }
}

impl Default for TextProgress {
    fn default() -> Self {
        Self::new()
    }
}
