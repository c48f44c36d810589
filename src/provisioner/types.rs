//! Core types for provisioning progress.

use chrono::{DateTime, Utc};

/// Status of a single provisioning step
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StepStatus {
    /// Not yet started
    #[default]
    Pending,
    /// Currently running
    Running,
    /// Completed, with an optional detail for the summary
    Done(Option<String>),
    /// Nothing to do (already satisfied or not configured)
    Skipped(String),
    /// Failed; fatal unless the step is soft
    Failed(String),
}

impl StepStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, StepStatus::Failed(_))
    }
}

/// Steps in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepId {
    Dependencies,
    Font,
    Framework,
    Theme,
    PluginManager,
    Plugins,
    ConfigFile,
    DefaultShell,
    Relocate,
}

impl StepId {
    pub const ALL: [StepId; 9] = [
        StepId::Dependencies,
        StepId::Font,
        StepId::Framework,
        StepId::Theme,
        StepId::PluginManager,
        StepId::Plugins,
        StepId::ConfigFile,
        StepId::DefaultShell,
        StepId::Relocate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StepId::Dependencies => "System packages",
            StepId::Font => "Font",
            StepId::Framework => "oh-my-zsh",
            StepId::Theme => "Theme",
            StepId::PluginManager => "Plugin directories",
            StepId::Plugins => "Plugins",
            StepId::ConfigFile => "Shell config",
            StepId::DefaultShell => "Login shell",
            StepId::Relocate => "Prompt config",
        }
    }

    /// A failure of a soft step is reported but does not stop the run.
    pub fn is_soft(&self) -> bool {
        matches!(self, StepId::Font)
    }
}

#[derive(Debug, Clone)]
pub struct Step {
    pub id: StepId,
    pub status: StepStatus,
}

/// Overall provisioning state
#[derive(Debug, Clone)]
pub struct ProvisionState {
    pub steps: Vec<Step>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Default for ProvisionState {
    fn default() -> Self {
        Self {
            steps: StepId::ALL
                .iter()
                .map(|&id| Step {
                    id,
                    status: StepStatus::Pending,
                })
                .collect(),
            started_at: None,
            completed_at: None,
        }
    }
}

impl ProvisionState {
    #[cfg(test)]
    pub fn status(&self, id: StepId) -> &StepStatus {
        self.steps
            .iter()
            .find(|s| s.id == id)
            .map(|s| &s.status)
            .unwrap_or(&StepStatus::Pending)
    }

    pub fn set_status(&mut self, id: StepId, status: StepStatus) {
        if let Some(step) = self.steps.iter_mut().find(|s| s.id == id) {
            step.status = status;
        }
    }

    pub fn completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn elapsed_secs(&self) -> i64 {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => (end - start).num_seconds(),
            (Some(start), None) => (Utc::now() - start).num_seconds(),
            _ => 0,
        }
    }
}
