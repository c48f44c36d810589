//! Provisioning orchestration.
//!
//! Runs every step strictly in order, each one awaited before the next:
//! packages → font → oh-my-zsh → theme → plugin directories → plugins →
//! config file edits → login shell → prompt config relocation.
//!
//! ## Module structure
//! - `types` - Step ids, per-step status and the overall state
//! - `installer` - Provisioner with the step implementations

mod installer;
mod types;

pub use installer::Provisioner;
pub use types::{ProvisionState, StepId, StepStatus};
