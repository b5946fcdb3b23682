//! Input targeting: which configuration governs an input, and which
//! modules and paths it selects.

pub mod controlling;
pub mod module;

pub use controlling::{
    terminate_at_controlling_workspace, terminate_at_v1_module, BucketTargeting, ControllingConfig,
    ControllingWorkspace, TerminateFn,
};
pub use module::ModuleTargeting;
