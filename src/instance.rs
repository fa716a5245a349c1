mod handle;
mod types;

pub use handle::{InstanceHandle, build_start_command, command_line};
pub use types::{InstanceData, InstanceStatus};
