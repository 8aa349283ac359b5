mod handle;
mod launcher;
mod manager;
#[cfg(test)]
pub(crate) mod testing;

pub use handle::{KillSwitch, ProcessError, ProcessEvent, ProcessHandle};
pub use launcher::{CliLauncher, LaunchedProcess, ProcessLauncher};
pub use manager::ProcessManager;
