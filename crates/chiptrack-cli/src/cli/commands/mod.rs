//! CLI command handlers. Each command is in its own file.

mod devices;
mod fetch;
mod play;
mod probe;

pub use devices::run_devices;
pub use fetch::run_fetch;
pub use play::{run_play, PlayOptions};
pub use probe::run_probe;
#[cfg(test)]
pub(crate) use probe::describe_probe;
