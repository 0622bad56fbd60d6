//! CLI command handlers. Each command is in its own file.

mod get;
mod info;
mod session;

pub use get::run_get;
pub use info::run_info;
