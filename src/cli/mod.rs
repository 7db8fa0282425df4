pub mod commands;
pub mod context;
pub mod identify;
pub mod indicators;
pub mod lookup;
pub mod providers;
pub mod render;
pub mod watch;

pub use commands::{Cli, Commands};
