pub mod blogger;
pub mod cli;
pub mod load_config;
pub mod local_storage;

pub use cli::{run, run_with_cancel, Cli, Commands};
