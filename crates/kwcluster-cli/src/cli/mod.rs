pub mod args;
pub mod config;
pub mod output;
pub mod tracing_setup;

pub use args::FilterArgs;
pub use config::CliConfig;
pub use output::{drain_notifications, format_fetch_stats, print_json};
pub use tracing_setup::init_tracing;
