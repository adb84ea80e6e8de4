pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, ExportArgs, HealthArgs, LookupArgs, RunArgs};
pub use output::{HealthStatus, OutputFormat, OutputFormatter};
