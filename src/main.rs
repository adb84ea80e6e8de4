use stackprobe::cli::commands::{CliArgs, Commands};
use stackprobe::cli::handlers::{
    handle_export, handle_health, handle_lookup, handle_run, EXIT_USAGE,
};
use stackprobe::util::logging::{init_logging, parse_level, LoggingConfig};
use stackprobe::{StackprobeConfig, NAME, VERSION};

use clap::Parser;
use tracing::{debug, error, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    // .env files may set the log level, so configuration loads first
    let config = StackprobeConfig::load();
    init_logging_from_args(&args, config.as_ref().ok());

    debug!("{} v{} starting", NAME, VERSION);
    debug!("Arguments: {:?}", args);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("Configuration error: {}", e);
            std::process::exit(EXIT_USAGE);
        }
    };
    debug!("{:?}", config);

    let exit_code = match &args.command {
        Commands::Run(run_args) => handle_run(run_args, &config, args.quiet).await,
        Commands::Lookup(lookup_args) => handle_lookup(lookup_args, &config).await,
        Commands::Export(export_args) => handle_export(export_args, &config).await,
        Commands::Health(health_args) => handle_health(health_args, &config).await,
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs, config: Option<&StackprobeConfig>) {
    let level = if let Some(level_str) = &args.log_level {
        parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        config
            .map(|c| parse_level(&c.log_level))
            .unwrap_or(Level::INFO)
    };

    init_logging(LoggingConfig::from_env_with_level(level));
}
