use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Technology fingerprinting with local LLM analysis and spreadsheet export
#[derive(Parser, Debug)]
#[command(
    name = "stackprobe",
    about = "Fingerprint a domain's technology stack, analyze it with a local LLM and export to Excel",
    version,
    long_about = "stackprobe queries the BuiltWith API for the technologies a domain uses, \
                  asks a locally running Ollama model for insights, and can export both to \
                  an .xlsx spreadsheet."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only log errors"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Look up a domain, analyze it with Ollama and optionally export to Excel",
        long_about = "Runs the full pipeline: BuiltWith lookup, Ollama analysis and, with \
                      --excel, a spreadsheet export. When exporting, an unavailable model \
                      does not stop the report from being written.\n\n\
                      Examples:\n  \
                      stackprobe run example.com\n  \
                      stackprobe run example.com --excel\n  \
                      stackprobe run example.com --excel --model tinyllama\n  \
                      stackprobe run example.com --excel --output report.xlsx"
    )]
    Run(RunArgs),

    #[command(
        about = "Query BuiltWith only and print the raw response",
        long_about = "Fetches the BuiltWith response for a domain without running the model.\n\n\
                      Examples:\n  \
                      stackprobe lookup example.com\n  \
                      stackprobe lookup example.com --save example.json"
    )]
    Lookup(LookupArgs),

    #[command(
        about = "Write a spreadsheet from a live lookup or a saved response",
        long_about = "Builds the Excel report without generating an analysis. Use --json to \
                      read a response saved with `lookup --save`, and --llm to append existing \
                      analysis text (a file path or literal text).\n\n\
                      Examples:\n  \
                      stackprobe export example.com\n  \
                      stackprobe export --json example.json --output report.xlsx\n  \
                      stackprobe export --json example.json --llm notes.txt"
    )]
    Export(ExportArgs),

    #[command(
        about = "Check API key and Ollama availability",
        long_about = "Reports whether BUILTWITH_API_KEY is configured and whether Ollama is \
                      reachable with the configured model installed.\n\n\
                      Examples:\n  \
                      stackprobe health\n  \
                      stackprobe health --format json"
    )]
    Health(HealthArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[arg(value_name = "DOMAIN", help = "Domain to analyze (e.g. example.com)")]
    pub domain: String,

    #[arg(long, help = "Export results to an Excel file with the analysis appended")]
    pub excel: bool,

    #[arg(
        short = 'm',
        long,
        value_name = "MODEL",
        help = "Ollama model to use (default: llama3 or STACKPROBE_MODEL)"
    )]
    pub model: Option<String>,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Excel output path, used with --excel (default: <domain>_analysis.xlsx)"
    )]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Stream the model response as it is generated")]
    pub stream: bool,

    #[arg(long, help = "Print the raw BuiltWith response")]
    pub show_json: bool,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        long,
        value_name = "SECONDS",
        help = "Model generation timeout in seconds (default: STACKPROBE_LLM_TIMEOUT)"
    )]
    pub timeout: Option<u64>,
}

#[derive(Parser, Debug, Clone)]
pub struct LookupArgs {
    #[arg(value_name = "DOMAIN", help = "Domain to look up")]
    pub domain: String,

    #[arg(
        short = 'o',
        long,
        value_enum,
        default_value = "pretty",
        help = "How to print the response"
    )]
    pub output: JsonStyle,

    #[arg(long, value_name = "FILE", help = "Also save the response to a file")]
    pub save: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct ExportArgs {
    #[arg(
        value_name = "DOMAIN",
        required_unless_present = "json",
        help = "Domain to look up (optional with --json)"
    )]
    pub domain: Option<String>,

    #[arg(long, value_name = "FILE", help = "Saved BuiltWith response to export")]
    pub json: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FILE_OR_TEXT",
        help = "Analysis to append: a file path, or the text itself"
    )]
    pub llm: Option<String>,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Excel output path (default: <domain>_analysis.xlsx)"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct HealthArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

/// Printing style for raw responses
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonStyle {
    Pretty,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_default_run_args() {
        let args = CliArgs::parse_from(["stackprobe", "run", "example.com"]);
        match args.command {
            Commands::Run(run) => {
                assert_eq!(run.domain, "example.com");
                assert!(!run.excel);
                assert!(!run.stream);
                assert!(!run.show_json);
                assert!(run.model.is_none());
                assert!(run.output.is_none());
                assert!(run.timeout.is_none());
                assert_eq!(run.format, OutputFormatArg::Human);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_with_all_options() {
        let args = CliArgs::parse_from([
            "stackprobe",
            "run",
            "example.com",
            "--excel",
            "--model",
            "tinyllama",
            "--output",
            "report.xlsx",
            "--stream",
            "--format",
            "json",
            "--timeout",
            "90",
        ]);
        match args.command {
            Commands::Run(run) => {
                assert!(run.excel);
                assert_eq!(run.model.as_deref(), Some("tinyllama"));
                assert_eq!(run.output, Some(PathBuf::from("report.xlsx")));
                assert!(run.stream);
                assert_eq!(run.format, OutputFormatArg::Json);
                assert_eq!(run.timeout, Some(90));
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_requires_domain() {
        assert!(CliArgs::try_parse_from(["stackprobe", "run"]).is_err());
    }

    #[test]
    fn test_lookup_args() {
        let args = CliArgs::parse_from([
            "stackprobe",
            "lookup",
            "example.com",
            "--output",
            "json",
            "--save",
            "out.json",
        ]);
        match args.command {
            Commands::Lookup(lookup) => {
                assert_eq!(lookup.output, JsonStyle::Json);
                assert_eq!(lookup.save, Some(PathBuf::from("out.json")));
            }
            _ => panic!("Expected Lookup command"),
        }
    }

    #[test]
    fn test_export_needs_domain_or_json() {
        assert!(CliArgs::try_parse_from(["stackprobe", "export"]).is_err());

        let args = CliArgs::parse_from(["stackprobe", "export", "--json", "saved.json"]);
        match args.command {
            Commands::Export(export) => {
                assert!(export.domain.is_none());
                assert_eq!(export.json, Some(PathBuf::from("saved.json")));
            }
            _ => panic!("Expected Export command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let args = CliArgs::parse_from(["stackprobe", "health", "--log-level", "debug", "-v"]);
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.verbose);
        assert!(!args.quiet);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(CliArgs::try_parse_from(["stackprobe", "health", "-q", "-v"]).is_err());
    }

    #[test]
    fn test_format_conversion() {
        use crate::cli::output::OutputFormat;
        assert_eq!(OutputFormat::from(OutputFormatArg::Yaml), OutputFormat::Yaml);
        assert_eq!(OutputFormat::from(OutputFormatArg::Human), OutputFormat::Human);
    }
}
