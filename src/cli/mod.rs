//! Command-line interface for search-lab
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and argument overrides
//! - Subcommand selection

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::{Config, LogLevel};
use crate::error::Result;

/// Search lab backend for MongoDB Atlas Search exercises
#[derive(Parser, Debug)]
#[command(
    name = "search-lab",
    version,
    about = "Query backend for an interactive MongoDB Atlas Search lab",
    long_about = "Serves the search lab front-end and runs the queries learners type \
against a MongoDB Atlas cluster. Queries are parsed as literals, never evaluated."
)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Quiet mode (errors only)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv", global = true)]
    pub very_verbose: bool,

    /// Disable colored output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Database to query
    #[arg(long, value_name = "NAME", global = true)]
    pub database: Option<String>,

    /// Connection timeout in seconds
    #[arg(long, value_name = "SECONDS", global = true)]
    pub timeout: Option<u64>,

    /// Subcommands; defaults to `serve`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands for search-lab
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to bind
        #[arg(long, value_name = "HOST")]
        host: Option<String>,

        /// Port to listen on
        #[arg(short = 'p', long, value_name = "PORT")]
        port: Option<u16>,

        /// Directory with the built front-end
        #[arg(long, value_name = "DIR")]
        static_dir: Option<PathBuf>,
    },

    /// Print the Atlas Search index definitions, or create them
    Indexes {
        /// Create the indexes on the configured cluster
        #[arg(long)]
        apply: bool,
    },

    /// Run exercises against a running server
    Exercise {
        /// Exercise definitions (TOML)
        #[arg(short = 'f', long, value_name = "FILE")]
        file: PathBuf,

        /// Exercise title or 1-based position; all exercises when omitted
        #[arg(short = 'n', long, value_name = "NAME")]
        name: Option<String>,

        /// Query to submit instead of the exercise's initial query
        #[arg(long, value_name = "QUERY", requires = "name")]
        query: Option<String>,

        /// Print the solution after each exercise
        #[arg(long)]
        show_solution: bool,

        /// Server base URL [default: http://localhost:<server.port>]
        #[arg(long, value_name = "URL")]
        server: Option<String>,
    },

    /// Show version information
    Version,
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Loaded configuration
    config: Config,
}

impl CliInterface {
    /// Parse process arguments and load configuration
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    /// Load configuration for already parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let mut config = Config::load(args.config_file.as_deref())?;
        Self::apply_args_to_config(&mut config, &args);
        config.validate()?;
        Ok(Self { args, config })
    }

    /// Effective configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Selected subcommand; `serve` when none is given
    pub fn command(&self) -> Commands {
        self.args.command.clone().unwrap_or(Commands::Serve {
            host: None,
            port: None,
            static_dir: None,
        })
    }

    /// Explicit configuration file, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.args.config_file.as_deref()
    }

    /// Whether terminal output may use colors
    pub fn use_colors(&self) -> bool {
        !self.args.no_color && std::env::var_os("NO_COLOR").is_none()
    }

    /// Level forced by `-q`, `-v` or `--vv`, if any
    pub fn log_level_override(&self) -> Option<LogLevel> {
        Self::level_from_flags(&self.args)
    }

    /// Overrides configuration values with CLI arguments where provided
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        if let Some(database) = &args.database {
            config.connection.database = database.clone();
        }
        if let Some(timeout) = args.timeout {
            config.connection.timeout = timeout;
        }

        if let Some(Commands::Serve {
            host,
            port,
            static_dir,
        }) = &args.command
        {
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
            if let Some(dir) = static_dir {
                config.server.static_dir = dir.clone();
            }
        }

        if let Some(level) = Self::level_from_flags(args) {
            config.logging.level = level;
        }
    }

    fn level_from_flags(args: &CliArgs) -> Option<LogLevel> {
        if args.very_verbose {
            Some(LogLevel::Trace)
        } else if args.verbose {
            Some(LogLevel::Debug)
        } else if args.quiet {
            Some(LogLevel::Error)
        } else {
            None
        }
    }

    /// Show version information
    pub fn show_version(&self) {
        println!("search-lab version {}", env!("CARGO_PKG_VERSION"));
        println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
    }

    /// Default server URL for the exercise runner
    pub fn default_server_url(&self) -> String {
        format!("http://localhost:{}", self.config.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_args_parsing() {
        let args = parse(&["search-lab"]);
        assert!(args.command.is_none());
        assert!(args.config_file.is_none());
        assert!(!args.verbose);
    }

    #[test]
    fn test_serve_args() {
        let args = parse(&["search-lab", "serve", "--port", "8080", "--static-dir", "dist"]);
        assert_eq!(
            args.command,
            Some(Commands::Serve {
                host: None,
                port: Some(8080),
                static_dir: Some(PathBuf::from("dist")),
            })
        );
    }

    #[test]
    fn test_exercise_args() {
        let args = parse(&[
            "search-lab",
            "exercise",
            "-f",
            "exercises/atlas-search.toml",
            "--name",
            "2",
            "--query",
            "db.books.find({})",
            "--show-solution",
        ]);
        match args.command {
            Some(Commands::Exercise {
                file,
                name,
                query,
                show_solution,
                server,
            }) => {
                assert_eq!(file, PathBuf::from("exercises/atlas-search.toml"));
                assert_eq!(name.as_deref(), Some("2"));
                assert_eq!(query.as_deref(), Some("db.books.find({})"));
                assert!(show_solution);
                assert!(server.is_none());
            }
            other => panic!("Expected exercise command, got {other:?}"),
        }
    }

    #[test]
    fn test_query_requires_name() {
        assert!(
            CliArgs::try_parse_from(["search-lab", "exercise", "-f", "x.toml", "--query", "{}"])
                .is_err()
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = parse(&["search-lab", "indexes", "--apply", "-v"]);
        assert!(args.verbose);
        assert_eq!(args.command, Some(Commands::Indexes { apply: true }));
    }

    #[test]
    fn test_args_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 4000\n\n[connection]\ntimeout = 5").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = CliInterface::from_args(parse(&[
            "search-lab",
            "-c",
            &path,
            "--timeout",
            "3",
            "serve",
            "--port",
            "5000",
        ]))
        .unwrap();

        assert_eq!(cli.config().server.port, 5000);
        assert_eq!(cli.config().connection.timeout, 3);
        assert_eq!(cli.default_server_url(), "http://localhost:5000");
    }

    #[test]
    fn test_default_command_is_serve() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 4000").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = CliInterface::from_args(parse(&["search-lab", "-c", &path])).unwrap();
        assert!(matches!(cli.command(), Commands::Serve { port: None, .. }));
        assert_eq!(cli.config().server.port, 4000);
    }

    #[test]
    fn test_log_level_flags() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = CliInterface::from_args(parse(&["search-lab", "-c", &path, "--vv"])).unwrap();
        assert_eq!(cli.log_level_override(), Some(LogLevel::Trace));
        assert_eq!(cli.config().logging.level, LogLevel::Trace);

        let cli = CliInterface::from_args(parse(&["search-lab", "-c", &path])).unwrap();
        assert_eq!(cli.log_level_override(), None);
    }
}
