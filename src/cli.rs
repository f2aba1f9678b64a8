// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! The per-rule flags live in their own [`RuleOpts`] struct so that config
//! file lines can be parsed with the exact same flag definitions as the
//! command line.

use std::time::Duration;

use clap::parser::ValueSource;
use clap::{ArgMatches, Args, CommandFactory, FromArgMatches, Parser};

use crate::config::parse_duration;
use crate::output::Decoration;

pub const DEFAULT_SUB_SYMBOL: &str = "{}";
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

const AFTER_HELP: &str = "\
Examples:

    # Print each .txt file if it changes
    $ reflex -r '\\.txt$' echo {}

    # Run 'make' if any of the .c files in this directory change:
    $ reflex -g '*.c' make

    # Build and run a server; rebuild and restart when .java files change:
    $ reflex -r '\\.java$' -s -- sh -c 'make && java bin/Server'
";

/// Command-line arguments for `reflex`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "reflex",
    version,
    about = "Run a command when files change.",
    long_about = None,
    after_help = AFTER_HELP
)]
pub struct Cli {
    /// A configuration file that describes how to run reflex
    /// (or '-' to read the configuration from stdin).
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<String>,

    /// Verbose mode: print out more information about what reflex is doing.
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Don't run multiple commands at the same time.
    #[arg(long, short = 'e')]
    pub sequential: bool,

    /// How to decorate command output. Choices: none, plain, fancy.
    #[arg(
        long,
        short = 'd',
        value_enum,
        ignore_case = true,
        default_value_t = Decoration::Plain,
        value_name = "STYLE"
    )]
    pub decoration: Decoration,

    #[command(flatten)]
    pub rule: RuleOpts,

    /// Command to run. Any instance of the substitution symbol is replaced
    /// with the filename of the changed file.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,

    /// Ids of the flags that were explicitly given on the command line,
    /// filled in by [`parse`].
    #[arg(skip)]
    pub given: Vec<String>,
}

impl Cli {
    /// Whether the flag with this clap id was explicitly given.
    pub fn was_given(&self, id: &str) -> bool {
        self.given.iter().any(|given| given == id)
    }

    /// Whether any rule-level flag was explicitly given, as opposed to the
    /// purely global flags. A flag counts as given even when it was set to
    /// its default value.
    pub fn any_non_globals_given(&self) -> bool {
        const GLOBALS: [&str; 5] = ["config", "verbose", "sequential", "decoration", "command"];
        self.given
            .iter()
            .any(|id| !GLOBALS.contains(&id.as_str()))
    }
}

/// Per-rule flags, valid both on the command line and on config file lines.
#[derive(Debug, Clone, PartialEq, Args)]
pub struct RuleOpts {
    /// A regular expression to match filenames. (May be repeated.)
    #[arg(long = "regex", short = 'r', value_name = "PAT")]
    pub regexes: Vec<String>,

    /// A regular expression to exclude matching filenames. (May be repeated.)
    #[arg(long = "inverse-regex", short = 'R', value_name = "PAT")]
    pub inverse_regexes: Vec<String>,

    /// A shell glob expression to match filenames. (May be repeated.)
    #[arg(long = "glob", short = 'g', value_name = "PAT")]
    pub globs: Vec<String>,

    /// A shell glob expression to exclude matching filenames.
    /// (May be repeated.)
    #[arg(long = "inverse-glob", short = 'G', value_name = "PAT")]
    pub inverse_globs: Vec<String>,

    /// The substitution symbol that is replaced with the filename in a
    /// command.
    #[arg(long = "substitute", value_name = "SYM", default_value = DEFAULT_SUB_SYMBOL)]
    pub sub_symbol: String,

    /// Indicates that the command is a long-running process to be restarted
    /// on matching changes.
    #[arg(long = "start-service", short = 's')]
    pub start_service: bool,

    /// Allow services this long to shut down.
    #[arg(
        long = "shutdown-timeout",
        short = 't',
        value_name = "DURATION",
        default_value = "500ms",
        value_parser = parse_duration
    )]
    pub shutdown_timeout: Duration,

    /// Only match files (not directories).
    #[arg(long)]
    pub only_files: bool,

    /// Only match directories (not files).
    #[arg(long)]
    pub only_dirs: bool,

    /// Include normally ignored files (VCS and editor special files).
    #[arg(long)]
    pub all: bool,
}

/// Parse the command line, remembering which flags were explicitly given.
pub fn parse() -> Cli {
    let matches = Cli::command().get_matches();
    match Cli::from_arg_matches(&matches) {
        Ok(mut args) => {
            args.given = explicitly_given(&matches);
            args
        }
        Err(err) => err.exit(),
    }
}

fn explicitly_given(matches: &ArgMatches) -> Vec<String> {
    matches
        .ids()
        .filter(|id| matches.value_source(id.as_str()) == Some(ValueSource::CommandLine))
        .map(|id| id.as_str().to_string())
        .collect()
}
