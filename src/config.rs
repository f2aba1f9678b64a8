// src/config.rs

//! Config values and the line-oriented configuration file reader.
//!
//! Each logical line of a config file holds the per-rule flags followed by a
//! command, tokenized with POSIX-shell rules. Blank lines and `#` comments
//! are skipped. A trailing backslash or an unterminated quoted string
//! continues the logical line onto the next one.

use std::io::Read;
use std::time::Duration;

use clap::Parser;

use crate::cli::RuleOpts;
use crate::errors::{ReflexError, Result};

/// One watch -> command entry, from the command line or from one logical
/// line of a config file.
#[derive(Debug, Clone)]
pub struct Config {
    /// Describes what config/line defines this entry, for diagnostics.
    pub source: String,
    pub opts: RuleOpts,
    pub command: Vec<String>,
}

/// Wrapper used to parse one tokenized config line with the per-rule flags.
#[derive(Debug, Parser)]
#[command(
    name = "reflex",
    no_binary_name = true,
    disable_help_flag = true,
    disable_version_flag = true
)]
struct ConfigLine {
    #[command(flatten)]
    opts: RuleOpts,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

/// Read configurations from a file, or from stdin if `path` is "-".
pub fn read_configs(path: &str) -> Result<Vec<Config>> {
    if path == "-" {
        let mut contents = String::new();
        std::io::stdin().read_to_string(&mut contents)?;
        parse_configs(&contents, "standard input")
    } else {
        let contents = std::fs::read_to_string(path)?;
        parse_configs(&contents, path)
    }
}

/// Parse config text into one `Config` per logical line.
pub fn parse_configs(contents: &str, name: &str) -> Result<Vec<Config>> {
    let mut configs = Vec::new();
    let mut pending = String::new();
    let mut start_line = 0usize;

    for (idx, raw) in contents.lines().enumerate() {
        let line_no = idx + 1;
        if pending.is_empty() {
            let trimmed = raw.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            start_line = line_no;
        }

        if let Some(stripped) = raw.strip_suffix('\\') {
            pending.push_str(stripped);
            continue;
        }
        pending.push_str(raw);

        let tokens = match shell_words::split(&pending) {
            Ok(tokens) => tokens,
            Err(_) => {
                // An open quote swallows the newline and continues below.
                pending.push('\n');
                continue;
            }
        };
        pending.clear();

        let parsed =
            ConfigLine::try_parse_from(&tokens).map_err(|err| ReflexError::ConfigLine {
                name: name.to_string(),
                line: start_line,
                message: err.to_string(),
            })?;
        configs.push(Config {
            source: format!("{name}, line {start_line}"),
            opts: parsed.opts,
            command: parsed.command,
        });
    }

    if !pending.is_empty() {
        return Err(ReflexError::ConfigLine {
            name: name.to_string(),
            line: start_line,
            message: "unterminated quoted string".to_string(),
        });
    }

    Ok(configs)
}

/// Parse a duration string like "300ms", "2s", "1m", "2h".
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|err| format!("invalid duration number '{num_part}': {err}"))?;

    match unit_part.trim() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        unit => Err(format!(
            "unsupported duration unit '{unit}'; expected ms, s, m, or h"
        )),
    }
}
