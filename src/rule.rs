// src/rule.rs

//! A rule is a single watch + command to execute, with its matcher, backlog
//! policy, and execution style fixed at construction.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};

use crate::backlog::BacklogKind;
use crate::config::Config;
use crate::errors::{ReflexError, Result};
use crate::matcher::{default_exclude_matcher, parse_matchers, Matcher};
use crate::pty::PtyMaster;

/// Mutable per-rule runtime state; guarded by the rule's mutex.
#[derive(Debug, Default)]
pub struct RunState {
    pub killed: bool,
    pub running: bool,
    pub child_pid: Option<i32>,
    pub pty: Option<Arc<PtyMaster>>,
    /// Resolves to `true` once the current run's child has exited.
    pub done: Option<watch::Receiver<bool>>,
}

pub struct Rule {
    pub id: i32,
    /// Describes what config/line defines this rule.
    pub source: String,
    pub start_service: bool,
    pub backlog: BacklogKind,
    pub matcher: Matcher,
    pub only_files: bool,
    pub only_dirs: bool,
    pub command: Vec<String>,
    pub sub_symbol: String,
    pub shutdown_timeout: Duration,
    pub state: Mutex<RunState>,
}

impl Rule {
    /// Build a rule from a config entry, with sanity checking.
    pub fn new(config: &Config, id: i32) -> Result<Self> {
        let opts = &config.opts;
        let matcher = parse_matchers(
            &opts.regexes,
            &opts.inverse_regexes,
            &opts.globs,
            &opts.inverse_globs,
        )?;
        let matcher = if opts.all {
            matcher
        } else {
            Matcher::Multi(vec![default_exclude_matcher(), matcher])
        };

        if config.command.is_empty() {
            return Err(ReflexError::InvalidConfig(
                "must give command to execute".to_string(),
            ));
        }
        if opts.sub_symbol.is_empty() {
            return Err(ReflexError::InvalidConfig(
                "substitution symbol must be non-empty".to_string(),
            ));
        }

        let has_substitution = config
            .command
            .iter()
            .any(|part| part.contains(&opts.sub_symbol));
        if has_substitution && opts.start_service {
            return Err(ReflexError::InvalidConfig(
                "using --start-service does not work with a command that has a substitution symbol"
                    .to_string(),
            ));
        }
        let backlog = if has_substitution {
            BacklogKind::UniqueFiles
        } else {
            BacklogKind::Unified
        };

        if opts.only_files && opts.only_dirs {
            return Err(ReflexError::InvalidConfig(
                "cannot specify both --only-files and --only-dirs".to_string(),
            ));
        }
        if opts.shutdown_timeout.is_zero() {
            return Err(ReflexError::InvalidConfig(
                "shutdown timeout cannot be <= 0".to_string(),
            ));
        }

        Ok(Self {
            id,
            source: config.source.clone(),
            start_service: opts.start_service,
            backlog,
            matcher,
            only_files: opts.only_files,
            only_dirs: opts.only_dirs,
            command: config.command.clone(),
            sub_symbol: opts.sub_symbol.clone(),
            shutdown_timeout: opts.shutdown_timeout,
            state: Mutex::new(RunState::default()),
        })
    }

    pub async fn killed(&self) -> bool {
        self.state.lock().await.killed
    }

    pub async fn running(&self) -> bool {
        self.state.lock().await.running
    }

    pub async fn set_running(&self, running: bool) {
        self.state.lock().await.running = running;
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Reflex from {}", self.source)?;
        writeln!(f, "| ID: {}", self.id)?;
        for line in self.matcher.to_string().lines() {
            writeln!(f, "| {line}")?;
        }
        if self.only_files {
            writeln!(f, "| Only matching files.")?;
        } else if self.only_dirs {
            writeln!(f, "| Only matching directories.")?;
        }
        if !self.start_service {
            writeln!(f, "| Substitution symbol {}", self.sub_symbol)?;
        }
        let command: Vec<String> = self
            .command
            .iter()
            .map(|part| part.replace(&self.sub_symbol, "<filename>"))
            .collect();
        writeln!(f, "| Command: {command:?}")?;
        write!(f, "+---------")
    }
}
