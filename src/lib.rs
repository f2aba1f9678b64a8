// src/lib.rs

pub mod backlog;
pub mod broadcast;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod matcher;
pub mod output;
pub mod pipeline;
pub mod pty;
pub mod rule;
pub mod watcher;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use tokio::sync::mpsc;

use crate::cli::Cli;
use crate::config::Config;
use crate::exec::{terminate, ExecCtx};
use crate::output::OutMsg;
use crate::rule::Rule;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - configs (from the command line, a config file, or stdin) into rules
/// - the watcher, broadcaster and per-rule pipelines
/// - the output printer
/// - signal handling and child cleanup
pub async fn run(args: Cli) -> Result<()> {
    let configs = load_configs(&args)?;

    if args.verbose {
        print_globals(&args);
    }

    let mut rules = Vec::with_capacity(configs.len());
    for (id, config) in configs.iter().enumerate() {
        let rule = Rule::new(config, id as i32)
            .map_err(|err| anyhow!("could not make rule from {}: {err}", config.source))?;
        if args.verbose {
            println!("{rule}");
        }
        rules.push(Arc::new(rule));
    }
    let rules = Arc::new(rules);

    let (out_tx, out_rx) = mpsc::channel::<OutMsg>(1);
    output::spawn_printer(out_rx, args.decoration);

    let cleanup_mu = Arc::new(tokio::sync::Mutex::new(()));

    // Catch ctrl-c / SIGTERM and make sure to kill off children.
    spawn_signal_listener(rules.clone(), out_tx.clone(), cleanup_mu.clone());

    let (names_tx, names_rx) = mpsc::channel::<String>(1);
    let (done_tx, mut done_rx) = mpsc::channel(1);
    watcher::spawn_watch(
        ".",
        rules.clone(),
        names_tx,
        done_tx,
        out_tx.clone(),
        args.verbose,
    )?;

    let ctx = ExecCtx {
        out_tx: out_tx.clone(),
        sequential: args
            .sequential
            .then(|| Arc::new(tokio::sync::Mutex::new(()))),
    };
    let mut rule_txs = Vec::with_capacity(rules.len());
    for rule in rules.iter() {
        let (tx, rx) = mpsc::channel::<String>(1);
        rule_txs.push(tx);
        start_rule(rule.clone(), rx, ctx.clone()).await;
    }
    broadcast::spawn_broadcast(names_rx, rule_txs);

    // A watcher failure is fatal; still terminate children before exiting.
    match done_rx.recv().await {
        Some(err) => {
            eprintln!("reflex: {err}");
            cleanup("Cleaning up.", 1, rules.as_slice(), &out_tx, &cleanup_mu).await;
        }
        None => cleanup("Cleaning up.", 0, rules.as_slice(), &out_tx, &cleanup_mu).await,
    }
    Ok(())
}

fn load_configs(args: &Cli) -> Result<Vec<Config>> {
    match &args.config {
        Some(path) => {
            if args.any_non_globals_given() || !args.command.is_empty() {
                bail!(
                    "cannot set other flags along with --config other than \
                     --sequential, --verbose, and --decoration"
                );
            }
            let configs = config::read_configs(path)?;
            if configs.is_empty() {
                bail!("no configurations found");
            }
            Ok(configs)
        }
        None => {
            if args.sequential {
                bail!(
                    "cannot set --sequential without --config \
                     (because you cannot specify multiple commands)"
                );
            }
            Ok(vec![Config {
                source: "[commandline]".to_string(),
                opts: args.rule.clone(),
                command: args.command.clone(),
            }])
        }
    }
}

async fn start_rule(rule: Arc<Rule>, changes_rx: mpsc::Receiver<String>, ctx: ExecCtx) {
    let (filtered_tx, filtered_rx) = mpsc::channel(1);
    let (batched_tx, batched_rx) = mpsc::channel(1);
    pipeline::spawn_filter(rule.clone(), changes_rx, filtered_tx);
    pipeline::spawn_batch(rule.clone(), filtered_rx, batched_tx);
    exec::spawn_run_each(rule.clone(), batched_rx, ctx.clone());
    if rule.start_service {
        output::info_line(&ctx.out_tx, rule.id, "Starting service").await;
        exec::run_command(&rule, "", &ctx).await;
    }
}

/// List the global flags that were explicitly given, each with its default.
fn print_globals(args: &Cli) {
    println!("Globals set at commandline");
    if args.was_given("config") {
        println!(
            "| --config (-c) '{}' (default: '')",
            args.config.as_deref().unwrap_or_default()
        );
    }
    if args.was_given("verbose") {
        println!("| --verbose (-v) '{}' (default: 'false')", args.verbose);
    }
    if args.was_given("sequential") {
        println!(
            "| --sequential (-e) '{}' (default: 'false')",
            args.sequential
        );
    }
    if args.was_given("decoration") {
        println!(
            "| --decoration (-d) '{}' (default: 'plain')",
            args.decoration
        );
    }
    println!("+---------");
}

fn spawn_signal_listener(
    rules: Arc<Vec<Arc<Rule>>>,
    out_tx: mpsc::Sender<OutMsg>,
    cleanup_mu: Arc<tokio::sync::Mutex<()>>,
) {
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(_) => return,
        };
        let name = tokio::select! {
            _ = tokio::signal::ctrl_c() => "interrupt",
            _ = sigterm.recv() => "terminated",
        };
        let reason = format!("Interrupted ({name}). Cleaning up children...");
        cleanup(&reason, 0, rules.as_slice(), &out_tx, &cleanup_mu).await;
    });
}

/// Terminate every running child, give the printer a moment to drain, and
/// exit the process. The cleanup mutex serializes shutdown: a second caller
/// blocks here until the first one exits.
async fn cleanup(
    reason: &str,
    code: i32,
    rules: &[Arc<Rule>],
    out_tx: &mpsc::Sender<OutMsg>,
    cleanup_mu: &tokio::sync::Mutex<()>,
) {
    let _guard = cleanup_mu.lock().await;
    println!("{reason}");
    let mut pending = Vec::new();
    for rule in rules {
        if rule.running().await {
            let rule = rule.clone();
            let out_tx = out_tx.clone();
            pending.push(tokio::spawn(async move {
                terminate(&rule, &out_tx).await;
            }));
        }
    }
    for handle in pending {
        let _ = handle.await;
    }
    // Give just a little time to finish printing output.
    tokio::time::sleep(Duration::from_millis(10)).await;
    std::process::exit(code);
}
