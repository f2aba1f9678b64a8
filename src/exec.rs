// src/exec.rs

//! Executor and process supervisor: spawn commands on a PTY, scrape their
//! output, and restart or terminate services.

use std::io::{BufRead, BufReader};
use std::sync::Arc;

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::debug;

use crate::output::{info_line, OutMsg};
use crate::pty::{self, PtyMaster};
use crate::rule::Rule;

/// Shared handles the executor needs for every run.
#[derive(Clone)]
pub struct ExecCtx {
    pub out_tx: mpsc::Sender<OutMsg>,
    /// Present when --sequential is set; held for the lifetime of each child.
    pub sequential: Option<Arc<Mutex<()>>>,
}

/// Consume batched paths and run (or restart) the rule's command for each.
pub fn spawn_run_each(
    rule: Arc<Rule>,
    mut names_rx: mpsc::Receiver<String>,
    ctx: ExecCtx,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(name) = names_rx.recv().await {
            if rule.start_service {
                if rule.running().await {
                    info_line(&ctx.out_tx, rule.id, "Killing service").await;
                    terminate(&rule, &ctx.out_tx).await;
                }
                info_line(&ctx.out_tx, rule.id, "Starting service").await;
                run_command(&rule, &name, &ctx).await;
            } else {
                if let Some(mut done) = run_command(&rule, &name, &ctx).await {
                    let _ = done.wait_for(|finished| *finished).await;
                }
                rule.set_running(false).await;
            }
        }
    })
}

/// Start the rule's command for `name`, wiring up PTY output scraping, window
/// size forwarding, and exit reporting. Returns a receiver that resolves once
/// the child has exited, or `None` if the child could not be spawned (the
/// rule keeps accepting further triggers).
pub async fn run_command(
    rule: &Arc<Rule>,
    name: &str,
    ctx: &ExecCtx,
) -> Option<watch::Receiver<bool>> {
    let argv = replace_sub_symbol(&rule.command, &rule.sub_symbol, name);
    debug!(rule = rule.id, ?argv, "spawning command");

    let seq_guard = match &ctx.sequential {
        Some(lock) => Some(lock.clone().lock_owned().await),
        None => None,
    };

    let (mut child, master) = match pty::spawn(&argv) {
        Ok(pair) => pair,
        Err(err) => {
            info_line(&ctx.out_tx, rule.id, err.to_string()).await;
            return None;
        }
    };
    let master = Arc::new(master);
    let pid = child.id().map(|pid| pid as i32);
    let (done_tx, done_rx) = watch::channel(false);

    {
        let mut state = rule.state.lock().await;
        state.child_pid = pid;
        state.pty = Some(master.clone());
        state.done = Some(done_rx.clone());
        state.running = true;
    }

    spawn_winsize_forwarder(master.clone(), done_rx.clone());
    spawn_line_scraper(master, rule.id, ctx.out_tx.clone());

    let rule = rule.clone();
    let out_tx = ctx.out_tx.clone();
    tokio::spawn(async move {
        let status = child.wait().await;
        let killed = rule.killed().await;
        match status {
            Ok(status) if !status.success() && !killed => {
                let _ = out_tx
                    .send(OutMsg {
                        rule_id: rule.id,
                        message: format!("(error exit: {status})"),
                    })
                    .await;
            }
            Err(err) if !killed => {
                let _ = out_tx
                    .send(OutMsg {
                        rule_id: rule.id,
                        message: format!("(error exit: {err})"),
                    })
                    .await;
            }
            _ => {}
        }
        let _ = done_tx.send(true);
        drop(seq_guard);
    });

    Some(done_rx)
}

/// Stop the rule's current child: Ctrl-C through the PTY first, then SIGINT
/// and finally SIGKILL to the process group, each after `shutdown_timeout`.
pub async fn terminate(rule: &Arc<Rule>, out_tx: &mpsc::Sender<OutMsg>) {
    let (pid, master, done) = {
        let mut state = rule.state.lock().await;
        state.killed = true;
        (state.child_pid, state.pty.clone(), state.done.clone())
    };

    // Ascii 3 is what a ^C keypress feeds the terminal. The write simply
    // fails if the process is already gone.
    if let Some(master) = master {
        let _ = master.write(&[0x03]);
    }
    let Some(mut done) = done else { return };

    let mut sig = Signal::SIGINT;
    loop {
        tokio::select! {
            _ = async {
                while !*done.borrow() {
                    if done.changed().await.is_err() {
                        break;
                    }
                }
            } => return,
            _ = sleep(rule.shutdown_timeout) => {
                info_line(out_tx, rule.id, format!("Sending {} signal...", sig.as_str())).await;
                // Kill the whole pgroup, not just the process, so any
                // children it spawned are cleaned up with it.
                if let Some(pid) = pid {
                    if let Err(errno) = kill(Pid::from_raw(-pid), sig) {
                        info_line(out_tx, rule.id, format!("Error killing: {errno}")).await;
                        if errno == Errno::ESRCH {
                            // no such process
                            return;
                        }
                    }
                }
                // If SIGINT doesn't do anything, try SIGKILL next.
                sig = Signal::SIGKILL;
            }
        }
    }
}

fn replace_sub_symbol(command: &[String], sub_symbol: &str, name: &str) -> Vec<String> {
    command
        .iter()
        .map(|part| part.replace(sub_symbol, name))
        .collect()
}

/// Keep the PTY's window size in sync with our stdout: once at startup and
/// again on every SIGWINCH, until the run finishes.
fn spawn_winsize_forwarder(master: Arc<PtyMaster>, mut done_rx: watch::Receiver<bool>) {
    tokio::spawn(async move {
        let mut winch = match signal(SignalKind::window_change()) {
            Ok(winch) => winch,
            Err(_) => return,
        };
        // Errors are ignored in case stdout is not a terminal.
        let _ = master.inherit_winsize();
        loop {
            tokio::select! {
                _ = winch.recv() => {
                    let _ = master.inherit_winsize();
                }
                _ = done_rx.wait_for(|finished| *finished) => return,
            }
        }
    });
}

/// Forward the child's output line by line to the output channel. Runs on a
/// plain thread since the PTY master is a blocking fd.
fn spawn_line_scraper(master: Arc<PtyMaster>, rule_id: i32, out_tx: mpsc::Sender<OutMsg>) {
    let reader = match master.reader() {
        Ok(reader) => reader,
        Err(_) => return,
    };
    std::thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            // The master read fails with EIO once the child is gone; treat
            // any error like EOF.
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => return,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let message = line.trim_end_matches(['\r', '\n']).to_string();
                    if out_tx.blocking_send(OutMsg { rule_id, message }).is_err() {
                        return;
                    }
                }
            }
        }
    });
}
