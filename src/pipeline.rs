// src/pipeline.rs

//! Per-rule filter and debounce stages.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::backlog::Backlog;
use crate::rule::Rule;

/// Quiet window that must elapse after the last event before a batch drains.
pub const SILENCE_INTERVAL: Duration = Duration::from_millis(300);

/// Drop paths the rule does not care about and forward the rest.
pub fn spawn_filter(
    rule: Arc<Rule>,
    mut in_rx: mpsc::Receiver<String>,
    out_tx: mpsc::Sender<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(name) = in_rx.recv().await {
            if !rule.matcher.matches(&name) {
                continue;
            }
            if rule.only_files || rule.only_dirs {
                // The file may already be gone; a failed stat drops the event.
                let meta = match std::fs::metadata(&name) {
                    Ok(meta) => meta,
                    Err(_) => continue,
                };
                if (rule.only_files && meta.is_dir()) || (rule.only_dirs && !meta.is_dir()) {
                    continue;
                }
            }
            if out_tx.send(name).await.is_err() {
                return;
            }
        }
    })
}

/// Batch incoming paths and hand them to the executor one at a time.
///
/// File events come in bursts, so nothing is sent until the input has been
/// quiet for [`SILENCE_INTERVAL`]; any arrival restarts the window. Once
/// draining, the backlog keeps accepting new paths while the executor is
/// busy, and the batch ends when the backlog runs dry.
pub fn spawn_batch(
    rule: Arc<Rule>,
    mut in_rx: mpsc::Receiver<String>,
    out_tx: mpsc::Sender<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut backlog = Backlog::new(rule.backlog);
        while let Some(name) = in_rx.recv().await {
            backlog.add(name);
            let timer = tokio::time::sleep(SILENCE_INTERVAL);
            tokio::pin!(timer);
            'burst: loop {
                tokio::select! {
                    recv = in_rx.recv() => match recv {
                        Some(name) => {
                            backlog.add(name);
                            timer.as_mut().reset(Instant::now() + SILENCE_INTERVAL);
                        }
                        None => return,
                    },
                    _ = &mut timer => {
                        debug!(rule = rule.id, "quiet window elapsed; draining backlog");
                        loop {
                            let next = backlog.next().to_string();
                            tokio::select! {
                                recv = in_rx.recv() => match recv {
                                    Some(name) => backlog.add(name),
                                    None => return,
                                },
                                sent = out_tx.send(next) => {
                                    if sent.is_err() {
                                        return;
                                    }
                                    if backlog.remove_one() {
                                        break 'burst;
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    })
}
