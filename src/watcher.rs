// src/watcher.rs

//! Recursive directory watcher built on `notify`.
//!
//! Each directory gets its own non-recursive watch so that subtrees every
//! rule excludes can be pruned entirely. Newly created directories are
//! walked and watched as they appear. Watches are intentionally not removed
//! when directories are deleted.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::{ReflexError, Result};
use crate::output::{info_line, OutMsg, INFO_ID};
use crate::rule::Rule;

/// Start watching `root` and all non-pruned subdirectories.
///
/// Normalized change paths are sent on `names_tx`; a fatal watcher error is
/// reported once on `done_tx` and ends the watch task.
pub fn spawn_watch(
    root: impl Into<PathBuf>,
    rules: Arc<Vec<Arc<Rule>>>,
    names_tx: mpsc::Sender<String>,
    done_tx: mpsc::Sender<ReflexError>,
    out_tx: mpsc::Sender<OutMsg>,
    verbose: bool,
) -> Result<()> {
    let root = root.into();

    // Channel from the synchronous notify callback into the async world.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            let _ = event_tx.send(res);
        },
        notify::Config::default(),
    )?;

    tokio::spawn(watch_loop(
        watcher, root, rules, event_rx, names_tx, done_tx, out_tx, verbose,
    ));
    Ok(())
}

async fn watch_loop(
    mut watcher: RecommendedWatcher,
    root: PathBuf,
    rules: Arc<Vec<Arc<Rule>>>,
    mut event_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    names_tx: mpsc::Sender<String>,
    done_tx: mpsc::Sender<ReflexError>,
    out_tx: mpsc::Sender<OutMsg>,
    verbose: bool,
) {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    watch_tree(&mut watcher, &root, &rules, &cwd, &out_tx).await;

    while let Some(res) = event_rx.recv().await {
        let event = match res {
            Ok(event) => event,
            Err(err) => {
                let _ = done_tx.send(err.into()).await;
                return;
            }
        };
        if verbose {
            info_line(
                &out_tx,
                INFO_ID,
                format!("fs event: {:?} {:?}", event.kind, event.paths),
            )
            .await;
        }
        // Reads never change content.
        if matches!(event.kind, EventKind::Access(_)) {
            continue;
        }
        let metadata_only = matches!(event.kind, EventKind::Modify(ModifyKind::Metadata(_)));
        for path in &event.paths {
            let name = relative_name(&cwd, path);
            match std::fs::metadata(path) {
                // The path may be gone already (delete or rename); pass it
                // along and let each rule's filter decide.
                Err(_) => {
                    if names_tx.send(name).await.is_err() {
                        return;
                    }
                }
                Ok(meta) => {
                    if metadata_only {
                        continue;
                    }
                    let name = normalize(&name, meta.is_dir());
                    if names_tx.send(name).await.is_err() {
                        return;
                    }
                    if matches!(event.kind, EventKind::Create(_)) && meta.is_dir() {
                        watch_tree(&mut watcher, path, &rules, &cwd, &out_tx).await;
                    }
                }
            }
        }
    }
}

/// Walk `root`, adding a non-recursive watch for every directory some rule
/// could match under. A directory and its whole subtree are skipped only
/// when every rule's matcher excludes the prefix.
async fn watch_tree(
    watcher: &mut RecommendedWatcher,
    root: &Path,
    rules: &[Arc<Rule>],
    cwd: &Path,
    out_tx: &mpsc::Sender<OutMsg>,
) {
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let name = normalize(&relative_name(cwd, &dir), true);
        if rules.iter().all(|rule| rule.matcher.exclude_prefix(&name)) {
            debug!(dir = %name, "pruned excluded directory");
            continue;
        }
        if let Err(err) = watcher.watch(&dir, RecursiveMode::NonRecursive) {
            info_line(
                out_tx,
                INFO_ID,
                format!("Error while watching new path {name}: {err}"),
            )
            .await;
            continue;
        }
        debug!(dir = %name, "watching directory");
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                info_line(
                    out_tx,
                    INFO_ID,
                    format!("Error while walking path {name}: {err}"),
                )
                .await;
                continue;
            }
        };
        for entry in entries.flatten() {
            if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
                stack.push(entry.path());
            }
        }
    }
}

/// Event path -> workspace-relative string with any leading "./" stripped.
/// Paths outside `cwd` are returned as given.
pub fn relative_name(cwd: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(cwd).unwrap_or(path);
    let name = rel.to_string_lossy();
    match name.strip_prefix("./") {
        Some(stripped) => stripped.to_string(),
        None => name.into_owned(),
    }
}

/// Directory names carry a trailing slash so rules can tell them apart from
/// files.
pub fn normalize(name: &str, is_dir: bool) -> String {
    if is_dir && !name.ends_with('/') {
        format!("{name}/")
    } else {
        name.to_string()
    }
}
