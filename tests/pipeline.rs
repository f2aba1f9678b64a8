use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use reflex::config::parse_configs;
use reflex::pipeline::{spawn_batch, spawn_filter};
use reflex::rule::Rule;

fn make_rule(line: &str) -> Arc<Rule> {
    let configs = parse_configs(line, "test input").unwrap();
    Arc::new(Rule::new(&configs[0], 0).unwrap())
}

async fn recv_within(rx: &mut mpsc::Receiver<String>, what: &str) -> String {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
        .unwrap_or_else(|| panic!("channel closed waiting for {what}"))
}

#[tokio::test]
async fn filter_drops_paths_the_matcher_rejects() {
    let rule = make_rule(r"-r '\.txt$' echo {}");
    let (in_tx, in_rx) = mpsc::channel(16);
    let (out_tx, mut out_rx) = mpsc::channel(16);
    spawn_filter(rule, in_rx, out_tx);

    in_tx.send("notes.log".to_string()).await.unwrap();
    in_tx.send("a.txt".to_string()).await.unwrap();
    drop(in_tx);

    assert_eq!(recv_within(&mut out_rx, "matching path").await, "a.txt");
    assert!(out_rx.recv().await.is_none());
}

#[tokio::test]
async fn filter_stats_paths_for_only_files() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("present.txt");
    std::fs::write(&file, "x").unwrap();
    let subdir = dir.path().join("sub");
    std::fs::create_dir(&subdir).unwrap();
    let missing = dir.path().join("ghost.txt");

    let rule = make_rule("--only-files echo hi");
    let (in_tx, in_rx) = mpsc::channel(16);
    let (out_tx, mut out_rx) = mpsc::channel(16);
    spawn_filter(rule, in_rx, out_tx);

    let file_name = file.to_string_lossy().to_string();
    in_tx
        .send(subdir.to_string_lossy().to_string())
        .await
        .unwrap();
    in_tx
        .send(missing.to_string_lossy().to_string())
        .await
        .unwrap();
    in_tx.send(file_name.clone()).await.unwrap();
    drop(in_tx);

    assert_eq!(recv_within(&mut out_rx, "the real file").await, file_name);
    assert!(out_rx.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn unified_backlog_coalesces_a_burst_into_one_run() {
    let rule = make_rule("-g '*.c' make");
    let (in_tx, in_rx) = mpsc::channel(16);
    let (out_tx, mut out_rx) = mpsc::channel(16);
    spawn_batch(rule, in_rx, out_tx);

    in_tx.send("x.c".to_string()).await.unwrap();
    in_tx.send("y.c".to_string()).await.unwrap();
    in_tx.send("z.c".to_string()).await.unwrap();

    assert_eq!(recv_within(&mut out_rx, "the coalesced path").await, "x.c");

    drop(in_tx);
    assert!(out_rx.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn unique_files_backlog_emits_each_distinct_path_once() {
    let rule = make_rule(r"-r '\.txt$' echo {}");
    let (in_tx, in_rx) = mpsc::channel(16);
    let (out_tx, mut out_rx) = mpsc::channel(16);
    spawn_batch(rule, in_rx, out_tx);

    in_tx.send("a.txt".to_string()).await.unwrap();
    in_tx.send("b.txt".to_string()).await.unwrap();
    in_tx.send("a.txt".to_string()).await.unwrap();

    // The first arrival comes out first, then the rest of the set.
    assert_eq!(recv_within(&mut out_rx, "first path").await, "a.txt");
    assert_eq!(recv_within(&mut out_rx, "second path").await, "b.txt");

    drop(in_tx);
    assert!(out_rx.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn later_arrivals_extend_the_quiet_window() {
    let rule = make_rule("-r x cat");
    let (in_tx, in_rx) = mpsc::channel(16);
    let (out_tx, mut out_rx) = mpsc::channel(16);
    spawn_batch(rule, in_rx, out_tx);

    in_tx.send("x1".to_string()).await.unwrap();
    tokio::task::yield_now().await;
    tokio::time::advance(Duration::from_millis(200)).await;

    in_tx.send("x2".to_string()).await.unwrap();
    tokio::task::yield_now().await;
    tokio::time::advance(Duration::from_millis(200)).await;

    // 400ms after the first arrival, but only 200ms after the second: the
    // window restarted, so nothing has been emitted yet.
    assert!(out_rx.try_recv().is_err());

    tokio::time::advance(Duration::from_millis(150)).await;
    assert_eq!(recv_within(&mut out_rx, "the batched path").await, "x1");

    drop(in_tx);
    assert!(out_rx.recv().await.is_none());
}
