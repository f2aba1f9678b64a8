// src/broadcast.rs

//! Fan-out from the watcher's change stream to every rule's pipeline.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Forward every change to each subscriber in order. Sends block on a full
/// subscriber, so one slow rule backpressures the whole broadcast.
pub fn spawn_broadcast(
    mut in_rx: mpsc::Receiver<String>,
    subscribers: Vec<mpsc::Sender<String>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(name) = in_rx.recv().await {
            for tx in &subscribers {
                let _ = tx.send(name.clone()).await;
            }
        }
    })
}
