// src/output.rs

//! Tagged output lines and the single writer task that serializes them.
//!
//! Every producer (command output scrapers, info messages, the watcher)
//! sends `OutMsg` values on one process-wide channel; a single consumer
//! renders and writes them, so whole lines never interleave.

use std::fmt;

use clap::ValueEnum;
use tokio::io::{self, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Rule id used for info/meta lines not tied to any one rule.
pub const INFO_ID: i32 = -1;

const COLOR_RED: i32 = 31;
// ANSI colors -- using 32 - 36
const COLOR_START: i32 = 32;
const NUM_COLORS: i32 = 5;

/// How to decorate command output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Decoration {
    None,
    Plain,
    Fancy,
}

impl fmt::Display for Decoration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Decoration::None => "none",
            Decoration::Plain => "plain",
            Decoration::Fancy => "fancy",
        })
    }
}

/// One output line, tagged with the rule that produced it (or [`INFO_ID`]).
#[derive(Debug, Clone)]
pub struct OutMsg {
    pub rule_id: i32,
    pub message: String,
}

/// Queue an info line on the output channel.
pub async fn info_line(tx: &mpsc::Sender<OutMsg>, rule_id: i32, message: impl Into<String>) {
    let _ = tx
        .send(OutMsg {
            rule_id,
            message: message.into(),
        })
        .await;
}

/// Render one message according to the decoration mode. A newline is appended
/// unless the message already ends with one.
pub fn render(msg: &OutMsg, decoration: Decoration) -> String {
    let mut out = String::new();
    if decoration != Decoration::None {
        let tag = if msg.rule_id < 0 {
            "[info]".to_string()
        } else {
            format!("[{:02}]", msg.rule_id)
        };
        match decoration {
            Decoration::Fancy => {
                let color = if msg.rule_id < 0 {
                    COLOR_RED
                } else {
                    COLOR_START + msg.rule_id % NUM_COLORS
                };
                out.push_str(&format!("\x1b[01;{color}m{tag} "));
            }
            Decoration::Plain => {
                out.push_str(&tag);
                out.push(' ');
            }
            Decoration::None => unreachable!(),
        }
    }
    out.push_str(&msg.message);
    if decoration == Decoration::Fancy {
        out.push_str("\x1b[m");
    }
    if !msg.message.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Consume tagged messages and write them to stdout, one whole line at a time.
pub fn spawn_printer(mut rx: mpsc::Receiver<OutMsg>, decoration: Decoration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stdout = io::stdout();
        while let Some(msg) = rx.recv().await {
            let line = render(&msg, decoration);
            if stdout.write_all(line.as_bytes()).await.is_err() {
                return;
            }
            let _ = stdout.flush().await;
        }
    })
}
