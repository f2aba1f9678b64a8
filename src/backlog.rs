// src/backlog.rs

//! Pending-path buffers used between the debouncer and the executor.
//!
//! While a command is still running, further paths keep arriving. If the
//! command has no substitution symbol only one pending path needs to survive;
//! with a substitution symbol every unique path must be preserved.

use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BacklogKind {
    Unified,
    UniqueFiles,
}

#[derive(Debug)]
pub enum Backlog {
    Unified(UnifiedBacklog),
    UniqueFiles(UniqueFilesBacklog),
}

impl Backlog {
    pub fn new(kind: BacklogKind) -> Self {
        match kind {
            BacklogKind::Unified => Backlog::Unified(UnifiedBacklog::default()),
            BacklogKind::UniqueFiles => Backlog::UniqueFiles(UniqueFilesBacklog::default()),
        }
    }

    /// Add a path to the backlog.
    pub fn add(&mut self, path: String) {
        match self {
            Backlog::Unified(backlog) => backlog.add(path),
            Backlog::UniqueFiles(backlog) => backlog.add(path),
        }
    }

    /// The path that should be processed next, without removing it.
    pub fn next(&self) -> &str {
        match self {
            Backlog::Unified(backlog) => backlog.next(),
            Backlog::UniqueFiles(backlog) => backlog.next(),
        }
    }

    /// Remove the next path and report whether the backlog is now empty.
    pub fn remove_one(&mut self) -> bool {
        match self {
            Backlog::Unified(backlog) => backlog.remove_one(),
            Backlog::UniqueFiles(backlog) => backlog.remove_one(),
        }
    }
}

/// Keeps only the first path of a burst; later adds are discarded.
#[derive(Debug, Default)]
pub struct UnifiedBacklog {
    path: Option<String>,
}

impl UnifiedBacklog {
    pub fn add(&mut self, path: String) {
        if self.path.is_none() {
            self.path = Some(path);
        }
    }

    pub fn next(&self) -> &str {
        self.path
            .as_deref()
            .expect("next() called on empty backlog")
    }

    pub fn remove_one(&mut self) -> bool {
        if self.path.is_none() {
            panic!("remove_one() called on empty backlog");
        }
        self.path = None;
        true
    }
}

/// Keeps every distinct pending path. The first arrival is delivered first;
/// the order of the rest is unspecified.
#[derive(Debug, Default)]
pub struct UniqueFilesBacklog {
    next: Option<String>,
    rest: HashSet<String>,
}

impl UniqueFilesBacklog {
    pub fn add(&mut self, path: String) {
        match &self.next {
            None => self.next = Some(path),
            Some(next) if *next == path => {}
            Some(_) => {
                self.rest.insert(path);
            }
        }
    }

    pub fn next(&self) -> &str {
        self.next
            .as_deref()
            .expect("next() called on empty backlog")
    }

    pub fn remove_one(&mut self) -> bool {
        if self.next.take().is_none() {
            panic!("remove_one() called on empty backlog");
        }
        match self.rest.iter().next().cloned() {
            Some(path) => {
                self.rest.remove(&path);
                self.next = Some(path);
                false
            }
            None => true,
        }
    }
}
