// src/errors.rs

//! Crate-wide error type and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReflexError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("error on line {line} of {name}: {message}")]
    ConfigLine {
        name: String,
        line: usize,
        message: String,
    },

    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ReflexError>;
