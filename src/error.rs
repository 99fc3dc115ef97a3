//! Error types for network loading, time slot parsing, and whole runs.
//!
//! The loaders each have their own enum so their callers can tell exactly what went wrong.
//! `TripGenError` is the run-level taxonomy; every loader error converts into it with `?`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while building a `NetworkIndex`.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("network file {path} could not be read: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("network file {path} is malformed: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("network file {path} has no usable nodes: {reason}")]
    Empty { path: PathBuf, reason: String },
}

/// Failures while parsing a time slot definition.
#[derive(Debug, Error)]
pub enum SlotError {
    #[error("invalid time slot definition: {0}")]
    Syntax(String),

    #[error("time slot '{name}' starts at {start_s}s, at or before the end of '{previous}' ({previous_end_s}s)")]
    Overlap {
        name: String,
        start_s: u32,
        previous: String,
        previous_end_s: u32,
    },

    #[error("time slot '{name}' ends ({end_hour}h) before it starts ({start_hour}h)")]
    OutOfOrder {
        name: String,
        start_hour: f64,
        end_hour: f64,
    },

    #[error("time slot shares cannot be normalized: {0}")]
    SumInvalid(String),

    #[error("time slot file {path} could not be read: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Terminal failures of a generation run.
#[derive(Debug, Error)]
pub enum TripGenError {
    #[error("input not found: {0}")]
    InputNotFound(String),

    #[error("malformed input: {0}")]
    InputMalformed(String),

    #[error("no usable input: {0}")]
    InputEmpty(String),

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("failed to write trips to {path}: {source}")]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl From<NetworkError> for TripGenError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::Unreadable { .. } => TripGenError::InputNotFound(err.to_string()),
            NetworkError::Malformed { .. } => TripGenError::InputMalformed(err.to_string()),
            NetworkError::Empty { .. } => TripGenError::InputEmpty(err.to_string()),
        }
    }
}

impl From<SlotError> for TripGenError {
    fn from(err: SlotError) -> Self {
        match err {
            SlotError::Unreadable { .. } => TripGenError::InputNotFound(err.to_string()),
            _ => TripGenError::ConfigInvalid(err.to_string()),
        }
    }
}

pub type TripGenResult<T> = Result<T, TripGenError>;
