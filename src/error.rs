//! Error handling for ergrace
//!
//! This module defines the error taxonomy used by the device session, the
//! retry policies and the poll loop, plus a Result alias.
//!
//! Errors are classified rather than matched at every call site:
//!
//! - [`ErgError::is_transient`] - worth retrying within a single poll tick
//! - [`ErgError::is_connection_level`] - the device session must be rebuilt
//! - everything else terminates the run

use thiserror::Error;

/// Recoverable failure reported by a device driver
///
/// Drivers return this for communication glitches (a dropped USB frame, a
/// short read) that are expected to clear up on their own.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation} failed: {message}")]
pub struct TransientIoError {
    /// Driver operation that failed (e.g. "monitor")
    pub operation: String,
    /// Driver supplied description
    pub message: String,
}

impl TransientIoError {
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

fn detail(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(" ({})", message)
    }
}

/// Main error type for ergrace operations
#[derive(Error, Debug)]
pub enum ErgError {
    /// No ergometer was enumerated
    #[error("No Concept2 RowErg found{}", detail(.0))]
    DeviceNotFound(String),

    /// Recoverable communication failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransientIoError),

    /// The device went away entirely
    #[error("Device disconnected: {0}")]
    Disconnected(String),

    /// A device operation was attempted without a connection
    #[error("Not connected to a RowErg")]
    NotConnected,

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Shutdown was requested
    #[error("Interrupted")]
    Interrupted,

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ErgError>,
    },
}

impl ErgError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ErgError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping any context layers
    pub fn root(&self) -> &ErgError {
        match self {
            ErgError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// No device was found
    pub fn is_device_not_found(&self) -> bool {
        matches!(self.root(), ErgError::DeviceNotFound(_))
    }

    /// Recoverable driver failure, retried within a poll tick
    pub fn is_transient(&self) -> bool {
        matches!(self.root(), ErgError::Transport(_))
    }

    /// Failure that invalidates the current device session
    pub fn is_connection_level(&self) -> bool {
        matches!(
            self.root(),
            ErgError::DeviceNotFound(_)
                | ErgError::Transport(_)
                | ErgError::Disconnected(_)
                | ErgError::NotConnected
        )
    }

    /// Shutdown was requested
    pub fn is_interrupted(&self) -> bool {
        matches!(self.root(), ErgError::Interrupted)
    }
}

/// Result type alias for ergrace operations
pub type Result<T> = std::result::Result<T, ErgError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ErgError::Io(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| ErgError::Io(e).with_context(f()))
    }
}
