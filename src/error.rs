//! # Error Handling
//!
//! This module defines the centralized error type for the updater. Every stage
//! of a run reports failures through the `Error` enum, built with `thiserror`.
//!
//! ## Key Components
//!
//! - **`Error`**: One variant per stage that can fail:
//!   - querying the remote branch head,
//!   - cloning or advancing the local mirror,
//!   - downloading the generator script,
//!   - running the generator,
//!   - staging and committing,
//!   - pushing.
//!
//!   Descriptor problems and plain I/O or JSON failures have their own variants.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Variants that wrap a failed subprocess carry its exit status so that the
//! binary can exit with the same code (see [`Error::exit_code`]).

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for updater operations
#[derive(Error, Debug)]
pub enum Error {
    /// The descriptor file could not be read or does not have the expected shape.
    #[error("Invalid app source descriptor {}: {message}", path.display())]
    Descriptor { path: PathBuf, message: String },

    /// The head commit of the tracked branch could not be determined.
    #[error("Remote query failed for {url} (branch {branch}): {message}")]
    RemoteQuery {
        url: String,
        branch: String,
        message: String,
        status: Option<i32>,
    },

    /// The local mirror could not be cloned.
    #[error("Git clone error for {url}: {message}")]
    Clone {
        url: String,
        message: String,
        status: Option<i32>,
    },

    /// The local mirror could not be advanced to the target commit.
    #[error("Checkout of commit {commit} failed: {message}")]
    Checkout {
        commit: String,
        message: String,
        status: Option<i32>,
    },

    /// The generator script could not be obtained.
    ///
    /// Includes an optional hint for resolution.
    #[error("Generator download from {url} failed: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Download {
        url: String,
        message: String,
        hint: Option<String>,
    },

    /// The generator exited unsuccessfully or printed something other than JSON.
    #[error("Source generation failed: {message}")]
    Generation { message: String, status: Option<i32> },

    /// Staging or committing in the project repository failed.
    #[error("Commit failed: {message}")]
    Commit { message: String, status: Option<i32> },

    /// The new branch could not be pushed. The local commit is kept.
    #[error("Push of {branch} to {remote} failed: {message}")]
    Push {
        remote: String,
        branch: String,
        message: String,
        status: Option<i32>,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// The exit status of the subprocess behind this error, if any.
    pub fn status(&self) -> Option<i32> {
        match self {
            Error::RemoteQuery { status, .. }
            | Error::Clone { status, .. }
            | Error::Checkout { status, .. }
            | Error::Generation { status, .. }
            | Error::Commit { status, .. }
            | Error::Push { status, .. } => *status,
            _ => None,
        }
    }

    /// Process exit code to report for this error.
    ///
    /// Propagates the failing subprocess's status; falls back to 1 when the
    /// subprocess was killed, never started, or the failure was internal.
    pub fn exit_code(&self) -> i32 {
        match self.status() {
            Some(code) if code != 0 => code,
            _ => 1,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
