//! # Flatpak Cargo Updater Library
//!
//! This library keeps the generated Cargo sources of a Flatpak manifest in
//! step with an upstream Git branch. It is used by the `flatpak-cargo-updater`
//! command-line tool but can be driven directly through [`updater::Updater`].
//!
//! ## Quick Example
//!
//! ```
//! use flatpak_cargo_updater::app_source::AppSource;
//! use flatpak_cargo_updater::updater::{commit_title, update_branch_name};
//! use serde_json::json;
//!
//! let source = AppSource::from_value(json!({
//!     "type": "git",
//!     "url": "https://example.com/app.git",
//!     "commit": "bbbbbbb2222222222222222222222222222222222"
//! }))
//! .unwrap();
//!
//! assert_eq!(source.branch(), "master");
//! assert_eq!(commit_title(source.commit()), "build: update to commit bbbbbbb");
//! assert_eq!(update_branch_name(source.commit()), "update-bbbbbbb");
//! ```
//!
//! ## Core Concepts
//!
//! - **Descriptor (`app_source`)**: the JSON source entry holding the tracked
//!   URL, branch and pinned commit.
//! - **Cache (`cache`)**: where mirror clones and the generator script live.
//! - **Git (`git`)**: wrappers around the `git` CLI, one per operation the
//!   pipeline needs.
//! - **Generator (`generator`)**: locating, optionally downloading, and running
//!   the external source generator.
//! - **Processes (`process`)**: the `CommandRunner` seam every external command
//!   goes through.
//! - **Output (`output`)**: logger setup and color detection.
//! - **Pipeline (`updater`)**: the freshness check, source generation and
//!   commit stages.

pub mod app_source;
pub mod cache;
pub mod error;
pub mod generator;
pub mod git;
pub mod json;
pub mod output;
pub mod process;
pub mod updater;

#[cfg(test)]
mod cache_proptest;
