//! # App Source Descriptor
//!
//! The descriptor is a JSON object naming the tracked repository (`url`), the
//! branch to follow (`branch`, default `master`) and the pinned `commit`. It is
//! usually a Flatpak `git` source entry, so it may carry other fields such as
//! `type` or `dest`. Those are kept untouched and in their original order when
//! the descriptor is written back.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::git;

/// Branch followed when the descriptor does not name one.
pub const DEFAULT_BRANCH: &str = "master";

#[derive(Debug, Deserialize)]
struct Fields {
    url: String,
    #[serde(default)]
    branch: Option<String>,
    commit: String,
}

/// A loaded descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct AppSource {
    url: String,
    branch: Option<String>,
    commit: String,
    document: Map<String, Value>,
}

impl AppSource {
    /// Build a descriptor from a parsed JSON value.
    pub fn from_value(value: Value) -> std::result::Result<Self, String> {
        let Value::Object(document) = value else {
            return Err("expected a JSON object".to_string());
        };
        let fields = Fields::deserialize(Value::Object(document.clone())).map_err(|e| e.to_string())?;

        if fields.url.trim().is_empty() {
            return Err("`url` is empty".to_string());
        }
        if fields.commit.trim().is_empty() {
            return Err("`commit` is empty".to_string());
        }
        if let Some(branch) = &fields.branch {
            validate_branch_name(branch)?;
        }

        Ok(Self {
            url: fields.url,
            branch: fields.branch,
            commit: fields.commit,
            document,
        })
    }

    /// Read and validate the descriptor at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let descriptor_error = |message: String| Error::Descriptor {
            path: path.to_path_buf(),
            message,
        };

        let text = fs::read_to_string(path).map_err(|e| descriptor_error(e.to_string()))?;
        let value: Value = serde_json::from_str(&text).map_err(|e| descriptor_error(e.to_string()))?;
        Self::from_value(value).map_err(descriptor_error)
    }

    /// Write the descriptor back to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        crate::json::write_file(path, &self.document)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// The tracked branch, falling back to [`DEFAULT_BRANCH`].
    pub fn branch(&self) -> &str {
        self.branch.as_deref().unwrap_or(DEFAULT_BRANCH)
    }

    pub fn commit(&self) -> &str {
        &self.commit
    }

    pub fn short_commit(&self) -> &str {
        git::short_commit(&self.commit)
    }

    /// Pin the descriptor to `commit`, keeping the full id.
    pub fn set_commit(&mut self, commit: &str) {
        self.commit = commit.to_string();
        self.document
            .insert("commit".to_string(), Value::String(commit.to_string()));
    }

    /// The descriptor as it will be written.
    pub fn to_value(&self) -> Value {
        Value::Object(self.document.clone())
    }
}

fn validate_branch_name(branch: &str) -> std::result::Result<(), String> {
    if branch.is_empty() || branch.chars().any(|c| c.is_whitespace() || c == '\0') {
        return Err(format!("invalid branch name: {:?}", branch));
    }
    Ok(())
}
