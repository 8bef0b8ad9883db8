//! Shared test utilities for E2E tests.
//!
//! Tests run the real binary against real git repositories that live in a
//! temporary directory:
//!
//! - `upstream/`: the tracked repository, with a `Cargo.lock` on `main`
//! - `project/`: the repository holding `app.json`, where commits land
//! - `cache/`: passed as `--cache-root`
//! - `home/`: `HOME` for every git process, so no user configuration leaks in
//! - `generator.sh`: a stand-in generator that echoes its arguments as JSON
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     require_git!();
//!     let fixture = TestFixture::new();
//!     fixture.write_descriptor(&fixture.upstream_head());
//!     fixture.command().assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::{git_available, scripts, TestFixture};
    pub use crate::require_git;
}

/// Generator stand-ins.
#[allow(dead_code)]
pub mod scripts {
    /// Prints a JSON list naming its arguments; fails if the lockfile is missing.
    pub const ECHO_ARGS: &str = r#"#!/bin/sh
for last in "$@"; do :; done
if [ ! -f "$last" ]; then
    echo "lockfile not found: $last" >&2
    exit 3
fi
printf '[{"type": "file", "dest": "cargo/vendor", "args": "%s"}]\n' "$*"
"#;

    /// Fails the way a Python traceback would.
    pub const FAILING: &str = r#"#!/bin/sh
echo "Traceback (most recent call last): boom" >&2
exit 3
"#;

    /// Never finishes on its own.
    pub const HANGING: &str = r#"#!/bin/sh
exec sleep 30
"#;

    /// Exits successfully but prints something that is not JSON.
    pub const NOT_JSON: &str = r#"#!/bin/sh
echo "Generating sources..."
"#;
}

/// Whether a `git` binary is available.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Skip the current test when git is missing.
#[macro_export]
macro_rules! require_git {
    () => {
        if !$crate::common::git_available() {
            eprintln!("Skipping test: git is not available");
            return;
        }
    };
}

/// A sandbox with an upstream repository, a project repository and a cache.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create the sandbox: an upstream repository with one commit on `main`
    /// and an empty project repository on `main`.
    pub fn new() -> Self {
        let fixture = Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        };
        for dir in ["home", "upstream", "project"] {
            fixture.temp_dir.child(dir).create_dir_all().expect("Failed to create directory");
        }

        let upstream = fixture.upstream();
        fixture.git(&upstream, &["init", "-q"]);
        fixture.git(&upstream, &["checkout", "-q", "-b", "main"]);
        fixture.git(&upstream, &["config", "uploadpack.allowAnySHA1InWant", "true"]);
        fixture.commit_upstream("Cargo.lock", "# version 1\n");

        let project = fixture.project();
        fixture.git(&project, &["init", "-q"]);
        fixture.git(&project, &["checkout", "-q", "-b", "main"]);

        fixture.with_generator(scripts::ECHO_ARGS)
    }

    /// Install `script` as the generator.
    pub fn with_generator(self, script: &str) -> Self {
        let path = self.generator();
        std::fs::write(&path, script).expect("Failed to write generator");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .expect("Failed to make generator executable");
        }
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn home(&self) -> PathBuf {
        self.path().join("home")
    }

    pub fn upstream(&self) -> PathBuf {
        self.path().join("upstream")
    }

    pub fn project(&self) -> PathBuf {
        self.path().join("project")
    }

    pub fn cache(&self) -> PathBuf {
        self.path().join("cache")
    }

    pub fn generator(&self) -> PathBuf {
        self.path().join("generator.sh")
    }

    /// URL of the upstream repository, as written into the descriptor.
    pub fn upstream_url(&self) -> String {
        format!("file://{}", self.upstream().display())
    }

    /// Where the tool keeps its mirror of the upstream repository.
    pub fn mirror(&self) -> PathBuf {
        self.cache()
            .join(flatpak_cargo_updater::cache::mirror_dir_name(&self.upstream_url()))
    }

    pub fn descriptor_path(&self) -> PathBuf {
        self.project().join("app.json")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.project().join("generated-sources.json")
    }

    /// Run git in `dir` with the sandbox environment and return trimmed stdout.
    pub fn git(&self, dir: &Path, args: &[&str]) -> String {
        let output = self
            .git_command(dir, args)
            .output()
            .expect("Failed to run git");
        assert!(
            output.status.success(),
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Whether git succeeds in `dir`.
    pub fn git_succeeds(&self, dir: &Path, args: &[&str]) -> bool {
        self.git_command(dir, args)
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    fn git_command(&self, dir: &Path, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.current_dir(dir).args(args);
        for (key, value) in self.env() {
            cmd.env(key, value);
        }
        cmd
    }

    fn env(&self) -> Vec<(&'static str, String)> {
        let home = self.home().to_string_lossy().into_owned();
        vec![
            ("HOME", home.clone()),
            ("XDG_CONFIG_HOME", home),
            ("GIT_CONFIG_NOSYSTEM", "1".to_string()),
            ("GIT_TERMINAL_PROMPT", "0".to_string()),
            ("GIT_AUTHOR_NAME", "Test Author".to_string()),
            ("GIT_AUTHOR_EMAIL", "author@example.com".to_string()),
            ("GIT_COMMITTER_NAME", "Test Committer".to_string()),
            ("GIT_COMMITTER_EMAIL", "committer@example.com".to_string()),
        ]
    }

    /// Commit `content` as `file` upstream and return the new head.
    pub fn commit_upstream(&self, file: &str, content: &str) -> String {
        let upstream = self.upstream();
        std::fs::write(upstream.join(file), content).expect("Failed to write upstream file");
        self.git(&upstream, &["add", file]);
        self.git(&upstream, &["commit", "-q", "-m", &format!("update {}", file)]);
        self.upstream_head()
    }

    pub fn upstream_head(&self) -> String {
        self.git(&self.upstream(), &["rev-parse", "HEAD"])
    }

    /// Write `app.json` pinned to `commit` and commit it in the project.
    pub fn write_descriptor(&self, commit: &str) {
        let content = format!(
            "{{\n    \"type\": \"git\",\n    \"url\": \"{}\",\n    \"branch\": \"main\",\n    \"commit\": \"{}\"\n}}\n",
            self.upstream_url(),
            commit
        );
        std::fs::write(self.descriptor_path(), content).expect("Failed to write descriptor");
        let project = self.project();
        self.git(&project, &["add", "app.json"]);
        self.git(&project, &["commit", "-q", "-m", "add app source"]);
    }

    /// The descriptor as JSON.
    pub fn descriptor(&self) -> serde_json::Value {
        let text = std::fs::read_to_string(self.descriptor_path()).expect("Failed to read descriptor");
        serde_json::from_str(&text).expect("Descriptor is not JSON")
    }

    pub fn project_head(&self) -> String {
        self.git(&self.project(), &["rev-parse", "HEAD"])
    }

    pub fn project_branch(&self) -> String {
        self.git(&self.project(), &["branch", "--show-current"])
    }

    pub fn last_commit_subject(&self) -> String {
        self.git(&self.project(), &["log", "-1", "--format=%s"])
    }

    /// The binary, run from the project directory with the sandbox environment,
    /// the sandbox cache, the stand-in generator and the descriptor argument.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = self.bare_command();
        cmd.arg("--cache-root")
            .arg(self.cache())
            .arg("--generator")
            .arg(self.generator())
            .arg("app.json");
        cmd
    }

    /// Like [`TestFixture::command`] but without `--generator` or the descriptor.
    pub fn bare_command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flatpak-cargo-updater");
        cmd.current_dir(self.project())
            .env_remove("FLATPAK_CARGO_UPDATER_CACHE")
            .env_remove("RUST_LOG")
            .arg("--color")
            .arg("never");
        for (key, value) in self.env() {
            cmd.env(key, value);
        }
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
