//! Git command wrappers.
//!
//! Thin wrappers around the `git` CLI, run through a [`CommandRunner`]. Using
//! the system git means SSH keys, credential helpers and anything configured
//! in `~/.gitconfig` work without extra setup.
//!
//! Each wrapper reports failures with the error variant of the stage it
//! belongs to, carrying the captured stderr and exit status.

use std::fs;
use std::path::{self, Path, PathBuf};

use log::{error, info};

use crate::error::{Error, Result};
use crate::process::CommandRunner;

/// Number of leading characters used for display, branch names and comparisons.
pub const SHORT_COMMIT_LEN: usize = 7;

/// The short form of a commit id: its first seven characters, or the whole id
/// if it is shorter than that.
pub fn short_commit(commit: &str) -> &str {
    commit.get(..SHORT_COMMIT_LEN).unwrap_or(commit)
}

/// Whether two commit ids refer to the same commit, compared on their short forms.
pub fn same_commit(a: &str, b: &str) -> bool {
    short_commit(a).eq_ignore_ascii_case(short_commit(b))
}

/// Failure of a single git invocation, before it is attributed to a stage.
struct Failure {
    message: String,
    status: Option<i32>,
}

fn run_git(runner: &dyn CommandRunner, cwd: &Path, args: &[&str]) -> std::result::Result<String, Failure> {
    let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
    let output = runner.run("git", &args, cwd).map_err(|e| Failure {
        message: format!("failed to run git {}: {}", args.join(" "), e),
        status: None,
    })?;

    if output.success() {
        Ok(output.stdout.trim().to_string())
    } else {
        let stderr = output.stderr.trim();
        error!("{}", stderr);
        Err(Failure {
            message: format!("git {} failed: {}", args.join(" "), stderr),
            status: output.status,
        })
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Extract the commit for `reference` from `git ls-remote` output.
///
/// The output must consist of exactly one `<commit>\t<ref>` line naming
/// `reference`.
pub fn parse_ls_remote(stdout: &str, reference: &str) -> std::result::Result<String, String> {
    let lines: Vec<&str> = stdout.lines().filter(|line| !line.trim().is_empty()).collect();
    let line = match lines.as_slice() {
        [] => return Err(format!("{} not found on remote", reference)),
        [line] => *line,
        _ => {
            return Err(format!(
                "expected a single entry for {}, got {}",
                reference,
                lines.len()
            ))
        }
    };

    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        [commit, got_ref] if *got_ref == reference => {
            if commit.chars().all(|c| c.is_ascii_hexdigit()) {
                Ok(commit.to_string())
            } else {
                Err(format!("malformed commit id {:?}", commit))
            }
        }
        [_, got_ref] => Err(format!("expected {}, got {}", reference, got_ref)),
        _ => Err(format!("unexpected ls-remote output: {:?}", line)),
    }
}

/// Query the head commit of `branch` on the remote at `url` without cloning.
pub fn remote_head(runner: &dyn CommandRunner, cwd: &Path, url: &str, branch: &str) -> Result<String> {
    let reference = format!("refs/heads/{}", branch);
    let query_error = |message: String, status: Option<i32>| Error::RemoteQuery {
        url: url.to_string(),
        branch: branch.to_string(),
        message,
        status,
    };

    let stdout = run_git(runner, cwd, &["ls-remote", url, &reference])
        .map_err(|f| query_error(f.message, f.status))?;
    parse_ls_remote(&stdout, &reference).map_err(|message| query_error(message, None))
}

/// Clone `url` with submodules into `target_dir`, creating parent directories.
///
/// git runs in the parent directory, so a relative `target_dir` is made
/// absolute against the current directory first.
pub fn clone_recursive(runner: &dyn CommandRunner, url: &str, target_dir: &Path) -> Result<()> {
    let clone_error = |message: String| Error::Clone {
        url: url.to_string(),
        message,
        status: None,
    };

    let target_dir = path::absolute(target_dir)
        .map_err(|e| clone_error(format!("invalid target {}: {}", target_dir.display(), e)))?;
    let parent = target_dir
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"));
    fs::create_dir_all(&parent)
        .map_err(|e| clone_error(format!("cannot create {}: {}", parent.display(), e)))?;

    info!("Cloning {} into {}", url, target_dir.display());
    let target = path_arg(&target_dir);
    run_git(runner, &parent, &["clone", "--recursive", url, &target]).map_err(|f| Error::Clone {
        url: url.to_string(),
        message: f.message,
        status: f.status,
    })?;
    Ok(())
}

/// Move the mirror at `repo` to `commit`, fetching it from `origin` first.
///
/// Returns `false` when the mirror was already at `commit`.
pub fn advance_to(runner: &dyn CommandRunner, repo: &Path, commit: &str) -> Result<bool> {
    let checkout_error = |f: Failure| Error::Checkout {
        commit: commit.to_string(),
        message: f.message,
        status: f.status,
    };

    let current = run_git(runner, repo, &["rev-parse", "HEAD"]).map_err(checkout_error)?;
    if same_commit(&current, commit) {
        return Ok(false);
    }

    info!(
        "Moving mirror from {} to {}",
        short_commit(&current),
        short_commit(commit)
    );
    run_git(runner, repo, &["fetch", "origin", commit]).map_err(checkout_error)?;
    run_git(runner, repo, &["checkout", commit]).map_err(checkout_error)?;
    Ok(true)
}

fn commit_error(f: Failure) -> Error {
    Error::Commit {
        message: f.message,
        status: f.status,
    }
}

/// Stage exactly `files` in the repository at `repo`.
pub fn stage(runner: &dyn CommandRunner, repo: &Path, files: &[PathBuf]) -> Result<()> {
    let files: Vec<String> = files.iter().map(|f| path_arg(f)).collect();
    let mut args = vec!["add", "-v", "--"];
    args.extend(files.iter().map(String::as_str));
    run_git(runner, repo, &args).map_err(commit_error)?;
    Ok(())
}

/// Create `branch` at the current HEAD and switch to it.
pub fn create_branch(runner: &dyn CommandRunner, repo: &Path, branch: &str) -> Result<()> {
    run_git(runner, repo, &["checkout", "-b", branch]).map_err(commit_error)?;
    Ok(())
}

/// The currently checked-out branch. A detached HEAD is an error.
pub fn current_branch(runner: &dyn CommandRunner, repo: &Path) -> Result<String> {
    let branch = run_git(runner, repo, &["branch", "--show-current"]).map_err(commit_error)?;
    if branch.is_empty() {
        return Err(Error::Commit {
            message: "HEAD is detached; check out a branch or use --new-branch".to_string(),
            status: None,
        });
    }
    Ok(branch)
}

/// Commit the staged changes with `title` as the message.
pub fn commit(runner: &dyn CommandRunner, repo: &Path, title: &str) -> Result<()> {
    run_git(runner, repo, &["commit", "-m", title]).map_err(commit_error)?;
    Ok(())
}

/// The full id of HEAD in the project repository.
pub fn head_commit(runner: &dyn CommandRunner, repo: &Path) -> Result<String> {
    run_git(runner, repo, &["rev-parse", "HEAD"]).map_err(commit_error)
}

/// Push `branch` to `remote`.
pub fn push(runner: &dyn CommandRunner, repo: &Path, remote: &str, branch: &str) -> Result<()> {
    run_git(runner, repo, &["push", remote, branch]).map_err(|f| Error::Push {
        remote: remote.to_string(),
        branch: branch.to_string(),
        message: f.message,
        status: f.status,
    })?;
    Ok(())
}
