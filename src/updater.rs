//! # Update Pipeline
//!
//! This module drives a complete run. It works in three stages, each a method
//! on [`Updater`]:
//!
//! 1. **Freshness check** ([`Updater::check_freshness`]): ask the remote for
//!    the head of the tracked branch and compare it with the pinned commit.
//!    If they match the run ends here, without writing anything.
//! 2. **Source generation** ([`Updater::generate_sources`]): bring the cached
//!    mirror to the new commit (cloning it on first use) and run the generator
//!    on its lockfile.
//! 3. **Commit & publish** ([`Updater::commit_changes`]): stage the rewritten
//!    descriptor and manifest in the project repository, commit them, and
//!    push if asked to.
//!
//! All external commands go through the [`CommandRunner`] held by the
//! `Updater`, so tests can run the whole pipeline against a scripted runner.
//! The first failure aborts the run; nothing is retried or rolled back.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{error, info, warn};
use serde_json::Value;

use crate::app_source::AppSource;
use crate::cache::{self, CacheLayout};
use crate::error::{Error, Result};
use crate::generator::{self, GeneratorOptions, HttpFetcher, ScriptFetcher};
use crate::git;
use crate::process::{CommandRunner, SystemRunner};

/// Default manifest file name.
pub const DEFAULT_OUTPUT: &str = "generated-sources.json";

/// Default lockfile location inside the mirror.
pub const DEFAULT_LOCKFILE: &str = "Cargo.lock";

/// Everything a run needs besides the external collaborators.
///
/// Relative paths are resolved against `project_root`.
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    pub descriptor: PathBuf,
    pub output: PathBuf,
    /// Repository that receives the commit. Commands for it run here.
    pub project_root: PathBuf,
    /// Explicit cache root; see [`cache::cache_root`] for the fallbacks.
    pub cache_root: Option<PathBuf>,
    /// Explicit mirror location instead of the one derived from the URL.
    pub clone_dir: Option<PathBuf>,
    /// Lockfile path relative to the mirror root.
    pub lockfile: PathBuf,
    pub generator: GeneratorOptions,
    /// Commit on `update-<short commit>` instead of the current branch.
    pub new_branch: bool,
    /// Remote to push the resulting branch to.
    pub push: Option<String>,
}

impl UpdateOptions {
    pub fn new(descriptor: PathBuf, project_root: PathBuf) -> Self {
        Self {
            descriptor,
            output: PathBuf::from(DEFAULT_OUTPUT),
            project_root,
            cache_root: None,
            clone_dir: None,
            lockfile: PathBuf::from(DEFAULT_LOCKFILE),
            generator: GeneratorOptions::default(),
            new_branch: false,
            push: None,
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.project_root.join(path)
    }
}

/// Result of the commit stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReport {
    pub branch: String,
    /// Full id of the new commit in the project repository.
    pub commit: String,
    /// Remote the branch was pushed to, if any.
    pub pushed_to: Option<String>,
}

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The pinned commit is already the branch head.
    UpToDate { commit: String },
    /// The descriptor moved from `previous` to `current` and was committed.
    Updated {
        previous: String,
        current: String,
        report: CommitReport,
    },
}

/// Runs the update pipeline against a command runner and a script fetcher.
pub struct Updater {
    runner: Box<dyn CommandRunner>,
    fetcher: Box<dyn ScriptFetcher>,
}

impl Updater {
    /// An updater that runs real processes and fetches over HTTP, killing
    /// anything that takes longer than `timeout`.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            runner: Box::new(SystemRunner::with_timeout(timeout)),
            fetcher: Box::new(HttpFetcher::new(timeout)),
        }
    }

    /// Creates an `Updater` with custom collaborators.
    ///
    /// This is primarily used for testing to inject scripted implementations.
    pub fn with_operations(runner: Box<dyn CommandRunner>, fetcher: Box<dyn ScriptFetcher>) -> Self {
        Self { runner, fetcher }
    }

    /// Returns the remote head when it differs from the pinned commit, or
    /// `None` when the descriptor is up to date.
    pub fn check_freshness(&self, source: &AppSource, cwd: &Path) -> Result<Option<String>> {
        let latest = git::remote_head(self.runner.as_ref(), cwd, source.url(), source.branch())?;
        if git::same_commit(&latest, source.commit()) {
            Ok(None)
        } else {
            Ok(Some(latest))
        }
    }

    /// Bring the mirror to the descriptor's commit and run the generator on it.
    pub fn generate_sources(&self, source: &AppSource, options: &UpdateOptions) -> Result<Value> {
        let cache_root = cache::cache_root(options.cache_root.as_deref());
        let layout = CacheLayout::new(options.resolve(&cache_root));
        let mirror = match &options.clone_dir {
            Some(dir) => options.resolve(dir),
            None => layout.mirror_dir(source.url()),
        };

        if !mirror.join(".git").exists() {
            git::clone_recursive(self.runner.as_ref(), source.url(), &mirror)?;
        }
        git::advance_to(self.runner.as_ref(), &mirror, source.commit())?;

        let executable = generator::resolve(&options.generator, &layout, self.fetcher.as_ref())?;
        let generated = generator::generate(
            self.runner.as_ref(),
            &executable,
            &options.generator.extra_args,
            &mirror.join(&options.lockfile),
            &options.project_root,
        )?;
        info!("Generation completed");
        Ok(generated)
    }

    /// Stage `files`, commit them and optionally push the branch.
    ///
    /// A push failure is returned after the commit has been made; the commit
    /// stays in place.
    pub fn commit_changes(
        &self,
        source: &AppSource,
        files: &[PathBuf],
        project_root: &Path,
        new_branch: bool,
        push: Option<&str>,
    ) -> Result<CommitReport> {
        let runner = self.runner.as_ref();
        let title = commit_title(source.commit());

        git::stage(runner, project_root, files)?;
        let branch = if new_branch {
            let branch = update_branch_name(source.commit());
            git::create_branch(runner, project_root, &branch)?;
            branch
        } else {
            git::current_branch(runner, project_root)?
        };

        git::commit(runner, project_root, &title)?;
        let commit = git::head_commit(runner, project_root)?;
        info!("Committed {} on {}", git::short_commit(&commit), branch);

        let pushed_to = match push {
            Some(remote) => {
                git::push(runner, project_root, remote, &branch)?;
                info!("Pushed {} to {}", branch, remote);
                Some(remote.to_string())
            }
            None => None,
        };

        Ok(CommitReport {
            branch,
            commit,
            pushed_to,
        })
    }

    /// Run all three stages.
    ///
    /// If writing the manifest or committing fails, the descriptor is put back
    /// as it was so the next run sees the update as pending again. A failed
    /// push leaves the commit and both files in place.
    pub fn run(&self, options: &UpdateOptions) -> Result<Outcome> {
        let descriptor = options.resolve(&options.descriptor);
        let output = options.resolve(&options.output);

        let mut source = AppSource::load(&descriptor)?;
        let Some(latest) = self.check_freshness(&source, &options.project_root)? else {
            info!("Commit {} is the latest", source.short_commit());
            return Ok(Outcome::UpToDate {
                commit: source.commit().to_string(),
            });
        };

        let previous = source.commit().to_string();
        info!(
            "Updating {} from {} to {}",
            source.url(),
            git::short_commit(&previous),
            git::short_commit(&latest)
        );
        source.set_commit(&latest);

        let generated = self.generate_sources(&source, options)?;
        let original = fs::read(&descriptor)?;
        source.save(&descriptor)?;

        let written = crate::json::write_file(&output, &generated).and_then(|()| {
            self.commit_changes(
                &source,
                &[descriptor.clone(), output],
                &options.project_root,
                options.new_branch,
                options.push.as_deref(),
            )
        });
        let report = match written {
            Ok(report) => report,
            // The commit exists; only the push failed
            Err(err @ Error::Push { .. }) => return Err(err),
            Err(err) => {
                warn!("Restoring {} to commit {}", descriptor.display(), git::short_commit(&previous));
                if let Err(e) = fs::write(&descriptor, &original) {
                    error!("Failed to restore {}: {}", descriptor.display(), e);
                }
                return Err(err);
            }
        };

        Ok(Outcome::Updated {
            previous,
            current: latest,
            report,
        })
    }
}

/// Commit message title for an update to `commit`.
pub fn commit_title(commit: &str) -> String {
    format!("build: update to commit {}", git::short_commit(commit))
}

/// Branch created by `--new-branch` for an update to `commit`.
pub fn update_branch_name(commit: &str) -> String {
    format!("update-{}", git::short_commit(commit))
}
