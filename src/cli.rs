//! CLI argument parsing and dispatch

use std::path::{self, Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};

use flatpak_cargo_updater::generator::{GeneratorOptions, DEFAULT_GENERATOR_URL};
use flatpak_cargo_updater::git::short_commit;
use flatpak_cargo_updater::output::{self, OutputConfig};
use flatpak_cargo_updater::updater::{Outcome, UpdateOptions, Updater, DEFAULT_LOCKFILE, DEFAULT_OUTPUT};

/// Update a Flatpak git source to the latest upstream commit and regenerate
/// its Cargo sources
#[derive(Parser, Debug)]
#[command(name = "flatpak-cargo-updater")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// JSON file with the git source to update (url, branch, commit)
    #[arg(value_name = "APP_SOURCE_JSON")]
    app_source_json: PathBuf,

    /// Generator executable to run instead of the cached copy
    #[arg(short, long, value_name = "PATH")]
    generator: Option<PathBuf>,

    /// Extra argument for the generator (repeatable)
    #[arg(
        short = 'a',
        long = "generator-arg",
        value_name = "ARG",
        allow_hyphen_values = true
    )]
    generator_args: Vec<String>,

    /// Directory of the upstream mirror clone
    ///
    /// Defaults to a directory under the cache root derived from the URL.
    #[arg(short = 'd', long, value_name = "DIR")]
    clone_dir: Option<PathBuf>,

    /// Where to write the generated sources
    #[arg(short = 'o', long, value_name = "FILE", default_value = DEFAULT_OUTPUT)]
    gen_output: PathBuf,

    /// Commit on a new `update-<commit>` branch instead of the current one
    #[arg(short, long)]
    new_branch: bool,

    /// Push the resulting branch to this remote
    #[arg(short, long, value_name = "REMOTE")]
    push: Option<String>,

    /// Lockfile to generate from, relative to the mirror root
    #[arg(long, value_name = "PATH", default_value = DEFAULT_LOCKFILE)]
    lockfile: PathBuf,

    /// Repository to commit in (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    project_root: Option<PathBuf>,

    /// The root directory for mirror clones and the cached generator.
    ///
    /// If not provided, it defaults to `$XDG_CACHE_HOME/flatpak-cargo-updater`
    /// or `~/.cache/flatpak-cargo-updater`.
    #[arg(long, value_name = "DIR", env = "FLATPAK_CARGO_UPDATER_CACHE")]
    cache_root: Option<PathBuf>,

    /// Download the generator when no local copy is available
    #[arg(long)]
    download_generator: bool,

    /// Location the generator is downloaded from
    #[arg(long, value_name = "URL", default_value = DEFAULT_GENERATOR_URL)]
    generator_url: String,

    /// Expected SHA-256 of the generator script (hex)
    #[arg(long, value_name = "HEX")]
    generator_sha256: Option<String>,

    /// Give up on any external command or download after this many seconds
    #[arg(long, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Set log level (off, error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: LevelFilter,

    /// Colorize output (always, never, auto)
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    color: String,
}

impl Cli {
    /// Execute the update
    pub fn execute(self) -> Result<Outcome> {
        output::init_logging(self.log_level, &OutputConfig::from_env_and_flag(&self.color));

        let options = self.update_options()?;
        let updater = Updater::new(self.timeout.map(Duration::from_secs));
        let outcome = updater.run(&options).with_context(|| {
            format!("Failed to update {}", options.descriptor.display())
        })?;

        if let Outcome::Updated { report, .. } = &outcome {
            info!(
                "Created commit {} on branch {}",
                short_commit(&report.commit),
                report.branch
            );
        }
        Ok(outcome)
    }

    fn update_options(&self) -> Result<UpdateOptions> {
        let project_root = match &self.project_root {
            Some(dir) => path::absolute(dir)
                .with_context(|| format!("Invalid project root {}", dir.display()))?,
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };

        // Paths given on the command line are relative to where we were started
        let absolute = |p: &PathBuf| path::absolute(p).with_context(|| format!("Invalid path {}", p.display()));

        let mut options = UpdateOptions::new(absolute(&self.app_source_json)?, project_root);
        options.output = absolute(&self.gen_output)?;
        options.cache_root = self.cache_root.as_ref().map(absolute).transpose()?;
        options.clone_dir = self.clone_dir.as_ref().map(absolute).transpose()?;
        options.lockfile = self.lockfile.clone();
        options.new_branch = self.new_branch;
        options.push = self.push.clone();
        options.generator = GeneratorOptions {
            executable: self.generator.as_deref().map(generator_path).transpose()?,
            allow_download: self.download_generator,
            download_url: self.generator_url.clone(),
            sha256: self.generator_sha256.clone(),
            extra_args: self.generator_args.clone(),
        };
        Ok(options)
    }
}

/// A bare program name is looked up on `PATH`; anything with a directory part
/// is made absolute.
fn generator_path(path: &Path) -> Result<PathBuf> {
    if path.components().count() > 1 {
        path::absolute(path).with_context(|| format!("Invalid generator path {}", path.display()))
    } else {
        Ok(path.to_path_buf())
    }
}
