//! # Source Generator
//!
//! The generator is an external program that reads a `Cargo.lock` and prints a
//! JSON list of Flatpak sources. This module finds the program and runs it.
//!
//! ## Resolution
//!
//! 1. An explicit executable path is trusted as-is.
//! 2. Otherwise the copy cached under the cache root is used.
//! 3. Otherwise, and only when downloading was allowed, the script is fetched
//!    through a [`ScriptFetcher`], checked against an expected SHA-256 when
//!    one is given, stored in the cache and marked executable.
//!
//! The download is the only network access the tool makes outside of git.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, error, info, warn};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::cache::CacheLayout;
use crate::error::{Error, Result};
use crate::process::CommandRunner;

/// Where the generator is downloaded from unless configured otherwise.
pub const DEFAULT_GENERATOR_URL: &str =
    "https://github.com/flatpak/flatpak-builder-tools/raw/master/cargo/flatpak-cargo-generator.py";

/// Trait for fetching the generator script - allows mocking in tests
pub trait ScriptFetcher: Send + Sync {
    /// Retrieve the body at `url`. Errors are reported as plain messages.
    fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, String>;
}

/// Fetches over HTTP(S) with a blocking `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    timeout: Option<Duration>,
}

impl HttpFetcher {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl ScriptFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, String> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| e.to_string())?;

        let response = client
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|e| e.to_string())?;
        let body = response.bytes().map_err(|e| e.to_string())?;
        Ok(body.to_vec())
    }
}

/// How to obtain and invoke the generator.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Trusted local executable. Skips the cache and any download.
    pub executable: Option<PathBuf>,
    /// Permit fetching the script when no local copy exists.
    pub allow_download: bool,
    pub download_url: String,
    /// Expected SHA-256 (hex) of the script.
    pub sha256: Option<String>,
    /// Extra arguments passed before the lockfile path.
    pub extra_args: Vec<String>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            executable: None,
            allow_download: false,
            download_url: DEFAULT_GENERATOR_URL.to_string(),
            sha256: None,
            extra_args: Vec::new(),
        }
    }
}

/// Hex-encoded SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn matches_checksum(data: &[u8], expected: &str) -> bool {
    sha256_hex(data).eq_ignore_ascii_case(expected.trim())
}

/// Find the generator executable, downloading it if that is allowed.
pub fn resolve(options: &GeneratorOptions, layout: &CacheLayout, fetcher: &dyn ScriptFetcher) -> Result<PathBuf> {
    if let Some(executable) = &options.executable {
        return Ok(executable.clone());
    }

    let cached = layout.generator_script();
    if cached.is_file() {
        match &options.sha256 {
            None => {
                debug!("Using cached generator {}", cached.display());
                return Ok(cached);
            }
            Some(expected) => {
                if matches_checksum(&fs::read(&cached)?, expected) {
                    debug!("Using cached generator {} (checksum ok)", cached.display());
                    return Ok(cached);
                }
                warn!("Cached generator {} does not match the expected checksum", cached.display());
            }
        }
    }

    if !options.allow_download {
        return Err(Error::Download {
            url: options.download_url.clone(),
            message: format!("no usable generator at {}", cached.display()),
            hint: Some(
                "Pass --generator <PATH> to use a local copy, or --download-generator to fetch it"
                    .to_string(),
            ),
        });
    }

    download(options, &cached, fetcher)?;
    Ok(cached)
}

fn download(options: &GeneratorOptions, target: &Path, fetcher: &dyn ScriptFetcher) -> Result<()> {
    let url = options.download_url.as_str();
    let download_error = |message: String, hint: Option<String>| Error::Download {
        url: url.to_string(),
        message,
        hint,
    };

    info!("Downloading generator from {}", url);
    let body = fetcher.fetch(url).map_err(|message| download_error(message, None))?;

    match &options.sha256 {
        Some(expected) => {
            if !matches_checksum(&body, expected) {
                return Err(download_error(
                    format!("checksum mismatch: expected {}, got {}", expected, sha256_hex(&body)),
                    Some("Check --generator-sha256 or pin --generator-url to a fixed revision".to_string()),
                ));
            }
        }
        None => warn!(
            "Generator downloaded without checksum verification (sha256 {})",
            sha256_hex(&body)
        ),
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| download_error(format!("cannot create {}: {}", parent.display(), e), None))?;
    }
    fs::write(target, &body)
        .map_err(|e| download_error(format!("cannot write {}: {}", target.display(), e), None))?;
    make_executable(target)
        .map_err(|e| download_error(format!("cannot mark {} executable: {}", target.display(), e), None))?;
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Run the generator on `lockfile` and parse what it prints.
pub fn generate(
    runner: &dyn CommandRunner,
    executable: &Path,
    extra_args: &[String],
    lockfile: &Path,
    cwd: &Path,
) -> Result<Value> {
    let program = executable.to_string_lossy();
    let mut args = vec!["-o".to_string(), "/dev/stdout".to_string()];
    args.extend(extra_args.iter().cloned());
    args.push(lockfile.to_string_lossy().into_owned());

    info!("Generating sources from {}", lockfile.display());
    let output = runner.run(&program, &args, cwd).map_err(|e| Error::Generation {
        message: format!("failed to run {}: {}", program, e),
        status: None,
    })?;

    if !output.success() {
        let stderr = output.stderr.trim();
        error!("{}", stderr);
        return Err(Error::Generation {
            message: format!("{} failed: {}", program, stderr),
            status: output.status,
        });
    }

    serde_json::from_str(&output.stdout).map_err(|e| Error::Generation {
        message: format!("generator output is not valid JSON: {}", e),
        status: None,
    })
}
