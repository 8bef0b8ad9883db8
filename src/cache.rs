//! On-disk cache layout
//!
//! The cache holds one mirror clone per tracked repository and the downloaded
//! generator script. Its root is resolved once per run:
//!
//! 1. an explicit directory (`--cache-root` or `FLATPAK_CARGO_UPDATER_CACHE`),
//!    used as-is;
//! 2. otherwise `$XDG_CACHE_HOME/flatpak-cargo-updater`, if that is absolute;
//! 3. otherwise `~/.cache/flatpak-cargo-updater`.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Directory created under the cache home.
pub const CACHE_DIR_NAME: &str = "flatpak-cargo-updater";

/// File name of the cached generator script.
pub const GENERATOR_FILE_NAME: &str = "generator.py";

/// Resolve the cache root from an explicit override and the process environment.
pub fn cache_root(explicit: Option<&Path>) -> PathBuf {
    resolve_cache_root(explicit, env::var_os("XDG_CACHE_HOME"), dirs::home_dir())
}

/// Resolve the cache root from explicit inputs.
///
/// An empty or relative `xdg_cache_home` is treated as unset. Without a home
/// directory the result is relative; callers resolve it against the project root.
pub fn resolve_cache_root(
    explicit: Option<&Path>,
    xdg_cache_home: Option<OsString>,
    home: Option<PathBuf>,
) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }

    // Relative XDG values are invalid and must be ignored
    let cache_home = match xdg_cache_home.map(PathBuf::from) {
        Some(dir) if dir.is_absolute() => dir,
        _ => home.unwrap_or_default().join(".cache"),
    };
    cache_home.join(CACHE_DIR_NAME)
}

/// Directory name of the mirror for `url`.
///
/// The scheme separator and every path separator become `_`, so the name is a
/// single path component. Different URLs that only differ in those characters
/// share a mirror.
pub fn mirror_dir_name(url: &str) -> String {
    let mut name: String = url
        .replace("://", "_")
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0' => '_',
            c => c,
        })
        .collect();

    // "", "." and ".." would resolve to the cache root or its parent
    if name.chars().all(|c| c == '.') {
        name.insert(0, '_');
    }
    name
}

/// Paths inside a resolved cache root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Default mirror location for `url`.
    pub fn mirror_dir(&self, url: &str) -> PathBuf {
        self.root.join(mirror_dir_name(url))
    }

    /// Location of the cached generator script.
    pub fn generator_script(&self) -> PathBuf {
        self.root.join(GENERATOR_FILE_NAME)
    }
}
