//! Buffer directory location settings.
//!
//! The buffer directory defaults to `resource-buffer` inside the OS temporary
//! directory. Both halves can be overridden, layered in this order (later wins):
//!
//! 1. Built-in defaults ([`BufferConfig::default`]),
//! 2. An optional TOML file ([`BufferConfig::from_file`]),
//! 3. Environment variables prefixed with `RESBUF_` (`RESBUF_ROOT`, `RESBUF_NAME`).
//!
//! Sources are read once, when the configuration is loaded.

pub mod error;

use crate::error::{ErrorKind, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Subfolder of the temporary directory used when nothing else is configured.
pub const DEFAULT_NAME: &str = "resource-buffer";
/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "RESBUF_";

/// Where the buffer directory lives on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferConfig {
    root: PathBuf,
    name: String,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self { root: std::env::temp_dir(), name: DEFAULT_NAME.to_string() }
    }
}

impl BufferConfig {
    /// Build a configuration programmatically, bypassing files and environment.
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>) -> Result<Self> {
        Self { root: root.into(), name: name.into() }.validated()
    }

    /// Load defaults overridden by `RESBUF_*` environment variables.
    pub fn load() -> Result<Self> {
        Self::extract(Self::figment())
    }

    /// Load defaults, then the TOML file at `path` (if it exists), then environment variables.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "Loading buffer configuration file");
        let figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX));
        Self::extract(figment)
    }

    /// The provider chain used by [`load()`](Self::load), exposed so callers
    /// can merge in their own sources before extraction.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default())).merge(Env::prefixed(ENV_PREFIX))
    }

    /// Extract and validate a configuration from an arbitrary provider chain.
    pub fn extract(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().map_err(|e| ErrorKind::Invalid(e.to_string()))?;
        config.validated()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full path of the buffer directory.
    pub fn path(&self) -> PathBuf {
        self.root.join(&self.name)
    }

    fn validated(self) -> Result<Self> {
        if !self.root.is_absolute() {
            exn::bail!(ErrorKind::Invalid(format!("root `{}` must be absolute", self.root.display())));
        }
        let name = self.name.as_str();
        if name.is_empty() || name == "." || name == ".." {
            exn::bail!(ErrorKind::Invalid(format!("name `{name}` is not a directory name")));
        }
        if name.chars().any(|c| std::path::is_separator(c) || c == '\0') {
            exn::bail!(ErrorKind::Invalid(format!("name `{name}` must be a single path segment")));
        }
        Ok(self)
    }
}
