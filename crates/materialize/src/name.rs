//! Resource name validation.
//!
//! Materialized resources live directly inside the buffer directory, so a
//! name has to be usable as a single file name on the host platform.

use crate::error::{ErrorKind, Result};
use std::fmt;
use std::path::Path;

/// A validated, single-segment resource name.
///
/// # Examples
///
/// ```
/// use resbuf_materialize::ResourceName;
/// // Valid names
/// assert!(ResourceName::parse("poem.txt").is_ok());
/// assert!(ResourceName::parse(".hidden").is_ok());
/// // Invalid names
/// assert!(ResourceName::parse("styles/book.css").is_err());
/// assert!(ResourceName::parse("..").is_err());
/// assert!(ResourceName::parse("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceName(String);

impl ResourceName {
    /// Validates `name`, returning [`InvalidName`](crate::error::ErrorKind::InvalidName)
    /// if it is empty, a relative directory reference, or contains a path
    /// separator or null byte.
    pub fn parse(name: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref();
        if name.is_empty() || name == "." || name == ".." {
            exn::bail!(ErrorKind::InvalidName(name.to_string()));
        }
        // `is_separator` covers both `/` and `\` on Windows.
        if name.chars().any(std::path::is_separator) {
            exn::bail!(ErrorKind::InvalidName(name.to_string()));
        }
        // Null bytes cause truncation in C-based syscalls.
        if name.contains('\0') {
            exn::bail!(ErrorKind::InvalidName(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ResourceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<Path> for ResourceName {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
