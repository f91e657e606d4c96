//! Resources shipped as plain files in a folder.

use super::{BoxRead, ResourceResolver};
use crate::error::{ErrorKind, Result};
use crate::name::ResourceName;
use exn::ResultExt;
use std::borrow::Cow;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// Serves the files directly inside `root`. Subdirectories are ignored.
#[derive(Debug, Clone)]
pub struct Directory {
    root: PathBuf,
}

impl Directory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ResourceResolver for Directory {
    fn open(&self, name: &str) -> Result<Option<BoxRead<'_>>> {
        // Never let a name escape the root, even if the caller skipped validation.
        let name = ResourceName::parse(name)?;
        let path = self.root.join(name.as_str());
        match fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => {},
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).or_raise(|| ErrorKind::Io),
        }
        let file = File::open(&path).or_raise(|| ErrorKind::Io)?;
        Ok(Some(Box::new(file)))
    }

    fn names(&self) -> Result<Vec<Cow<'_, str>>> {
        let mut names = Vec::new();
        for entry in self.root.read_dir().or_raise(|| ErrorKind::Io)? {
            let entry = entry.or_raise(|| ErrorKind::Io)?;
            if !entry.path().is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(Cow::Owned(name)),
                Err(name) => tracing::debug!(name = ?name, "Skipping resource with non UTF-8 file name"),
            }
        }
        names.sort();
        Ok(names)
    }
}
