//! Process-scoped buffer directory.
//!
//! The buffer directory is wiped and recreated the first time it is prepared
//! in a process, then reused untouched for the rest of the process lifetime.
//! Which paths have been prepared is tracked in a process-wide registry, so
//! two [`BufferDirectory`] values pointing at the same path still only wipe
//! it once.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use resbuf_config::BufferConfig;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, PoisonError};
use tracing::instrument;

/// Buffer directories already wiped and recreated by this process.
static PREPARED: LazyLock<Mutex<HashSet<PathBuf>>> = LazyLock::new(|| Mutex::new(HashSet::new()));

enum WalkEntry {
    Descend(PathBuf),
    Remove(PathBuf),
    Unlink(PathBuf),
}

/// A directory on local disk owned by this process for materialized resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDirectory {
    path: PathBuf,
}

impl BufferDirectory {
    pub fn new(config: &BufferConfig) -> Self {
        Self { path: config.path() }
    }

    /// Location of the buffer directory. It may not exist until [`prepare()`](Self::prepare)
    /// has been called.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if this process has already wiped and recreated the directory.
    pub fn is_prepared(&self) -> bool {
        let prepared = PREPARED.lock().unwrap_or_else(PoisonError::into_inner);
        prepared.contains(&self.path) || prepared.contains(&self.resolved_path())
    }

    /// The buffer path with its parent directories resolved, so that a root
    /// reached through a symlink maps to the same registry entry. The final
    /// segment is left alone: if it is a symlink, the wipe replaces it.
    fn resolved_path(&self) -> PathBuf {
        match (self.path.parent().map(fs::canonicalize), self.path.file_name()) {
            (Some(Ok(parent)), Some(name)) => parent.join(name),
            _ => self.path.clone(),
        }
    }

    /// Ensure the directory exists, wiping leftovers from previous runs on first use.
    ///
    /// The registry lock is held for the whole wipe so that concurrent first
    /// calls cannot both wipe (or one wipe files the other just copied in).
    /// On failure the path is not recorded and the next call tries again.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn prepare(&self) -> Result<&Path> {
        let mut prepared = PREPARED.lock().unwrap_or_else(PoisonError::into_inner);
        if prepared.contains(&self.path) || prepared.contains(&self.resolved_path()) {
            return Ok(&self.path);
        }
        let removed = remove_entry(&self.path).or_raise(|| ErrorKind::Io)?;
        fs::create_dir_all(&self.path).or_raise(|| ErrorKind::Io)?;
        tracing::info!(removed, "Buffer directory wiped and created");
        prepared.insert(self.path.clone());
        // Register the real location too; the root may not have existed before.
        prepared.insert(self.resolved_path());
        Ok(&self.path)
    }
}

/// Remove whatever lives at `path`, returning the number of entries removed.
///
/// Directories are walked depth-first without following symbolic links; a
/// link is removed as a link and its target is never touched. A missing path
/// is not an error.
fn remove_entry(path: &Path) -> io::Result<usize> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };
    let file_type = metadata.file_type();
    if file_type.is_symlink() {
        unlink(path)?;
        return Ok(1);
    }
    if !file_type.is_dir() {
        fs::remove_file(path)?;
        return Ok(1);
    }

    let mut removed = 0;
    // (directory, children already queued)
    let mut stack = vec![(path.to_path_buf(), false)];
    while let Some((dir, expanded)) = stack.pop() {
        if expanded {
            fs::remove_dir(&dir)?;
            removed += 1;
            continue;
        }
        stack.push((dir.clone(), true));
        for entry in fs::read_dir(&dir)? {
            match classify(entry?)? {
                WalkEntry::Descend(child) => stack.push((child, false)),
                WalkEntry::Remove(child) => {
                    fs::remove_file(&child)?;
                    removed += 1;
                },
                WalkEntry::Unlink(child) => {
                    tracing::trace!(link = %child.display(), "Removing symbolic link without following it");
                    unlink(&child)?;
                    removed += 1;
                },
            }
        }
    }
    Ok(removed)
}

fn classify(entry: fs::DirEntry) -> io::Result<WalkEntry> {
    // `DirEntry::file_type` does not traverse symlinks.
    let file_type = entry.file_type()?;
    let path = entry.path();
    Ok(if file_type.is_symlink() {
        WalkEntry::Unlink(path)
    } else if file_type.is_dir() {
        WalkEntry::Descend(path)
    } else {
        WalkEntry::Remove(path)
    })
}

fn unlink(path: &Path) -> io::Result<()> {
    // Windows directory symlinks and junctions are removed with `remove_dir`,
    // which deletes the link itself rather than the target's contents.
    fs::remove_file(path).or_else(|e| if cfg!(windows) { fs::remove_dir(path) } else { Err(e) })
}
