//! # Scratch Space
//!
//! Pipelines hand the ledger tool file paths for everything it reads and
//! writes: query results, protocol parameters, raw and signed transactions,
//! datums, script envelopes. Those files live under a scratch root and belong
//! to exactly one run.
//!
//! A run takes a [`ScratchScope`] from the shared [`ScratchSpace`]. Every
//! path allocated through the scope is removed when the scope is released or
//! dropped, whichever comes first, so a run that fails half-way leaves
//! nothing behind.
//!
//! Names are `<stem>-<uuid v4>[.<ext>]`, which keeps concurrent runs sharing
//! one root from ever colliding.
//!
//! File allocations only reserve a path; the file is created by whoever
//! writes it. That way "the tool exited zero but wrote nothing" stays
//! detectable. Directory allocations are created immediately.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// What kind of scratch resource to allocate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    File,
    Directory,
}

/// The shared scratch root. Cheap to clone.
#[derive(Clone, Debug)]
pub struct ScratchSpace {
    root: PathBuf,
}

impl ScratchSpace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Scratch space under the OS temp directory.
    pub fn system() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Open a fresh scope owned by a single run.
    pub fn scope(&self) -> ScratchScope {
        ScratchScope {
            root: self.root.clone(),
            allocated: Vec::new(),
        }
    }
}

/// The set of scratch paths owned by one run.
#[derive(Debug)]
pub struct ScratchScope {
    root: PathBuf,
    allocated: Vec<PathBuf>,
}

impl ScratchScope {
    /// Allocate a uniquely named resource.
    ///
    /// `label` supplies the stem and optional extension: `"tx.raw"` becomes
    /// `tx-<uuid>.raw`.
    pub fn allocate(&mut self, kind: ResourceKind, label: &str) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.root)?;

        let label = Path::new(label);
        let stem = label
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "scratch".to_string());
        let name = match label.extension() {
            Some(ext) => format!("{stem}-{}.{}", Uuid::new_v4().simple(), ext.to_string_lossy()),
            None => format!("{stem}-{}", Uuid::new_v4().simple()),
        };
        let path = self.root.join(name);

        if kind == ResourceKind::Directory {
            fs::create_dir(&path)?;
        }
        self.allocated.push(path.clone());
        Ok(path)
    }

    /// Reserve a file path. See [`ScratchScope::allocate`].
    pub fn file(&mut self, label: &str) -> io::Result<PathBuf> {
        self.allocate(ResourceKind::File, label)
    }

    /// Create a private directory. See [`ScratchScope::allocate`].
    pub fn directory(&mut self, label: &str) -> io::Result<PathBuf> {
        self.allocate(ResourceKind::Directory, label)
    }

    /// Paths allocated so far, in allocation order.
    pub fn allocated(&self) -> &[PathBuf] {
        &self.allocated
    }

    /// Release every allocated path. Returns how many were tracked.
    pub fn release_all(&mut self) -> usize {
        let count = self.allocated.len();
        for path in self.allocated.drain(..) {
            release(&path);
        }
        count
    }
}

impl Drop for ScratchScope {
    fn drop(&mut self) {
        self.release_all();
    }
}

/// Best-effort removal of a file or directory tree. Missing paths are fine.
pub fn release(path: &Path) {
    let Ok(meta) = fs::symlink_metadata(path) else {
        return;
    };
    // Errors are swallowed: a stale scratch file must never fail a run.
    let _ = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
}
