//! archive.rs - Access to the collaborator's output archive.
//!
//! The archive is treated as opaque beyond its outer container: a directory,
//! or a tarball that is plain, gzip- or xz-compressed. Tarballs are unpacked
//! into a scratch directory; a single top-level directory inside it is taken
//! as the content root, which is how report tarballs are laid out.
//!
//! License: MIT OR APACHE 2.0

use flate2::read::GzDecoder;
use log::{debug, info};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tar::Archive;
use tempfile::TempDir;
use xz2::read::XzDecoder;

use crate::errors::VerifyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Directory,
    Tar,
    TarGz,
    TarXz,
}

impl ArchiveKind {
    /// Classifies by file type and extension.
    pub fn detect(path: &Path) -> Option<Self> {
        if path.is_dir() {
            return Some(ArchiveKind::Directory);
        }
        let name = path.file_name()?.to_string_lossy().to_ascii_lowercase();
        if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(ArchiveKind::TarXz)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveKind::TarGz)
        } else if name.ends_with(".tar") {
            Some(ArchiveKind::Tar)
        } else {
            None
        }
    }
}

/// An opened archive, unpacked if it needed to be.
#[derive(Debug)]
pub struct ReportArchive {
    path: PathBuf,
    kind: ArchiveKind,
    root: PathBuf,
    scratch: Option<TempDir>,
}

impl ReportArchive {
    /// Opens `path`, unpacking tarballs under `scratch_parent` (or the system
    /// temp dir).
    pub fn open(path: &Path, scratch_parent: Option<&Path>) -> Result<Self, VerifyError> {
        let kind = ArchiveKind::detect(path)
            .ok_or_else(|| VerifyError::UnsupportedArchive(path.to_path_buf()))?;

        if kind == ArchiveKind::Directory {
            debug!("Using archive directory {} as is.", path.display());
            return Ok(Self {
                path: path.to_path_buf(),
                kind,
                root: path.to_path_buf(),
                scratch: None,
            });
        }

        let scratch = match scratch_parent {
            Some(parent) => tempfile::Builder::new().prefix("cleancheck-").tempdir_in(parent)?,
            None => tempfile::Builder::new().prefix("cleancheck-").tempdir()?,
        };
        let file = File::open(path)?;
        let entries = match kind {
            ArchiveKind::Tar => unpack(file, scratch.path())?,
            ArchiveKind::TarGz => unpack(GzDecoder::new(file), scratch.path())?,
            ArchiveKind::TarXz => unpack(XzDecoder::new(file), scratch.path())?,
            ArchiveKind::Directory => unreachable!("directories are handled above"),
        };
        info!("Unpacked {} entries from {} into {}.", entries, path.display(), scratch.path().display());

        let root = content_root(scratch.path())?;
        Ok(Self {
            path: path.to_path_buf(),
            kind,
            root,
            scratch: Some(scratch),
        })
    }

    pub fn kind(&self) -> ArchiveKind {
        self.kind
    }

    /// Directory holding the report files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Reads a file relative to the content root, lossily decoded.
    pub fn read_log(&self, rel: &Path) -> Result<String, VerifyError> {
        let bytes = fs::read(self.root.join(rel))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Leaves the unpacked tree on disk and returns where it is.
    pub fn keep(mut self) -> PathBuf {
        if let Some(scratch) = self.scratch.take() {
            let kept = scratch.keep();
            info!("Kept unpacked archive at {}.", kept.display());
        }
        self.root.clone()
    }
}

fn unpack<R: Read>(reader: R, dest: &Path) -> Result<usize, VerifyError> {
    let mut archive = Archive::new(reader);
    archive.set_preserve_permissions(false);
    let mut count = 0usize;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_path = entry.path()?.to_string_lossy().into_owned();
        if !entry.unpack_in(dest)? {
            return Err(VerifyError::UnsafeArchiveEntry(entry_path));
        }
        count += 1;
    }
    Ok(count)
}

/// The single top-level directory, if that is all there is.
fn content_root(dest: &Path) -> Result<PathBuf, VerifyError> {
    let mut children = fs::read_dir(dest)?.collect::<Result<Vec<_>, _>>()?;
    if children.len() == 1 && children[0].file_type()?.is_dir() {
        if let Some(only) = children.pop() {
            return Ok(only.path());
        }
    }
    Ok(dest.to_path_buf())
}
