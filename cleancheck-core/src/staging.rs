//! Temporary replacement of collaborator files for the duration of a run.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs;
use std::path::PathBuf;

use crate::config::StagedFile;

/// What was at a destination before staging.
#[derive(Debug)]
enum Original {
    Content(Vec<u8>),
    Absent { created_dirs: Vec<PathBuf> },
}

#[derive(Debug)]
struct Slot {
    dest: PathBuf,
    original: Original,
}

/// Installs staged files and puts the originals back on `restore` or drop.
#[derive(Debug, Default)]
pub struct FileStager {
    slots: Vec<Slot>,
}

impl FileStager {
    /// Stages every entry in order. On error, anything already staged is
    /// restored before returning.
    pub fn stage(entries: &[StagedFile]) -> Result<Self> {
        let mut stager = FileStager::default();
        for entry in entries {
            if let Err(e) = stager.stage_one(entry) {
                stager.restore();
                return Err(e);
            }
        }
        Ok(stager)
    }

    fn stage_one(&mut self, entry: &StagedFile) -> Result<()> {
        let content = match &entry.source {
            Some(src) => fs::read(src)
                .with_context(|| format!("Failed to read staged source {}", src.display()))?,
            None => Vec::new(),
        };

        let original = if entry.dest.exists() {
            Original::Content(
                fs::read(&entry.dest)
                    .with_context(|| format!("Failed to back up {}", entry.dest.display()))?,
            )
        } else {
            Original::Absent {
                created_dirs: create_missing_parents(&entry.dest)?,
            }
        };

        fs::write(&entry.dest, &content)
            .with_context(|| format!("Failed to stage {}", entry.dest.display()))?;
        debug!("Staged {} ({} bytes).", entry.dest.display(), content.len());

        self.slots.push(Slot {
            dest: entry.dest.clone(),
            original,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Puts every original back, newest first. Idempotent.
    pub fn restore(&mut self) {
        while let Some(slot) = self.slots.pop() {
            let result = match &slot.original {
                Original::Content(bytes) => fs::write(&slot.dest, bytes),
                Original::Absent { created_dirs } => {
                    let removed = fs::remove_file(&slot.dest);
                    for dir in created_dirs.iter().rev() {
                        let _ = fs::remove_dir(dir);
                    }
                    removed
                }
            };
            match result {
                Ok(()) => debug!("Restored {}.", slot.dest.display()),
                Err(e) => warn!("Failed to restore {}: {}", slot.dest.display(), e),
            }
        }
    }
}

impl Drop for FileStager {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Creates the missing ancestors of `dest`, returning them outermost first.
fn create_missing_parents(dest: &std::path::Path) -> Result<Vec<PathBuf>> {
    let mut missing = Vec::new();
    let mut cursor = dest.parent();
    while let Some(dir) = cursor {
        if dir.as_os_str().is_empty() || dir.exists() {
            break;
        }
        missing.push(dir.to_path_buf());
        cursor = dir.parent();
    }
    missing.reverse();
    for dir in &missing {
        fs::create_dir(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn existing_file_is_emptied_then_restored() -> Result<()> {
        let dir = tempdir()?;
        let dest = dir.path().join("default_mapping");
        fs::write(&dest, b"{\"hostname_map\": {\"a\": \"b\"}}")?;

        let mut stager = FileStager::stage(&[StagedFile { source: None, dest: dest.clone() }])?;
        assert_eq!(fs::read(&dest)?, b"");
        stager.restore();
        assert!(fs::read_to_string(&dest)?.contains("hostname_map"));
        Ok(())
    }

    #[test]
    fn absent_file_and_parents_are_removed_on_drop() -> Result<()> {
        let dir = tempdir()?;
        let dest = dir.path().join("etc/sos/cleaner/default_mapping");
        {
            let stager = FileStager::stage(&[StagedFile { source: None, dest: dest.clone() }])?;
            assert_eq!(stager.len(), 1);
            assert!(dest.exists());
        }
        assert!(!dest.exists());
        assert!(!dir.path().join("etc").exists());
        Ok(())
    }

    #[test]
    fn source_content_is_installed() -> Result<()> {
        let dir = tempdir()?;
        let src = dir.path().join("fixture");
        let dest = dir.path().join("target");
        fs::write(&src, b"fixture-content")?;
        let _stager = FileStager::stage(&[StagedFile { source: Some(src), dest: dest.clone() }])?;
        assert_eq!(fs::read(&dest)?, b"fixture-content");
        Ok(())
    }

    #[test]
    fn failed_stage_rolls_back_earlier_entries() -> Result<()> {
        let dir = tempdir()?;
        let first = dir.path().join("first");
        fs::write(&first, b"keep me")?;
        let entries = [
            StagedFile { source: None, dest: first.clone() },
            StagedFile { source: Some(dir.path().join("missing")), dest: dir.path().join("second") },
        ];
        assert!(FileStager::stage(&entries).is_err());
        assert_eq!(fs::read(&first)?, b"keep me");
        Ok(())
    }
}
