//! Crash-safe file rewriting.
//!
//! A rewrite copies the original to `<path>.bak`, streams new content into
//! `<path>.tmp`, and renames the temporary file over the original. The backup
//! is removed on success and renamed back into place on any failure, so the
//! original path always holds either the old or the new content in full.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::domain::errors::CommentError;

pub const BACKUP_SUFFIX: &str = ".bak";
pub const TEMP_SUFFIX: &str = ".tmp";

/// `path` with `suffix` appended to its final component.
pub fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Rewrite `path` with whatever `write` produces.
///
/// `write` may fail at any point; the original content is then restored and
/// its error returned unchanged.
pub fn rewrite<T, F>(path: &Path, write: F) -> Result<T, CommentError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<T, CommentError>,
{
    let mut staged = StagedRewrite::new(path)?;
    tracing::trace!(
        path = %path.display(),
        backup = %staged.backup.display(),
        "backup created"
    );

    match staged.write_and_swap(write) {
        Ok(value) => {
            staged.discard_backup();
            Ok(value)
        }
        Err(err) => {
            staged.restore();
            Err(err)
        }
    }
}

struct StagedRewrite {
    path: PathBuf,
    backup: PathBuf,
    temp: PathBuf,
    permissions: fs::Permissions,
    temp_created: bool,
}

impl StagedRewrite {
    fn new(path: &Path) -> Result<Self, CommentError> {
        let backup = sibling(path, BACKUP_SUFFIX);
        let temp = sibling(path, TEMP_SUFFIX);
        for artifact in [&backup, &temp] {
            if fs::symlink_metadata(artifact).is_ok() {
                return Err(CommentError::ArtifactExists(artifact.clone()));
            }
        }

        let permissions = fs::metadata(path)
            .map_err(|err| CommentError::io("failed to read file metadata", err))?
            .permissions();

        if let Err(err) = fs::copy(path, &backup) {
            let _ = fs::remove_file(&backup);
            return Err(CommentError::io(
                format!("failed to create backup {}", backup.display()),
                err,
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            backup,
            temp,
            permissions,
            temp_created: false,
        })
    }

    fn write_and_swap<T, F>(&mut self, write: F) -> Result<T, CommentError>
    where
        F: FnOnce(&mut BufWriter<File>) -> Result<T, CommentError>,
    {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.temp)
            .map_err(|err| {
                CommentError::io(format!("failed to create {}", self.temp.display()), err)
            })?;
        self.temp_created = true;

        let mut writer = BufWriter::new(file);
        let value = write(&mut writer)?;

        let file = writer
            .into_inner()
            .map_err(|err| err.into_error())
            .and_then(|file| file.sync_all().map(|()| file))
            .map_err(|err| {
                CommentError::io(format!("failed to flush {}", self.temp.display()), err)
            })?;
        drop(file);

        fs::set_permissions(&self.temp, self.permissions.clone()).map_err(|err| {
            CommentError::io(
                format!("failed to copy permissions to {}", self.temp.display()),
                err,
            )
        })?;

        fs::rename(&self.temp, &self.path).map_err(|err| {
            CommentError::io(
                format!("failed to move {} into place", self.temp.display()),
                err,
            )
        })?;

        Ok(value)
    }

    fn discard_backup(&self) {
        if let Err(err) = fs::remove_file(&self.backup) {
            tracing::warn!(
                backup = %self.backup.display(),
                error = %err,
                "failed to remove backup after rewrite"
            );
        }
    }

    // Renaming the backup over the original replaces it atomically, so the
    // original path is never missing while it is restored. A temp file this
    // run did not create belongs to someone else and is left alone.
    fn restore(&self) {
        if self.temp_created
            && let Err(err) = fs::remove_file(&self.temp)
            && err.kind() != io::ErrorKind::NotFound
        {
            tracing::warn!(
                temp = %self.temp.display(),
                error = %err,
                "failed to remove temp file"
            );
        }

        match fs::rename(&self.backup, &self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "restored original from backup"),
            Err(err) => tracing::warn!(
                path = %self.path.display(),
                backup = %self.backup.display(),
                error = %err,
                "failed to restore backup; original content is kept in the backup file"
            ),
        }
    }
}

/// Flush a writer, mapping the failure into the engine's error type.
pub fn flush<W: Write + ?Sized>(writer: &mut W, what: &str) -> Result<(), CommentError> {
    match writer.flush() {
        Ok(()) => Ok(()),
        Err(err) => Err(CommentError::io(format!("failed to flush {what}"), err)),
    }
}
