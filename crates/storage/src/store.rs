// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable storage of session records as individually-named files
//! (`work-<id>.json`) in a per-project sessions directory.
//!
//! Writes are atomic: serialize to a staging file in the same directory,
//! `sync_all`, then rename-replace the target. On the same filesystem a
//! rename is atomic, so a reader never observes a partially written file;
//! concurrent writers to distinct ids cannot corrupt each other, and on the
//! same id the last rename wins.

use orc_core::{Session, SessionId};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse session record at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

const FILE_PREFIX: &str = "work-";
const FILE_SUFFIX: &str = ".json";

/// File-backed session store rooted at a per-project sessions directory.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &SessionId) -> PathBuf {
        self.dir.join(format!("{FILE_PREFIX}{}{FILE_SUFFIX}", id.as_str()))
    }

    fn io_err(path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Persist `session` atomically under its own id.
    pub fn save(&self, session: &Session) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| Self::io_err(&self.dir, e))?;
        let path = self.path_for(&session.id);
        let tmp_path = self.dir.join(format!(
            "{FILE_PREFIX}{}.tmp-{}",
            session.id.as_str(),
            std::process::id()
        ));

        {
            let file = File::create(&tmp_path).map_err(|e| Self::io_err(&tmp_path, e))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, session).map_err(|e| StoreError::Parse {
                path: tmp_path.clone(),
                source: e,
            })?;
            let file = writer
                .into_inner()
                .map_err(|e| Self::io_err(&tmp_path, e.into_error()))?;
            file.sync_all().map_err(|e| Self::io_err(&tmp_path, e))?;
        }

        fs::rename(&tmp_path, &path).map_err(|e| Self::io_err(&path, e))?;
        Ok(())
    }

    /// Load the record for `id`, if present. A malformed record surfaces as
    /// [`StoreError::Parse`]; callers doing bulk listing should treat that
    /// as "drop this one, keep going" per the permissive-reads error policy.
    pub fn load(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(&path).map_err(|e| Self::io_err(&path, e))?;
        let reader = BufReader::new(file);
        let session: Session = serde_json::from_reader(reader).map_err(|e| StoreError::Parse {
            path: path.clone(),
            source: e,
        })?;
        Ok(Some(session.canonicalize()))
    }

    pub fn exists(&self, id: &SessionId) -> bool {
        self.path_for(id).exists()
    }

    pub fn delete(&self, id: &SessionId) -> Result<(), StoreError> {
        let path = self.path_for(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_err(&path, e)),
        }
    }

    /// All records whose filename matches the `work-*.json` convention.
    /// Malformed individual records are skipped, not fatal to the listing.
    pub fn list_all(&self) -> Result<Vec<Session>, StoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(|e| Self::io_err(&self.dir, e))? {
            let entry = entry.map_err(|e| Self::io_err(&self.dir, e))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with(FILE_PREFIX) || !name.ends_with(FILE_SUFFIX) {
                continue;
            }
            let path = entry.path();
            let file = match File::open(&path) {
                Ok(f) => f,
                Err(_) => continue,
            };
            let reader = BufReader::new(file);
            match serde_json::from_reader::<_, Session>(reader) {
                Ok(session) => out.push(session.canonicalize()),
                Err(_) => continue,
            }
        }
        out.sort_by_key(|s| s.issue.number);
        Ok(out)
    }

    /// Records whose status is not terminal (`complete`/`cancelled`).
    pub fn list_active(&self) -> Result<Vec<Session>, StoreError> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|s| !s.status.is_terminal())
            .collect())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
