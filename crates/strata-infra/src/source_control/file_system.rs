// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A source control helper working directly on the file system.
//!
//! Saves and deletes touch the workspace immediately. The original content
//! of every touched file is kept in memory until it is submitted, so local
//! changes can be reverted. Submitting appends a change record to a JSON
//! change list.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use strata_core::{BuilderModifiedFiles, FileAction, Package, SourceControlHelper};

/// Location of the change list, relative to the workspace root.
pub const CHANGE_LIST_PATH: &str = "Saved/SourceControl/Changes.json";

/// One submitted change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Sequential change number, starting at 1.
    pub id: u64,
    /// Change description.
    pub description: String,
    /// Files added, relative to the root, with forward slashes.
    pub added: Vec<String>,
    /// Files edited.
    pub edited: Vec<String>,
    /// Files deleted.
    pub deleted: Vec<String>,
}

/// A [`SourceControlHelper`] over a plain directory.
#[derive(Debug)]
pub struct FileSystemSourceControl {
    root: PathBuf,
    /// Content before the first local change, `None` if the file did not exist.
    originals: HashMap<PathBuf, Option<Vec<u8>>>,
}

fn to_record_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

impl FileSystemSourceControl {
    /// Creates a helper rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            originals: HashMap::new(),
        }
    }

    /// The workspace root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Files changed locally and not yet submitted or reverted.
    pub fn pending(&self) -> Vec<&Path> {
        let mut pending: Vec<&Path> = self.originals.keys().map(PathBuf::as_path).collect();
        pending.sort();
        pending
    }

    /// Reads every submitted change.
    pub fn submitted_changes(&self) -> io::Result<Vec<ChangeRecord>> {
        let path = self.root.join(CHANGE_LIST_PATH);
        if !path.is_file() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&path)?;
        serde_json::from_str(&text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn remember_original(&mut self, relative: &Path) -> io::Result<()> {
        if self.originals.contains_key(relative) {
            return Ok(());
        }
        let absolute = self.root.join(relative);
        let original = if absolute.is_file() {
            Some(fs::read(&absolute)?)
        } else {
            None
        };
        self.originals.insert(relative.to_path_buf(), original);
        Ok(())
    }

    fn try_save(&mut self, package: &Package) -> io::Result<()> {
        self.remember_original(&package.path)?;
        let absolute = self.root.join(&package.path);
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&absolute, &package.bytes)
    }

    fn try_delete(&mut self, path: &Path) -> io::Result<bool> {
        let absolute = self.root.join(path);
        if !absolute.exists() {
            return Ok(false);
        }
        self.remember_original(path)?;
        fs::remove_file(&absolute)?;
        Ok(true)
    }

    fn try_revert(&mut self, path: &Path) -> io::Result<()> {
        let Some(original) = self.originals.remove(path) else {
            return Ok(());
        };
        let absolute = self.root.join(path);
        match original {
            Some(bytes) => {
                if let Some(parent) = absolute.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&absolute, bytes)
            }
            None if absolute.exists() => fs::remove_file(&absolute),
            None => Ok(()),
        }
    }

    fn try_submit(&mut self, files: &BuilderModifiedFiles, description: &str) -> io::Result<u64> {
        let mut changes = self.submitted_changes()?;
        let id = changes.last().map_or(1, |change| change.id + 1);
        let list = |action: FileAction| -> Vec<String> {
            files.get(action).iter().map(|p| to_record_path(p)).collect()
        };
        changes.push(ChangeRecord {
            id,
            description: description.to_string(),
            added: list(FileAction::Add),
            edited: list(FileAction::Edit),
            deleted: list(FileAction::Delete),
        });

        let path = self.root.join(CHANGE_LIST_PATH);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(&changes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&path, text)?;

        for (_, file) in files.iter() {
            self.originals.remove(file);
        }
        Ok(id)
    }
}

impl SourceControlHelper for FileSystemSourceControl {
    fn save(&mut self, package: &Package) -> bool {
        match self.try_save(package) {
            Ok(()) => {
                log::debug!("[HLODBuilder] Saved '{}'", package.path.display());
                true
            }
            Err(e) => {
                log::error!("[HLODBuilder] Failed to save '{}': {}", package.path.display(), e);
                false
            }
        }
    }

    fn delete(&mut self, path: &Path) -> bool {
        match self.try_delete(path) {
            Ok(deleted) => {
                if deleted {
                    log::debug!("[HLODBuilder] Deleted '{}'", path.display());
                }
                true
            }
            Err(e) => {
                log::error!("[HLODBuilder] Failed to delete '{}': {}", path.display(), e);
                false
            }
        }
    }

    fn revert(&mut self, paths: &[PathBuf]) -> bool {
        let mut ok = true;
        for path in paths {
            if let Err(e) = self.try_revert(path) {
                log::error!("[HLODBuilder] Failed to revert '{}': {}", path.display(), e);
                ok = false;
            }
        }
        ok
    }

    fn submit(&mut self, files: &BuilderModifiedFiles, description: &str) -> bool {
        if files.is_empty() {
            log::info!("[HLODBuilder] Nothing to submit");
            return true;
        }
        match self.try_submit(files, description) {
            Ok(id) => {
                log::info!("[HLODBuilder] Submitted change {} with {} files", id, files.len());
                true
            }
            Err(e) => {
                log::error!("[HLODBuilder] Failed to submit {} files: {}", files.len(), e);
                false
            }
        }
    }
}
