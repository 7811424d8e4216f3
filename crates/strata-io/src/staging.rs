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

//! File staging between hosts of a distributed build.
//!
//! A staging folder replays a [`BuilderModifiedFiles`] set with the layout
//! `<working dir>/<folder>/<Add|Edit|Delete>/<path relative to root>`.
//! Deleted files are staged as empty placeholders.
//!
//! Staging to a working directory is all-or-nothing: files are copied into a
//! temporary sibling folder which replaces the target once every copy
//! succeeded.

use crate::error::StagingError;
use std::fs;
use std::path::{Component, Path, PathBuf};
use strata_core::{BuilderModifiedFiles, FileAction};
use strata_telemetry::ScopedTimer;
use walkdir::WalkDir;

/// Staging folder of files to submit that no builder owns.
pub const TO_SUBMIT_FOLDER: &str = "ToSubmit";

/// Staging folder of one builder.
pub fn builder_folder(builder_index: usize) -> String {
    format!("HLODBuilder{}", builder_index)
}

fn check_relative(path: &Path) -> Result<(), StagingError> {
    let is_relative = path
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
    if is_relative && path.components().next().is_some() {
        Ok(())
    } else {
        Err(StagingError::InvalidPath(path.to_path_buf()))
    }
}

fn io_error(
    operation: &'static str,
    from: &Path,
    to: &Path,
) -> impl FnOnce(std::io::Error) -> StagingError {
    let from = from.to_path_buf();
    let to = to.to_path_buf();
    move |source| {
        log::error!(
            "[Staging] Failed to {} '{}' -> '{}': {}",
            operation,
            from.display(),
            to.display(),
            source
        );
        StagingError::Io {
            operation,
            from,
            to,
            source,
        }
    }
}

fn create_parent(path: &Path) -> Result<(), StagingError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error("create folder", parent, parent))?;
    }
    Ok(())
}

/// Stages `files`, relative to `root`, into `<working_dir>/<folder>`.
///
/// Any previous content of the folder is replaced. Returns the staged
/// files relative to `working_dir`, ready for the build-products file. On
/// failure the previous folder is left untouched.
pub fn copy_files_to_working_dir(
    root: &Path,
    working_dir: &Path,
    folder: &str,
    files: &BuilderModifiedFiles,
) -> Result<Vec<PathBuf>, StagingError> {
    let _timer = ScopedTimer::with_level(format!("[Staging] Staging '{}'", folder), log::Level::Debug);
    fs::create_dir_all(working_dir)
        .map_err(io_error("create folder", working_dir, working_dir))?;
    let staging = tempfile::Builder::new()
        .prefix(&format!(".{}.", folder))
        .tempdir_in(working_dir)
        .map_err(io_error("create temporary folder", working_dir, working_dir))?;

    let mut staged = Vec::with_capacity(files.len());
    for (action, relative) in files.iter() {
        check_relative(relative)?;
        let destination = staging.path().join(action.folder_name()).join(relative);
        create_parent(&destination)?;

        match action {
            FileAction::Add | FileAction::Edit => {
                let source = root.join(relative);
                if !source.is_file() {
                    log::error!("[Staging] File to stage '{}' does not exist", source.display());
                    return Err(StagingError::MissingSource(source));
                }
                fs::copy(&source, &destination).map_err(io_error("copy", &source, &destination))?;
            }
            FileAction::Delete => {
                fs::write(&destination, b"")
                    .map_err(io_error("write placeholder", relative, &destination))?;
            }
        }
        staged.push(Path::new(folder).join(action.folder_name()).join(relative));
    }

    let target = working_dir.join(folder);
    if target.exists() {
        fs::remove_dir_all(&target).map_err(io_error("remove", &target, &target))?;
    }
    fs::rename(staging.path(), &target).map_err(io_error("rename", staging.path(), &target))?;

    log::info!(
        "[Staging] Staged {} files into '{}'",
        staged.len(),
        target.display()
    );
    Ok(staged)
}

/// Replays `<working_dir>/<folder>` onto `root`: staged additions and edits
/// are copied over, placeholders delete their file.
///
/// Returns the replayed actions. A missing folder replays nothing.
pub fn copy_files_from_working_dir(
    root: &Path,
    working_dir: &Path,
    folder: &str,
) -> Result<BuilderModifiedFiles, StagingError> {
    let source_root = working_dir.join(folder);
    let mut replayed = BuilderModifiedFiles::new();
    if !source_root.is_dir() {
        log::debug!(
            "[Staging] Nothing staged in '{}'",
            source_root.display()
        );
        return Ok(replayed);
    }

    for action in FileAction::ALL {
        let action_root = source_root.join(action.folder_name());
        if !action_root.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&action_root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&action_root)
                .map_err(|_| StagingError::InvalidPath(entry.path().to_path_buf()))?
                .to_path_buf();
            let destination = root.join(&relative);

            match action {
                FileAction::Add | FileAction::Edit => {
                    create_parent(&destination)?;
                    fs::copy(entry.path(), &destination)
                        .map_err(io_error("copy", entry.path(), &destination))?;
                }
                FileAction::Delete => {
                    if destination.exists() {
                        fs::remove_file(&destination)
                            .map_err(io_error("delete", entry.path(), &destination))?;
                    }
                }
            }
            replayed.record(action, relative);
        }
    }

    log::info!(
        "[Staging] Replayed {} files from '{}'",
        replayed.len(),
        source_root.display()
    );
    Ok(replayed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_folder_name() {
        assert_eq!(builder_folder(3), "HLODBuilder3");
    }

    #[test]
    fn test_only_plain_relative_paths_are_staged() {
        assert!(check_relative(Path::new("ExternalActors/Main/A.ron")).is_ok());
        assert!(check_relative(Path::new("../outside.ron")).is_err());
        assert!(check_relative(Path::new("")).is_err());
        #[cfg(unix)]
        assert!(check_relative(Path::new("/etc/passwd")).is_err());
    }
}
