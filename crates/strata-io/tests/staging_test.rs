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

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use strata_core::{BuilderModifiedFiles, FileAction};
use strata_io::{
    append_build_products, builder_folder, copy_files_from_working_dir,
    copy_files_to_working_dir, read_build_products, StagingError,
};
use tempfile::tempdir;

fn write(root: &Path, relative: &str, contents: &str) -> Result<()> {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap())?;
    fs::write(path, contents)?;
    Ok(())
}

#[test]
fn test_staging_round_trip_between_hosts() -> Result<()> {
    // --- 1. ARRANGE ---
    let source_host = tempdir()?;
    let target_host = tempdir()?;
    let working_dir = tempdir()?;

    write(source_host.path(), "ExternalActors/Main/A.ron", "added")?;
    write(source_host.path(), "ExternalActors/Main/B.ron", "edited")?;
    write(target_host.path(), "ExternalActors/Main/B.ron", "old")?;
    write(target_host.path(), "ExternalActors/Main/C.ron", "stale")?;

    let mut files = BuilderModifiedFiles::new();
    files.record(FileAction::Add, "ExternalActors/Main/A.ron");
    files.record(FileAction::Edit, "ExternalActors/Main/B.ron");
    files.record(FileAction::Delete, "ExternalActors/Main/C.ron");

    // --- 2. ACT ---
    let folder = builder_folder(0);
    let staged = copy_files_to_working_dir(source_host.path(), working_dir.path(), &folder, &files)?;
    let replayed = copy_files_from_working_dir(target_host.path(), working_dir.path(), &folder)?;

    // --- 3. ASSERT ---
    assert_eq!(staged.len(), 3);
    assert!(staged.contains(&PathBuf::from("HLODBuilder0/Delete/ExternalActors/Main/C.ron")));
    let placeholder = working_dir
        .path()
        .join("HLODBuilder0/Delete/ExternalActors/Main/C.ron");
    assert_eq!(fs::read(placeholder)?.len(), 0);

    let target = target_host.path().join("ExternalActors/Main");
    assert_eq!(fs::read_to_string(target.join("A.ron"))?, "added");
    assert_eq!(fs::read_to_string(target.join("B.ron"))?, "edited");
    assert!(!target.join("C.ron").exists());
    assert_eq!(replayed, files);
    Ok(())
}

#[test]
fn test_failed_staging_keeps_previous_folder() -> Result<()> {
    // --- 1. ARRANGE ---
    let root = tempdir()?;
    let working_dir = tempdir()?;
    write(root.path(), "A.ron", "first")?;

    let mut first = BuilderModifiedFiles::new();
    first.record(FileAction::Add, "A.ron");
    copy_files_to_working_dir(root.path(), working_dir.path(), "ToSubmit", &first)?;

    let mut second = BuilderModifiedFiles::new();
    second.record(FileAction::Edit, "A.ron");
    second.record(FileAction::Add, "Missing.ron");

    // --- 2. ACT ---
    let result = copy_files_to_working_dir(root.path(), working_dir.path(), "ToSubmit", &second);

    // --- 3. ASSERT ---
    assert!(matches!(result, Err(StagingError::MissingSource(_))));
    let previous = working_dir.path().join("ToSubmit/Add/A.ron");
    assert_eq!(fs::read_to_string(previous)?, "first");
    assert!(!working_dir.path().join("ToSubmit/Edit").exists());

    let leftovers: Vec<_> = fs::read_dir(working_dir.path())?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name() != "ToSubmit")
        .collect();
    assert!(leftovers.is_empty());
    Ok(())
}

#[test]
fn test_replaying_a_missing_folder_is_a_no_op() -> Result<()> {
    let root = tempdir()?;
    let working_dir = tempdir()?;

    let replayed = copy_files_from_working_dir(root.path(), working_dir.path(), "HLODBuilder7")?;

    assert!(replayed.is_empty());
    Ok(())
}

#[test]
fn test_paths_escaping_the_root_are_rejected() -> Result<()> {
    let root = tempdir()?;
    let working_dir = tempdir()?;
    let mut files = BuilderModifiedFiles::new();
    files.record(FileAction::Delete, "../escape.ron");

    let result = copy_files_to_working_dir(root.path(), working_dir.path(), "ToSubmit", &files);

    assert!(matches!(result, Err(StagingError::InvalidPath(_))));
    Ok(())
}

#[test]
fn test_build_products_accumulate_across_steps() -> Result<()> {
    let dir = tempdir()?;
    let products = dir.path().join("BuildProducts.txt");

    append_build_products(&products, [Path::new("HLODBuilder0/Add/A.ron")])?;
    append_build_products(
        &products,
        vec![PathBuf::from("HLODBuilder1/Edit/B.ron"), PathBuf::from("ToSubmit/Delete/C.ron")],
    )?;

    let listed = read_build_products(&products)?;
    assert_eq!(
        listed,
        vec![
            PathBuf::from("HLODBuilder0/Add/A.ron"),
            PathBuf::from("HLODBuilder1/Edit/B.ron"),
            PathBuf::from("ToSubmit/Delete/C.ron"),
        ]
    );
    Ok(())
}
