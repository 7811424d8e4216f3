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

//! Persistence of packages touched by the builder.

use crate::files::{BuilderModifiedFiles, Package};
use std::path::{Path, PathBuf};

/// Saves, deletes and submits packages on behalf of the builder.
///
/// Every method reports failure with `false` after logging the reason.
pub trait SourceControlHelper {
    /// Writes `package`, checking it out or marking it for add as needed.
    fn save(&mut self, package: &Package) -> bool;

    /// Deletes the file at `path`, relative to the workspace root.
    fn delete(&mut self, path: &Path) -> bool;

    /// Discards local changes made to `paths`.
    fn revert(&mut self, paths: &[PathBuf]) -> bool;

    /// Waits for pending writes to complete.
    fn flush(&mut self) -> bool {
        true
    }

    /// Checks in `files` as one change with `description`.
    fn submit(&mut self, files: &BuilderModifiedFiles, description: &str) -> bool;
}
