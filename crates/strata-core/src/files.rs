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

//! Packages and the bookkeeping of files touched by a builder run.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// A serialized package ready to be written, addressed relative to the
/// workspace root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// Path relative to the workspace root.
    pub path: PathBuf,
    /// Encoded contents.
    pub bytes: Vec<u8>,
}

/// The action a builder performed on a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileAction {
    /// The file did not exist before.
    Add,
    /// The file existed and was rewritten.
    Edit,
    /// The file was removed.
    Delete,
}

impl FileAction {
    /// All actions, in staging order.
    pub const ALL: [FileAction; 3] = [FileAction::Add, FileAction::Edit, FileAction::Delete];

    /// Name of the staging folder for this action.
    pub fn folder_name(self) -> &'static str {
        match self {
            FileAction::Add => "Add",
            FileAction::Edit => "Edit",
            FileAction::Delete => "Delete",
        }
    }
}

/// Files added, edited and deleted during a builder run, relative to the
/// workspace root.
///
/// Recording the same file several times folds the actions together, so the
/// three sets stay disjoint and describe the net change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuilderModifiedFiles {
    added: BTreeSet<PathBuf>,
    edited: BTreeSet<PathBuf>,
    deleted: BTreeSet<PathBuf>,
}

impl BuilderModifiedFiles {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `action` on `path`.
    pub fn record(&mut self, action: FileAction, path: impl Into<PathBuf>) {
        let path = path.into();
        match action {
            FileAction::Add => {
                if self.deleted.remove(&path) {
                    self.edited.insert(path);
                } else if !self.edited.contains(&path) {
                    self.added.insert(path);
                }
            }
            FileAction::Edit => {
                if self.deleted.remove(&path) {
                    self.edited.insert(path);
                } else if !self.added.contains(&path) {
                    self.edited.insert(path);
                }
            }
            FileAction::Delete => {
                if !self.added.remove(&path) {
                    self.edited.remove(&path);
                    self.deleted.insert(path);
                }
            }
        }
    }

    /// Folds every action of `other` into this set.
    pub fn append(&mut self, other: &BuilderModifiedFiles) {
        for (action, path) in other.iter() {
            self.record(action, path.to_path_buf());
        }
    }

    /// Files of one category.
    pub fn get(&self, action: FileAction) -> &BTreeSet<PathBuf> {
        match action {
            FileAction::Add => &self.added,
            FileAction::Edit => &self.edited,
            FileAction::Delete => &self.deleted,
        }
    }

    /// Every recorded file with its action, added first, deleted last.
    pub fn iter(&self) -> impl Iterator<Item = (FileAction, &Path)> {
        FileAction::ALL
            .into_iter()
            .flat_map(move |action| self.get(action).iter().map(move |p| (action, p.as_path())))
    }

    /// The action recorded for `path`, if any.
    pub fn action_of(&self, path: &Path) -> Option<FileAction> {
        FileAction::ALL
            .into_iter()
            .find(|action| self.get(*action).contains(path))
    }

    /// Keeps only the files accepted by `keep`, returning the removed ones.
    pub fn split_off(&mut self, mut keep: impl FnMut(&Path) -> bool) -> BuilderModifiedFiles {
        let mut removed = BuilderModifiedFiles::new();
        for action in FileAction::ALL {
            let set = match action {
                FileAction::Add => &mut self.added,
                FileAction::Edit => &mut self.edited,
                FileAction::Delete => &mut self.deleted,
            };
            let (kept, dropped): (BTreeSet<PathBuf>, BTreeSet<PathBuf>) =
                std::mem::take(set).into_iter().partition(|p| keep(p));
            *set = kept;
            for path in dropped {
                removed.record(action, path);
            }
        }
        removed
    }

    /// Total number of files.
    pub fn len(&self) -> usize {
        self.added.len() + self.edited.len() + self.deleted.len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets every recorded file.
    pub fn clear(&mut self) {
        self.added.clear();
        self.edited.clear();
        self.deleted.clear();
    }
}
