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

//! Everything a builder run works on, passed explicitly to each step.

use super::BuilderError;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use strata_core::{
    ActorDescriptor, ActorGuid, BuilderModifiedFiles, FileAction, HlodUtilities, RuntimeHash,
    SourceControlHelper, WorldDescriptor,
};
use strata_io::{actor_package, actor_package_path, decode_actor};

/// The state shared by the steps of one builder run.
///
/// The world is the in-memory view of the workspace under `root`: every
/// package saved or deleted through the context is mirrored in it.
pub struct OrchestratorContext<'a> {
    root: PathBuf,
    world: WorldDescriptor,
    runtime_hash: Option<&'a dyn RuntimeHash>,
    hlod_utilities: Option<&'a dyn HlodUtilities>,
    source_control: &'a mut dyn SourceControlHelper,
    cancel: Arc<AtomicBool>,
    modified: BuilderModifiedFiles,
    pub(crate) valid_hlod_actors: Option<BTreeSet<ActorGuid>>,
}

impl<'a> OrchestratorContext<'a> {
    /// Creates a context over `world`, loaded from `root`.
    pub fn new(
        root: impl Into<PathBuf>,
        world: WorldDescriptor,
        source_control: &'a mut dyn SourceControlHelper,
    ) -> Self {
        Self {
            root: root.into(),
            world,
            runtime_hash: None,
            hlod_utilities: None,
            source_control,
            cancel: Arc::new(AtomicBool::new(false)),
            modified: BuilderModifiedFiles::new(),
            valid_hlod_actors: None,
        }
    }

    /// Sets the runtime hash used by setup.
    #[must_use]
    pub fn with_runtime_hash(mut self, runtime_hash: &'a dyn RuntimeHash) -> Self {
        self.runtime_hash = Some(runtime_hash);
        self
    }

    /// Sets the HLOD utilities used by setup and build.
    #[must_use]
    pub fn with_hlod_utilities(mut self, hlod_utilities: &'a dyn HlodUtilities) -> Self {
        self.hlod_utilities = Some(hlod_utilities);
        self
    }

    /// Shares `cancel` as the cancellation flag, checked between builds.
    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// The workspace root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The world as currently known.
    pub fn world(&self) -> &WorldDescriptor {
        &self.world
    }

    /// The cancellation flag.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Returns `true` once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Files touched and not yet submitted or handed over.
    pub fn modified_files(&self) -> &BuilderModifiedFiles {
        &self.modified
    }

    pub(crate) fn modified_mut(&mut self) -> &mut BuilderModifiedFiles {
        &mut self.modified
    }

    pub(crate) fn source_control(&mut self) -> &mut dyn SourceControlHelper {
        &mut *self.source_control
    }

    pub(crate) fn runtime_hash(&self) -> Result<&'a dyn RuntimeHash, BuilderError> {
        self.runtime_hash
            .ok_or(BuilderError::MissingCollaborator("runtime hash"))
    }

    pub(crate) fn hlod_utilities(&self) -> Result<&'a dyn HlodUtilities, BuilderError> {
        self.hlod_utilities
            .ok_or(BuilderError::MissingCollaborator("HLOD utilities"))
    }

    /// Looks up an actor of the top-level containers.
    pub fn find_actor(&self, guid: &ActorGuid) -> Option<&ActorDescriptor> {
        self.world
            .containers
            .iter()
            .flat_map(|container| container.actors.iter())
            .find(|actor| actor.guid == *guid)
    }

    /// Saves `actor` through source control and mirrors it in the world.
    pub(crate) fn save_actor(&mut self, actor: ActorDescriptor) -> Result<FileAction, BuilderError> {
        let package = actor_package(&actor)?;
        let action = if self.root.join(&package.path).is_file() {
            FileAction::Edit
        } else {
            FileAction::Add
        };
        if !self.source_control.save(&package) {
            return Err(BuilderError::SourceControl {
                operation: "save",
                path: Some(package.path),
            });
        }
        self.modified.record(action, package.path);
        self.upsert_actor(actor);
        Ok(action)
    }

    /// Deletes the package of `guid` through source control and drops the
    /// actor from the world.
    pub(crate) fn delete_actor(&mut self, guid: &ActorGuid) -> Result<(), BuilderError> {
        let Some(actor) = self.find_actor(guid) else {
            return Err(BuilderError::UnknownActor(*guid));
        };
        let path = actor_package_path(&actor.package, actor.guid);
        if !self.source_control.delete(&path) {
            return Err(BuilderError::SourceControl {
                operation: "delete",
                path: Some(path),
            });
        }
        self.modified.record(FileAction::Delete, path);
        self.remove_actor(guid);
        Ok(())
    }

    /// Deletes a whole child container and every actor package it holds.
    pub(crate) fn delete_child_container(&mut self, package: &str) -> Result<usize, BuilderError> {
        let Some(container) = self.world.child_containers.remove(package) else {
            return Ok(0);
        };
        for actor in &container.actors {
            let path = actor_package_path(&container.package, actor.guid);
            if !self.source_control.delete(&path) {
                return Err(BuilderError::SourceControl {
                    operation: "delete",
                    path: Some(path),
                });
            }
            self.modified.record(FileAction::Delete, path);
        }
        Ok(container.actors.len())
    }

    /// Mirrors files replayed from a staging folder in the world and records
    /// them as modified.
    pub(crate) fn apply_replayed(&mut self, replayed: &BuilderModifiedFiles) -> Result<(), BuilderError> {
        for (action, relative) in replayed.iter() {
            match action {
                FileAction::Add | FileAction::Edit => {
                    let path = self.root.join(relative);
                    let bytes = fs::read(&path).map_err(|source| BuilderError::Io {
                        path: path.clone(),
                        source,
                    })?;
                    let mut actor = decode_actor(&bytes, &path)?;
                    if let Some(package) = self.container_of_path(relative) {
                        actor.package = package;
                    }
                    self.upsert_actor(actor);
                }
                FileAction::Delete => {
                    if let Some(guid) = self.actor_of_path(relative) {
                        self.remove_actor(&guid);
                    }
                }
            }
        }
        self.modified.append(replayed);
        Ok(())
    }

    fn container_of_path(&self, relative: &Path) -> Option<String> {
        let folder = relative.parent()?;
        self.world
            .containers
            .iter()
            .find(|container| {
                actor_package_path(&container.package, ActorGuid::NIL).parent() == Some(folder)
            })
            .map(|container| container.package.clone())
    }

    fn actor_of_path(&self, relative: &Path) -> Option<ActorGuid> {
        self.world.containers.iter().find_map(|container| {
            container
                .actors
                .iter()
                .find(|actor| actor_package_path(&container.package, actor.guid) == relative)
                .map(|actor| actor.guid)
        })
    }

    fn upsert_actor(&mut self, actor: ActorDescriptor) {
        let Some(container) = self
            .world
            .containers
            .iter_mut()
            .find(|container| container.package == actor.package)
        else {
            log::warn!(
                "[HLODBuilder] No container '{}' for actor {}, it will only exist on disk",
                actor.package,
                actor.guid
            );
            return;
        };
        match container.actors.iter_mut().find(|a| a.guid == actor.guid) {
            Some(existing) => *existing = actor,
            None => {
                container.actors.push(actor);
                container.actors.sort_by_key(|a| a.guid);
            }
        }
    }

    fn remove_actor(&mut self, guid: &ActorGuid) {
        for container in &mut self.world.containers {
            container.actors.retain(|actor| actor.guid != *guid);
        }
    }
}
