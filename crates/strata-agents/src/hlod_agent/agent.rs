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

//! The HLOD builder agent runs the setup, build, delete, finalize and stats
//! steps of a build, locally or split across several hosts.
//!
//! In a distributed build each host runs one step. Setup hands every
//! builder the files it must start from through `HLODBuilder<i>` folders of
//! the shared working directory, and everything else through `ToSubmit`.
//! Builders stage their results back into their own folder, and the
//! finalize host replays every folder before submitting.

use super::context::OrchestratorContext;
use super::settings::{BuildSteps, HlodBuilderSettings};
use super::stats::{collect_stats, write_stats};
use super::BuilderError;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use strata_core::actor::STANDALONE_HLOD_CLASS;
use strata_core::graph::topological_sort;
use strata_core::{
    ActorDescriptor, ActorGuid, BuilderModifiedFiles, ChildContainerKind, FileAction,
    HlodBuildOutcome,
};
use strata_data::{setup_hlod_actors, LogErrorHandler};
use strata_io::{
    actor_package_path, append_build_products, builder_folder, copy_files_from_working_dir,
    copy_files_to_working_dir, BuildManifest, TO_SUBMIT_FOLDER,
};
use strata_lanes::hlod_lane::validate_workload;
use strata_lanes::{HlodParenting, HlodWorkloadScheduler};
use strata_telemetry::ScopedTimer;

/// Name of the build-products file in the working directory.
pub const BUILD_PRODUCTS_FILE: &str = "BuildProducts.txt";

/// What a builder run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// HLOD actors created by setup.
    pub created: usize,
    /// HLOD actors updated by setup.
    pub updated: usize,
    /// HLOD actors setup found up to date.
    pub unchanged: usize,
    /// HLOD actors or packages removed by setup and delete.
    pub deleted: usize,
    /// Actors whose proxy was rebuilt.
    pub built: usize,
    /// Actors whose proxy was already up to date.
    pub up_to_date: usize,
    /// Files submitted by finalize.
    pub submitted: usize,
    /// Files staged into the working directory.
    pub staged: usize,
    /// Streaming generation state log, when requested.
    pub state_log: Option<String>,
    /// Stats file, when written.
    pub stats_file: Option<PathBuf>,
}

/// Drives the HLOD build steps over an [`OrchestratorContext`].
///
/// The agent owns the workload scheduler, so its dispatch offset lasts as
/// long as the agent. Workloads scheduled by setup are kept for the build
/// step of the same run.
#[derive(Debug)]
pub struct HlodBuilderAgent {
    settings: HlodBuilderSettings,
    steps: BuildSteps,
    scheduler: HlodWorkloadScheduler,
    setup_workloads: Option<Vec<Vec<ActorGuid>>>,
}

impl HlodBuilderAgent {
    /// Creates an agent, rejecting settings no step could run with.
    pub fn new(settings: HlodBuilderSettings) -> Result<Self, BuilderError> {
        if settings.builder_count == 0 {
            return Err(BuilderError::InvalidSettings(
                "the builder count must be at least 1".to_string(),
            ));
        }
        if settings.build_manifest.is_none() && settings.builder_index >= settings.builder_count {
            return Err(BuilderError::InvalidSettings(format!(
                "builder index {} is out of range for {} builders",
                settings.builder_index, settings.builder_count
            )));
        }
        if settings.distributed && settings.working_dir.is_none() {
            return Err(BuilderError::InvalidSettings(
                "a distributed build needs a working directory".to_string(),
            ));
        }
        let steps = settings.steps();
        Ok(Self {
            settings,
            steps,
            scheduler: HlodWorkloadScheduler::new(),
            setup_workloads: None,
        })
    }

    /// The settings of the agent.
    pub fn settings(&self) -> &HlodBuilderSettings {
        &self.settings
    }

    /// The steps [`run`](Self::run) executes.
    pub fn steps(&self) -> BuildSteps {
        self.steps
    }

    /// Runs every requested step in order. The first failing step aborts
    /// the run.
    pub fn run(&mut self, ctx: &mut OrchestratorContext<'_>) -> Result<RunSummary, BuilderError> {
        let _timer = ScopedTimer::new(format!("[HLODBuilder] Processing world '{}'", ctx.world().name));
        let mut summary = RunSummary::default();
        ctx.valid_hlod_actors = None;
        self.setup_workloads = None;
        if self.steps.setup {
            self.setup(ctx, &mut summary)?;
        }
        if self.steps.build {
            self.build(ctx, &mut summary)?;
        }
        if self.steps.delete {
            self.delete(ctx, &mut summary)?;
        }
        if self.steps.finalize {
            self.finalize(ctx, &mut summary)?;
        }
        if self.steps.stats {
            summary.stats_file = Some(self.dump_stats(ctx)?);
        }
        Ok(summary)
    }

    fn working_dir(&self) -> Result<&Path, BuilderError> {
        self.settings
            .working_dir
            .as_deref()
            .ok_or_else(|| BuilderError::InvalidSettings("no working directory".to_string()))
    }

    /// Creates, updates and deletes HLOD actors so the world holds exactly
    /// the ones its source actors generate.
    pub fn setup(
        &mut self,
        ctx: &mut OrchestratorContext<'_>,
        summary: &mut RunSummary,
    ) -> Result<(), BuilderError> {
        let _timer = ScopedTimer::new("[HLODBuilder] Setup");
        let runtime_hash = ctx.runtime_hash()?;
        let utilities = ctx.hlod_utilities()?;

        let mut handler = LogErrorHandler::new();
        let output = setup_hlod_actors(
            ctx.world(),
            runtime_hash,
            utilities,
            self.settings.dump_state_log,
            &mut handler,
        )?;
        if handler.reported() > 0 {
            log::warn!(
                "[HLODBuilder] Streaming generation reported {} issues",
                handler.reported()
            );
        }
        summary.state_log = output.state_log;
        check_hierarchy(&output.hlod_actors)?;

        let existing: BTreeMap<ActorGuid, ActorDescriptor> = ctx
            .world()
            .hlod_actors()
            .map(|actor| (actor.guid, actor.clone()))
            .collect();
        let mut valid = BTreeSet::new();
        let mut to_save = Vec::new();
        for mut actor in output.hlod_actors {
            valid.insert(actor.guid);
            match existing.get(&actor.guid) {
                Some(current) => {
                    let previous_hash = current.hlod.as_ref().and_then(|h| h.build_hash.clone());
                    if let Some(hlod) = actor.hlod.as_mut() {
                        hlod.build_hash = previous_hash;
                    }
                    if &actor == current {
                        summary.unchanged += 1;
                    } else {
                        summary.updated += 1;
                        to_save.push(actor);
                    }
                }
                None => {
                    summary.created += 1;
                    to_save.push(actor);
                }
            }
        }
        let stale: Vec<ActorGuid> = existing.keys().filter(|guid| !valid.contains(guid)).copied().collect();

        if self.settings.report_only {
            log::info!(
                "[HLODBuilder] Setup would create {}, update {} and delete {} HLOD actors ({} unchanged)",
                summary.created,
                summary.updated,
                stale.len(),
                summary.unchanged
            );
            for actor in &to_save {
                log::info!("[HLODBuilder]   Would save '{}' ({})", actor.label, actor.guid);
            }
            for guid in &stale {
                log::info!("[HLODBuilder]   Would delete {}", guid);
            }
            return Ok(());
        }

        for actor in to_save {
            ctx.save_actor(actor)?;
        }
        for guid in &stale {
            ctx.delete_actor(guid)?;
        }
        summary.deleted += stale.len();
        ctx.valid_hlod_actors = Some(valid);
        log::info!(
            "[HLODBuilder] Setup created {}, updated {} and deleted {} HLOD actors ({} unchanged)",
            summary.created,
            summary.updated,
            stale.len(),
            summary.unchanged
        );

        if self.settings.build_manifest.is_none() && !self.settings.distributed {
            return Ok(());
        }

        let world_actors: Vec<ActorDescriptor> = ctx.world().hlod_actors().cloned().collect();
        let workloads = self
            .scheduler
            .schedule_worlds(&[world_actors.as_slice()], &self.settings.workload_params())?;

        if let Some(path) = &self.settings.build_manifest {
            let manifest = BuildManifest::new(
                self.settings.engine_version.clone(),
                vec![ctx.world().name.clone()],
                workloads.clone(),
            );
            manifest.write(path)?;
            log::info!(
                "[HLODBuilder] Wrote build manifest for {} builders to '{}'",
                manifest.builder_count(),
                path.display()
            );
        }

        let world_workloads: Vec<Vec<ActorGuid>> = workloads
            .into_iter()
            .map(|mut per_world| per_world.pop().unwrap_or_default())
            .collect();
        if self.settings.distributed {
            summary.staged += self.hand_over_setup(ctx, &world_workloads)?;
        }
        self.setup_workloads = Some(world_workloads);
        Ok(())
    }

    /// Splits the files touched by setup between the builders and the
    /// submit folder, then discards them locally.
    fn hand_over_setup(
        &self,
        ctx: &mut OrchestratorContext<'_>,
        workloads: &[Vec<ActorGuid>],
    ) -> Result<usize, BuilderError> {
        let working_dir = self.working_dir()?.to_path_buf();
        let mut handed_over = BuilderModifiedFiles::new();
        let mut products = Vec::new();

        for (index, workload) in workloads.iter().enumerate() {
            let paths: HashSet<PathBuf> = workload
                .iter()
                .filter_map(|guid| ctx.find_actor(guid))
                .map(|actor| actor_package_path(&actor.package, actor.guid))
                .collect();
            let files = ctx.modified_mut().split_off(|path| !paths.contains(path));
            products.extend(copy_files_to_working_dir(
                ctx.root(),
                &working_dir,
                &builder_folder(index),
                &files,
            )?);
            handed_over.append(&files);
        }

        let rest = std::mem::take(ctx.modified_mut());
        products.extend(copy_files_to_working_dir(
            ctx.root(),
            &working_dir,
            TO_SUBMIT_FOLDER,
            &rest,
        )?);
        handed_over.append(&rest);

        self.publish_and_revert(ctx, &working_dir, &products, &handed_over)?;
        Ok(products.len())
    }

    fn publish_and_revert(
        &self,
        ctx: &mut OrchestratorContext<'_>,
        working_dir: &Path,
        products: &[PathBuf],
        files: &BuilderModifiedFiles,
    ) -> Result<(), BuilderError> {
        let products_path = working_dir.join(BUILD_PRODUCTS_FILE);
        append_build_products(&products_path, products).map_err(|source| BuilderError::Io {
            path: products_path.clone(),
            source,
        })?;

        let paths: Vec<PathBuf> = files.iter().map(|(_, path)| path.to_path_buf()).collect();
        if !ctx.source_control().revert(&paths) {
            return Err(BuilderError::SourceControl {
                operation: "revert",
                path: None,
            });
        }
        ctx.modified_mut().clear();
        Ok(())
    }

    /// The workload this builder was assigned ahead of the build, from the
    /// manifest or from setup in the same run. Reading it touches nothing,
    /// so a stale manifest fails the step before any file is replayed.
    fn assigned_workload(
        &self,
        ctx: &OrchestratorContext<'_>,
    ) -> Result<Option<Vec<ActorGuid>>, BuilderError> {
        let Some(path) = &self.settings.build_manifest else {
            let index = self.settings.builder_index;
            return Ok(self
                .setup_workloads
                .as_ref()
                .map(|workloads| workloads.get(index).cloned().unwrap_or_default()));
        };

        let world_name = &ctx.world().name;
        let manifest = BuildManifest::read(path)?;
        manifest.check_engine_version(&self.settings.engine_version)?;
        let Some(world_index) = manifest.worlds.iter().position(|name| name == world_name) else {
            log::error!(
                "[HLODBuilder] World '{}' is not part of the manifest '{}'",
                world_name,
                path.display()
            );
            return Err(BuilderError::WorldNotInManifest(world_name.clone()));
        };
        let workload = manifest
            .workload(self.settings.builder_index)?
            .get(world_index)
            .cloned()
            .unwrap_or_default();
        log::info!(
            "[HLODBuilder] Builder {} of {} got {} actors from '{}'",
            self.settings.builder_index,
            manifest.builder_count(),
            workload.len(),
            path.display()
        );
        Ok(Some(workload))
    }

    /// The ordered actors this builder must build: the assigned workload
    /// checked against the world, or a fresh local schedule.
    fn builder_workload(
        &mut self,
        ctx: &OrchestratorContext<'_>,
        assigned: Option<Vec<ActorGuid>>,
    ) -> Result<Vec<ActorGuid>, BuilderError> {
        let Some(workload) = assigned else {
            let workloads = self
                .scheduler
                .schedule(ctx.world().hlod_actors(), &self.settings.workload_params())?;
            return Ok(workloads
                .into_iter()
                .nth(self.settings.builder_index)
                .unwrap_or_default());
        };

        let mut actors = Vec::with_capacity(workload.len());
        for guid in &workload {
            let actor = ctx.find_actor(guid).ok_or(BuilderError::UnknownActor(*guid))?;
            actors.push(actor);
        }
        let parenting = HlodParenting::from_actors(actors, true);
        validate_workload(&workload, &parenting)?;
        Ok(workload)
    }

    /// Builds the proxies of this builder's workload, children first.
    pub fn build(
        &mut self,
        ctx: &mut OrchestratorContext<'_>,
        summary: &mut RunSummary,
    ) -> Result<(), BuilderError> {
        let _timer = ScopedTimer::new("[HLODBuilder] Build");
        let utilities = ctx.hlod_utilities()?;
        let assigned = self.assigned_workload(ctx)?;

        if self.settings.distributed {
            let working_dir = self.working_dir()?.to_path_buf();
            let replayed = copy_files_from_working_dir(
                ctx.root(),
                &working_dir,
                &builder_folder(self.settings.builder_index),
            )?;
            ctx.apply_replayed(&replayed)?;
        }

        let workload = self.builder_workload(ctx, assigned)?;
        let start = self.settings.resume_build.unwrap_or(0);
        if start > 0 {
            log::info!("[HLODBuilder] Resuming build at index {}", start);
        }

        let mut built_since_flush = 0;
        for (index, guid) in workload.iter().enumerate().skip(start) {
            if ctx.is_cancelled() {
                log::warn!(
                    "[HLODBuilder] Build cancelled, resume with index {}",
                    index
                );
                return Err(BuilderError::Cancelled {
                    resume_index: index,
                });
            }

            let actor = ctx.find_actor(guid).ok_or(BuilderError::UnknownActor(*guid))?;
            let children: Vec<&ActorDescriptor> = actor
                .hlod_children(true)
                .filter_map(|child| ctx.find_actor(child))
                .collect();
            log::debug!(
                "[HLODBuilder] [{}/{}] Building '{}'",
                index + 1,
                workload.len(),
                actor.label
            );
            let outcome = utilities.build_hlod_actor(actor, &children, self.settings.rebuild)?;

            match outcome {
                HlodBuildOutcome::Unchanged => summary.up_to_date += 1,
                HlodBuildOutcome::Rebuilt(rebuilt) => {
                    ctx.save_actor(*rebuilt)?;
                    summary.built += 1;
                    built_since_flush += 1;
                }
            }

            if self.settings.gc_interval > 0 && built_since_flush >= self.settings.gc_interval {
                built_since_flush = 0;
                if !ctx.source_control().flush() {
                    return Err(BuilderError::SourceControl {
                        operation: "flush",
                        path: None,
                    });
                }
            }
        }
        log::info!(
            "[HLODBuilder] Built {} HLOD actors, {} up to date",
            summary.built,
            summary.up_to_date
        );

        if self.settings.distributed {
            let working_dir = self.working_dir()?.to_path_buf();
            let files = ctx.modified_files().clone();
            let products = copy_files_to_working_dir(
                ctx.root(),
                &working_dir,
                &builder_folder(self.settings.builder_index),
                &files,
            )?;
            summary.staged += products.len();
            self.publish_and_revert(ctx, &working_dir, &products, &files)?;
        }
        Ok(())
    }

    /// Deletes the HLOD actors setup did not keep, or every HLOD actor and
    /// standalone HLOD container when setup did not run.
    pub fn delete(
        &mut self,
        ctx: &mut OrchestratorContext<'_>,
        summary: &mut RunSummary,
    ) -> Result<(), BuilderError> {
        let _timer = ScopedTimer::new("[HLODBuilder] Delete");
        let valid = ctx.valid_hlod_actors.clone();
        let doomed: Vec<ActorGuid> = ctx
            .world()
            .hlod_actors()
            .filter(|actor| !valid.as_ref().is_some_and(|set| set.contains(&actor.guid)))
            .map(|actor| actor.guid)
            .collect();
        for guid in &doomed {
            ctx.delete_actor(guid)?;
        }
        summary.deleted += doomed.len();

        if valid.is_none() {
            let standalone: Vec<(ActorGuid, String)> = ctx
                .world()
                .containers
                .iter()
                .flat_map(|container| container.actors.iter())
                .filter_map(|actor| {
                    let child = actor.child_container.as_ref()?;
                    let is_standalone = child.kind == ChildContainerKind::StandaloneHlod
                        || actor.is_a(STANDALONE_HLOD_CLASS);
                    is_standalone.then(|| (actor.guid, child.package.clone()))
                })
                .collect();
            for (guid, package) in standalone {
                summary.deleted += ctx.delete_child_container(&package)?;
                if ctx.find_actor(&guid).is_some() {
                    ctx.delete_actor(&guid)?;
                    summary.deleted += 1;
                }
            }
        }
        log::info!("[HLODBuilder] Deleted {} packages", summary.deleted);
        Ok(())
    }

    /// Gathers every file of the build and submits them as one change.
    pub fn finalize(
        &mut self,
        ctx: &mut OrchestratorContext<'_>,
        summary: &mut RunSummary,
    ) -> Result<(), BuilderError> {
        let _timer = ScopedTimer::new("[HLODBuilder] Finalize");
        if self.settings.distributed {
            let working_dir = self.working_dir()?.to_path_buf();
            let builder_count = match &self.settings.build_manifest {
                Some(path) if path.is_file() => BuildManifest::read(path)?.builder_count(),
                _ => self.settings.builder_count,
            };
            let folders = std::iter::once(TO_SUBMIT_FOLDER.to_string())
                .chain((0..builder_count).map(builder_folder));
            for folder in folders {
                let replayed = copy_files_from_working_dir(ctx.root(), &working_dir, &folder)?;
                ctx.apply_replayed(&replayed)?;
            }
        }

        if !ctx.source_control().flush() {
            return Err(BuilderError::SourceControl {
                operation: "flush",
                path: None,
            });
        }
        let files = ctx.modified_files().clone();
        let description = format!(
            "Rebuilt HLODs of '{}': {} added, {} edited, {} deleted",
            ctx.world().name,
            files.get(FileAction::Add).len(),
            files.get(FileAction::Edit).len(),
            files.get(FileAction::Delete).len()
        );
        if !ctx.source_control().submit(&files, &description) {
            return Err(BuilderError::SourceControl {
                operation: "submit",
                path: None,
            });
        }
        summary.submitted = files.len();
        ctx.modified_mut().clear();
        Ok(())
    }

    /// Writes the stats of every HLOD actor of the world.
    pub fn dump_stats(&self, ctx: &OrchestratorContext<'_>) -> Result<PathBuf, BuilderError> {
        let records = collect_stats(ctx.world());
        write_stats(ctx.root(), &records)
    }
}

/// Fails if an HLOD actor of `actors` is its own descendant.
fn check_hierarchy(actors: &[ActorDescriptor]) -> Result<(), BuilderError> {
    let edges = actors
        .iter()
        .flat_map(|actor| actor.hlod_children(true).map(move |child| (*child, actor.guid)));
    topological_sort(actors.iter().map(|actor| actor.guid), edges).map_err(|e| {
        log::error!(
            "[HLODBuilder] {} HLOD actors are part of or depend on a cycle",
            e.unresolved.len()
        );
        BuilderError::from(e)
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_builders_is_rejected() {
        let settings = HlodBuilderSettings {
            builder_count: 0,
            ..Default::default()
        };
        assert!(matches!(
            HlodBuilderAgent::new(settings),
            Err(BuilderError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_builder_index_must_fit_without_manifest() {
        let settings = HlodBuilderSettings {
            builder_index: 2,
            builder_count: 2,
            ..Default::default()
        };
        assert!(HlodBuilderAgent::new(settings).is_err());

        let with_manifest = HlodBuilderSettings {
            builder_index: 2,
            builder_count: 2,
            build_manifest: Some(PathBuf::from("Manifest.ini")),
            ..Default::default()
        };
        assert!(HlodBuilderAgent::new(with_manifest).is_ok());
    }

    #[test]
    fn test_distributed_needs_a_working_dir() {
        let settings = HlodBuilderSettings {
            distributed: true,
            ..Default::default()
        };
        assert!(HlodBuilderAgent::new(settings).is_err());
    }

    #[test]
    fn test_hierarchy_cycle_is_rejected() {
        // --- 1. ARRANGE ---
        let hlod = |guid: u128, child: u128| {
            let mut actor = ActorDescriptor::new(ActorGuid::from_u128(guid), "WorldPartitionHLOD");
            actor.hlod = Some(strata_core::HlodActorData {
                child_hlod_actors: vec![ActorGuid::from_u128(child)],
                ..Default::default()
            });
            actor
        };
        let chain = vec![hlod(2, 1), hlod(3, 2)];
        let cycle = vec![hlod(1, 2), hlod(2, 1), hlod(3, 2)];

        // --- 2. ACT ---
        let chain_result = check_hierarchy(&chain);
        let cycle_result = check_hierarchy(&cycle);

        // --- 3. ASSERT ---
        assert!(chain_result.is_ok());
        match cycle_result {
            Err(BuilderError::HierarchyCycle(e)) => assert_eq!(e.unresolved.len(), 3),
            other => panic!("expected a cycle, got {:?}", other),
        }
    }
}
