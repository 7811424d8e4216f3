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
use std::cell::{Cell, RefCell};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use strata_agents::{BuilderError, HlodBuilderAgent, HlodBuilderSettings, OrchestratorContext};
use strata_core::{
    Aabb, ActorContainer, ActorDescriptor, ActorGuid, ContainerKind, HlodBuildError,
    HlodBuildOutcome, HlodCreationContext, HlodCreationParams, HlodUtilities, ResolvedActor, Vec3,
    WorldDescriptor, HlodWorkload,
};
use strata_infra::{
    FileSystemSourceControl, GridSettings, HlodLayerSettings, PartitionSettings,
    ProxyHlodUtilities, SpatialGridHash,
};
use std::collections::BTreeSet;
use std::fs;
use strata_io::{
    actor_package_path, builder_folder, load_world, read_build_products, save_world, world_file_path,
    BuildManifest, ManifestError,
};
use strata_lanes::{HlodWorkloadScheduler, WorkloadParams};
use tempfile::tempdir;

const ACTOR_COUNT: u128 = 10;

/// Wraps the proxy utilities, recording every call and optionally raising
/// the cancellation flag after a number of builds.
struct CountingUtilities {
    inner: ProxyHlodUtilities,
    created: Cell<usize>,
    built: RefCell<Vec<ActorGuid>>,
    cancel_after: Option<(usize, Arc<AtomicBool>)>,
}

impl CountingUtilities {
    fn new() -> Self {
        Self {
            inner: ProxyHlodUtilities::new(),
            created: Cell::new(0),
            built: RefCell::new(Vec::new()),
            cancel_after: None,
        }
    }

    fn calls(&self) -> usize {
        self.created.get() + self.built.borrow().len()
    }
}

impl HlodUtilities for CountingUtilities {
    fn create_hlod_actors(
        &self,
        context: &HlodCreationContext<'_>,
        params: &HlodCreationParams<'_>,
        actor_instances: &[ResolvedActor],
    ) -> Vec<ActorDescriptor> {
        self.created.set(self.created.get() + 1);
        self.inner.create_hlod_actors(context, params, actor_instances)
    }

    fn build_hlod_actor(
        &self,
        actor: &ActorDescriptor,
        children: &[&ActorDescriptor],
        force: bool,
    ) -> Result<HlodBuildOutcome, HlodBuildError> {
        self.built.borrow_mut().push(actor.guid);
        if let Some((limit, flag)) = &self.cancel_after {
            if self.built.borrow().len() == *limit {
                flag.store(true, Ordering::Relaxed);
            }
        }
        self.inner.build_hlod_actor(actor, children, force)
    }
}

fn hash() -> SpatialGridHash {
    SpatialGridHash::new(PartitionSettings {
        default_grid: Some("MainGrid".to_string()),
        grids: vec![GridSettings {
            name: "MainGrid".to_string(),
            cell_size: 100.0,
            ..Default::default()
        }],
        hlod_layers: vec![HlodLayerSettings {
            name: "HLOD0".to_string(),
            ..Default::default()
        }],
    })
}

/// Ten meshes, each in its own grid cell.
fn world() -> WorldDescriptor {
    let mut base = ActorContainer::new("/Game/Maps/Main", ContainerKind::Base);
    base.actors = (1..=ACTOR_COUNT)
        .map(|n| {
            let x = n as f32 * 150.0;
            ActorDescriptor::new(ActorGuid::from_u128(n), "StaticMeshActor")
                .with_label(format!("Mesh{}", n))
                .with_bounds(Aabb::from_min_max(Vec3::new(x, 0.0, 0.0), Vec3::new(x + 1.0, 1.0, 1.0)))
        })
        .collect();
    let mut world = WorldDescriptor::new("Main", vec![base]);
    world.default_hlod_layer = Some("HLOD0".to_string());
    world
}

/// Saves the test world under `root` and loads it back.
fn seed(root: &Path) -> Result<WorldDescriptor> {
    save_world(root, &world())?;
    Ok(load_world(&world_file_path(root, "Main"))?)
}

fn setup_only() -> HlodBuilderSettings {
    HlodBuilderSettings {
        setup: true,
        ..Default::default()
    }
}

#[test]
fn test_setup_manifest_matches_a_fresh_schedule() -> Result<()> {
    // --- 1. ARRANGE ---
    let root = tempdir()?;
    let world = seed(root.path())?;
    let hash = hash();
    let utilities = ProxyHlodUtilities::new();
    let mut scm = FileSystemSourceControl::new(root.path());
    let manifest_path = root.path().join("Manifest.ini");
    let settings = HlodBuilderSettings {
        builder_count: 4,
        build_manifest: Some(manifest_path.clone()),
        ..setup_only()
    };
    let params = settings.workload_params();

    // --- 2. ACT ---
    let mut ctx = OrchestratorContext::new(root.path(), world, &mut scm)
        .with_runtime_hash(&hash)
        .with_hlod_utilities(&utilities);
    let summary = HlodBuilderAgent::new(settings)?.run(&mut ctx)?;

    // --- 3. ASSERT ---
    assert_eq!(summary.created, ACTOR_COUNT as usize);
    let manifest = BuildManifest::read(&manifest_path)?;
    assert_eq!(manifest.builder_count(), 4);
    assert_eq!(manifest.worlds, vec!["Main".to_string()]);

    let expected = HlodWorkloadScheduler::new().schedule(ctx.world().hlod_actors(), &params)?;
    let builder2: &HlodWorkload = manifest.workload(2)?;
    assert_eq!(builder2[0], expected[2]);
    assert_eq!(builder2[0].len(), 2);
    Ok(())
}

#[test]
fn test_resume_builds_only_the_remaining_actors() -> Result<()> {
    // --- 1. ARRANGE ---
    let root = tempdir()?;
    let world = seed(root.path())?;
    let hash = hash();
    let utilities = CountingUtilities::new();
    let mut scm = FileSystemSourceControl::new(root.path());
    let mut ctx = OrchestratorContext::new(root.path(), world, &mut scm)
        .with_runtime_hash(&hash)
        .with_hlod_utilities(&utilities);
    HlodBuilderAgent::new(setup_only())?.run(&mut ctx)?;
    let workload = HlodWorkloadScheduler::new()
        .schedule(ctx.world().hlod_actors(), &WorkloadParams::default())?
        .remove(0);

    // --- 2. ACT ---
    let settings = HlodBuilderSettings {
        build: true,
        resume_build: Some(3),
        ..Default::default()
    };
    let summary = HlodBuilderAgent::new(settings)?.run(&mut ctx)?;

    // --- 3. ASSERT ---
    assert_eq!(workload.len(), ACTOR_COUNT as usize);
    assert_eq!(*utilities.built.borrow(), workload[3..].to_vec());
    assert_eq!(summary.built, 7);
    Ok(())
}

#[test]
fn test_engine_version_mismatch_stops_before_any_build() -> Result<()> {
    // --- 1. ARRANGE ---
    let root = tempdir()?;
    let world = seed(root.path())?;
    let utilities = CountingUtilities::new();
    let mut scm = FileSystemSourceControl::new(root.path());
    let manifest_path = root.path().join("Manifest.ini");
    BuildManifest::new("0.0.0", vec!["Main".to_string()], vec![vec![vec![]]]).write(&manifest_path)?;
    let settings = HlodBuilderSettings {
        build: true,
        build_manifest: Some(manifest_path),
        engine_version: "5.4.0".to_string(),
        ..Default::default()
    };

    // --- 2. ACT ---
    let mut ctx = OrchestratorContext::new(root.path(), world, &mut scm).with_hlod_utilities(&utilities);
    let result = HlodBuilderAgent::new(settings)?.run(&mut ctx);

    // --- 3. ASSERT ---
    match result {
        Err(BuilderError::Manifest(ManifestError::EngineVersionMismatch { found, expected })) => {
            assert_eq!(found, "0.0.0");
            assert_eq!(expected, "5.4.0");
        }
        other => panic!("expected a version mismatch, got {:?}", other),
    }
    assert_eq!(utilities.calls(), 0);
    Ok(())
}

#[test]
fn test_distributed_version_mismatch_leaves_the_workspace_untouched() -> Result<()> {
    // --- 1. ARRANGE ---
    let root = tempdir()?;
    let working_dir = tempdir()?;
    let world = seed(root.path())?;
    let utilities = CountingUtilities::new();
    let mut scm = FileSystemSourceControl::new(root.path());

    let package = actor_package_path("/Game/Maps/Main", ActorGuid::from_u128(1));
    assert!(root.path().join(&package).is_file());
    let placeholder = working_dir.path().join(builder_folder(0)).join("Delete").join(&package);
    fs::create_dir_all(placeholder.parent().unwrap())?;
    fs::write(&placeholder, b"")?;

    let manifest_path = working_dir.path().join("Manifest.ini");
    BuildManifest::new("0.0.0", vec!["Main".to_string()], vec![vec![vec![]]]).write(&manifest_path)?;
    let settings = HlodBuilderSettings {
        build: true,
        distributed: true,
        working_dir: Some(working_dir.path().to_path_buf()),
        build_manifest: Some(manifest_path),
        engine_version: "5.4.0".to_string(),
        ..Default::default()
    };

    // --- 2. ACT ---
    let mut ctx = OrchestratorContext::new(root.path(), world, &mut scm).with_hlod_utilities(&utilities);
    let result = HlodBuilderAgent::new(settings)?.run(&mut ctx);

    // --- 3. ASSERT ---
    assert!(matches!(
        result,
        Err(BuilderError::Manifest(ManifestError::EngineVersionMismatch { .. }))
    ));
    assert!(ctx.modified_files().is_empty());
    assert!(ctx.find_actor(&ActorGuid::from_u128(1)).is_some());
    assert!(root.path().join(&package).is_file());
    assert!(placeholder.is_file());
    assert_eq!(utilities.calls(), 0);
    Ok(())
}

#[test]
fn test_manifest_for_another_world_is_rejected() -> Result<()> {
    let root = tempdir()?;
    let world = seed(root.path())?;
    let utilities = ProxyHlodUtilities::new();
    let mut scm = FileSystemSourceControl::new(root.path());
    let manifest_path = root.path().join("Manifest.ini");
    let version = HlodBuilderSettings::default().engine_version;
    BuildManifest::new(version, vec!["Other".to_string()], vec![vec![vec![]]]).write(&manifest_path)?;
    let settings = HlodBuilderSettings {
        build: true,
        build_manifest: Some(manifest_path),
        ..Default::default()
    };

    let mut ctx = OrchestratorContext::new(root.path(), world, &mut scm).with_hlod_utilities(&utilities);
    let result = HlodBuilderAgent::new(settings)?.run(&mut ctx);

    assert!(matches!(result, Err(BuilderError::WorldNotInManifest(name)) if name == "Main"));
    Ok(())
}

#[test]
fn test_local_build_end_to_end_is_incremental() -> Result<()> {
    // --- 1. ARRANGE ---
    let root = tempdir()?;
    let world = seed(root.path())?;
    let hash = hash();
    let utilities = ProxyHlodUtilities::new();
    let settings = HlodBuilderSettings {
        setup: true,
        build: true,
        finalize: true,
        dump_stats: true,
        ..Default::default()
    };

    // --- 2. ACT ---
    let mut scm = FileSystemSourceControl::new(root.path());
    let first = {
        let mut ctx = OrchestratorContext::new(root.path(), world, &mut scm)
            .with_runtime_hash(&hash)
            .with_hlod_utilities(&utilities);
        HlodBuilderAgent::new(settings.clone())?.run(&mut ctx)?
    };
    let reloaded = load_world(&world_file_path(root.path(), "Main"))?;
    let second = {
        let mut ctx = OrchestratorContext::new(root.path(), reloaded.clone(), &mut scm)
            .with_runtime_hash(&hash)
            .with_hlod_utilities(&utilities);
        HlodBuilderAgent::new(settings)?.run(&mut ctx)?
    };

    // --- 3. ASSERT ---
    assert_eq!(first.created, ACTOR_COUNT as usize);
    assert_eq!(first.built, ACTOR_COUNT as usize);
    assert_eq!(first.submitted, ACTOR_COUNT as usize);
    assert!(first.stats_file.as_ref().is_some_and(|path| path.is_file()));

    let hlods: Vec<&ActorDescriptor> = reloaded.hlod_actors().collect();
    assert_eq!(hlods.len(), ACTOR_COUNT as usize);
    assert!(hlods
        .iter()
        .all(|actor| actor.hlod.as_ref().is_some_and(|h| h.build_hash.is_some())));

    assert_eq!(second.created, 0);
    assert_eq!(second.unchanged, ACTOR_COUNT as usize);
    assert_eq!(second.built, 0);
    assert_eq!(second.up_to_date, ACTOR_COUNT as usize);
    assert_eq!(second.submitted, 0);

    let changes = scm.submitted_changes()?;
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].added.len(), ACTOR_COUNT as usize);
    Ok(())
}

#[test]
fn test_delete_without_setup_removes_every_hlod_actor() -> Result<()> {
    let root = tempdir()?;
    let world = seed(root.path())?;
    let hash = hash();
    let utilities = ProxyHlodUtilities::new();
    let mut scm = FileSystemSourceControl::new(root.path());
    let mut ctx = OrchestratorContext::new(root.path(), world, &mut scm)
        .with_runtime_hash(&hash)
        .with_hlod_utilities(&utilities);
    HlodBuilderAgent::new(setup_only())?.run(&mut ctx)?;
    assert_eq!(ctx.world().hlod_actors().count(), ACTOR_COUNT as usize);

    let settings = HlodBuilderSettings {
        delete: true,
        ..Default::default()
    };
    let summary = HlodBuilderAgent::new(settings)?.run(&mut ctx)?;

    assert_eq!(summary.deleted, ACTOR_COUNT as usize);
    assert_eq!(ctx.world().hlod_actors().count(), 0);
    // Added then deleted within the run: nothing left to submit.
    assert!(ctx.modified_files().is_empty());
    Ok(())
}

#[test]
fn test_report_only_touches_nothing() -> Result<()> {
    let root = tempdir()?;
    let world = seed(root.path())?;
    let hash = hash();
    let utilities = ProxyHlodUtilities::new();
    let mut scm = FileSystemSourceControl::new(root.path());
    let settings = HlodBuilderSettings {
        report_only: true,
        ..Default::default()
    };

    let mut ctx = OrchestratorContext::new(root.path(), world, &mut scm)
        .with_runtime_hash(&hash)
        .with_hlod_utilities(&utilities);
    let summary = HlodBuilderAgent::new(settings)?.run(&mut ctx)?;

    assert_eq!(summary.created, ACTOR_COUNT as usize);
    assert_eq!(summary.built, 0);
    assert_eq!(ctx.world().hlod_actors().count(), 0);
    assert!(ctx.modified_files().is_empty());
    Ok(())
}

#[test]
fn test_cancelled_build_resumes_where_it_stopped() -> Result<()> {
    // --- 1. ARRANGE ---
    let root = tempdir()?;
    let world = seed(root.path())?;
    let hash = hash();
    let cancel = Arc::new(AtomicBool::new(false));
    let utilities = CountingUtilities {
        cancel_after: Some((2, Arc::clone(&cancel))),
        ..CountingUtilities::new()
    };
    let mut scm = FileSystemSourceControl::new(root.path());
    let mut ctx = OrchestratorContext::new(root.path(), world, &mut scm)
        .with_runtime_hash(&hash)
        .with_hlod_utilities(&utilities)
        .with_cancel_flag(Arc::clone(&cancel));
    HlodBuilderAgent::new(setup_only())?.run(&mut ctx)?;
    let build = HlodBuilderSettings {
        build: true,
        ..Default::default()
    };

    // --- 2. ACT ---
    let first = HlodBuilderAgent::new(build.clone())?.run(&mut ctx);
    let resume_index = match first {
        Err(BuilderError::Cancelled { resume_index }) => resume_index,
        other => panic!("expected a cancellation, got {:?}", other),
    };
    cancel.store(false, Ordering::Relaxed);
    let resumed = HlodBuilderSettings {
        resume_build: Some(resume_index),
        ..build
    };
    let utilities_limit_reached = utilities.built.borrow().len();
    let second = HlodBuilderAgent::new(resumed)?.run(&mut ctx)?;

    // --- 3. ASSERT ---
    assert_eq!(resume_index, 2);
    assert_eq!(utilities_limit_reached, 2);
    assert_eq!(second.built, ACTOR_COUNT as usize - 2);
    let mut built = utilities.built.borrow().clone();
    built.sort();
    built.dedup();
    assert_eq!(built.len(), ACTOR_COUNT as usize);
    Ok(())
}

#[test]
fn test_distributed_build_across_hosts() -> Result<()> {
    // --- 1. ARRANGE ---
    let working_dir = tempdir()?;
    let setup_host = tempdir()?;
    let builder_hosts = [tempdir()?, tempdir()?];
    let submit_host = tempdir()?;
    let hash = hash();
    let utilities = ProxyHlodUtilities::new();
    let manifest_path = working_dir.path().join("Manifest.ini");
    let distributed = HlodBuilderSettings {
        distributed: true,
        working_dir: Some(working_dir.path().to_path_buf()),
        build_manifest: Some(manifest_path.clone()),
        builder_count: 2,
        ..Default::default()
    };

    // --- 2. ACT ---
    {
        let world = seed(setup_host.path())?;
        let mut scm = FileSystemSourceControl::new(setup_host.path());
        let mut ctx = OrchestratorContext::new(setup_host.path(), world, &mut scm)
            .with_runtime_hash(&hash)
            .with_hlod_utilities(&utilities);
        let settings = HlodBuilderSettings {
            setup: true,
            ..distributed.clone()
        };
        let summary = HlodBuilderAgent::new(settings)?.run(&mut ctx)?;
        assert_eq!(summary.staged, ACTOR_COUNT as usize);
        assert!(ctx.modified_files().is_empty());
        assert!(scm.pending().is_empty());
    }
    let setup_world = load_world(&world_file_path(setup_host.path(), "Main"))?;

    let mut built = 0;
    for (index, host) in builder_hosts.iter().enumerate() {
        let world = seed(host.path())?;
        let mut scm = FileSystemSourceControl::new(host.path());
        let mut ctx = OrchestratorContext::new(host.path(), world, &mut scm).with_hlod_utilities(&utilities);
        let settings = HlodBuilderSettings {
            build: true,
            builder_index: index,
            ..distributed.clone()
        };
        built += HlodBuilderAgent::new(settings)?.run(&mut ctx)?.built;
    }

    let world = seed(submit_host.path())?;
    let mut scm = FileSystemSourceControl::new(submit_host.path());
    let summary = {
        let mut ctx = OrchestratorContext::new(submit_host.path(), world, &mut scm);
        let settings = HlodBuilderSettings {
            finalize: true,
            ..distributed
        };
        HlodBuilderAgent::new(settings)?.run(&mut ctx)?
    };

    // --- 3. ASSERT ---
    assert_eq!(setup_world.hlod_actors().count(), 0);
    assert_eq!(built, ACTOR_COUNT as usize);
    assert_eq!(summary.submitted, ACTOR_COUNT as usize);

    let final_world = load_world(&world_file_path(submit_host.path(), "Main"))?;
    let hlods: Vec<&ActorDescriptor> = final_world.hlod_actors().collect();
    assert_eq!(hlods.len(), ACTOR_COUNT as usize);
    assert!(hlods
        .iter()
        .all(|actor| actor.hlod.as_ref().is_some_and(|h| h.build_hash.is_some())));

    let products = read_build_products(&working_dir.path().join("BuildProducts.txt"))?;
    assert_eq!(products.len(), 2 * ACTOR_COUNT as usize);
    assert_eq!(scm.submitted_changes()?.len(), 1);
    Ok(())
}

#[test]
fn test_setup_and_build_in_one_run_build_the_staged_workload() -> Result<()> {
    // --- 1. ARRANGE ---
    let root = tempdir()?;
    let working_dir = tempdir()?;
    let world = seed(root.path())?;
    let hash = hash();
    let utilities = CountingUtilities::new();
    let mut scm = FileSystemSourceControl::new(root.path());
    let settings = HlodBuilderSettings {
        setup: true,
        build: true,
        distributed: true,
        working_dir: Some(working_dir.path().to_path_buf()),
        builder_index: 1,
        builder_count: 2,
        ..Default::default()
    };

    // --- 2. ACT ---
    let summary = {
        let mut ctx = OrchestratorContext::new(root.path(), world, &mut scm)
            .with_runtime_hash(&hash)
            .with_hlod_utilities(&utilities);
        HlodBuilderAgent::new(settings)?.run(&mut ctx)?
    };

    // --- 3. ASSERT ---
    let staged_for_builder: BTreeSet<ActorGuid> =
        read_build_products(&working_dir.path().join("BuildProducts.txt"))?
            .iter()
            .filter(|path| path.starts_with(builder_folder(1)))
            .filter_map(|path| path.file_stem()?.to_str()?.parse().ok())
            .collect();
    let built: BTreeSet<ActorGuid> = utilities.built.borrow().iter().copied().collect();
    assert_eq!(summary.built, ACTOR_COUNT as usize / 2);
    assert_eq!(built.len(), ACTOR_COUNT as usize / 2);
    assert_eq!(staged_for_builder, built);
    Ok(())
}
