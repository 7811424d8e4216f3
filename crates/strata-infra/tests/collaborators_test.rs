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
use strata_core::{
    Aabb, ActorContainer, ActorDescriptor, ActorGuid, BuilderModifiedFiles, ContainerKind,
    FileAction, Package, SourceControlHelper, Vec3, WorldDescriptor,
};
use strata_data::{generate_streaming, setup_hlod_actors, NullErrorHandler, StreamingGeneratorParams};
use strata_infra::{
    FileSystemSourceControl, GridSettings, HlodLayerSettings, PartitionSettings,
    ProxyHlodUtilities, SpatialGridHash,
};
use tempfile::tempdir;

fn guid(n: u128) -> ActorGuid {
    ActorGuid::from_u128(n)
}

fn actor_at(n: u128, x: f32) -> ActorDescriptor {
    ActorDescriptor::new(guid(n), "StaticMeshActor")
        .with_label(format!("Mesh{}", n))
        .with_bounds(Aabb::from_min_max(Vec3::new(x, 0.0, 0.0), Vec3::new(x + 1.0, 1.0, 1.0)))
}

fn hash() -> SpatialGridHash {
    SpatialGridHash::new(PartitionSettings {
        default_grid: Some("MainGrid".to_string()),
        grids: vec![GridSettings {
            name: "MainGrid".to_string(),
            cell_size: 100.0,
            ..Default::default()
        }],
        hlod_layers: vec![
            HlodLayerSettings {
                name: "HLOD0".to_string(),
                parent_layer: Some("HLOD1".to_string()),
                cell_size_multiplier: 2,
            },
            HlodLayerSettings {
                name: "HLOD1".to_string(),
                ..Default::default()
            },
        ],
    })
}

/// Two meshes in cell (0, 0), one in cell (1, 0) and one always loaded.
fn world() -> WorldDescriptor {
    let mut base = ActorContainer::new("/Game/Maps/Main", ContainerKind::Base);
    let mut always_loaded = actor_at(4, 500.0);
    always_loaded.is_spatially_loaded = false;
    base.actors = vec![actor_at(1, 0.0), actor_at(2, 20.0), actor_at(3, 150.0), always_loaded];
    let mut world = WorldDescriptor::new("Main", vec![base]);
    world.default_hlod_layer = Some("HLOD0".to_string());
    world
}

#[test]
fn test_grid_hash_generates_one_cell_per_grid_cell() -> Result<()> {
    // --- 1. ARRANGE ---
    let world = world();
    let hash = hash();
    let mut handler = NullErrorHandler;

    // --- 2. ACT ---
    let output = generate_streaming(
        &world,
        &hash,
        StreamingGeneratorParams::default(),
        false,
        &mut handler,
    )?;

    // --- 3. ASSERT ---
    assert_eq!(output.generated.len(), 1);
    let base = &output.generated[0];
    let names: Vec<&str> = base.policy.cells.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["MainGrid_AlwaysLoaded", "MainGrid_L0_X0_Y0", "MainGrid_L0_X1_Y0"]
    );
    let first_cell: Vec<ActorGuid> = base.policy.cells[1].actors.iter().map(|(_, g)| *g).collect();
    assert_eq!(first_cell, vec![guid(1), guid(2)]);
    assert!(!base.policy.cells[0].is_spatially_loaded);
    assert_eq!(base.packages_to_generate.len(), 3);
    Ok(())
}

#[test]
fn test_hlod_setup_builds_two_levels() -> Result<()> {
    // --- 1. ARRANGE ---
    let world = world();
    let hash = hash();
    let utilities = ProxyHlodUtilities::new();
    let mut handler = NullErrorHandler;

    // --- 2. ACT ---
    let output = setup_hlod_actors(&world, &hash, &utilities, false, &mut handler)?;

    // --- 3. ASSERT ---
    let actors = output.hlod_actors;
    assert_eq!(actors.len(), 3);
    let level0: Vec<&ActorDescriptor> = actors
        .iter()
        .filter(|a| a.hlod.as_ref().is_some_and(|h| h.hlod_level == 0))
        .collect();
    let level1: Vec<&ActorDescriptor> = actors
        .iter()
        .filter(|a| a.hlod.as_ref().is_some_and(|h| h.hlod_level == 1))
        .collect();
    assert_eq!(level0.len(), 2);
    assert_eq!(level1.len(), 1);

    let first_sources = &level0[0].hlod.as_ref().unwrap().source_actors;
    assert_eq!(first_sources, &vec![guid(1), guid(2)]);

    let mut expected_children: Vec<ActorGuid> = level0.iter().map(|a| a.guid).collect();
    expected_children.sort();
    assert_eq!(level1[0].hlod.as_ref().unwrap().child_hlod_actors, expected_children);
    assert_eq!(level1[0].hlod_layer, None);

    // Running setup again yields the same actors.
    let again = setup_hlod_actors(&world, &hash, &utilities, false, &mut handler)?;
    assert_eq!(again.hlod_actors, actors);
    Ok(())
}

#[test]
fn test_source_control_revert_restores_originals() -> Result<()> {
    // --- 1. ARRANGE ---
    let root = tempdir()?;
    fs::write(root.path().join("existing.ron"), "original")?;
    let mut scm = FileSystemSourceControl::new(root.path());

    // --- 2. ACT ---
    assert!(scm.save(&Package {
        path: PathBuf::from("new/added.ron"),
        bytes: b"added".to_vec(),
    }));
    assert!(scm.save(&Package {
        path: PathBuf::from("existing.ron"),
        bytes: b"edited".to_vec(),
    }));
    assert_eq!(scm.pending().len(), 2);
    let reverted = scm.revert(&[PathBuf::from("new/added.ron"), PathBuf::from("existing.ron")]);

    // --- 3. ASSERT ---
    assert!(reverted);
    assert!(!root.path().join("new/added.ron").exists());
    assert_eq!(fs::read_to_string(root.path().join("existing.ron"))?, "original");
    assert!(scm.pending().is_empty());
    Ok(())
}

#[test]
fn test_source_control_delete_and_submit() -> Result<()> {
    let root = tempdir()?;
    fs::write(root.path().join("stale.ron"), "stale")?;
    let mut scm = FileSystemSourceControl::new(root.path());

    assert!(scm.delete(Path::new("stale.ron")));
    assert!(scm.delete(Path::new("never-existed.ron")));
    assert!(scm.save(&Package {
        path: PathBuf::from("fresh.ron"),
        bytes: b"fresh".to_vec(),
    }));

    let mut files = BuilderModifiedFiles::new();
    files.record(FileAction::Delete, "stale.ron");
    files.record(FileAction::Add, "fresh.ron");
    assert!(scm.submit(&files, "Rebuilt HLODs"));
    assert!(scm.submit(&BuilderModifiedFiles::new(), "Nothing"));

    let changes = scm.submitted_changes()?;
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].id, 1);
    assert_eq!(changes[0].description, "Rebuilt HLODs");
    assert_eq!(changes[0].added, vec!["fresh.ron".to_string()]);
    assert_eq!(changes[0].deleted, vec!["stale.ron".to_string()]);
    assert!(scm.pending().is_empty());
    assert!(!root.path().join("stale.ron").exists());
    Ok(())
}
