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
use strata_core::{
    Aabb, ActorContainer, ActorDescriptor, ActorGuid, ChildContainer, ChildContainerKind,
    ContainerKind, DataLayerInstance, DataLayerLoadFilter, HlodActorData, Vec3, WorldDescriptor,
};
use strata_io::{
    actor_package, actor_package_path, load_world, save_world, world_file_path, BuildManifest,
    WorldLoadError,
};
use tempfile::tempdir;

fn sample_world() -> WorldDescriptor {
    let mut base = ActorContainer::new("/Game/Maps/Main", ContainerKind::Base);
    let mut rock = ActorDescriptor::new(ActorGuid::from_u128(2), "StaticMeshActor")
        .with_label("Rock")
        .with_bounds(Aabb::from_min_max(Vec3::ZERO, Vec3::new(2.0, 2.0, 2.0)));
    rock.package = base.package.clone();
    rock.data_layers = vec!["Gameplay".to_string()];
    let mut house = ActorDescriptor::new(ActorGuid::from_u128(1), "LevelInstance").with_label("House");
    house.package = base.package.clone();
    house.child_container = Some(ChildContainer {
        package: "/Game/LI/House".to_string(),
        kind: ChildContainerKind::LevelInstance,
        translation: Vec3::new(10.0, 0.0, 0.0),
        filtered_actors: vec![],
    });
    base.actors = vec![rock, house];
    base.world_references = vec![ActorGuid::from_u128(2)];

    let mut template = ActorContainer::new("/Game/LI/House", ContainerKind::Base);
    let mut wall = ActorDescriptor::new(ActorGuid::from_u128(3), "StaticMeshActor").with_label("Wall");
    wall.package = template.package.clone();
    template.actors = vec![wall];

    let mut world = WorldDescriptor::new("Main", vec![base]);
    world.data_layers = vec![DataLayerInstance {
        name: "Gameplay".to_string(),
        is_runtime: true,
        load_filter: DataLayerLoadFilter::None,
    }];
    world.default_hlod_layer = Some("HLOD0".to_string());
    world.child_containers.insert(template.package.clone(), template);
    world
}

#[test]
fn test_world_round_trips_through_external_actors() -> Result<()> {
    // --- 1. ARRANGE ---
    let root = tempdir()?;
    let world = sample_world();

    // --- 2. ACT ---
    let written = save_world(root.path(), &world)?;
    let loaded = load_world(&world_file_path(root.path(), "Main"))?;

    // --- 3. ASSERT ---
    assert_eq!(written.len(), 4);
    assert!(root
        .path()
        .join(actor_package_path("/Game/Maps/Main", ActorGuid::from_u128(1)))
        .is_file());
    assert_eq!(loaded.name, "Main");
    assert_eq!(loaded.default_hlod_layer.as_deref(), Some("HLOD0"));
    assert_eq!(loaded.containers[0].world_references, vec![ActorGuid::from_u128(2)]);

    // Actors come back ordered by GUID.
    let guids: Vec<_> = loaded.containers[0].actors.iter().map(|a| a.guid).collect();
    assert_eq!(guids, vec![ActorGuid::from_u128(1), ActorGuid::from_u128(2)]);
    assert_eq!(loaded.containers[0].actors[1], world.containers[0].actors[0]);
    assert_eq!(loaded.child_containers["/Game/LI/House"].actors.len(), 1);
    Ok(())
}

#[test]
fn test_saved_actor_package_is_loaded_with_its_container() -> Result<()> {
    let root = tempdir()?;
    let world = sample_world();
    save_world(root.path(), &world)?;

    let mut hlod = ActorDescriptor::new(ActorGuid::from_u128(9), "WorldPartitionHLOD");
    hlod.package = "/Game/Maps/Main".to_string();
    hlod.hlod = Some(HlodActorData::default());
    let package = actor_package(&hlod)?;
    let path = root.path().join(&package.path);
    fs::write(&path, &package.bytes)?;

    let loaded = load_world(&world_file_path(root.path(), "Main"))?;
    assert_eq!(loaded.containers[0].actors.len(), 3);
    assert_eq!(loaded.hlod_actors().count(), 1);
    Ok(())
}

#[test]
fn test_corrupt_actor_package_reports_its_path() -> Result<()> {
    let root = tempdir()?;
    save_world(root.path(), &sample_world())?;
    let path = root
        .path()
        .join(actor_package_path("/Game/Maps/Main", ActorGuid::from_u128(2)));
    fs::write(&path, "(guid: ")?;

    let result = load_world(&world_file_path(root.path(), "Main"));

    match result {
        Err(WorldLoadError::Parse { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected a parse error, got {:?}", other.map(|w| w.name)),
    }
    Ok(())
}

#[test]
fn test_manifest_file_round_trip() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("Manifests/HLODBuild.ini");
    let manifest = BuildManifest::new(
        "0.1.0",
        vec!["Main".to_string()],
        vec![
            vec![vec![ActorGuid::from_u128(1), ActorGuid::from_u128(2)]],
            vec![vec![ActorGuid::from_u128(3)]],
        ],
    );

    manifest.write(&path)?;
    let back = BuildManifest::read(&path)?;

    assert_eq!(back, manifest);
    assert_eq!(back.workload(1)?, &vec![vec![ActorGuid::from_u128(3)]]);
    Ok(())
}
