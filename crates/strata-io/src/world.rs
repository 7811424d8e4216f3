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

//! World and external-actor packages.
//!
//! A world is stored as `<root>/<World>.world.ron`, which holds the world
//! settings and one header per container. Actors are stored one per file
//! under `<root>/ExternalActors/<container package>/<GUID>.ron`, so that a
//! builder touching one actor touches one file.

use crate::error::WorldLoadError;
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use strata_core::{
    ActorContainer, ActorDescriptor, ActorGuid, ContainerKind, DataLayerInstance, Package,
    WorldDescriptor,
};
use walkdir::WalkDir;

/// Folder holding one package per actor.
pub const EXTERNAL_ACTORS_FOLDER: &str = "ExternalActors";

const WORLD_EXTENSION: &str = "world.ron";
const ACTOR_EXTENSION: &str = "ron";

/// A container without its actors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ContainerHeader {
    package: String,
    kind: ContainerKind,
    #[serde(default)]
    world_references: Vec<ActorGuid>,
    #[serde(default)]
    data_layers: Vec<DataLayerInstance>,
}

impl ContainerHeader {
    fn of(container: &ActorContainer) -> Self {
        Self {
            package: container.package.clone(),
            kind: container.kind.clone(),
            world_references: container.world_references.clone(),
            data_layers: container.data_layers.clone(),
        }
    }

    fn into_container(self, actors: Vec<ActorDescriptor>) -> ActorContainer {
        ActorContainer {
            package: self.package,
            kind: self.kind,
            actors,
            world_references: self.world_references,
            data_layers: self.data_layers,
        }
    }
}

/// The content of a `.world.ron` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct WorldFile {
    name: String,
    #[serde(default = "default_true")]
    streaming_enabled: bool,
    #[serde(default)]
    default_hlod_layer: Option<String>,
    #[serde(default)]
    data_layers: Vec<DataLayerInstance>,
    containers: Vec<ContainerHeader>,
    #[serde(default)]
    child_containers: Vec<ContainerHeader>,
}

fn default_true() -> bool {
    true
}

/// Path of the world file of `world_name` under `root`.
pub fn world_file_path(root: &Path, world_name: &str) -> PathBuf {
    root.join(format!("{}.{}", world_name, WORLD_EXTENSION))
}

fn container_folder(container_package: &str) -> PathBuf {
    let mut folder = PathBuf::from(EXTERNAL_ACTORS_FOLDER);
    folder.extend(container_package.split('/').filter(|part| !part.is_empty()));
    folder
}

/// Path, relative to the root, of the package of actor `guid` of
/// `container_package`.
pub fn actor_package_path(container_package: &str, guid: ActorGuid) -> PathBuf {
    container_folder(container_package).join(format!("{}.{}", guid, ACTOR_EXTENSION))
}

/// Encodes one actor descriptor.
pub fn encode_actor(actor: &ActorDescriptor) -> Result<Vec<u8>, WorldLoadError> {
    ron::ser::to_string_pretty(actor, PrettyConfig::default())
        .map(String::into_bytes)
        .map_err(|source| WorldLoadError::Encode {
            what: format!("actor {}", actor.guid),
            source,
        })
}

/// Decodes one actor descriptor read from `path`.
pub fn decode_actor(bytes: &[u8], path: &Path) -> Result<ActorDescriptor, WorldLoadError> {
    ron::de::from_bytes(bytes).map_err(|source| WorldLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// The package of `actor`, stored in the container named by its `package`.
pub fn actor_package(actor: &ActorDescriptor) -> Result<Package, WorldLoadError> {
    Ok(Package {
        path: actor_package_path(&actor.package, actor.guid),
        bytes: encode_actor(actor)?,
    })
}

fn read_file(path: &Path) -> Result<Vec<u8>, WorldLoadError> {
    fs::read(path).map_err(|source| {
        log::error!("Failed to read '{}': {}", path.display(), source);
        WorldLoadError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), WorldLoadError> {
    let io_error = |source| WorldLoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(path, bytes).map_err(io_error)
}

fn load_actors(root: &Path, header: &ContainerHeader) -> Result<Vec<ActorDescriptor>, WorldLoadError> {
    let folder = root.join(container_folder(&header.package));
    if !folder.is_dir() {
        return Ok(Vec::new());
    }

    let mut actors = Vec::new();
    let mut seen = HashSet::new();
    for entry in WalkDir::new(&folder).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|ext| ext.to_str()) != Some(ACTOR_EXTENSION)
        {
            continue;
        }
        let mut actor = decode_actor(&read_file(path)?, path)?;
        if !seen.insert(actor.guid) {
            return Err(WorldLoadError::DuplicateActor {
                container: header.package.clone(),
                guid: actor.guid,
            });
        }
        actor.package = header.package.clone();
        actors.push(actor);
    }
    Ok(actors)
}

/// Loads the world stored at `world_path` with every actor package of its
/// containers. Actors are ordered by GUID.
pub fn load_world(world_path: &Path) -> Result<WorldDescriptor, WorldLoadError> {
    let root = world_path.parent().unwrap_or_else(|| Path::new("."));
    let bytes = read_file(world_path)?;
    let file: WorldFile = ron::de::from_bytes(&bytes).map_err(|source| WorldLoadError::Parse {
        path: world_path.to_path_buf(),
        source,
    })?;

    let mut containers = Vec::with_capacity(file.containers.len());
    for header in file.containers {
        let actors = load_actors(root, &header)?;
        containers.push(header.into_container(actors));
    }
    let mut child_containers = BTreeMap::new();
    for header in file.child_containers {
        let actors = load_actors(root, &header)?;
        child_containers.insert(header.package.clone(), header.into_container(actors));
    }

    let actor_count: usize = containers.iter().map(|c| c.actors.len()).sum();
    log::info!(
        "Loaded world '{}': {} containers, {} actors, {} child containers",
        file.name,
        containers.len(),
        actor_count,
        child_containers.len()
    );

    Ok(WorldDescriptor {
        name: file.name,
        streaming_enabled: file.streaming_enabled,
        default_hlod_layer: file.default_hlod_layer,
        data_layers: file.data_layers,
        containers,
        child_containers,
    })
}

/// Writes `world` under `root`: the world file and one package per actor.
/// Returns the written files relative to `root`.
pub fn save_world(root: &Path, world: &WorldDescriptor) -> Result<Vec<PathBuf>, WorldLoadError> {
    let file = WorldFile {
        name: world.name.clone(),
        streaming_enabled: world.streaming_enabled,
        default_hlod_layer: world.default_hlod_layer.clone(),
        data_layers: world.data_layers.clone(),
        containers: world.containers.iter().map(ContainerHeader::of).collect(),
        child_containers: world.child_containers.values().map(ContainerHeader::of).collect(),
    };
    let text = ron::ser::to_string_pretty(&file, PrettyConfig::default()).map_err(|source| {
        WorldLoadError::Encode {
            what: format!("world {}", world.name),
            source,
        }
    })?;

    let world_path = world_file_path(root, &world.name);
    write_file(&world_path, text.as_bytes())?;
    let mut written = vec![PathBuf::from(format!("{}.{}", world.name, WORLD_EXTENSION))];

    for container in world.containers.iter().chain(world.child_containers.values()) {
        for actor in &container.actors {
            let relative = actor_package_path(&container.package, actor.guid);
            write_file(&root.join(&relative), &encode_actor(actor)?)?;
            written.push(relative);
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_package_path_layout() {
        let path = actor_package_path("/Game/Maps/Main", ActorGuid::from_u128(0xA));
        let expected: PathBuf = [
            EXTERNAL_ACTORS_FOLDER,
            "Game",
            "Maps",
            "Main",
            "0000000000000000000000000000000A.ron",
        ]
        .iter()
        .collect();
        assert_eq!(path, expected);
    }

    #[test]
    fn test_actor_encoding_round_trips_hlod_data() {
        let mut actor = ActorDescriptor::new(ActorGuid::from_u128(5), "WorldPartitionHLOD")
            .with_label("HLOD0_Cell");
        actor.hlod = Some(strata_core::HlodActorData {
            child_hlod_actors: vec![ActorGuid::from_u128(1)],
            hlod_level: 1,
            ..Default::default()
        });

        let bytes = encode_actor(&actor).unwrap();
        let back = decode_actor(&bytes, Path::new("a.ron")).unwrap();

        assert_eq!(back.hlod, actor.hlod);
        assert_eq!(back.label, "HLOD0_Cell");
        assert!(!back.bounds.is_valid());
    }
}
