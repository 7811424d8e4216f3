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

//! Containers, data layers and the world they make up.

use crate::actor::ActorDescriptor;
use crate::guid::ActorGuid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifies one container instance in the container hierarchy.
///
/// The main container is the empty path. A nested container is identified by
/// the path of container actors leading to it, so the same template placed
/// twice yields two distinct IDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ContainerId(Vec<ActorGuid>);

impl ContainerId {
    /// The ID of the main container.
    pub fn main() -> Self {
        Self(Vec::new())
    }

    /// Returns `true` for the main container.
    pub fn is_main(&self) -> bool {
        self.0.is_empty()
    }

    /// The ID of the container placed by `container_actor` inside this one.
    #[must_use]
    pub fn child(&self, container_actor: ActorGuid) -> Self {
        let mut path = self.0.clone();
        path.push(container_actor);
        Self(path)
    }

    /// The ID of the enclosing container, `None` for the main container.
    pub fn parent(&self) -> Option<Self> {
        let (_, parent) = self.0.split_last()?;
        Some(Self(parent.to_vec()))
    }

    /// Nesting depth, `0` for the main container.
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_main() {
            return write!(f, "Main");
        }
        for (i, guid) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}", guid)?;
        }
        Ok(())
    }
}

/// Which clients load a data layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DataLayerLoadFilter {
    /// Loaded everywhere.
    #[default]
    None,
    /// Loaded on clients only.
    ClientOnly,
    /// Loaded on servers only.
    ServerOnly,
}

/// A data layer instance declared by a world or container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataLayerInstance {
    /// Instance name, as referenced by actor descriptors.
    pub name: String,
    /// Runtime data layers toggle streaming; editor data layers only group actors.
    #[serde(default)]
    pub is_runtime: bool,
    /// Which clients load the data layer.
    #[serde(default)]
    pub load_filter: DataLayerLoadFilter,
}

/// The role a top-level container plays in a world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerKind {
    /// The base container of the world.
    Base,
    /// An overlay owned by an external data layer asset.
    ExternalDataLayer(String),
    /// An overlay owned by a content bundle.
    ContentBundle(ActorGuid),
}

/// A set of actor descriptors sharing one package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorContainer {
    /// Package path of the container, for example `/Game/Maps/Main`.
    pub package: String,
    /// The role of the container.
    pub kind: ContainerKind,
    /// Every actor of the container.
    #[serde(default)]
    pub actors: Vec<ActorDescriptor>,
    /// Actors referenced by the level script. Only meaningful for the base
    /// container.
    #[serde(default)]
    pub world_references: Vec<ActorGuid>,
    /// Data layer instances declared by the container itself.
    #[serde(default)]
    pub data_layers: Vec<DataLayerInstance>,
}

impl ActorContainer {
    /// Creates an empty container.
    pub fn new(package: impl Into<String>, kind: ContainerKind) -> Self {
        Self {
            package: package.into(),
            kind,
            actors: Vec::new(),
            world_references: Vec::new(),
            data_layers: Vec::new(),
        }
    }

    /// The external data layer owning this container, if any.
    pub fn external_data_layer(&self) -> Option<&str> {
        match &self.kind {
            ContainerKind::ExternalDataLayer(asset) => Some(asset),
            _ => None,
        }
    }

    /// The content bundle owning this container, if any.
    pub fn content_bundle(&self) -> Option<ActorGuid> {
        match self.kind {
            ContainerKind::ContentBundle(guid) => Some(guid),
            _ => None,
        }
    }
}

/// A complete world: its top-level containers plus every container template
/// placed by level instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldDescriptor {
    /// World name.
    pub name: String,
    /// When disabled every actor is forced always loaded.
    #[serde(default = "default_streaming")]
    pub streaming_enabled: bool,
    /// HLOD layer inherited by actors that do not set one.
    #[serde(default)]
    pub default_hlod_layer: Option<String>,
    /// Data layer instances declared at world level.
    #[serde(default)]
    pub data_layers: Vec<DataLayerInstance>,
    /// Base, external data layer and content bundle containers.
    pub containers: Vec<ActorContainer>,
    /// Templates placed by child-container actors, keyed by package.
    #[serde(default)]
    pub child_containers: BTreeMap<String, ActorContainer>,
}

fn default_streaming() -> bool {
    true
}

impl WorldDescriptor {
    /// Creates a streaming-enabled world with the given containers.
    pub fn new(name: impl Into<String>, containers: Vec<ActorContainer>) -> Self {
        Self {
            name: name.into(),
            streaming_enabled: true,
            default_hlod_layer: None,
            data_layers: Vec::new(),
            containers,
            child_containers: BTreeMap::new(),
        }
    }

    /// The base container, if the world has one.
    pub fn base_container(&self) -> Option<&ActorContainer> {
        self.containers
            .iter()
            .find(|container| container.kind == ContainerKind::Base)
    }

    /// Looks up a data layer instance, world level first, then `container`.
    pub fn find_data_layer<'a>(
        &'a self,
        container: &'a ActorContainer,
        name: &str,
    ) -> Option<&'a DataLayerInstance> {
        self.data_layers
            .iter()
            .chain(container.data_layers.iter())
            .find(|instance| instance.name == name)
    }

    /// Iterates every HLOD actor of the top-level containers.
    pub fn hlod_actors(&self) -> impl Iterator<Item = &ActorDescriptor> {
        self.containers
            .iter()
            .flat_map(|container| container.actors.iter())
            .filter(|actor| actor.is_hlod_actor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_id_paths() {
        let main = ContainerId::main();
        let a = ActorGuid::from_u128(1);
        let b = ActorGuid::from_u128(2);
        let child = main.child(a);
        let grandchild = child.child(b);

        assert!(main.is_main());
        assert_eq!(main.parent(), None);
        assert_eq!(grandchild.parent(), Some(child.clone()));
        assert_eq!(child.parent(), Some(main.clone()));
        assert_eq!(grandchild.depth(), 2);
        assert_eq!(main.to_string(), "Main");
        assert_eq!(
            child.to_string(),
            "00000000000000000000000000000001".to_string()
        );
    }

    #[test]
    fn test_container_ids_sort_parents_first() {
        let main = ContainerId::main();
        let child = main.child(ActorGuid::from_u128(5));
        let mut ids = vec![child.child(ActorGuid::from_u128(1)), child.clone(), main.clone()];
        ids.sort();
        assert_eq!(ids[0], main);
        assert_eq!(ids[1], child);
    }
}
