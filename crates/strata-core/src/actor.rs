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

//! Immutable actor descriptors.
//!
//! An [`ActorDescriptor`] is the serialized summary of one actor: everything
//! the partitioning pipeline needs to know about it, without ever
//! instantiating the actor itself. Descriptors are never mutated by the
//! pipeline; every resolved or corrected value lives in an overlay view
//! owned by `strata-data`.

use crate::guid::ActorGuid;
use crate::math::{Aabb, Vec3};
use serde::{Deserialize, Serialize};

/// Native class of generated HLOD actors.
pub const HLOD_ACTOR_CLASS: &str = "WorldPartitionHLOD";

/// Native class of level-instance actors, which place a nested container.
pub const LEVEL_INSTANCE_CLASS: &str = "LevelInstance";

/// Native class of standalone-HLOD actors, which place a generated HLOD sub-level.
pub const STANDALONE_HLOD_CLASS: &str = "WorldPartitionStandaloneHLOD";

/// The kind of nested container an actor places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildContainerKind {
    /// A regular level instance.
    LevelInstance,
    /// A standalone-HLOD sub-level.
    StandaloneHlod,
}

/// Describes the nested container placed by a container actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildContainer {
    /// Package of the container template to instantiate.
    pub package: String,
    /// What kind of container this is.
    pub kind: ChildContainerKind,
    /// World-space offset applied to the instantiated container.
    #[serde(default)]
    pub translation: Vec3,
    /// Actors of the template excluded from this placement.
    #[serde(default)]
    pub filtered_actors: Vec<ActorGuid>,
}

/// HLOD specific data carried by generated HLOD actors.
///
/// An actor descriptor whose `hlod` field is set is an HLOD actor descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HlodActorData {
    /// Lower level HLOD actors of the same container represented by this one.
    #[serde(default)]
    pub child_hlod_actors: Vec<ActorGuid>,
    /// Lower level HLOD actors living in another container or world.
    #[serde(default)]
    pub external_child_hlod_actors: Vec<ActorGuid>,
    /// HLOD layer that produced this actor.
    pub source_hlod_layer: String,
    /// Level in the HLOD hierarchy, `0` being the finest.
    #[serde(default)]
    pub hlod_level: u32,
    /// Runtime cell this actor was generated for.
    #[serde(default)]
    pub cell_name: String,
    /// Every actor whose geometry is merged into this proxy.
    #[serde(default)]
    pub source_actors: Vec<ActorGuid>,
    /// Hash of the last successful proxy build, if any.
    #[serde(default)]
    pub build_hash: Option<String>,
}

/// The serialized summary of an actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorDescriptor {
    /// The stable identifier of the actor.
    pub guid: ActorGuid,
    /// Human readable label, used in diagnostics and by single-actor builds.
    #[serde(default)]
    pub label: String,
    /// Exact native class of the actor.
    pub native_class: String,
    /// Optional base class, consulted by class filters.
    #[serde(default)]
    pub base_class: Option<String>,
    /// Package of the container that owns the actor.
    #[serde(default)]
    pub package: String,
    /// Whether the actor streams spatially or is always loaded.
    #[serde(default = "default_true")]
    pub is_spatially_loaded: bool,
    /// Runtime grid the actor requests, if any.
    #[serde(default)]
    pub runtime_grid: Option<String>,
    /// Data layer instance names the actor belongs to.
    #[serde(default)]
    pub data_layers: Vec<String>,
    /// External data layer asset the actor belongs to.
    #[serde(default)]
    pub external_data_layer: Option<String>,
    /// HLOD layer the actor requests, if any.
    #[serde(default)]
    pub hlod_layer: Option<String>,
    /// Whether the actor contributes to HLOD generation.
    #[serde(default = "default_true")]
    pub is_hlod_relevant: bool,
    /// Actor this one is attached to.
    #[serde(default)]
    pub parent_actor: Option<ActorGuid>,
    /// Actors this one references.
    #[serde(default)]
    pub references: Vec<ActorGuid>,
    /// References made only through editor-only properties.
    #[serde(default)]
    pub editor_only_references: Vec<ActorGuid>,
    /// Content bundle the actor belongs to.
    #[serde(default)]
    pub content_bundle: Option<ActorGuid>,
    /// Runtime bounds of the actor, in container space.
    #[serde(default)]
    pub bounds: Aabb,
    /// Editor-only actors never make it into a runtime partition.
    #[serde(default)]
    pub is_editor_only: bool,
    /// Actors of this class are loaded in play-in-editor sessions only and
    /// must stay always loaded without data layers.
    #[serde(default)]
    pub is_editor_only_loaded_in_pie: bool,
    /// Set when the actor places a nested container.
    #[serde(default)]
    pub child_container: Option<ChildContainer>,
    /// Set for HLOD actors.
    #[serde(default)]
    pub hlod: Option<HlodActorData>,
}

fn default_true() -> bool {
    true
}

impl ActorDescriptor {
    /// Creates a spatially loaded, HLOD relevant descriptor with no
    /// references and invalid bounds.
    pub fn new(guid: ActorGuid, native_class: impl Into<String>) -> Self {
        Self {
            guid,
            label: String::new(),
            native_class: native_class.into(),
            base_class: None,
            package: String::new(),
            is_spatially_loaded: true,
            runtime_grid: None,
            data_layers: Vec::new(),
            external_data_layer: None,
            hlod_layer: None,
            is_hlod_relevant: true,
            parent_actor: None,
            references: Vec::new(),
            editor_only_references: Vec::new(),
            content_bundle: None,
            bounds: Aabb::INVALID,
            is_editor_only: false,
            is_editor_only_loaded_in_pie: false,
            child_container: None,
            hlod: None,
        }
    }

    /// Sets the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the runtime bounds.
    #[must_use]
    pub fn with_bounds(mut self, bounds: Aabb) -> Self {
        self.bounds = bounds;
        self
    }

    /// Sets the referenced actors.
    #[must_use]
    pub fn with_references(mut self, references: impl IntoIterator<Item = ActorGuid>) -> Self {
        self.references = references.into_iter().collect();
        self
    }

    /// Returns `true` if this is an HLOD actor descriptor.
    pub fn is_hlod_actor(&self) -> bool {
        self.hlod.is_some()
    }

    /// Returns `true` if the actor matches `class` exactly or through its base class.
    pub fn is_a(&self, class: &str) -> bool {
        self.native_class == class || self.base_class.as_deref() == Some(class)
    }

    /// Iterates the HLOD children of this actor, optionally including the
    /// external ones. Non HLOD actors have no children.
    pub fn hlod_children(&self, include_external: bool) -> impl Iterator<Item = &ActorGuid> {
        let own = self
            .hlod
            .as_ref()
            .map(|hlod| hlod.child_hlod_actors.as_slice())
            .unwrap_or_default();
        let external = self
            .hlod
            .as_ref()
            .filter(|_| include_external)
            .map(|hlod| hlod.external_child_hlod_actors.as_slice())
            .unwrap_or_default();
        own.iter().chain(external.iter())
    }
}

/// Data layer instance names of an actor, split between regular data layers
/// and the single optional external data layer (EDL).
///
/// Forcing the names empty removes the regular data layers but keeps the
/// external one: an actor can never leave the EDL container it lives in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataLayerInstanceNames {
    names: Vec<String>,
    external: Option<String>,
    forced_empty: bool,
}

impl DataLayerInstanceNames {
    /// No data layers at all.
    pub const EMPTY: Self = Self {
        names: Vec::new(),
        external: None,
        forced_empty: false,
    };

    /// Creates a new set of names.
    pub fn new(names: Vec<String>, external: Option<String>) -> Self {
        Self {
            names,
            external,
            forced_empty: false,
        }
    }

    /// The regular data layers, empty once forced empty.
    pub fn non_external(&self) -> &[String] {
        if self.forced_empty {
            &[]
        } else {
            &self.names
        }
    }

    /// The external data layer, which survives forcing.
    pub fn external_data_layer(&self) -> Option<&str> {
        self.external.as_deref()
    }

    /// Drops the regular data layers. Returns `true` the first time.
    pub fn force_empty(&mut self) -> bool {
        !std::mem::replace(&mut self.forced_empty, true)
    }

    /// Returns `true` once forced empty.
    pub fn is_forced_empty(&self) -> bool {
        self.forced_empty
    }

    /// Returns `true` if there is neither a regular nor an external data layer.
    pub fn is_empty(&self) -> bool {
        self.non_external().is_empty() && self.external.is_none()
    }

    /// Every name, regular layers first and the external layer last.
    pub fn to_vec(&self) -> Vec<String> {
        self.non_external()
            .iter()
            .cloned()
            .chain(self.external.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_force_empty_keeps_external_data_layer() {
        let mut names = DataLayerInstanceNames::new(
            vec!["Gameplay".to_string(), "Audio".to_string()],
            Some("EDL_Season".to_string()),
        );
        assert!(names.force_empty());
        assert!(!names.force_empty());
        assert!(names.non_external().is_empty());
        assert_eq!(names.external_data_layer(), Some("EDL_Season"));
        assert_eq!(names.to_vec(), vec!["EDL_Season".to_string()]);
        assert!(!names.is_empty());
    }

    #[test]
    fn test_hlod_children_respects_external_flag() {
        let (a, b) = (ActorGuid::from_u128(1), ActorGuid::from_u128(2));
        let mut desc = ActorDescriptor::new(ActorGuid::from_u128(3), HLOD_ACTOR_CLASS);
        desc.hlod = Some(HlodActorData {
            child_hlod_actors: vec![a],
            external_child_hlod_actors: vec![b],
            source_hlod_layer: "HLOD0".to_string(),
            ..Default::default()
        });

        assert_eq!(desc.hlod_children(false).copied().collect::<Vec<_>>(), vec![a]);
        assert_eq!(desc.hlod_children(true).copied().collect::<Vec<_>>(), vec![a, b]);
        assert!(desc.is_hlod_actor());
    }

    #[test]
    fn test_is_a_matches_base_class() {
        let mut desc = ActorDescriptor::new(ActorGuid::from_u128(1), "BP_Lamp");
        desc.base_class = Some("StaticMeshActor".to_string());
        assert!(desc.is_a("BP_Lamp"));
        assert!(desc.is_a("StaticMeshActor"));
        assert!(!desc.is_a("Light"));
    }
}
