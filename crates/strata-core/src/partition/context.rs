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

//! The read-only generation context handed to a [`RuntimeHash`](super::RuntimeHash).

use crate::actor::ActorDescriptor;
use crate::container::ContainerId;
use crate::guid::ActorGuid;
use crate::math::{Aabb, Vec3};

/// One cluster of one container instance: the atomic unit a runtime hash
/// places into a cell.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorSetInstance {
    /// Container instance the actors belong to.
    pub container_id: ContainerId,
    /// Members of the cluster, filtered actors excluded, sorted.
    pub actors: Vec<ActorGuid>,
    /// Whether the set streams spatially.
    pub is_spatially_loaded: bool,
    /// Runtime grid of the set.
    pub runtime_grid: Option<String>,
    /// Runtime data layers of the set, sorted.
    pub data_layers: Vec<String>,
    /// External data layer of the set.
    pub external_data_layer: Option<String>,
    /// Content bundle of the set.
    pub content_bundle: Option<ActorGuid>,
    /// World-space union of the member bounds.
    pub bounds: Aabb,
    /// World-space offset of the owning container instance.
    pub translation: Vec3,
}

/// The effective, fully resolved attributes of one actor of one container
/// instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedActor {
    /// Actor GUID.
    pub guid: ActorGuid,
    /// Actor label.
    pub label: String,
    /// Exact native class.
    pub native_class: String,
    /// Container instance the actor was resolved in.
    pub container_id: ContainerId,
    /// Effective spatial loading flag for this instance.
    pub is_spatially_loaded: bool,
    /// Effective runtime grid for this instance.
    pub runtime_grid: Option<String>,
    /// Effective HLOD layer.
    pub hlod_layer: Option<String>,
    /// Effective HLOD relevance.
    pub is_hlod_relevant: bool,
    /// World-space bounds.
    pub bounds: Aabb,
    /// HLOD level for HLOD actors, `None` for regular actors.
    pub hlod_level: Option<u32>,
}

impl ResolvedActor {
    /// Resolves a descriptor as-is, with no overlay applied. Used for actors
    /// generated after the partition was validated, such as fresh HLOD actors.
    pub fn from_descriptor(desc: &ActorDescriptor, container_id: ContainerId) -> Self {
        Self {
            guid: desc.guid,
            label: desc.label.clone(),
            native_class: desc.native_class.clone(),
            container_id,
            is_spatially_loaded: desc.is_spatially_loaded,
            runtime_grid: desc.runtime_grid.clone(),
            hlod_layer: desc.hlod_layer.clone(),
            is_hlod_relevant: desc.is_hlod_relevant,
            bounds: desc.bounds,
            hlod_level: desc.hlod.as_ref().map(|hlod| hlod.hlod_level),
        }
    }
}

/// Read access to a validated partition.
pub trait GenerationContext {
    /// Union of the main container bounds.
    fn world_bounds(&self) -> Aabb;

    /// Every actor set of every container instance, in deterministic order.
    fn actor_set_instances(&self) -> &[ActorSetInstance];

    /// The effective attributes of an actor of a container instance.
    fn resolve_actor(&self, container_id: &ContainerId, guid: &ActorGuid) -> Option<ResolvedActor>;
}
