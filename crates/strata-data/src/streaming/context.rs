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

//! The generation contexts handed to a runtime hash.

use super::container::ContainerCollectionInstanceDescriptor;
use std::collections::BTreeMap;
use strata_core::{
    Aabb, ActorGuid, ActorSetInstance, ContainerId, GenerationContext, ResolvedActor,
};

/// Exposes the validated container instances of a generator as actor sets.
pub struct StreamingGenerationContext<'g, 'w> {
    containers: &'g BTreeMap<ContainerId, ContainerCollectionInstanceDescriptor<'w>>,
    world_bounds: Aabb,
    instances: Vec<ActorSetInstance>,
}

impl<'g, 'w> StreamingGenerationContext<'g, 'w> {
    /// Builds one actor set instance per cluster of every container
    /// instance. Clusters whose actors are all filtered out are skipped.
    pub fn new(
        containers: &'g BTreeMap<ContainerId, ContainerCollectionInstanceDescriptor<'w>>,
    ) -> Self {
        let world_bounds = containers
            .get(&ContainerId::main())
            .map(|main| main.bounds())
            .unwrap_or(Aabb::INVALID);

        let mut instances = Vec::new();
        for desc in containers.values() {
            for cluster in desc.clusters() {
                let actors: Vec<ActorGuid> = cluster
                    .iter()
                    .filter(|guid| !desc.is_filtered(guid))
                    .copied()
                    .collect();
                let Some(first) = actors.first() else {
                    continue;
                };

                // Members share these by the cluster invariant.
                let view = desc.view_map().find_by_guid_checked(first);
                let data = desc.actor_instance_data(first);
                let bounds = actors
                    .iter()
                    .map(|guid| desc.view_map().find_by_guid_checked(guid).runtime_bounds())
                    .filter(Aabb::is_valid)
                    .fold(Aabb::INVALID, |acc, b| acc.merge(&b.translated(desc.translation())));

                let mut data_layers = data.data_layers.clone();
                if let Some(external) = view.external_data_layer() {
                    data_layers.retain(|name| name != external);
                }

                instances.push(ActorSetInstance {
                    container_id: desc.id().clone(),
                    actors,
                    is_spatially_loaded: data.is_spatially_loaded,
                    runtime_grid: data.runtime_grid.clone(),
                    data_layers,
                    external_data_layer: view.external_data_layer().map(str::to_string),
                    content_bundle: desc.content_bundle().or(view.content_bundle()),
                    bounds,
                    translation: desc.translation(),
                });
            }
        }

        Self {
            containers,
            world_bounds,
            instances,
        }
    }
}

impl GenerationContext for StreamingGenerationContext<'_, '_> {
    fn world_bounds(&self) -> Aabb {
        self.world_bounds
    }

    fn actor_set_instances(&self) -> &[ActorSetInstance] {
        &self.instances
    }

    fn resolve_actor(&self, container_id: &ContainerId, guid: &ActorGuid) -> Option<ResolvedActor> {
        let desc = self.containers.get(container_id)?;
        let view = desc.view_map().find_by_guid(guid)?;
        let data = desc.actor_instance_data(guid);
        Some(ResolvedActor {
            guid: *guid,
            label: view.label().to_string(),
            native_class: view.native_class().to_string(),
            container_id: container_id.clone(),
            is_spatially_loaded: data.is_spatially_loaded,
            runtime_grid: data.runtime_grid.clone(),
            hlod_layer: view.hlod_layer().map(str::to_string),
            is_hlod_relevant: view.is_hlod_relevant(),
            bounds: view.runtime_bounds().translated(desc.translation()),
            hlod_level: view.descriptor().hlod.as_ref().map(|hlod| hlod.hlod_level),
        })
    }
}

/// Restricts another context to the actor sets matching a predicate.
pub struct FilteredGenerationContext<'c> {
    inner: &'c dyn GenerationContext,
    instances: Vec<ActorSetInstance>,
}

impl<'c> FilteredGenerationContext<'c> {
    /// Keeps the actor sets of `inner` for which `keep` returns `true`.
    pub fn new(inner: &'c dyn GenerationContext, keep: impl Fn(&ActorSetInstance) -> bool) -> Self {
        let instances = inner
            .actor_set_instances()
            .iter()
            .filter(|instance| keep(instance))
            .cloned()
            .collect();
        Self { inner, instances }
    }

    /// Keeps the actor sets of one external data layer, or the ones without
    /// any when `external_data_layer` is `None`.
    pub fn for_external_data_layer(
        inner: &'c dyn GenerationContext,
        external_data_layer: Option<&str>,
    ) -> Self {
        Self::new(inner, |instance| {
            instance.external_data_layer.as_deref() == external_data_layer
        })
    }
}

impl GenerationContext for FilteredGenerationContext<'_> {
    fn world_bounds(&self) -> Aabb {
        self.inner.world_bounds()
    }

    fn actor_set_instances(&self) -> &[ActorSetInstance] {
        &self.instances
    }

    fn resolve_actor(&self, container_id: &ContainerId, guid: &ActorGuid) -> Option<ResolvedActor> {
        self.inner.resolve_actor(container_id, guid)
    }
}
