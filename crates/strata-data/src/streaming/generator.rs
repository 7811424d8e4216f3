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

//! The streaming generator.
//!
//! Walks the container hierarchy top-down. For each container instance it
//! builds the view map, resolves container defaults into the views,
//! validates them, clusters them and recurses into nested containers. Once
//! every instance exists, a second validation checks the per-instance
//! values and the cluster invariant is asserted.

use super::container::{
    ContainerCollection, ContainerCollectionInstanceDescriptor, ContainerInstanceData,
    DataLayerLookup,
};
use super::context::StreamingGenerationContext;
use super::error::StreamingGenerationError;
use super::error_handler::StreamingGenerationErrorHandler;
use super::validation;
use super::view::ActorDescView;
use super::view_map::{ActorDescViewMap, ViewIndex};
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use strata_core::graph::generate_clusters;
use strata_core::{
    ActorContainer, ActorGuid, ChildContainer, ChildContainerKind, ContainerId,
    DataLayerInstanceNames, RuntimeHash, WorldDescriptor,
};

/// Options of a generation run.
#[derive(Debug, Clone)]
pub struct StreamingGeneratorParams {
    /// When `false`, every actor is forced always loaded. Combined with the
    /// world setting.
    pub enable_streaming: bool,
    /// Actors of these classes, or deriving from them, are skipped.
    pub filtered_classes: Vec<String>,
    /// Registers standalone-HLOD placements of the main container and keeps
    /// their dependencies in one cluster.
    pub include_standalone_hlod_actors: bool,
}

impl Default for StreamingGeneratorParams {
    fn default() -> Self {
        Self {
            enable_streaming: true,
            filtered_classes: Vec::new(),
            include_standalone_hlod_actors: true,
        }
    }
}

impl StreamingGeneratorParams {
    /// Skips actors of `class`.
    #[must_use]
    pub fn with_filtered_class(mut self, class: impl Into<String>) -> Self {
        self.filtered_classes.push(class.into());
        self
    }
}

struct ResolveParams<'a> {
    streaming_enabled: bool,
    default_grid: Option<&'a str>,
    hlod_layer: Option<&'a str>,
    is_hlod_relevant: bool,
}

/// Builds validated container instances for one world.
pub struct StreamingGenerator<'w, 'h> {
    world: &'w WorldDescriptor,
    params: StreamingGeneratorParams,
    runtime_hash: Option<&'h dyn RuntimeHash>,
    error_handler: &'h mut dyn StreamingGenerationErrorHandler,
    containers: BTreeMap<ContainerId, ContainerCollectionInstanceDescriptor<'w>>,
}

impl<'w, 'h> StreamingGenerator<'w, 'h> {
    /// Creates a generator. Without a runtime hash, every grid and HLOD
    /// layer is considered valid and no default grid applies.
    pub fn new(
        world: &'w WorldDescriptor,
        params: StreamingGeneratorParams,
        runtime_hash: Option<&'h dyn RuntimeHash>,
        error_handler: &'h mut dyn StreamingGenerationErrorHandler,
    ) -> Self {
        Self {
            world,
            params,
            runtime_hash,
            error_handler,
            containers: BTreeMap::new(),
        }
    }

    /// The world being generated.
    pub fn world(&self) -> &'w WorldDescriptor {
        self.world
    }

    /// Every container instance, parents before children.
    pub fn containers(&self) -> &BTreeMap<ContainerId, ContainerCollectionInstanceDescriptor<'w>> {
        &self.containers
    }

    /// One container instance.
    pub fn container(&self, id: &ContainerId) -> Option<&ContainerCollectionInstanceDescriptor<'w>> {
        self.containers.get(id)
    }

    /// The context a runtime hash consumes.
    pub fn generation_context(&self) -> StreamingGenerationContext<'_, 'w> {
        StreamingGenerationContext::new(&self.containers)
    }

    /// Builds, validates and clusters every container instance of
    /// `collection`. Replaces the result of any previous call.
    pub fn preparation_phase(
        &mut self,
        collection: ContainerCollection<'w>,
    ) -> Result<(), StreamingGenerationError> {
        let started = Instant::now();
        self.containers.clear();

        let main = ContainerCollectionInstanceDescriptor::main(self.world, collection);
        let package = main.package();
        let mut ancestry = vec![package];
        self.create_container(main, &mut ancestry)?;

        let runtime_hash = self.runtime_hash;
        for desc in self.containers.values_mut() {
            validation::validate_container_instance_descriptor(
                desc,
                runtime_hash,
                &mut *self.error_handler,
            )?;
        }

        for desc in self.containers.values() {
            validation::check_cluster_invariants(desc)?;
        }

        log::info!(
            "[StreamingGeneration] Prepared {} container instances of '{}' in {:.2?}",
            self.containers.len(),
            package,
            started.elapsed()
        );
        Ok(())
    }

    fn create_container(
        &mut self,
        mut desc: ContainerCollectionInstanceDescriptor<'w>,
        ancestry: &mut Vec<&'w str>,
    ) -> Result<(), StreamingGenerationError> {
        let data_layers = DataLayerLookup::new(self.world, desc.collection.containers());

        self.create_actor_desc_view_map(&mut desc)?;
        self.resolve_container_descriptor(&mut desc, &data_layers);
        desc.validation = validation::validate_container_descriptor(
            &mut desc,
            &data_layers,
            &mut *self.error_handler,
        )?;
        update_container_descriptor(&mut desc);
        compute_per_instance_data(&mut desc);

        let id = desc.id.clone();
        let children = self.child_descriptors(&desc, ancestry);
        self.containers.insert(id.clone(), desc);

        for child in children {
            let child_id = child.id.clone();
            ancestry.push(child.package());
            self.create_container(child, ancestry)?;
            ancestry.pop();

            let child_bounds = self.containers.get(&child_id).map(|child| child.bounds);
            if let (Some(child_bounds), Some(parent)) = (child_bounds, self.containers.get_mut(&id)) {
                parent.bounds = parent.bounds.merge(&child_bounds);
            }
        }
        Ok(())
    }

    fn is_filtered_class(&self, actor: &strata_core::ActorDescriptor) -> bool {
        self.params
            .filtered_classes
            .iter()
            .any(|class| actor.is_a(class))
    }

    fn create_actor_desc_view_map(
        &self,
        desc: &mut ContainerCollectionInstanceDescriptor<'w>,
    ) -> Result<(), StreamingGenerationError> {
        let is_main = desc.id.is_main();
        let containers: Vec<&'w ActorContainer> = desc.collection.containers().to_vec();

        for container in containers {
            for actor in &container.actors {
                if self.is_filtered_class(actor) {
                    continue;
                }
                if actor.is_editor_only {
                    desc.editor_only_actors.insert(actor.guid);
                    continue;
                }

                match &actor.child_container {
                    Some(child) if child.kind == ChildContainerKind::StandaloneHlod => {
                        if !is_main || !self.params.include_standalone_hlod_actors {
                            continue;
                        }
                        self.collect_standalone_hlod_dependencies(
                            child,
                            &mut desc.standalone_hlod_dependencies,
                        );
                    }
                    Some(_) => {
                        desc.child_container_views.push(ActorDescView::new(actor));
                        continue;
                    }
                    None => {}
                }

                if let Err(e) = desc.view_map.emplace(ActorDescView::new(actor)) {
                    log::error!(
                        "[StreamingGeneration] Container {}: {}",
                        desc.id,
                        e
                    );
                    return Err(StreamingGenerationError::DuplicateActor {
                        container: desc.id.clone(),
                        guid: e.0,
                    });
                }
            }
        }
        Ok(())
    }

    /// HLOD actors of a standalone-HLOD container with several external
    /// children require those children to stream together.
    fn collect_standalone_hlod_dependencies(
        &self,
        child: &ChildContainer,
        dependencies: &mut Vec<(ActorGuid, ActorGuid)>,
    ) {
        let Some(template) = self.world.child_containers.get(&child.package) else {
            return;
        };
        for hlod in template.actors.iter().filter_map(|actor| actor.hlod.as_ref()) {
            let external = &hlod.external_child_hlod_actors;
            for (i, first) in external.iter().enumerate() {
                for second in &external[i + 1..] {
                    dependencies.push((*first, *second));
                }
            }
        }
    }

    fn resolve_container_descriptor(
        &self,
        desc: &mut ContainerCollectionInstanceDescriptor<'w>,
        data_layers: &DataLayerLookup<'_>,
    ) {
        let default_grid = self.runtime_hash.and_then(|hash| hash.default_grid());
        let hlod_layer = desc.hlod_layer.clone();
        let params = ResolveParams {
            streaming_enabled: self.params.enable_streaming && self.world.streaming_enabled,
            default_grid: default_grid.as_deref(),
            hlod_layer: hlod_layer.as_deref(),
            is_hlod_relevant: desc.is_hlod_relevant,
        };

        let indices: Vec<ViewIndex> = desc.view_map.indices().collect();
        for &index in &indices {
            resolve_view(desc.view_map.get_mut(index), &params, data_layers);
        }
        for view in &mut desc.child_container_views {
            resolve_view(view, &params, data_layers);
        }

        for &index in &indices {
            let Some(parent) = desc.view_map.get(index).descriptor().parent_actor else {
                continue;
            };
            match desc.view_map.index_of(&parent) {
                Some(parent_index) if !creates_cycle(&desc.view_map, index, parent_index) => {
                    desc.view_map.get_mut(index).set_parent_view(parent_index);
                }
                Some(_) => {
                    log::warn!(
                        "[StreamingGeneration] Actor {} has a cyclic attachment, parent ignored",
                        desc.view_map.get(index)
                    );
                }
                None if desc.editor_only_actors.contains(&parent) => {
                    desc.view_map.get_mut(index).set_editor_only_parent(parent);
                }
                None => {}
            }
        }
    }

    fn child_descriptors(
        &self,
        desc: &ContainerCollectionInstanceDescriptor<'w>,
        ancestry: &[&'w str],
    ) -> Vec<ContainerCollectionInstanceDescriptor<'w>> {
        let mut children = Vec::new();
        for view in &desc.child_container_views {
            let Some(child) = view.descriptor().child_container.as_ref() else {
                continue;
            };
            let Some(template) = self.world.child_containers.get(&child.package) else {
                log::warn!(
                    "[StreamingGeneration] Container actor {} places unknown container '{}'",
                    view,
                    child.package
                );
                continue;
            };
            if ancestry.contains(&template.package.as_str()) {
                log::warn!(
                    "[StreamingGeneration] Container actor {} recursively places '{}', skipped",
                    view,
                    child.package
                );
                continue;
            }

            let view = desc.view_map.view_ref(view);
            let parent_data = &desc.instance_data;
            let runtime_grid = if desc.id.is_main() || parent_data.runtime_grid.is_none() {
                view.runtime_grid().map(str::to_string)
            } else {
                parent_data.runtime_grid.clone()
            };
            let instance_data = ContainerInstanceData {
                is_spatially_loaded: parent_data.is_spatially_loaded && view.is_spatially_loaded(),
                runtime_grid,
                data_layers: merge_data_layers(
                    view.runtime_data_layer_instance_names(),
                    &parent_data.data_layers,
                ),
            };

            let mut instance = ContainerCollectionInstanceDescriptor::new(
                desc.id.child(view.guid()),
                Some(desc.id.clone()),
                view.label().to_string(),
                ContainerCollection::template(template),
                desc.translation + child.translation,
                desc.content_bundle,
                view.hlod_layer()
                    .map(str::to_string)
                    .or_else(|| desc.hlod_layer.clone()),
                desc.is_hlod_relevant && view.is_hlod_relevant(),
                instance_data,
            );
            instance.filtered_actors = child.filtered_actors.iter().copied().collect();
            children.push(instance);
        }
        children
    }
}

fn resolve_view(
    view: &mut ActorDescView<'_>,
    params: &ResolveParams<'_>,
    data_layers: &DataLayerLookup<'_>,
) {
    let desc = view.descriptor();

    if !params.streaming_enabled {
        view.set_forced_non_spatially_loaded();
        view.set_forced_no_runtime_grid();
    } else if view.own_runtime_grid().is_none() {
        view.set_runtime_grid(params.default_grid.map(str::to_string));
    }

    let mut resolved = Vec::new();
    let mut runtime = Vec::new();
    for name in &desc.data_layers {
        match data_layers.get(name) {
            Some(instance) => {
                resolved.push(name.clone());
                if instance.is_runtime {
                    runtime.push(name.clone());
                }
            }
            None => log::warn!(
                "[StreamingGeneration] Actor {} references unknown data layer '{}'",
                view,
                name
            ),
        }
    }
    let external = desc.external_data_layer.clone();
    view.set_data_layer_instance_names(DataLayerInstanceNames::new(resolved, external.clone()));
    view.set_runtime_data_layer_instance_names(DataLayerInstanceNames::new(runtime, external));

    if desc.hlod_layer.is_none()
        && !desc.is_hlod_actor()
        && view.own_is_spatially_loaded()
        && view.is_hlod_relevant()
    {
        view.set_runtime_hlod_layer(params.hlod_layer.map(str::to_string));
    }
    if !params.is_hlod_relevant {
        view.set_forced_hlod_irrelevant();
    }
}

fn creates_cycle(map: &ActorDescViewMap<'_>, child: ViewIndex, parent: ViewIndex) -> bool {
    let mut current = Some(parent);
    while let Some(index) = current {
        if index == child {
            return true;
        }
        current = map.get(index).parent_view();
    }
    false
}

/// Union of the view runtime data layers and the inherited ones, sorted.
fn merge_data_layers(own: &DataLayerInstanceNames, inherited: &[String]) -> Vec<String> {
    let mut merged = own.to_vec();
    merged.extend(inherited.iter().cloned());
    merged.sort();
    merged.dedup();
    merged
}

/// Clusters the views and accumulates the bounds of the spatially loaded ones.
fn update_container_descriptor(desc: &mut ContainerCollectionInstanceDescriptor<'_>) {
    let mut dependencies: HashMap<ActorGuid, Vec<ActorGuid>> = HashMap::new();
    for (first, second) in &desc.standalone_hlod_dependencies {
        dependencies.entry(*first).or_default().push(*second);
        dependencies.entry(*second).or_default().push(*first);
    }

    let nodes: Vec<(ActorGuid, Vec<ActorGuid>)> = desc
        .view_map
        .iter()
        .map(|view| {
            let mut references = view.references().to_vec();
            if let Some(extra) = dependencies.get(&view.guid()) {
                references.extend(extra.iter().copied());
            }
            (view.guid(), references)
        })
        .collect();
    desc.clusters = generate_clusters(nodes);

    let mut bounds = desc.bounds;
    for view in desc.view_map.iter() {
        let actor_bounds = view.runtime_bounds();
        if view.is_spatially_loaded() && actor_bounds.is_valid() {
            bounds = bounds.merge(&actor_bounds.translated(desc.translation));
        }
    }
    desc.bounds = bounds;
}

/// Records, for every view whose effective values differ from the container
/// defaults, its own per-instance values.
fn compute_per_instance_data(desc: &mut ContainerCollectionInstanceDescriptor<'_>) {
    let defaults = &desc.instance_data;
    let mut per_instance = HashMap::new();
    for view in desc.view_map.iter() {
        let data = ContainerInstanceData {
            is_spatially_loaded: defaults.is_spatially_loaded && view.is_spatially_loaded(),
            runtime_grid: match &defaults.runtime_grid {
                Some(grid) => Some(grid.clone()),
                None => view.runtime_grid().map(str::to_string),
            },
            data_layers: merge_data_layers(
                view.runtime_data_layer_instance_names(),
                &defaults.data_layers,
            ),
        };
        if data != *defaults {
            per_instance.insert(view.guid(), data);
        }
    }
    desc.per_instance_data = per_instance;
}
