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

//! Container collections and the per-instance state built for them.

use super::validation::ValidationReport;
use super::view::ActorDescView;
use super::view_map::ActorDescViewMap;
use std::collections::{BTreeSet, HashMap, HashSet};
use strata_core::{
    Aabb, ActorContainer, ActorGuid, ContainerId, ContainerKind, DataLayerInstance, Vec3,
    WorldDescriptor,
};

/// The containers processed together by one generation run.
///
/// Either the base container with every external data layer container, or
/// a single content bundle container.
#[derive(Debug, Clone)]
pub struct ContainerCollection<'w> {
    containers: Vec<&'w ActorContainer>,
}

impl<'w> ContainerCollection<'w> {
    /// The base container followed by the external data layer containers.
    /// `None` if the world has no base container.
    pub fn base_and_external_data_layers(world: &'w WorldDescriptor) -> Option<Self> {
        let base = world.base_container()?;
        let mut containers = vec![base];
        containers.extend(
            world
                .containers
                .iter()
                .filter(|container| container.external_data_layer().is_some()),
        );
        Some(Self { containers })
    }

    /// A content bundle container on its own.
    pub fn content_bundle(container: &'w ActorContainer) -> Self {
        Self {
            containers: vec![container],
        }
    }

    /// Every content bundle collection of `world`, in world order.
    pub fn content_bundles(world: &'w WorldDescriptor) -> Vec<Self> {
        world
            .containers
            .iter()
            .filter(|container| container.content_bundle().is_some())
            .map(Self::content_bundle)
            .collect()
    }

    /// A child-container template on its own.
    pub(crate) fn template(container: &'w ActorContainer) -> Self {
        Self {
            containers: vec![container],
        }
    }

    /// The containers, base first.
    pub fn containers(&self) -> &[&'w ActorContainer] {
        &self.containers
    }

    /// Package of the first container, which names the collection.
    pub fn package(&self) -> &'w str {
        self.containers
            .first()
            .copied()
            .map(|container| container.package.as_str())
            .unwrap_or_default()
    }

    /// The content bundle this collection generates, if any.
    pub fn content_bundle_guid(&self) -> Option<ActorGuid> {
        match self.containers.as_slice() {
            [single] => single.content_bundle(),
            _ => None,
        }
    }

    /// External data layer assets of the collection, in container order.
    pub fn external_data_layers(&self) -> impl Iterator<Item = &'w str> + '_ {
        self.containers
            .iter()
            .copied()
            .filter_map(|container| container.external_data_layer())
    }

    /// Level-script references of the base container.
    pub fn world_references(&self) -> &'w [ActorGuid] {
        self.containers
            .iter()
            .copied()
            .find(|container| container.kind == ContainerKind::Base)
            .map(|container| container.world_references.as_slice())
            .unwrap_or_default()
    }
}

/// Data layer instances visible from a collection, world ones first.
#[derive(Debug, Default)]
pub struct DataLayerLookup<'w> {
    instances: HashMap<&'w str, &'w DataLayerInstance>,
}

impl<'w> DataLayerLookup<'w> {
    /// Indexes the data layers of `world` and of `containers`.
    pub fn new(world: &'w WorldDescriptor, containers: &[&'w ActorContainer]) -> Self {
        let mut instances = HashMap::new();
        for instance in containers
            .iter()
            .flat_map(|container| container.data_layers.iter())
            .chain(world.data_layers.iter())
        {
            instances.insert(instance.name.as_str(), instance);
        }
        Self { instances }
    }

    /// Looks a data layer instance up by name.
    pub fn get(&self, name: &str) -> Option<&'w DataLayerInstance> {
        self.instances.get(name).copied()
    }
}

/// Values a container instance applies to the actors it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInstanceData {
    /// Spatial flag, AND-ed down the container tree.
    pub is_spatially_loaded: bool,
    /// Runtime grid inherited from the enclosing container.
    pub runtime_grid: Option<String>,
    /// Runtime data layers accumulated down the container tree, sorted.
    pub data_layers: Vec<String>,
}

impl Default for ContainerInstanceData {
    fn default() -> Self {
        Self {
            is_spatially_loaded: true,
            runtime_grid: None,
            data_layers: Vec::new(),
        }
    }
}

/// The state of one container instance: its views, clusters, bounds and the
/// values it passes to nested containers.
#[derive(Debug)]
pub struct ContainerCollectionInstanceDescriptor<'w> {
    pub(crate) id: ContainerId,
    pub(crate) parent_id: Option<ContainerId>,
    pub(crate) owner_name: String,
    pub(crate) collection: ContainerCollection<'w>,
    pub(crate) translation: Vec3,
    pub(crate) bounds: Aabb,
    pub(crate) content_bundle: Option<ActorGuid>,
    pub(crate) hlod_layer: Option<String>,
    pub(crate) is_hlod_relevant: bool,
    pub(crate) instance_data: ContainerInstanceData,
    pub(crate) view_map: ActorDescViewMap<'w>,
    pub(crate) child_container_views: Vec<ActorDescView<'w>>,
    pub(crate) editor_only_actors: HashSet<ActorGuid>,
    pub(crate) clusters: Vec<Vec<ActorGuid>>,
    pub(crate) per_instance_data: HashMap<ActorGuid, ContainerInstanceData>,
    pub(crate) filtered_actors: BTreeSet<ActorGuid>,
    pub(crate) standalone_hlod_dependencies: Vec<(ActorGuid, ActorGuid)>,
    pub(crate) validation: ValidationReport,
    pub(crate) instance_validation: ValidationReport,
}

impl<'w> ContainerCollectionInstanceDescriptor<'w> {
    /// The descriptor of the main container of `collection`.
    pub(crate) fn main(world: &'w WorldDescriptor, collection: ContainerCollection<'w>) -> Self {
        let content_bundle = collection.content_bundle_guid();
        Self::new(
            ContainerId::main(),
            None,
            world.name.clone(),
            collection,
            Vec3::ZERO,
            content_bundle,
            world.default_hlod_layer.clone(),
            true,
            ContainerInstanceData::default(),
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: ContainerId,
        parent_id: Option<ContainerId>,
        owner_name: String,
        collection: ContainerCollection<'w>,
        translation: Vec3,
        content_bundle: Option<ActorGuid>,
        hlod_layer: Option<String>,
        is_hlod_relevant: bool,
        instance_data: ContainerInstanceData,
    ) -> Self {
        Self {
            id,
            parent_id,
            owner_name,
            collection,
            translation,
            bounds: Aabb::INVALID,
            content_bundle,
            hlod_layer,
            is_hlod_relevant,
            instance_data,
            view_map: ActorDescViewMap::new(),
            child_container_views: Vec::new(),
            editor_only_actors: HashSet::new(),
            clusters: Vec::new(),
            per_instance_data: HashMap::new(),
            filtered_actors: BTreeSet::new(),
            standalone_hlod_dependencies: Vec::new(),
            validation: ValidationReport::default(),
            instance_validation: ValidationReport::default(),
        }
    }

    /// The instance ID.
    pub fn id(&self) -> &ContainerId {
        &self.id
    }

    /// The enclosing instance, `None` for the main container.
    pub fn parent_id(&self) -> Option<&ContainerId> {
        self.parent_id.as_ref()
    }

    /// Name of the world or actor owning this instance.
    pub fn owner_name(&self) -> &str {
        &self.owner_name
    }

    /// Package of the instantiated container.
    pub fn package(&self) -> &'w str {
        self.collection.package()
    }

    /// The containers of this instance.
    pub fn collection(&self) -> &ContainerCollection<'w> {
        &self.collection
    }

    /// World-space offset of the instance.
    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    /// World-space bounds of the instance and its whole subtree.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Content bundle owning the instance.
    pub fn content_bundle(&self) -> Option<ActorGuid> {
        self.content_bundle
    }

    /// HLOD layer inherited by actors without one.
    pub fn hlod_layer(&self) -> Option<&str> {
        self.hlod_layer.as_deref()
    }

    /// Whether actors of the instance contribute to HLODs.
    pub fn is_hlod_relevant(&self) -> bool {
        self.is_hlod_relevant
    }

    /// Default per-instance values.
    pub fn instance_data(&self) -> &ContainerInstanceData {
        &self.instance_data
    }

    /// Per-instance values of `guid`, the container default if it has none
    /// of its own.
    pub fn actor_instance_data(&self, guid: &ActorGuid) -> &ContainerInstanceData {
        self.per_instance_data
            .get(guid)
            .unwrap_or(&self.instance_data)
    }

    /// The views of the instance.
    pub fn view_map(&self) -> &ActorDescViewMap<'w> {
        &self.view_map
    }

    /// Views of the actors placing nested containers.
    pub fn child_container_views(&self) -> &[ActorDescView<'w>] {
        &self.child_container_views
    }

    /// Actors excluded from the runtime partition as editor-only.
    pub fn editor_only_actors(&self) -> &HashSet<ActorGuid> {
        &self.editor_only_actors
    }

    /// Clusters of the instance, members and clusters sorted.
    pub fn clusters(&self) -> &[Vec<ActorGuid>] {
        &self.clusters
    }

    /// Actors removed from this instance by its placement filter.
    pub fn filtered_actors(&self) -> &BTreeSet<ActorGuid> {
        &self.filtered_actors
    }

    /// Returns `true` if `guid` is filtered out of this instance.
    pub fn is_filtered(&self, guid: &ActorGuid) -> bool {
        self.filtered_actors.contains(guid)
    }

    /// What the fixpoint validation of the views found and corrected.
    pub fn validation_report(&self) -> ValidationReport {
        self.validation
    }

    /// What the validation of the per-instance values found and corrected.
    pub fn instance_validation_report(&self) -> ValidationReport {
        self.instance_validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::DataLayerLoadFilter;

    fn world() -> WorldDescriptor {
        let mut base = ActorContainer::new("/Game/Maps/Main", ContainerKind::Base);
        base.world_references = vec![ActorGuid::from_u128(9)];
        let edl = ActorContainer::new(
            "/Game/EDL/Winter",
            ContainerKind::ExternalDataLayer("EDL_Winter".to_string()),
        );
        let bundle = ActorContainer::new(
            "/Game/Bundles/Festival",
            ContainerKind::ContentBundle(ActorGuid::from_u128(100)),
        );
        WorldDescriptor::new("Main", vec![bundle, edl, base])
    }

    #[test]
    fn test_base_and_external_data_layers_orders_base_first() {
        let world = world();
        let collection = ContainerCollection::base_and_external_data_layers(&world).unwrap();

        let packages: Vec<_> = collection
            .containers()
            .iter()
            .map(|container| container.package.as_str())
            .collect();
        assert_eq!(packages, vec!["/Game/Maps/Main", "/Game/EDL/Winter"]);
        assert_eq!(collection.package(), "/Game/Maps/Main");
        assert_eq!(collection.external_data_layers().collect::<Vec<_>>(), vec!["EDL_Winter"]);
        assert_eq!(collection.world_references(), &[ActorGuid::from_u128(9)]);
        assert_eq!(collection.content_bundle_guid(), None);
    }

    #[test]
    fn test_content_bundle_collections() {
        let world = world();
        let bundles = ContainerCollection::content_bundles(&world);

        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles[0].content_bundle_guid(), Some(ActorGuid::from_u128(100)));
        assert!(bundles[0].world_references().is_empty());
    }

    #[test]
    fn test_missing_base_container() {
        let world = WorldDescriptor::new("Empty", Vec::new());
        assert!(ContainerCollection::base_and_external_data_layers(&world).is_none());
    }

    #[test]
    fn test_data_layer_lookup_prefers_world_instances() {
        let mut world = world();
        world.data_layers.push(DataLayerInstance {
            name: "Gameplay".to_string(),
            is_runtime: true,
            load_filter: DataLayerLoadFilter::ClientOnly,
        });
        world.containers[2].data_layers.push(DataLayerInstance {
            name: "Gameplay".to_string(),
            is_runtime: false,
            load_filter: DataLayerLoadFilter::None,
        });
        let collection = ContainerCollection::base_and_external_data_layers(&world).unwrap();

        let lookup = DataLayerLookup::new(&world, collection.containers());
        let gameplay = lookup.get("Gameplay").unwrap();
        assert!(gameplay.is_runtime);
        assert!(lookup.get("Audio").is_none());
    }
}
