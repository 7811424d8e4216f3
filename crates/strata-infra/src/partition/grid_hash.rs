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

//! A runtime hash laying actor sets out on uniform 2D grids.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strata_core::{
    Aabb, ActorDescriptor, ActorGuid, ContainerId, GenerationContext, HlodCreationContext,
    HlodCreationParams, ResolvedActor, RuntimeCell, RuntimeHash, SetupHlodActorsParams,
    StreamingPolicy,
};

const DEFAULT_CELL_SIZE: f32 = 12_800.0;
const GENERATED_PACKAGE_ROOT: &str = "/Generated/StreamingCells";

/// One runtime grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    /// Grid name, as referenced by actor descriptors.
    pub name: String,
    /// Edge length of a level 0 cell.
    pub cell_size: f32,
    /// Actor classes allowed in the grid. Empty allows every class.
    pub valid_classes: Vec<String>,
    /// HLOD layers allowed in the grid. Empty allows every layer.
    pub hlod_layers: Vec<String>,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            name: "MainGrid".to_string(),
            cell_size: DEFAULT_CELL_SIZE,
            valid_classes: Vec::new(),
            hlod_layers: Vec::new(),
        }
    }
}

/// One HLOD layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HlodLayerSettings {
    /// Layer name, as referenced by actor descriptors.
    pub name: String,
    /// Layer the generated HLOD actors belong to, building the next level.
    pub parent_layer: Option<String>,
    /// How many cells of this level fit along one edge of a parent cell.
    pub cell_size_multiplier: u32,
}

impl Default for HlodLayerSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            parent_layer: None,
            cell_size_multiplier: 2,
        }
    }
}

/// Grids and HLOD layers of a world.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionSettings {
    /// Grid of actors that do not request one. Falls back to the first grid.
    pub default_grid: Option<String>,
    /// Every runtime grid.
    pub grids: Vec<GridSettings>,
    /// Every HLOD layer.
    pub hlod_layers: Vec<HlodLayerSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct CellKey {
    grid: Option<String>,
    coords: Option<(i64, i64)>,
    data_layers: Vec<String>,
    external_data_layer: Option<String>,
    content_bundle: Option<ActorGuid>,
}

impl CellKey {
    fn name(&self, level: u32) -> String {
        let mut name = self.grid.clone().unwrap_or_else(|| "NoGrid".to_string());
        match self.coords {
            Some((x, y)) => name.push_str(&format!("_L{}_X{}_Y{}", level, x, y)),
            None => name.push_str("_AlwaysLoaded"),
        }
        if !self.data_layers.is_empty() {
            let joined = self.data_layers.join("+");
            let digest = blake3::hash(joined.as_bytes()).to_hex();
            name.push_str("_DL");
            name.push_str(&digest.as_str()[..8]);
        }
        if let Some(asset) = &self.external_data_layer {
            name.push_str("_EDL_");
            name.extend(asset.chars().map(|c| if c.is_alphanumeric() { c } else { '_' }));
        }
        if let Some(bundle) = self.content_bundle {
            name.push_str(&format!("_CB{}", bundle));
        }
        name
    }
}

#[derive(Debug, Default)]
struct CellContent {
    actors: Vec<(ContainerId, ActorGuid)>,
    bounds: Aabb,
}

/// A [`RuntimeHash`] assigning every spatially loaded actor set to the
/// grid cell holding the center of its bounds. Non spatial sets go to one
/// always loaded cell per grid.
#[derive(Debug, Clone, Default)]
pub struct SpatialGridHash {
    settings: PartitionSettings,
}

impl SpatialGridHash {
    /// Creates a hash over `settings`. Without any grid, a default
    /// `MainGrid` is used.
    pub fn new(mut settings: PartitionSettings) -> Self {
        if settings.grids.is_empty() {
            settings.grids.push(GridSettings::default());
        }
        Self { settings }
    }

    /// The settings of the hash.
    pub fn settings(&self) -> &PartitionSettings {
        &self.settings
    }

    fn grid(&self, name: &str) -> Option<&GridSettings> {
        self.settings.grids.iter().find(|grid| grid.name == name)
    }

    fn hlod_layer(&self, name: &str) -> Option<&HlodLayerSettings> {
        self.settings.hlod_layers.iter().find(|layer| layer.name == name)
    }

    fn effective_grid(&self, grid: Option<&str>) -> Option<String> {
        grid.map(str::to_string).or_else(|| self.default_grid())
    }

    fn cell_size(&self, grid: Option<&str>) -> f32 {
        grid.and_then(|name| self.grid(name))
            .map(|grid| grid.cell_size)
            .filter(|size| *size > 0.0)
            .unwrap_or(DEFAULT_CELL_SIZE)
    }

    fn cell_coords(bounds: &Aabb, cell_size: f32) -> Option<(i64, i64)> {
        if !bounds.is_valid() {
            return None;
        }
        let center = bounds.center();
        Some((
            (center.x / cell_size).floor() as i64,
            (center.y / cell_size).floor() as i64,
        ))
    }

    fn partition(&self, context: &dyn GenerationContext) -> BTreeMap<CellKey, CellContent> {
        let mut cells: BTreeMap<CellKey, CellContent> = BTreeMap::new();
        for set in context.actor_set_instances() {
            let grid = self.effective_grid(set.runtime_grid.as_deref());
            let coords = if set.is_spatially_loaded {
                Self::cell_coords(&set.bounds, self.cell_size(grid.as_deref()))
            } else {
                None
            };
            let mut data_layers = set.data_layers.clone();
            data_layers.sort();
            data_layers.dedup();

            let key = CellKey {
                grid,
                coords,
                data_layers,
                external_data_layer: set.external_data_layer.clone(),
                content_bundle: set.content_bundle,
            };
            let cell = cells.entry(key).or_insert_with(|| CellContent {
                actors: Vec::new(),
                bounds: Aabb::INVALID,
            });
            cell.actors.extend(
                set.actors
                    .iter()
                    .map(|guid| (set.container_id.clone(), *guid)),
            );
            if set.bounds.is_valid() {
                cell.bounds = cell.bounds.merge(&set.bounds);
            }
        }
        cells
    }

    /// Builds level 1 and up from the HLOD actors of the level below, until
    /// no layer has a parent.
    fn setup_parent_levels(
        &self,
        params: &SetupHlodActorsParams<'_>,
        mut pending: Vec<(Option<String>, ActorDescriptor)>,
        out: &mut Vec<ActorDescriptor>,
    ) {
        let mut level = 1;
        let max_level = self.settings.hlod_layers.len() as u32;
        while !pending.is_empty() && level <= max_level {
            let mut cells: BTreeMap<(Option<String>, String, Option<(i64, i64)>), Vec<ResolvedActor>> =
                BTreeMap::new();
            for (grid, actor) in pending.drain(..) {
                let Some(layer_name) = actor.hlod_layer.clone() else {
                    continue;
                };
                let Some(layer) = self.hlod_layer(&layer_name) else {
                    log::warn!(
                        "[HLODBuilder] HLOD actor {} uses unknown HLOD layer '{}'",
                        actor.guid,
                        layer_name
                    );
                    continue;
                };
                let multiplier = layer.cell_size_multiplier.max(1) as f32;
                let cell_size = self.cell_size(grid.as_deref()) * multiplier.powi(level as i32);
                let coords = Self::cell_coords(&actor.bounds, cell_size);
                cells
                    .entry((grid, layer_name, coords))
                    .or_default()
                    .push(ResolvedActor::from_descriptor(&actor, ContainerId::main()));
            }

            for ((grid, layer_name, coords), actors) in cells {
                let key = CellKey {
                    grid: grid.clone(),
                    coords,
                    data_layers: Vec::new(),
                    external_data_layer: None,
                    content_bundle: None,
                };
                let cell_name = key.name(level);
                let cell_bounds = actors
                    .iter()
                    .map(|actor| actor.bounds)
                    .filter(Aabb::is_valid)
                    .fold(Aabb::INVALID, |acc, b| acc.merge(&b));
                let parent_layer = self
                    .hlod_layer(&layer_name)
                    .and_then(|layer| layer.parent_layer.as_deref());
                let created = params.hlod_utilities.create_hlod_actors(
                    &HlodCreationContext {
                        world_name: params.world_name,
                        container_package: params.container_package,
                        cell_name: &cell_name,
                        grid: grid.as_deref(),
                        cell_bounds,
                    },
                    &HlodCreationParams {
                        hlod_layer: &layer_name,
                        parent_layer,
                        hlod_level: level,
                    },
                    &actors,
                );
                for actor in created {
                    if actor.hlod_layer.is_some() {
                        pending.push((grid.clone(), actor.clone()));
                    }
                    out.push(actor);
                }
            }
            level += 1;
        }
        if !pending.is_empty() {
            log::error!(
                "[HLODBuilder] HLOD layers form a cycle, {} HLOD actors left without a parent",
                pending.len()
            );
        }
    }
}

impl RuntimeHash for SpatialGridHash {
    fn default_grid(&self) -> Option<String> {
        self.settings
            .default_grid
            .clone()
            .or_else(|| self.settings.grids.first().map(|grid| grid.name.clone()))
    }

    fn is_valid_grid(&self, grid: Option<&str>, actor_class: &str) -> bool {
        let Some(name) = grid else {
            return true;
        };
        self.grid(name).is_some_and(|grid| {
            grid.valid_classes.is_empty() || grid.valid_classes.iter().any(|c| c == actor_class)
        })
    }

    fn is_valid_hlod_layer(&self, grid: Option<&str>, hlod_layer: &str) -> bool {
        if self.hlod_layer(hlod_layer).is_none() {
            return false;
        }
        match self.effective_grid(grid).as_deref().and_then(|name| self.grid(name)) {
            Some(grid) => {
                grid.hlod_layers.is_empty() || grid.hlod_layers.iter().any(|l| l == hlod_layer)
            }
            None => true,
        }
    }

    fn generate_streaming(
        &self,
        policy: &mut StreamingPolicy,
        context: &dyn GenerationContext,
        packages_to_generate: &mut Vec<String>,
    ) -> bool {
        for (key, content) in self.partition(context) {
            let name = key.name(0);
            let package = format!("{}/{}", GENERATED_PACKAGE_ROOT, name);
            packages_to_generate.push(package.clone());
            policy.cells.push(RuntimeCell {
                name,
                grid: key.grid,
                coords: key.coords,
                is_spatially_loaded: key.coords.is_some(),
                data_layers: key.data_layers,
                external_data_layer: key.external_data_layer,
                content_bundle: key.content_bundle,
                actors: content
                    .actors
                    .into_iter()
                    .map(|(container, guid)| (container.to_string(), guid))
                    .collect(),
                bounds: content.bounds,
                package,
            });
        }
        log::debug!("[StreamingGeneration] Grid hash produced {} cells", policy.cells.len());
        true
    }

    fn setup_hlod_actors(
        &self,
        context: &dyn GenerationContext,
        params: &SetupHlodActorsParams<'_>,
    ) -> Vec<ActorDescriptor> {
        let mut out = Vec::new();
        let mut pending = Vec::new();

        for (key, content) in self.partition(context) {
            // HLODs only stand in for cells that stream out.
            if key.coords.is_none() {
                continue;
            }
            let mut per_layer: BTreeMap<String, Vec<ResolvedActor>> = BTreeMap::new();
            for (container_id, guid) in &content.actors {
                let Some(actor) = context.resolve_actor(container_id, guid) else {
                    continue;
                };
                let Some(layer) = actor.hlod_layer.clone() else {
                    continue;
                };
                if actor.is_hlod_relevant && self.is_valid_hlod_layer(key.grid.as_deref(), &layer) {
                    per_layer.entry(layer).or_default().push(actor);
                }
            }

            let cell_name = key.name(0);
            for (layer_name, actors) in per_layer {
                let parent_layer = self
                    .hlod_layer(&layer_name)
                    .and_then(|layer| layer.parent_layer.as_deref());
                let created = params.hlod_utilities.create_hlod_actors(
                    &HlodCreationContext {
                        world_name: params.world_name,
                        container_package: params.container_package,
                        cell_name: &cell_name,
                        grid: key.grid.as_deref(),
                        cell_bounds: content.bounds,
                    },
                    &HlodCreationParams {
                        hlod_layer: &layer_name,
                        parent_layer,
                        hlod_level: 0,
                    },
                    &actors,
                );
                for actor in created {
                    if actor.hlod_layer.is_some() {
                        pending.push((key.grid.clone(), actor.clone()));
                    }
                    out.push(actor);
                }
            }
        }

        self.setup_parent_levels(params, pending, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::Vec3;

    fn settings() -> PartitionSettings {
        PartitionSettings {
            default_grid: Some("MainGrid".to_string()),
            grids: vec![
                GridSettings {
                    name: "MainGrid".to_string(),
                    cell_size: 100.0,
                    ..Default::default()
                },
                GridSettings {
                    name: "Foliage".to_string(),
                    cell_size: 50.0,
                    valid_classes: vec!["InstancedFoliageActor".to_string()],
                    hlod_layers: vec!["FoliageHLOD".to_string()],
                },
            ],
            hlod_layers: vec![
                HlodLayerSettings {
                    name: "HLOD0".to_string(),
                    parent_layer: Some("HLOD1".to_string()),
                    ..Default::default()
                },
                HlodLayerSettings {
                    name: "HLOD1".to_string(),
                    ..Default::default()
                },
                HlodLayerSettings {
                    name: "FoliageHLOD".to_string(),
                    ..Default::default()
                },
            ],
        }
    }

    #[test]
    fn test_grid_validity() {
        let hash = SpatialGridHash::new(settings());

        assert!(hash.is_valid_grid(None, "StaticMeshActor"));
        assert!(hash.is_valid_grid(Some("MainGrid"), "StaticMeshActor"));
        assert!(!hash.is_valid_grid(Some("Foliage"), "StaticMeshActor"));
        assert!(hash.is_valid_grid(Some("Foliage"), "InstancedFoliageActor"));
        assert!(!hash.is_valid_grid(Some("Unknown"), "StaticMeshActor"));
    }

    #[test]
    fn test_hlod_layer_validity_follows_grid_restrictions() {
        let hash = SpatialGridHash::new(settings());

        assert!(hash.is_valid_hlod_layer(None, "HLOD0"));
        assert!(hash.is_valid_hlod_layer(Some("MainGrid"), "FoliageHLOD"));
        assert!(!hash.is_valid_hlod_layer(Some("Foliage"), "HLOD0"));
        assert!(!hash.is_valid_hlod_layer(Some("MainGrid"), "Missing"));
    }

    #[test]
    fn test_default_grid_falls_back_to_first_grid() {
        let mut settings = settings();
        settings.default_grid = None;
        assert_eq!(SpatialGridHash::new(settings).default_grid().as_deref(), Some("MainGrid"));
        assert_eq!(
            SpatialGridHash::new(PartitionSettings::default()).default_grid().as_deref(),
            Some("MainGrid")
        );
    }

    #[test]
    fn test_cell_names() {
        let key = CellKey {
            grid: Some("MainGrid".to_string()),
            coords: Some((-1, 2)),
            data_layers: Vec::new(),
            external_data_layer: Some("/Game/EDL/Winter".to_string()),
            content_bundle: None,
        };
        assert_eq!(key.name(0), "MainGrid_L0_X-1_Y2_EDL__Game_EDL_Winter");

        let always_loaded = CellKey { coords: None, external_data_layer: None, ..key };
        assert_eq!(always_loaded.name(0), "MainGrid_AlwaysLoaded");
    }

    #[test]
    fn test_cell_coords_use_bounds_center() {
        let bounds = Aabb::from_min_max(Vec3::new(-30.0, 140.0, 0.0), Vec3::new(-10.0, 160.0, 5.0));
        assert_eq!(SpatialGridHash::cell_coords(&bounds, 100.0), Some((-1, 1)));
        assert_eq!(SpatialGridHash::cell_coords(&Aabb::INVALID, 100.0), None);
    }
}
