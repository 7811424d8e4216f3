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

//! The runtime hash contract.

use super::context::GenerationContext;
use crate::actor::ActorDescriptor;
use crate::guid::ActorGuid;
use crate::hlod::HlodUtilities;
use crate::math::Aabb;
use serde::{Deserialize, Serialize};

/// One runtime streaming cell produced by a runtime hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeCell {
    /// Unique cell name.
    pub name: String,
    /// Grid the cell belongs to.
    pub grid: Option<String>,
    /// Grid coordinates of the cell, `None` for always loaded cells.
    pub coords: Option<(i64, i64)>,
    /// Whether the cell streams spatially.
    pub is_spatially_loaded: bool,
    /// Runtime data layers gating the cell.
    pub data_layers: Vec<String>,
    /// External data layer gating the cell.
    pub external_data_layer: Option<String>,
    /// Content bundle owning the cell.
    pub content_bundle: Option<ActorGuid>,
    /// Actors in the cell, paired with their container instance path.
    pub actors: Vec<(String, ActorGuid)>,
    /// Union of the actor set bounds.
    pub bounds: Aabb,
    /// Package the cell is generated into.
    pub package: String,
}

/// The streaming layout produced for one world.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamingPolicy {
    /// Every generated cell.
    pub cells: Vec<RuntimeCell>,
}

/// Parameters of [`RuntimeHash::setup_hlod_actors`].
pub struct SetupHlodActorsParams<'a> {
    /// Name of the world being processed.
    pub world_name: &'a str,
    /// Package HLOD actors are created in.
    pub container_package: &'a str,
    /// Creates the HLOD actors of one cell.
    pub hlod_utilities: &'a dyn HlodUtilities,
}

/// Lays actor sets out in space.
///
/// The streaming generator only consults the grid and HLOD-layer
/// predicates. Grid validity must hold for `None`: clearing an invalid grid
/// is how the generator corrects it.
pub trait RuntimeHash {
    /// The grid assigned to actors that do not request one.
    fn default_grid(&self) -> Option<String>;

    /// Whether actors of `actor_class` may stream in `grid`.
    fn is_valid_grid(&self, grid: Option<&str>, actor_class: &str) -> bool;

    /// Whether `hlod_layer` can be generated for actors streamed in `grid`.
    fn is_valid_hlod_layer(&self, grid: Option<&str>, hlod_layer: &str) -> bool;

    /// Fills `policy` with the cells of every actor set of `context`, and
    /// appends the packages the cells are generated into.
    fn generate_streaming(
        &self,
        policy: &mut StreamingPolicy,
        context: &dyn GenerationContext,
        packages_to_generate: &mut Vec<String>,
    ) -> bool;

    /// Returns the HLOD actors that should exist for `context`.
    fn setup_hlod_actors(
        &self,
        context: &dyn GenerationContext,
        params: &SetupHlodActorsParams<'_>,
    ) -> Vec<ActorDescriptor>;
}
