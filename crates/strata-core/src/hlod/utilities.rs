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

//! The contract for creating and building HLOD proxy actors.

use crate::actor::ActorDescriptor;
use crate::guid::ActorGuid;
use crate::math::Aabb;
use crate::partition::ResolvedActor;
use std::fmt;

/// Where the HLOD actors being created will live.
#[derive(Debug, Clone)]
pub struct HlodCreationContext<'a> {
    /// World name.
    pub world_name: &'a str,
    /// Package the actors are created in.
    pub container_package: &'a str,
    /// Name of the cell the actors represent.
    pub cell_name: &'a str,
    /// Grid of that cell.
    pub grid: Option<&'a str>,
    /// Bounds of that cell's content.
    pub cell_bounds: Aabb,
}

/// What HLOD actors to create.
#[derive(Debug, Clone)]
pub struct HlodCreationParams<'a> {
    /// Layer generating the actors.
    pub hlod_layer: &'a str,
    /// Layer the generated actors themselves belong to, for the next level.
    pub parent_layer: Option<&'a str>,
    /// Level of the generated actors.
    pub hlod_level: u32,
}

/// The result of building one HLOD actor.
#[derive(Debug, Clone, PartialEq)]
pub enum HlodBuildOutcome {
    /// The proxy is up to date, nothing to save.
    Unchanged,
    /// The proxy was rebuilt and its package must be saved.
    Rebuilt(Box<ActorDescriptor>),
}

/// An error raised while building an HLOD actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HlodBuildError {
    /// The descriptor is not an HLOD actor.
    NotAnHlodActor(ActorGuid),
    /// A child has not been built yet. This points to a broken build order.
    ChildNotBuilt {
        /// The actor being built.
        actor: ActorGuid,
        /// The child lacking a proxy.
        child: ActorGuid,
    },
}

impl fmt::Display for HlodBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HlodBuildError::NotAnHlodActor(guid) => {
                write!(f, "actor {} is not an HLOD actor", guid)
            }
            HlodBuildError::ChildNotBuilt { actor, child } => write!(
                f,
                "HLOD actor {} requires child {} to be built first",
                actor, child
            ),
        }
    }
}

impl std::error::Error for HlodBuildError {}

/// Creates and builds HLOD proxy actors.
pub trait HlodUtilities {
    /// Creates the HLOD actors representing `actor_instances` of one cell.
    fn create_hlod_actors(
        &self,
        context: &HlodCreationContext<'_>,
        params: &HlodCreationParams<'_>,
        actor_instances: &[ResolvedActor],
    ) -> Vec<ActorDescriptor>;

    /// Builds the proxy of `actor`. `children` holds the current descriptors
    /// of its HLOD children, which must already be built.
    fn build_hlod_actor(
        &self,
        actor: &ActorDescriptor,
        children: &[&ActorDescriptor],
        force: bool,
    ) -> Result<HlodBuildOutcome, HlodBuildError>;
}
