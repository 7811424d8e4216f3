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

//! Proxy HLOD actors: one actor per cell and layer, "built" by hashing
//! everything the proxy geometry would be derived from.

use strata_core::actor::HLOD_ACTOR_CLASS;
use strata_core::{
    Aabb, ActorDescriptor, ActorGuid, HlodActorData, HlodBuildError, HlodBuildOutcome,
    HlodCreationContext, HlodCreationParams, HlodUtilities, ResolvedActor,
};

/// Hex encoded blake3 digest of `bytes`.
pub fn blake3_hex(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// An [`HlodUtilities`] producing proxy HLOD actors.
///
/// Created actors get a GUID derived from their world, container, cell and
/// layer, so running setup twice yields the same actors. The build hash
/// covers the actor's own sources and the hashes of its children, which
/// makes a parent rebuild whenever one of its children changed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProxyHlodUtilities;

impl ProxyHlodUtilities {
    /// Creates the utilities.
    pub fn new() -> Self {
        Self
    }

    /// Deterministic GUID of the HLOD actor of `layer` in `cell_name`.
    pub fn hlod_actor_guid(context: &HlodCreationContext<'_>, layer: &str) -> ActorGuid {
        ActorGuid::from_name(&format!(
            "{}:{}:{}:{}",
            context.world_name, context.container_package, context.cell_name, layer
        ))
    }

    fn hash_bounds(hasher: &mut blake3::Hasher, bounds: &Aabb) {
        for value in [
            bounds.min.x,
            bounds.min.y,
            bounds.min.z,
            bounds.max.x,
            bounds.max.y,
            bounds.max.z,
        ] {
            hasher.update(&value.to_le_bytes());
        }
    }

    fn build_hash(
        actor: &ActorDescriptor,
        hlod: &HlodActorData,
        children: &[&ActorDescriptor],
    ) -> Result<String, HlodBuildError> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(actor.guid.to_string().as_bytes());
        hasher.update(hlod.source_hlod_layer.as_bytes());
        hasher.update(&hlod.hlod_level.to_le_bytes());
        hasher.update(hlod.cell_name.as_bytes());
        Self::hash_bounds(&mut hasher, &actor.bounds);

        let mut sources = hlod.source_actors.clone();
        sources.sort();
        for source in &sources {
            hasher.update(source.to_string().as_bytes());
        }

        for child in &hlod.child_hlod_actors {
            let built = children
                .iter()
                .find(|candidate| candidate.guid == *child)
                .and_then(|candidate| candidate.hlod.as_ref())
                .and_then(|data| data.build_hash.as_deref());
            let Some(child_hash) = built else {
                return Err(HlodBuildError::ChildNotBuilt {
                    actor: actor.guid,
                    child: *child,
                });
            };
            hasher.update(child.to_string().as_bytes());
            hasher.update(child_hash.as_bytes());
        }
        // External children may live in another world; only built ones count.
        for child in &hlod.external_child_hlod_actors {
            if let Some(child_hash) = children
                .iter()
                .find(|candidate| candidate.guid == *child)
                .and_then(|candidate| candidate.hlod.as_ref())
                .and_then(|data| data.build_hash.as_deref())
            {
                hasher.update(child_hash.as_bytes());
            }
        }
        Ok(hasher.finalize().to_hex().to_string())
    }
}

impl HlodUtilities for ProxyHlodUtilities {
    fn create_hlod_actors(
        &self,
        context: &HlodCreationContext<'_>,
        params: &HlodCreationParams<'_>,
        actor_instances: &[ResolvedActor],
    ) -> Vec<ActorDescriptor> {
        if actor_instances.is_empty() {
            return Vec::new();
        }

        let mut child_hlod_actors = Vec::new();
        let mut source_actors = Vec::new();
        let mut bounds = Aabb::INVALID;
        for instance in actor_instances {
            if instance.hlod_level.is_some() {
                child_hlod_actors.push(instance.guid);
            } else {
                source_actors.push(instance.guid);
            }
            if instance.bounds.is_valid() {
                bounds = bounds.merge(&instance.bounds);
            }
        }
        child_hlod_actors.sort();
        child_hlod_actors.dedup();
        source_actors.sort();
        source_actors.dedup();

        let guid = Self::hlod_actor_guid(context, params.hlod_layer);
        let mut actor = ActorDescriptor::new(guid, HLOD_ACTOR_CLASS)
            .with_label(format!("{}_{}", params.hlod_layer, context.cell_name))
            .with_bounds(bounds);
        actor.package = context.container_package.to_string();
        actor.runtime_grid = context.grid.map(str::to_string);
        actor.hlod_layer = params.parent_layer.map(str::to_string);
        actor.hlod = Some(HlodActorData {
            child_hlod_actors,
            external_child_hlod_actors: Vec::new(),
            source_hlod_layer: params.hlod_layer.to_string(),
            hlod_level: params.hlod_level,
            cell_name: context.cell_name.to_string(),
            source_actors,
            build_hash: None,
        });

        log::debug!(
            "[HLODBuilder] Created HLOD actor {} ({}) for {} instances",
            actor.label,
            actor.guid,
            actor_instances.len()
        );
        vec![actor]
    }

    fn build_hlod_actor(
        &self,
        actor: &ActorDescriptor,
        children: &[&ActorDescriptor],
        force: bool,
    ) -> Result<HlodBuildOutcome, HlodBuildError> {
        let Some(hlod) = actor.hlod.as_ref() else {
            return Err(HlodBuildError::NotAnHlodActor(actor.guid));
        };
        let hash = Self::build_hash(actor, hlod, children)?;
        if !force && hlod.build_hash.as_deref() == Some(hash.as_str()) {
            return Ok(HlodBuildOutcome::Unchanged);
        }

        let mut rebuilt = actor.clone();
        if let Some(data) = rebuilt.hlod.as_mut() {
            data.build_hash = Some(hash);
        }
        Ok(HlodBuildOutcome::Rebuilt(Box::new(rebuilt)))
    }
}
