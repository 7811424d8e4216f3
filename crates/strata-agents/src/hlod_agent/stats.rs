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

use super::BuilderError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use strata_core::WorldDescriptor;

/// Location of the stats file, relative to the workspace root.
pub const HLOD_STATS_PATH: &str = "Saved/HLODStats.json";

/// One line of the HLOD stats file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HlodStatsRecord {
    /// Actor GUID.
    pub guid: String,
    /// Actor label.
    pub label: String,
    /// Layer that generated the actor.
    pub layer: String,
    /// Level in the HLOD hierarchy.
    pub level: u32,
    /// Own and external HLOD children.
    pub child_count: usize,
    /// Source actors merged into the proxy.
    pub source_count: usize,
    /// Extent of the actor bounds.
    pub bounds_size: [f32; 3],
    /// Hash of the last build, empty when never built.
    pub build_hash: String,
}

/// Gathers one record per HLOD actor of `world`, by layer then level then GUID.
pub fn collect_stats(world: &WorldDescriptor) -> Vec<HlodStatsRecord> {
    let mut records: Vec<HlodStatsRecord> = world
        .hlod_actors()
        .filter_map(|actor| {
            let hlod = actor.hlod.as_ref()?;
            let size = if actor.bounds.is_valid() {
                actor.bounds.size()
            } else {
                Default::default()
            };
            Some(HlodStatsRecord {
                guid: actor.guid.to_string(),
                label: actor.label.clone(),
                layer: hlod.source_hlod_layer.clone(),
                level: hlod.hlod_level,
                child_count: actor.hlod_children(true).count(),
                source_count: hlod.source_actors.len(),
                bounds_size: [size.x, size.y, size.z],
                build_hash: hlod.build_hash.clone().unwrap_or_default(),
            })
        })
        .collect();
    records.sort_by(|a, b| {
        (a.layer.as_str(), a.level, a.guid.as_str()).cmp(&(b.layer.as_str(), b.level, b.guid.as_str()))
    });
    records
}

/// Writes `records` to the stats file under `root`.
pub fn write_stats(root: &Path, records: &[HlodStatsRecord]) -> Result<PathBuf, BuilderError> {
    let path = root.join(HLOD_STATS_PATH);
    let io_error = |source| BuilderError::Io {
        path: path.clone(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let text = serde_json::to_string_pretty(records)
        .map_err(|e| io_error(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    fs::write(&path, text).map_err(io_error)?;
    log::info!(
        "[HLODBuilder] Wrote stats of {} HLOD actors to '{}'",
        records.len(),
        path.display()
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{
        Aabb, ActorContainer, ActorDescriptor, ActorGuid, ContainerKind, HlodActorData, Vec3,
    };

    fn hlod_actor(n: u128, layer: &str, level: u32) -> ActorDescriptor {
        let mut actor = ActorDescriptor::new(ActorGuid::from_u128(n), "WorldPartitionHLOD")
            .with_label(format!("{}_{}", layer, n))
            .with_bounds(Aabb::from_min_max(Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 4.0, 8.0)));
        actor.hlod = Some(HlodActorData {
            source_hlod_layer: layer.to_string(),
            hlod_level: level,
            source_actors: vec![ActorGuid::from_u128(100), ActorGuid::from_u128(101)],
            child_hlod_actors: vec![ActorGuid::from_u128(7)],
            ..Default::default()
        });
        actor
    }

    #[test]
    fn test_stats_are_sorted_and_skip_regular_actors() {
        // --- 1. ARRANGE ---
        let mut base = ActorContainer::new("/Game/Maps/Main", ContainerKind::Base);
        base.actors = vec![
            hlod_actor(3, "HLOD1", 1),
            ActorDescriptor::new(ActorGuid::from_u128(50), "StaticMeshActor"),
            hlod_actor(2, "HLOD0", 0),
        ];
        let world = WorldDescriptor::new("Main", vec![base]);

        // --- 2. ACT ---
        let records = collect_stats(&world);

        // --- 3. ASSERT ---
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].layer, "HLOD0");
        assert_eq!(records[1].level, 1);
        assert_eq!(records[0].source_count, 2);
        assert_eq!(records[0].child_count, 1);
        assert_eq!(records[0].bounds_size, [2.0, 4.0, 8.0]);
        assert!(records[0].build_hash.is_empty());
    }
}
