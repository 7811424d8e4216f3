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

use std::collections::BTreeSet;
use strata_core::{ActorDescriptor, ActorGuid, HlodActorData};
use strata_lanes::{HlodWorkloadScheduler, WorkloadError, WorkloadFilter, WorkloadParams};

fn guid(n: u128) -> ActorGuid {
    ActorGuid::from_u128(n)
}

fn hlod(n: u128, layer: &str, children: &[u128]) -> ActorDescriptor {
    let mut actor = ActorDescriptor::new(guid(n), "WorldPartitionHLOD").with_label(format!("HLOD_{}", n));
    actor.hlod = Some(HlodActorData {
        child_hlod_actors: children.iter().copied().map(guid).collect(),
        source_hlod_layer: layer.to_string(),
        ..Default::default()
    });
    actor
}

/// Three two-level trees of different sizes plus a few loose level 0 actors.
fn forest() -> Vec<ActorDescriptor> {
    let mut actors = Vec::new();
    let mut next = 1000;
    for (tree, leaves) in [(1u128, 5u128), (2, 3), (3, 1)] {
        let children: Vec<u128> = (0..leaves).map(|leaf| tree * 100 + leaf).collect();
        for child in &children {
            actors.push(hlod(*child, "HLOD0", &[]));
        }
        actors.push(hlod(tree, "HLOD1", &children));
    }
    for _ in 0..4 {
        actors.push(hlod(next, "HLOD0", &[]));
        next += 1;
    }
    actors
}

fn params(builder_count: usize) -> WorkloadParams {
    WorkloadParams {
        builder_count,
        ..Default::default()
    }
}

#[test]
fn test_children_precede_parents_in_every_workload() {
    // --- 1. ARRANGE ---
    let actors = forest();
    let mut scheduler = HlodWorkloadScheduler::new();

    // --- 2. ACT ---
    let workloads = scheduler.schedule(&actors, &params(3)).unwrap();

    // --- 3. ASSERT ---
    for workload in &workloads {
        for (position, actor) in workload.iter().enumerate() {
            let descriptor = actors.iter().find(|a| a.guid == *actor).unwrap();
            for child in descriptor.hlod_children(true) {
                let child_position = workload.iter().position(|g| g == child);
                assert!(
                    matches!(child_position, Some(p) if p < position),
                    "child {} of {} is not built first",
                    child,
                    actor
                );
            }
        }
    }
}

#[test]
fn test_every_actor_is_scheduled_exactly_once() {
    let actors = forest();
    let mut scheduler = HlodWorkloadScheduler::new();

    let workloads = scheduler.schedule(&actors, &params(4)).unwrap();

    let scheduled: Vec<ActorGuid> = workloads.iter().flatten().copied().collect();
    let unique: BTreeSet<ActorGuid> = scheduled.iter().copied().collect();
    let expected: BTreeSet<ActorGuid> = actors.iter().map(|a| a.guid).collect();
    assert_eq!(scheduled.len(), actors.len());
    assert_eq!(unique, expected);
}

#[test]
fn test_three_level_chain_single_workload() {
    // --- 1. ARRANGE ---
    // C (3) -> B (2) -> A (1), listed parent first.
    let actors = vec![hlod(3, "HLOD2", &[2]), hlod(2, "HLOD1", &[1]), hlod(1, "HLOD0", &[])];
    let mut scheduler = HlodWorkloadScheduler::new();

    // --- 2. ACT ---
    let workloads = scheduler.schedule(&actors, &params(1)).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(workloads, vec![vec![guid(1), guid(2), guid(3)]]);
}

#[test]
fn test_biggest_tree_goes_to_the_offset_builder() {
    let actors = forest();
    let mut scheduler = HlodWorkloadScheduler::new();

    let first = scheduler.schedule(&actors, &params(3)).unwrap();
    let second = scheduler.schedule(&actors, &params(3)).unwrap();

    // The tree rooted at 1 has six members, then two loose actors follow.
    assert_eq!(first[0].len(), 6 + 2);
    assert_eq!(first[0][5], guid(1));
    assert_eq!(second[1], first[0]);
    assert_eq!(scheduler.dispatch_offset(), 2);
}

#[test]
fn test_layer_filter_skips_children() {
    let actors = forest();
    let mut scheduler = HlodWorkloadScheduler::new();
    let params = WorkloadParams {
        builder_count: 2,
        filter: WorkloadFilter::Layer("HLOD1".to_string()),
        include_external_children: true,
    };

    let workloads = scheduler.schedule(&actors, &params).unwrap();

    let scheduled: BTreeSet<ActorGuid> = workloads.iter().flatten().copied().collect();
    assert_eq!(scheduled, [guid(1), guid(2), guid(3)].into_iter().collect());
}

#[test]
fn test_single_actor_filter() {
    let actors = forest();
    let mut scheduler = HlodWorkloadScheduler::new();
    let params = WorkloadParams {
        filter: WorkloadFilter::SingleActor("HLOD_2".to_string()),
        ..Default::default()
    };

    let workloads = scheduler.schedule(&actors, &params).unwrap();

    assert_eq!(workloads, vec![vec![guid(2)]]);
}

#[test]
fn test_multiple_worlds_share_builders() {
    let first_world = forest();
    let second_world = vec![hlod(7, "HLOD0", &[]), hlod(8, "HLOD1", &[7])];
    let mut scheduler = HlodWorkloadScheduler::new();

    let workloads = scheduler
        .schedule_worlds(&[first_world.as_slice(), second_world.as_slice()], &params(2))
        .unwrap();

    assert_eq!(workloads.len(), 2);
    assert!(workloads.iter().all(|w| w.len() == 2));
    // The second world starts one builder further.
    assert_eq!(workloads[1][1], vec![guid(7), guid(8)]);
    assert!(workloads[0][1].is_empty());
}

#[test]
fn test_zero_builders_is_rejected() {
    let mut scheduler = HlodWorkloadScheduler::new();

    let result = scheduler.schedule(&forest(), &params(0));

    assert_eq!(result, Err(WorkloadError::InvalidBuilderCount(0)));
}

#[test]
fn test_cyclic_hierarchy_is_rejected() {
    let actors = vec![hlod(1, "HLOD0", &[2]), hlod(2, "HLOD1", &[1])];
    let mut scheduler = HlodWorkloadScheduler::new();

    let result = scheduler.schedule(&actors, &params(1));

    assert!(matches!(result, Err(WorkloadError::Cycle(_))));
}
