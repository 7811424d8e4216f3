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

//! The building blocks of workload scheduling: parenting, grouping,
//! distribution and build-order validation.

use super::WorkloadError;
use ahash::{AHashMap, AHashSet};
use strata_core::{ActorDescriptor, ActorGuid};

/// Maps every scheduled HLOD actor to its scheduled HLOD children.
///
/// Children outside the scheduled set are dropped: they are assumed to be
/// built already, or to be built by another run.
#[derive(Debug, Clone, Default)]
pub struct HlodParenting {
    children: AHashMap<ActorGuid, Vec<ActorGuid>>,
}

impl HlodParenting {
    /// Builds the parenting of `actors`. Non HLOD descriptors are ignored.
    pub fn from_actors<'a>(
        actors: impl IntoIterator<Item = &'a ActorDescriptor>,
        include_external: bool,
    ) -> Self {
        let actors: Vec<&ActorDescriptor> = actors
            .into_iter()
            .filter(|actor| actor.is_hlod_actor())
            .collect();
        let scheduled: AHashSet<ActorGuid> = actors.iter().map(|actor| actor.guid).collect();

        let children = actors
            .iter()
            .map(|actor| {
                let mut own: Vec<ActorGuid> = Vec::new();
                for child in actor.hlod_children(include_external) {
                    if scheduled.contains(child) && !own.contains(child) {
                        own.push(*child);
                    }
                }
                (actor.guid, own)
            })
            .collect();
        Self { children }
    }

    /// The scheduled children of `actor`.
    pub fn children(&self, actor: &ActorGuid) -> &[ActorGuid] {
        self.children.get(actor).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns `true` if `actor` is part of the scheduled set.
    pub fn contains(&self, actor: &ActorGuid) -> bool {
        self.children.contains_key(actor)
    }

    /// Number of scheduled actors.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns `true` if no actor is scheduled.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// Groups `order` into dependency closures: every actor lands in the same
/// group as its children, and children precede their parents.
///
/// Groups are formed in `order`. When a walk reaches an actor already owned
/// by an earlier group, that group is spliced at the front of the current
/// one instead of being walked again.
pub fn hlod_groups(
    order: &[ActorGuid],
    parenting: &HlodParenting,
) -> Result<Vec<Vec<ActorGuid>>, WorkloadError> {
    let mut groups: Vec<Vec<ActorGuid>> = Vec::new();
    let mut owner: AHashMap<ActorGuid, usize> = AHashMap::with_capacity(order.len());
    let mut on_stack: AHashSet<ActorGuid> = AHashSet::new();

    for root in order {
        if owner.contains_key(root) {
            continue;
        }
        let current = groups.len();
        groups.push(Vec::new());
        owner.insert(*root, current);
        on_stack.insert(*root);

        // Iterative post-order walk. Each frame holds the next child to visit.
        let mut stack: Vec<(ActorGuid, usize)> = vec![(*root, 0)];
        while let Some(frame) = stack.last_mut() {
            let (actor, next) = *frame;
            let children = parenting.children(&actor);
            let Some(child) = children.get(next).copied() else {
                stack.pop();
                on_stack.remove(&actor);
                groups[current].push(actor);
                continue;
            };
            frame.1 += 1;

            if on_stack.contains(&child) {
                log::error!("[HLODBuilder] HLOD actor {} is its own descendant", child);
                return Err(WorkloadError::Cycle(child));
            }
            match owner.get(&child).copied() {
                Some(group) if group == current => {}
                Some(group) => {
                    let mut spliced = std::mem::take(&mut groups[group]);
                    for member in &spliced {
                        owner.insert(*member, current);
                    }
                    spliced.append(&mut groups[current]);
                    groups[current] = spliced;
                }
                None => {
                    owner.insert(child, current);
                    on_stack.insert(child);
                    stack.push((child, 0));
                }
            }
        }
    }

    groups.retain(|group| !group.is_empty());
    Ok(groups)
}

/// Assigns whole groups to `builder_count` workloads, biggest group first,
/// round-robin starting at builder `offset`.
pub fn distribute_groups(
    mut groups: Vec<Vec<ActorGuid>>,
    builder_count: usize,
    offset: usize,
) -> Vec<Vec<ActorGuid>> {
    let mut workloads = vec![Vec::new(); builder_count];
    if builder_count == 0 {
        return workloads;
    }
    // Stable, so equal sized groups keep their discovery order.
    groups.sort_by(|a, b| b.len().cmp(&a.len()));
    for (index, group) in groups.into_iter().enumerate() {
        workloads[(index + offset) % builder_count].extend(group);
    }
    workloads
}

/// Checks that every scheduled child of every actor of `workload` appears
/// earlier in `workload`.
pub fn validate_workload(
    workload: &[ActorGuid],
    parenting: &HlodParenting,
) -> Result<(), WorkloadError> {
    let mut processed: AHashSet<ActorGuid> = AHashSet::with_capacity(workload.len());
    for actor in workload {
        if let Some(child) = parenting
            .children(actor)
            .iter()
            .find(|child| !processed.contains(*child))
        {
            log::error!(
                "[HLODBuilder] Invalid build order: HLOD actor {} is scheduled before its child {}",
                actor,
                child
            );
            return Err(WorkloadError::BuildOrder {
                actor: *actor,
                child: *child,
            });
        }
        processed.insert(*actor);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::HlodActorData;

    fn guid(n: u128) -> ActorGuid {
        ActorGuid::from_u128(n)
    }

    fn hlod(n: u128, children: &[u128]) -> ActorDescriptor {
        let mut actor = ActorDescriptor::new(guid(n), "WorldPartitionHLOD");
        actor.hlod = Some(HlodActorData {
            child_hlod_actors: children.iter().copied().map(guid).collect(),
            ..Default::default()
        });
        actor
    }

    #[test]
    fn test_parenting_keeps_only_scheduled_children() {
        let actors = vec![hlod(1, &[]), hlod(2, &[1, 99])];

        let parenting = HlodParenting::from_actors(&actors, true);

        assert_eq!(parenting.len(), 2);
        assert_eq!(parenting.children(&guid(2)), &[guid(1)]);
        assert!(parenting.children(&guid(99)).is_empty());
    }

    #[test]
    fn test_parenting_external_children_are_optional() {
        let mut parent = hlod(2, &[]);
        if let Some(data) = parent.hlod.as_mut() {
            data.external_child_hlod_actors = vec![guid(1)];
        }
        let actors = vec![hlod(1, &[]), parent];

        assert_eq!(HlodParenting::from_actors(&actors, true).children(&guid(2)), &[guid(1)]);
        assert!(HlodParenting::from_actors(&actors, false)
            .children(&guid(2))
            .is_empty());
    }

    #[test]
    fn test_chain_forms_one_group_children_first() {
        // --- 1. ARRANGE ---
        let actors = vec![hlod(1, &[]), hlod(2, &[1]), hlod(3, &[2])];
        let parenting = HlodParenting::from_actors(&actors, true);

        // --- 2. ACT ---
        let groups = hlod_groups(&[guid(1), guid(2), guid(3)], &parenting).unwrap();

        // --- 3. ASSERT ---
        assert_eq!(groups, vec![vec![guid(1), guid(2), guid(3)]]);
    }

    #[test]
    fn test_parent_visited_first_still_lists_children_first() {
        let actors = vec![hlod(1, &[]), hlod(2, &[1]), hlod(3, &[2])];
        let parenting = HlodParenting::from_actors(&actors, true);

        let groups = hlod_groups(&[guid(3), guid(2), guid(1)], &parenting).unwrap();

        assert_eq!(groups, vec![vec![guid(1), guid(2), guid(3)]]);
    }

    #[test]
    fn test_shared_child_merges_both_roots() {
        // --- 1. ARRANGE ---
        // 10 and 20 both own 1; 30 is unrelated.
        let actors = vec![hlod(1, &[]), hlod(10, &[1]), hlod(20, &[1]), hlod(30, &[])];
        let parenting = HlodParenting::from_actors(&actors, true);

        // --- 2. ACT ---
        let groups = hlod_groups(&[guid(10), guid(30), guid(20), guid(1)], &parenting).unwrap();

        // --- 3. ASSERT ---
        // The group of 10 is absorbed by the group of 20.
        assert_eq!(groups, vec![vec![guid(30)], vec![guid(1), guid(10), guid(20)]]);
    }

    #[test]
    fn test_splice_moves_earlier_group_in_front() {
        // 2 is walked first on its own; 3 reaches it through 1's sibling.
        let actors = vec![hlod(1, &[]), hlod(2, &[]), hlod(3, &[1, 2])];
        let parenting = HlodParenting::from_actors(&actors, true);

        let groups = hlod_groups(&[guid(2), guid(3)], &parenting).unwrap();

        assert_eq!(groups, vec![vec![guid(2), guid(1), guid(3)]]);
        validate_workload(&groups[0], &parenting).unwrap();
    }

    #[test]
    fn test_cycle_is_reported() {
        let actors = vec![hlod(1, &[2]), hlod(2, &[1])];
        let parenting = HlodParenting::from_actors(&actors, true);

        let result = hlod_groups(&[guid(1)], &parenting);

        assert!(matches!(result, Err(WorkloadError::Cycle(g)) if g == guid(1)));
    }

    #[test]
    fn test_distribution_biggest_first_with_offset() {
        let groups = vec![
            vec![guid(1)],
            vec![guid(2), guid(3), guid(4)],
            vec![guid(5), guid(6)],
        ];

        let workloads = distribute_groups(groups, 2, 1);

        assert_eq!(workloads[1], vec![guid(2), guid(3), guid(4), guid(1)]);
        assert_eq!(workloads[0], vec![guid(5), guid(6)]);
    }

    #[test]
    fn test_validate_rejects_parent_before_child() {
        let actors = vec![hlod(1, &[]), hlod(2, &[1])];
        let parenting = HlodParenting::from_actors(&actors, true);

        let result = validate_workload(&[guid(2), guid(1)], &parenting);

        assert!(matches!(
            result,
            Err(WorkloadError::BuildOrder { actor, child }) if actor == guid(2) && child == guid(1)
        ));
        assert!(validate_workload(&[guid(1), guid(2)], &parenting).is_ok());
    }
}
