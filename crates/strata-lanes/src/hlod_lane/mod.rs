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

//! The HLOD workload lane: splits HLOD actors into balanced builder
//! workloads that respect build order.

mod workload;

pub use workload::{distribute_groups, hlod_groups, validate_workload, HlodParenting};

use strata_core::{ActorDescriptor, ActorGuid, HlodWorkload};
use thiserror::Error;

/// Errors raised while scheduling HLOD builds.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkloadError {
    /// Workloads were requested for zero builders.
    #[error("cannot distribute HLOD actors across {0} builders")]
    InvalidBuilderCount(usize),
    /// A parent is scheduled before one of its children. This is a scheduler
    /// bug and must never be corrected silently.
    #[error("HLOD actor {actor} is scheduled before its child {child}")]
    BuildOrder {
        /// The parent.
        actor: ActorGuid,
        /// The child not yet built.
        child: ActorGuid,
    },
    /// An HLOD actor is its own descendant.
    #[error("HLOD actor {0} is its own descendant")]
    Cycle(ActorGuid),
}

/// Restricts which HLOD actors are scheduled. Filtering never pulls in the
/// children of the selected actors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WorkloadFilter {
    /// Every HLOD actor.
    #[default]
    All,
    /// Only the actors generated by one HLOD layer.
    Layer(String),
    /// Only the actor with this label.
    SingleActor(String),
}

impl WorkloadFilter {
    fn accepts(&self, actor: &ActorDescriptor) -> bool {
        match self {
            WorkloadFilter::All => true,
            WorkloadFilter::Layer(layer) => actor
                .hlod
                .as_ref()
                .is_some_and(|hlod| &hlod.source_hlod_layer == layer),
            WorkloadFilter::SingleActor(label) => &actor.label == label,
        }
    }
}

/// Parameters of one scheduling call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadParams {
    /// Number of workloads to produce.
    pub builder_count: usize,
    /// Which actors to schedule.
    pub filter: WorkloadFilter,
    /// Whether external children constrain the build order.
    pub include_external_children: bool,
}

impl Default for WorkloadParams {
    fn default() -> Self {
        Self {
            builder_count: 1,
            filter: WorkloadFilter::All,
            include_external_children: true,
        }
    }
}

/// Splits HLOD actors into builder workloads.
///
/// The scheduler carries the builder dispatch offset: each call starts the
/// round-robin one builder further, so that when several worlds are
/// scheduled in turn builder 0 does not always receive the biggest group.
/// The offset lives as long as the scheduler.
#[derive(Debug, Default)]
pub struct HlodWorkloadScheduler {
    dispatch_offset: usize,
}

impl HlodWorkloadScheduler {
    /// Creates a scheduler with a zero dispatch offset.
    pub fn new() -> Self {
        Self::default()
    }

    /// The builder the next call starts distributing at.
    pub fn dispatch_offset(&self) -> usize {
        self.dispatch_offset
    }

    /// Schedules the HLOD actors among `actors` into
    /// `params.builder_count` ordered lists. Non HLOD descriptors are
    /// ignored.
    pub fn schedule<'a>(
        &mut self,
        actors: impl IntoIterator<Item = &'a ActorDescriptor>,
        params: &WorkloadParams,
    ) -> Result<Vec<Vec<ActorGuid>>, WorkloadError> {
        if params.builder_count == 0 {
            log::error!("[HLODBuilder] Invalid builder count 0");
            return Err(WorkloadError::InvalidBuilderCount(0));
        }

        let mut selected: Vec<&ActorDescriptor> = actors
            .into_iter()
            .filter(|actor| actor.is_hlod_actor() && params.filter.accepts(actor))
            .collect();
        selected.sort_by_key(|actor| actor.guid);
        selected.dedup_by_key(|actor| actor.guid);

        let parenting =
            HlodParenting::from_actors(selected.iter().copied(), params.include_external_children);
        let order: Vec<ActorGuid> = selected.iter().map(|actor| actor.guid).collect();
        let groups = hlod_groups(&order, &parenting)?;
        let group_count = groups.len();

        let offset = self.dispatch_offset % params.builder_count;
        self.dispatch_offset = self.dispatch_offset.wrapping_add(1);
        let workloads = distribute_groups(groups, params.builder_count, offset);

        for workload in &workloads {
            validate_workload(workload, &parenting)?;
        }

        log::info!(
            "[HLODBuilder] Scheduled {} HLOD actors in {} groups across {} builders",
            order.len(),
            group_count,
            params.builder_count
        );
        for (index, workload) in workloads.iter().enumerate() {
            log::debug!("[HLODBuilder]   Builder {}: {} actors", index, workload.len());
        }
        Ok(workloads)
    }

    /// Schedules several worlds in turn and gathers the result per builder:
    /// entry `i` of the result is builder `i`'s workload, with one list per
    /// world in `worlds` order.
    pub fn schedule_worlds(
        &mut self,
        worlds: &[&[ActorDescriptor]],
        params: &WorkloadParams,
    ) -> Result<Vec<HlodWorkload>, WorkloadError> {
        let mut workloads: Vec<HlodWorkload> = vec![Vec::new(); params.builder_count];
        for actors in worlds {
            let per_builder = self.schedule(actors.iter(), params)?;
            for (workload, actors) in workloads.iter_mut().zip(per_builder) {
                workload.push(actors);
            }
        }
        Ok(workloads)
    }
}
