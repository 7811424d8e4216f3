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

//! # Strata Core
//!
//! Foundational crate containing the plain data records, core types, and
//! collaborator contracts that define the world partition build pipeline.
//!
//! Nothing in this crate performs I/O. Actor descriptors are loaded by
//! `strata-io`, resolved and validated by `strata-data`, and scheduled for
//! HLOD builds by `strata-lanes`.

#![warn(missing_docs)]

pub mod actor;
pub mod container;
pub mod files;
pub mod graph;
pub mod guid;
pub mod hlod;
pub mod math;
pub mod partition;

pub use actor::{
    ActorDescriptor, ChildContainer, ChildContainerKind, DataLayerInstanceNames, HlodActorData,
};
pub use container::{
    ActorContainer, ContainerId, ContainerKind, DataLayerInstance, DataLayerLoadFilter,
    WorldDescriptor,
};
pub use files::{BuilderModifiedFiles, FileAction, Package};
pub use guid::ActorGuid;
pub use math::{Aabb, Vec3};
pub use hlod::{
    HlodBuildError, HlodBuildOutcome, HlodCreationContext, HlodCreationParams, HlodUtilities,
    HlodWorkload, SourceControlHelper,
};
pub use partition::{
    ActorSetInstance, GenerationContext, ResolvedActor, RuntimeCell, RuntimeHash,
    SetupHlodActorsParams, StreamingPolicy,
};
