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

//! Streaming generation: from actor descriptors to a validated, clustered
//! container hierarchy.

pub mod container;
pub mod context;
pub mod error;
pub mod error_handler;
pub mod generator;
pub mod state_log;
pub mod validation;
pub mod view;
pub mod view_map;
pub mod world_partition;

pub use container::{
    ContainerCollection, ContainerCollectionInstanceDescriptor, ContainerInstanceData,
    DataLayerLookup,
};
pub use context::{FilteredGenerationContext, StreamingGenerationContext};
pub use error::{ClusterInvariantError, StreamingGenerationError};
pub use error_handler::{
    LogErrorHandler, NullErrorHandler, ReferenceDataLayersReason, StreamingGenerationErrorHandler,
    WorldReferenceReason,
};
pub use generator::{StreamingGenerator, StreamingGeneratorParams};
pub use state_log::{dump_state_log, HierarchicalLog};
pub use validation::ValidationReport;
pub use view::{ActorDescView, ForcedOverride, InvalidReference, OverrideSet, ViewRef};
pub use view_map::{ActorDescViewMap, DuplicateActorError, ViewIndex};
pub use world_partition::{
    check_for_errors, generate_streaming, setup_hlod_actors, CheckForErrorsReport,
    GeneratedStreaming, SetupHlodActorsOutput, StreamingGenerationOutput,
};
