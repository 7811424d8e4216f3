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

//! # Strata Data
//!
//! Turns the flat actor descriptors of a world into a validated partition:
//! descriptor views, per-container view maps, the container instance
//! hierarchy, the fixpoint validator, actor clusters, and the generation
//! context consumed by a runtime hash.

#![warn(missing_docs)]

pub mod streaming;

pub use streaming::{
    check_for_errors, generate_streaming, setup_hlod_actors, ActorDescView, ActorDescViewMap,
    CheckForErrorsReport, ContainerCollection, ContainerCollectionInstanceDescriptor,
    ContainerInstanceData, LogErrorHandler, NullErrorHandler, StreamingGenerationContext,
    StreamingGenerationError, StreamingGenerationErrorHandler, StreamingGenerationOutput,
    StreamingGenerator, StreamingGeneratorParams, ValidationReport, ViewIndex, ViewRef,
};
