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

use std::fmt;
use std::path::PathBuf;
use strata_core::graph::CycleError;
use strata_core::{ActorGuid, HlodBuildError};
use strata_data::StreamingGenerationError;
use strata_io::{ManifestError, StagingError, WorldLoadError};
use strata_lanes::WorkloadError;

/// An error that aborts a step of the HLOD builder.
#[derive(Debug)]
pub enum BuilderError {
    /// A collaborator the step needs was not provided.
    MissingCollaborator(&'static str),
    /// The settings cannot run the requested steps.
    InvalidSettings(String),
    /// The build manifest could not be written, read or trusted.
    Manifest(ManifestError),
    /// Staging files to or from the working directory failed.
    Staging(StagingError),
    /// An actor package could not be encoded or decoded.
    World(WorldLoadError),
    /// Scheduling failed or produced a broken build order.
    Workload(WorkloadError),
    /// Streaming generation aborted.
    Generation(StreamingGenerationError),
    /// Setup produced HLOD actors that are their own descendants.
    HierarchyCycle(CycleError<ActorGuid>),
    /// The HLOD utilities failed to build an actor.
    HlodBuild(HlodBuildError),
    /// The source control helper reported a failure.
    SourceControl {
        /// The failed operation.
        operation: &'static str,
        /// The file involved, if any.
        path: Option<PathBuf>,
    },
    /// A file could not be read or written.
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
    /// The manifest lists an actor the world does not contain.
    UnknownActor(ActorGuid),
    /// The manifest does not cover the world being built.
    WorldNotInManifest(String),
    /// The build was cancelled. Restart with this resume index.
    Cancelled {
        /// First workload index not built.
        resume_index: usize,
    },
}

impl fmt::Display for BuilderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuilderError::MissingCollaborator(name) => write!(f, "no {} available", name),
            BuilderError::InvalidSettings(reason) => write!(f, "invalid settings: {}", reason),
            BuilderError::Manifest(e) => write!(f, "build manifest: {}", e),
            BuilderError::Staging(e) => write!(f, "staging: {}", e),
            BuilderError::World(e) => write!(f, "actor package: {}", e),
            BuilderError::Workload(e) => write!(f, "workload: {}", e),
            BuilderError::Generation(e) => write!(f, "streaming generation: {}", e),
            BuilderError::HierarchyCycle(e) => write!(f, "HLOD hierarchy: {}", e),
            BuilderError::HlodBuild(e) => write!(f, "HLOD build: {}", e),
            BuilderError::SourceControl { operation, path } => match path {
                Some(path) => write!(f, "source control failed to {} '{}'", operation, path.display()),
                None => write!(f, "source control failed to {}", operation),
            },
            BuilderError::Io { path, source } => write!(f, "'{}': {}", path.display(), source),
            BuilderError::UnknownActor(guid) => {
                write!(f, "HLOD actor {} is not part of the world", guid)
            }
            BuilderError::WorldNotInManifest(world) => {
                write!(f, "world '{}' is not part of the build manifest", world)
            }
            BuilderError::Cancelled { resume_index } => {
                write!(f, "build cancelled, resume at index {}", resume_index)
            }
        }
    }
}

impl std::error::Error for BuilderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuilderError::Manifest(e) => Some(e),
            BuilderError::Staging(e) => Some(e),
            BuilderError::World(e) => Some(e),
            BuilderError::Workload(e) => Some(e),
            BuilderError::Generation(e) => Some(e),
            BuilderError::HierarchyCycle(e) => Some(e),
            BuilderError::HlodBuild(e) => Some(e),
            BuilderError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ManifestError> for BuilderError {
    fn from(e: ManifestError) -> Self {
        BuilderError::Manifest(e)
    }
}

impl From<StagingError> for BuilderError {
    fn from(e: StagingError) -> Self {
        BuilderError::Staging(e)
    }
}

impl From<WorldLoadError> for BuilderError {
    fn from(e: WorldLoadError) -> Self {
        BuilderError::World(e)
    }
}

impl From<WorkloadError> for BuilderError {
    fn from(e: WorkloadError) -> Self {
        BuilderError::Workload(e)
    }
}

impl From<StreamingGenerationError> for BuilderError {
    fn from(e: StreamingGenerationError) -> Self {
        BuilderError::Generation(e)
    }
}

impl From<HlodBuildError> for BuilderError {
    fn from(e: HlodBuildError) -> Self {
        BuilderError::HlodBuild(e)
    }
}

impl From<CycleError<ActorGuid>> for BuilderError {
    fn from(e: CycleError<ActorGuid>) -> Self {
        BuilderError::HierarchyCycle(e)
    }
}
