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

//! Errors that abort streaming generation.

use std::fmt;
use strata_core::{ActorGuid, ContainerId};

/// Two members of one cluster disagree on an attribute every member must share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterInvariantError {
    /// The container instance owning the cluster.
    pub container: ContainerId,
    /// The first member of the cluster.
    pub first: ActorGuid,
    /// The member disagreeing with it.
    pub other: ActorGuid,
    /// The attribute in disagreement.
    pub attribute: &'static str,
}

impl fmt::Display for ClusterInvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cluster of container {} mixes {} between actors {} and {}",
            self.container, self.attribute, self.first, self.other
        )
    }
}

impl std::error::Error for ClusterInvariantError {}

/// An error that aborts streaming generation.
///
/// Attribute conflicts between actors are never errors, they are corrected.
/// These variants signal internal inconsistencies or unusable input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamingGenerationError {
    /// The world has no base container.
    NoBaseContainer {
        /// The world name.
        world: String,
    },
    /// The same GUID appears twice in one container instance.
    DuplicateActor {
        /// The container instance.
        container: ContainerId,
        /// The duplicated GUID.
        guid: ActorGuid,
    },
    /// The validator kept finding violations past its pass limit.
    ValidationDidNotConverge {
        /// The container instance being validated.
        container: ContainerId,
        /// Number of passes run.
        passes: usize,
    },
    /// A cluster mixes attributes after validation.
    ClusterInvariant(ClusterInvariantError),
    /// The runtime hash failed to generate streaming.
    RuntimeHashFailed {
        /// The external data layer being generated, `None` for the base.
        external_data_layer: Option<String>,
    },
}

impl fmt::Display for StreamingGenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamingGenerationError::NoBaseContainer { world } => {
                write!(f, "world '{}' has no base container", world)
            }
            StreamingGenerationError::DuplicateActor { container, guid } => {
                write!(f, "actor {} appears twice in container {}", guid, container)
            }
            StreamingGenerationError::ValidationDidNotConverge { container, passes } => write!(
                f,
                "validation of container {} did not converge after {} passes",
                container, passes
            ),
            StreamingGenerationError::ClusterInvariant(e) => write!(f, "{}", e),
            StreamingGenerationError::RuntimeHashFailed {
                external_data_layer: Some(edl),
            } => write!(f, "runtime hash failed for external data layer '{}'", edl),
            StreamingGenerationError::RuntimeHashFailed {
                external_data_layer: None,
            } => write!(f, "runtime hash failed for the base container"),
        }
    }
}

impl std::error::Error for StreamingGenerationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StreamingGenerationError::ClusterInvariant(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ClusterInvariantError> for StreamingGenerationError {
    fn from(e: ClusterInvariantError) -> Self {
        StreamingGenerationError::ClusterInvariant(e)
    }
}
