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

//! HLOD contracts: proxy creation and building, workloads, persistence.

pub mod source_control;
pub mod utilities;

pub use source_control::SourceControlHelper;
pub use utilities::{
    HlodBuildError, HlodBuildOutcome, HlodCreationContext, HlodCreationParams, HlodUtilities,
};

use crate::guid::ActorGuid;

/// One builder's share of a build: an ordered list of HLOD actor GUIDs per
/// world processed together. Children always precede their parents.
pub type HlodWorkload = Vec<Vec<ActorGuid>>;
