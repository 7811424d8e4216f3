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

//! # Strata Agents
//!
//! Agents sequence the lanes over loaded worlds and own the side effects:
//! source control, staging and manifests. The HLOD builder agent is the
//! distributed build orchestrator.

#![warn(missing_docs)]

pub mod hlod_agent;

pub use hlod_agent::{
    BuildSteps, BuilderError, HlodBuilderAgent, HlodBuilderSettings, OrchestratorContext,
    RunSummary,
};
