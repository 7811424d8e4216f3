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

//! The HLOD builder: the distributed build orchestrator turning a world's
//! source actors into built HLOD actors, one step at a time.

mod agent;
mod context;
mod error;
mod settings;
mod stats;

pub use agent::{HlodBuilderAgent, RunSummary, BUILD_PRODUCTS_FILE};
pub use context::OrchestratorContext;
pub use error::BuilderError;
pub use settings::{BuildSteps, HlodBuilderSettings, DEFAULT_GC_INTERVAL};
pub use stats::{collect_stats, write_stats, HlodStatsRecord, HLOD_STATS_PATH};
