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

//! Settings of one builder run.

use std::path::PathBuf;
use strata_lanes::{WorkloadFilter, WorkloadParams};

/// Default number of built actors between two source control flushes.
pub const DEFAULT_GC_INTERVAL: usize = 64;

/// Every option of a builder run, as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HlodBuilderSettings {
    /// Create, update and delete HLOD actors to match the source actors.
    pub setup: bool,
    /// Build the proxies of the HLOD actors.
    pub build: bool,
    /// Build every proxy even when up to date. Implies `build`.
    pub rebuild: bool,
    /// Delete HLOD actors not created by this run's setup.
    pub delete: bool,
    /// Submit every file touched by the run.
    pub finalize: bool,
    /// Write the HLOD stats file.
    pub dump_stats: bool,
    /// Run each step on its own host, exchanging files through the working
    /// directory.
    pub distributed: bool,
    /// Run setup for its diagnostics only, touching nothing.
    pub report_only: bool,
    /// Skip the workload actors before this index.
    pub resume_build: Option<usize>,
    /// Manifest written by setup and read by build.
    pub build_manifest: Option<PathBuf>,
    /// Index of this builder.
    pub builder_index: usize,
    /// Number of builders.
    pub builder_count: usize,
    /// Only build the HLOD actors of this layer.
    pub hlod_layer: Option<String>,
    /// Only build the HLOD actor with this label.
    pub single_hlod: Option<String>,
    /// Folder shared by the hosts of a distributed build.
    pub working_dir: Option<PathBuf>,
    /// Flush source control every this many built actors. Zero disables it.
    pub gc_interval: usize,
    /// Version recorded in, and required from, build manifests.
    pub engine_version: String,
    /// Keep the streaming generation state log.
    pub dump_state_log: bool,
}

impl Default for HlodBuilderSettings {
    fn default() -> Self {
        Self {
            setup: false,
            build: false,
            rebuild: false,
            delete: false,
            finalize: false,
            dump_stats: false,
            distributed: false,
            report_only: false,
            resume_build: None,
            build_manifest: None,
            builder_index: 0,
            builder_count: 1,
            hlod_layer: None,
            single_hlod: None,
            working_dir: None,
            gc_interval: DEFAULT_GC_INTERVAL,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            dump_state_log: false,
        }
    }
}

/// The steps a run executes, in execution order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSteps {
    /// Setup step.
    pub setup: bool,
    /// Build step.
    pub build: bool,
    /// Delete step.
    pub delete: bool,
    /// Finalize step.
    pub finalize: bool,
    /// Stats step.
    pub stats: bool,
}

impl HlodBuilderSettings {
    /// Resolves the requested steps. No step flag means setup and build.
    /// Report-only runs setup alone, whatever steps were requested.
    pub fn steps(&self) -> BuildSteps {
        if self.report_only {
            return BuildSteps {
                setup: true,
                ..Default::default()
            };
        }
        let build = self.build || self.rebuild;
        let any = self.setup || build || self.delete || self.finalize || self.dump_stats;
        if any {
            BuildSteps {
                setup: self.setup,
                build,
                delete: self.delete,
                finalize: self.finalize,
                stats: self.dump_stats,
            }
        } else {
            BuildSteps {
                setup: true,
                build: true,
                ..Default::default()
            }
        }
    }

    /// Scheduling parameters derived from the builder count and filters.
    pub fn workload_params(&self) -> WorkloadParams {
        let filter = match (&self.single_hlod, &self.hlod_layer) {
            (Some(label), _) => WorkloadFilter::SingleActor(label.clone()),
            (None, Some(layer)) => WorkloadFilter::Layer(layer.clone()),
            (None, None) => WorkloadFilter::All,
        };
        WorkloadParams {
            builder_count: self.builder_count,
            filter,
            include_external_children: true,
        }
    }
}
