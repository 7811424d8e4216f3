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

use crate::config::{StrataConfig, CONFIG_FILE};
use clap::Parser;
use std::path::{Path, PathBuf};
use strata_agents::HlodBuilderSettings;

/// Builds the HLOD actors of a world partition world.
#[derive(Parser, Debug)]
#[command(name = "strata-builder", version)]
#[command(about = "Sets up, builds and submits the HLOD actors of a world")]
pub struct Args {
    /// World file to process.
    pub world: PathBuf,

    /// Workspace root (default: the folder of the world file).
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Configuration file (default: `Strata.toml` in the root).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Create, update and delete HLOD actors.
    #[arg(long)]
    pub setup_hlods: bool,

    /// Build HLOD proxies that are out of date.
    #[arg(long)]
    pub build_hlods: bool,

    /// Build every HLOD proxy, up to date or not.
    #[arg(long)]
    pub rebuild_hlods: bool,

    /// Delete HLOD actors.
    #[arg(long)]
    pub delete_hlods: bool,

    /// Submit every file touched by the build.
    #[arg(long)]
    pub finalize_hlods: bool,

    /// Write `Saved/HLODStats.json`.
    #[arg(long)]
    pub dump_stats: bool,

    /// Run one step of a build split across several hosts.
    #[arg(long)]
    pub distributed_build: bool,

    /// Only report what setup would change.
    #[arg(long)]
    pub report_only: bool,

    /// Skip the workload actors before this index.
    #[arg(long, value_name = "INDEX")]
    pub resume_build: Option<usize>,

    /// Build manifest written by setup and read by build.
    #[arg(long, value_name = "PATH")]
    pub build_manifest: Option<PathBuf>,

    /// Index of this builder.
    #[arg(long, default_value_t = 0)]
    pub builder_idx: usize,

    /// Number of builders.
    #[arg(long, default_value_t = 1)]
    pub builder_count: usize,

    /// Only build the HLOD actors of this layer.
    #[arg(long, value_name = "NAME")]
    pub build_hlod_layer: Option<String>,

    /// Only build the HLOD actor with this label.
    #[arg(long, value_name = "LABEL")]
    pub build_single_hlod: Option<String>,

    /// Folder shared by the hosts of a distributed build.
    #[arg(long, value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// Write the streaming generation state log under `Saved/Logs`.
    #[arg(long)]
    pub dump_state_log: bool,

    /// Log at debug level.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// The workspace root.
    pub fn root(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| {
            self.world
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .unwrap_or(Path::new("."))
                .to_path_buf()
        })
    }

    /// The configuration file.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| self.root().join(CONFIG_FILE))
    }

    /// Merges the flags over `config`.
    pub fn settings(&self, config: &StrataConfig) -> HlodBuilderSettings {
        HlodBuilderSettings {
            setup: self.setup_hlods,
            build: self.build_hlods,
            rebuild: self.rebuild_hlods,
            delete: self.delete_hlods,
            finalize: self.finalize_hlods,
            dump_stats: self.dump_stats,
            distributed: self.distributed_build,
            report_only: self.report_only,
            resume_build: self.resume_build,
            build_manifest: self.build_manifest.clone(),
            builder_index: self.builder_idx,
            builder_count: self.builder_count,
            hlod_layer: self.build_hlod_layer.clone(),
            single_hlod: self.build_single_hlod.clone(),
            working_dir: self
                .working_dir
                .clone()
                .or_else(|| config.builder.working_dir.clone()),
            gc_interval: config.builder.gc_interval,
            engine_version: config.engine_version.clone(),
            dump_state_log: self.dump_state_log,
        }
    }
}
