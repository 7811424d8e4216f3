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

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use strata_agents::hlod_agent::DEFAULT_GC_INTERVAL;
use strata_data::StreamingGeneratorParams;
use strata_infra::{GridSettings, HlodLayerSettings, PartitionSettings};

/// Name of the configuration file looked up in the workspace root.
pub const CONFIG_FILE: &str = "Strata.toml";

/// Represents the structure of the `Strata.toml` configuration file.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StrataConfig {
    /// Version written to, and required from, build manifests.
    pub engine_version: String,
    /// Grid used by actors that do not request one.
    pub default_grid: Option<String>,
    /// Streaming generation options.
    pub streaming: StreamingConfig,
    /// Runtime grids.
    pub grids: Vec<GridSettings>,
    /// HLOD layers.
    pub hlod_layers: Vec<HlodLayerSettings>,
    /// Builder options.
    pub builder: BuilderConfig,
}

/// The `[streaming]` table.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StreamingConfig {
    /// When `false`, every actor is validated as always loaded.
    pub enabled: bool,
    /// Classes skipped by streaming generation.
    pub filtered_classes: Vec<String>,
}

/// The `[builder]` table.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BuilderConfig {
    /// Built actors between two source control flushes.
    pub gc_interval: usize,
    /// Folder shared by the hosts of a distributed build.
    pub working_dir: Option<PathBuf>,
}

impl Default for StrataConfig {
    /// Provides a default configuration if `Strata.toml` is not found: one
    /// default grid and no HLOD layer.
    fn default() -> Self {
        Self {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            default_grid: None,
            streaming: StreamingConfig::default(),
            grids: Vec::new(),
            hlod_layers: Vec::new(),
            builder: BuilderConfig::default(),
        }
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            filtered_classes: Vec::new(),
        }
    }
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            gc_interval: DEFAULT_GC_INTERVAL,
            working_dir: None,
        }
    }
}

impl StrataConfig {
    /// Loads `path`, or the default configuration when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!(
                "No '{}' found. Using default configuration.",
                path.display()
            );
            return Ok(Self::default());
        }
        log::info!("Found '{}'. Loading configuration.", path.display());
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at '{}'", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse TOML from '{}'", path.display()))
    }

    /// The runtime hash settings.
    pub fn partition_settings(&self) -> PartitionSettings {
        PartitionSettings {
            default_grid: self.default_grid.clone(),
            grids: self.grids.clone(),
            hlod_layers: self.hlod_layers.clone(),
        }
    }

    /// The generator options of the validation pass.
    pub fn generator_params(&self) -> StreamingGeneratorParams {
        StreamingGeneratorParams {
            enable_streaming: self.streaming.enabled,
            filtered_classes: self.streaming.filtered_classes.clone(),
            ..Default::default()
        }
    }
}
