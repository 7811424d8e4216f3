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

// HLOD builder for world partition worlds
// Run with: strata-builder <world.ron> [steps]

mod cli;
mod config;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use strata_agents::{HlodBuilderAgent, OrchestratorContext, RunSummary};
use strata_core::{RuntimeHash, WorldDescriptor};
use strata_data::{check_for_errors, LogErrorHandler};
use strata_infra::{FileSystemSourceControl, ProxyHlodUtilities, SpatialGridHash};
use strata_io::load_world;

use cli::Args;
use config::StrataConfig;

/// Path of the state log of `world`, relative to the root.
fn state_log_path(suffix: &str, world: &str) -> PathBuf {
    Path::new("Saved")
        .join("Logs")
        .join(format!("StreamingGeneration-{}_{}.log", suffix, world))
}

fn write_state_log(root: &Path, suffix: &str, world: &str, log: &str) -> Result<PathBuf> {
    let path = root.join(state_log_path(suffix, world));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create '{}'", parent.display()))?;
    }
    fs::write(&path, log).with_context(|| format!("Failed to write '{}'", path.display()))?;
    log::info!("Wrote state log to '{}'", path.display());
    Ok(path)
}

/// Runs the validation pass and reports what it found.
fn check_world(world: &WorldDescriptor, hash: &SpatialGridHash, config: &StrataConfig) -> Result<()> {
    let mut handler = LogErrorHandler::new();
    let hash: &dyn RuntimeHash = hash;
    let report = check_for_errors(world, Some(hash), config.generator_params(), &mut handler)
        .with_context(|| format!("Failed to validate world '{}'", world.name))?;
    if !report.duplicated_actors.is_empty() {
        bail!(
            "World '{}' has {} duplicated actors",
            world.name,
            report.duplicated_actors.len()
        );
    }
    log::info!(
        "Validated {} container instances: {} errors reported, {} corrections",
        report.containers,
        report.validation.errors_reported,
        report.validation.corrections
    );
    Ok(())
}

fn print_summary(world: &str, summary: &RunSummary) {
    log::info!(
        "[HLODBuilder] '{}': {} created, {} updated, {} unchanged, {} deleted",
        world,
        summary.created,
        summary.updated,
        summary.unchanged,
        summary.deleted
    );
    log::info!(
        "[HLODBuilder] '{}': {} built, {} up to date, {} staged, {} submitted",
        world,
        summary.built,
        summary.up_to_date,
        summary.staged,
        summary.submitted
    );
    if let Some(stats) = &summary.stats_file {
        log::info!("[HLODBuilder] Stats written to '{}'", stats.display());
    }
}

fn run(args: Args) -> Result<()> {
    let root = args.root();
    let config = StrataConfig::load(&args.config_path())?;
    let settings = args.settings(&config);

    let world = load_world(&args.world)
        .with_context(|| format!("Failed to load world '{}'", args.world.display()))?;
    let world_name = world.name.clone();
    let hash = SpatialGridHash::new(config.partition_settings());
    let utilities = ProxyHlodUtilities::new();
    let mut source_control = FileSystemSourceControl::new(&root);

    let mut agent = HlodBuilderAgent::new(settings).context("Invalid builder settings")?;
    if agent.steps().setup {
        check_world(&world, &hash, &config)?;
    }

    let mut ctx = OrchestratorContext::new(&root, world, &mut source_control)
        .with_runtime_hash(&hash)
        .with_hlod_utilities(&utilities);
    let summary = agent
        .run(&mut ctx)
        .with_context(|| format!("HLOD builder failed on world '{}'", world_name))?;

    if let Some(state_log) = &summary.state_log {
        write_state_log(&root, "SetupHLODs", &world_name, state_log)?;
    }
    print_summary(&world_name, &summary);
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    strata_telemetry::init(args.verbose);
    run(args).inspect_err(|e| log::error!("{:#}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_log_path() {
        assert_eq!(
            state_log_path("SetupHLODs", "Main"),
            Path::new("Saved/Logs/StreamingGeneration-SetupHLODs_Main.log")
        );
    }
}
