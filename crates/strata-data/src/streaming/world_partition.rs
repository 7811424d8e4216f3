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

//! World-level entry points: streaming generation, error checking and HLOD
//! actor setup.

use super::container::ContainerCollection;
use super::context::FilteredGenerationContext;
use super::error::StreamingGenerationError;
use super::error_handler::StreamingGenerationErrorHandler;
use super::generator::{StreamingGenerator, StreamingGeneratorParams};
use super::validation::ValidationReport;
use std::collections::HashMap;
use strata_core::actor::HLOD_ACTOR_CLASS;
use strata_core::{
    ActorDescriptor, ActorGuid, HlodUtilities, RuntimeHash, SetupHlodActorsParams,
    StreamingPolicy, WorldDescriptor,
};

/// The streaming policy of one collection slice.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedStreaming {
    /// The external data layer generated, `None` for the base slice.
    pub external_data_layer: Option<String>,
    /// The content bundle generated, if any.
    pub content_bundle: Option<ActorGuid>,
    /// The generated cells.
    pub policy: StreamingPolicy,
    /// Packages the cells are generated into.
    pub packages_to_generate: Vec<String>,
}

/// Everything [`generate_streaming`] produced.
#[derive(Debug, Clone, Default)]
pub struct StreamingGenerationOutput {
    /// One entry per external data layer, then the base, then one per
    /// content bundle.
    pub generated: Vec<GeneratedStreaming>,
    /// The state log, when requested.
    pub state_log: Option<String>,
}

fn fail_if(
    ok: bool,
    external_data_layer: Option<&str>,
) -> Result<(), StreamingGenerationError> {
    if ok {
        return Ok(());
    }
    log::error!(
        "[StreamingGeneration] Runtime hash failed to generate {}",
        external_data_layer.unwrap_or("the base container")
    );
    Err(StreamingGenerationError::RuntimeHashFailed {
        external_data_layer: external_data_layer.map(str::to_string),
    })
}

fn base_collection(
    world: &WorldDescriptor,
) -> Result<ContainerCollection<'_>, StreamingGenerationError> {
    ContainerCollection::base_and_external_data_layers(world).ok_or_else(|| {
        log::error!("[StreamingGeneration] World '{}' has no base container", world.name);
        StreamingGenerationError::NoBaseContainer {
            world: world.name.clone(),
        }
    })
}

/// Generates the streaming policy of `world`: once per external data layer,
/// once for the base container, then once per content bundle.
pub fn generate_streaming(
    world: &WorldDescriptor,
    runtime_hash: &dyn RuntimeHash,
    params: StreamingGeneratorParams,
    dump_state_log: bool,
    handler: &mut dyn StreamingGenerationErrorHandler,
) -> Result<StreamingGenerationOutput, StreamingGenerationError> {
    let collection = base_collection(world)?;
    let mut output = StreamingGenerationOutput::default();

    let mut generator = StreamingGenerator::new(world, params.clone(), Some(runtime_hash), handler);
    generator.preparation_phase(collection.clone())?;
    if dump_state_log {
        output.state_log = Some(generator.state_log());
    }

    let context = generator.generation_context();
    let slices = collection
        .external_data_layers()
        .map(Some)
        .chain(std::iter::once(None));
    for external_data_layer in slices {
        let filtered = FilteredGenerationContext::for_external_data_layer(&context, external_data_layer);
        let mut generated = GeneratedStreaming {
            external_data_layer: external_data_layer.map(str::to_string),
            content_bundle: None,
            policy: StreamingPolicy::default(),
            packages_to_generate: Vec::new(),
        };
        let ok = runtime_hash.generate_streaming(
            &mut generated.policy,
            &filtered,
            &mut generated.packages_to_generate,
        );
        fail_if(ok, external_data_layer)?;
        log::info!(
            "[StreamingGeneration] Generated {} cells for {}",
            generated.policy.cells.len(),
            external_data_layer.unwrap_or("the base container")
        );
        output.generated.push(generated);
    }

    for bundle in ContainerCollection::content_bundles(world) {
        let content_bundle = bundle.content_bundle_guid();
        let mut generator = StreamingGenerator::new(world, params.clone(), Some(runtime_hash), handler);
        generator.preparation_phase(bundle)?;
        let context = generator.generation_context();
        let mut generated = GeneratedStreaming {
            external_data_layer: None,
            content_bundle,
            policy: StreamingPolicy::default(),
            packages_to_generate: Vec::new(),
        };
        let ok = runtime_hash.generate_streaming(
            &mut generated.policy,
            &context,
            &mut generated.packages_to_generate,
        );
        fail_if(ok, None)?;
        output.generated.push(generated);
    }

    Ok(output)
}

/// Result of [`check_for_errors`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckForErrorsReport {
    /// Container instances checked.
    pub containers: usize,
    /// Validation summed over every container instance.
    pub validation: ValidationReport,
    /// GUIDs found in more than one top-level container.
    pub duplicated_actors: Vec<ActorGuid>,
}

/// Runs the whole preparation of `world` for its diagnostics only. Every
/// violation is reported to `handler`; nothing is generated.
pub fn check_for_errors(
    world: &WorldDescriptor,
    runtime_hash: Option<&dyn RuntimeHash>,
    params: StreamingGeneratorParams,
    handler: &mut dyn StreamingGenerationErrorHandler,
) -> Result<CheckForErrorsReport, StreamingGenerationError> {
    let mut report = CheckForErrorsReport::default();

    let mut owners: HashMap<ActorGuid, &str> = HashMap::new();
    for container in &world.containers {
        for actor in &container.actors {
            if let Some(first) = owners.insert(actor.guid, container.package.as_str()) {
                log::warn!(
                    "[StreamingGeneration] Actor {} is duplicated in '{}' and '{}'",
                    actor.guid,
                    first,
                    container.package
                );
                report.duplicated_actors.push(actor.guid);
            }
        }
    }

    let mut collections = vec![base_collection(world)?];
    collections.extend(ContainerCollection::content_bundles(world));
    for collection in collections {
        let mut generator = StreamingGenerator::new(world, params.clone(), runtime_hash, handler);
        generator.preparation_phase(collection)?;
        for desc in generator.containers().values() {
            report.containers += 1;
            report.validation.merge(desc.validation_report());
            report.validation.merge(desc.instance_validation_report());
        }
    }

    log::info!(
        "[StreamingGeneration] Checked {} container instances, {} errors",
        report.containers,
        report.validation.errors_reported
    );
    Ok(report)
}

/// Result of [`setup_hlod_actors`].
#[derive(Debug, Clone, Default)]
pub struct SetupHlodActorsOutput {
    /// Every HLOD actor that should exist.
    pub hlod_actors: Vec<ActorDescriptor>,
    /// The state log of each prepared collection, when requested.
    pub state_log: Option<String>,
}

/// Computes the HLOD actors `world` should have. Existing HLOD actors are
/// ignored. Content bundles are processed first, then the base container
/// with its external data layers.
pub fn setup_hlod_actors(
    world: &WorldDescriptor,
    runtime_hash: &dyn RuntimeHash,
    hlod_utilities: &dyn HlodUtilities,
    dump_state_log: bool,
    handler: &mut dyn StreamingGenerationErrorHandler,
) -> Result<SetupHlodActorsOutput, StreamingGenerationError> {
    let params = StreamingGeneratorParams::default().with_filtered_class(HLOD_ACTOR_CLASS);
    let mut output = SetupHlodActorsOutput::default();
    let mut state_log = String::new();

    let mut collections = ContainerCollection::content_bundles(world);
    collections.push(base_collection(world)?);
    for collection in collections {
        let package = collection.package();
        let mut generator = StreamingGenerator::new(world, params.clone(), Some(runtime_hash), handler);
        generator.preparation_phase(collection)?;
        if dump_state_log {
            state_log.push_str(&generator.state_log());
        }

        let context = generator.generation_context();
        let setup = SetupHlodActorsParams {
            world_name: &world.name,
            container_package: package,
            hlod_utilities,
        };
        let actors = runtime_hash.setup_hlod_actors(&context, &setup);
        log::info!(
            "[StreamingGeneration] {} HLOD actors set up for '{}'",
            actors.len(),
            package
        );
        output.hlod_actors.extend(actors);
    }

    if dump_state_log {
        output.state_log = Some(state_log);
    }
    Ok(output)
}
