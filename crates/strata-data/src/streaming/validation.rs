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

//! The fixpoint validator.
//!
//! Validation runs whole-container sweeps. The first sweep only reports
//! violations to the error handler. Every following sweep runs the same
//! checks and corrects what it finds by forcing a conservative value, until
//! a sweep finds nothing. Corrections only ever turn overrides on, so the
//! number of useful sweeps is bounded by the number of overrides that can
//! flip; going past that bound is an internal error.

use super::container::{ContainerCollectionInstanceDescriptor, DataLayerLookup};
use super::error::{ClusterInvariantError, StreamingGenerationError};
use super::error_handler::{
    ReferenceDataLayersReason, StreamingGenerationErrorHandler, WorldReferenceReason,
};
use super::view::{ForcedOverride, InvalidReference};
use super::view_map::{ActorDescViewMap, ViewIndex};
use strata_core::{ActorGuid, RuntimeHash};

/// What one validation phase found and corrected in a container instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Sweeps run, the reporting one included.
    pub passes: usize,
    /// Violations reported to the error handler.
    pub errors_reported: usize,
    /// Violations corrected.
    pub corrections: usize,
}

impl ValidationReport {
    /// Returns `true` if nothing had to be corrected.
    pub fn is_clean(&self) -> bool {
        self.errors_reported == 0 && self.corrections == 0
    }

    /// Adds `other` to this report.
    pub fn merge(&mut self, other: ValidationReport) {
        self.passes += other.passes;
        self.errors_reported += other.errors_reported;
        self.corrections += other.corrections;
    }
}

enum Fix {
    NonSpatial(ViewIndex),
    NoRuntimeGrid(ViewIndex),
    NoDataLayers(ViewIndex),
    InvalidReference(ViewIndex, InvalidReference),
}

fn apply_fixes(map: &mut ActorDescViewMap<'_>, fixes: Vec<Fix>) {
    for fix in fixes {
        match fix {
            Fix::NonSpatial(index) => {
                map.get_mut(index).set_forced_non_spatially_loaded();
            }
            Fix::NoRuntimeGrid(index) => {
                map.get_mut(index).set_forced_no_runtime_grid();
            }
            Fix::NoDataLayers(index) => {
                map.get_mut(index).set_forced_no_data_layers();
            }
            Fix::InvalidReference(index, reference) => {
                map.get_mut(index).add_forced_invalid_reference(reference);
            }
        }
    }
}

/// Both ends of a reference must share the same runtime data layers.
fn is_same_data_layer_set(referencer: &[String], reference: &[String]) -> bool {
    referencer.len() == reference.len() && reference.iter().all(|name| referencer.contains(name))
}

fn max_passes(map: &ActorDescViewMap<'_>) -> usize {
    let reference_count: usize = map.iter().map(|view| view.references().len() + 1).sum();
    map.len() * ForcedOverride::COUNT + reference_count + 2
}

/// Level-script references must target always loaded actors without data
/// layers. Reported and corrected at once. Returns the violation count.
fn validate_world_references(
    desc: &mut ContainerCollectionInstanceDescriptor<'_>,
    handler: &mut dyn StreamingGenerationErrorHandler,
) -> usize {
    let mut errors = 0;
    let mut fixes = Vec::new();
    for guid in desc.collection.world_references() {
        let Some(index) = desc.view_map.index_of(guid) else {
            continue;
        };
        let view = desc.view_map.get(index);
        if view.is_spatially_loaded() {
            errors += 1;
            handler.on_invalid_world_reference(view, WorldReferenceReason::SpatiallyLoaded);
            fixes.push(Fix::NonSpatial(index));
        }
        if !view.runtime_data_layer_instance_names().non_external().is_empty() {
            errors += 1;
            handler.on_invalid_world_reference(view, WorldReferenceReason::HasDataLayers);
            fixes.push(Fix::NoDataLayers(index));
        }
    }
    apply_fixes(&mut desc.view_map, fixes);
    errors
}

/// Runs every per-actor check on one view. Returns the violation count.
fn validate_view(
    desc: &mut ContainerCollectionInstanceDescriptor<'_>,
    data_layers: &DataLayerLookup<'_>,
    index: ViewIndex,
    fixup: bool,
    handler: &mut dyn StreamingGenerationErrorHandler,
) -> usize {
    let mut errors = 0;
    let mut fixes = Vec::new();
    {
        let map = &desc.view_map;
        let editor_only_actors = &desc.editor_only_actors;
        let view = map.get(index);

        // Load filters
        let mut filters = view
            .runtime_data_layer_instance_names()
            .non_external()
            .iter()
            .filter_map(|name| data_layers.get(name))
            .map(|instance| instance.load_filter);
        if let Some(first) = filters.next() {
            if filters.any(|filter| filter != first) {
                errors += 1;
                if fixup {
                    fixes.push(Fix::NoDataLayers(index));
                } else {
                    handler.on_data_layers_load_filter_mismatch(view);
                }
            }
        }

        // References, without the parent and children links which are
        // replaced by one edge from the top-most parent.
        let parent_actor = view.descriptor().parent_actor;
        let mut pairs: Vec<(ViewIndex, ActorGuid)> = Vec::new();
        for reference in view.references() {
            if Some(*reference) == parent_actor {
                continue;
            }
            let is_child = map
                .find_by_guid(reference)
                .is_some_and(|target| target.descriptor().parent_actor == Some(view.guid()));
            if !is_child {
                pairs.push((index, *reference));
            }
        }

        let mut top_parent = None;
        let mut next = parent_actor;
        let mut depth = 0;
        while let Some(parent_guid) = next {
            if depth > map.len() {
                break;
            }
            depth += 1;
            match map.index_of(&parent_guid) {
                Some(parent_index) => {
                    top_parent = Some(parent_index);
                    next = map.get(parent_index).descriptor().parent_actor;
                }
                None => {
                    pairs.push((index, parent_guid));
                    break;
                }
            }
        }
        if let Some(top) = top_parent.filter(|top| *top != index) {
            pairs.push((top, view.guid()));
        }

        // Editor-only actors loaded in PIE
        if view.descriptor().is_editor_only_loaded_in_pie
            && (view.is_spatially_loaded()
                || !view.data_layer_instance_names().non_external().is_empty())
        {
            errors += 1;
            if fixup {
                fixes.push(Fix::NonSpatial(index));
                fixes.push(Fix::NoDataLayers(index));
            } else {
                handler.on_invalid_editor_only_loaded_in_pie(view);
            }
        }

        for (referencer_index, reference) in pairs {
            let referencer = map.get(referencer_index);
            if referencer.is_editor_only_reference(&reference) {
                continue;
            }
            let Some(reference_index) = map.index_of(&reference) else {
                // Missing references cannot be corrected, report them once.
                if !fixup && !editor_only_actors.contains(&reference) {
                    errors += 1;
                    handler.on_invalid_reference(referencer, reference, None);
                }
                continue;
            };
            let target = map.get(reference_index);

            if referencer.is_spatially_loaded() != target.is_spatially_loaded() {
                errors += 1;
                if fixup {
                    fixes.push(Fix::NonSpatial(referencer_index));
                    fixes.push(Fix::NonSpatial(reference_index));
                } else {
                    handler.on_invalid_reference_grid_placement(referencer, target);
                }
            }

            if referencer.external_data_layer() != target.external_data_layer() {
                errors += 1;
                if fixup {
                    fixes.push(Fix::InvalidReference(
                        referencer_index,
                        InvalidReference::of(target.descriptor()),
                    ));
                } else {
                    handler.on_invalid_reference_data_layers(
                        referencer,
                        target,
                        ReferenceDataLayersReason::DifferentExternalDataLayer,
                    );
                }
            }

            if !is_same_data_layer_set(
                referencer.runtime_data_layer_instance_names().non_external(),
                target.runtime_data_layer_instance_names().non_external(),
            ) {
                errors += 1;
                if fixup {
                    fixes.push(Fix::NoDataLayers(referencer_index));
                    fixes.push(Fix::NoDataLayers(reference_index));
                } else {
                    handler.on_invalid_reference_data_layers(
                        referencer,
                        target,
                        ReferenceDataLayersReason::DifferentRuntimeDataLayers,
                    );
                }
            }

            if referencer.runtime_grid() != target.runtime_grid() {
                errors += 1;
                if fixup {
                    fixes.push(Fix::NoRuntimeGrid(referencer_index));
                    fixes.push(Fix::NoRuntimeGrid(reference_index));
                } else {
                    handler.on_invalid_reference_runtime_grid(referencer, target);
                }
            }
        }
    }
    apply_fixes(&mut desc.view_map, fixes);
    errors
}

/// Splits the references of every view into runtime and editor ones. The
/// parent attachment counts as a runtime reference.
fn partition_references(desc: &mut ContainerCollectionInstanceDescriptor<'_>) {
    let indices: Vec<ViewIndex> = desc.view_map.indices().collect();
    for index in indices {
        let (runtime, editor) = {
            let map = &desc.view_map;
            let view = map.get(index);
            let mut runtime = Vec::new();
            let mut editor = Vec::new();
            let parent = view
                .descriptor()
                .parent_actor
                .filter(|parent| !view.references().contains(parent));
            for reference in view.references().iter().chain(parent.iter()) {
                if view.is_editor_only_reference(reference)
                    || desc.editor_only_actors.contains(reference)
                {
                    editor.push(*reference);
                } else if map.contains(reference) {
                    runtime.push(*reference);
                }
            }
            (runtime, editor)
        };
        desc.view_map.get_mut(index).set_references(runtime, editor);
    }
}

/// Validates and corrects the views of one container instance until a sweep
/// finds no violation.
pub(crate) fn validate_container_descriptor(
    desc: &mut ContainerCollectionInstanceDescriptor<'_>,
    data_layers: &DataLayerLookup<'_>,
    handler: &mut dyn StreamingGenerationErrorHandler,
) -> Result<ValidationReport, StreamingGenerationError> {
    let mut report = ValidationReport::default();

    if desc.id.is_main() && desc.content_bundle.is_none() {
        let errors = validate_world_references(desc, handler);
        report.errors_reported += errors;
        report.corrections += errors;
    }

    let limit = max_passes(&desc.view_map);
    let indices: Vec<ViewIndex> = desc.view_map.indices().collect();
    loop {
        if report.passes >= limit {
            log::error!(
                "[StreamingGeneration] Validation of container {} did not converge after {} passes",
                desc.id,
                report.passes
            );
            return Err(StreamingGenerationError::ValidationDidNotConverge {
                container: desc.id.clone(),
                passes: report.passes,
            });
        }

        let fixup = report.passes > 0;
        let mut errors = 0;
        for &index in &indices {
            errors += validate_view(desc, data_layers, index, fixup, handler);
        }
        report.passes += 1;

        if fixup {
            report.corrections += errors;
        } else {
            report.errors_reported += errors;
        }
        if errors == 0 {
            break;
        }
    }

    partition_references(desc);
    log::trace!(
        "[StreamingGeneration] Container {} validated in {} passes ({} corrections)",
        desc.id,
        report.passes,
        report.corrections
    );
    Ok(report)
}

/// Validates the per-instance values of one container instance once every
/// instance exists: grid validity, HLOD layer validity and the consistency
/// of the placement filter.
pub(crate) fn validate_container_instance_descriptor(
    desc: &mut ContainerCollectionInstanceDescriptor<'_>,
    runtime_hash: Option<&dyn RuntimeHash>,
    handler: &mut dyn StreamingGenerationErrorHandler,
) -> Result<ValidationReport, StreamingGenerationError> {
    let mut report = ValidationReport::default();
    let limit = desc.view_map.len() * ForcedOverride::COUNT + desc.filtered_actors.len() + 2;
    let indices: Vec<ViewIndex> = desc.view_map.indices().collect();

    loop {
        if report.passes >= limit {
            log::error!(
                "[StreamingGeneration] Instance validation of container {} did not converge after {} passes",
                desc.id,
                report.passes
            );
            return Err(StreamingGenerationError::ValidationDidNotConverge {
                container: desc.id.clone(),
                passes: report.passes,
            });
        }

        let fixup = report.passes > 0;
        let mut errors = 0;
        for &index in &indices {
            let mut clear_grid = false;
            let mut clear_hlod_layer = false;
            let mut unfilter = Vec::new();
            let guid;
            {
                let view = desc.view_map.get(index);
                guid = view.guid();
                let data = desc.actor_instance_data(&guid);

                if let Some(hash) = runtime_hash {
                    let grid = data.runtime_grid.as_deref();
                    if !hash.is_valid_grid(grid, view.native_class()) {
                        errors += 1;
                        if fixup {
                            clear_grid = true;
                        } else {
                            handler.on_invalid_runtime_grid(view, grid);
                        }
                    }

                    if let Some(layer) = view.hlod_layer() {
                        if data.is_spatially_loaded && !hash.is_valid_hlod_layer(grid, layer) {
                            errors += 1;
                            if fixup {
                                clear_hlod_layer = true;
                            } else {
                                handler.on_invalid_hlod_layer(view);
                            }
                        }
                    }
                }

                if !desc.is_filtered(&guid) {
                    for reference in view.references() {
                        if !desc.is_filtered(reference) {
                            continue;
                        }
                        errors += 1;
                        if fixup {
                            unfilter.push(*reference);
                        } else if let Some(target) = desc.view_map.find_by_guid(reference) {
                            handler.on_invalid_actor_filter_reference(view, target);
                        }
                    }
                }
            }

            if clear_grid {
                let default = desc.instance_data.clone();
                desc.per_instance_data
                    .entry(guid)
                    .or_insert(default)
                    .runtime_grid = None;
            }
            if clear_hlod_layer {
                desc.view_map.get_mut(index).set_forced_no_hlod_layer();
            }
            for reference in unfilter {
                log::debug!(
                    "[StreamingGeneration] Actor {} removed from the filter of container {}",
                    reference,
                    desc.id
                );
                desc.filtered_actors.remove(&reference);
            }
        }
        report.passes += 1;

        if fixup {
            report.corrections += errors;
        } else {
            report.errors_reported += errors;
        }
        if errors == 0 {
            break;
        }
    }

    desc.instance_validation = report;
    Ok(report)
}

/// Checks that every member of every cluster shares the attributes that
/// make a cluster one streaming unit.
pub(crate) fn check_cluster_invariants(
    desc: &ContainerCollectionInstanceDescriptor<'_>,
) -> Result<(), ClusterInvariantError> {
    for cluster in &desc.clusters {
        let Some((first_guid, rest)) = cluster.split_first() else {
            continue;
        };
        let first = desc.view_map.find_by_guid_checked(first_guid);
        for guid in rest {
            let other = desc.view_map.find_by_guid_checked(guid);
            let attribute = if first.runtime_grid() != other.runtime_grid() {
                Some("runtime grid")
            } else if first.is_spatially_loaded() != other.is_spatially_loaded() {
                Some("spatial loading")
            } else if first.content_bundle() != other.content_bundle() {
                Some("content bundle")
            } else if first.external_data_layer() != other.external_data_layer() {
                Some("external data layer")
            } else {
                None
            };
            if let Some(attribute) = attribute {
                log::error!(
                    "[StreamingGeneration] Cluster of container {} mixes {} between {} and {}",
                    desc.id,
                    attribute,
                    first,
                    other
                );
                return Err(ClusterInvariantError {
                    container: desc.id.clone(),
                    first: *first_guid,
                    other: *guid,
                    attribute,
                });
            }
        }
    }
    Ok(())
}
