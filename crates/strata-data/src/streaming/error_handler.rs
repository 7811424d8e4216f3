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

//! Reporting of the violations found by the validator.
//!
//! Callbacks fire on the reporting pass only. Every violation is corrected
//! afterwards whatever the handler does.

use super::view::ViewRef;
use strata_core::ActorGuid;

/// Why a level-script reference is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldReferenceReason {
    /// The referenced actor is spatially loaded.
    SpatiallyLoaded,
    /// The referenced actor is gated by data layers.
    HasDataLayers,
}

/// Why a reference crosses incompatible data layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceDataLayersReason {
    /// The two actors belong to different external data layers.
    DifferentExternalDataLayer,
    /// The referenced actor has runtime data layers the referencer lacks.
    DifferentRuntimeDataLayers,
}

/// Receives every violation found while validating a partition.
///
/// All callbacks default to doing nothing.
#[allow(unused_variables)]
pub trait StreamingGenerationErrorHandler {
    /// The instance runtime grid of `view` is not valid for its class.
    fn on_invalid_runtime_grid(&mut self, view: ViewRef<'_, '_>, grid: Option<&str>) {}

    /// The level script references `view`, which is not always loaded.
    fn on_invalid_world_reference(&mut self, view: ViewRef<'_, '_>, reason: WorldReferenceReason) {}

    /// `view` references `reference`, which does not exist.
    fn on_invalid_reference(
        &mut self,
        view: ViewRef<'_, '_>,
        reference: ActorGuid,
        reference_view: Option<ViewRef<'_, '_>>,
    ) {
    }

    /// One of `view` and `reference` is spatially loaded, the other is not.
    fn on_invalid_reference_grid_placement(
        &mut self,
        view: ViewRef<'_, '_>,
        reference: ViewRef<'_, '_>,
    ) {
    }

    /// `view` and `reference` do not share compatible data layers.
    fn on_invalid_reference_data_layers(
        &mut self,
        view: ViewRef<'_, '_>,
        reference: ViewRef<'_, '_>,
        reason: ReferenceDataLayersReason,
    ) {
    }

    /// `view` and `reference` stream in different runtime grids.
    fn on_invalid_reference_runtime_grid(
        &mut self,
        view: ViewRef<'_, '_>,
        reference: ViewRef<'_, '_>,
    ) {
    }

    /// The runtime data layers of `view` disagree on their load filter.
    fn on_data_layers_load_filter_mismatch(&mut self, view: ViewRef<'_, '_>) {}

    /// `view` is loaded in play-in-editor only yet streams or has data layers.
    fn on_invalid_editor_only_loaded_in_pie(&mut self, view: ViewRef<'_, '_>) {}

    /// The HLOD layer of `view` cannot be generated in its grid.
    fn on_invalid_hlod_layer(&mut self, view: ViewRef<'_, '_>) {}

    /// `view` is kept by a level-instance filter but references the filtered
    /// `reference`.
    fn on_invalid_actor_filter_reference(
        &mut self,
        view: ViewRef<'_, '_>,
        reference: ViewRef<'_, '_>,
    ) {
    }
}

/// Ignores every violation. Corrections still happen.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullErrorHandler;

impl StreamingGenerationErrorHandler for NullErrorHandler {}

/// Logs every violation as a warning and counts them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorHandler {
    reported: usize,
}

impl LogErrorHandler {
    /// Creates a handler with a zero count.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of violations reported so far.
    pub fn reported(&self) -> usize {
        self.reported
    }
}

impl StreamingGenerationErrorHandler for LogErrorHandler {
    fn on_invalid_runtime_grid(&mut self, view: ViewRef<'_, '_>, grid: Option<&str>) {
        self.reported += 1;
        log::warn!(
            "[StreamingGeneration] Actor {} has an invalid runtime grid {:?}",
            view,
            grid
        );
    }

    fn on_invalid_world_reference(&mut self, view: ViewRef<'_, '_>, reason: WorldReferenceReason) {
        self.reported += 1;
        match reason {
            WorldReferenceReason::SpatiallyLoaded => log::warn!(
                "[StreamingGeneration] Level script references spatially loaded actor {}",
                view
            ),
            WorldReferenceReason::HasDataLayers => log::warn!(
                "[StreamingGeneration] Level script references actor {} with data layers",
                view
            ),
        }
    }

    fn on_invalid_reference(
        &mut self,
        view: ViewRef<'_, '_>,
        reference: ActorGuid,
        reference_view: Option<ViewRef<'_, '_>>,
    ) {
        self.reported += 1;
        match reference_view {
            Some(target) => log::warn!(
                "[StreamingGeneration] Actor {} has an invalid reference to {}",
                view,
                target
            ),
            None => log::warn!(
                "[StreamingGeneration] Actor {} has a missing reference to {}",
                view,
                reference
            ),
        }
    }

    fn on_invalid_reference_grid_placement(
        &mut self,
        view: ViewRef<'_, '_>,
        reference: ViewRef<'_, '_>,
    ) {
        self.reported += 1;
        let placement = |spatial: bool| if spatial { "Spatially loaded" } else { "Non-spatially loaded" };
        log::warn!(
            "[StreamingGeneration] {} actor {} references {} actor {}",
            placement(view.is_spatially_loaded()),
            view,
            placement(reference.is_spatially_loaded()).to_lowercase(),
            reference
        );
    }

    fn on_invalid_reference_data_layers(
        &mut self,
        view: ViewRef<'_, '_>,
        reference: ViewRef<'_, '_>,
        reason: ReferenceDataLayersReason,
    ) {
        self.reported += 1;
        match reason {
            ReferenceDataLayersReason::DifferentExternalDataLayer => log::warn!(
                "[StreamingGeneration] Actor {} ({:?}) references actor {} ({:?}) of another external data layer",
                view,
                view.external_data_layer(),
                reference,
                reference.external_data_layer()
            ),
            ReferenceDataLayersReason::DifferentRuntimeDataLayers => log::warn!(
                "[StreamingGeneration] Actor {} {:?} references actor {} {:?} with different runtime data layers",
                view,
                view.runtime_data_layer_instance_names().non_external(),
                reference,
                reference.runtime_data_layer_instance_names().non_external()
            ),
        }
    }

    fn on_invalid_reference_runtime_grid(
        &mut self,
        view: ViewRef<'_, '_>,
        reference: ViewRef<'_, '_>,
    ) {
        self.reported += 1;
        log::warn!(
            "[StreamingGeneration] Actor {} ({:?}) references actor {} ({:?}) of another runtime grid",
            view,
            view.runtime_grid(),
            reference,
            reference.runtime_grid()
        );
    }

    fn on_data_layers_load_filter_mismatch(&mut self, view: ViewRef<'_, '_>) {
        self.reported += 1;
        log::warn!(
            "[StreamingGeneration] Actor {} mixes client-only and server-only data layers",
            view
        );
    }

    fn on_invalid_editor_only_loaded_in_pie(&mut self, view: ViewRef<'_, '_>) {
        self.reported += 1;
        log::warn!(
            "[StreamingGeneration] Editor-only actor {} must be always loaded without data layers",
            view
        );
    }

    fn on_invalid_hlod_layer(&mut self, view: ViewRef<'_, '_>) {
        self.reported += 1;
        log::warn!(
            "[StreamingGeneration] Actor {} has an invalid HLOD layer {:?}",
            view,
            view.hlod_layer()
        );
    }

    fn on_invalid_actor_filter_reference(
        &mut self,
        view: ViewRef<'_, '_>,
        reference: ViewRef<'_, '_>,
    ) {
        self.reported += 1;
        log::warn!(
            "[StreamingGeneration] Actor {} references filtered actor {}",
            view,
            reference
        );
    }
}
