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

//! Overlays on top of immutable actor descriptors.
//!
//! An [`ActorDescView`] borrows one [`ActorDescriptor`] and records every
//! decision the generator takes about it: forced overrides, resolved values,
//! the parent it inherits from. The descriptor itself is never touched.

use super::view_map::{ActorDescViewMap, ViewIndex};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use strata_core::{ActorDescriptor, ActorGuid, Aabb, DataLayerInstanceNames};

static NO_DATA_LAYERS: DataLayerInstanceNames = DataLayerInstanceNames::EMPTY;

/// The conservative values the validator can force on a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForcedOverride {
    /// The actor is always loaded.
    NonSpatiallyLoaded,
    /// The actor streams in no runtime grid.
    NoRuntimeGrid,
    /// The actor keeps its external data layer only.
    NoDataLayers,
    /// The actor is excluded from HLOD layers.
    NoHlodLayer,
    /// The actor does not contribute to HLODs.
    HlodIrrelevant,
}

impl ForcedOverride {
    /// Number of distinct overrides.
    pub const COUNT: usize = 5;

    fn bit(self) -> u8 {
        1 << (self as u8)
    }

    fn describe(self) -> &'static str {
        match self {
            ForcedOverride::NonSpatiallyLoaded => "forced non spatially loaded",
            ForcedOverride::NoRuntimeGrid => "forced to no runtime grid",
            ForcedOverride::NoDataLayers => "forced to no data layers",
            ForcedOverride::NoHlodLayer => "forced to no HLOD layer",
            ForcedOverride::HlodIrrelevant => "forced HLOD irrelevant",
        }
    }
}

/// A compact set of [`ForcedOverride`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverrideSet(u8);

impl OverrideSet {
    /// Returns `true` if `o` is set.
    pub fn contains(&self, o: ForcedOverride) -> bool {
        self.0 & o.bit() != 0
    }

    /// Sets `o`. Returns `true` if it was not set before.
    pub fn insert(&mut self, o: ForcedOverride) -> bool {
        let newly = !self.contains(o);
        self.0 |= o.bit();
        newly
    }

    /// Number of overrides set.
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Returns `true` if nothing is forced.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Diagnostic data kept about a reference the validator invalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidReference {
    /// GUID of the referenced actor.
    pub guid: ActorGuid,
    /// Its label.
    pub label: String,
    /// Its native class.
    pub native_class: String,
    /// Its external data layer.
    pub external_data_layer: Option<String>,
}

impl InvalidReference {
    /// Captures the diagnostic data of `desc`.
    pub fn of(desc: &ActorDescriptor) -> Self {
        Self {
            guid: desc.guid,
            label: desc.label.clone(),
            native_class: desc.native_class.clone(),
            external_data_layer: desc.external_data_layer.clone(),
        }
    }
}

/// A mutable overlay over one actor descriptor.
///
/// Views with a parent inherit its grid, spatial flag and data layers;
/// those effective values are read through a [`ViewRef`], which can follow
/// the parent link inside the owning map.
#[derive(Debug, Clone)]
pub struct ActorDescView<'w> {
    desc: &'w ActorDescriptor,
    forced: OverrideSet,
    resolved_runtime_grid: Option<String>,
    resolved_data_layers: Option<DataLayerInstanceNames>,
    runtime_data_layers: Option<DataLayerInstanceNames>,
    runtime_hlod_layer: Option<String>,
    runtime_references: Option<Vec<ActorGuid>>,
    editor_references: Vec<ActorGuid>,
    parent_view: Option<ViewIndex>,
    editor_only_parent: Option<ActorGuid>,
    forced_invalid_references: BTreeMap<ActorGuid, InvalidReference>,
}

impl<'w> ActorDescView<'w> {
    /// Creates a view with no override.
    pub fn new(desc: &'w ActorDescriptor) -> Self {
        Self {
            desc,
            forced: OverrideSet::default(),
            resolved_runtime_grid: None,
            resolved_data_layers: None,
            runtime_data_layers: None,
            runtime_hlod_layer: None,
            runtime_references: None,
            editor_references: Vec::new(),
            parent_view: None,
            editor_only_parent: None,
            forced_invalid_references: BTreeMap::new(),
        }
    }

    /// The wrapped descriptor.
    pub fn descriptor(&self) -> &'w ActorDescriptor {
        self.desc
    }

    /// GUID of the actor.
    pub fn guid(&self) -> ActorGuid {
        self.desc.guid
    }

    /// Label of the actor.
    pub fn label(&self) -> &'w str {
        &self.desc.label
    }

    /// Exact native class of the actor.
    pub fn native_class(&self) -> &'w str {
        &self.desc.native_class
    }

    /// The overrides forced so far.
    pub fn forced(&self) -> OverrideSet {
        self.forced
    }

    /// Returns `true` if `o` is forced.
    pub fn is_forced(&self, o: ForcedOverride) -> bool {
        self.forced.contains(o)
    }

    /// The parent view this one inherits from.
    pub fn parent_view(&self) -> Option<ViewIndex> {
        self.parent_view
    }

    /// The editor-only parent, when the parent actor never reaches runtime.
    pub fn editor_only_parent(&self) -> Option<ActorGuid> {
        self.editor_only_parent
    }

    /// The external data layer, which no override can clear.
    pub fn external_data_layer(&self) -> Option<&'w str> {
        self.desc.external_data_layer.as_deref()
    }

    /// Content bundle of the actor.
    pub fn content_bundle(&self) -> Option<ActorGuid> {
        self.desc.content_bundle
    }

    /// Runtime bounds in container space.
    pub fn runtime_bounds(&self) -> Aabb {
        self.desc.bounds
    }

    /// Returns `true` if the actor places a nested container.
    pub fn is_container_instance(&self) -> bool {
        self.desc.child_container.is_some()
    }

    /// The references usable at runtime once validation has split them,
    /// the raw descriptor references before that.
    pub fn references(&self) -> &[ActorGuid] {
        self.runtime_references
            .as_deref()
            .unwrap_or(&self.desc.references)
    }

    /// References demoted to editor-only by validation.
    pub fn editor_references(&self) -> &[ActorGuid] {
        &self.editor_references
    }

    /// References invalidated by validation, with their diagnostic data.
    pub fn forced_invalid_references(&self) -> &BTreeMap<ActorGuid, InvalidReference> {
        &self.forced_invalid_references
    }

    /// Returns `true` if `reference` must be ignored at runtime.
    pub fn is_editor_only_reference(&self, reference: &ActorGuid) -> bool {
        self.desc.editor_only_references.contains(reference)
            || self.forced_invalid_references.contains_key(reference)
    }

    /// Effective HLOD layer.
    pub fn hlod_layer(&self) -> Option<&str> {
        if self.is_forced(ForcedOverride::NoHlodLayer) {
            return None;
        }
        self.runtime_hlod_layer
            .as_deref()
            .or(self.desc.hlod_layer.as_deref())
    }

    /// Effective HLOD relevance.
    pub fn is_hlod_relevant(&self) -> bool {
        !self.is_forced(ForcedOverride::HlodIrrelevant) && self.desc.is_hlod_relevant
    }

    /// Spatial flag of this view alone, ignoring any parent.
    pub fn own_is_spatially_loaded(&self) -> bool {
        !self.is_forced(ForcedOverride::NonSpatiallyLoaded) && self.desc.is_spatially_loaded
    }

    /// Runtime grid of this view alone, ignoring any parent.
    pub fn own_runtime_grid(&self) -> Option<&str> {
        if self.is_forced(ForcedOverride::NoRuntimeGrid) {
            return None;
        }
        self.resolved_runtime_grid
            .as_deref()
            .or(self.desc.runtime_grid.as_deref())
    }

    fn log_forced(&self, o: ForcedOverride) {
        log::debug!("[StreamingGeneration] Actor {} {}", self, o.describe());
    }

    fn force(&mut self, o: ForcedOverride) -> bool {
        let newly = self.forced.insert(o);
        if newly {
            self.log_forced(o);
        }
        newly
    }

    /// Forces the actor always loaded. Returns `true` on the first call.
    pub fn set_forced_non_spatially_loaded(&mut self) -> bool {
        self.force(ForcedOverride::NonSpatiallyLoaded)
    }

    /// Forces the actor out of any runtime grid. Returns `true` on the first call.
    pub fn set_forced_no_runtime_grid(&mut self) -> bool {
        self.force(ForcedOverride::NoRuntimeGrid)
    }

    /// Drops every regular data layer. Returns `true` on the first call.
    pub fn set_forced_no_data_layers(&mut self) -> bool {
        if !self.force(ForcedOverride::NoDataLayers) {
            return false;
        }
        if let Some(names) = &mut self.resolved_data_layers {
            names.force_empty();
        }
        if let Some(names) = &mut self.runtime_data_layers {
            names.force_empty();
        }
        true
    }

    /// Removes the HLOD layer. Returns `true` on the first call.
    pub fn set_forced_no_hlod_layer(&mut self) -> bool {
        self.force(ForcedOverride::NoHlodLayer)
    }

    /// Makes the actor HLOD irrelevant. Returns `true` on the first call.
    pub fn set_forced_hlod_irrelevant(&mut self) -> bool {
        self.force(ForcedOverride::HlodIrrelevant)
    }

    /// Marks `reference` invalid. Returns `true` the first time a given
    /// reference is added.
    pub fn add_forced_invalid_reference(&mut self, reference: InvalidReference) -> bool {
        if self.forced_invalid_references.contains_key(&reference.guid) {
            return false;
        }
        log::debug!(
            "[StreamingGeneration] Actor {} forced invalid reference to '{}' ({})",
            self,
            reference.label,
            reference.guid
        );
        self.forced_invalid_references
            .insert(reference.guid, reference);
        true
    }

    /// Sets the grid resolved from the container default.
    pub fn set_runtime_grid(&mut self, grid: Option<String>) {
        self.resolved_runtime_grid = grid;
    }

    /// Sets the HLOD layer inherited from the container.
    pub fn set_runtime_hlod_layer(&mut self, layer: Option<String>) {
        self.runtime_hlod_layer = layer;
    }

    /// Sets every resolved data layer, editor ones included.
    pub fn set_data_layer_instance_names(&mut self, mut names: DataLayerInstanceNames) {
        if self.is_forced(ForcedOverride::NoDataLayers) {
            names.force_empty();
        }
        self.resolved_data_layers = Some(names);
    }

    /// Sets the resolved runtime data layers.
    pub fn set_runtime_data_layer_instance_names(&mut self, mut names: DataLayerInstanceNames) {
        if self.is_forced(ForcedOverride::NoDataLayers) {
            names.force_empty();
        }
        self.runtime_data_layers = Some(names);
    }

    /// Splits the references into runtime and editor ones.
    pub fn set_references(&mut self, runtime: Vec<ActorGuid>, editor: Vec<ActorGuid>) {
        self.runtime_references = Some(runtime);
        self.editor_references = editor;
    }

    /// Links this view to its parent view.
    pub fn set_parent_view(&mut self, parent: ViewIndex) {
        debug_assert!(self.parent_view.is_none());
        self.parent_view = Some(parent);
    }

    /// Records the editor-only parent of this view.
    pub fn set_editor_only_parent(&mut self, parent: ActorGuid) {
        self.editor_only_parent = Some(parent);
    }

    pub(crate) fn resolved_data_layers(&self) -> Option<&DataLayerInstanceNames> {
        self.resolved_data_layers.as_ref()
    }

    pub(crate) fn runtime_data_layers(&self) -> Option<&DataLayerInstanceNames> {
        self.runtime_data_layers.as_ref()
    }
}

impl fmt::Display for ActorDescView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' ({} {})", self.desc.label, self.desc.native_class, self.desc.guid)?;
        if let Some(parent) = self.editor_only_parent {
            write!(f, " EditorOnlyParent={}", parent)?;
        }
        Ok(())
    }
}

/// A view read through the map that owns it.
///
/// Effective values consult, in order: the forced override, the parent view
/// (unless the same value is forced locally), the resolved value, and the
/// raw descriptor.
#[derive(Clone, Copy)]
pub struct ViewRef<'a, 'w> {
    map: &'a ActorDescViewMap<'w>,
    view: &'a ActorDescView<'w>,
}

impl<'a, 'w> ViewRef<'a, 'w> {
    pub(crate) fn new(map: &'a ActorDescViewMap<'w>, view: &'a ActorDescView<'w>) -> Self {
        Self { map, view }
    }

    /// The underlying view.
    pub fn view(&self) -> &'a ActorDescView<'w> {
        self.view
    }

    /// The parent view, if linked.
    pub fn parent(&self) -> Option<ViewRef<'a, 'w>> {
        self.view
            .parent_view
            .map(|index| self.map.get(index))
    }

    /// Effective runtime grid.
    pub fn runtime_grid(&self) -> Option<&'a str> {
        if self.view.is_forced(ForcedOverride::NoRuntimeGrid) {
            return None;
        }
        match self.parent() {
            Some(parent) => parent.runtime_grid(),
            None => self.view.own_runtime_grid(),
        }
    }

    /// Effective spatial loading flag.
    pub fn is_spatially_loaded(&self) -> bool {
        if self.view.is_forced(ForcedOverride::NonSpatiallyLoaded) {
            return false;
        }
        match self.parent() {
            Some(parent) => parent.is_spatially_loaded(),
            None => self.view.desc.is_spatially_loaded,
        }
    }

    /// Effective data layers, editor ones included.
    pub fn data_layer_instance_names(&self) -> &'a DataLayerInstanceNames {
        if !self.view.is_forced(ForcedOverride::NoDataLayers) {
            if let Some(parent) = self.parent() {
                return parent.data_layer_instance_names();
            }
        }
        self.view
            .resolved_data_layers()
            .unwrap_or(&NO_DATA_LAYERS)
    }

    /// Effective runtime data layers.
    pub fn runtime_data_layer_instance_names(&self) -> &'a DataLayerInstanceNames {
        if !self.view.is_forced(ForcedOverride::NoDataLayers) {
            if let Some(parent) = self.parent() {
                return parent.runtime_data_layer_instance_names();
            }
        }
        self.view
            .runtime_data_layers()
            .unwrap_or(&NO_DATA_LAYERS)
    }
}

impl<'a, 'w> Deref for ViewRef<'a, 'w> {
    type Target = ActorDescView<'w>;

    fn deref(&self) -> &Self::Target {
        self.view
    }
}

impl fmt::Debug for ViewRef<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewRef")
            .field("guid", &self.view.guid())
            .field("runtime_grid", &self.runtime_grid())
            .field("is_spatially_loaded", &self.is_spatially_loaded())
            .finish()
    }
}

impl fmt::Display for ViewRef<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.view, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: u128) -> ActorDescriptor {
        let mut desc = ActorDescriptor::new(ActorGuid::from_u128(id), "StaticMeshActor")
            .with_label(format!("Actor{}", id));
        desc.runtime_grid = Some("MainGrid".to_string());
        desc.data_layers = vec!["Gameplay".to_string()];
        desc
    }

    #[test]
    fn test_setters_report_only_the_first_flip() {
        let desc = descriptor(1);
        let mut view = ActorDescView::new(&desc);

        assert!(view.set_forced_non_spatially_loaded());
        assert!(!view.set_forced_non_spatially_loaded());
        assert!(view.set_forced_no_runtime_grid());
        assert!(!view.set_forced_no_runtime_grid());
        assert_eq!(view.forced().len(), 2);
        assert!(!view.own_is_spatially_loaded());
        assert_eq!(view.own_runtime_grid(), None);
    }

    #[test]
    fn test_forced_no_data_layers_applies_to_late_resolution() {
        let desc = descriptor(1);
        let mut view = ActorDescView::new(&desc);
        assert!(view.set_forced_no_data_layers());

        view.set_runtime_data_layer_instance_names(DataLayerInstanceNames::new(
            vec!["Gameplay".to_string()],
            Some("EDL".to_string()),
        ));

        let names = view.runtime_data_layers().unwrap();
        assert!(names.non_external().is_empty());
        assert_eq!(names.external_data_layer(), Some("EDL"));
    }

    #[test]
    fn test_forced_invalid_reference_is_deduplicated() {
        let desc = descriptor(1);
        let target = descriptor(2);
        let mut view = ActorDescView::new(&desc);

        assert!(view.add_forced_invalid_reference(InvalidReference::of(&target)));
        assert!(!view.add_forced_invalid_reference(InvalidReference::of(&target)));
        assert!(view.is_editor_only_reference(&target.guid));
        assert_eq!(view.forced_invalid_references().len(), 1);
    }

    #[test]
    fn test_forced_override_short_circuits_parent_inheritance() {
        // --- 1. ARRANGE ---
        let parent_desc = descriptor(1);
        let mut child_desc = descriptor(2);
        child_desc.runtime_grid = Some("OtherGrid".to_string());
        child_desc.parent_actor = Some(parent_desc.guid);

        let mut map = ActorDescViewMap::new();
        let parent = map.emplace(ActorDescView::new(&parent_desc)).unwrap();
        let child = map.emplace(ActorDescView::new(&child_desc)).unwrap();
        map.get_mut(child).set_parent_view(parent);

        // --- 2. ACT & ASSERT ---
        assert_eq!(map.get(child).runtime_grid(), Some("MainGrid"));
        assert!(map.get(child).is_spatially_loaded());

        map.get_mut(child).set_forced_non_spatially_loaded();
        map.get_mut(child).set_forced_no_runtime_grid();
        assert_eq!(map.get(child).runtime_grid(), None);
        assert!(!map.get(child).is_spatially_loaded());
        assert!(map.get(parent).is_spatially_loaded());
    }

    #[test]
    fn test_hlod_layer_priority() {
        let mut desc = descriptor(1);
        desc.hlod_layer = Some("Own".to_string());
        let mut view = ActorDescView::new(&desc);
        assert_eq!(view.hlod_layer(), Some("Own"));

        view.set_runtime_hlod_layer(Some("Inherited".to_string()));
        assert_eq!(view.hlod_layer(), Some("Inherited"));

        view.set_forced_no_hlod_layer();
        assert_eq!(view.hlod_layer(), None);
    }
}
