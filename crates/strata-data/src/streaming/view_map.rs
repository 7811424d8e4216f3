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

//! Arena storage for the views of one container instance.

use super::view::{ActorDescView, ViewRef};
use std::collections::HashMap;
use std::fmt;
use strata_core::ActorGuid;

/// A stable handle to a view inside its [`ActorDescViewMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewIndex(usize);

impl ViewIndex {
    /// The position of the view in its map.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Returned when a GUID is emplaced twice in the same map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateActorError(pub ActorGuid);

impl fmt::Display for DuplicateActorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor {} is already registered", self.0)
    }
}

impl std::error::Error for DuplicateActorError {}

/// Owns every view of a container instance, keyed by GUID and indexed by
/// exact native class.
#[derive(Debug, Default)]
pub struct ActorDescViewMap<'w> {
    views: Vec<ActorDescView<'w>>,
    by_guid: HashMap<ActorGuid, ViewIndex>,
    by_class: HashMap<&'w str, Vec<ViewIndex>>,
}

impl<'w> ActorDescViewMap<'w> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self {
            views: Vec::new(),
            by_guid: HashMap::new(),
            by_class: HashMap::new(),
        }
    }

    /// Registers `view`. A GUID can only be registered once.
    pub fn emplace(&mut self, view: ActorDescView<'w>) -> Result<ViewIndex, DuplicateActorError> {
        let guid = view.guid();
        if self.by_guid.contains_key(&guid) {
            return Err(DuplicateActorError(guid));
        }
        let index = ViewIndex(self.views.len());
        self.by_guid.insert(guid, index);
        self.by_class
            .entry(view.native_class())
            .or_default()
            .push(index);
        self.views.push(view);
        Ok(index)
    }

    /// Number of views.
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Returns `true` if the map holds no view.
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Returns `true` if `guid` is registered.
    pub fn contains(&self, guid: &ActorGuid) -> bool {
        self.by_guid.contains_key(guid)
    }

    /// The handle of `guid`, if registered.
    pub fn index_of(&self, guid: &ActorGuid) -> Option<ViewIndex> {
        self.by_guid.get(guid).copied()
    }

    /// Looks a view up by GUID.
    pub fn find_by_guid(&self, guid: &ActorGuid) -> Option<ViewRef<'_, 'w>> {
        self.index_of(guid).map(|index| self.get(index))
    }

    /// Looks a view up by GUID.
    ///
    /// # Panics
    ///
    /// Panics if `guid` is not registered. Callers only use it for GUIDs the
    /// map handed out itself.
    pub fn find_by_guid_checked(&self, guid: &ActorGuid) -> ViewRef<'_, 'w> {
        match self.find_by_guid(guid) {
            Some(view) => view,
            None => panic!("actor {} is not registered in the view map", guid),
        }
    }

    /// Every view whose native class is exactly `class`, subclasses excluded.
    pub fn find_by_exact_native_class<'a>(
        &'a self,
        class: &str,
    ) -> impl Iterator<Item = ViewRef<'a, 'w>> + 'a {
        self.by_class
            .get(class)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(move |index| self.get(*index))
    }

    /// The view at `index`.
    pub fn get(&self, index: ViewIndex) -> ViewRef<'_, 'w> {
        ViewRef::new(self, &self.views[index.0])
    }

    /// The view at `index`, for mutation.
    pub fn get_mut(&mut self, index: ViewIndex) -> &mut ActorDescView<'w> {
        &mut self.views[index.0]
    }

    /// Reads a view that lives outside the map, such as a child-container
    /// view, with parent links resolved in this map.
    pub fn view_ref<'a>(&'a self, view: &'a ActorDescView<'w>) -> ViewRef<'a, 'w> {
        ViewRef::new(self, view)
    }

    /// Every handle, in insertion order.
    pub fn indices(&self) -> impl Iterator<Item = ViewIndex> {
        (0..self.views.len()).map(ViewIndex)
    }

    /// Every view, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = ViewRef<'_, 'w>> {
        self.views.iter().map(move |view| ViewRef::new(self, view))
    }
}
