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

//! Axis-aligned bounds of actors, actor sets and containers.

use super::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// World-space axis-aligned bounds.
///
/// Actor descriptors carry their runtime bounds as an `Aabb`. Containers
/// accumulate the bounds of their spatially loaded actors bottom-up, so the
/// neutral element [`Aabb::INVALID`] is the starting value of every
/// accumulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Lower corner.
    pub min: Vec3,
    /// Upper corner.
    pub max: Vec3,
}

impl Aabb {
    /// Empty bounds: merging anything into them yields that thing.
    pub const INVALID: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Bounds spanning two opposite corners, given in any order.
    #[inline]
    pub fn from_min_max(a: Vec3, b: Vec3) -> Self {
        Self { min: a.min(b), max: a.max(b) }
    }

    /// Center point.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Extent along each axis.
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// `false` for empty bounds. Flat bounds (`min == max`) are valid.
    #[inline]
    pub fn is_valid(&self) -> bool {
        [self.min.x <= self.max.x, self.min.y <= self.max.y, self.min.z <= self.max.z]
            .iter()
            .all(|ok| *ok)
    }

    /// Smallest bounds holding both `self` and `other`.
    #[inline]
    pub fn merge(&self, other: &Aabb) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Returns this box moved by `offset`. Invalid boxes stay invalid.
    #[inline]
    pub fn translated(&self, offset: Vec3) -> Self {
        if !self.is_valid() {
            return *self;
        }
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for Aabb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return write!(f, "IsValid=false");
        }
        write!(
            f,
            "Min=({:.1}, {:.1}, {:.1}) Max=({:.1}, {:.1}, {:.1})",
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z
        )
    }
}
