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

//! # Strata Infra
//!
//! Concrete implementations of the collaborator contracts declared in
//! `strata-core`: a grid based runtime hash, proxy HLOD utilities and a
//! file system source control helper.

#![warn(missing_docs)]

pub mod hlod;
pub mod partition;
pub mod source_control;

pub use hlod::ProxyHlodUtilities;
pub use partition::{GridSettings, HlodLayerSettings, PartitionSettings, SpatialGridHash};
pub use source_control::{ChangeRecord, FileSystemSourceControl};
