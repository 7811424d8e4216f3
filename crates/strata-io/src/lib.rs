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

//! # Strata IO
//!
//! Everything the build pipeline reads from or writes to disk: the
//! distributed build manifest, the build-products list, the per-builder
//! staging folders and the world and external-actor packages.

#![warn(missing_docs)]

pub mod build_products;
pub mod error;
pub mod manifest;
pub mod staging;
pub mod world;

pub use build_products::{append_build_products, read_build_products};
pub use error::{ManifestError, StagingError, WorldLoadError};
pub use manifest::BuildManifest;
pub use staging::{
    builder_folder, copy_files_from_working_dir, copy_files_to_working_dir, TO_SUBMIT_FOLDER,
};
pub use world::{
    actor_package, actor_package_path, decode_actor, encode_actor, load_world, save_world,
    world_file_path,
};
