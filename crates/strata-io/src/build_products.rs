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

//! The build-products file: one relative path per line, appended to by
//! every step that produces files a later step must fetch.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

/// Renders `path` with forward slashes so the file reads the same on every
/// host.
fn to_product_line(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Appends `files` to the build-products file at `path`, creating it if
/// needed. Returns the number of lines written.
pub fn append_build_products<P: AsRef<Path>>(
    path: &Path,
    files: impl IntoIterator<Item = P>,
) -> io::Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut out = OpenOptions::new().create(true).append(true).open(path)?;
    let mut written = 0;
    for file in files {
        writeln!(out, "{}", to_product_line(file.as_ref()))?;
        written += 1;
    }
    out.flush()?;
    log::debug!(
        "[HLODBuilder] Appended {} build products to '{}'",
        written,
        path.display()
    );
    Ok(written)
}

/// Reads every path listed in the build-products file at `path`.
pub fn read_build_products(path: &Path) -> io::Result<Vec<PathBuf>> {
    let text = fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}
