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

//! Error types of the on-disk formats.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading, writing or using a build manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The manifest file could not be read or written.
    #[error("failed to access manifest '{path}'")]
    Io {
        /// The manifest path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A line is not a section header, a key/value pair or a comment.
    #[error("manifest line {line}: {reason}")]
    Syntax {
        /// 1-based line number.
        line: usize,
        /// What is wrong with the line.
        reason: String,
    },

    /// A required key is absent.
    #[error("manifest is missing '{key}' in section [{section}]")]
    MissingKey {
        /// Section searched.
        section: String,
        /// Key searched.
        key: &'static str,
    },

    /// A value cannot be parsed.
    #[error("manifest value '{value}' is not valid for '{key}'")]
    InvalidValue {
        /// The key.
        key: String,
        /// The raw value.
        value: String,
    },

    /// The manifest was produced by another engine version.
    #[error("manifest engine version '{found}' does not match running version '{expected}'")]
    EngineVersionMismatch {
        /// Version recorded in the manifest.
        found: String,
        /// Version of the running builder.
        expected: String,
    },

    /// The requested builder is not described by the manifest.
    #[error("builder index {index} is out of range, the manifest has {count} builders")]
    BuilderOutOfRange {
        /// Requested builder.
        index: usize,
        /// Builders in the manifest.
        count: usize,
    },
}

/// Errors raised while staging files to or from a working directory.
#[derive(Error, Debug)]
pub enum StagingError {
    /// A filesystem operation failed.
    #[error("failed to {operation} '{from}' -> '{to}'")]
    Io {
        /// What was attempted.
        operation: &'static str,
        /// Source path.
        from: PathBuf,
        /// Destination path.
        to: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A file to stage does not exist.
    #[error("file to stage '{0}' does not exist")]
    MissingSource(PathBuf),

    /// A path escapes the root it is relative to.
    #[error("'{0}' is not a relative path inside the workspace")]
    InvalidPath(PathBuf),

    /// Walking a staging folder failed.
    #[error("failed to scan staging folder")]
    Walk(#[from] walkdir::Error),
}

/// Errors raised while loading or saving a world and its actor packages.
#[derive(Error, Debug)]
pub enum WorldLoadError {
    /// A file could not be read or written.
    #[error("failed to access '{path}'")]
    Io {
        /// The file path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A file is not valid RON for its record type.
    #[error("failed to parse '{path}'")]
    Parse {
        /// The file path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: ron::error::SpannedError,
    },

    /// A record could not be encoded.
    #[error("failed to encode '{what}'")]
    Encode {
        /// The record being encoded.
        what: String,
        /// The underlying error.
        #[source]
        source: ron::Error,
    },

    /// Walking an external-actor folder failed.
    #[error("failed to scan external actors")]
    Walk(#[from] walkdir::Error),

    /// Two actor packages of one container share a GUID.
    #[error("actor {guid} is stored twice in container '{container}'")]
    DuplicateActor {
        /// The container package.
        container: String,
        /// The duplicated GUID.
        guid: strata_core::ActorGuid,
    },
}
