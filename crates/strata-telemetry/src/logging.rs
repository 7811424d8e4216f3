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

//! Logger initialisation.

use env_logger::{Builder, Env};
use log::LevelFilter;

/// The filter used when `RUST_LOG` is not set.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Installs the global logger.
///
/// `RUST_LOG` wins over the default filter. Calling this twice is harmless:
/// the second call leaves the first logger in place.
pub fn init(verbose: bool) {
    let result = Builder::from_env(Env::default().default_filter_or(default_filter(verbose)))
        .filter_module("walkdir", LevelFilter::Warn)
        .format_timestamp_millis()
        .try_init();
    if result.is_err() {
        log::debug!("Logger already initialised");
    }
}
