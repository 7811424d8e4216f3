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

//! Provides RAII-based timers that log the duration of a scope.

use log::Level;
use std::time::{Duration, Instant};

/// Logs the time spent in a scope when dropped.
///
/// The measurement is logged even on early returns, which is what the
/// pipeline steps rely on to report the duration of a failed step.
pub struct ScopedTimer {
    label: String,
    level: Level,
    started: Instant,
}

impl ScopedTimer {
    /// Starts a timer logged at `info` level.
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_level(label, Level::Info)
    }

    /// Starts a timer logged at `level`.
    pub fn with_level(label: impl Into<String>, level: Level) -> Self {
        Self {
            label: label.into(),
            level,
            started: Instant::now(),
        }
    }

    /// Time elapsed since the timer started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// The label the timer reports under.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        log::log!(
            self.level,
            "{} took {:.3}s",
            self.label,
            self.elapsed().as_secs_f64()
        );
    }
}
