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

//! The distributed build manifest.
//!
//! An INI document assigning HLOD actors to builders:
//!
//! ```text
//! [General]
//! BuilderCount=2
//! EngineVersion=0.1.0
//! +World=Main
//!
//! [HLODBuilder0]
//! +HLODActorGuid=0000000000000000000000000000000A
//!
//! [HLODBuilder1]
//! +HLODActorGuid=0000000000000000000000000000000B
//! ```
//!
//! Keys prefixed with `+` are repeated and keep their order. Worlds after
//! the first are written to `[HLODBuilder<i>.<World>]`.

use crate::error::ManifestError;
use std::fmt;
use std::fs;
use std::path::Path;
use strata_core::{ActorGuid, HlodWorkload};

const GENERAL_SECTION: &str = "General";
const BUILDER_COUNT_KEY: &str = "BuilderCount";
const ENGINE_VERSION_KEY: &str = "EngineVersion";
const WORLD_KEY: &str = "World";
const HLOD_ACTOR_GUID_KEY: &str = "HLODActorGuid";

/// Sections in file order, each with its entries in file order.
#[derive(Debug, Default)]
struct IniDocument {
    sections: Vec<(String, Vec<(String, String)>)>,
}

impl IniDocument {
    fn parse(text: &str) -> Result<Self, ManifestError> {
        let mut doc = IniDocument::default();
        for (number, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if let Some(header) = line.strip_prefix('[') {
                let name = header.strip_suffix(']').ok_or_else(|| ManifestError::Syntax {
                    line: number + 1,
                    reason: format!("unterminated section header '{}'", line),
                })?;
                doc.sections.push((name.trim().to_string(), Vec::new()));
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ManifestError::Syntax {
                    line: number + 1,
                    reason: format!("expected 'Key=Value', found '{}'", line),
                });
            };
            let Some((_, entries)) = doc.sections.last_mut() else {
                return Err(ManifestError::Syntax {
                    line: number + 1,
                    reason: "entry outside of any section".to_string(),
                });
            };
            let key = key.trim();
            let key = key.strip_prefix('+').unwrap_or(key);
            entries.push((key.to_string(), value.trim().to_string()));
        }
        Ok(doc)
    }

    fn section(&self, name: &str) -> Option<&[(String, String)]> {
        self.sections
            .iter()
            .find(|(section, _)| section == name)
            .map(|(_, entries)| entries.as_slice())
    }

    fn values<'a>(&'a self, section: &str, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.section(section)
            .unwrap_or_default()
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn value(&self, section: &str, key: &'static str) -> Result<&str, ManifestError> {
        self.values(section, key)
            .next()
            .ok_or_else(|| ManifestError::MissingKey {
                section: section.to_string(),
                key,
            })
    }
}

fn builder_section(builder: usize, world_index: usize, world: &str) -> String {
    if world_index == 0 {
        format!("HLODBuilder{}", builder)
    } else {
        format!("HLODBuilder{}.{}", builder, world)
    }
}

/// The assignment of HLOD actors to builders for one distributed build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildManifest {
    /// Version of the engine that produced the manifest.
    pub engine_version: String,
    /// Names of the worlds built together, in workload order.
    pub worlds: Vec<String>,
    /// One workload per builder, each holding one list per world.
    pub workloads: Vec<HlodWorkload>,
}

impl BuildManifest {
    /// Creates a manifest. Every workload should hold one list per world.
    pub fn new(
        engine_version: impl Into<String>,
        worlds: Vec<String>,
        workloads: Vec<HlodWorkload>,
    ) -> Self {
        Self {
            engine_version: engine_version.into(),
            worlds,
            workloads,
        }
    }

    /// Number of builders the manifest distributes work to.
    pub fn builder_count(&self) -> usize {
        self.workloads.len()
    }

    /// Renders the manifest as INI text.
    pub fn to_ini(&self) -> String {
        self.to_string()
    }

    /// Parses INI text. Builder sections that are absent yield empty lists.
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        let doc = IniDocument::parse(text)?;

        let raw_count = doc.value(GENERAL_SECTION, BUILDER_COUNT_KEY)?;
        let builder_count: usize = raw_count.parse().map_err(|_| ManifestError::InvalidValue {
            key: BUILDER_COUNT_KEY.to_string(),
            value: raw_count.to_string(),
        })?;
        let engine_version = doc.value(GENERAL_SECTION, ENGINE_VERSION_KEY)?.to_string();

        let mut worlds: Vec<String> = doc
            .values(GENERAL_SECTION, WORLD_KEY)
            .map(str::to_string)
            .collect();
        let world_count = worlds.len().max(1);

        let mut workloads = Vec::with_capacity(builder_count);
        for builder in 0..builder_count {
            let mut workload = Vec::with_capacity(world_count);
            for world_index in 0..world_count {
                let world = worlds.get(world_index).map(String::as_str).unwrap_or("");
                let section = builder_section(builder, world_index, world);
                let actors = doc
                    .values(&section, HLOD_ACTOR_GUID_KEY)
                    .map(|value| {
                        value.parse::<ActorGuid>().map_err(|_| ManifestError::InvalidValue {
                            key: format!("{}.{}", section, HLOD_ACTOR_GUID_KEY),
                            value: value.to_string(),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                workload.push(actors);
            }
            workloads.push(workload);
        }

        if worlds.is_empty() && builder_count > 0 {
            worlds.push(String::new());
        }
        Ok(Self {
            engine_version,
            worlds,
            workloads,
        })
    }

    /// Writes the manifest to `path`, creating parent folders.
    pub fn write(&self, path: &Path) -> Result<(), ManifestError> {
        let io_error = |source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        fs::write(path, self.to_ini()).map_err(io_error)?;
        log::info!(
            "[HLODBuilder] Wrote manifest for {} builders to '{}'",
            self.builder_count(),
            path.display()
        );
        Ok(())
    }

    /// Reads the manifest at `path`.
    pub fn read(path: &Path) -> Result<Self, ManifestError> {
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Fails unless the manifest was produced by `running_version`.
    pub fn check_engine_version(&self, running_version: &str) -> Result<(), ManifestError> {
        if self.engine_version == running_version {
            return Ok(());
        }
        log::error!(
            "[HLODBuilder] Manifest was written by version '{}', running version is '{}'",
            self.engine_version,
            running_version
        );
        Err(ManifestError::EngineVersionMismatch {
            found: self.engine_version.clone(),
            expected: running_version.to_string(),
        })
    }

    /// The workload assigned to `builder_index`.
    pub fn workload(&self, builder_index: usize) -> Result<&HlodWorkload, ManifestError> {
        self.workloads
            .get(builder_index)
            .ok_or(ManifestError::BuilderOutOfRange {
                index: builder_index,
                count: self.builder_count(),
            })
    }
}

impl fmt::Display for BuildManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}]", GENERAL_SECTION)?;
        writeln!(f, "{}={}", BUILDER_COUNT_KEY, self.builder_count())?;
        writeln!(f, "{}={}", ENGINE_VERSION_KEY, self.engine_version)?;
        for world in &self.worlds {
            writeln!(f, "+{}={}", WORLD_KEY, world)?;
        }

        for (builder, workload) in self.workloads.iter().enumerate() {
            for (world_index, actors) in workload.iter().enumerate() {
                let world = self.worlds.get(world_index).map(String::as_str).unwrap_or("");
                writeln!(f)?;
                writeln!(f, "[{}]", builder_section(builder, world_index, world))?;
                for guid in actors {
                    writeln!(f, "+{}={}", HLOD_ACTOR_GUID_KEY, guid)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guid(id: u128) -> ActorGuid {
        ActorGuid::from_u128(id)
    }

    #[test]
    fn test_to_ini_layout() {
        let manifest = BuildManifest::new(
            "5.4.0",
            vec!["Main".to_string()],
            vec![vec![vec![guid(1), guid(2)]], vec![vec![]]],
        );

        let text = manifest.to_ini();

        assert_eq!(
            text,
            "[General]\n\
             BuilderCount=2\n\
             EngineVersion=5.4.0\n\
             +World=Main\n\
             \n\
             [HLODBuilder0]\n\
             +HLODActorGuid=00000000000000000000000000000001\n\
             +HLODActorGuid=00000000000000000000000000000002\n\
             \n\
             [HLODBuilder1]\n"
        );
    }

    #[test]
    fn test_parse_keeps_repeated_key_order() {
        let text = "[General]\nBuilderCount=1\nEngineVersion=1.0\n\n[HLODBuilder0]\n\
                    +HLODActorGuid=00000000000000000000000000000003\n\
                    +HLODActorGuid=00000000000000000000000000000001\n";

        let manifest = BuildManifest::parse(text).unwrap();

        assert_eq!(manifest.workload(0).unwrap(), &vec![vec![guid(3), guid(1)]]);
        assert_eq!(manifest.worlds, vec![String::new()]);
    }

    #[test]
    fn test_extra_worlds_use_suffixed_sections() {
        let manifest = BuildManifest::new(
            "1.0",
            vec!["Main".to_string(), "Standalone".to_string()],
            vec![vec![vec![guid(1)], vec![guid(2)]]],
        );

        let text = manifest.to_ini();
        assert!(text.contains("[HLODBuilder0.Standalone]\n+HLODActorGuid=00000000000000000000000000000002"));

        let back = BuildManifest::parse(&text).unwrap();
        assert_eq!(back, manifest);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            BuildManifest::parse("BuilderCount=1"),
            Err(ManifestError::Syntax { line: 1, .. })
        ));
        assert!(matches!(
            BuildManifest::parse("[General]\nEngineVersion=1.0"),
            Err(ManifestError::MissingKey { key: "BuilderCount", .. })
        ));
        assert!(matches!(
            BuildManifest::parse("[General]\nBuilderCount=two\nEngineVersion=1.0"),
            Err(ManifestError::InvalidValue { .. })
        ));
        assert!(matches!(
            BuildManifest::parse(
                "[General]\nBuilderCount=1\nEngineVersion=1.0\n[HLODBuilder0]\n+HLODActorGuid=xyz"
            ),
            Err(ManifestError::InvalidValue { .. })
        ));
        assert!(matches!(
            BuildManifest::parse("[General\nBuilderCount=1"),
            Err(ManifestError::Syntax { .. })
        ));
    }

    #[test]
    fn test_engine_version_and_builder_range() {
        let manifest = BuildManifest::new("0.0.0", vec![], vec![vec![vec![]]]);

        assert!(manifest.check_engine_version("0.0.0").is_ok());
        assert!(matches!(
            manifest.check_engine_version("5.4.0"),
            Err(ManifestError::EngineVersionMismatch { .. })
        ));
        assert!(matches!(
            manifest.workload(1),
            Err(ManifestError::BuilderOutOfRange { index: 1, count: 1 })
        ));
    }
}
