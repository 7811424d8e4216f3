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

//! Hierarchical text dump of a prepared generator.

use super::container::ContainerCollectionInstanceDescriptor;
use super::generator::StreamingGenerator;
use super::view::ViewRef;
use std::collections::BTreeMap;
use std::fmt::{self, Write};
use strata_core::ContainerId;

/// Writes indented lines to an underlying writer.
pub struct HierarchicalLog<'o> {
    out: &'o mut dyn Write,
    depth: usize,
}

impl<'o> HierarchicalLog<'o> {
    /// Creates a log at depth zero.
    pub fn new(out: &'o mut dyn Write) -> Self {
        Self { out, depth: 0 }
    }

    /// Writes one line at the current depth.
    pub fn line(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        for _ in 0..self.depth {
            self.out.write_str("    ")?;
        }
        self.out.write_fmt(args)?;
        self.out.write_char('\n')
    }

    /// Writes a header line, then `body` one level deeper.
    pub fn section(
        &mut self,
        header: fmt::Arguments<'_>,
        body: impl FnOnce(&mut Self) -> fmt::Result,
    ) -> fmt::Result {
        self.line(header)?;
        self.depth += 1;
        let result = body(self);
        self.depth -= 1;
        result
    }
}

fn dump_view(log: &mut HierarchicalLog<'_>, view: ViewRef<'_, '_>) -> fmt::Result {
    let data_layers = view.data_layer_instance_names().to_vec();
    log.line(format_args!(
        "{} {} '{}' Spatial={} Grid={} DataLayers=[{}] HLODLayer={} HLODRelevant={}",
        view.guid(),
        view.native_class(),
        view.label(),
        view.is_spatially_loaded(),
        view.runtime_grid().unwrap_or("None"),
        data_layers.join(", "),
        view.hlod_layer().unwrap_or("None"),
        view.is_hlod_relevant()
    ))
}

fn dump_container(
    log: &mut HierarchicalLog<'_>,
    desc: &ContainerCollectionInstanceDescriptor<'_>,
) -> fmt::Result {
    log.section(
        format_args!("Container: {} ({})", desc.id(), desc.package()),
        |log| {
            let mut views: Vec<_> = desc.view_map().iter().collect();
            views.sort_by_key(|view| view.guid());
            log.section(format_args!("ActorDescs:"), |log| {
                views.into_iter().try_for_each(|view| dump_view(log, view))
            })?;

            log.section(format_args!("Clusters:"), |log| {
                for (index, cluster) in desc.clusters().iter().enumerate() {
                    log.section(
                        format_args!("[{:3}] Num={}", index, cluster.len()),
                        |log| {
                            cluster
                                .iter()
                                .try_for_each(|guid| log.line(format_args!("{}", guid)))
                        },
                    )?;
                }
                Ok(())
            })
        },
    )
}

fn dump_instance(
    log: &mut HierarchicalLog<'_>,
    containers: &BTreeMap<ContainerId, ContainerCollectionInstanceDescriptor<'_>>,
    desc: &ContainerCollectionInstanceDescriptor<'_>,
) -> fmt::Result {
    log.section(format_args!("ID: {}", desc.id()), |log| {
        match desc.parent_id() {
            Some(parent) => log.line(format_args!("ParentID: {}", parent))?,
            None => log.line(format_args!("ParentID: None"))?,
        }
        log.line(format_args!("Owner: {}", desc.owner_name()))?;
        log.line(format_args!("Bounds: {}", desc.bounds()))?;
        let translation = desc.translation();
        log.line(format_args!(
            "Translation: ({:.1}, {:.1}, {:.1})",
            translation.x, translation.y, translation.z
        ))?;
        log.line(format_args!("Container: {}", desc.package()))?;
        log.line(format_args!("HLODRelevant: {}", desc.is_hlod_relevant()))?;
        if let Some(bundle) = desc.content_bundle() {
            log.line(format_args!("ContentBundle: {}", bundle))?;
        }

        let children: Vec<_> = containers
            .values()
            .filter(|child| child.parent_id() == Some(desc.id()))
            .collect();
        if children.is_empty() {
            return Ok(());
        }
        log.section(format_args!("Children:"), |log| {
            children
                .into_iter()
                .try_for_each(|child| dump_instance(log, containers, child))
        })
    })
}

/// Writes the containers with their views and clusters, then the container
/// instance tree.
pub fn dump_state_log(
    out: &mut dyn Write,
    containers: &BTreeMap<ContainerId, ContainerCollectionInstanceDescriptor<'_>>,
) -> fmt::Result {
    let mut log = HierarchicalLog::new(out);
    log.section(format_args!("Containers:"), |log| {
        containers
            .values()
            .try_for_each(|desc| dump_container(log, desc))
    })?;
    log.section(format_args!("ContainerInstances:"), |log| {
        match containers.get(&ContainerId::main()) {
            Some(main) => dump_instance(log, containers, main),
            None => Ok(()),
        }
    })
}

impl StreamingGenerator<'_, '_> {
    /// Writes the state log of the prepared containers to `out`.
    pub fn dump_state_log(&self, out: &mut dyn Write) -> fmt::Result {
        dump_state_log(out, self.containers())
    }

    /// The state log of the prepared containers.
    pub fn state_log(&self) -> String {
        let mut log = String::new();
        // Writing to a String cannot fail.
        let _ = self.dump_state_log(&mut log);
        log
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_indent_their_body() {
        let mut out = String::new();
        let mut log = HierarchicalLog::new(&mut out);
        log.section(format_args!("Root:"), |log| {
            log.line(format_args!("a"))?;
            log.section(format_args!("Inner:"), |log| log.line(format_args!("b")))
        })
        .unwrap();
        log.line(format_args!("c")).unwrap();

        assert_eq!(out, "Root:\n    a\n    Inner:\n        b\nc\n");
    }
}
