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

//! Kahn's algorithm, used to prove the HLOD hierarchy is acyclic.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;

/// An error indicating that a cycle was detected in the graph.
///
/// Carries every node that could not be ordered: the members of the cycles
/// plus everything that depends on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError<T> {
    /// Nodes left unordered, in input order.
    pub unresolved: Vec<T>,
}

impl<T: fmt::Debug> fmt::Display for CycleError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycle detected, {} node(s) could not be ordered: {:?}",
            self.unresolved.len(),
            self.unresolved
        )
    }
}

impl<T: fmt::Debug> std::error::Error for CycleError<T> {}

/// Performs a topological sort on a generic directed graph.
///
/// # Arguments
///
/// * `nodes`: An iterator over the unique nodes in the graph.
/// * `edges`: The directed edges as `(from, to)` tuples. `from` is ordered
///   before `to`. Edges touching unknown nodes are ignored.
///
/// # Returns
///
/// * `Ok(Vec<T>)`: The nodes in a valid topological order. Among nodes that
///   become ready together, input order is preserved.
/// * `Err(CycleError)`: If the graph contains one or more cycles.
pub fn topological_sort<T>(
    nodes: impl IntoIterator<Item = T>,
    edges: impl IntoIterator<Item = (T, T)>,
) -> Result<Vec<T>, CycleError<T>>
where
    T: Copy + Eq + Hash,
{
    let node_list: Vec<T> = nodes.into_iter().collect();
    if node_list.is_empty() {
        return Ok(Vec::new());
    }

    let mut adjacency_list: HashMap<T, Vec<T>> = HashMap::new();
    let mut in_degree: HashMap<T, usize> = node_list.iter().map(|id| (*id, 0)).collect();

    // 1. Build adjacency list and in-degree counts from edges.
    for (from, to) in edges {
        if !in_degree.contains_key(&from) {
            continue;
        }
        if let Some(degree) = in_degree.get_mut(&to) {
            *degree += 1;
            adjacency_list.entry(from).or_default().push(to);
        }
    }

    // 2. Seed with every node nothing points to.
    let mut queue: VecDeque<T> = node_list
        .iter()
        .copied()
        .filter(|node| in_degree.get(node).copied().unwrap_or(0) == 0)
        .collect();

    // 3. Process the queue.
    let mut sorted_list = Vec::with_capacity(node_list.len());
    while let Some(node) = queue.pop_front() {
        sorted_list.push(node);
        if let Some(successors) = adjacency_list.get(&node) {
            for &successor in successors {
                if let Some(degree) = in_degree.get_mut(&successor) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(successor);
                    }
                }
            }
        }
    }

    // 4. Anything left still has an unsatisfied predecessor.
    if sorted_list.len() != node_list.len() {
        let unresolved = node_list
            .into_iter()
            .filter(|node| in_degree.get(node).copied().unwrap_or(0) > 0)
            .collect();
        Err(CycleError { unresolved })
    } else {
        Ok(sorted_list)
    }
}
