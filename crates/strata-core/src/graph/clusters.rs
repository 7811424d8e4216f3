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

//! Connected components over a reference graph.
//!
//! Actors that reference each other, directly or transitively, have to be
//! loaded together. This module partitions a reference graph into such
//! clusters with a union-find over node indices. Reference direction is
//! irrelevant: an edge in either direction joins both ends.

use std::collections::HashMap;
use std::hash::Hash;

/// Disjoint sets over `0..len`, with path halving and union by size.
struct DisjointSets {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSets {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            size: vec![1; len],
        }
    }

    fn find(&mut self, mut node: usize) -> usize {
        while self.parent[node] != node {
            self.parent[node] = self.parent[self.parent[node]];
            node = self.parent[node];
        }
        node
    }

    fn union(&mut self, a: usize, b: usize) {
        let (mut a, mut b) = (self.find(a), self.find(b));
        if a == b {
            return;
        }
        if self.size[a] < self.size[b] {
            std::mem::swap(&mut a, &mut b);
        }
        self.parent[b] = a;
        self.size[a] += self.size[b];
    }
}

/// Partitions nodes into clusters of mutually reachable nodes.
///
/// # Arguments
///
/// * `nodes`: Every node with the nodes it references. References to nodes
///   that are not themselves listed are ignored. A node listed twice keeps
///   the union of its references.
///
/// # Returns
///
/// Every listed node exactly once. Each cluster is sorted, and clusters are
/// sorted by their first member, so the result does not depend on input
/// order.
pub fn generate_clusters<T, R>(nodes: impl IntoIterator<Item = (T, R)>) -> Vec<Vec<T>>
where
    T: Copy + Eq + Hash + Ord,
    R: IntoIterator<Item = T>,
{
    let mut index_of: HashMap<T, usize> = HashMap::new();
    let mut node_list: Vec<T> = Vec::new();
    let mut edges: Vec<(T, T)> = Vec::new();

    for (node, references) in nodes {
        index_of.entry(node).or_insert_with(|| {
            node_list.push(node);
            node_list.len() - 1
        });
        edges.extend(references.into_iter().map(|reference| (node, reference)));
    }

    let mut sets = DisjointSets::new(node_list.len());
    for (from, to) in edges {
        if let (Some(&a), Some(&b)) = (index_of.get(&from), index_of.get(&to)) {
            sets.union(a, b);
        }
    }

    let mut by_root: HashMap<usize, Vec<T>> = HashMap::new();
    for (index, node) in node_list.iter().enumerate() {
        let root = sets.find(index);
        by_root.entry(root).or_default().push(*node);
    }

    let mut clusters: Vec<Vec<T>> = by_root
        .into_values()
        .map(|mut cluster| {
            cluster.sort();
            cluster
        })
        .collect();
    clusters.sort();
    clusters
}
