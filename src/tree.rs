//! Assemble flat descriptors into a forest of view trees.
//!
//! Only records reachable from a root-level record end up in the forest.
//! A record whose parent id is not in the batch is an orphan; the orphan and
//! everything below it are left out, as are records caught in a parent cycle.
use crate::record::NodeDescriptor;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Default, Serialize)]
pub struct Forest {
    /// Root-level records in batch order, children attached.
    pub roots: Vec<NodeDescriptor>,
    /// Ids whose declared parent does not exist in the batch.
    pub orphans: Vec<i64>,
    /// Other ids unreachable from any root (under an orphan, or in a cycle).
    pub detached: Vec<i64>,
    /// Records dropped because an earlier record had the same id.
    pub duplicates: usize,
}

impl Forest {
    /// Number of records that will be visited by a traversal.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&NodeDescriptor> = self.roots.iter().collect();
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

/// Keep the first occurrence of each id, preserving order.
pub fn dedup_descriptors(descriptors: Vec<NodeDescriptor>) -> (Vec<NodeDescriptor>, usize) {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(descriptors.len());
    let mut dropped = 0;
    for descriptor in descriptors {
        if seen.contains(&descriptor) {
            tracing::debug!(id = descriptor.id, name = %descriptor.name, "duplicate id dropped");
            dropped += 1;
            continue;
        }
        seen.insert(descriptor.clone());
        kept.push(descriptor);
    }
    (kept, dropped)
}

/// Resolve parent references into a forest.
pub fn assemble_forest(descriptors: Vec<NodeDescriptor>) -> Forest {
    let (descriptors, duplicates) = dedup_descriptors(descriptors);
    let order: Vec<i64> = descriptors.iter().map(|node| node.id).collect();
    let known: HashSet<i64> = order.iter().copied().collect();

    let mut children_of: HashMap<i64, Vec<i64>> = HashMap::new();
    let mut root_ids = Vec::new();
    let mut orphans = Vec::new();
    for node in &descriptors {
        match node.parent_id {
            None => root_ids.push(node.id),
            Some(parent) if known.contains(&parent) => {
                children_of.entry(parent).or_default().push(node.id);
            }
            Some(parent) => {
                tracing::debug!(id = node.id, parent, "orphan record dropped");
                orphans.push(node.id);
            }
        }
    }

    // Breadth-first from the roots; every parent precedes its children.
    let mut reachable = Vec::new();
    let mut queue: VecDeque<i64> = root_ids.iter().copied().collect();
    while let Some(id) = queue.pop_front() {
        reachable.push(id);
        if let Some(children) = children_of.get(&id) {
            queue.extend(children.iter().copied());
        }
    }

    // Build bottom-up so each node is complete before it is moved into its parent.
    let mut pending: HashMap<i64, NodeDescriptor> = descriptors
        .into_iter()
        .map(|node| (node.id, node))
        .collect();
    let mut built: HashMap<i64, NodeDescriptor> = HashMap::new();
    for id in reachable.iter().rev() {
        let Some(mut node) = pending.remove(id) else {
            continue;
        };
        if let Some(children) = children_of.get(id) {
            node.children = children
                .iter()
                .filter_map(|child| built.remove(child))
                .collect();
        }
        built.insert(*id, node);
    }

    let roots: Vec<NodeDescriptor> = root_ids
        .iter()
        .filter_map(|id| built.remove(id))
        .collect();
    let orphan_set: HashSet<i64> = orphans.iter().copied().collect();
    let detached: Vec<i64> = order
        .into_iter()
        .filter(|id| pending.contains_key(id) && !orphan_set.contains(id))
        .collect();
    if !detached.is_empty() {
        tracing::debug!(count = detached.len(), "unreachable records dropped");
    }

    Forest {
        roots,
        orphans,
        detached,
        duplicates,
    }
}
