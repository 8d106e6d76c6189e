//! Node arena with per-variable unique tables.
//!
//! Nodes live in a plain `Vec<Node>` and are addressed by index. Hash consing
//! goes through one subtable per variable, keyed by the `(low, high)` children:
//!
//! ```text
//! subtables[v] : (low, high) -> index   for every node labelled with variable v
//! ```
//!
//! Index 0 is a sentinel and index 1 is the terminal, so every handle produced
//! by [`NodeTable::find_or_insert`] is at least 2. Slots released by
//! [`NodeTable::collect_garbage`] go to a free list and are reused first.

use std::collections::{HashMap, HashSet};

use crate::node::Node;
use crate::reference::Ref;

#[derive(Debug, Default, Clone)]
struct Subtable {
    nodes: HashMap<(Ref, Ref), u32>,
}

#[derive(Debug, Clone)]
pub struct NodeTable {
    nodes: Vec<Node>,
    subtables: Vec<Subtable>,
    free: Vec<u32>,
}

impl NodeTable {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut nodes = Vec::with_capacity(capacity.max(2));
        nodes.push(Node::TERMINAL); // sentinel
        nodes.push(Node::TERMINAL);
        Self {
            nodes,
            subtables: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn node(&self, index: u32) -> &Node {
        assert_ne!(index, 0, "Index is 0");
        &self.nodes[index as usize]
    }

    /// Number of live nodes, including the terminal.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1 - self.free.len()
    }

    /// Number of slots ever allocated, free ones included.
    pub fn num_slots(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of variables that have at least one subtable slot.
    pub fn num_subtables(&self) -> usize {
        self.subtables.len()
    }

    /// Return the index of the node `(variable, low, high)`, allocating it if absent.
    pub fn find_or_insert(&mut self, variable: u32, low: Ref, high: Ref) -> u32 {
        assert_ne!(variable, 0, "Variable index should not be zero");
        let slot = variable as usize;
        if slot >= self.subtables.len() {
            self.subtables.resize_with(slot + 1, Subtable::default);
        }
        if let Some(&index) = self.subtables[slot].nodes.get(&(low, high)) {
            return index;
        }
        let node = Node { variable, low, high };
        let index = match self.free.pop() {
            Some(index) => {
                self.nodes[index as usize] = node;
                index
            }
            None => {
                let index = self.nodes.len();
                assert!(index < i32::MAX as usize, "Node arena is full");
                self.nodes.push(node);
                index as u32
            }
        };
        self.subtables[slot].nodes.insert((low, high), index);
        index
    }

    /// Release every node whose index is not in `alive`. Returns the number of released nodes.
    ///
    /// Handles to released nodes become dangling.
    pub fn collect_garbage(&mut self, alive: &HashSet<u32>) -> usize {
        let mut released = Vec::new();
        for subtable in &mut self.subtables {
            subtable.nodes.retain(|_, index| {
                let keep = alive.contains(&*index);
                if !keep {
                    released.push(*index);
                }
                keep
            });
        }
        for &index in &released {
            self.nodes[index as usize] = Node::TERMINAL;
        }
        self.free.extend_from_slice(&released);
        released.len()
    }

    /// Number of nodes labelled with `variable`.
    pub fn level_size(&self, variable: u32) -> usize {
        self.subtables
            .get(variable as usize)
            .map_or(0, |subtable| subtable.nodes.len())
    }
}
