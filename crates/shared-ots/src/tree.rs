//! # Timestamp Tree
//!
//! Arena of proof nodes. Every node holds its current message, a map from
//! operation to child handle, and the attestations made at that node.
//!
//! ## Invariants
//!
//! - A node has at most one child per operation (map keyed by `Operation`).
//! - A child's message is always `op.apply(parent.msg)`.
//! - Stored edges are primitive operations (`Sha256d` is expanded on insert).
//!
//! Edges are `NodeId` handles, so two parents may share one child. All
//! traversals use explicit stacks; adversarial proof depth cannot overflow
//! the call stack.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::attestation::Attestation;
use crate::errors::TreeError;
use crate::ops::Operation;

/// Handle to a node inside a [`TimestampTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// A single proof node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimestampNode {
    msg: Vec<u8>,
    ops: BTreeMap<Operation, NodeId>,
    attestations: Vec<Attestation>,
}

impl TimestampNode {
    fn new(msg: Vec<u8>) -> Self {
        Self {
            msg,
            ops: BTreeMap::new(),
            attestations: Vec::new(),
        }
    }

    /// Current message.
    pub fn msg(&self) -> &[u8] {
        &self.msg
    }

    /// Outgoing edges.
    pub fn ops(&self) -> &BTreeMap<Operation, NodeId> {
        &self.ops
    }

    /// Attestations at this node.
    pub fn attestations(&self) -> &[Attestation] {
        &self.attestations
    }

    /// No outgoing edges.
    pub fn is_leaf(&self) -> bool {
        self.ops.is_empty()
    }

    /// No outgoing edges and no attestations.
    pub fn is_open_leaf(&self) -> bool {
        self.ops.is_empty() && self.attestations.is_empty()
    }
}

/// Arena-backed OpenTimestamps proof tree.
///
/// `NodeId`s are only meaningful for the tree that issued them; accessors
/// panic when handed a foreign handle.
#[derive(Clone, Debug, Default)]
pub struct TimestampTree {
    nodes: Vec<TimestampNode>,
}

impl TimestampTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tree holding a single root node.
    pub fn with_root(msg: Vec<u8>) -> (Self, NodeId) {
        let mut tree = Self::new();
        let root = tree.insert(msg);
        (tree, root)
    }

    /// Insert a detached node.
    pub fn insert(&mut self, msg: Vec<u8>) -> NodeId {
        self.nodes.push(TimestampNode::new(msg));
        NodeId(self.nodes.len() - 1)
    }

    /// Number of nodes in the arena (reachable or not).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Arena is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Borrow a node.
    pub fn node(&self, id: NodeId) -> &TimestampNode {
        &self.nodes[id.0]
    }

    /// Message at a node.
    pub fn msg(&self, id: NodeId) -> &[u8] {
        &self.nodes[id.0].msg
    }

    /// Child reached through `op`, if present.
    pub fn child(&self, id: NodeId, op: &Operation) -> Option<NodeId> {
        self.nodes[id.0].ops.get(op).copied()
    }

    /// Add an operation below `id`, returning the child.
    ///
    /// Returns the existing child when the edge is already present.
    /// `Sha256d` installs two `Sha256` edges and returns the lower node.
    pub fn add(&mut self, id: NodeId, op: Operation) -> NodeId {
        if op == Operation::Sha256d {
            let mid = self.add(id, Operation::Sha256);
            return self.add(mid, Operation::Sha256);
        }
        if let Some(child) = self.child(id, &op) {
            return child;
        }
        let msg = op.apply(&self.nodes[id.0].msg);
        let child = self.insert(msg);
        self.nodes[id.0].ops.insert(op, child);
        child
    }

    /// Point the `op` edge of `parent` at an existing node.
    ///
    /// Returns the previous target of the edge, if any.
    pub fn link(
        &mut self,
        parent: NodeId,
        op: Operation,
        child: NodeId,
    ) -> Result<Option<NodeId>, TreeError> {
        if !op.is_primitive() {
            return Err(TreeError::CompositeEdge(op.to_string()));
        }
        let expected = op.apply(self.msg(parent));
        if expected != self.msg(child) {
            return Err(TreeError::MessageMismatch {
                expected: hex::encode(expected),
                actual: hex::encode(self.msg(child)),
            });
        }
        Ok(self.nodes[parent.0].ops.insert(op, child))
    }

    /// Attach an attestation (duplicates are ignored).
    pub fn attest(&mut self, id: NodeId, attestation: Attestation) {
        let node = &mut self.nodes[id.0];
        if !node.attestations.contains(&attestation) {
            node.attestations.push(attestation);
        }
    }

    /// Drop every pending attestation at `id`. Returns how many were removed.
    pub fn clear_pending(&mut self, id: NodeId) -> usize {
        let node = &mut self.nodes[id.0];
        let before = node.attestations.len();
        node.attestations.retain(|a| !a.is_pending());
        before - node.attestations.len()
    }

    /// Follow a sequence of existing edges.
    pub fn descend(&self, from: NodeId, ops: &[Operation]) -> Option<NodeId> {
        ops.iter()
            .try_fold(from, |cursor, op| self.child(cursor, op))
    }

    /// Nodes without outgoing edges reachable from `root`, in edge order.
    pub fn leaves(&self, root: NodeId) -> Vec<NodeId> {
        self.collect(root, |node| node.is_leaf(), false)
    }

    /// Nodes carrying attestations reachable from `root`.
    ///
    /// Traversal does not continue below an attested node.
    pub fn attested_nodes(&self, root: NodeId) -> Vec<NodeId> {
        self.collect(root, |node| !node.attestations.is_empty(), true)
    }

    /// Every attestation reachable from `root` with the node carrying it.
    pub fn all_attestations(&self, root: NodeId) -> Vec<(NodeId, &Attestation)> {
        self.collect(root, |node| !node.attestations.is_empty(), false)
            .into_iter()
            .flat_map(|id| self.nodes[id.0].attestations.iter().map(move |a| (id, a)))
            .collect()
    }

    fn collect<F>(&self, root: NodeId, select: F, stop_at_match: bool) -> Vec<NodeId>
    where
        F: Fn(&TimestampNode) -> bool,
    {
        let mut found = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let node = &self.nodes[id.0];
            if select(node) {
                found.push(id);
                if stop_at_match {
                    continue;
                }
            }
            stack.extend(node.ops.values().rev().copied());
        }

        found
    }

    /// Import the sub-tree below `from` (in `source`) into this tree at `at`.
    ///
    /// Edges and attestations of `from` are merged into `at`; descendants are
    /// copied once each, so nodes shared inside `source` stay shared here.
    pub fn graft(
        &mut self,
        at: NodeId,
        source: &TimestampTree,
        from: NodeId,
    ) -> Result<(), TreeError> {
        if self.msg(at) != source.msg(from) {
            return Err(TreeError::MessageMismatch {
                expected: hex::encode(source.msg(from)),
                actual: hex::encode(self.msg(at)),
            });
        }

        let mut imported: HashMap<NodeId, NodeId> = HashMap::new();
        imported.insert(from, at);
        let mut stack = vec![from];

        while let Some(src) = stack.pop() {
            let dst = imported[&src];
            let node = source.node(src);

            for attestation in &node.attestations {
                self.attest(dst, attestation.clone());
            }

            for (op, &src_child) in &node.ops {
                let dst_child = match imported.get(&src_child) {
                    Some(&existing) => existing,
                    None => {
                        let created = self.insert(source.msg(src_child).to_vec());
                        imported.insert(src_child, created);
                        stack.push(src_child);
                        created
                    }
                };
                self.nodes[dst.0].ops.insert(op.clone(), dst_child);
            }
        }

        Ok(())
    }

    /// Human-readable rendering of the tree below `root`.
    ///
    /// Single-edge chains stay at one indentation level; branches are
    /// prefixed with ` -> ` and indented one level deeper.
    pub fn str_tree(&self, root: NodeId) -> String {
        enum Frame {
            Line(String),
            Node(NodeId, usize),
        }

        let mut out = String::new();
        let mut stack = vec![Frame::Node(root, 0)];

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Line(line) => {
                    out.push_str(&line);
                    out.push('\n');
                }
                Frame::Node(id, indent) => {
                    let node = &self.nodes[id.0];
                    let pad = "    ".repeat(indent);
                    for attestation in &node.attestations {
                        out.push_str(&format!("{pad}verify {attestation}\n"));
                    }
                    if node.ops.len() > 1 {
                        for (op, &child) in node.ops.iter().rev() {
                            stack.push(Frame::Node(child, indent + 1));
                            stack.push(Frame::Line(format!("{pad} -> {op}")));
                        }
                    } else if let Some((op, &child)) = node.ops.iter().next() {
                        stack.push(Frame::Node(child, indent));
                        stack.push(Frame::Line(format!("{pad}{op}")));
                    }
                }
            }
        }

        out
    }
}
