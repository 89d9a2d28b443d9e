//! The abstract reachability graph and the checker that builds it.

mod checker;
mod waitlist;

use std::fmt::{self, Write as _};

use argus_ir::{EdgeId, LocationId};
use serde::Serialize;

use crate::error::CheckError;
use crate::lattice::PartialOrder;

pub use checker::{ArgChecker, ArgResult};
pub use waitlist::Waitlist;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A node pairs a control location with an abstract state.
///
/// A node is in exactly one of three conditions: on the frontier (neither
/// expanded nor covered), covered by an earlier node, or expanded.
#[derive(Debug, Clone)]
pub struct ArgNode<S> {
    id: NodeId,
    loc: LocationId,
    state: S,
    parent: Option<(NodeId, EdgeId)>,
    succs: Vec<NodeId>,
    covered_by: Option<NodeId>,
    expanded: bool,
    target: bool,
    depth: usize,
}

impl<S> ArgNode<S> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn loc(&self) -> LocationId {
        self.loc
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Parent node and the edge taken from it; `None` for initial nodes.
    pub fn parent(&self) -> Option<(NodeId, EdgeId)> {
        self.parent
    }

    pub fn successors(&self) -> &[NodeId] {
        &self.succs
    }

    pub fn covered_by(&self) -> Option<NodeId> {
        self.covered_by
    }

    pub fn is_covered(&self) -> bool {
        self.covered_by.is_some()
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn is_target(&self) -> bool {
        self.target
    }

    pub fn is_initial(&self) -> bool {
        self.parent.is_none()
    }

    /// Number of edges from the initial node.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_frontier(&self) -> bool {
        !self.expanded && self.covered_by.is_none()
    }
}

/// Arena of nodes; node ids index creation order.
#[derive(Debug, Clone)]
pub struct Arg<S> {
    nodes: Vec<ArgNode<S>>,
    roots: Vec<NodeId>,
}

impl<S> Default for Arg<S> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            roots: Vec::new(),
        }
    }
}

impl<S> Arg<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&ArgNode<S>> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ArgNode<S>> {
        self.nodes.iter()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn nodes_at(&self, loc: LocationId) -> impl Iterator<Item = &ArgNode<S>> {
        self.nodes.iter().filter(move |n| n.loc == loc)
    }

    pub fn covered(&self) -> impl Iterator<Item = &ArgNode<S>> {
        self.nodes.iter().filter(|n| n.is_covered())
    }

    pub fn add_root(&mut self, loc: LocationId, state: S, target: bool) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ArgNode {
            id,
            loc,
            state,
            parent: None,
            succs: Vec::new(),
            covered_by: None,
            expanded: false,
            target,
            depth: 0,
        });
        self.roots.push(id);
        id
    }

    /// Adds a successor of `parent` reached along `edge`. Returns `None` if
    /// `parent` does not exist.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        edge: EdgeId,
        loc: LocationId,
        state: S,
        target: bool,
    ) -> Option<NodeId> {
        let id = NodeId(self.nodes.len());
        let depth = self.nodes.get(parent.0)?.depth + 1;
        self.nodes.push(ArgNode {
            id,
            loc,
            state,
            parent: Some((parent, edge)),
            succs: Vec::new(),
            covered_by: None,
            expanded: false,
            target,
            depth,
        });
        self.nodes[parent.0].succs.push(id);
        Some(id)
    }

    pub(crate) fn mark_expanded(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.expanded = true;
        }
    }

    /// Records that `node` is subsumed by `by`, re-checking the order first.
    pub fn cover<E, O>(&mut self, node: NodeId, by: NodeId, ord: &O) -> Result<(), CheckError<E>>
    where
        E: std::error::Error + 'static,
        O: PartialOrder<S>,
    {
        let violation = |context: String| CheckError::InternalInvariantViolation { node, context };
        let (covered, covering) = match (self.nodes.get(node.0), self.nodes.get(by.0)) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(violation(format!("cannot cover by unknown node {by}"))),
        };
        if node == by || covered.expanded || covering.loc != covered.loc {
            return Err(violation(format!("{by} is not a valid coverer")));
        }
        if !ord.is_leq(&covered.state, &covering.state) {
            return Err(violation(format!("state is not subsumed by {by}")));
        }
        self.nodes[node.0].covered_by = Some(by);
        Ok(())
    }

    /// Drops every covering edge and returns the released nodes in id order.
    pub fn invalidate_coverings(&mut self) -> Vec<NodeId> {
        let mut released = Vec::new();
        for node in &mut self.nodes {
            if node.covered_by.take().is_some() {
                released.push(node.id);
            }
        }
        released
    }

    /// Checks that every covered node is subsumed by its coverer. Returns the
    /// first offending node.
    pub fn check_soundness<O: PartialOrder<S>>(&self, ord: &O) -> Result<(), NodeId> {
        for node in &self.nodes {
            if let Some(by) = node.covered_by {
                let sound = self
                    .node(by)
                    .is_some_and(|b| b.loc == node.loc && ord.is_leq(&node.state, &b.state));
                if !sound {
                    return Err(node.id);
                }
            }
        }
        Ok(())
    }

    /// Nodes from an initial node down to `id`, inclusive.
    pub fn path_to(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut cur = self.node(id);
        while let Some(node) = cur {
            path.push(node.id);
            cur = node.parent.and_then(|(p, _)| self.node(p));
        }
        path.reverse();
        path
    }
}

impl<S: fmt::Display> Arg<S> {
    /// Graphviz rendering; covering edges are dashed.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph arg {\n");
        for node in &self.nodes {
            let label = format!("{} @ l{}\\n{}", node.id, node.loc, node.state).replace('"', "\\\"");
            let style = if node.target { ", color=red" } else { "" };
            let _ = writeln!(out, "  {} [label=\"{label}\"{style}];", node.id);
        }
        for node in &self.nodes {
            if let Some((parent, edge)) = node.parent {
                let _ = writeln!(out, "  {parent} -> {} [label=\"e{edge}\"];", node.id);
            }
            if let Some(by) = node.covered_by {
                let _ = writeln!(out, "  {} -> {by} [style=dashed];", node.id);
            }
        }
        out.push_str("}\n");
        out
    }
}
