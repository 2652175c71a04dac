//! Topology Graph
//!
//! [`TopologyGraph`] is the raw state a builder accumulates. Once the
//! resolver accepts it, it is frozen into a [`ValidatedTopology`], the only
//! form the renderer will take.

use indexmap::IndexMap;

use super::node::ResourceNode;
use super::parameter::{Mapping, Parameter};

/// Parameters, mappings and nodes of a topology, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct TopologyGraph {
    pub(crate) description: Option<String>,
    pub(crate) parameters: IndexMap<String, Parameter>,
    pub(crate) mappings: IndexMap<String, Mapping>,
    pub(crate) nodes: IndexMap<String, ResourceNode>,
}

impl TopologyGraph {
    /// Template description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Declared parameters, in declaration order.
    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.values()
    }

    /// Declared mappings, in declaration order.
    pub fn mappings(&self) -> impl Iterator<Item = &Mapping> {
        self.mappings.values()
    }

    /// Nodes, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.values()
    }

    /// Get a parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    /// Get a mapping by name.
    pub fn mapping(&self, name: &str) -> Option<&Mapping> {
        self.mappings.get(name)
    }

    /// Get a node by logical name.
    pub fn node(&self, name: &str) -> Option<&ResourceNode> {
        self.nodes.get(name)
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if `name` is taken by a parameter or a node.
    pub(crate) fn is_name_taken(&self, name: &str) -> bool {
        self.parameters.contains_key(name) || self.nodes.contains_key(name)
    }
}

/// A topology whose every reference resolves and which has no cycles.
///
/// Only [`TopologyBuilder::finalize`](super::TopologyBuilder::finalize)
/// creates one. It cannot be modified.
#[derive(Debug, Clone)]
pub struct ValidatedTopology {
    graph: TopologyGraph,
    provisioning_order: Vec<usize>,
    unused_parameters: Vec<String>,
}

impl ValidatedTopology {
    pub(crate) fn new(
        graph: TopologyGraph,
        provisioning_order: Vec<usize>,
        unused_parameters: Vec<String>,
    ) -> Self {
        Self {
            graph,
            provisioning_order,
            unused_parameters,
        }
    }

    /// The underlying graph.
    pub fn graph(&self) -> &TopologyGraph {
        &self.graph
    }

    /// Template description.
    pub fn description(&self) -> Option<&str> {
        self.graph.description()
    }

    /// Declared parameters, in declaration order.
    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.graph.parameters()
    }

    /// Declared mappings, in declaration order.
    pub fn mappings(&self) -> impl Iterator<Item = &Mapping> {
        self.graph.mappings()
    }

    /// Nodes, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &ResourceNode> {
        self.graph.nodes()
    }

    /// Get a node by logical name.
    pub fn node(&self, name: &str) -> Option<&ResourceNode> {
        self.graph.node(name)
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Nodes ordered so that every node comes after everything it references
    /// or is hinted to follow. Ties keep insertion order.
    pub fn provisioning_order(&self) -> impl Iterator<Item = &ResourceNode> {
        self.provisioning_order
            .iter()
            .filter_map(|&index| self.graph.nodes.get_index(index).map(|(_, node)| node))
    }

    /// Parameters that no node references.
    pub fn unused_parameters(&self) -> &[String] {
        &self.unused_parameters
    }
}
