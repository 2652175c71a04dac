//! Topology Builder
//!
//! The builder is the only way to put parameters, mappings and nodes into a
//! graph. Structural mistakes (a duplicate name, an unknown kind) fail at the
//! call that made them. References are only recorded here; they are checked
//! together in [`TopologyBuilder::finalize`], so nodes can be added in any
//! order.
//!
//! Parameters and nodes share one namespace: a node cannot take the name of a
//! parameter and vice versa, because a `Ref` to that name would be ambiguous.

use tracing::debug;

use super::node::{Attributes, ResourceKind, ResourceNode};
use super::parameter::{Mapping, Parameter};
use super::resolver::Resolver;
use super::topology::{TopologyGraph, ValidatedTopology};
use super::value::Value;
use crate::error::{ResolutionErrors, TopologyError};

/// Incrementally assembles a topology graph.
///
/// # Example
///
/// ```rust
/// use stackform_core::graph::{attributes, Parameter, ParameterType, ResourceKind, TopologyBuilder, Value};
///
/// let mut builder = TopologyBuilder::new();
/// builder.declare_parameter(Parameter::new("KeyName", ParameterType::String))?;
/// builder.add_node(
///     ResourceKind::Network,
///     "VPC",
///     attributes([("CidrBlock", "10.0.0.0/16".into())]),
/// )?;
/// builder.add_node(
///     ResourceKind::Subnet,
///     "Subnet1",
///     attributes([("VpcId", Value::reference("VPC")), ("CidrBlock", "10.0.1.0/24".into())]),
/// )?;
///
/// let topology = builder.finalize().expect("all references resolve");
/// assert_eq!(topology.node_count(), 2);
/// # Ok::<(), stackform_core::TopologyError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct TopologyBuilder {
    graph: TopologyGraph,
}

impl TopologyBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the template description.
    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.graph.description = Some(description.into());
        self
    }

    /// Declare a parameter.
    ///
    /// Fails with [`TopologyError::DuplicateParameter`] if the name is already
    /// taken; the first declaration stays registered.
    pub fn declare_parameter(&mut self, parameter: Parameter) -> Result<(), TopologyError> {
        if self.graph.is_name_taken(parameter.name()) {
            return Err(TopologyError::DuplicateParameter(parameter.name().to_string()));
        }
        parameter.validate()?;

        debug!(
            parameter = parameter.name(),
            ty = %parameter.param_type(),
            "declared parameter"
        );
        self.graph
            .parameters
            .insert(parameter.name().to_string(), parameter);
        Ok(())
    }

    /// Declare a mapping.
    pub fn declare_mapping(&mut self, mapping: Mapping) -> Result<(), TopologyError> {
        if self.graph.mappings.contains_key(mapping.name()) {
            return Err(TopologyError::DuplicateMapping(mapping.name().to_string()));
        }

        debug!(mapping = mapping.name(), rows = mapping.entries().len(), "declared mapping");
        self.graph
            .mappings
            .insert(mapping.name().to_string(), mapping);
        Ok(())
    }

    /// Add a node.
    ///
    /// Fails with [`TopologyError::DuplicateNode`] if the name is already
    /// taken; the existing node is left untouched. References inside
    /// `attributes` are not checked until [`finalize`](Self::finalize).
    pub fn add_node(
        &mut self,
        kind: ResourceKind,
        name: impl Into<String>,
        attributes: Attributes,
    ) -> Result<(), TopologyError> {
        let name = name.into();
        if self.graph.is_name_taken(&name) {
            return Err(TopologyError::DuplicateNode(name));
        }

        debug!(node = %name, ?kind, attributes = attributes.len(), "added node");
        let node = ResourceNode::new(kind, name.clone(), attributes);
        self.graph.nodes.insert(name, node);
        Ok(())
    }

    /// Add a node whose kind is given by name.
    ///
    /// Fails with [`TopologyError::UnknownKind`] if `kind` does not name a
    /// supported kind.
    pub fn add_node_of_type(
        &mut self,
        kind: &str,
        name: impl Into<String>,
        attributes: Attributes,
    ) -> Result<(), TopologyError> {
        let kind: ResourceKind = kind.parse()?;
        self.add_node(kind, name, attributes)
    }

    /// Add an attribute that the node does not have yet.
    pub fn add_attribute(
        &mut self,
        node: &str,
        key: impl Into<String>,
        value: Value,
    ) -> Result<(), TopologyError> {
        self.node_mut(node)?.add_attribute(key.into(), value)
    }

    /// Append a value to a list attribute, creating the list if needed.
    pub fn append_to_list(
        &mut self,
        node: &str,
        key: impl Into<String>,
        value: Value,
    ) -> Result<(), TopologyError> {
        self.node_mut(node)?.append_to_list(key.into(), value)
    }

    /// Require `node` to be provisioned after `after`, without a data
    /// reference between them.
    ///
    /// `after` is checked at finalize, like any reference.
    pub fn depends_on(&mut self, node: &str, after: impl Into<String>) -> Result<(), TopologyError> {
        let after = after.into();
        if node == after {
            return Err(TopologyError::SelfOrderingHint(after));
        }

        debug!(node, after = %after, "added ordering hint");
        self.node_mut(node)?.add_ordering_hint(after);
        Ok(())
    }

    /// Get a parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.graph.parameter(name)
    }

    /// Get a node by name.
    pub fn node(&self, name: &str) -> Option<&ResourceNode> {
        self.graph.node(name)
    }

    /// Number of nodes added so far.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// The graph built so far.
    pub fn graph(&self) -> &TopologyGraph {
        &self.graph
    }

    /// Resolve every reference and freeze the graph.
    ///
    /// All violations are returned together. The builder itself is left
    /// unchanged, so more nodes can be added and `finalize` called again.
    pub fn finalize(&self) -> Result<ValidatedTopology, ResolutionErrors> {
        let resolver = Resolver::new(&self.graph);
        let order = resolver.resolve()?;

        let unused = resolver.unused_parameters();
        for parameter in &unused {
            tracing::warn!(parameter = %parameter, "parameter is never referenced");
        }

        Ok(ValidatedTopology::new(self.graph.clone(), order, unused))
    }

    fn node_mut(&mut self, name: &str) -> Result<&mut ResourceNode, TopologyError> {
        self.graph
            .nodes
            .get_mut(name)
            .ok_or_else(|| TopologyError::UnknownNode(name.to_string()))
    }
}
