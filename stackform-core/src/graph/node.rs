//! Resource Nodes
//!
//! This module defines the node types that live in the topology graph.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::value::{Reference, Value};
use crate::error::TopologyError;

/// Ordered attribute map of a node.
pub type Attributes = IndexMap<String, Value>;

/// Build an [`Attributes`] map from `(name, value)` pairs.
///
/// ```rust
/// use stackform_core::graph::{attributes, Value};
///
/// let attrs = attributes([
///     ("VpcId", Value::reference("VPC")),
///     ("CidrBlock", "10.0.1.0/24".into()),
/// ]);
/// assert_eq!(attrs.len(), 2);
/// ```
pub fn attributes<K, I>(pairs: I) -> Attributes
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Value)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// The kind of infrastructure object a node describes.
///
/// The set is closed: adding a node of any other kind is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// An isolated virtual network.
    Network,
    /// An address range inside a network.
    Subnet,
    /// A set of routes attached to subnets.
    RouteTable,
    /// One route inside a route table.
    Route,
    /// An internet gateway.
    Gateway,
    /// Attaches a gateway to a network.
    GatewayAttachment,
    /// Associates a subnet with a route table.
    RouteTableAssociation,
    /// A static public address.
    ElasticIp,
    /// A gateway translating private addresses for outbound traffic.
    NatGateway,
    /// Stateful firewall rules.
    SecurityGroup,
    /// An identity that compute instances can assume.
    Role,
    /// A permissions document attached to roles.
    Policy,
    /// Wraps a role so instances can carry it.
    InstanceProfile,
    /// Template for launching compute instances.
    LaunchTemplate,
    /// Group of instances kept between a minimum and maximum size.
    ScalingGroup,
    /// Load balancer fronting the scaling group.
    LoadBalancer,
    /// Set of instances a load balancer routes to.
    TargetGroup,
    /// Port and protocol a load balancer accepts traffic on.
    Listener,
    /// Notification topic alarms publish to.
    AlarmTopic,
    /// A metric alarm.
    Alarm,
    /// Object storage bucket.
    Storage,
}

impl ResourceKind {
    /// All kinds, in declaration order.
    pub const ALL: [ResourceKind; 21] = [
        ResourceKind::Network,
        ResourceKind::Subnet,
        ResourceKind::RouteTable,
        ResourceKind::Route,
        ResourceKind::Gateway,
        ResourceKind::GatewayAttachment,
        ResourceKind::RouteTableAssociation,
        ResourceKind::ElasticIp,
        ResourceKind::NatGateway,
        ResourceKind::SecurityGroup,
        ResourceKind::Role,
        ResourceKind::Policy,
        ResourceKind::InstanceProfile,
        ResourceKind::LaunchTemplate,
        ResourceKind::ScalingGroup,
        ResourceKind::LoadBalancer,
        ResourceKind::TargetGroup,
        ResourceKind::Listener,
        ResourceKind::AlarmTopic,
        ResourceKind::Alarm,
        ResourceKind::Storage,
    ];

    /// Name of the kind, as accepted by [`FromStr`].
    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::Network => "Network",
            ResourceKind::Subnet => "Subnet",
            ResourceKind::RouteTable => "RouteTable",
            ResourceKind::Route => "Route",
            ResourceKind::Gateway => "Gateway",
            ResourceKind::GatewayAttachment => "GatewayAttachment",
            ResourceKind::RouteTableAssociation => "RouteTableAssociation",
            ResourceKind::ElasticIp => "ElasticIp",
            ResourceKind::NatGateway => "NatGateway",
            ResourceKind::SecurityGroup => "SecurityGroup",
            ResourceKind::Role => "Role",
            ResourceKind::Policy => "Policy",
            ResourceKind::InstanceProfile => "InstanceProfile",
            ResourceKind::LaunchTemplate => "LaunchTemplate",
            ResourceKind::ScalingGroup => "ScalingGroup",
            ResourceKind::LoadBalancer => "LoadBalancer",
            ResourceKind::TargetGroup => "TargetGroup",
            ResourceKind::Listener => "Listener",
            ResourceKind::AlarmTopic => "AlarmTopic",
            ResourceKind::Alarm => "Alarm",
            ResourceKind::Storage => "Storage",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResourceKind {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| TopologyError::UnknownKind(s.to_string()))
    }
}

/// A node in the topology graph.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceNode {
    /// Unique logical name within the graph.
    name: String,

    /// What kind of resource this is.
    kind: ResourceKind,

    /// Attribute values, in the order they were set.
    attributes: Attributes,

    /// Nodes that must be provisioned before this one without a data
    /// reference between them. Almost always empty or a single entry.
    ordering_hints: SmallVec<[String; 1]>,
}

impl ResourceNode {
    /// Create a new node.
    pub fn new(kind: ResourceKind, name: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            name: name.into(),
            kind,
            attributes,
            ordering_hints: SmallVec::new(),
        }
    }

    /// Get the node's logical name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the node's kind.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Get all attributes.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Get one attribute.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Get the ordering hints.
    pub fn ordering_hints(&self) -> &[String] {
        &self.ordering_hints
    }

    /// Every reference made by this node's attributes, paired with the
    /// attribute that makes it.
    pub fn references(&self) -> impl Iterator<Item = (&str, Reference<'_>)> {
        self.attributes.iter().flat_map(|(key, value)| {
            value
                .references()
                .into_iter()
                .map(move |reference| (key.as_str(), reference))
        })
    }

    /// Add an attribute that is not set yet.
    pub(crate) fn add_attribute(&mut self, key: String, value: Value) -> Result<(), TopologyError> {
        if self.attributes.contains_key(&key) {
            return Err(TopologyError::DuplicateAttribute {
                node: self.name.clone(),
                attribute: key,
            });
        }
        self.attributes.insert(key, value);
        Ok(())
    }

    /// Append to a list attribute, creating it if needed.
    pub(crate) fn append_to_list(&mut self, key: String, value: Value) -> Result<(), TopologyError> {
        match self.attributes.get_mut(&key) {
            Some(Value::List(items)) => {
                items.push(value);
                Ok(())
            }
            Some(_) => Err(TopologyError::NotAList {
                node: self.name.clone(),
                attribute: key,
            }),
            None => {
                self.attributes.insert(key, Value::List(vec![value]));
                Ok(())
            }
        }
    }

    /// Add an ordering hint. Duplicates are ignored.
    pub(crate) fn add_ordering_hint(&mut self, after: String) {
        if !self.ordering_hints.contains(&after) {
            self.ordering_hints.push(after);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_parse_back() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.name().parse::<ResourceKind>(), Ok(kind));
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert_eq!(
            "Mainframe".parse::<ResourceKind>(),
            Err(TopologyError::UnknownKind("Mainframe".into()))
        );
    }

    #[test]
    fn references_carry_their_attribute() {
        let node = ResourceNode::new(
            ResourceKind::Subnet,
            "Subnet1",
            attributes([
                ("VpcId", Value::reference("VPC")),
                ("CidrBlock", "10.0.1.0/24".into()),
            ]),
        );

        let refs: Vec<_> = node.references().map(|(key, r)| (key, r.target)).collect();
        assert_eq!(refs, vec![("VpcId", "VPC")]);
    }

    #[test]
    fn attribute_management() {
        let mut node = ResourceNode::new(ResourceKind::SecurityGroup, "Web", Attributes::new());

        node.add_attribute("GroupDescription".into(), "web".into())
            .unwrap();
        assert!(matches!(
            node.add_attribute("GroupDescription".into(), "again".into()),
            Err(TopologyError::DuplicateAttribute { .. })
        ));

        node.append_to_list("Ingress".into(), Value::reference("A"))
            .unwrap();
        node.append_to_list("Ingress".into(), Value::reference("B"))
            .unwrap();
        assert_eq!(
            node.attribute("Ingress"),
            Some(&Value::list([Value::reference("A"), Value::reference("B")]))
        );

        assert!(matches!(
            node.append_to_list("GroupDescription".into(), "x".into()),
            Err(TopologyError::NotAList { .. })
        ));
    }

    #[test]
    fn ordering_hints_are_deduplicated() {
        let mut node = ResourceNode::new(ResourceKind::Route, "DefaultRoute", Attributes::new());
        node.add_ordering_hint("Attachment".into());
        node.add_ordering_hint("Attachment".into());
        assert_eq!(node.ordering_hints(), ["Attachment".to_string()]);
    }
}
