//! Integration Tests for Topology Building and Rendering
//!
//! These tests drive the public API end to end: build a graph, finalize it,
//! render it and read the document back.

use std::collections::HashSet;

use proptest::prelude::*;

use stackform_core::graph::{
    attributes, Attributes, Parameter, ParameterType, ResourceKind, TopologyBuilder, Value,
};
use stackform_core::render::{
    CloudFormationAdapter, Encoding, ParsedNode, Renderer, ReverseAdapter,
};
use stackform_core::{web_tier, ResolveError, TopologyError, WebTierConfig};

/// Test the scaling group that names a target group nobody created.
#[test]
fn missing_target_group_is_reported_at_finalize() {
    let mut builder = TopologyBuilder::new();
    builder
        .declare_parameter(Parameter::new("KeyName", ParameterType::String))
        .unwrap();
    builder
        .add_node(
            ResourceKind::Network,
            "VPC",
            attributes([("CidrBlock", "10.0.0.0/16".into())]),
        )
        .unwrap();
    builder
        .add_node(
            ResourceKind::Subnet,
            "Subnet1",
            attributes([
                ("VpcId", Value::reference("VPC")),
                ("CidrBlock", "10.0.1.0/24".into()),
            ]),
        )
        .unwrap();

    // Graph is sound so far.
    assert!(builder.finalize().is_ok());

    builder
        .add_node(
            ResourceKind::ScalingGroup,
            "ASG",
            attributes([(
                "TargetGroupARNs",
                Value::list([Value::reference("TargetGroupWeb")]),
            )]),
        )
        .unwrap();

    let errors = builder.finalize().unwrap_err();
    assert_eq!(
        errors.errors(),
        &[ResolveError::UnresolvedReference {
            node: "ASG".into(),
            target: "TargetGroupWeb".into(),
        }]
    );
}

/// Test that every broken reference is reported in one pass.
#[test]
fn all_violations_are_aggregated() {
    let mut builder = TopologyBuilder::new();
    builder
        .add_node(
            ResourceKind::Subnet,
            "Subnet1",
            attributes([("VpcId", Value::reference("VPC"))]),
        )
        .unwrap();
    builder
        .add_node(
            ResourceKind::Listener,
            "Listener",
            attributes([
                ("LoadBalancerArn", Value::reference("ApplicationElasticLB")),
                (
                    "DefaultActions",
                    Value::list([Value::map([(
                        "TargetGroupArn",
                        Value::reference("TargetGroupWeb"),
                    )])]),
                ),
            ]),
        )
        .unwrap();
    builder
        .add_node(
            ResourceKind::Role,
            "RoleA",
            attributes([("Peer", Value::get_att("RoleB", "Arn"))]),
        )
        .unwrap();
    builder
        .add_node(
            ResourceKind::Role,
            "RoleB",
            attributes([("Peer", Value::get_att("RoleA", "Arn"))]),
        )
        .unwrap();

    let errors = builder.finalize().unwrap_err();
    assert_eq!(errors.len(), 4);
    assert!(errors.contains(&ResolveError::UnresolvedReference {
        node: "Subnet1".into(),
        target: "VPC".into(),
    }));
    assert!(errors.contains(&ResolveError::UnresolvedReference {
        node: "Listener".into(),
        target: "TargetGroupWeb".into(),
    }));
    assert!(errors
        .errors()
        .iter()
        .any(|e| matches!(e, ResolveError::CyclicReference { .. })));
}

/// Test that builder-time mistakes fail at the call that made them.
#[test]
fn structural_errors_fail_fast() {
    let mut builder = TopologyBuilder::new();
    builder
        .declare_parameter(Parameter::new("KeyName", ParameterType::String))
        .unwrap();

    let err = builder
        .declare_parameter(Parameter::new("KeyName", ParameterType::Number))
        .unwrap_err();
    assert_eq!(err, TopologyError::DuplicateParameter("KeyName".into()));
    assert_eq!(
        builder.parameter("KeyName").map(|p| p.param_type()),
        Some(ParameterType::String)
    );

    let err = builder
        .add_node_of_type("Database", "Db", Attributes::new())
        .unwrap_err();
    assert_eq!(err, TopologyError::UnknownKind("Database".into()));
    assert_eq!(builder.node_count(), 0);
}

/// Test the ordering hint that keeps a route behind its gateway attachment.
#[test]
fn ordering_hint_renders_as_depends_on() {
    let mut builder = TopologyBuilder::new();
    builder
        .add_node(
            ResourceKind::Route,
            "DefaultPublicRoute",
            attributes([
                ("RouteTableId", Value::reference("PublicRouteTable")),
                ("GatewayId", Value::reference("InternetGateway")),
            ]),
        )
        .unwrap();
    builder
        .depends_on("DefaultPublicRoute", "InternetGatewayAttachment")
        .unwrap();
    builder
        .add_node(
            ResourceKind::RouteTable,
            "PublicRouteTable",
            attributes([("VpcId", Value::reference("VPC"))]),
        )
        .unwrap();
    builder
        .add_node(ResourceKind::Gateway, "InternetGateway", Attributes::new())
        .unwrap();
    builder
        .add_node(
            ResourceKind::GatewayAttachment,
            "InternetGatewayAttachment",
            attributes([
                ("VpcId", Value::reference("VPC")),
                ("InternetGatewayId", Value::reference("InternetGateway")),
            ]),
        )
        .unwrap();
    builder
        .add_node(ResourceKind::Network, "VPC", Attributes::new())
        .unwrap();

    let topology = builder.finalize().unwrap();
    let order: Vec<&str> = topology.provisioning_order().map(|n| n.name()).collect();
    assert_eq!(order.last(), Some(&"DefaultPublicRoute"));

    let document = Renderer::new(CloudFormationAdapter::new(Encoding::Json))
        .render(&topology)
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(document.bytes()).unwrap();
    assert_eq!(
        json["Resources"]["DefaultPublicRoute"]["DependsOn"],
        serde_json::json!(["InternetGatewayAttachment"])
    );
}

/// Test that the web tier reads back identically in every encoding.
#[test]
fn web_tier_round_trips_through_every_encoding() {
    let topology = web_tier(&WebTierConfig::default())
        .unwrap()
        .finalize()
        .unwrap();
    let expected: Vec<ParsedNode> = topology.nodes().map(ParsedNode::from_node).collect();

    for encoding in [Encoding::Json, Encoding::Yaml, Encoding::MessagePack] {
        let adapter = CloudFormationAdapter::new(encoding);
        let document = Renderer::new(adapter).render(&topology).unwrap();
        let parsed = adapter.parse(document.bytes()).unwrap();

        assert_eq!(parsed.nodes, expected, "{encoding:?}");
        assert_eq!(parsed.description.as_deref(), topology.description());
    }
}

/// Test that a rendered template lands on disk intact.
#[test]
fn rendered_template_persists_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("web-tier.yml");

    let document = stackform_core::render_web_tier(&WebTierConfig::default(), Encoding::Yaml)
        .unwrap();
    document.persist(&path).unwrap();

    let written = std::fs::read(&path).unwrap();
    assert_eq!(written, document.bytes());
    assert!(document
        .as_text()
        .unwrap()
        .starts_with("AWSTemplateFormatVersion:"));
}

/// Build `count` buckets where bucket `i` may reference a later bucket.
fn bucket_chain(links: &[Option<prop::sample::Index>]) -> TopologyBuilder {
    let count = links.len();
    let mut builder = TopologyBuilder::new();
    for (i, link) in links.iter().enumerate() {
        let mut attrs = attributes([("BucketName", Value::from(format!("bucket-{i}")))]);
        let later = count - i - 1;
        if let (Some(index), true) = (link, later > 0) {
            let target = i + 1 + index.index(later);
            attrs.insert("Replica".into(), Value::reference(format!("Bucket{target}")));
        }
        builder
            .add_node(ResourceKind::Storage, format!("Bucket{i}"), attrs)
            .unwrap();
    }
    builder
}

proptest! {
    /// One block per node, in insertion order, however references point.
    #[test]
    fn render_keeps_one_block_per_node_in_order(
        links in prop::collection::vec(prop::option::of(any::<prop::sample::Index>()), 1..24)
    ) {
        let topology = bucket_chain(&links).finalize().unwrap();
        let adapter = CloudFormationAdapter::new(Encoding::Json);
        let document = Renderer::new(adapter).render(&topology).unwrap();
        let parsed = adapter.parse(document.bytes()).unwrap();

        let names: Vec<String> = parsed.nodes.into_iter().map(|n| n.name).collect();
        let expected: Vec<String> = (0..links.len()).map(|i| format!("Bucket{i}")).collect();
        prop_assert_eq!(names, expected);
    }

    /// Every node is provisioned after the nodes it references.
    #[test]
    fn provisioning_order_respects_references(
        links in prop::collection::vec(prop::option::of(any::<prop::sample::Index>()), 1..24)
    ) {
        let topology = bucket_chain(&links).finalize().unwrap();
        let order: Vec<&str> = topology.provisioning_order().map(|n| n.name()).collect();
        prop_assert_eq!(order.len(), links.len());

        for node in topology.nodes() {
            let position = order.iter().position(|n| *n == node.name()).unwrap();
            for (_, reference) in node.references() {
                let target = order.iter().position(|n| *n == reference.target).unwrap();
                prop_assert!(target < position);
            }
        }
    }

    /// Duplicate names are rejected and the first node is kept.
    #[test]
    fn duplicate_nodes_keep_the_first(names in prop::collection::vec("[A-D][a-z]{0,2}", 1..16)) {
        let mut builder = TopologyBuilder::new();
        let mut seen = HashSet::new();

        for (i, name) in names.iter().enumerate() {
            let result = builder.add_node(
                ResourceKind::Storage,
                name.clone(),
                attributes([("Order", Value::from(i as i64))]),
            );
            if seen.insert(name.clone()) {
                prop_assert!(result.is_ok());
            } else {
                prop_assert_eq!(result, Err(TopologyError::DuplicateNode(name.clone())));
            }
        }

        prop_assert_eq!(builder.node_count(), seen.len());
        for name in &seen {
            let first = names.iter().position(|n| n == name).unwrap() as i64;
            prop_assert_eq!(
                builder.node(name).and_then(|n| n.attribute("Order")),
                Some(&Value::Integer(first))
            );
        }
    }
}
