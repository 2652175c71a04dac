//! CloudFormation Adapter
//!
//! Renders a topology in the CloudFormation template layout:
//!
//! ```text
//! AWSTemplateFormatVersion: "2010-09-09"
//! Description: ...
//! Parameters:  { <name>: { Type, Default, Description } }
//! Mappings:    { <name>: { <key>: { <key>: value } } }
//! Resources:   { <name>: { Type, DependsOn, Properties } }
//! ```
//!
//! Node attributes become `Properties`. Intrinsics use the long form
//! (`{"Ref": ..}`, `{"Fn::GetAtt": [..]}`), which is valid in every
//! encoding. The adapter also checks what CloudFormation itself would reject
//! early: missing required properties, and `Fn::GetAtt` on an attribute the
//! target type does not expose.

use serde_json::{json, Map, Value as JsonValue};

use super::document::Encoding;
use super::{ParsedNode, ParsedTemplate, RenderedTemplate, ReverseAdapter, TemplateAdapter};
use crate::error::{BoxError, RenderError};
use crate::graph::{
    Lookup, Mapping, Parameter, PseudoParameter, ResourceKind, ResourceNode, ValidatedTopology,
    Value,
};

const FORMAT_VERSION: &str = "2010-09-09";

/// Renders CloudFormation templates as JSON, YAML or MessagePack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloudFormationAdapter {
    encoding: Encoding,
}

impl CloudFormationAdapter {
    /// Create an adapter producing `encoding`.
    pub fn new(encoding: Encoding) -> Self {
        Self { encoding }
    }

    /// CloudFormation type of a resource kind.
    pub fn resource_type(kind: ResourceKind) -> &'static str {
        match kind {
            ResourceKind::Network => "AWS::EC2::VPC",
            ResourceKind::Subnet => "AWS::EC2::Subnet",
            ResourceKind::RouteTable => "AWS::EC2::RouteTable",
            ResourceKind::Route => "AWS::EC2::Route",
            ResourceKind::Gateway => "AWS::EC2::InternetGateway",
            ResourceKind::GatewayAttachment => "AWS::EC2::VPCGatewayAttachment",
            ResourceKind::RouteTableAssociation => "AWS::EC2::SubnetRouteTableAssociation",
            ResourceKind::ElasticIp => "AWS::EC2::EIP",
            ResourceKind::NatGateway => "AWS::EC2::NatGateway",
            ResourceKind::SecurityGroup => "AWS::EC2::SecurityGroup",
            ResourceKind::Role => "AWS::IAM::Role",
            ResourceKind::Policy => "AWS::IAM::Policy",
            ResourceKind::InstanceProfile => "AWS::IAM::InstanceProfile",
            ResourceKind::LaunchTemplate => "AWS::EC2::LaunchTemplate",
            ResourceKind::ScalingGroup => "AWS::AutoScaling::AutoScalingGroup",
            ResourceKind::LoadBalancer => "AWS::ElasticLoadBalancingV2::LoadBalancer",
            ResourceKind::TargetGroup => "AWS::ElasticLoadBalancingV2::TargetGroup",
            ResourceKind::Listener => "AWS::ElasticLoadBalancingV2::Listener",
            ResourceKind::AlarmTopic => "AWS::SNS::Topic",
            ResourceKind::Alarm => "AWS::CloudWatch::Alarm",
            ResourceKind::Storage => "AWS::S3::Bucket",
        }
    }

    /// Resource kind of a CloudFormation type.
    pub fn kind_for_type(resource_type: &str) -> Option<ResourceKind> {
        ResourceKind::ALL
            .iter()
            .copied()
            .find(|kind| Self::resource_type(*kind) == resource_type)
    }

    /// Properties CloudFormation refuses to create a resource without.
    fn required_attributes(kind: ResourceKind) -> &'static [&'static str] {
        match kind {
            ResourceKind::Subnet | ResourceKind::RouteTable | ResourceKind::GatewayAttachment => {
                &["VpcId"]
            }
            ResourceKind::Route => &["RouteTableId"],
            ResourceKind::RouteTableAssociation => &["RouteTableId", "SubnetId"],
            ResourceKind::NatGateway => &["SubnetId"],
            ResourceKind::SecurityGroup => &["GroupDescription"],
            ResourceKind::Role => &["AssumeRolePolicyDocument"],
            ResourceKind::Policy => &["PolicyDocument", "PolicyName"],
            ResourceKind::InstanceProfile => &["Roles"],
            ResourceKind::LaunchTemplate => &["LaunchTemplateData"],
            ResourceKind::ScalingGroup => &["MaxSize", "MinSize"],
            ResourceKind::Listener => &["DefaultActions", "LoadBalancerArn"],
            ResourceKind::Alarm => &["ComparisonOperator", "EvaluationPeriods"],
            _ => &[],
        }
    }

    /// Attributes `Fn::GetAtt` may read from a resource of this kind.
    fn readable_attributes(kind: ResourceKind) -> &'static [&'static str] {
        match kind {
            ResourceKind::Network => &["CidrBlock", "DefaultNetworkAcl", "DefaultSecurityGroup", "VpcId"],
            ResourceKind::Subnet => &["AvailabilityZone", "CidrBlock", "SubnetId", "VpcId"],
            ResourceKind::ElasticIp => &["AllocationId", "PublicIp"],
            ResourceKind::NatGateway => &["NatGatewayId"],
            ResourceKind::SecurityGroup => &["GroupId", "VpcId"],
            ResourceKind::Role => &["Arn", "RoleId"],
            ResourceKind::InstanceProfile => &["Arn"],
            ResourceKind::LaunchTemplate => {
                &["DefaultVersionNumber", "LatestVersionNumber", "LaunchTemplateId"]
            }
            ResourceKind::LoadBalancer => &[
                "CanonicalHostedZoneID",
                "DNSName",
                "LoadBalancerFullName",
                "LoadBalancerName",
                "SecurityGroups",
            ],
            ResourceKind::TargetGroup => {
                &["LoadBalancerArns", "TargetGroupFullName", "TargetGroupName"]
            }
            ResourceKind::Listener => &["ListenerArn"],
            ResourceKind::AlarmTopic => &["TopicArn", "TopicName"],
            ResourceKind::Alarm => &["Arn"],
            ResourceKind::Storage => &["Arn", "DomainName", "RegionalDomainName", "WebsiteURL"],
            ResourceKind::Gateway => &["InternetGatewayId"],
            ResourceKind::RouteTable => &["RouteTableId"],
            ResourceKind::Route => &["CidrBlock"],
            ResourceKind::RouteTableAssociation | ResourceKind::Policy => &["Id"],
            // Only readable through `Ref`.
            ResourceKind::GatewayAttachment | ResourceKind::ScalingGroup => &[],
        }
    }

    fn pseudo_name(pseudo: PseudoParameter) -> &'static str {
        match pseudo {
            PseudoParameter::Region => "AWS::Region",
            PseudoParameter::AccountId => "AWS::AccountId",
            PseudoParameter::StackName => "AWS::StackName",
            PseudoParameter::Partition => "AWS::Partition",
            PseudoParameter::NoValue => "AWS::NoValue",
        }
    }

    fn to_json(value: &Value) -> JsonValue {
        match value {
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Integer(n) => JsonValue::from(*n),
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::List(items) => JsonValue::Array(items.iter().map(Self::to_json).collect()),
            Value::Map(entries) => JsonValue::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::to_json(v)))
                    .collect(),
            ),
            Value::Ref(target) => json!({ "Ref": target }),
            Value::GetAtt { node, attribute } => json!({ "Fn::GetAtt": [node, attribute] }),
            Value::Join { separator, parts } => {
                let parts: Vec<JsonValue> = parts.iter().map(Self::to_json).collect();
                json!({ "Fn::Join": [separator, parts] })
            }
            Value::FindInMap {
                map,
                top_key,
                second_key,
            } => json!({
                "Fn::FindInMap": [map, Self::to_json(top_key), Self::to_json(second_key)]
            }),
            Value::Pseudo(pseudo) => json!({ "Ref": Self::pseudo_name(*pseudo) }),
        }
    }

    fn check_required(node: &ResourceNode) -> Result<(), RenderError> {
        let missing = Self::required_attributes(node.kind())
            .iter()
            .find(|attribute| node.attribute(attribute).is_none());

        match missing {
            Some(attribute) => Err(RenderError::MissingAttribute {
                node: node.name().to_string(),
                kind: node.kind(),
                attribute: attribute.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn check_reads(node: &ResourceNode, topology: &ValidatedTopology) -> Result<(), RenderError> {
        for (_, reference) in node.references() {
            let Lookup::Attribute(attribute) = reference.lookup else {
                continue;
            };
            let Some(target) = topology.node(reference.target) else {
                continue;
            };
            if !Self::readable_attributes(target.kind()).contains(&attribute) {
                return Err(RenderError::UnsupportedAttribute {
                    node: node.name().to_string(),
                    kind: target.kind(),
                    attribute: attribute.to_string(),
                });
            }
        }
        Ok(())
    }

    fn decode(&self, bytes: &[u8]) -> Result<JsonValue, RenderError> {
        let decoded: Result<JsonValue, BoxError> = match self.encoding {
            Encoding::Json => serde_json::from_slice(bytes).map_err(Into::into),
            Encoding::Yaml => serde_yaml::from_slice(bytes).map_err(Into::into),
            Encoding::MessagePack => rmp_serde::from_slice(bytes).map_err(Into::into),
        };
        decoded.map_err(RenderError::Decode)
    }
}

impl Default for CloudFormationAdapter {
    fn default() -> Self {
        Self::new(Encoding::Yaml)
    }
}

impl TemplateAdapter for CloudFormationAdapter {
    fn encoding(&self) -> Encoding {
        self.encoding
    }

    fn render_parameter(&self, parameter: &Parameter) -> Result<JsonValue, RenderError> {
        let mut block = Map::new();
        block.insert("Type".into(), parameter.param_type().as_str().into());
        if let Some(default) = parameter.default() {
            block.insert("Default".into(), default.into());
        }
        if let Some(description) = parameter.description() {
            block.insert("Description".into(), description.into());
        }
        Ok(JsonValue::Object(block))
    }

    fn render_mapping(&self, mapping: &Mapping) -> Result<JsonValue, RenderError> {
        let rows = mapping
            .entries()
            .iter()
            .map(|(top, row)| {
                let cells = row
                    .iter()
                    .map(|(second, value)| (second.clone(), JsonValue::String(value.clone())))
                    .collect();
                (top.clone(), JsonValue::Object(cells))
            })
            .collect();
        Ok(JsonValue::Object(rows))
    }

    fn render_node(
        &self,
        node: &ResourceNode,
        topology: &ValidatedTopology,
    ) -> Result<JsonValue, RenderError> {
        Self::check_required(node)?;
        Self::check_reads(node, topology)?;

        let mut block = Map::new();
        block.insert("Type".into(), Self::resource_type(node.kind()).into());
        if !node.attributes().is_empty() {
            let properties = node
                .attributes()
                .iter()
                .map(|(key, value)| (key.clone(), Self::to_json(value)))
                .collect();
            block.insert("Properties".into(), JsonValue::Object(properties));
        }
        Ok(JsonValue::Object(block))
    }

    fn render_ordering_hint(
        &self,
        node: &ResourceNode,
        after: &str,
        block: &mut JsonValue,
    ) -> Result<(), RenderError> {
        let Some(fields) = block.as_object_mut() else {
            return Err(RenderError::Malformed(format!(
                "resource block for `{}` is not an object",
                node.name()
            )));
        };

        if let Some(JsonValue::Array(depends_on)) = fields.get_mut("DependsOn") {
            depends_on.push(after.into());
            return Ok(());
        }

        // DependsOn goes right after Type.
        let mut reordered = Map::new();
        for (key, value) in std::mem::take(fields) {
            let is_type = key == "Type";
            reordered.insert(key, value);
            if is_type {
                reordered.insert("DependsOn".into(), json!([after]));
            }
        }
        *fields = reordered;
        Ok(())
    }

    fn encode(&self, template: &RenderedTemplate) -> Result<Vec<u8>, RenderError> {
        let mut document = Map::new();
        document.insert("AWSTemplateFormatVersion".into(), FORMAT_VERSION.into());
        if let Some(description) = &template.description {
            document.insert("Description".into(), description.as_str().into());
        }
        if !template.parameters.is_empty() {
            let parameters = template.parameters.clone().into_iter().collect();
            document.insert("Parameters".into(), JsonValue::Object(parameters));
        }
        if !template.mappings.is_empty() {
            let mappings = template.mappings.clone().into_iter().collect();
            document.insert("Mappings".into(), JsonValue::Object(mappings));
        }
        let resources = template.resources.clone().into_iter().collect();
        document.insert("Resources".into(), JsonValue::Object(resources));

        let document = JsonValue::Object(document);
        let encoded: Result<Vec<u8>, BoxError> = match self.encoding {
            Encoding::Json => serde_json::to_vec_pretty(&document).map_err(Into::into),
            Encoding::Yaml => serde_yaml::to_string(&document)
                .map(String::into_bytes)
                .map_err(Into::into),
            Encoding::MessagePack => rmp_serde::to_vec_named(&document).map_err(Into::into),
        };
        encoded.map_err(RenderError::Encode)
    }
}

impl ReverseAdapter for CloudFormationAdapter {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedTemplate, RenderError> {
        let document = self.decode(bytes)?;

        let description = document
            .get("Description")
            .and_then(JsonValue::as_str)
            .map(str::to_string);

        let parameters = document
            .get("Parameters")
            .and_then(JsonValue::as_object)
            .map(|params| params.keys().cloned().collect())
            .unwrap_or_default();

        let resources = document
            .get("Resources")
            .and_then(JsonValue::as_object)
            .ok_or_else(|| RenderError::Malformed("document has no Resources section".into()))?;

        let mut nodes = Vec::with_capacity(resources.len());
        for (name, block) in resources {
            let resource_type = block
                .get("Type")
                .and_then(JsonValue::as_str)
                .ok_or_else(|| RenderError::Malformed(format!("resource `{name}` has no Type")))?;
            let kind = Self::kind_for_type(resource_type).ok_or_else(|| {
                RenderError::Malformed(format!("resource `{name}` has unknown type `{resource_type}`"))
            })?;

            let attribute_keys = block
                .get("Properties")
                .and_then(JsonValue::as_object)
                .map(|props| props.keys().cloned().collect())
                .unwrap_or_default();

            let ordering_hints = match block.get("DependsOn") {
                Some(JsonValue::String(single)) => vec![single.clone()],
                Some(JsonValue::Array(many)) => many
                    .iter()
                    .filter_map(JsonValue::as_str)
                    .map(str::to_string)
                    .collect(),
                _ => Vec::new(),
            };

            nodes.push(ParsedNode {
                name: name.clone(),
                kind,
                attribute_keys,
                ordering_hints,
            });
        }

        Ok(ParsedTemplate {
            description,
            parameters,
            nodes,
        })
    }
}
