//! Web Tier Blueprint
//!
//! A ready-made topology for a single-tier web application:
//!
//! - a network with two public subnets and one private subnet, an internet
//!   gateway for the public side and a NAT gateway for the private side
//! - an auto-scaling group of web servers in the private subnet, behind an
//!   application load balancer in the public subnets
//! - a versioned storage bucket the instances may write to, granted through
//!   an instance role
//! - a CPU alarm that notifies an e-mail topic
//!
//! Every tunable lives in [`WebTierConfig`]. The blueprint is built through
//! the public [`TopologyBuilder`] API like any hand-written topology.

use tracing::info;

use crate::config::WebTierConfig;
use crate::error::TopologyError;
use crate::graph::{
    attributes, tags, Attributes, Mapping, Parameter, ParameterType, PseudoParameter,
    ResourceKind, TopologyBuilder, Value,
};
use crate::render::{CloudFormationAdapter, Document, Encoding, Renderer};

/// Build the web-tier topology described by `config`.
///
/// `config` is validated first, so settings assembled in code get the same
/// checks as settings loaded from YAML. The returned builder has not been
/// finalized, so callers may extend it before rendering.
pub fn web_tier(config: &WebTierConfig) -> crate::Result<TopologyBuilder> {
    config.validate()?;

    let mut builder = TopologyBuilder::new();
    builder.set_description(config.description.clone());

    declare_inputs(&mut builder, config)?;
    add_storage(&mut builder)?;
    add_identity(&mut builder)?;
    add_network(&mut builder)?;
    add_web_servers(&mut builder, config)?;
    add_monitoring(&mut builder, config)?;

    info!(nodes = builder.node_count(), "built web tier blueprint");
    Ok(builder)
}

/// Build, finalize and render the web tier in one step.
pub fn render_web_tier(config: &WebTierConfig, encoding: Encoding) -> crate::Result<Document> {
    let topology = web_tier(config)?.finalize()?;
    let renderer = Renderer::new(CloudFormationAdapter::new(encoding));
    Ok(renderer.render(&topology)?)
}

fn declare_inputs(builder: &mut TopologyBuilder, config: &WebTierConfig) -> Result<(), TopologyError> {
    let parameters = [
        Parameter::new("AlarmEmail", ParameterType::String)
            .with_default(config.alarm_email.clone())
            .with_description("Email address to notify if there are any operational issues"),
        Parameter::new("BucketName", ParameterType::String)
            .with_description("Name of the bucket the web servers write to"),
        Parameter::new("WebServerPort", ParameterType::Number)
            .with_default(config.web_server_port.to_string())
            .with_description("TCP/IP port of the web server"),
        Parameter::new("WebServerIP", ParameterType::String)
            .with_default("0.0.0.0/0")
            .with_description("Address range allowed to reach the web servers"),
        Parameter::new("CidrBlockRange", ParameterType::String)
            .with_default(config.vpc_cidr.clone())
            .with_description("Address range of the network"),
        Parameter::new("PublicSubnetCidrRange1", ParameterType::String)
            .with_default(config.public_subnet_1_cidr.clone())
            .with_description("Address range of the first public subnet"),
        Parameter::new("PublicSubnetCidrRange2", ParameterType::String)
            .with_default(config.public_subnet_2_cidr.clone())
            .with_description("Address range of the second public subnet"),
        Parameter::new("PrivateSubnetCidrRange", ParameterType::String)
            .with_default(config.private_subnet_cidr.clone())
            .with_description("Address range of the private subnet"),
        Parameter::new("KeyName", ParameterType::String)
            .with_description("Name of an existing key pair for SSH access"),
    ];
    for parameter in parameters {
        builder.declare_parameter(parameter)?;
    }

    let images = config
        .image_ids
        .iter()
        .fold(Mapping::new("RegionMap"), |mapping, (region, image)| {
            mapping.with_entry(region.clone(), "64", image.clone())
        });
    builder.declare_mapping(images)
}

fn add_storage(builder: &mut TopologyBuilder) -> Result<(), TopologyError> {
    let lifecycle_rule = Value::map([
        ("Id", "ArchiveOldObjects".into()),
        ("Prefix", "/".into()),
        ("Status", "Enabled".into()),
        ("ExpirationInDays", Value::Integer(3650)),
        (
            "Transitions",
            Value::list([Value::map([
                ("StorageClass", "STANDARD_IA".into()),
                ("TransitionInDays", Value::Integer(60)),
            ])]),
        ),
        ("NoncurrentVersionExpirationInDays", Value::Integer(365)),
        (
            "NoncurrentVersionTransitions",
            Value::list([
                Value::map([
                    ("StorageClass", "STANDARD_IA".into()),
                    ("TransitionInDays", Value::Integer(30)),
                ]),
                Value::map([
                    ("StorageClass", "GLACIER".into()),
                    ("TransitionInDays", Value::Integer(120)),
                ]),
            ]),
        ),
    ]);

    builder.add_node(
        ResourceKind::Storage,
        "S3Bucket",
        attributes([
            ("BucketName", Value::reference("BucketName")),
            ("AccessControl", "Private".into()),
            (
                "VersioningConfiguration",
                Value::map([("Status", "Enabled".into())]),
            ),
            (
                "LifecycleConfiguration",
                Value::map([("Rules", Value::list([lifecycle_rule]))]),
            ),
        ]),
    )
}

fn add_identity(builder: &mut TopologyBuilder) -> Result<(), TopologyError> {
    // The policy and profile are declared before the role they name.
    let object_arn = Value::join(
        "",
        [
            "arn:aws:s3:::".into(),
            Value::reference("S3Bucket"),
            "/*".into(),
        ],
    );
    builder.add_node(
        ResourceKind::Policy,
        "CFNRolePolicies",
        attributes([
            ("PolicyName", "CFNUsers".into()),
            ("Roles", Value::list([Value::reference("CFNRole")])),
            (
                "PolicyDocument",
                Value::map([
                    ("Version", "2012-10-17".into()),
                    (
                        "Statement",
                        Value::list([Value::map([
                            ("Effect", "Allow".into()),
                            ("Action", Value::list(["s3:PutObject".into()])),
                            ("Resource", object_arn),
                        ])]),
                    ),
                ]),
            ),
        ]),
    )?;

    builder.add_node(
        ResourceKind::InstanceProfile,
        "CFNInstanceProfile",
        attributes([("Roles", Value::list([Value::reference("CFNRole")]))]),
    )?;

    builder.add_node(
        ResourceKind::Role,
        "CFNRole",
        attributes([(
            "AssumeRolePolicyDocument",
            Value::map([
                ("Version", "2012-10-17".into()),
                (
                    "Statement",
                    Value::list([Value::map([
                        ("Effect", "Allow".into()),
                        (
                            "Principal",
                            Value::map([(
                                "Service",
                                Value::list(["ec2.amazonaws.com".into()]),
                            )]),
                        ),
                        ("Action", Value::list(["sts:AssumeRole".into()])),
                    ])]),
                ),
            ]),
        )]),
    )
}

fn subnet(cidr_parameter: &str, zone_suffix: &str, public: bool, name: &str) -> Attributes {
    attributes([
        ("VpcId", Value::reference("VPC")),
        (
            "AvailabilityZone",
            Value::join("", [PseudoParameter::Region.into(), zone_suffix.into()]),
        ),
        ("CidrBlock", Value::reference(cidr_parameter)),
        ("MapPublicIpOnLaunch", public.into()),
        ("Tags", tags([("Name", name)])),
    ])
}

fn add_network(builder: &mut TopologyBuilder) -> Result<(), TopologyError> {
    builder.add_node(
        ResourceKind::Network,
        "VPC",
        attributes([
            ("CidrBlock", Value::reference("CidrBlockRange")),
            ("EnableDnsSupport", true.into()),
            ("EnableDnsHostnames", true.into()),
            ("Tags", tags([("Name", "VPC")])),
        ]),
    )?;
    builder.add_node(
        ResourceKind::Gateway,
        "InternetGateway",
        attributes([("Tags", tags([("Name", "InternetGateway")]))]),
    )?;
    builder.add_node(
        ResourceKind::GatewayAttachment,
        "InternetGatewayAttachment",
        attributes([
            ("InternetGatewayId", Value::reference("InternetGateway")),
            ("VpcId", Value::reference("VPC")),
        ]),
    )?;

    builder.add_node(
        ResourceKind::Subnet,
        "PublicSubnet1",
        subnet("PublicSubnetCidrRange1", "a", true, "PublicSubnet1"),
    )?;
    builder.add_node(
        ResourceKind::Subnet,
        "PublicSubnet2",
        subnet("PublicSubnetCidrRange2", "b", true, "PublicSubnet2"),
    )?;
    builder.add_node(
        ResourceKind::Subnet,
        "PrivateSubnet",
        subnet("PrivateSubnetCidrRange", "a", false, "PrivateSubnet"),
    )?;

    builder.add_node(
        ResourceKind::ElasticIp,
        "NatGatewayEIP",
        attributes([("Domain", "vpc".into())]),
    )?;
    builder.depends_on("NatGatewayEIP", "InternetGatewayAttachment")?;
    builder.add_node(
        ResourceKind::NatGateway,
        "NatGateway",
        attributes([
            ("AllocationId", Value::get_att("NatGatewayEIP", "AllocationId")),
            ("SubnetId", Value::reference("PublicSubnet1")),
        ]),
    )?;

    builder.add_node(
        ResourceKind::RouteTable,
        "PublicRouteTable",
        attributes([
            ("VpcId", Value::reference("VPC")),
            ("Tags", tags([("Name", "PublicRouteTable")])),
        ]),
    )?;
    builder.add_node(
        ResourceKind::Route,
        "DefaultPublicRoute",
        attributes([
            ("RouteTableId", Value::reference("PublicRouteTable")),
            ("DestinationCidrBlock", "0.0.0.0/0".into()),
            ("GatewayId", Value::reference("InternetGateway")),
        ]),
    )?;
    builder.depends_on("DefaultPublicRoute", "InternetGatewayAttachment")?;
    for (association, subnet_name) in [
        ("PublicSubnetRouteTableAssociation1", "PublicSubnet1"),
        ("PublicSubnetRouteTableAssociation2", "PublicSubnet2"),
    ] {
        builder.add_node(
            ResourceKind::RouteTableAssociation,
            association,
            attributes([
                ("RouteTableId", Value::reference("PublicRouteTable")),
                ("SubnetId", Value::reference(subnet_name)),
            ]),
        )?;
    }

    builder.add_node(
        ResourceKind::RouteTable,
        "PrivateRouteTable",
        attributes([
            ("VpcId", Value::reference("VPC")),
            ("Tags", tags([("Name", "PrivateRouteTable")])),
        ]),
    )?;
    builder.add_node(
        ResourceKind::Route,
        "DefaultPrivateRoute",
        attributes([
            ("RouteTableId", Value::reference("PrivateRouteTable")),
            ("DestinationCidrBlock", "0.0.0.0/0".into()),
            ("NatGatewayId", Value::reference("NatGateway")),
        ]),
    )?;
    builder.add_node(
        ResourceKind::RouteTableAssociation,
        "PrivateSubnetRouteTableAssociation",
        attributes([
            ("RouteTableId", Value::reference("PrivateRouteTable")),
            ("SubnetId", Value::reference("PrivateSubnet")),
        ]),
    )
}

fn add_web_servers(builder: &mut TopologyBuilder, config: &WebTierConfig) -> Result<(), TopologyError> {
    builder.add_node(
        ResourceKind::SecurityGroup,
        "SecurityGroup",
        attributes([
            ("GroupDescription", "Allow web traffic to the web servers".into()),
            ("VpcId", Value::reference("VPC")),
            (
                "SecurityGroupIngress",
                Value::list([Value::map([
                    ("IpProtocol", "tcp".into()),
                    ("FromPort", Value::reference("WebServerPort")),
                    ("ToPort", Value::reference("WebServerPort")),
                    ("CidrIp", Value::reference("WebServerIP")),
                ])]),
            ),
        ]),
    )?;

    builder.add_node(
        ResourceKind::LaunchTemplate,
        "LaunchTemplate",
        attributes([(
            "LaunchTemplateData",
            Value::map([
                (
                    "ImageId",
                    Value::find_in_map("RegionMap", PseudoParameter::Region, "64"),
                ),
                ("InstanceType", config.instance_type.as_str().into()),
                ("KeyName", Value::reference("KeyName")),
                (
                    "SecurityGroupIds",
                    Value::list([Value::get_att("SecurityGroup", "GroupId")]),
                ),
                (
                    "IamInstanceProfile",
                    Value::map([("Arn", Value::get_att("CFNInstanceProfile", "Arn"))]),
                ),
            ]),
        )]),
    )?;

    builder.add_node(
        ResourceKind::LoadBalancer,
        "ApplicationElasticLB",
        attributes([
            ("Type", "application".into()),
            ("Scheme", "internet-facing".into()),
            (
                "Subnets",
                Value::list([
                    Value::reference("PublicSubnet1"),
                    Value::reference("PublicSubnet2"),
                ]),
            ),
            ("SecurityGroups", Value::list([Value::reference("SecurityGroup")])),
        ]),
    )?;
    builder.add_node(
        ResourceKind::TargetGroup,
        "TargetGroupWeb",
        attributes([
            ("Port", Value::reference("WebServerPort")),
            ("Protocol", "HTTP".into()),
            ("VpcId", Value::reference("VPC")),
            ("HealthCheckPath", "/".into()),
        ]),
    )?;
    builder.add_node(
        ResourceKind::Listener,
        "Listener",
        attributes([
            ("LoadBalancerArn", Value::reference("ApplicationElasticLB")),
            ("Port", Value::reference("WebServerPort")),
            ("Protocol", "HTTP".into()),
            (
                "DefaultActions",
                Value::list([Value::map([
                    ("Type", "forward".into()),
                    ("TargetGroupArn", Value::reference("TargetGroupWeb")),
                ])]),
            ),
        ]),
    )?;

    let scaling = &config.scaling;
    builder.add_node(
        ResourceKind::ScalingGroup,
        "AutoScalingGroups",
        attributes([
            ("VPCZoneIdentifier", Value::list([Value::reference("PrivateSubnet")])),
            (
                "LaunchTemplate",
                Value::map([
                    ("LaunchTemplateId", Value::reference("LaunchTemplate")),
                    ("Version", Value::get_att("LaunchTemplate", "LatestVersionNumber")),
                ]),
            ),
            ("MinSize", scaling.min_size.to_string().into()),
            ("MaxSize", scaling.max_size.to_string().into()),
            ("DesiredCapacity", scaling.desired_capacity.to_string().into()),
            ("TargetGroupARNs", Value::list([Value::reference("TargetGroupWeb")])),
        ]),
    )
}

fn add_monitoring(builder: &mut TopologyBuilder, config: &WebTierConfig) -> Result<(), TopologyError> {
    builder.add_node(
        ResourceKind::AlarmTopic,
        "AlarmTopic",
        attributes([(
            "Subscription",
            Value::list([Value::map([
                ("Endpoint", Value::reference("AlarmEmail")),
                ("Protocol", "email".into()),
            ])]),
        )]),
    )?;

    let alarm = &config.alarm;
    builder.add_node(
        ResourceKind::Alarm,
        "InstanceCPUUsageAlarm",
        attributes([
            (
                "AlarmDescription",
                format!("Alarm if average CPU utilization exceeds {}%", alarm.cpu_threshold).into(),
            ),
            ("Namespace", "AWS/EC2".into()),
            ("MetricName", "CPUUtilization".into()),
            (
                "Dimensions",
                Value::list([Value::map([
                    ("Name", "AutoScalingGroupName".into()),
                    ("Value", Value::reference("AutoScalingGroups")),
                ])]),
            ),
            ("Statistic", "Average".into()),
            ("Period", alarm.period_seconds.to_string().into()),
            ("EvaluationPeriods", alarm.evaluation_periods.to_string().into()),
            ("Threshold", alarm.cpu_threshold.to_string().into()),
            ("ComparisonOperator", "GreaterThanThreshold".into()),
        ]),
    )?;
    for action in ["AlarmActions", "InsufficientDataActions"] {
        builder.append_to_list(
            "InstanceCPUUsageAlarm",
            action,
            Value::reference("AlarmTopic"),
        )?;
    }
    Ok(())
}
