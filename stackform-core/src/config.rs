//! Blueprint configuration.
//!
//! [`WebTierConfig`] carries every tunable of the bundled web-tier
//! blueprint. It loads from YAML; any key left out keeps its default.
//!
//! ```yaml
//! description: Staging web tier
//! web_server_port: 8080
//! scaling:
//!   max_size: 3
//! image_ids:
//!   eu-west-1: ami-047bb4163c506cd98
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Scaling group bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalingConfig {
    /// Fewest instances kept running.
    pub min_size: u32,
    /// Most instances ever launched.
    pub max_size: u32,
    /// Instances launched initially.
    pub desired_capacity: u32,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            min_size: 1,
            max_size: 5,
            desired_capacity: 1,
        }
    }
}

/// CPU alarm settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    /// Average CPU percentage that trips the alarm.
    pub cpu_threshold: u32,
    /// Length of one evaluation period.
    pub period_seconds: u32,
    /// Consecutive periods above threshold before alarming.
    pub evaluation_periods: u32,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            cpu_threshold: 50,
            period_seconds: 300,
            evaluation_periods: 1,
        }
    }
}

/// Settings for [`blueprint::web_tier`](crate::blueprint::web_tier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebTierConfig {
    /// Template description.
    pub description: String,
    /// Default for the `AlarmEmail` parameter.
    pub alarm_email: String,
    /// Default for the `WebServerPort` parameter.
    pub web_server_port: u16,
    /// Default for the `CidrBlockRange` parameter.
    pub vpc_cidr: String,
    /// Default for the `PublicSubnetCidrRange1` parameter.
    pub public_subnet_1_cidr: String,
    /// Default for the `PublicSubnetCidrRange2` parameter.
    pub public_subnet_2_cidr: String,
    /// Default for the `PrivateSubnetCidrRange` parameter.
    pub private_subnet_cidr: String,
    /// Instance type in the launch template.
    pub instance_type: String,
    /// Scaling group bounds.
    pub scaling: ScalingConfig,
    /// CPU alarm settings.
    pub alarm: AlarmConfig,
    /// Region to 64-bit image id.
    pub image_ids: IndexMap<String, String>,
}

impl Default for WebTierConfig {
    fn default() -> Self {
        let image_ids = [
            ("us-east-1", "ami-0ff8a91507f77f867"),
            ("us-west-2", "ami-a0cfeed8"),
            ("eu-west-1", "ami-047bb4163c506cd98"),
        ]
        .into_iter()
        .map(|(region, ami)| (region.to_string(), ami.to_string()))
        .collect();

        Self {
            description: "Single tier web application behind a load balancer.".to_string(),
            alarm_email: "ops@example.com".to_string(),
            web_server_port: 80,
            vpc_cidr: "10.0.0.0/16".to_string(),
            public_subnet_1_cidr: "10.0.1.0/24".to_string(),
            public_subnet_2_cidr: "10.0.2.0/24".to_string(),
            private_subnet_cidr: "10.0.3.0/24".to_string(),
            instance_type: "t2.micro".to_string(),
            scaling: ScalingConfig::default(),
            alarm: AlarmConfig::default(),
            image_ids,
        }
    }
}

impl WebTierConfig {
    /// Load from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the settings describe a deployable tier.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scaling = &self.scaling;
        if scaling.min_size > scaling.max_size {
            return Err(ConfigError::Invalid(format!(
                "scaling.min_size ({}) exceeds scaling.max_size ({})",
                scaling.min_size, scaling.max_size
            )));
        }
        if !(scaling.min_size..=scaling.max_size).contains(&scaling.desired_capacity) {
            return Err(ConfigError::Invalid(format!(
                "scaling.desired_capacity ({}) is outside {}..={}",
                scaling.desired_capacity, scaling.min_size, scaling.max_size
            )));
        }
        if self.image_ids.is_empty() {
            return Err(ConfigError::Invalid("image_ids is empty".to_string()));
        }
        if self.web_server_port == 0 {
            return Err(ConfigError::Invalid("web_server_port must be non-zero".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(WebTierConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = r#"
description: Staging web tier
web_server_port: 8080
scaling:
  max_size: 3
image_ids:
  eu-west-1: ami-047bb4163c506cd98
"#;

        let config = WebTierConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.description, "Staging web tier");
        assert_eq!(config.web_server_port, 8080);
        assert_eq!(config.scaling.max_size, 3);
        assert_eq!(config.scaling.min_size, 1);
        assert_eq!(config.instance_type, "t2.micro");
        assert_eq!(config.image_ids.len(), 1);
    }

    #[test]
    fn inconsistent_scaling_is_rejected() {
        let yaml = "scaling:\n  min_size: 4\n  max_size: 2\n";
        assert!(matches!(
            WebTierConfig::from_yaml_str(yaml),
            Err(ConfigError::Invalid(_))
        ));

        let yaml = "scaling:\n  desired_capacity: 9\n";
        assert!(matches!(
            WebTierConfig::from_yaml_str(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = WebTierConfig::from_yaml_str("web_server_port: [1, 2]").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("failed to parse config: "));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("web.yml");
        std::fs::write(&path, "instance_type: t3.small\n").unwrap();

        let config = WebTierConfig::load(&path).unwrap();
        assert_eq!(config.instance_type, "t3.small");

        let missing = WebTierConfig::load(dir.path().join("absent.yml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
