//! Parameters and Mappings
//!
//! Parameters are the inputs a topology is deployed with. Mappings are
//! static two-level lookup tables (for example region to image id) that
//! values can index with `FindInMap`. Both are immutable once declared.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::error::TopologyError;

/// Declared type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterType {
    /// Free-form string.
    String,
    /// Integer or float.
    Number,
    /// Comma-separated list of numbers.
    NumberList,
    /// Comma-separated list of strings.
    CommaDelimitedList,
}

impl ParameterType {
    /// Name of the type as written in templates.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterType::String => "String",
            ParameterType::Number => "Number",
            ParameterType::NumberList => "List<Number>",
            ParameterType::CommaDelimitedList => "CommaDelimitedList",
        }
    }

    /// Returns true if `value` is acceptable for this type.
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            ParameterType::String | ParameterType::CommaDelimitedList => true,
            ParameterType::Number => is_finite_number(value),
            ParameterType::NumberList => value.split(',').all(is_finite_number),
        }
    }
}

// `f64::from_str` also takes "NaN" and "inf", which no template accepts.
fn is_finite_number(value: &str) -> bool {
    value.trim().parse::<f64>().is_ok_and(f64::is_finite)
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParameterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "String" => Ok(ParameterType::String),
            "Number" => Ok(ParameterType::Number),
            "List<Number>" => Ok(ParameterType::NumberList),
            "CommaDelimitedList" => Ok(ParameterType::CommaDelimitedList),
            other => Err(format!("unknown parameter type `{other}`")),
        }
    }
}

/// A named input to the topology.
///
/// # Example
///
/// ```rust
/// use stackform_core::graph::{Parameter, ParameterType};
///
/// let port = Parameter::new("WebServerPort", ParameterType::Number)
///     .with_default("80")
///     .with_description("TCP/IP port of the web server");
/// assert_eq!(port.default(), Some("80"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    name: String,
    param_type: ParameterType,
    default: Option<String>,
    description: Option<String>,
}

impl Parameter {
    /// Create a parameter with no default and no description.
    pub fn new(name: impl Into<String>, param_type: ParameterType) -> Self {
        Self {
            name: name.into(),
            param_type,
            default: None,
            description: None,
        }
    }

    /// Set the default value.
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Unique parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    pub fn param_type(&self) -> ParameterType {
        self.param_type
    }

    /// Default value, if any.
    pub fn default(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Check the default against the declared type.
    pub(crate) fn validate(&self) -> Result<(), TopologyError> {
        match &self.default {
            Some(default) if !self.param_type.accepts(default) => {
                Err(TopologyError::InvalidParameterDefault {
                    parameter: self.name.clone(),
                    default: default.clone(),
                    expected: self.param_type.as_str(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// A two-level lookup table.
///
/// # Example
///
/// ```rust
/// use stackform_core::graph::Mapping;
///
/// let images = Mapping::new("RegionMap")
///     .with_entry("us-east-1", "64", "ami-0ff8a91507f77f867")
///     .with_entry("eu-west-1", "64", "ami-047bb4163c506cd98");
/// assert_eq!(images.lookup("eu-west-1", "64"), Some("ami-047bb4163c506cd98"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    name: String,
    entries: IndexMap<String, IndexMap<String, String>>,
}

impl Mapping {
    /// Create an empty mapping.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: IndexMap::new(),
        }
    }

    /// Add or replace one entry.
    pub fn with_entry(
        mut self,
        top_key: impl Into<String>,
        second_key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.entries
            .entry(top_key.into())
            .or_default()
            .insert(second_key.into(), value.into());
        self
    }

    /// Unique mapping name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All entries, in insertion order.
    pub fn entries(&self) -> &IndexMap<String, IndexMap<String, String>> {
        &self.entries
    }

    /// Look up one value.
    pub fn lookup(&self, top_key: &str, second_key: &str) -> Option<&str> {
        self.entries
            .get(top_key)
            .and_then(|row| row.get(second_key))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_defaults_are_checked() {
        let ok = Parameter::new("Port", ParameterType::Number).with_default("80");
        assert!(ok.validate().is_ok());

        let bad = Parameter::new("Port", ParameterType::Number).with_default("eighty");
        assert_eq!(
            bad.validate(),
            Err(TopologyError::InvalidParameterDefault {
                parameter: "Port".into(),
                default: "eighty".into(),
                expected: "Number",
            })
        );
    }

    #[test]
    fn number_list_checks_every_item() {
        assert!(ParameterType::NumberList.accepts("1, 2,3"));
        assert!(!ParameterType::NumberList.accepts("1,two"));
        assert!(!ParameterType::NumberList.accepts("1,inf"));
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        for default in ["NaN", "inf", "-infinity", " +Infinity "] {
            assert!(!ParameterType::Number.accepts(default), "{default}");
            let param = Parameter::new("Threshold", ParameterType::Number).with_default(default);
            assert!(matches!(
                param.validate(),
                Err(TopologyError::InvalidParameterDefault { .. })
            ));
        }
        assert!(ParameterType::Number.accepts("80"));
        assert!(ParameterType::Number.accepts("-0.5e3"));
    }

    #[test]
    fn parameter_type_names_parse_back() {
        for ty in [
            ParameterType::String,
            ParameterType::Number,
            ParameterType::NumberList,
            ParameterType::CommaDelimitedList,
        ] {
            assert_eq!(ty.as_str().parse::<ParameterType>(), Ok(ty));
        }
        assert!("Text".parse::<ParameterType>().is_err());
    }

    #[test]
    fn mapping_keeps_entry_order() {
        let mapping = Mapping::new("RegionMap")
            .with_entry("us-west-2", "64", "ami-b")
            .with_entry("us-east-1", "64", "ami-a");
        let regions: Vec<_> = mapping.entries().keys().cloned().collect();
        assert_eq!(regions, vec!["us-west-2", "us-east-1"]);
        assert_eq!(mapping.lookup("us-east-1", "64"), Some("ami-a"));
        assert_eq!(mapping.lookup("us-east-1", "32"), None);
    }
}
