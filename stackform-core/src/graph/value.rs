//! Attribute Values
//!
//! Every attribute on a resource node holds a [`Value`]. A value is either a
//! literal (string, integer, boolean, list, map) or an intrinsic that points
//! somewhere else in the topology:
//!
//! - [`Value::Ref`] names a parameter or another resource node
//! - [`Value::GetAtt`] reads a named attribute of another resource node
//! - [`Value::FindInMap`] looks up a declared mapping
//! - [`Value::Join`] concatenates other values
//! - [`Value::Pseudo`] reads a provider-supplied parameter such as the region
//!
//! Intrinsics are recorded as-is when a node is added. Nothing is checked
//! until the resolver walks the complete graph, which is what lets callers
//! author nodes in any order.

use indexmap::IndexMap;

/// Provider-supplied parameters that always exist and need no declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoParameter {
    /// The region the topology is deployed into.
    Region,
    /// The account that owns the deployment.
    AccountId,
    /// The name of the deployed stack.
    StackName,
    /// The partition (commercial, gov, china) of the region.
    Partition,
    /// Removes the attribute it is assigned to.
    NoValue,
}

impl PseudoParameter {
    /// All pseudo parameters, in declaration order.
    pub const ALL: [PseudoParameter; 5] = [
        PseudoParameter::Region,
        PseudoParameter::AccountId,
        PseudoParameter::StackName,
        PseudoParameter::Partition,
        PseudoParameter::NoValue,
    ];

    /// Provider-neutral name of the pseudo parameter.
    pub fn name(&self) -> &'static str {
        match self {
            PseudoParameter::Region => "Region",
            PseudoParameter::AccountId => "AccountId",
            PseudoParameter::StackName => "StackName",
            PseudoParameter::Partition => "Partition",
            PseudoParameter::NoValue => "NoValue",
        }
    }
}

/// The value of a single node attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Literal string.
    String(String),
    /// Literal integer.
    Integer(i64),
    /// Literal boolean.
    Bool(bool),
    /// Ordered list of values.
    List(Vec<Value>),
    /// Ordered map of values. Keys keep insertion order.
    Map(IndexMap<String, Value>),
    /// Reference to a parameter or resource node by name.
    Ref(String),
    /// Reference to one attribute of a resource node.
    GetAtt {
        /// Logical name of the resource node.
        node: String,
        /// Attribute to read from it.
        attribute: String,
    },
    /// Concatenation of `parts` with `separator` between them.
    Join {
        /// Separator placed between parts.
        separator: String,
        /// Values to concatenate.
        parts: Vec<Value>,
    },
    /// Two-level lookup into a declared mapping.
    FindInMap {
        /// Name of the mapping.
        map: String,
        /// First-level key.
        top_key: Box<Value>,
        /// Second-level key.
        second_key: Box<Value>,
    },
    /// Provider-supplied parameter.
    Pseudo(PseudoParameter),
}

/// How a [`Reference`] reaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// The whole parameter or node (`Ref`).
    Whole,
    /// One named attribute of a node (`GetAtt`).
    Attribute(&'a str),
    /// A declared mapping (`FindInMap`).
    Mapping,
}

/// A named pointer found inside a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference<'a> {
    /// Name the reference points at.
    pub target: &'a str,
    /// What kind of lookup the reference performs.
    pub lookup: Lookup<'a>,
}

impl Value {
    /// Reference to a parameter or node by name.
    pub fn reference(target: impl Into<String>) -> Self {
        Value::Ref(target.into())
    }

    /// Reference to one attribute of a node.
    pub fn get_att(node: impl Into<String>, attribute: impl Into<String>) -> Self {
        Value::GetAtt {
            node: node.into(),
            attribute: attribute.into(),
        }
    }

    /// Concatenation of `parts` with `separator`.
    pub fn join<I>(separator: impl Into<String>, parts: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Value::Join {
            separator: separator.into(),
            parts: parts.into_iter().collect(),
        }
    }

    /// Two-level lookup into the mapping `map`.
    pub fn find_in_map(
        map: impl Into<String>,
        top_key: impl Into<Value>,
        second_key: impl Into<Value>,
    ) -> Self {
        Value::FindInMap {
            map: map.into(),
            top_key: Box::new(top_key.into()),
            second_key: Box::new(second_key.into()),
        }
    }

    /// List of values.
    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Value::List(items.into_iter().collect())
    }

    /// Ordered map of values.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns true if the value contains no references at any depth.
    pub fn is_literal(&self) -> bool {
        self.references().is_empty()
    }

    /// Collects every reference in the value, depth first, in order.
    pub fn references(&self) -> Vec<Reference<'_>> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<Reference<'a>>) {
        match self {
            Value::String(_) | Value::Integer(_) | Value::Bool(_) | Value::Pseudo(_) => {}
            Value::List(items) => {
                for item in items {
                    item.collect_references(out);
                }
            }
            Value::Map(entries) => {
                for value in entries.values() {
                    value.collect_references(out);
                }
            }
            Value::Ref(target) => out.push(Reference {
                target,
                lookup: Lookup::Whole,
            }),
            Value::GetAtt { node, attribute } => out.push(Reference {
                target: node,
                lookup: Lookup::Attribute(attribute),
            }),
            Value::Join { parts, .. } => {
                for part in parts {
                    part.collect_references(out);
                }
            }
            Value::FindInMap {
                map,
                top_key,
                second_key,
            } => {
                out.push(Reference {
                    target: map,
                    lookup: Lookup::Mapping,
                });
                top_key.collect_references(out);
                second_key.collect_references(out);
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<PseudoParameter> for Value {
    fn from(p: PseudoParameter) -> Self {
        Value::Pseudo(p)
    }
}

/// Builds the conventional `[{Key, Value}, ...]` tag list.
pub fn tags<I, K, V>(pairs: I) -> Value
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    Value::List(
        pairs
            .into_iter()
            .map(|(key, value)| {
                Value::map([("Key", Value::String(key.into())), ("Value", value.into())])
            })
            .collect(),
    )
}
