//! Error types.
//!
//! Errors are split by the phase that produces them:
//!
//! - [`TopologyError`]: structural mistakes caught at the builder call that
//!   made them (duplicates, unknown kinds). These fail fast.
//! - [`ResolveError`]: broken references and cycles, found when the graph is
//!   finalized. These are aggregated into [`ResolutionErrors`] so every
//!   defect is reported in one pass.
//! - [`RenderError`]: an adapter could not express a node.
//! - [`ConfigError`]: blueprint configuration could not be loaded.

use crate::graph::ResourceKind;

/// Boxed underlying cause carried by encode and decode failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Builder-time structural error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    /// A parameter with this name was already declared.
    #[error("parameter `{0}` is already declared")]
    DuplicateParameter(String),

    /// A mapping with this name was already declared.
    #[error("mapping `{0}` is already declared")]
    DuplicateMapping(String),

    /// A node with this logical name was already added.
    #[error("node `{0}` is already defined")]
    DuplicateNode(String),

    /// The kind name is not one of the supported resource kinds.
    #[error("unknown resource kind `{0}`")]
    UnknownKind(String),

    /// The node being modified was never added.
    #[error("node `{0}` does not exist")]
    UnknownNode(String),

    /// The attribute is already set on the node.
    #[error("attribute `{attribute}` is already set on node `{node}`")]
    DuplicateAttribute {
        /// Node being modified.
        node: String,
        /// Attribute that already exists.
        attribute: String,
    },

    /// The attribute exists but is not a list, so it cannot be appended to.
    #[error("attribute `{attribute}` on node `{node}` is not a list")]
    NotAList {
        /// Node being modified.
        node: String,
        /// Attribute that is not a list.
        attribute: String,
    },

    /// The parameter default does not match its declared type.
    #[error("default `{default}` of parameter `{parameter}` is not a valid {expected}")]
    InvalidParameterDefault {
        /// Parameter being declared.
        parameter: String,
        /// Offending default.
        default: String,
        /// Type name the default should satisfy.
        expected: &'static str,
    },

    /// A node was asked to be provisioned after itself.
    #[error("node `{0}` cannot be ordered after itself")]
    SelfOrderingHint(String),
}

/// Reference-graph violation found at finalize time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// `node` references `target`, which is not in the graph.
    #[error("node `{node}` references `{target}`, which is not defined")]
    UnresolvedReference {
        /// Referencing node.
        node: String,
        /// Missing target.
        target: String,
    },

    /// `node` reads an attribute of, or orders itself after, `target`, which
    /// is a parameter rather than a resource node.
    #[error("node `{node}` needs `{target}` to be a resource, but it is a parameter")]
    NotAResource {
        /// Referencing node.
        node: String,
        /// Parameter named where a node was expected.
        target: String,
    },

    /// The nodes in `path` depend on each other in a loop. The first and last
    /// entries are the same node.
    #[error("cyclic reference: {}", path.join(" -> "))]
    CyclicReference {
        /// Nodes along the cycle.
        path: Vec<String>,
    },
}

/// Every violation found while resolving a graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} unresolved topology error(s){}", .0.len(), bullet_list(.0))]
pub struct ResolutionErrors(pub Vec<ResolveError>);

impl ResolutionErrors {
    /// The individual violations, in discovery order.
    pub fn errors(&self) -> &[ResolveError] {
        &self.0
    }

    /// Number of violations.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if any violation equals `error`.
    pub fn contains(&self, error: &ResolveError) -> bool {
        self.0.contains(error)
    }
}

fn bullet_list(errors: &[ResolveError]) -> String {
    errors.iter().map(|error| format!("\n  - {error}")).collect()
}

impl IntoIterator for ResolutionErrors {
    type Item = ResolveError;
    type IntoIter = std::vec::IntoIter<ResolveError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Adapter failure while rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The node lacks an attribute its kind requires.
    #[error("node `{node}` ({kind}) is missing required attribute `{attribute}`")]
    MissingAttribute {
        /// Offending node.
        node: String,
        /// Its kind.
        kind: ResourceKind,
        /// Attribute that is required.
        attribute: String,
    },

    /// The node reads an attribute that the target kind does not expose.
    #[error("node `{node}` reads attribute `{attribute}`, which {kind} does not expose")]
    UnsupportedAttribute {
        /// Offending node.
        node: String,
        /// Kind of the node being read.
        kind: ResourceKind,
        /// Attribute name that was asked for.
        attribute: String,
    },

    /// The assembled document could not be encoded.
    #[error("failed to encode document: {0}")]
    Encode(#[source] BoxError),

    /// The bytes are not a valid document in the adapter's encoding.
    #[error("failed to decode document: {0}")]
    Decode(#[source] BoxError),

    /// The document decodes but does not have the expected shape.
    #[error("malformed document: {0}")]
    Malformed(String),
}

/// Configuration could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config `{path}`: {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The contents are not valid configuration.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The settings parse but contradict each other.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Any error produced by the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Structural builder error.
    #[error(transparent)]
    Topology(#[from] TopologyError),

    /// Reference resolution failed.
    #[error(transparent)]
    Resolution(#[from] ResolutionErrors),

    /// Rendering failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Configuration failed to load.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Writing the document failed.
    #[error("failed to write document: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for end-to-end operations.
pub type Result<T> = std::result::Result<T, Error>;
