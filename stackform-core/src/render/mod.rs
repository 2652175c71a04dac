//! Template Rendering
//!
//! The renderer walks a [`ValidatedTopology`] and asks a
//! [`TemplateAdapter`] to translate each piece into a provider's declarative
//! syntax. Rendering is all-or-nothing: either every parameter, mapping and
//! node renders and the adapter encodes the result into a [`Document`], or the
//! first failure is returned and no bytes are produced.
//!
//! Nodes render in insertion order. References are resolved by name when the
//! provider applies the document, so no topological sort is needed here.
//!
//! # Example
//!
//! ```rust,ignore
//! use stackform_core::render::{CloudFormationAdapter, Encoding, Renderer};
//!
//! let topology = builder.finalize()?;
//! let renderer = Renderer::new(CloudFormationAdapter::new(Encoding::Yaml));
//! let document = renderer.render(&topology)?;
//! document.persist("web-tier.yml")?;
//! ```

mod cloudformation;
mod document;

pub use cloudformation::CloudFormationAdapter;
pub use document::{Document, Encoding};

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::error::RenderError;
use crate::graph::{Mapping, Parameter, ResourceKind, ResourceNode, ValidatedTopology};

/// Fragments produced by an adapter, in the order they will be encoded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedTemplate {
    /// Template description.
    pub description: Option<String>,
    /// Rendered parameters keyed by name.
    pub parameters: IndexMap<String, JsonValue>,
    /// Rendered mappings keyed by name.
    pub mappings: IndexMap<String, JsonValue>,
    /// Rendered resource blocks keyed by logical name.
    pub resources: IndexMap<String, JsonValue>,
}

/// Translates a validated topology into a provider's document format.
pub trait TemplateAdapter {
    /// Encoding of the bytes [`encode`](Self::encode) produces.
    fn encoding(&self) -> Encoding;

    /// Render one parameter declaration.
    fn render_parameter(&self, parameter: &Parameter) -> Result<JsonValue, RenderError>;

    /// Render one mapping.
    fn render_mapping(&self, mapping: &Mapping) -> Result<JsonValue, RenderError>;

    /// Render one resource block. `topology` is available for looking up the
    /// nodes this one references.
    fn render_node(
        &self,
        node: &ResourceNode,
        topology: &ValidatedTopology,
    ) -> Result<JsonValue, RenderError>;

    /// Record that `node` must be provisioned after `after` in its block.
    fn render_ordering_hint(
        &self,
        node: &ResourceNode,
        after: &str,
        block: &mut JsonValue,
    ) -> Result<(), RenderError>;

    /// Encode the assembled fragments into the final document bytes.
    fn encode(&self, template: &RenderedTemplate) -> Result<Vec<u8>, RenderError>;
}

/// An adapter that can read its own documents back.
pub trait ReverseAdapter: TemplateAdapter {
    /// Parse a document this adapter rendered.
    fn parse(&self, bytes: &[u8]) -> Result<ParsedTemplate, RenderError>;
}

/// The shape of a parsed document: enough to compare against the topology it
/// was rendered from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTemplate {
    /// Template description.
    pub description: Option<String>,
    /// Parameter names, in document order.
    pub parameters: Vec<String>,
    /// Resource blocks, in document order.
    pub nodes: Vec<ParsedNode>,
}

/// One parsed resource block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedNode {
    /// Logical name.
    pub name: String,
    /// Kind recovered from the provider type.
    pub kind: ResourceKind,
    /// Attribute names, order-insensitive.
    pub attribute_keys: BTreeSet<String>,
    /// Ordering hints, in document order.
    pub ordering_hints: Vec<String>,
}

impl ParsedNode {
    /// Describe `node` the way a parse of its rendered block would.
    pub fn from_node(node: &ResourceNode) -> Self {
        Self {
            name: node.name().to_string(),
            kind: node.kind(),
            attribute_keys: node.attributes().keys().cloned().collect(),
            ordering_hints: node.ordering_hints().to_vec(),
        }
    }
}

/// Renders validated topologies with one adapter.
#[derive(Debug, Clone)]
pub struct Renderer<A> {
    adapter: A,
}

impl<A: TemplateAdapter> Renderer<A> {
    /// Create a renderer using `adapter`.
    pub fn new(adapter: A) -> Self {
        Self { adapter }
    }

    /// The adapter in use.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Render `topology` into a document.
    pub fn render(&self, topology: &ValidatedTopology) -> Result<Document, RenderError> {
        let mut template = RenderedTemplate {
            description: topology.description().map(str::to_string),
            ..RenderedTemplate::default()
        };

        for parameter in topology.parameters() {
            let rendered = self.adapter.render_parameter(parameter)?;
            template
                .parameters
                .insert(parameter.name().to_string(), rendered);
        }

        for mapping in topology.mappings() {
            let rendered = self.adapter.render_mapping(mapping)?;
            template.mappings.insert(mapping.name().to_string(), rendered);
        }

        for node in topology.nodes() {
            let mut block = self.adapter.render_node(node, topology)?;
            for after in node.ordering_hints() {
                self.adapter.render_ordering_hint(node, after, &mut block)?;
            }
            debug!(node = node.name(), kind = ?node.kind(), "rendered node");
            template.resources.insert(node.name().to_string(), block);
        }

        let bytes = self.adapter.encode(&template)?;
        info!(
            nodes = template.resources.len(),
            bytes = bytes.len(),
            encoding = ?self.adapter.encoding(),
            "rendered template"
        );
        Ok(Document::new(self.adapter.encoding(), bytes))
    }
}
