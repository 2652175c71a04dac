//! Stackform Core
//!
//! This crate builds declarative infrastructure templates from a typed
//! resource graph. It implements:
//!
//! - A topology builder with name-unique parameters, mappings and nodes
//! - Reference resolution that reports every broken reference and cycle at once
//! - Pluggable template rendering, with a CloudFormation adapter
//! - A configurable web-tier blueprint
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: Resource nodes, the builder and the reference resolver
//! - `render`: Template adapters and rendered documents
//! - `blueprint`: Ready-made topologies
//! - `config`: Blueprint configuration
//! - `error`: Error types for each phase
//!
//! # Example
//!
//! ```rust
//! use stackform_core::graph::{attributes, ResourceKind, TopologyBuilder, Value};
//! use stackform_core::render::{CloudFormationAdapter, Encoding, Renderer};
//!
//! let mut builder = TopologyBuilder::new();
//! builder.add_node(
//!     ResourceKind::Network,
//!     "VPC",
//!     attributes([("CidrBlock", "10.0.0.0/16".into())]),
//! )?;
//! builder.add_node(
//!     ResourceKind::Subnet,
//!     "PublicSubnet",
//!     attributes([
//!         ("VpcId", Value::reference("VPC")),
//!         ("CidrBlock", "10.0.1.0/24".into()),
//!     ]),
//! )?;
//!
//! let topology = builder.finalize()?;
//! let document = Renderer::new(CloudFormationAdapter::new(Encoding::Yaml)).render(&topology)?;
//! assert!(document.as_text().unwrap_or_default().contains("AWS::EC2::Subnet"));
//! # Ok::<(), stackform_core::Error>(())
//! ```

pub mod blueprint;
pub mod config;
pub mod error;
pub mod graph;
pub mod render;

pub use blueprint::{render_web_tier, web_tier};
pub use config::WebTierConfig;
pub use error::{
    ConfigError, Error, RenderError, ResolutionErrors, ResolveError, Result, TopologyError,
};
pub use graph::{ResourceKind, TopologyBuilder, ValidatedTopology, Value};
pub use render::{CloudFormationAdapter, Document, Encoding, Renderer};
