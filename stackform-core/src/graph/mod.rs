//! Topology Graph
//!
//! This module implements the in-memory graph of infrastructure resources
//! that a template is rendered from.
//!
//! # Overview
//!
//! The graph holds three kinds of entries, all keyed by a unique name:
//!
//! - Parameters: inputs supplied at deploy time
//! - Mappings: static lookup tables
//! - Resource nodes: typed infrastructure objects whose attributes may
//!   reference parameters, mappings and other nodes
//!
//! References form directed edges from the referencing node to its target.
//! Nodes may also carry ordering hints, which order provisioning without
//! carrying any data.
//!
//! # Design Decisions
//!
//! 1. References are validated in one pass at finalize rather than on every
//!    insert, so nodes can be declared in whatever order reads best and the
//!    caller still sees every broken reference at once.
//!
//! 2. Every registry is an `IndexMap`, so iteration (and therefore rendering)
//!    follows insertion order regardless of which way references point.
//!
//! 3. Only [`TopologyBuilder::finalize`] produces a [`ValidatedTopology`],
//!    so the renderer can never see an unchecked graph.

mod builder;
mod node;
mod parameter;
mod resolver;
mod topology;
mod value;

pub use builder::TopologyBuilder;
pub use node::{attributes, Attributes, ResourceKind, ResourceNode};
pub use parameter::{Mapping, Parameter, ParameterType};
pub use resolver::Resolver;
pub use topology::{TopologyGraph, ValidatedTopology};
pub use value::{tags, Lookup, PseudoParameter, Reference, Value};
