//! Reference Resolver
//!
//! The resolver checks a complete graph and either rejects it with every
//! violation it found, or derives the order nodes must be provisioned in.
//!
//! # Algorithm
//!
//! 1. Walk every node's references and ordering hints in insertion order.
//!    `Ref` may name a parameter or a node, `GetAtt` and ordering hints must
//!    name a node, `FindInMap` must name a mapping. Each missing target is
//!    reported once per referencing node.
//! 2. Build node-to-node edges (data references plus ordering hints) and run
//!    a depth-first search. Every back edge closes a cycle; the path from the
//!    back edge's target to the current node is reported.
//! 3. If nothing was reported, sort the nodes topologically with Kahn's
//!    algorithm, always taking the earliest-inserted ready node so the order
//!    is deterministic.

use std::collections::{BTreeSet, HashSet};

use smallvec::SmallVec;
use tracing::{info, warn};

use super::topology::TopologyGraph;
use super::value::Lookup;
use crate::error::{ResolutionErrors, ResolveError};

/// What a reference target has to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Need {
    ParameterOrNode,
    Node,
    Mapping,
}

/// DFS colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    InProgress,
    Done,
}

/// Validates a topology graph.
pub struct Resolver<'g> {
    graph: &'g TopologyGraph,

    /// For each node (by insertion index), the distinct nodes it depends on.
    dependencies: Vec<SmallVec<[usize; 4]>>,
}

impl<'g> Resolver<'g> {
    /// Create a resolver for `graph`.
    pub fn new(graph: &'g TopologyGraph) -> Self {
        let dependencies = graph
            .nodes
            .values()
            .map(|node| {
                let mut deps: SmallVec<[usize; 4]> = SmallVec::new();
                let data = node
                    .references()
                    .filter(|(_, r)| !matches!(r.lookup, Lookup::Mapping))
                    .map(|(_, r)| r.target);
                let hints = node.ordering_hints().iter().map(String::as_str);
                for target in data.chain(hints) {
                    if let Some(index) = graph.nodes.get_index_of(target) {
                        if !deps.contains(&index) {
                            deps.push(index);
                        }
                    }
                }
                deps
            })
            .collect();

        Self {
            graph,
            dependencies,
        }
    }

    /// Every violation in the graph. Empty if the graph is valid.
    pub fn violations(&self) -> Vec<ResolveError> {
        let mut errors = Vec::new();
        self.check_references(&mut errors);
        self.check_cycles(&mut errors);
        errors
    }

    /// Validate the graph and return the provisioning order as node indices.
    pub fn resolve(&self) -> Result<Vec<usize>, ResolutionErrors> {
        let errors = self.violations();
        if !errors.is_empty() {
            for error in &errors {
                warn!(%error, "topology violation");
            }
            return Err(ResolutionErrors(errors));
        }

        let order = self.provisioning_order();
        info!(
            nodes = self.graph.nodes.len(),
            parameters = self.graph.parameters.len(),
            "topology resolved"
        );
        Ok(order)
    }

    /// Parameters no `Ref` anywhere in the graph points at.
    pub fn unused_parameters(&self) -> Vec<String> {
        let used: HashSet<&str> = self
            .graph
            .nodes
            .values()
            .flat_map(|node| node.references())
            .filter(|(_, r)| matches!(r.lookup, Lookup::Whole))
            .map(|(_, r)| r.target)
            .collect();

        self.graph
            .parameters
            .keys()
            .filter(|name| !used.contains(name.as_str()))
            .cloned()
            .collect()
    }

    fn check_references(&self, errors: &mut Vec<ResolveError>) {
        let graph = self.graph;

        for node in graph.nodes.values() {
            let mut reported: HashSet<&str> = HashSet::new();

            let data = node.references().map(|(_, r)| {
                let need = match r.lookup {
                    Lookup::Whole => Need::ParameterOrNode,
                    Lookup::Attribute(_) => Need::Node,
                    Lookup::Mapping => Need::Mapping,
                };
                (r.target, need)
            });
            let hints = node
                .ordering_hints()
                .iter()
                .map(|target| (target.as_str(), Need::Node));

            for (target, need) in data.chain(hints) {
                let violation = match need {
                    Need::ParameterOrNode if graph.is_name_taken(target) => None,
                    Need::Node if graph.nodes.contains_key(target) => None,
                    Need::Mapping if graph.mappings.contains_key(target) => None,
                    Need::Node if graph.parameters.contains_key(target) => {
                        Some(ResolveError::NotAResource {
                            node: node.name().to_string(),
                            target: target.to_string(),
                        })
                    }
                    _ => Some(ResolveError::UnresolvedReference {
                        node: node.name().to_string(),
                        target: target.to_string(),
                    }),
                };

                if let Some(violation) = violation {
                    if reported.insert(target) {
                        errors.push(violation);
                    }
                }
            }
        }
    }

    /// Depth-first search with an explicit frame stack, so chain length is
    /// bounded by the heap rather than the thread stack.
    fn check_cycles(&self, errors: &mut Vec<ResolveError>) {
        let mut state = vec![Visit::Unvisited; self.dependencies.len()];
        // (node, position of the next dependency to follow)
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for start in 0..self.dependencies.len() {
            if state[start] != Visit::Unvisited {
                continue;
            }
            state[start] = Visit::InProgress;
            stack.push((start, 0));

            while let Some(frame) = stack.last_mut() {
                let (index, next) = *frame;
                let Some(&dep) = self.dependencies[index].get(next) else {
                    state[index] = Visit::Done;
                    stack.pop();
                    continue;
                };
                frame.1 += 1;

                match state[dep] {
                    Visit::Unvisited => {
                        state[dep] = Visit::InProgress;
                        stack.push((dep, 0));
                    }
                    Visit::InProgress => errors.push(self.cycle_through(&stack, dep)),
                    Visit::Done => {}
                }
            }
        }
    }

    /// The cycle closed by a back edge to `target`: the stack from `target`
    /// to the top, then `target` again.
    fn cycle_through(&self, stack: &[(usize, usize)], target: usize) -> ResolveError {
        let from = stack.iter().position(|&(i, _)| i == target).unwrap_or(0);
        let path = stack[from..]
            .iter()
            .map(|&(i, _)| i)
            .chain(std::iter::once(target))
            .filter_map(|i| self.graph.nodes.get_index(i))
            .map(|(name, _)| name.clone())
            .collect();
        ResolveError::CyclicReference { path }
    }

    /// Kahn's algorithm over the dependency edges.
    ///
    /// Only meaningful on an acyclic graph; nodes on a cycle are left out.
    fn provisioning_order(&self) -> Vec<usize> {
        let count = self.dependencies.len();
        let mut in_degree: Vec<usize> = self.dependencies.iter().map(|deps| deps.len()).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (index, deps) in self.dependencies.iter().enumerate() {
            for &dep in deps {
                dependents[dep].push(index);
            }
        }

        let mut ready: BTreeSet<usize> = (0..count).filter(|&i| in_degree[i] == 0).collect();
        let mut result = Vec::with_capacity(count);

        while let Some(index) = ready.pop_first() {
            result.push(index);

            for &dependent in &dependents[index] {
                let degree = &mut in_degree[dependent];
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    ready.insert(dependent);
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{attributes, Mapping, Parameter, ParameterType, ResourceKind, ResourceNode, Value};

    fn graph_of(nodes: Vec<ResourceNode>) -> TopologyGraph {
        let mut graph = TopologyGraph::default();
        for node in nodes {
            graph.nodes.insert(node.name().to_string(), node);
        }
        graph
    }

    fn node(name: &str, refs: &[&str]) -> ResourceNode {
        ResourceNode::new(
            ResourceKind::Subnet,
            name,
            attributes(
                refs.iter()
                    .enumerate()
                    .map(|(i, target)| (format!("Ref{i}"), Value::reference(*target))),
            ),
        )
    }

    #[test]
    fn valid_graph_resolves() {
        let graph = graph_of(vec![node("VPC", &[]), node("Subnet1", &["VPC"])]);
        let order = Resolver::new(&graph).resolve().unwrap();
        assert_eq!(order, vec![0, 1]);
    }

    #[test]
    fn forward_references_are_allowed() {
        let graph = graph_of(vec![node("Subnet1", &["VPC"]), node("VPC", &[])]);
        let order = Resolver::new(&graph).resolve().unwrap();
        // VPC must come first even though it was added second.
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn every_missing_reference_is_reported() {
        let graph = graph_of(vec![
            node("ASG", &["TargetGroupWeb", "LaunchTemplate", "TargetGroupWeb"]),
            node("Listener", &["ApplicationElasticLB"]),
        ]);

        let errors = Resolver::new(&graph).resolve().unwrap_err();
        assert_eq!(
            errors.errors(),
            &[
                ResolveError::UnresolvedReference {
                    node: "ASG".into(),
                    target: "TargetGroupWeb".into()
                },
                ResolveError::UnresolvedReference {
                    node: "ASG".into(),
                    target: "LaunchTemplate".into()
                },
                ResolveError::UnresolvedReference {
                    node: "Listener".into(),
                    target: "ApplicationElasticLB".into()
                },
            ]
        );
    }

    #[test]
    fn get_att_on_parameter_is_rejected() {
        let mut graph = graph_of(vec![ResourceNode::new(
            ResourceKind::Policy,
            "Policies",
            attributes([("Resource", Value::get_att("BucketName", "Name"))]),
        )]);
        graph.parameters.insert(
            "BucketName".into(),
            Parameter::new("BucketName", ParameterType::String),
        );

        let errors = Resolver::new(&graph).violations();
        assert_eq!(
            errors,
            vec![ResolveError::NotAResource {
                node: "Policies".into(),
                target: "BucketName".into()
            }]
        );
    }

    #[test]
    fn mappings_must_be_declared() {
        let lookup = Value::find_in_map("RegionMap", "us-east-1", "64");
        let mut graph = graph_of(vec![ResourceNode::new(
            ResourceKind::LaunchTemplate,
            "Launch",
            attributes([("ImageId", lookup)]),
        )]);

        assert_eq!(Resolver::new(&graph).violations().len(), 1);

        graph
            .mappings
            .insert("RegionMap".into(), Mapping::new("RegionMap"));
        assert!(Resolver::new(&graph).violations().is_empty());
    }

    #[test]
    fn cycles_are_reported_with_their_path() {
        let graph = graph_of(vec![
            node("A", &["B"]),
            node("B", &["C"]),
            node("C", &["A"]),
            node("D", &["D"]),
        ]);

        let errors = Resolver::new(&graph).violations();
        assert_eq!(
            errors,
            vec![
                ResolveError::CyclicReference {
                    path: vec!["A".into(), "B".into(), "C".into(), "A".into()]
                },
                ResolveError::CyclicReference {
                    path: vec!["D".into(), "D".into()]
                },
            ]
        );
    }

    #[test]
    fn ordering_hints_shape_the_order() {
        let mut route = node("DefaultRoute", &["RouteTable"]);
        route.add_ordering_hint("Attachment".into());
        let graph = graph_of(vec![
            node("VPC", &[]),
            node("RouteTable", &["VPC"]),
            route,
            node("Attachment", &["VPC"]),
        ]);

        let order = Resolver::new(&graph).resolve().unwrap();
        let names: Vec<_> = order
            .iter()
            .map(|&i| graph.nodes.get_index(i).unwrap().0.as_str())
            .collect();
        assert_eq!(names, vec!["VPC", "RouteTable", "Attachment", "DefaultRoute"]);
    }

    #[test]
    fn missing_ordering_hint_target_is_reported() {
        let mut route = node("DefaultRoute", &[]);
        route.add_ordering_hint("Attachment".into());
        let graph = graph_of(vec![route]);

        assert_eq!(
            Resolver::new(&graph).violations(),
            vec![ResolveError::UnresolvedReference {
                node: "DefaultRoute".into(),
                target: "Attachment".into()
            }]
        );
    }

    #[test]
    fn cycle_through_ordering_hint_is_reported() {
        let a = node("A", &["B"]);
        let mut b = node("B", &[]);
        b.add_ordering_hint("A".into());
        let graph = graph_of(vec![a, b]);

        assert_eq!(
            Resolver::new(&graph).violations(),
            vec![ResolveError::CyclicReference {
                path: vec!["A".into(), "B".into(), "A".into()]
            }]
        );
    }

    #[test]
    fn long_reference_chain_resolves() {
        const LENGTH: usize = 60_000;
        let names: Vec<String> = (0..LENGTH).map(|i| format!("B{i}")).collect();
        let nodes = (0..LENGTH)
            .map(|i| match names.get(i + 1) {
                Some(next) => node(&names[i], &[next.as_str()]),
                None => node(&names[i], &[]),
            })
            .collect();
        let graph = graph_of(nodes);

        let order = Resolver::new(&graph).resolve().unwrap();
        assert_eq!(order.len(), LENGTH);
        assert_eq!(order.first(), Some(&(LENGTH - 1)));
        assert_eq!(order.last(), Some(&0));
    }

    #[test]
    fn long_cycle_is_reported_once() {
        const LENGTH: usize = 20_000;
        let names: Vec<String> = (0..LENGTH).map(|i| format!("B{i}")).collect();
        let nodes = (0..LENGTH)
            .map(|i| node(&names[i], &[names[(i + 1) % LENGTH].as_str()]))
            .collect();
        let graph = graph_of(nodes);

        let errors = Resolver::new(&graph).violations();
        assert_eq!(errors.len(), 1);
        let ResolveError::CyclicReference { path } = &errors[0] else {
            panic!("expected a cycle, got {:?}", errors[0]);
        };
        assert_eq!(path.len(), LENGTH + 1);
        assert_eq!(path.first(), path.last());
    }

    #[test]
    fn unused_parameters_are_listed() {
        let mut graph = graph_of(vec![node("VPC", &["CidrBlockRange"])]);
        for name in ["CidrBlockRange", "KeyName"] {
            graph
                .parameters
                .insert(name.into(), Parameter::new(name, ParameterType::String));
        }

        assert_eq!(Resolver::new(&graph).unused_parameters(), vec!["KeyName"]);
    }
}
