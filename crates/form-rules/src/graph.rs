//! Structural checks over a form's visibility rule graph.
//!
//! Edges point from a field to every field its visibility predicates read.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::spec::form::FormDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    CircularDependency,
    UnreachableField,
    InvalidReference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// A defect in the rule graph. Errors block saving the form; warnings do not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDiagnostic {
    #[serde(rename = "type")]
    pub kind: DiagnosticKind,
    pub field_id: String,
    pub message: String,
    pub severity: Severity,
}

impl RuleDiagnostic {
    fn circular(field_id: &str) -> Self {
        Self {
            kind: DiagnosticKind::CircularDependency,
            field_id: field_id.to_string(),
            message: format!("Field \"{field_id}\" has a circular dependency in its visibility rules"),
            severity: Severity::Error,
        }
    }

    fn self_reference(field_id: &str) -> Self {
        Self {
            kind: DiagnosticKind::UnreachableField,
            field_id: field_id.to_string(),
            message: format!("Field \"{field_id}\" depends on itself and may be unreachable"),
            severity: Severity::Warning,
        }
    }

    fn missing_target(field_id: &str) -> Self {
        Self {
            kind: DiagnosticKind::InvalidReference,
            field_id: field_id.to_string(),
            message: format!("Visibility rule references non-existent field \"{field_id}\""),
            severity: Severity::Error,
        }
    }

    fn missing_dependency(field_id: &str, missing: &str) -> Self {
        Self {
            kind: DiagnosticKind::InvalidReference,
            field_id: field_id.to_string(),
            message: format!("Predicate references non-existent field \"{missing}\""),
            severity: Severity::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphValidation {
    pub is_valid: bool,
    pub diagnostics: Vec<RuleDiagnostic>,
}

impl GraphValidation {
    pub fn errors(&self) -> impl Iterator<Item = &RuleDiagnostic> {
        self.diagnostics.iter().filter(|diagnostic| diagnostic.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &RuleDiagnostic> {
        self.diagnostics
            .iter()
            .filter(|diagnostic| !diagnostic.is_error())
    }
}

/// Runs cycle, self-reference and reference checks, in that order.
pub fn validate_visibility_graph(definition: &FormDefinition) -> GraphValidation {
    let mut diagnostics = detect_cycles(definition);
    diagnostics.extend(detect_self_references(definition));
    diagnostics.extend(detect_invalid_references(definition));

    let is_valid = !diagnostics.iter().any(RuleDiagnostic::is_error);
    debug!(
        form = %definition.id,
        diagnostics = diagnostics.len(),
        is_valid,
        "validated visibility graph"
    );
    GraphValidation {
        is_valid,
        diagnostics,
    }
}

fn dependency_edges(definition: &FormDefinition) -> BTreeMap<&str, Vec<&str>> {
    let mut edges: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for rule in &definition.visibility {
        let deps = edges.entry(rule.field_id.as_str()).or_default();
        for predicate in rule.predicates() {
            let dep = predicate.when_field_id.as_str();
            if !deps.contains(&dep) {
                deps.push(dep);
            }
        }
    }
    edges
}

/// Reports every property that sits on a cycle, including direct self-loops,
/// in property order.
fn detect_cycles(definition: &FormDefinition) -> Vec<RuleDiagnostic> {
    let edges = dependency_edges(definition);
    let mut scc = Tarjan::new(&edges);
    for field_id in definition.property_ids() {
        if !scc.indices.contains_key(field_id) {
            scc.visit(field_id);
        }
    }

    definition
        .property_ids()
        .filter(|field_id| scc.cyclic.contains(*field_id))
        .map(RuleDiagnostic::circular)
        .collect()
}

fn detect_self_references(definition: &FormDefinition) -> Vec<RuleDiagnostic> {
    definition
        .visibility
        .iter()
        .flat_map(|rule| {
            rule.predicates()
                .filter(move |predicate| predicate.when_field_id == rule.field_id)
                .map(move |_| RuleDiagnostic::self_reference(&rule.field_id))
        })
        .collect()
}

fn detect_invalid_references(definition: &FormDefinition) -> Vec<RuleDiagnostic> {
    let known: HashSet<&str> = definition.property_ids().collect();
    let mut diagnostics = Vec::new();
    for rule in &definition.visibility {
        if !known.contains(rule.field_id.as_str()) {
            diagnostics.push(RuleDiagnostic::missing_target(&rule.field_id));
        }
        for predicate in rule.predicates() {
            if !known.contains(predicate.when_field_id.as_str()) {
                diagnostics.push(RuleDiagnostic::missing_dependency(
                    &rule.field_id,
                    &predicate.when_field_id,
                ));
            }
        }
    }
    diagnostics
}

/// Tarjan's strongly connected components over the dependency edges.
struct Tarjan<'a> {
    edges: &'a BTreeMap<&'a str, Vec<&'a str>>,
    next_index: usize,
    indices: HashMap<&'a str, usize>,
    lowlinks: HashMap<&'a str, usize>,
    stack: Vec<&'a str>,
    on_stack: HashSet<&'a str>,
    cyclic: HashSet<&'a str>,
}

impl<'a> Tarjan<'a> {
    fn new(edges: &'a BTreeMap<&'a str, Vec<&'a str>>) -> Self {
        Self {
            edges,
            next_index: 0,
            indices: HashMap::new(),
            lowlinks: HashMap::new(),
            stack: Vec::new(),
            on_stack: HashSet::new(),
            cyclic: HashSet::new(),
        }
    }

    /// Walks from `root` with an explicit frame stack of `(node, next edge)`
    /// so long dependency chains cannot exhaust the call stack.
    fn visit(&mut self, root: &'a str) {
        let edges = self.edges;
        let mut frames: Vec<(&'a str, usize)> = vec![(root, 0)];
        self.enter(root);

        while let Some(frame) = frames.last_mut() {
            let (node, next_edge) = *frame;
            let deps = edges.get(node).map(Vec::as_slice).unwrap_or_default();

            if let Some(&dep) = deps.get(next_edge) {
                frame.1 += 1;
                match self.indices.get(dep) {
                    Some(&dep_index) => {
                        if self.on_stack.contains(dep) {
                            self.lower(node, dep_index);
                        }
                    }
                    None => {
                        self.enter(dep);
                        frames.push((dep, 0));
                    }
                }
                continue;
            }

            frames.pop();
            if let Some(&(parent, _)) = frames.last() {
                let node_low = self.lowlinks[node];
                self.lower(parent, node_low);
            }
            self.close(node, deps);
        }
    }

    fn enter(&mut self, node: &'a str) {
        let index = self.next_index;
        self.next_index += 1;
        self.indices.insert(node, index);
        self.lowlinks.insert(node, index);
        self.stack.push(node);
        self.on_stack.insert(node);
    }

    /// Pops the component rooted at `node`, if it is one.
    fn close(&mut self, node: &'a str, deps: &[&'a str]) {
        if self.lowlinks[node] != self.indices[node] {
            return;
        }

        let mut component = Vec::new();
        while let Some(member) = self.stack.pop() {
            self.on_stack.remove(member);
            component.push(member);
            if member == node {
                break;
            }
        }
        if component.len() > 1 || deps.contains(&node) {
            self.cyclic.extend(component);
        }
    }

    fn lower(&mut self, node: &'a str, candidate: usize) {
        if let Some(low) = self.lowlinks.get_mut(node) {
            *low = (*low).min(candidate);
        }
    }
}
