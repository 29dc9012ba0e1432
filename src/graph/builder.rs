//! Matcher graph construction from configuration documents.
//!
//! Building is two passes over the declared matchers. The first assigns
//! every name a dense index in declaration order, so references may point
//! forward as well as backward. The second compiles each definition:
//! simple bodies get their predicates compiled (including regex
//! compilation), combination bodies get their references resolved to
//! indices. A final depth-first traversal rejects reference cycles before
//! the graph is handed out.
//!
//! Any failure rejects the whole document; the caller keeps whatever graph
//! was previously active.

use std::collections::{HashMap, HashSet};

use crate::config::{ConfigDocument, FieldDef, FieldOpKind, MatcherBody, ScalarValue, SimpleDef};
use crate::error::BuildError;
use crate::graph::predicate::{FieldPredicate, PredicateOp};
use crate::graph::types::{LogicalOp, MatcherGraph, MatcherIndex, MatcherKind, MatcherNode};

/// Compiles a [`ConfigDocument`] into an immutable [`MatcherGraph`].
pub struct GraphBuilder<'a> {
    doc: &'a ConfigDocument,
    name_to_index: HashMap<String, MatcherIndex>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(doc: &'a ConfigDocument) -> Self {
        Self {
            doc,
            name_to_index: HashMap::with_capacity(doc.matchers.len()),
        }
    }

    /// Runs both passes and the cycle check.
    pub fn build(mut self) -> Result<MatcherGraph, BuildError> {
        self.assign_indices()?;
        let nodes = self.compile_nodes()?;

        let mut category_filter = HashSet::new();
        for node in &nodes {
            if let MatcherKind::Simple { category_ids, .. } = &node.kind {
                category_filter.extend(category_ids.iter().copied());
            }
        }

        let graph = MatcherGraph {
            nodes,
            name_to_index: self.name_to_index,
            category_filter,
        };
        check_acyclic(&graph)?;
        Ok(graph)
    }

    // Pass 1: dense indices in declaration order.
    fn assign_indices(&mut self) -> Result<(), BuildError> {
        for (position, def) in self.doc.matchers.iter().enumerate() {
            let index = position as MatcherIndex;
            if self
                .name_to_index
                .insert(def.name.clone(), index)
                .is_some()
            {
                return Err(BuildError::DuplicateName {
                    name: def.name.clone(),
                });
            }
        }
        Ok(())
    }

    // Pass 2: compile bodies against the complete name map.
    fn compile_nodes(&self) -> Result<Vec<MatcherNode>, BuildError> {
        let mut nodes = Vec::with_capacity(self.doc.matchers.len());
        for (position, def) in self.doc.matchers.iter().enumerate() {
            let kind = match &def.body {
                MatcherBody::Match(simple) => self.compile_simple(&def.name, simple)?,
                MatcherBody::AllOf(refs) => {
                    self.compile_combination(&def.name, LogicalOp::And, refs)?
                }
                MatcherBody::AnyOf(refs) => {
                    self.compile_combination(&def.name, LogicalOp::Or, refs)?
                }
                MatcherBody::Not(reference) => {
                    let child = self.resolve(&def.name, reference)?;
                    MatcherKind::Combination {
                        op: LogicalOp::Not,
                        children: vec![child],
                    }
                }
            };
            nodes.push(MatcherNode::new(
                position as MatcherIndex,
                def.name.clone(),
                kind,
            ));
        }
        Ok(nodes)
    }

    fn compile_simple(&self, name: &str, simple: &SimpleDef) -> Result<MatcherKind, BuildError> {
        if simple.categories.is_empty() {
            return Err(BuildError::NoCategories {
                name: name.to_string(),
            });
        }
        let mut predicates = Vec::with_capacity(simple.fields.len());
        for field in &simple.fields {
            predicates.push(compile_predicate(name, field)?);
        }
        Ok(MatcherKind::Simple {
            category_ids: simple.categories.iter().copied().collect(),
            predicates,
        })
    }

    fn compile_combination(
        &self,
        name: &str,
        op: LogicalOp,
        refs: &[String],
    ) -> Result<MatcherKind, BuildError> {
        if refs.is_empty() {
            return Err(BuildError::EmptyCombination {
                name: name.to_string(),
            });
        }
        let mut children = Vec::with_capacity(refs.len());
        for reference in refs {
            children.push(self.resolve(name, reference)?);
        }
        Ok(MatcherKind::Combination { op, children })
    }

    fn resolve(&self, matcher: &str, reference: &str) -> Result<MatcherIndex, BuildError> {
        self.name_to_index.get(reference).copied().ok_or_else(|| {
            BuildError::UnresolvedReference {
                matcher: matcher.to_string(),
                reference: reference.to_string(),
            }
        })
    }
}

/// Resolves a document's target list against a built graph.
///
/// An empty list selects every matcher as a target.
pub fn resolve_targets(
    doc: &ConfigDocument,
    graph: &MatcherGraph,
) -> Result<Vec<MatcherIndex>, BuildError> {
    if doc.targets.is_empty() {
        return Ok((0..graph.node_count() as MatcherIndex).collect());
    }
    let mut targets = Vec::with_capacity(doc.targets.len());
    for name in &doc.targets {
        let index = graph
            .index_of(name)
            .ok_or_else(|| BuildError::UnknownTarget { name: name.clone() })?;
        targets.push(index);
    }
    Ok(targets)
}

fn compile_predicate(matcher: &str, def: &FieldDef) -> Result<FieldPredicate, BuildError> {
    let op = match (&def.op, &def.value) {
        (FieldOpKind::Eq, ScalarValue::Str(v)) => PredicateOp::StrEq(v.clone()),
        (FieldOpKind::Neq, ScalarValue::Str(v)) => PredicateOp::StrNeq(v.clone()),
        (FieldOpKind::Contains, ScalarValue::Str(v)) => PredicateOp::StrContains(v.clone()),
        (FieldOpKind::StartsWith, ScalarValue::Str(v)) => PredicateOp::StrStartsWith(v.clone()),
        (FieldOpKind::EndsWith, ScalarValue::Str(v)) => PredicateOp::StrEndsWith(v.clone()),
        (FieldOpKind::Regex, ScalarValue::Str(pattern)) => match regex::Regex::new(pattern) {
            Ok(re) => PredicateOp::StrRegex(re),
            Err(err) => {
                return Err(BuildError::InvalidRegex {
                    name: matcher.to_string(),
                    pattern: pattern.clone(),
                    message: err.to_string(),
                })
            }
        },
        (FieldOpKind::Eq, ScalarValue::Int(v)) => PredicateOp::IntEq(*v),
        (FieldOpKind::Neq, ScalarValue::Int(v)) => PredicateOp::IntNeq(*v),
        (FieldOpKind::Lt, ScalarValue::Int(v)) => PredicateOp::IntLt(*v),
        (FieldOpKind::Gt, ScalarValue::Int(v)) => PredicateOp::IntGt(*v),
        (FieldOpKind::Le, ScalarValue::Int(v)) => PredicateOp::IntLe(*v),
        (FieldOpKind::Ge, ScalarValue::Int(v)) => PredicateOp::IntGe(*v),
        (FieldOpKind::Eq, ScalarValue::Float(v)) => PredicateOp::FloatEq(*v),
        (FieldOpKind::Lt, ScalarValue::Float(v)) => PredicateOp::FloatLt(*v),
        (FieldOpKind::Gt, ScalarValue::Float(v)) => PredicateOp::FloatGt(*v),
        (FieldOpKind::Le, ScalarValue::Float(v)) => PredicateOp::FloatLe(*v),
        (FieldOpKind::Ge, ScalarValue::Float(v)) => PredicateOp::FloatGe(*v),
        (FieldOpKind::Eq, ScalarValue::Bool(v)) => PredicateOp::BoolEq(*v),
        (op, value) => {
            return Err(BuildError::InvalidPredicate {
                name: matcher.to_string(),
                op: op.as_str().to_string(),
                value: value.to_string(),
            })
        }
    };
    Ok(FieldPredicate::new(def.position, op))
}

/// Depth-first cycle check over combination references.
///
/// `on_stack` marks the nodes on the current traversal path; meeting a
/// marked node again means its references loop back to it. `visited` keeps
/// the whole check linear in nodes plus edges.
fn check_acyclic(graph: &MatcherGraph) -> Result<(), BuildError> {
    let node_count = graph.node_count();
    let mut visited = vec![false; node_count];
    let mut on_stack = vec![false; node_count];

    for start in 0..node_count {
        if !visited[start] {
            visit(graph, start, &mut visited, &mut on_stack)?;
        }
    }
    Ok(())
}

fn visit(
    graph: &MatcherGraph,
    index: usize,
    visited: &mut [bool],
    on_stack: &mut [bool],
) -> Result<(), BuildError> {
    visited[index] = true;
    on_stack[index] = true;

    if let MatcherKind::Combination { children, .. } = &graph.nodes[index].kind {
        for &child in children {
            let child = child as usize;
            if on_stack[child] {
                return Err(BuildError::CyclicGraph {
                    name: graph.nodes[child].name.clone(),
                });
            }
            if !visited[child] {
                visit(graph, child, visited, on_stack)?;
            }
        }
    }

    on_stack[index] = false;
    Ok(())
}
