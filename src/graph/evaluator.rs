//! Memoized on-demand graph evaluation.
//!
//! Evaluation walks the graph recursively from a target node, so children
//! declared after their parent are computed exactly when first needed.
//! Results land in a caller-owned [`EvalBuffer`] keyed by node index; a
//! second request for any node inside the same pass is a memo hit. AND and
//! OR stop at the first deciding child, NOT inverts its single child.
//!
//! One buffer serves one event pass at a time. Callers reuse it across
//! events by calling [`EvalBuffer::reset`] between passes, and may evaluate
//! any number of targets of the same graph against one pass.

use crate::error::EvalError;
use crate::event::Event;
use crate::graph::types::{LogicalOp, MatchState, MatcherGraph, MatcherIndex, MatcherKind};

/// Reusable per-pass evaluation state: one [`MatchState`] slot per node
/// plus work counters.
///
/// The buffer must be sized to the graph it is used with; a mismatch is a
/// programmer error and panics.
#[derive(Debug, Clone)]
pub struct EvalBuffer {
    states: Vec<MatchState>,
    /// Nodes computed this pass (memo hits excluded).
    pub nodes_evaluated: usize,
    /// Field predicates consulted this pass. Category-gated and
    /// short-circuited predicates are never consulted and do not count.
    pub predicate_evaluations: usize,
}

impl EvalBuffer {
    /// Creates a buffer sized for `graph`.
    pub fn for_graph(graph: &MatcherGraph) -> Self {
        Self {
            states: vec![MatchState::NotComputed; graph.node_count()],
            nodes_evaluated: 0,
            predicate_evaluations: 0,
        }
    }

    /// Clears all slots to `NotComputed` and zeroes the counters.
    ///
    /// Must run between events; never between targets of the same event.
    pub fn reset(&mut self) {
        self.states.fill(MatchState::NotComputed);
        self.nodes_evaluated = 0;
        self.predicate_evaluations = 0;
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// State recorded for a node in the current pass.
    pub fn state(&self, index: MatcherIndex) -> Option<MatchState> {
        self.states.get(index as usize).copied()
    }
}

/// Evaluates `target` against one event, memoizing into `buf`.
///
/// Returns `Matched` or `NotMatched`; `NotComputed` never escapes. An
/// out-of-range target is an error, a wrongly sized buffer panics.
pub fn evaluate(
    graph: &MatcherGraph,
    event: &Event,
    target: MatcherIndex,
    buf: &mut EvalBuffer,
) -> Result<MatchState, EvalError> {
    assert_eq!(
        buf.len(),
        graph.node_count(),
        "evaluation buffer sized for a different graph"
    );
    if target as usize >= graph.node_count() {
        return Err(EvalError::InvalidTarget {
            index: target,
            node_count: graph.node_count(),
        });
    }
    Ok(eval_node(graph, event, target as usize, buf))
}

// Child indices come out of the builder, so they are always in range and
// the reference graph is acyclic; plain indexing and recursion are safe.
fn eval_node(graph: &MatcherGraph, event: &Event, index: usize, buf: &mut EvalBuffer) -> MatchState {
    let memo = buf.states[index];
    if memo != MatchState::NotComputed {
        return memo;
    }

    buf.nodes_evaluated += 1;
    let state = match &graph.nodes[index].kind {
        MatcherKind::Simple {
            category_ids,
            predicates,
        } => {
            let matched = category_ids.contains(&event.category_id)
                && predicates.iter().all(|predicate| {
                    buf.predicate_evaluations += 1;
                    predicate.matches(event)
                });
            MatchState::from_bool(matched)
        }
        MatcherKind::Combination { op, children } => match op {
            LogicalOp::And => {
                let mut state = MatchState::Matched;
                for &child in children {
                    if eval_node(graph, event, child as usize, buf) == MatchState::NotMatched {
                        state = MatchState::NotMatched;
                        break;
                    }
                }
                state
            }
            LogicalOp::Or => {
                let mut state = MatchState::NotMatched;
                for &child in children {
                    if eval_node(graph, event, child as usize, buf) == MatchState::Matched {
                        state = MatchState::Matched;
                        break;
                    }
                }
                state
            }
            LogicalOp::Not => eval_node(graph, event, children[0] as usize, buf).inverted(),
        },
    };

    buf.states[index] = state;
    state
}
