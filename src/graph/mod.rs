//! Matcher graph compilation and evaluation.
//!
//! A [`MatcherGraph`] is a flat, index-addressed collection of matcher nodes
//! built once from a parsed [`ConfigDocument`](crate::config::ConfigDocument)
//! and then shared immutably. Simple nodes test one event directly;
//! combination nodes apply AND, OR, or NOT over other nodes by index, with
//! references in either direction. Evaluation is recursive, memoized per
//! event through a caller-owned [`EvalBuffer`].
//!
//! # Example
//!
//! ```rust,ignore
//! use matchgate::config::ConfigDocument;
//! use matchgate::graph::{evaluate, EvalBuffer, GraphBuilder};
//!
//! let doc = ConfigDocument::parse(yaml_bytes)?;
//! let graph = GraphBuilder::new(&doc).build()?;
//!
//! let mut buf = EvalBuffer::for_graph(&graph);
//! let state = evaluate(&graph, &event, target_index, &mut buf)?;
//! ```

pub mod builder;
pub mod evaluator;
pub mod predicate;
pub mod types;

// Re-export main types for convenience
pub use builder::{resolve_targets, GraphBuilder};
pub use evaluator::{evaluate, EvalBuffer};
pub use predicate::{FieldPredicate, PredicateOp};
pub use types::{
    GraphStats, LogicalOp, MatchState, MatcherGraph, MatcherIndex, MatcherKind, MatcherNode,
};
