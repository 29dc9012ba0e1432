//! Core matcher graph types.

use std::collections::{HashMap, HashSet};

use crate::graph::predicate::FieldPredicate;

/// Dense index of a matcher node, assigned at build time.
pub type MatcherIndex = u32;

/// Logical operations supported by combination matchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

/// The two node kinds of a matcher graph.
#[derive(Debug, Clone)]
pub enum MatcherKind {
    /// Leaf matcher: category gate plus conjoined field predicates.
    Simple {
        category_ids: HashSet<u32>,
        predicates: Vec<FieldPredicate>,
    },

    /// Internal matcher combining other matchers by index.
    ///
    /// Children may carry a higher index than their parent; declaration
    /// order is not topological.
    Combination {
        op: LogicalOp,
        children: Vec<MatcherIndex>,
    },
}

/// One node of the matcher graph.
#[derive(Debug, Clone)]
pub struct MatcherNode {
    pub index: MatcherIndex,
    pub name: String,
    pub kind: MatcherKind,
}

impl MatcherNode {
    pub fn new(index: MatcherIndex, name: impl Into<String>, kind: MatcherKind) -> Self {
        Self {
            index,
            name: name.into(),
            kind,
        }
    }

    pub fn is_simple(&self) -> bool {
        matches!(self.kind, MatcherKind::Simple { .. })
    }

    pub fn is_combination(&self) -> bool {
        matches!(self.kind, MatcherKind::Combination { .. })
    }
}

/// Per-event evaluation state of one matcher.
///
/// Every buffer slot starts a pass as `NotComputed` and settles to
/// `Matched` or `NotMatched` the first time its node is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchState {
    #[default]
    NotComputed,
    Matched,
    NotMatched,
}

impl MatchState {
    pub const fn from_bool(matched: bool) -> Self {
        if matched {
            MatchState::Matched
        } else {
            MatchState::NotMatched
        }
    }

    /// `Some(true)` for `Matched`, `Some(false)` for `NotMatched`.
    pub const fn as_bool(self) -> Option<bool> {
        match self {
            MatchState::NotComputed => None,
            MatchState::Matched => Some(true),
            MatchState::NotMatched => Some(false),
        }
    }

    /// Swaps `Matched` and `NotMatched`; `NotComputed` stays put.
    pub const fn inverted(self) -> Self {
        match self {
            MatchState::Matched => MatchState::NotMatched,
            MatchState::NotMatched => MatchState::Matched,
            MatchState::NotComputed => MatchState::NotComputed,
        }
    }
}

/// Immutable matcher graph, built once per configuration revision.
///
/// Safe for concurrent evaluation: readers share the graph behind an `Arc`
/// and keep all mutable per-event state in their own
/// [`EvalBuffer`](crate::graph::EvalBuffer).
#[derive(Debug, Clone)]
pub struct MatcherGraph {
    /// All nodes, indexed by `MatcherIndex`.
    pub nodes: Vec<MatcherNode>,

    /// Configured name of each matcher to its index.
    pub name_to_index: HashMap<String, MatcherIndex>,

    /// Union of every simple matcher's category ids. An event whose
    /// category is absent from this set cannot match any node.
    pub category_filter: HashSet<u32>,
}

impl MatcherGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Gets a node by its index.
    pub fn node(&self, index: MatcherIndex) -> Option<&MatcherNode> {
        self.nodes.get(index as usize)
    }

    /// Resolves a configured matcher name to its index.
    pub fn index_of(&self, name: &str) -> Option<MatcherIndex> {
        self.name_to_index.get(name).copied()
    }

    /// True when at least one simple matcher lists this category.
    pub fn covers_category(&self, category_id: u32) -> bool {
        self.category_filter.contains(&category_id)
    }

    /// Structure statistics for logging and inspection.
    pub fn stats(&self) -> GraphStats {
        GraphStats::from_graph(self)
    }
}

/// Statistics about graph structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub simple_nodes: usize,
    pub combination_nodes: usize,
    /// Longest path from any node down to a leaf, in nodes.
    pub max_depth: usize,
    /// Nodes referenced by more than one combination.
    pub shared_nodes: usize,
    pub category_count: usize,
}

impl GraphStats {
    pub fn from_graph(graph: &MatcherGraph) -> Self {
        let mut simple_nodes = 0;
        let mut combination_nodes = 0;
        let mut reference_counts = vec![0usize; graph.node_count()];

        for node in &graph.nodes {
            match &node.kind {
                MatcherKind::Simple { .. } => simple_nodes += 1,
                MatcherKind::Combination { children, .. } => {
                    combination_nodes += 1;
                    for &child in children {
                        if let Some(count) = reference_counts.get_mut(child as usize) {
                            *count += 1;
                        }
                    }
                }
            }
        }

        let shared_nodes = reference_counts.iter().filter(|&&count| count > 1).count();

        let mut depths: Vec<Option<usize>> = vec![None; graph.node_count()];
        let max_depth = (0..graph.node_count())
            .map(|i| Self::depth_of(graph, i, &mut depths))
            .max()
            .unwrap_or(0);

        Self {
            total_nodes: graph.node_count(),
            simple_nodes,
            combination_nodes,
            max_depth,
            shared_nodes,
            category_count: graph.category_filter.len(),
        }
    }

    // Memoized DFS; the builder guarantees acyclicity before a graph exists.
    fn depth_of(graph: &MatcherGraph, index: usize, depths: &mut Vec<Option<usize>>) -> usize {
        if let Some(Some(depth)) = depths.get(index) {
            return *depth;
        }
        let depth = match graph.nodes.get(index).map(|node| &node.kind) {
            Some(MatcherKind::Combination { children, .. }) => {
                1 + children
                    .iter()
                    .map(|&child| Self::depth_of(graph, child as usize, depths))
                    .max()
                    .unwrap_or(0)
            }
            _ => 1,
        };
        if let Some(slot) = depths.get_mut(index) {
            *slot = Some(depth);
        }
        depth
    }
}
