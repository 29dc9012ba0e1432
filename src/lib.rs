//! # matchgate
//!
//! A telemetry event-matching engine. Matcher graphs are compiled from
//! YAML configurations, one graph per event source, and evaluated against
//! a stream of binary event records; every matched target is forwarded to
//! a pluggable sink.
//!
//! ## Quick Start
//!
//! ### Stream Processing
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use matchgate::{Processor, VecSink};
//!
//! let config_yaml = br#"
//! matchers:
//!   - name: M_login
//!     match:
//!       categories: [42]
//!       fields:
//!         - { position: 0, op: eq, value: "login" }
//!   - name: M_big
//!     match:
//!       categories: [42]
//!       fields:
//!         - { position: 1, op: gt, value: 5 }
//!   - name: M_target
//!     all_of: [M_login, M_big]
//! targets: [M_target]
//! "#;
//!
//! let sink = Arc::new(VecSink::new());
//! let processor = Processor::new(sink.clone());
//! processor.update_config("app", config_yaml)?;
//!
//! // Feed raw records; matches land in the sink.
//! processor.on_event(&record);
//! for matched in sink.take() {
//!     println!("{} matched {}", matched.source_id, matched.target_name);
//! }
//! # Ok::<(), matchgate::EngineError>(())
//! ```
//!
//! ### Direct Graph Evaluation
//!
//! ```rust,ignore
//! use matchgate::{evaluate, ConfigDocument, EvalBuffer, GraphBuilder};
//!
//! let doc = ConfigDocument::parse(config_yaml)?;
//! let graph = GraphBuilder::new(&doc).build()?;
//!
//! let mut buf = EvalBuffer::for_graph(&graph);
//! let state = evaluate(&graph, &event, target_index, &mut buf)?;
//! # Ok::<(), matchgate::EngineError>(())
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod graph;
pub mod processor;
pub mod sink;

// Primary processing interface
pub use processor::{Configuration, Processor, ProcessorStats, QueryVerdict};

// Event model
pub use event::{Event, FieldValue};

// Configuration documents
pub use config::{ConfigDocument, FieldDef, FieldOpKind, MatcherBody, MatcherDef, ScalarValue, SimpleDef};

// Core types and errors
pub use error::{BuildError, DecodeError, EncodeError, EngineError, EvalError, Result, SinkError};

// Matcher graph (for direct evaluation and inspection)
pub use graph::{
    evaluate, resolve_targets, EvalBuffer, FieldPredicate, GraphBuilder, GraphStats, LogicalOp,
    MatchState, MatcherGraph, MatcherIndex, MatcherKind, MatcherNode, PredicateOp,
};

// Sinks
pub use sink::{JsonLinesSink, MatchSink, MatchedEvent, OwnedMatch, VecSink};
