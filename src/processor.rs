//! Multi-source event processing with hot-swappable configurations.
//!
//! This module provides the main `Processor` struct that owns the
//! `source_id -> Configuration` registry, decodes raw event records, runs
//! them through every active matcher graph and forwards matches to a sink.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{info, warn};
use rayon::prelude::*;

use crate::config::ConfigDocument;
use crate::error::BuildError;
use crate::event::Event;
use crate::graph::{
    evaluate, resolve_targets, EvalBuffer, GraphBuilder, MatchState, MatcherGraph, MatcherIndex,
};
use crate::sink::{MatchSink, MatchedEvent};

/// One compiled, immutable matcher configuration.
///
/// Replacing a source's configuration swaps the whole `Arc`; evaluations
/// that started against the previous revision keep their snapshot and
/// finish undisturbed.
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Source this configuration was registered under.
    pub source_id: String,
    /// Monotonic per-source revision, starting at 1.
    pub revision: u64,
    /// The compiled matcher graph.
    pub graph: Arc<MatcherGraph>,
    /// Indices of the matchers whose verdicts are forwarded to the sink.
    pub targets: Vec<MatcherIndex>,
}

/// Outcome of a single-shot [`Processor::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryVerdict {
    Matched,
    NotMatched,
    /// No configuration is registered under the source id.
    UnknownConfig,
    /// The configuration has no matcher with the requested name.
    UnknownTarget,
}

/// Point-in-time snapshot of processor counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessorStats {
    /// Records decoded and dispatched.
    pub events_processed: u64,
    /// Records dropped because they failed to decode.
    pub decode_failures: u64,
    /// Matches delivered to the sink.
    pub matches_forwarded: u64,
    /// Matches the sink rejected.
    pub sink_failures: u64,
    /// Configurations skipped by the category prefilter.
    pub configs_skipped: u64,
}

impl ProcessorStats {
    /// Total records offered to the processor, decodable or not.
    pub fn records_seen(&self) -> u64 {
        self.events_processed + self.decode_failures
    }
}

#[derive(Debug, Default)]
struct Counters {
    events_processed: AtomicU64,
    decode_failures: AtomicU64,
    matches_forwarded: AtomicU64,
    sink_failures: AtomicU64,
    configs_skipped: AtomicU64,
}

/// Event-matching service over a set of named configurations.
///
/// The processor decodes raw records, evaluates each decoded event against
/// every active configuration whose category filter covers it, and forwards
/// each matched target to the sink. Configuration updates are atomic: a
/// failed update leaves the previous revision in place, a successful one
/// replaces it for all subsequent events.
///
/// # Examples
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use matchgate::{Processor, VecSink};
///
/// let sink = Arc::new(VecSink::new());
/// let processor = Processor::new(sink.clone());
///
/// let revision = processor.update_config("app", config_yaml)?;
/// processor.on_event(&record);
///
/// for matched in sink.take() {
///     println!("{} matched {}", matched.source_id, matched.target_name);
/// }
/// ```
pub struct Processor {
    configs: RwLock<HashMap<String, Arc<Configuration>>>,
    sink: Arc<dyn MatchSink>,
    counters: Counters,
}

impl Processor {
    /// Creates a processor with no configurations, delivering to `sink`.
    pub fn new(sink: Arc<dyn MatchSink>) -> Self {
        Self {
            configs: RwLock::new(HashMap::new()),
            sink,
            counters: Counters::default(),
        }
    }

    /// Parses, builds and activates a configuration for `source_id`.
    ///
    /// Returns the new revision on success. On any parse or build failure
    /// the error is logged and returned, and the previously active
    /// configuration (if any) stays in effect.
    pub fn update_config(&self, source_id: &str, bytes: &[u8]) -> Result<u64, BuildError> {
        let (graph, targets) = match Self::build_graph(bytes) {
            Ok(parts) => parts,
            Err(err) => {
                warn!("rejected configuration update for source '{source_id}': {err}");
                return Err(err);
            }
        };

        let mut configs = self.write_configs();
        let revision = configs.get(source_id).map_or(0, |c| c.revision) + 1;
        configs.insert(
            source_id.to_string(),
            Arc::new(Configuration {
                source_id: source_id.to_string(),
                revision,
                graph: Arc::new(graph),
                targets,
            }),
        );
        drop(configs);

        info!("activated configuration for source '{source_id}' at revision {revision}");
        Ok(revision)
    }

    /// Removes the configuration for `source_id`, if one is registered.
    ///
    /// A later re-registration starts again at revision 1.
    pub fn remove_config(&self, source_id: &str) -> bool {
        let removed = self.write_configs().remove(source_id).is_some();
        if removed {
            info!("removed configuration for source '{source_id}'");
        }
        removed
    }

    /// Decodes one raw record and runs it through every active configuration.
    ///
    /// Never returns an error to the stream: undecodable records are logged,
    /// counted and dropped, and sink failures are logged and counted without
    /// aborting delivery for the remaining configurations.
    pub fn on_event(&self, raw: &[u8]) {
        let event = match self.decode_record(raw) {
            Some(event) => event,
            None => return,
        };
        let configs = self.snapshot();
        let mut buffers = Self::buffers_for(&configs);
        self.dispatch(&event, &configs, &mut buffers);
    }

    /// Decodes and dispatches a batch of records across the rayon pool.
    ///
    /// Each worker reuses one evaluation buffer per configuration across
    /// its share of the batch. Per-record semantics are identical to
    /// [`Processor::on_event`].
    pub fn process_batch(&self, records: &[Vec<u8>]) {
        let configs = self.snapshot();
        records.par_iter().for_each_init(
            || Self::buffers_for(&configs),
            |buffers, raw| {
                if let Some(event) = self.decode_record(raw) {
                    self.dispatch(&event, &configs, buffers);
                }
            },
        );
    }

    /// Evaluates one event against one named matcher, bypassing the
    /// category prefilter.
    pub fn query(&self, source_id: &str, target: &str, event: &Event) -> QueryVerdict {
        let config = match self.read_configs().get(source_id) {
            Some(config) => Arc::clone(config),
            None => return QueryVerdict::UnknownConfig,
        };
        let index = match config.graph.index_of(target) {
            Some(index) => index,
            None => return QueryVerdict::UnknownTarget,
        };

        let mut buf = EvalBuffer::for_graph(&config.graph);
        match evaluate(&config.graph, event, index, &mut buf) {
            Ok(MatchState::Matched) => QueryVerdict::Matched,
            _ => QueryVerdict::NotMatched,
        }
    }

    /// Snapshot of the processing counters.
    pub fn stats(&self) -> ProcessorStats {
        ProcessorStats {
            events_processed: self.counters.events_processed.load(Ordering::SeqCst),
            decode_failures: self.counters.decode_failures.load(Ordering::SeqCst),
            matches_forwarded: self.counters.matches_forwarded.load(Ordering::SeqCst),
            sink_failures: self.counters.sink_failures.load(Ordering::SeqCst),
            configs_skipped: self.counters.configs_skipped.load(Ordering::SeqCst),
        }
    }

    /// Source ids with an active configuration, sorted.
    pub fn active_configs(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read_configs().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Current revision for `source_id`, if one is registered.
    pub fn revision(&self, source_id: &str) -> Option<u64> {
        self.read_configs().get(source_id).map(|c| c.revision)
    }

    /// Shared handle to the active configuration for `source_id`.
    ///
    /// The handle stays valid across later updates and removals; it simply
    /// keeps pointing at the revision that was active when it was taken.
    pub fn config(&self, source_id: &str) -> Option<Arc<Configuration>> {
        self.read_configs().get(source_id).map(Arc::clone)
    }

    fn build_graph(bytes: &[u8]) -> Result<(MatcherGraph, Vec<MatcherIndex>), BuildError> {
        let doc = ConfigDocument::parse(bytes)?;
        let graph = GraphBuilder::new(&doc).build()?;
        let targets = resolve_targets(&doc, &graph)?;
        Ok((graph, targets))
    }

    fn decode_record(&self, raw: &[u8]) -> Option<Event> {
        match Event::decode(raw) {
            Ok(event) => {
                self.counters.events_processed.fetch_add(1, Ordering::SeqCst);
                Some(event)
            }
            Err(err) => {
                warn!("dropping undecodable event record: {err}");
                self.counters.decode_failures.fetch_add(1, Ordering::SeqCst);
                None
            }
        }
    }

    fn snapshot(&self) -> Vec<Arc<Configuration>> {
        self.read_configs().values().map(Arc::clone).collect()
    }

    fn buffers_for(configs: &[Arc<Configuration>]) -> Vec<EvalBuffer> {
        configs
            .iter()
            .map(|config| EvalBuffer::for_graph(&config.graph))
            .collect()
    }

    // Runs after the registry lock has been released; only the Arc
    // snapshot is touched from here on.
    fn dispatch(&self, event: &Event, configs: &[Arc<Configuration>], buffers: &mut [EvalBuffer]) {
        for (config, buf) in configs.iter().zip(buffers.iter_mut()) {
            if !config.graph.covers_category(event.category_id) {
                self.counters.configs_skipped.fetch_add(1, Ordering::SeqCst);
                continue;
            }
            buf.reset();
            self.evaluate_and_forward(config, event, buf);
        }
    }

    fn evaluate_and_forward(&self, config: &Configuration, event: &Event, buf: &mut EvalBuffer) {
        let mut matched: Vec<MatcherIndex> = Vec::new();
        for &target in &config.targets {
            match evaluate(&config.graph, event, target, buf) {
                Ok(MatchState::Matched) => matched.push(target),
                Ok(_) => {}
                Err(err) => {
                    // Targets are resolved against this graph at build
                    // time, so an invalid index cannot reach here.
                    warn!(
                        "skipping target {target} for source '{}': {err}",
                        config.source_id
                    );
                }
            }
        }

        // Sink writes start only after this configuration's evaluation
        // has completed.
        for &target in &matched {
            let target_name = config.graph.nodes[target as usize].name.as_str();
            let delivery = self.sink.accept(&MatchedEvent {
                source_id: &config.source_id,
                target_index: target,
                target_name,
                event,
            });
            match delivery {
                Ok(()) => {
                    self.counters.matches_forwarded.fetch_add(1, Ordering::SeqCst);
                }
                Err(err) => {
                    warn!(
                        "sink rejected match for source '{}' target '{target_name}': {err}",
                        config.source_id
                    );
                    self.counters.sink_failures.fetch_add(1, Ordering::SeqCst);
                }
            }
        }
    }

    // Registry entries are replaced or removed whole, so the map is
    // consistent even if a writer panicked mid-update.
    fn read_configs(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Configuration>>> {
        match self.configs.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_configs(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Configuration>>> {
        match self.configs.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
