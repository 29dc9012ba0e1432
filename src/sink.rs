//! Delivery of match results to downstream consumers.
//!
//! A [`MatchSink`] receives one [`MatchedEvent`] per target that matched an
//! event. Sinks are shared across worker threads, so implementations guard
//! their own interior state. The processor calls sinks only after it has
//! finished evaluating a configuration and released every lock, so a slow
//! sink stalls delivery but never configuration updates.

use std::io::Write;
use std::sync::Mutex;

use serde::Serialize;

use crate::error::SinkError;
use crate::event::Event;
use crate::graph::MatcherIndex;

/// Borrowed view of a single target match, valid for the duration of one
/// [`MatchSink::accept`] call.
#[derive(Debug, Clone, Serialize)]
pub struct MatchedEvent<'a> {
    /// Configuration that produced the match.
    pub source_id: &'a str,
    /// Index of the matched target in its graph.
    pub target_index: MatcherIndex,
    /// Name of the matched target.
    pub target_name: &'a str,
    /// The event that matched.
    pub event: &'a Event,
}

impl MatchedEvent<'_> {
    /// Copies the borrowed match into an [`OwnedMatch`].
    pub fn to_owned(&self) -> OwnedMatch {
        OwnedMatch {
            source_id: self.source_id.to_string(),
            target_index: self.target_index,
            target_name: self.target_name.to_string(),
            event: self.event.clone(),
        }
    }
}

/// Owned copy of a match, for sinks that buffer past the accept call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnedMatch {
    pub source_id: String,
    pub target_index: MatcherIndex,
    pub target_name: String,
    pub event: Event,
}

/// Consumer of match results.
///
/// `accept` runs on the thread that processed the event and may be called
/// concurrently from several threads. Errors are counted and logged by the
/// processor; they never abort event processing.
pub trait MatchSink: Send + Sync {
    fn accept(&self, matched: &MatchedEvent<'_>) -> Result<(), SinkError>;
}

/// Sink that collects matches in memory.
#[derive(Debug, Default)]
pub struct VecSink {
    matches: Mutex<Vec<OwnedMatch>>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains and returns everything collected so far.
    pub fn take(&self) -> Vec<OwnedMatch> {
        match self.matches.lock() {
            Ok(mut matches) => std::mem::take(&mut *matches),
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.matches.lock().map(|matches| matches.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MatchSink for VecSink {
    fn accept(&self, matched: &MatchedEvent<'_>) -> Result<(), SinkError> {
        let mut matches = self
            .matches
            .lock()
            .map_err(|_| SinkError::new("match buffer lock poisoned"))?;
        matches.push(matched.to_owned());
        Ok(())
    }
}

/// Sink that writes one JSON object per line to a writer.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: Mutex<W>,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Unwraps the sink, returning the underlying writer.
    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> MatchSink for JsonLinesSink<W> {
    fn accept(&self, matched: &MatchedEvent<'_>) -> Result<(), SinkError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| SinkError::new("writer lock poisoned"))?;
        serde_json::to_writer(&mut *writer, matched)?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}
