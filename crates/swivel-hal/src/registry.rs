//! `SourceRegistry` – registered offset sources and summed polling.
//!
//! The registry stores every [`OffsetSource`] together with a per-source
//! enable flag.  At each tick the motion loop calls
//! [`SourceRegistry::poll_enabled`], which polls every enabled source and
//! sums the valid samples into one combined offset.

use std::time::Duration;

use swivel_types::{PoseOffset, SwivelError};
use tracing::debug;

use crate::source::OffsetSource;

struct SourceEntry {
    source: Box<dyn OffsetSource>,
    enabled: bool,
}

/// Result of polling the registry for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolledOffsets {
    /// Sum of all valid, enabled source offsets.
    pub combined: PoseOffset,
    /// Number of sources that contributed.
    pub contributing: usize,
    /// Age of the stalest contributing sample.
    pub max_staleness: Duration,
}

/// Registered offset sources with per-source enable flags.
///
/// Registration order is preserved; polling is O(sources) with no blocking
/// beyond each source's bounded `poll`.
#[derive(Default)]
pub struct SourceRegistry {
    entries: Vec<SourceEntry>,
}

impl SourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source, enabled by default.  A source with a duplicate id
    /// replaces the earlier registration.
    pub fn register(&mut self, source: Box<dyn OffsetSource>) {
        let id = source.source_id().to_string();
        self.entries.retain(|e| e.source.source_id() != id);
        self.entries.push(SourceEntry {
            source,
            enabled: true,
        });
    }

    /// Enable or disable a source by id.
    ///
    /// # Errors
    ///
    /// Returns [`SwivelError::SourceFault`] for unknown ids.
    pub fn set_enabled(&mut self, source_id: &str, enabled: bool) -> Result<(), SwivelError> {
        match self
            .entries
            .iter_mut()
            .find(|e| e.source.source_id() == source_id)
        {
            Some(entry) => {
                debug!(source_id, enabled, "offset source toggled");
                entry.enabled = enabled;
                Ok(())
            }
            None => Err(SwivelError::SourceFault {
                source_id: source_id.to_string(),
                details: "not registered".to_string(),
            }),
        }
    }

    /// `true` if the source exists and is enabled.
    pub fn is_enabled(&self, source_id: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.source.source_id() == source_id && e.enabled)
    }

    /// Registered source ids, in registration order.
    pub fn source_ids(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.source.source_id().to_string())
            .collect()
    }

    /// Poll every enabled source and sum the valid samples.
    pub fn poll_enabled(&self) -> PolledOffsets {
        let mut combined = PoseOffset::ZERO;
        let mut contributing = 0;
        let mut max_staleness = Duration::ZERO;
        for entry in self.entries.iter().filter(|e| e.enabled) {
            let sample = entry.source.poll();
            if !sample.valid {
                continue;
            }
            combined = combined.add(&sample.offset);
            contributing += 1;
            max_staleness = max_staleness.max(sample.published_at.elapsed());
        }
        PolledOffsets {
            combined,
            contributing,
            max_staleness,
        }
    }
}
