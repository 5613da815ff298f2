use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use tracing::debug;

use crate::error::EngineResult;
use crate::models::config::ConflictDetectionConfig;
use crate::models::conflict::{ConflictDetail, ConflictResult};
use crate::models::event::EventRecord;
use crate::services::resolution_planner;
use crate::services::rule_evaluators;
use crate::services::schedule_utils;

/// External collaborator that tracks which conflicts the user has already
/// acknowledged out of band. Only the async entry point consults it.
#[async_trait]
pub trait ResolutionTracker: Send + Sync {
    /// Drop findings the user has resolved, returning the remainder
    async fn filter_resolved(
        &self,
        conflicts: Vec<ConflictDetail>,
    ) -> EngineResult<Vec<ConflictDetail>>;
}

/// Conflict detection engine. Holds the active configuration; everything
/// else is supplied per call, so identical inputs give identical results.
pub struct ConflictService {
    config: RwLock<Arc<ConflictDetectionConfig>>,
}

impl Default for ConflictService {
    fn default() -> Self {
        Self {
            config: RwLock::new(Arc::new(ConflictDetectionConfig::default())),
        }
    }
}

impl ConflictService {
    pub fn new(config: ConflictDetectionConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            config: RwLock::new(Arc::new(config)),
        })
    }

    /// Snapshot of the active configuration. Each detection call reads
    /// the snapshot once up front, so a concurrent replace is only
    /// observed by later calls.
    pub fn config(&self) -> Arc<ConflictDetectionConfig> {
        match self.config.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Swap in a new configuration wholesale; readers see either the old
    /// or the new object in full, never a mix.
    pub fn replace_config(&self, config: ConflictDetectionConfig) -> EngineResult<()> {
        config.validate()?;
        debug!(target: "engine::config", rules = config.rules.len(), "replacing active configuration");
        let next = Arc::new(config);
        match self.config.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
        Ok(())
    }

    /// Check a proposed event against a snapshot of existing events.
    pub fn detect_conflicts(
        &self,
        proposed: &EventRecord,
        existing: &[EventRecord],
    ) -> ConflictResult {
        let config = self.config();
        debug!(
            target: "engine::conflicts",
            event_id = %proposed.id,
            existing = existing.len(),
            "running conflict detection"
        );

        let conflicts = rule_evaluators::run_rules(&config, proposed, existing);
        let suggestions =
            resolution_planner::generate_suggestions(proposed, &conflicts, existing, &config);

        debug!(
            target: "engine::conflicts",
            event_id = %proposed.id,
            conflicts = conflicts.len(),
            suggestions = suggestions.len(),
            "conflict detection finished"
        );

        ConflictResult::new(conflicts, suggestions)
    }

    /// Like [`detect_conflicts`](Self::detect_conflicts), but drops
    /// findings the tracker reports as already acknowledged, then
    /// regenerates suggestions from what remains. Detection always runs
    /// to completion before the tracker is consulted.
    pub async fn detect_conflicts_with_resolutions(
        &self,
        proposed: &EventRecord,
        existing: &[EventRecord],
        tracker: &dyn ResolutionTracker,
    ) -> EngineResult<ConflictResult> {
        let config = self.config();
        let conflicts = rule_evaluators::run_rules(&config, proposed, existing);
        let found = conflicts.len();

        let remaining = tracker.filter_resolved(conflicts).await?;
        debug!(
            target: "engine::conflicts",
            event_id = %proposed.id,
            found,
            remaining = remaining.len(),
            "resolved conflicts filtered"
        );

        let suggestions =
            resolution_planner::generate_suggestions(proposed, &remaining, existing, &config);
        Ok(ConflictResult::new(remaining, suggestions))
    }

    /// Preview a drag/resize: check the event at its new times with the
    /// original excluded, so an event never conflicts with itself.
    pub fn check_drag_conflicts(
        &self,
        event: &EventRecord,
        new_start: DateTime<FixedOffset>,
        new_end: DateTime<FixedOffset>,
        existing: &[EventRecord],
    ) -> ConflictResult {
        let mut moved = event.clone();
        moved.start_at = Some(schedule_utils::format_datetime(new_start));
        moved.end_at = Some(schedule_utils::format_datetime(new_end));
        moved.duration_minutes = Some(schedule_utils::duration_minutes(new_start, new_end));

        let others: Vec<EventRecord> = existing
            .iter()
            .filter(|candidate| candidate.id != event.id)
            .cloned()
            .collect();

        self.detect_conflicts(&moved, &others)
    }

    /// Pairwise check of a batch: each event is evaluated against all the
    /// others. Quadratic, which is fine for the day- or week-sized
    /// batches this is meant for.
    pub fn detect_batch_conflicts(
        &self,
        events: &[EventRecord],
    ) -> BTreeMap<String, ConflictResult> {
        let mut results = BTreeMap::new();
        for (index, event) in events.iter().enumerate() {
            let others: Vec<EventRecord> = events
                .iter()
                .enumerate()
                .filter(|(other_index, _)| *other_index != index)
                .map(|(_, other)| other.clone())
                .collect();
            results.insert(event.id.clone(), self.detect_conflicts(event, &others));
        }
        results
    }
}
