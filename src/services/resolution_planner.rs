use std::cmp::Ordering;

use chrono::Duration;
use tracing::debug;

use crate::models::config::ConflictDetectionConfig;
use crate::models::conflict::{
    AlternativeSlot, ConflictDetail, ConflictSeverity, ResolutionStrategy, ResolutionSuggestion,
};
use crate::models::event::EventRecord;
use crate::services::rule_evaluators;
use crate::services::schedule_utils;

const SLOT_SEARCH_STEP_MINUTES: i64 = 30;
const SLOT_SEARCH_RANGE_MINUTES: i64 = 120;
const MAX_ALTERNATIVE_SLOTS: usize = 3;

/// Propose remediation strategies for a set of findings. Nothing is
/// committed; the host picks a strategy and re-invokes or applies it.
pub fn generate_suggestions(
    proposed: &EventRecord,
    conflicts: &[ConflictDetail],
    existing: &[EventRecord],
    config: &ConflictDetectionConfig,
) -> Vec<ResolutionSuggestion> {
    if conflicts.is_empty() {
        return Vec::new();
    }

    let mut suggestions = Vec::new();

    suggestions.push(ResolutionSuggestion {
        strategy: ResolutionStrategy::Cancel,
        description: format!("Cancel \"{}\"", proposed.title),
        alternative_slots: None,
        estimated_impact: "Existing calendar stays unchanged".to_string(),
        requires_client_notification: false,
    });

    let has_critical = conflicts
        .iter()
        .any(|conflict| conflict.severity == ConflictSeverity::Critical);
    if !has_critical {
        suggestions.push(ResolutionSuggestion {
            strategy: ResolutionStrategy::Allow,
            description: format!("Keep \"{}\" despite the conflicts", proposed.title),
            alternative_slots: None,
            estimated_impact: format!("{} conflict(s) remain on the calendar", conflicts.len()),
            requires_client_notification: false,
        });
    }

    let alternatives = find_alternative_slots(proposed, existing, config);
    if !alternatives.is_empty() {
        suggestions.push(ResolutionSuggestion {
            strategy: ResolutionStrategy::Reschedule,
            description: format!("Move \"{}\" to a nearby free slot", proposed.title),
            estimated_impact: format!(
                "{} conflict-free slot(s) within two hours",
                alternatives.len()
            ),
            requires_client_notification: true,
            alternative_slots: Some(alternatives),
        });
    }

    debug!(
        target: "engine::resolution",
        event_id = %proposed.id,
        suggestions = suggestions.len(),
        "suggestions generated"
    );

    suggestions
}

/// Probe same-duration windows at 30-minute offsets within two hours of
/// the proposed start. Candidates go through the conflicts-only rule
/// evaluation, never back through suggestion generation, so the search
/// cannot recurse.
pub fn find_alternative_slots(
    proposed: &EventRecord,
    existing: &[EventRecord],
    config: &ConflictDetectionConfig,
) -> Vec<AlternativeSlot> {
    let (p_start, p_end) = match rule_evaluators::event_span(proposed) {
        Some(span) => span,
        None => return Vec::new(),
    };
    let duration = schedule_utils::duration_minutes(p_start, p_end);

    let mut candidates = Vec::new();
    let mut offset = -SLOT_SEARCH_RANGE_MINUTES;
    while offset <= SLOT_SEARCH_RANGE_MINUTES {
        if offset == 0 {
            offset += SLOT_SEARCH_STEP_MINUTES;
            continue;
        }

        let slot_start = p_start + Duration::minutes(offset);
        let slot_end = slot_start + Duration::minutes(duration);

        let mut candidate = proposed.clone();
        candidate.start_at = Some(schedule_utils::format_datetime(slot_start));
        candidate.end_at = Some(schedule_utils::format_datetime(slot_end));
        candidate.duration_minutes = Some(duration);

        if !rule_evaluators::has_any_conflict(config, &candidate, existing) {
            let offset_hours = offset.abs() as f64 / 60.0;
            candidates.push(AlternativeSlot {
                start_at: schedule_utils::format_datetime(slot_start),
                end_at: schedule_utils::format_datetime(slot_end),
                confidence: 1.0 - offset_hours / 4.0,
            });
        }

        offset += SLOT_SEARCH_STEP_MINUTES;
    }

    // Stable sort: on equal confidence the earlier offset stays first
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });
    candidates.truncate(MAX_ALTERNATIVE_SLOTS);
    candidates
}
