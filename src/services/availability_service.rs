use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::event::EventRecord;
use crate::services::rule_evaluators;
use crate::services::schedule_utils;

const SLOT_GRID_STEP_MINUTES: i64 = 60;
const MAX_SLOT_SUGGESTIONS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySlot {
    pub start_at: String,
    pub end_at: String,
    pub available: bool,
}

/// A participant's existing appointment blocking a candidate slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantConflict {
    pub participant: String,
    pub appointment_id: String,
    pub appointment_title: String,
    pub start_at: String,
    pub end_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityReport {
    pub slots: Vec<AvailabilitySlot>,
    pub conflicts: Vec<ParticipantConflict>,
    /// The first few available slots, ready to offer as-is
    pub suggestions: Vec<AvailabilitySlot>,
}

/// Walk an hourly grid across the range and mark each candidate slot
/// against the named participants' appointments. Appointments are
/// matched to participants by client name. Slot boundaries routinely
/// touch appointment boundaries on a fixed grid, so the overlap test
/// here is strict.
pub fn check_participant_availability(
    participants: &[String],
    range_start: DateTime<FixedOffset>,
    range_end: DateTime<FixedOffset>,
    slot_duration_minutes: i64,
    appointments: &[EventRecord],
) -> AvailabilityReport {
    let mut slots = Vec::new();
    let mut conflicts = Vec::new();

    let mut cursor = range_start;
    while cursor + Duration::minutes(slot_duration_minutes) <= range_end {
        let slot_end = cursor + Duration::minutes(slot_duration_minutes);
        let mut available = true;

        for appointment in appointments {
            let participant = match appointment.client_name.as_ref() {
                Some(name) if participants.contains(name) => name,
                _ => continue,
            };
            let (a_start, a_end) = match rule_evaluators::event_span(appointment) {
                Some(span) => span,
                None => continue,
            };
            if schedule_utils::overlaps(cursor, slot_end, a_start, a_end, false) {
                available = false;
                conflicts.push(ParticipantConflict {
                    participant: participant.clone(),
                    appointment_id: appointment.id.clone(),
                    appointment_title: appointment.title.clone(),
                    start_at: schedule_utils::format_datetime(a_start),
                    end_at: schedule_utils::format_datetime(a_end),
                });
            }
        }

        slots.push(AvailabilitySlot {
            start_at: schedule_utils::format_datetime(cursor),
            end_at: schedule_utils::format_datetime(slot_end),
            available,
        });
        cursor += Duration::minutes(SLOT_GRID_STEP_MINUTES);
    }

    let suggestions: Vec<AvailabilitySlot> = slots
        .iter()
        .filter(|slot| slot.available)
        .take(MAX_SLOT_SUGGESTIONS)
        .cloned()
        .collect();

    debug!(
        target: "engine::availability",
        participants = participants.len(),
        slots = slots.len(),
        conflicts = conflicts.len(),
        "availability probe finished"
    );

    AvailabilityReport {
        slots,
        conflicts,
        suggestions,
    }
}
