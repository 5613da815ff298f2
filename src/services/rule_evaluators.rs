use chrono::{DateTime, FixedOffset};
use tracing::warn;

use crate::models::config::{ConflictDetectionConfig, ConflictRule};
use crate::models::conflict::{ConflictDetail, RuleType, TimeOverlap};
use crate::models::event::EventRecord;
use crate::services::schedule_utils;

/// Run every enabled rule in declaration order and concatenate the
/// findings. Within a rule, findings follow existing-event order; the
/// combined list is never re-sorted.
pub fn run_rules(
    config: &ConflictDetectionConfig,
    proposed: &EventRecord,
    existing: &[EventRecord],
) -> Vec<ConflictDetail> {
    let mut findings = Vec::new();
    for rule in config.rules.iter().filter(|rule| rule.enabled) {
        findings.extend(evaluate_rule(rule, proposed, existing, config));
    }
    findings
}

/// Conflicts-only probe for slot searching: stops at the first rule that
/// produces a finding and never builds suggestions.
pub fn has_any_conflict(
    config: &ConflictDetectionConfig,
    proposed: &EventRecord,
    existing: &[EventRecord],
) -> bool {
    config
        .rules
        .iter()
        .filter(|rule| rule.enabled)
        .any(|rule| !evaluate_rule(rule, proposed, existing, config).is_empty())
}

/// Evaluate one rule against the proposed event. Pure in its inputs;
/// events unusable for a comparison are skipped, never fatal.
pub fn evaluate_rule(
    rule: &ConflictRule,
    proposed: &EventRecord,
    existing: &[EventRecord],
    config: &ConflictDetectionConfig,
) -> Vec<ConflictDetail> {
    if !rule_applies(rule, proposed) {
        return Vec::new();
    }

    match rule.rule_type {
        RuleType::TemporalOverlap => evaluate_temporal_overlap(rule, proposed, existing, config),
        RuleType::BufferViolation => evaluate_buffer_violation(rule, proposed, existing, config),
        RuleType::ResourceConflict => evaluate_resource_conflict(rule, proposed, existing),
        RuleType::BusinessRule => evaluate_business_rule(rule, proposed, config),
        RuleType::ClientPreference => evaluate_client_preference(rule, proposed, existing, config),
    }
}

fn rule_applies(rule: &ConflictRule, proposed: &EventRecord) -> bool {
    if let Some(event_types) = rule.applies_to.as_ref() {
        let matches = proposed
            .event_type
            .as_ref()
            .map(|event_type| event_types.contains(event_type))
            .unwrap_or(false);
        if !matches {
            return false;
        }
    }
    if let Some(check) = rule.custom_check {
        if !check(proposed) {
            return false;
        }
    }
    true
}

/// Resolved [start, end) span of an event. A missing or unparseable
/// start disqualifies the event from time comparisons.
pub(crate) fn event_span(
    event: &EventRecord,
) -> Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let raw_start = match event.start_at.as_deref() {
        Some(raw) => raw,
        None => {
            warn!(
                target: "engine::rules",
                event_id = %event.id,
                "event has no start time, skipping time comparisons"
            );
            return None;
        }
    };

    let start = match schedule_utils::parse_datetime_opt(raw_start) {
        Some(dt) => dt,
        None => {
            warn!(
                target: "engine::rules",
                event_id = %event.id,
                start_at = raw_start,
                "event start time is not valid RFC3339, skipping time comparisons"
            );
            return None;
        }
    };

    let end = match event.end_at.as_deref() {
        Some(raw) => match schedule_utils::parse_datetime_opt(raw) {
            Some(dt) => Some(dt),
            None => {
                warn!(
                    target: "engine::rules",
                    event_id = %event.id,
                    end_at = raw,
                    "event end time is not valid RFC3339, falling back to duration"
                );
                None
            }
        },
        None => None,
    };

    Some((
        start,
        schedule_utils::effective_end(start, end, event.duration_minutes),
    ))
}

fn evaluate_temporal_overlap(
    rule: &ConflictRule,
    proposed: &EventRecord,
    existing: &[EventRecord],
    config: &ConflictDetectionConfig,
) -> Vec<ConflictDetail> {
    let (p_start, p_end) = match event_span(proposed) {
        Some(span) => span,
        None => return Vec::new(),
    };

    let mut findings = Vec::new();
    for event in existing {
        let (e_start, e_end) = match event_span(event) {
            Some(span) => span,
            None => continue,
        };
        if !schedule_utils::overlaps(
            p_start,
            p_end,
            e_start,
            e_end,
            config.touching_counts_as_overlap,
        ) {
            continue;
        }

        let (o_start, o_end) = schedule_utils::overlap_window(p_start, p_end, e_start, e_end);
        let minutes = schedule_utils::duration_minutes(o_start, o_end).max(0);
        findings.push(
            ConflictDetail::new(
                format!("{}-{}", rule.id, event.id),
                RuleType::TemporalOverlap,
                rule.severity,
                format!("Overlaps with \"{}\" by {} minutes", event.title, minutes),
                event.clone(),
                proposed.clone(),
            )
            .with_time_overlap(TimeOverlap {
                start_at: schedule_utils::format_datetime(o_start),
                end_at: schedule_utils::format_datetime(o_end),
                duration_minutes: minutes,
            }),
        );
    }
    findings
}

fn evaluate_buffer_violation(
    rule: &ConflictRule,
    proposed: &EventRecord,
    existing: &[EventRecord],
    config: &ConflictDetectionConfig,
) -> Vec<ConflictDetail> {
    let (p_start, p_end) = match event_span(proposed) {
        Some(span) => span,
        None => return Vec::new(),
    };
    let buffer = rule
        .buffer_minutes
        .unwrap_or(config.default_buffer_minutes);

    let mut findings = Vec::new();
    for event in existing {
        let (e_start, e_end) = match event_span(event) {
            Some(span) => span,
            None => continue,
        };

        // Before and after are independent checks: a proposed event can be
        // squeezed by one neighbor on each side.
        if e_end <= p_start {
            let gap = schedule_utils::duration_minutes(e_end, p_start);
            if gap < buffer {
                findings.push(ConflictDetail::new(
                    format!("{}-{}-before", rule.id, event.id),
                    RuleType::BufferViolation,
                    rule.severity,
                    format!(
                        "Only {} minutes after \"{}\" ends; {} minutes required",
                        gap, event.title, buffer
                    ),
                    event.clone(),
                    proposed.clone(),
                ));
            }
        }

        if e_start >= p_end {
            let gap = schedule_utils::duration_minutes(p_end, e_start);
            if gap < buffer {
                findings.push(ConflictDetail::new(
                    format!("{}-{}-after", rule.id, event.id),
                    RuleType::BufferViolation,
                    rule.severity,
                    format!(
                        "Only {} minutes before \"{}\" starts; {} minutes required",
                        gap, event.title, buffer
                    ),
                    event.clone(),
                    proposed.clone(),
                ));
            }
        }
    }
    findings
}

fn evaluate_resource_conflict(
    rule: &ConflictRule,
    proposed: &EventRecord,
    existing: &[EventRecord],
) -> Vec<ConflictDetail> {
    let mut findings = Vec::new();
    for event in existing {
        let mut matched = Vec::new();
        if let (Some(proposed_client), Some(event_client)) =
            (proposed.client_name.as_ref(), event.client_name.as_ref())
        {
            if proposed_client == event_client {
                matched.push(format!("Client: {}", proposed_client));
            }
        }
        if let (Some(proposed_location), Some(event_location)) =
            (proposed.location.as_ref(), event.location.as_ref())
        {
            if proposed_location == event_location {
                matched.push(format!("Location: {}", proposed_location));
            }
        }
        if matched.is_empty() {
            continue;
        }

        findings.push(
            ConflictDetail::new(
                format!("{}-{}", rule.id, event.id),
                RuleType::ResourceConflict,
                rule.severity,
                format!("Shares {} with \"{}\"", matched.join(", "), event.title),
                event.clone(),
                proposed.clone(),
            )
            .with_affected_resources(matched),
        );
    }
    findings
}

fn evaluate_business_rule(
    rule: &ConflictRule,
    proposed: &EventRecord,
    config: &ConflictDetectionConfig,
) -> Vec<ConflictDetail> {
    let (p_start, _p_end) = match event_span(proposed) {
        Some(span) => span,
        None => return Vec::new(),
    };

    let mut findings = Vec::new();

    let time_of_day = schedule_utils::time_of_day_string(p_start);
    if time_of_day < config.work_hours.start || time_of_day > config.work_hours.end {
        findings.push(ConflictDetail::new(
            format!("{}-{}-hours", rule.id, proposed.id),
            RuleType::BusinessRule,
            rule.severity,
            format!(
                "Starts at {} outside working hours {}-{}",
                time_of_day, config.work_hours.start, config.work_hours.end
            ),
            proposed.clone(),
            proposed.clone(),
        ));
    }

    let weekday = schedule_utils::weekday_index(p_start);
    if !config.work_days.contains(&weekday) {
        findings.push(ConflictDetail::new(
            format!("{}-{}-day", rule.id, proposed.id),
            RuleType::BusinessRule,
            rule.severity,
            format!(
                "Falls on {}, which is not a working day",
                p_start.format("%A")
            ),
            proposed.clone(),
            proposed.clone(),
        ));
    }

    for blackout in &config.blackout_periods {
        let b_start = match schedule_utils::parse_datetime_opt(&blackout.start_at) {
            Some(dt) => dt,
            None => {
                warn!(
                    target: "engine::rules",
                    start_at = %blackout.start_at,
                    "blackout period start is not valid RFC3339, skipping"
                );
                continue;
            }
        };
        let b_end = match schedule_utils::parse_datetime_opt(&blackout.end_at) {
            Some(dt) => dt,
            None => {
                warn!(
                    target: "engine::rules",
                    end_at = %blackout.end_at,
                    "blackout period end is not valid RFC3339, skipping"
                );
                continue;
            }
        };
        if p_start >= b_start && p_start <= b_end {
            findings.push(ConflictDetail::new(
                format!("{}-{}-blackout", rule.id, proposed.id),
                RuleType::BusinessRule,
                rule.severity,
                format!("Falls within blackout period: {}", blackout.reason),
                proposed.clone(),
                proposed.clone(),
            ));
            break;
        }
    }

    findings
}

fn evaluate_client_preference(
    rule: &ConflictRule,
    proposed: &EventRecord,
    existing: &[EventRecord],
    config: &ConflictDetectionConfig,
) -> Vec<ConflictDetail> {
    let client = match proposed.client_name.as_ref() {
        Some(client) => client,
        None => return Vec::new(),
    };
    if !config.priority_clients.contains(client) {
        return Vec::new();
    }
    let (p_start, _p_end) = match event_span(proposed) {
        Some(span) => span,
        None => return Vec::new(),
    };

    let mut same_day_count = 0usize;
    for event in existing {
        if event.client_name.as_deref() != Some(client.as_str()) {
            continue;
        }
        let (e_start, _e_end) = match event_span(event) {
            Some(span) => span,
            None => continue,
        };
        if schedule_utils::same_local_day(p_start, e_start) {
            same_day_count += 1;
        }
    }

    if same_day_count < config.max_events_per_client_per_day {
        return Vec::new();
    }

    vec![ConflictDetail::new(
        format!("{}-{}", rule.id, proposed.id),
        RuleType::ClientPreference,
        rule.severity,
        format!(
            "{} already has {} appointment(s) on {}; the daily limit is {}",
            client,
            same_day_count,
            p_start.format("%Y-%m-%d"),
            config.max_events_per_client_per_day
        ),
        proposed.clone(),
        proposed.clone(),
    )]
}
