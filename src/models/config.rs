use std::collections::HashSet;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{EngineError, EngineResult};
use crate::models::conflict::{ConflictSeverity, RuleType};
use crate::models::event::EventRecord;
use crate::services::schedule_utils;

const DEFAULT_BUFFER_MINUTES: i64 = 15;
const DEFAULT_WORK_HOURS_START: &str = "09:00";
const DEFAULT_WORK_HOURS_END: &str = "18:00";
const DEFAULT_MAX_CLIENT_EVENTS_PER_DAY: usize = 3;

/// A configured conflict rule. Rules are data: new rules of an existing
/// type can be added or disabled without touching the evaluators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictRule {
    pub id: String,
    pub name: String,
    pub rule_type: RuleType,
    pub enabled: bool,
    pub severity: ConflictSeverity,
    /// Buffer rules only; falls back to the config-wide default
    #[serde(default)]
    pub buffer_minutes: Option<i64>,
    /// Event types this rule applies to; None means all
    #[serde(default)]
    pub applies_to: Option<Vec<String>>,
    /// Extra applicability gate over the proposed event
    #[serde(skip)]
    pub custom_check: Option<fn(&EventRecord) -> bool>,
}

impl ConflictRule {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        rule_type: RuleType,
        severity: ConflictSeverity,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rule_type,
            enabled: true,
            severity,
            buffer_minutes: None,
            applies_to: None,
            custom_check: None,
        }
    }

    pub fn with_buffer_minutes(mut self, minutes: i64) -> Self {
        self.buffer_minutes = Some(minutes);
        self
    }

    pub fn with_applies_to(mut self, event_types: Vec<String>) -> Self {
        self.applies_to = Some(event_types);
        self
    }

    pub fn with_custom_check(mut self, check: fn(&EventRecord) -> bool) -> Self {
        self.custom_check = Some(check);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Working-hours window as zero-padded 24-hour "HH:MM" strings, compared
/// lexically against the proposed start's time of day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkHours {
    pub start: String,
    pub end: String,
}

impl Default for WorkHours {
    fn default() -> Self {
        Self {
            start: DEFAULT_WORK_HOURS_START.to_string(),
            end: DEFAULT_WORK_HOURS_END.to_string(),
        }
    }
}

/// A window during which no events may start; bounds are inclusive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlackoutPeriod {
    pub start_at: String,
    pub end_at: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictDetectionConfig {
    /// Evaluated in declaration order
    pub rules: Vec<ConflictRule>,
    pub default_buffer_minutes: i64,
    pub work_hours: WorkHours,
    /// 0 = Sunday .. 6 = Saturday
    pub work_days: Vec<u8>,
    #[serde(default)]
    pub blackout_periods: Vec<BlackoutPeriod>,
    #[serde(default)]
    pub priority_clients: Vec<String>,
    pub max_events_per_client_per_day: usize,
    /// Whether exactly-touching intervals count as overlapping
    pub touching_counts_as_overlap: bool,
}

impl Default for ConflictDetectionConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            default_buffer_minutes: DEFAULT_BUFFER_MINUTES,
            work_hours: WorkHours::default(),
            work_days: vec![1, 2, 3, 4, 5],
            blackout_periods: Vec::new(),
            priority_clients: Vec::new(),
            max_events_per_client_per_day: DEFAULT_MAX_CLIENT_EVENTS_PER_DAY,
            touching_counts_as_overlap: true,
        }
    }
}

/// Stock rule set loaded when the host supplies no overrides
pub fn default_rules() -> Vec<ConflictRule> {
    vec![
        ConflictRule::new(
            "overlap",
            "Overlapping events",
            RuleType::TemporalOverlap,
            ConflictSeverity::Error,
        ),
        ConflictRule::new(
            "buffer-30",
            "Buffer between appointments",
            RuleType::BufferViolation,
            ConflictSeverity::Warning,
        )
        .with_buffer_minutes(30),
        ConflictRule::new(
            "client-double-booking",
            "Client double booking",
            RuleType::ResourceConflict,
            ConflictSeverity::Error,
        ),
        ConflictRule::new(
            "work-hours",
            "Outside working hours",
            RuleType::BusinessRule,
            ConflictSeverity::Warning,
        ),
        ConflictRule::new(
            "priority-client-limit",
            "Priority client daily limit",
            RuleType::ClientPreference,
            ConflictSeverity::Warning,
        ),
    ]
}

impl ConflictDetectionConfig {
    /// Reject malformed configuration up front so evaluation never has to
    /// error on it.
    pub fn validate(&self) -> EngineResult<()> {
        let mut seen_ids = HashSet::new();
        for rule in &self.rules {
            if rule.id.trim().is_empty() {
                return Err(EngineError::validation("Rule id cannot be empty"));
            }
            if !seen_ids.insert(rule.id.as_str()) {
                return Err(EngineError::validation_with_details(
                    "Duplicate rule id",
                    json!({"id": rule.id}),
                ));
            }
            if let Some(buffer) = rule.buffer_minutes {
                if buffer < 0 {
                    return Err(EngineError::validation_with_details(
                        "Buffer minutes cannot be negative",
                        json!({"id": rule.id, "bufferMinutes": buffer}),
                    ));
                }
            }
        }

        if self.default_buffer_minutes < 0 {
            return Err(EngineError::validation(
                "Default buffer minutes cannot be negative",
            ));
        }

        ensure_time_of_day(&self.work_hours.start)?;
        ensure_time_of_day(&self.work_hours.end)?;
        if self.work_hours.start >= self.work_hours.end {
            return Err(EngineError::validation(
                "Work hours window must start before it ends",
            ));
        }

        for day in &self.work_days {
            if *day > 6 {
                return Err(EngineError::validation_with_details(
                    "Work days must be 0 (Sunday) through 6 (Saturday)",
                    json!({"day": day}),
                ));
            }
        }

        for blackout in &self.blackout_periods {
            let start = schedule_utils::parse_datetime(&blackout.start_at)?;
            let end = schedule_utils::parse_datetime(&blackout.end_at)?;
            if end < start {
                return Err(EngineError::validation_with_details(
                    "Blackout period must not end before it starts",
                    json!({"startAt": blackout.start_at, "endAt": blackout.end_at}),
                ));
            }
        }

        Ok(())
    }
}

fn ensure_time_of_day(value: &str) -> EngineResult<()> {
    let well_formed = value.len() == 5 && NaiveTime::parse_from_str(value, "%H:%M").is_ok();
    if !well_formed {
        return Err(EngineError::validation_with_details(
            "Work hours must be zero-padded 24-hour HH:MM",
            json!({"value": value}),
        ));
    }
    Ok(())
}
