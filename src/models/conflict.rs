use serde::{Deserialize, Serialize};

use crate::models::event::EventRecord;

/// Conflict rule categories understood by the engine. The set is closed:
/// a new category needs a new evaluator, so dispatch stays exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    TemporalOverlap,
    BufferViolation,
    ResourceConflict,
    BusinessRule,
    ClientPreference,
}

impl RuleType {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleType::TemporalOverlap => "temporal_overlap",
            RuleType::BufferViolation => "buffer_violation",
            RuleType::ResourceConflict => "resource_conflict",
            RuleType::BusinessRule => "business_rule",
            RuleType::ClientPreference => "client_preference",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Warning,
    Error,
    Critical,
}

impl ConflictSeverity {
    /// Display ordering for hosts; higher means more severe. The engine
    /// itself never re-sorts findings.
    pub fn rank(self) -> u8 {
        match self {
            ConflictSeverity::Warning => 0,
            ConflictSeverity::Error => 1,
            ConflictSeverity::Critical => 2,
        }
    }
}

/// Intersection window between the proposed event and a conflicting one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeOverlap {
    pub start_at: String,
    pub end_at: String,
    pub duration_minutes: i64,
}

/// A single conflict finding produced by one rule against one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictDetail {
    pub id: String,
    pub conflict_type: RuleType,
    pub severity: ConflictSeverity,
    pub message: String,
    pub conflicting_event: EventRecord,
    pub proposed_event: EventRecord,
    #[serde(default)]
    pub time_overlap: Option<TimeOverlap>,
    #[serde(default)]
    pub affected_resources: Option<Vec<String>>,
}

impl ConflictDetail {
    pub fn new(
        id: impl Into<String>,
        conflict_type: RuleType,
        severity: ConflictSeverity,
        message: impl Into<String>,
        conflicting_event: EventRecord,
        proposed_event: EventRecord,
    ) -> Self {
        Self {
            id: id.into(),
            conflict_type,
            severity,
            message: message.into(),
            conflicting_event,
            proposed_event,
            time_overlap: None,
            affected_resources: None,
        }
    }

    pub fn with_time_overlap(mut self, overlap: TimeOverlap) -> Self {
        self.time_overlap = Some(overlap);
        self
    }

    pub fn with_affected_resources(mut self, resources: Vec<String>) -> Self {
        self.affected_resources = Some(resources);
        self
    }
}

/// Remediation strategies the host can apply. `AutoReschedule`,
/// `SplitEvent`, `NotifyClient` and `Waitlist` are reserved for
/// caller-driven flows and are never emitted by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    Cancel,
    Allow,
    Reschedule,
    Override,
    AutoReschedule,
    SplitEvent,
    NotifyClient,
    Waitlist,
}

/// A conflict-free placement candidate for the proposed event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeSlot {
    pub start_at: String,
    pub end_at: String,
    /// 1.0 at the original time, falling off toward the search edges
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionSuggestion {
    pub strategy: ResolutionStrategy,
    pub description: String,
    #[serde(default)]
    pub alternative_slots: Option<Vec<AlternativeSlot>>,
    pub estimated_impact: String,
    pub requires_client_notification: bool,
}

/// Outcome of a full conflict check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictResult {
    pub has_conflicts: bool,
    pub conflicts: Vec<ConflictDetail>,
    pub suggestions: Vec<ResolutionSuggestion>,
    pub can_proceed: bool,
}

impl ConflictResult {
    /// Canonical construction: `can_proceed` is false exactly when a
    /// critical finding is present.
    pub fn new(conflicts: Vec<ConflictDetail>, suggestions: Vec<ResolutionSuggestion>) -> Self {
        let can_proceed = !conflicts
            .iter()
            .any(|conflict| conflict.severity == ConflictSeverity::Critical);
        Self {
            has_conflicts: !conflicts.is_empty(),
            conflicts,
            suggestions,
            can_proceed,
        }
    }
}
