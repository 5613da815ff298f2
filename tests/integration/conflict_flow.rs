use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use once_cell::sync::OnceCell;

use conflict_engine::models::conflict::{ResolutionStrategy, RuleType};
use conflict_engine::models::event::EventRecord;
use conflict_engine::services::conflict_service::ConflictService;

static TRACING: OnceCell<()> = OnceCell::new();

fn init_tracing() {
    TRACING.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

fn dt(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(0).expect("offset");
    let naive = NaiveDate::from_ymd_opt(2025, 5, day)
        .expect("valid date")
        .and_hms_opt(hour, minute, 0)
        .expect("valid time");
    offset
        .from_local_datetime(&naive)
        .single()
        .expect("valid datetime")
}

fn iso(day: u32, hour: u32, minute: u32) -> String {
    dt(day, hour, minute).to_rfc3339()
}

/// A Thursday with a typical mid-morning pileup: an overlapping standup,
/// a review starting too soon after, and the same client booked in the
/// afternoon.
fn busy_morning() -> (EventRecord, Vec<EventRecord>) {
    let proposed = EventRecord::new("Client pitch", iso(1, 9, 0))
        .with_id("pitch")
        .with_duration_minutes(60)
        .with_client("Acme");
    let existing = vec![
        EventRecord::new("Standup", iso(1, 9, 30))
            .with_id("standup")
            .with_end(iso(1, 10, 30)),
        EventRecord::new("Design review", iso(1, 10, 15))
            .with_id("review")
            .with_end(iso(1, 11, 0)),
        EventRecord::new("Acme onboarding", iso(1, 14, 0))
            .with_id("onboarding")
            .with_end(iso(1, 15, 0))
            .with_client("Acme"),
    ];
    (proposed, existing)
}

#[test]
fn default_rules_catch_overlap_buffer_and_resource_conflicts() {
    init_tracing();
    let service = ConflictService::default();
    let (proposed, existing) = busy_morning();

    let result = service.detect_conflicts(&proposed, &existing);

    assert!(result.has_conflicts);
    assert!(result.can_proceed); // nothing in the stock rules is critical
    assert_eq!(result.conflicts.len(), 3);

    // findings arrive in rule-declaration order
    assert_eq!(result.conflicts[0].conflict_type, RuleType::TemporalOverlap);
    assert_eq!(result.conflicts[0].conflicting_event.id, "standup");
    let overlap = result.conflicts[0].time_overlap.as_ref().expect("window");
    assert_eq!(overlap.duration_minutes, 30);

    assert_eq!(result.conflicts[1].conflict_type, RuleType::BufferViolation);
    assert_eq!(result.conflicts[1].conflicting_event.id, "review");
    assert!(result.conflicts[1].message.contains("Only 15 minutes"));

    assert_eq!(result.conflicts[2].conflict_type, RuleType::ResourceConflict);
    assert_eq!(result.conflicts[2].conflicting_event.id, "onboarding");
    assert_eq!(
        result.conflicts[2].affected_resources.as_ref().unwrap(),
        &vec!["Client: Acme".to_string()]
    );
}

#[test]
fn shared_client_blocks_every_alternative_slot() {
    init_tracing();
    let service = ConflictService::default();
    let (proposed, existing) = busy_morning();

    let result = service.detect_conflicts(&proposed, &existing);

    // the resource conflict follows the client, not the clock, so no
    // nearby slot is conflict-free and reschedule is never offered
    assert!(!result
        .suggestions
        .iter()
        .any(|s| s.strategy == ResolutionStrategy::Reschedule));
    assert!(result
        .suggestions
        .iter()
        .any(|s| s.strategy == ResolutionStrategy::Cancel));
    assert!(result
        .suggestions
        .iter()
        .any(|s| s.strategy == ResolutionStrategy::Allow));
}

#[test]
fn repeated_detection_is_deterministic() {
    init_tracing();
    let service = ConflictService::default();
    let (proposed, existing) = busy_morning();

    let first = service.detect_conflicts(&proposed, &existing);
    let second = service.detect_conflicts(&proposed, &existing);

    assert_eq!(first, second);
}

#[test]
fn evening_proposal_gets_a_single_business_rule_finding() {
    init_tracing();
    let service = ConflictService::default();
    let proposed = EventRecord::new("Late call", iso(1, 19, 15)).with_id("late");

    let result = service.detect_conflicts(&proposed, &[]);

    assert_eq!(result.conflicts.len(), 1);
    assert_eq!(result.conflicts[0].conflict_type, RuleType::BusinessRule);
    assert!(result.conflicts[0].message.contains("19:15"));
    assert!(result.can_proceed); // work-hours is a warning by default
}

#[test]
fn clean_calendar_produces_an_empty_result() {
    init_tracing();
    let service = ConflictService::default();
    let proposed = EventRecord::new("Quiet slot", iso(1, 11, 0))
        .with_id("quiet")
        .with_duration_minutes(30);
    let existing = vec![EventRecord::new("Lunch", iso(1, 12, 30))
        .with_id("lunch")
        .with_end(iso(1, 13, 30))];

    let result = service.detect_conflicts(&proposed, &existing);

    assert!(!result.has_conflicts);
    assert!(result.conflicts.is_empty());
    assert!(result.suggestions.is_empty());
    assert!(result.can_proceed);
}

#[test]
fn dragging_an_event_never_reports_it_against_itself() {
    init_tracing();
    let service = ConflictService::default();
    let (_, existing) = busy_morning();
    let standup = existing[0].clone();

    // drop the standup onto the design review
    let result = service.check_drag_conflicts(&standup, dt(1, 10, 30), dt(1, 11, 30), &existing);

    assert!(result
        .conflicts
        .iter()
        .all(|conflict| conflict.conflicting_event.id != standup.id));
    assert!(result
        .conflicts
        .iter()
        .any(|conflict| conflict.conflicting_event.id == "review"
            && conflict.conflict_type == RuleType::TemporalOverlap));
}

#[test]
fn batch_detection_reports_each_event_against_the_rest() {
    init_tracing();
    let service = ConflictService::default();
    let events = vec![
        EventRecord::new("Standup", iso(1, 9, 30))
            .with_id("standup")
            .with_end(iso(1, 10, 30)),
        EventRecord::new("Design review", iso(1, 10, 15))
            .with_id("review")
            .with_end(iso(1, 11, 0)),
        EventRecord::new("Afternoon focus", iso(1, 14, 0))
            .with_id("focus")
            .with_end(iso(1, 16, 0)),
    ];

    let results = service.detect_batch_conflicts(&events);

    assert_eq!(results.len(), 3);
    assert!(results["standup"].has_conflicts);
    assert!(results["review"].has_conflicts);
    assert!(!results["focus"].has_conflicts);

    let overlap = results["standup"]
        .conflicts
        .iter()
        .find(|conflict| conflict.conflict_type == RuleType::TemporalOverlap)
        .expect("standup overlaps the review");
    assert_eq!(overlap.conflicting_event.id, "review");
}
