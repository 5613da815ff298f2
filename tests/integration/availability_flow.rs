use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use once_cell::sync::OnceCell;

use conflict_engine::models::event::EventRecord;
use conflict_engine::services::availability_service::check_participant_availability;

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

fn names(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|name| name.to_string()).collect()
}

/// Two participants across a working day: Acme is booked mid-morning,
/// Globex has a long afternoon workshop.
fn two_participant_day() -> Vec<EventRecord> {
    vec![
        EventRecord::new("Acme review", iso(1, 10, 0))
            .with_id("acme-review")
            .with_end(iso(1, 11, 0))
            .with_client("Acme"),
        EventRecord::new("Globex workshop", iso(1, 13, 30))
            .with_id("globex-workshop")
            .with_end(iso(1, 15, 30))
            .with_client("Globex"),
        EventRecord::new("Internal sync", iso(1, 9, 0))
            .with_id("internal")
            .with_end(iso(1, 10, 0)),
    ]
}

#[test]
fn probe_maps_each_participant_onto_its_busy_hours() {
    init_tracing();
    let report = check_participant_availability(
        &names(&["Acme", "Globex"]),
        dt(1, 9, 0),
        dt(1, 17, 0),
        60,
        &two_participant_day(),
    );

    assert_eq!(report.slots.len(), 8);

    // 10:00 belongs to Acme; 13:00, 14:00 and 15:00 to the Globex workshop
    let busy: Vec<&str> = report
        .slots
        .iter()
        .filter(|slot| !slot.available)
        .map(|slot| slot.start_at.as_str())
        .collect();
    assert_eq!(
        busy,
        vec![iso(1, 10, 0), iso(1, 13, 0), iso(1, 14, 0), iso(1, 15, 0)]
    );

    // the internal sync names no participant and blocks nothing
    assert!(report
        .conflicts
        .iter()
        .all(|conflict| conflict.appointment_id != "internal"));
}

#[test]
fn conflicts_name_the_participant_and_the_appointment() {
    init_tracing();
    let report = check_participant_availability(
        &names(&["Acme", "Globex"]),
        dt(1, 9, 0),
        dt(1, 17, 0),
        60,
        &two_participant_day(),
    );

    let acme = report
        .conflicts
        .iter()
        .find(|conflict| conflict.participant == "Acme")
        .expect("Acme conflict recorded");
    assert_eq!(acme.appointment_id, "acme-review");
    assert_eq!(acme.appointment_title, "Acme review");
    assert_eq!(acme.start_at, iso(1, 10, 0));
    assert_eq!(acme.end_at, iso(1, 11, 0));

    // the workshop spans three hourly slots, one conflict entry each
    let globex_count = report
        .conflicts
        .iter()
        .filter(|conflict| conflict.participant == "Globex")
        .count();
    assert_eq!(globex_count, 3);
}

#[test]
fn suggestions_are_the_first_available_slots_in_grid_order() {
    init_tracing();
    let report = check_participant_availability(
        &names(&["Acme", "Globex"]),
        dt(1, 9, 0),
        dt(1, 17, 0),
        60,
        &two_participant_day(),
    );

    // free hours in order: 09:00, 11:00, 12:00, 16:00
    assert_eq!(report.suggestions.len(), 4);
    assert_eq!(report.suggestions[0].start_at, iso(1, 9, 0));
    assert_eq!(report.suggestions[1].start_at, iso(1, 11, 0));
    assert_eq!(report.suggestions[2].start_at, iso(1, 12, 0));
    assert_eq!(report.suggestions[3].start_at, iso(1, 16, 0));
    assert!(report.suggestions.iter().all(|slot| slot.available));
}

#[test]
fn suggestions_cap_at_five_on_an_open_calendar() {
    init_tracing();
    let report = check_participant_availability(
        &names(&["Acme"]),
        dt(1, 8, 0),
        dt(1, 18, 0),
        60,
        &[],
    );

    assert_eq!(report.slots.len(), 10);
    assert!(report.slots.iter().all(|slot| slot.available));
    assert_eq!(report.suggestions.len(), 5);
    assert_eq!(report.suggestions[4].start_at, iso(1, 12, 0));
}

#[test]
fn back_to_back_appointments_leave_adjacent_slots_open() {
    init_tracing();
    // on the fixed grid a slot touching an appointment boundary stays free
    let appointments = vec![EventRecord::new("Acme call", iso(1, 10, 0))
        .with_id("call")
        .with_end(iso(1, 11, 0))
        .with_client("Acme")];
    let report = check_participant_availability(
        &names(&["Acme"]),
        dt(1, 9, 0),
        dt(1, 12, 0),
        60,
        &appointments,
    );

    assert_eq!(report.slots.len(), 3);
    assert!(report.slots[0].available);
    assert!(!report.slots[1].available);
    assert!(report.slots[2].available);
}

#[test]
fn range_shorter_than_the_slot_produces_nothing() {
    init_tracing();
    let report = check_participant_availability(
        &names(&["Acme"]),
        dt(1, 9, 0),
        dt(1, 9, 30),
        60,
        &[],
    );

    assert!(report.slots.is_empty());
    assert!(report.conflicts.is_empty());
    assert!(report.suggestions.is_empty());
}
