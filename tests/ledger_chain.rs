use recovery_watchdog::engine::ledger::GENESIS;
use recovery_watchdog::engine::{
    AlertLevel, Ledger, RunFile, StepFields, compute_step_hash, detect, verify_chain,
};
use recovery_watchdog::error::IntegrityError;
use serde_json::{Value, json};

// Chain produced by an independent writer using sorted-key, compact JSON
// with ASCII escapes.
const FIRST_HASH: &str = "a5c94f083db010e8743867897054f67cf1d71ee06e032da253019e88a9d138a1";
const SECOND_HASH: &str = "9c79a1e71b0c3d40446157b17aeaf8e1a77efbf6bde55a6fcd1056088ade283b";

fn foreign_steps() -> Vec<Value> {
    vec![
        json!({
            "t": 0, "C": 0.812345, "beta": 0.95, "recovery_margin": 0.353908,
            "alert_level": "GREEN", "note": "café", "step_hash": FIRST_HASH
        }),
        json!({
            "t": 1, "C": 0.5, "beta": 1.25, "recovery_margin": 0.0,
            "alert_level": "RED", "extra": [1, 2.5, null, true], "step_hash": SECOND_HASH
        }),
    ]
}

#[test]
fn foreign_chain_verifies_byte_for_byte() {
    let steps = foreign_steps();
    assert_eq!(compute_step_hash(&steps[0], GENESIS).as_deref(), Some(FIRST_HASH));
    assert_eq!(compute_step_hash(&steps[1], FIRST_HASH).as_deref(), Some(SECOND_HASH));
    assert!(verify_chain(&steps).is_ok());
}

#[test]
fn foreign_run_file_reports_last_hash_as_run_hash() {
    let raw = json!({ "step_logs": foreign_steps(), "experiment": "pilot-7" }).to_string();
    let file = RunFile::parse(&raw).unwrap();
    assert_eq!(file.computed_run_hash().unwrap(), SECOND_HASH);
    assert_eq!(file.extra.get("experiment"), Some(&json!("pilot-7")));
}

#[test]
fn any_field_edit_is_detected_at_its_index() {
    let mut steps = foreign_steps();
    steps[1]["beta"] = json!(1.26);
    assert_eq!(verify_chain(&steps), Err(IntegrityError::HashMismatch { index: 1 }));

    let mut steps = foreign_steps();
    steps[0]["note"] = json!("cafe");
    assert_eq!(verify_chain(&steps), Err(IntegrityError::HashMismatch { index: 0 }));
}

#[test]
fn reordering_or_dropping_steps_breaks_the_chain() {
    let mut steps = foreign_steps();
    steps.swap(0, 1);
    assert_eq!(verify_chain(&steps), Err(IntegrityError::HashMismatch { index: 0 }));

    let steps = foreign_steps();
    assert_eq!(
        verify_chain(&steps[1..]),
        Err(IntegrityError::HashMismatch { index: 0 })
    );
}

#[test]
fn degrading_run_chains_and_alerts_red_from_first_zero_margin() {
    let settings = recovery_watchdog::engine::DetectorSettings::default();
    let mut ledger = Ledger::new();
    let coherence = [0.80, 0.70, 0.62, 0.60, 0.55];
    for (t, c) in (0u64..).zip(coherence) {
        let detection = detect(c, 1.0, &settings);
        ledger.append(StepFields::new(t, c, 1.0, detection));
    }

    let levels: Vec<AlertLevel> = ledger
        .steps()
        .iter()
        .map(|s| s.fields.alert_level)
        .collect();
    assert_eq!(
        levels,
        [
            AlertLevel::Green,
            AlertLevel::Green,
            AlertLevel::Green,
            AlertLevel::Red,
            AlertLevel::Red
        ]
    );
    assert!(ledger.verify().is_ok());
    assert_eq!(ledger.run_hash(), ledger.steps()[4].step_hash);
}
