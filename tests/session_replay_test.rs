//! End-to-end replay of recorded touch streams through a session

use std::thread;

use chrono::{DateTime, Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;

use synheart_touch::sensors::TiltSample;
use synheart_touch::{
    GestureFailure, MeasurementKind, MeasurementLog, SampleParser, Session, SessionConfig,
    SessionPhase, TrackerConfig,
};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
}

const STREAM: &str = r#"
{"phase":"begin","touch_id":1,"x":100,"y":0,"uptime_ms":0,"timestamp":"2024-01-15T14:00:00Z"}
{"phase":"move","touch_id":1,"x":110,"y":100,"uptime_ms":50,"timestamp":"2024-01-15T14:00:00.050Z"}
{"phase":"end","touch_id":1,"x":100,"y":200,"uptime_ms":100,"timestamp":"2024-01-15T14:00:00.100Z"}
{"phase":"begin","touch_id":2,"x":200,"y":200,"force":3.0,"max_force":6.0,"uptime_ms":1000,"timestamp":"2024-01-15T14:00:01Z"}
{"phase":"end","touch_id":2,"x":200,"y":200,"force":3.0,"max_force":6.0,"uptime_ms":1100,"timestamp":"2024-01-15T14:00:01.100Z"}
{"phase":"begin","touch_id":3,"x":10,"y":10,"touch_count":2,"uptime_ms":2000,"timestamp":"2024-01-15T14:00:02Z"}
{"phase":"begin","touch_id":4,"x":10,"y":10,"uptime_ms":3000,"timestamp":"2024-01-15T14:00:03Z"}
{"phase":"cancel","touch_id":4,"uptime_ms":3050,"timestamp":"2024-01-15T14:00:03.050Z"}
"#;

fn value_of(session: &Session, index: usize) -> String {
    session.log().snapshot()[index].value.clone()
}

#[test]
fn test_replay_produces_stroke_and_tap_measurements() {
    let samples = SampleParser::parse_ndjson(STREAM).unwrap();
    let mut session = Session::new(SessionConfig::default(), start()).unwrap();

    let mut failures = Vec::new();
    for sample in &samples {
        let outcome = session.handle_sample(sample).unwrap();
        failures.extend(outcome.failure);
    }
    assert_eq!(failures, vec![GestureFailure::MultipleTouches(2)]);

    let kinds: Vec<_> = session.log().measurements().iter().map(|m| m.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            MeasurementKind::Deflection,
            MeasurementKind::LinearStrokeDeviance,
            MeasurementKind::LinearStrokeDevianceDirection,
            MeasurementKind::StrokeDistance,
            MeasurementKind::StrokeSpeed,
            MeasurementKind::Force,
            MeasurementKind::TapDuration,
        ]
    );

    assert_eq!(value_of(&session, 0), "south");
    assert_eq!(value_of(&session, 2), "east");

    let log = session.log();
    let deviance = log.numeric(MeasurementKind::LinearStrokeDeviance).unwrap();
    assert!((deviance.mean().unwrap() - 10.0).abs() < 1e-9);
    let speed = log.numeric(MeasurementKind::StrokeSpeed).unwrap();
    assert!((speed.mean().unwrap() - 2.0).abs() < 1e-9);
    let force = log.numeric(MeasurementKind::Force).unwrap();
    assert!((force.mean().unwrap() - 0.5).abs() < 1e-12);
    let duration = log.numeric(MeasurementKind::TapDuration).unwrap();
    assert!((duration.mean().unwrap() - 100_000.0).abs() < 1e-6);
}

#[test]
fn test_snapshot_rebuilds_identical_aggregates() {
    let samples = SampleParser::parse_ndjson(STREAM).unwrap();
    let mut session = Session::new(SessionConfig::default(), start()).unwrap();
    assert_eq!(session.replay(&samples).unwrap(), 7);

    let json = session.snapshot_json().unwrap();
    let records = MeasurementLog::parse_snapshot(&json).unwrap();
    let rebuilt = MeasurementLog::from_snapshot(&records).unwrap();

    assert_eq!(rebuilt.measurements(), session.log().measurements());
    assert_eq!(
        rebuilt.categorical(MeasurementKind::Deflection).unwrap().count("south"),
        1
    );
}

#[test]
fn test_measurements_after_enrolment_window_are_dropped() {
    let config = SessionConfig {
        enrolment_window_secs: 1,
        tracker: TrackerConfig::default(),
    };
    let samples = SampleParser::parse_ndjson(STREAM).unwrap();
    let mut session = Session::new(config, start()).unwrap();

    // the stroke lands inside the window, the tap at 1.1s does not
    assert_eq!(session.replay(&samples).unwrap(), 5);
    assert_eq!(session.phase(), SessionPhase::Verification);
    assert_eq!(session.dropped_count(), 2);

    session.enroll(start() + Duration::seconds(10));
    assert!(session.log().is_empty());
    assert_eq!(session.phase(), SessionPhase::Enrolment);
}

#[test]
fn test_sensor_thread_shares_the_log() {
    let samples = SampleParser::parse_ndjson(STREAM).unwrap();
    let mut session = Session::new(SessionConfig::default(), start()).unwrap();

    let recorder = session.recorder();
    let sensor = thread::spawn(move || {
        for i in 0..100 {
            let sample = TiltSample {
                angle_rad: 0.01 * i as f64,
                timestamp: start() + Duration::milliseconds(i * 10),
            };
            assert!(recorder.record_tilt(&sample).unwrap());
        }
    });

    session.replay(&samples).unwrap();
    sensor.join().unwrap();

    let log = session.log();
    assert_eq!(log.len(), 107);
    assert_eq!(log.numeric(MeasurementKind::Tilt).unwrap().count(), 100);
    assert_eq!(log.numeric(MeasurementKind::Force).unwrap().count(), 1);
}

#[test]
fn test_sensor_samples_after_window_are_dropped() {
    let config = SessionConfig {
        enrolment_window_secs: 1,
        tracker: TrackerConfig::default(),
    };
    let mut session = Session::new(config, start()).unwrap();
    let recorder = session.recorder();

    let sensor = thread::spawn(move || {
        for secs in [0, 100] {
            let sample = TiltSample {
                angle_rad: 0.2,
                timestamp: start() + Duration::seconds(secs),
            };
            recorder.record_tilt(&sample).unwrap();
        }
        recorder
    });
    let recorder = sensor.join().unwrap();

    assert_eq!(session.log().len(), 1);
    assert_eq!(session.dropped_count(), 1);

    // the same handle keeps feeding the restarted window
    let restart = start() + Duration::seconds(200);
    session.enroll(restart);
    let sample = TiltSample { angle_rad: 0.3, timestamp: restart };
    assert!(recorder.record_tilt(&sample).unwrap());
    assert_eq!(session.log().len(), 1);
    assert_eq!(session.dropped_count(), 0);
}
