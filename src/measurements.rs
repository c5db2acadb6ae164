//! Append-only measurement log with online aggregation
//!
//! The log is shared between the touch path and periodic sensor sources, so
//! all state sits behind one mutex that is held for a single append. The
//! listener runs after the lock is released, still inside `append`, so it may
//! read the log without deadlocking.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::error::TouchError;
use crate::stats::{AggregateSummary, AggregateTables, CategoryCounter, RunningStats};
use crate::types::{Measurement, MeasurementKind, SnapshotRecord};

/// Callback fired for every appended measurement.
///
/// Notifications follow append order for a single source. Sources appending
/// from several threads may see their notifications interleave in an order
/// that differs from the log's; read [`MeasurementLog::measurements`] when
/// the exact order matters.
pub type MeasurementListener = Arc<dyn Fn(&Measurement) + Send + Sync>;

#[derive(Debug, Default)]
struct LogState {
    entries: Vec<Measurement>,
    tables: AggregateTables,
}

/// Ordered session log plus per-kind aggregators
#[derive(Default)]
pub struct MeasurementLog {
    state: Mutex<LogState>,
    listener: Mutex<Option<MeasurementListener>>,
}

impl std::fmt::Debug for MeasurementLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasurementLog")
            .field("len", &self.len())
            .finish()
    }
}

impl MeasurementLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listener(listener: MeasurementListener) -> Self {
        let log = Self::new();
        log.set_listener(Some(listener));
        log
    }

    /// Replace (or remove) the change listener
    pub fn set_listener(&self, listener: Option<MeasurementListener>) {
        *self.listener.lock().unwrap_or_else(PoisonError::into_inner) = listener;
    }

    pub fn listener(&self) -> Option<MeasurementListener> {
        self.listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Append at the end, fold into the aggregators, then notify.
    ///
    /// The listener is called after the lock is released, so concurrent
    /// appends can notify out of log order.
    pub fn append(&self, measurement: Measurement) {
        {
            let mut state = self.lock();
            state.entries.push(measurement);
            state.tables.record(measurement.kind(), &measurement.value());
        }

        trace!(kind = %measurement.kind(), value = %measurement.value(), "measurement appended");

        if let Some(listener) = self.listener() {
            listener(&measurement);
        }
    }

    pub fn extend(&self, measurements: impl IntoIterator<Item = Measurement>) {
        for measurement in measurements {
            self.append(measurement);
        }
    }

    /// Drop every entry and aggregate; the listener stays installed
    pub fn clear(&self) {
        *self.lock() = LogState::default();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the ordered log
    pub fn measurements(&self) -> Vec<Measurement> {
        self.lock().entries.clone()
    }

    pub fn numeric(&self, kind: MeasurementKind) -> Option<RunningStats> {
        self.lock().tables.numeric(kind).copied()
    }

    pub fn categorical(&self, kind: MeasurementKind) -> Option<CategoryCounter> {
        self.lock().tables.categorical(kind).cloned()
    }

    /// Copy of both aggregator tables
    pub fn tables(&self) -> AggregateTables {
        self.lock().tables.clone()
    }

    pub fn summary(&self) -> AggregateSummary {
        self.lock().tables.summary()
    }

    /// Ordered export records, one per appended measurement
    pub fn snapshot(&self) -> Vec<SnapshotRecord> {
        self.lock().entries.iter().map(Measurement::to_record).collect()
    }

    pub fn snapshot_json(&self) -> Result<String, TouchError> {
        Ok(serde_json::to_string(&self.snapshot())?)
    }

    pub fn parse_snapshot(json: &str) -> Result<Vec<SnapshotRecord>, TouchError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Rebuild a log (entries and aggregators) from exported records
    pub fn from_snapshot(records: &[SnapshotRecord]) -> Result<Self, TouchError> {
        let log = Self::new();
        for record in records {
            log.append(record.to_measurement()?);
        }
        Ok(log)
    }

    fn lock(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, MotionType};
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap() + chrono::Duration::milliseconds(ms)
    }

    fn sample_log() -> MeasurementLog {
        let log = MeasurementLog::new();
        log.append(Measurement::numeric(MeasurementKind::Force, 0.42, at(0)).unwrap());
        log.append(
            Measurement::direction(MeasurementKind::Deflection, Direction::Northeast, at(15))
                .unwrap(),
        );
        log.append(Measurement::numeric(MeasurementKind::Force, 0.58, at(30)).unwrap());
        log.append(Measurement::motion(MotionType::Stationary, at(45)));
        log
    }

    #[test]
    fn test_append_preserves_order_and_routes() {
        let log = sample_log();
        assert_eq!(log.len(), 4);

        let kinds: Vec<_> = log.measurements().iter().map(|m| m.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                MeasurementKind::Force,
                MeasurementKind::Deflection,
                MeasurementKind::Force,
                MeasurementKind::Motion,
            ]
        );

        let force = log.numeric(MeasurementKind::Force).unwrap();
        assert_eq!(force.count(), 2);
        assert!((force.mean().unwrap() - 0.5).abs() < 1e-12);

        let deflection = log.categorical(MeasurementKind::Deflection).unwrap();
        assert_eq!(deflection.count("northeast"), 1);
        assert!(log.numeric(MeasurementKind::Deflection).is_none());
    }

    #[test]
    fn test_listener_fires_per_append_and_can_read_log() {
        let log = Arc::new(MeasurementLog::new());
        let seen = Arc::new(AtomicUsize::new(0));

        let observed_log = Arc::clone(&log);
        let counter = Arc::clone(&seen);
        log.set_listener(Some(Arc::new(move |_m: &Measurement| {
            // reading inside the callback must not deadlock
            counter.store(observed_log.len(), Ordering::SeqCst);
        })));

        log.append(Measurement::numeric(MeasurementKind::Tilt, 0.3, at(0)).unwrap());
        log.append(Measurement::numeric(MeasurementKind::Tilt, 0.4, at(1)).unwrap());
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_clear_keeps_handles_and_listener() {
        let log = Arc::new(MeasurementLog::new());
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        log.set_listener(Some(Arc::new(move |_m: &Measurement| {
            counter.fetch_add(1, Ordering::SeqCst);
        })));

        let handle = Arc::clone(&log);
        handle.append(Measurement::numeric(MeasurementKind::Tilt, 0.3, at(0)).unwrap());
        log.clear();
        assert!(log.is_empty());
        assert!(log.numeric(MeasurementKind::Tilt).is_none());

        handle.append(Measurement::numeric(MeasurementKind::Tilt, 0.5, at(1)).unwrap());
        assert_eq!(log.len(), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let log = sample_log();
        let json = log.snapshot_json().unwrap();
        let records = MeasurementLog::parse_snapshot(&json).unwrap();

        assert_eq!(records.len(), 4);
        assert_eq!(records, log.snapshot());
        assert_eq!(records[0].kind, "Force");
        assert_eq!(records[0].value, "0.42");
        assert_eq!(records[1].value, "northeast");
        assert_eq!(records[3].value, "stationary");
        assert_eq!(records[2].timestamp, at(30));
    }

    #[test]
    fn test_snapshot_preserves_subsecond_timestamps() {
        let log = MeasurementLog::new();
        let precise = at(0) + chrono::Duration::nanoseconds(123_456_789);
        log.append(Measurement::numeric(MeasurementKind::StrokeSpeed, 1.0 / 3.0, precise).unwrap());

        let records = MeasurementLog::parse_snapshot(&log.snapshot_json().unwrap()).unwrap();
        assert_eq!(records[0].timestamp, precise);
        assert_eq!(records[0].to_measurement().unwrap(), log.measurements()[0]);
    }

    #[test]
    fn test_rebuild_from_snapshot() {
        let log = sample_log();
        let rebuilt = MeasurementLog::from_snapshot(&log.snapshot()).unwrap();

        assert_eq!(rebuilt.measurements(), log.measurements());
        assert_eq!(rebuilt.summary(), log.summary());
    }

    #[test]
    fn test_concurrent_sources_append_safely() {
        let log = Arc::new(MeasurementLog::new());
        let mut handles = Vec::new();

        for source in 0..4 {
            let log = Arc::clone(&log);
            handles.push(thread::spawn(move || {
                for i in 0..250 {
                    let value = (source * 1000 + i) as f64;
                    log.append(Measurement::numeric(MeasurementKind::Tilt, value, at(i)).unwrap());
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(log.len(), 1_000);
        assert_eq!(log.numeric(MeasurementKind::Tilt).unwrap().count(), 1_000);
    }
}
