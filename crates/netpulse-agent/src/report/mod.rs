//! Report generation
//!
//! Turns snapshots into full or incremental [`MonitorReport`]s. An
//! incremental comparison is only attempted when both snapshots describe the
//! same interfaces and services; any key change forces a full report so a
//! consumer never keeps stale entries for added or removed keys.


use netpulse_common::{InterfaceRecord, MonitorReport, ServiceRecord, Snapshot};

/// Describe every record of a snapshot
pub fn full_report(snapshot: &Snapshot) -> MonitorReport {
    MonitorReport {
        full: true,
        interfaces: snapshot.interfaces().values().cloned().collect(),
        services: snapshot.services().values().cloned().collect(),
        region_code: snapshot.region_code().to_string(),
        captured_at: snapshot.timestamp(),
    }
}

/// Describe what changed between two snapshots
///
/// Returns `None` when nothing changed. A region code change alone still
/// produces a report, with empty record collections.
pub fn diff_report(newer: &Snapshot, older: &Snapshot) -> Option<MonitorReport> {
    if newer.interface_names() != older.interface_names()
        || newer.service_names() != older.service_names()
    {
        return Some(full_report(newer));
    }

    let interfaces: Vec<InterfaceRecord> = newer
        .interfaces()
        .iter()
        .filter(|(name, record)| older.interface(name) != Some(*record))
        .map(|(_, record)| record.clone())
        .collect();

    let services: Vec<ServiceRecord> = newer
        .services()
        .iter()
        .filter(|(name, record)| older.service(name) != Some(*record))
        .map(|(_, record)| record.clone())
        .collect();

    if interfaces.is_empty()
        && services.is_empty()
        && newer.region_code() == older.region_code()
    {
        return None;
    }

    Some(MonitorReport {
        full: false,
        interfaces,
        services,
        region_code: newer.region_code().to_string(),
        captured_at: newer.timestamp(),
    })
}
