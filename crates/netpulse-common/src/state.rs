//! Snapshot and report types

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::records::{InterfaceRecord, ServiceRecord, StringSet};

/// Immutable point-in-time capture of interface, service and region state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    interfaces: BTreeMap<String, InterfaceRecord>,
    services: BTreeMap<String, ServiceRecord>,
    region_code: String,
    captured_at: DateTime<Utc>,
}

impl Snapshot {
    /// Build a snapshot stamped with the current time
    ///
    /// Records are keyed by name; a later record replaces an earlier one with
    /// the same name.
    pub fn new(
        interfaces: impl IntoIterator<Item = InterfaceRecord>,
        services: impl IntoIterator<Item = ServiceRecord>,
        region_code: impl Into<String>,
    ) -> Self {
        Self::captured_at(interfaces, services, region_code, Utc::now())
    }

    /// Build a snapshot with an explicit capture time
    pub fn captured_at(
        interfaces: impl IntoIterator<Item = InterfaceRecord>,
        services: impl IntoIterator<Item = ServiceRecord>,
        region_code: impl Into<String>,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            interfaces: interfaces
                .into_iter()
                .map(|i| (i.name.clone(), i))
                .collect(),
            services: services
                .into_iter()
                .map(|s| (s.name.clone(), s))
                .collect(),
            region_code: region_code.into(),
            captured_at,
        }
    }

    pub fn interfaces(&self) -> &BTreeMap<String, InterfaceRecord> {
        &self.interfaces
    }

    pub fn services(&self) -> &BTreeMap<String, ServiceRecord> {
        &self.services
    }

    pub fn region_code(&self) -> &str {
        &self.region_code
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn interface(&self, name: &str) -> Option<&InterfaceRecord> {
        self.interfaces.get(name)
    }

    pub fn service(&self, name: &str) -> Option<&ServiceRecord> {
        self.services.get(name)
    }

    /// Names of all captured interfaces
    pub fn interface_names(&self) -> StringSet {
        self.interfaces.keys().cloned().collect()
    }

    /// Names of all captured services
    pub fn service_names(&self) -> StringSet {
        self.services.keys().cloned().collect()
    }
}

/// Full or incremental description of host state
///
/// An incremental report only carries the records that changed, but the
/// region code is always populated from the newer snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorReport {
    pub full: bool,
    pub interfaces: Vec<InterfaceRecord>,
    pub services: Vec<ServiceRecord>,
    pub region_code: String,
    /// Capture time of the snapshot the report describes
    pub captured_at: DateTime<Utc>,
}

impl MonitorReport {
    /// Whether the report carries no interface or service records
    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty() && self.services.is_empty()
    }

    pub fn interface(&self, name: &str) -> Option<&InterfaceRecord> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    pub fn service(&self, name: &str) -> Option<&ServiceRecord> {
        self.services.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_keys_records_by_name() {
        let snapshot = Snapshot::new(
            vec![
                InterfaceRecord::new("eth0").with_addresses(["10.0.0.1"]),
                InterfaceRecord::new("wlan0"),
            ],
            vec![ServiceRecord::new("SSH", true), ServiceRecord::new("VNC", false)],
            "US",
        );

        let names: StringSet = ["wlan0", "eth0"].into_iter().collect();
        assert_eq!(snapshot.interface_names(), names);
        assert_eq!(snapshot.service_names().len(), 2);
        assert!(snapshot.service("SSH").unwrap().running);
        assert_eq!(snapshot.region_code(), "US");
    }

    #[test]
    fn test_duplicate_names_keep_last_record() {
        let snapshot = Snapshot::new(
            vec![
                InterfaceRecord::new("eth0").with_addresses(["10.0.0.1"]),
                InterfaceRecord::new("eth0").with_addresses(["10.0.0.2"]),
            ],
            Vec::new(),
            "",
        );

        assert_eq!(snapshot.interfaces().len(), 1);
        assert!(snapshot.interface("eth0").unwrap().addresses.contains("10.0.0.2"));
    }

    #[test]
    fn test_report_serializes_to_json() {
        let report = MonitorReport {
            full: false,
            interfaces: Vec::new(),
            services: vec![ServiceRecord::new("VNC", true)],
            region_code: "DE".to_string(),
            captured_at: Utc::now(),
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["full"], false);
        assert_eq!(json["region_code"], "DE");
        assert_eq!(json["services"][0]["name"], "VNC");
        assert!(!report.is_empty());
    }
}
