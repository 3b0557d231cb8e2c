//! Scripted platform used by unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use netpulse_common::{Platform, PlatformError, PlatformResult};
use parking_lot::Mutex;

/// Answers the fake platform gives; a `None` makes the query fail
#[derive(Debug, Clone, Default)]
pub struct FakeState {
    pub interfaces: Vec<(String, Option<Vec<String>>)>,
    pub enumeration_fails: bool,
    pub ssids: HashMap<String, String>,
    pub default_wireless: Option<String>,
    pub services: HashMap<String, bool>,
    pub region_code: Option<String>,
}

impl FakeState {
    /// A small host: wired and wireless uplinks, SSH up, VNC down
    pub fn typical() -> Self {
        Self {
            interfaces: vec![
                ("lo".to_string(), Some(vec!["127.0.0.1".to_string()])),
                ("eth0".to_string(), Some(vec!["10.0.0.1".to_string()])),
                (
                    "wlan0".to_string(),
                    Some(vec!["192.168.1.20".to_string(), "fe80::1".to_string()]),
                ),
            ],
            enumeration_fails: false,
            ssids: HashMap::from([("wlan0".to_string(), "home".to_string())]),
            default_wireless: Some("wlan0".to_string()),
            services: HashMap::from([("SSH".to_string(), true), ("VNC".to_string(), false)]),
            region_code: Some("US".to_string()),
        }
    }

    pub fn set_addresses(&mut self, interface: &str, addresses: &[&str]) {
        let addresses = Some(addresses.iter().map(|a| a.to_string()).collect());
        match self.interfaces.iter_mut().find(|(name, _)| name == interface) {
            Some(entry) => entry.1 = addresses,
            None => self.interfaces.push((interface.to_string(), addresses)),
        }
    }
}

/// Platform returning scripted answers and counting the queries it sees
#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<FakeState>,
    enumerations: AtomicUsize,
    ssid_queries: Mutex<Vec<String>>,
}

impl FakePlatform {
    pub fn new(state: FakeState) -> Self {
        Self {
            state: Mutex::new(state),
            ..Default::default()
        }
    }

    /// Change the scripted answers for subsequent queries
    pub fn update(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut self.state.lock());
    }

    /// Number of interface enumerations, one per snapshot captured
    pub fn captures(&self) -> usize {
        self.enumerations.load(Ordering::SeqCst)
    }

    pub fn ssid_queries(&self) -> Vec<String> {
        self.ssid_queries.lock().clone()
    }
}

fn failed(what: &str) -> PlatformError {
    PlatformError::QueryFailed(format!("scripted failure: {}", what))
}

#[async_trait]
impl Platform for FakePlatform {
    async fn interface_names(&self) -> PlatformResult<Vec<String>> {
        self.enumerations.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock();
        if state.enumeration_fails {
            return Err(failed("interfaces"));
        }
        Ok(state.interfaces.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn interface_addresses(&self, interface: &str) -> PlatformResult<Vec<String>> {
        self.state
            .lock()
            .interfaces
            .iter()
            .find(|(name, _)| name == interface)
            .and_then(|(_, addresses)| addresses.clone())
            .ok_or_else(|| failed("addresses"))
    }

    async fn ssid(&self, interface: &str) -> PlatformResult<String> {
        self.ssid_queries.lock().push(interface.to_string());
        self.state
            .lock()
            .ssids
            .get(interface)
            .cloned()
            .ok_or_else(|| failed("ssid"))
    }

    async fn default_wireless_interface(&self) -> PlatformResult<String> {
        self.state
            .lock()
            .default_wireless
            .clone()
            .ok_or_else(|| failed("default wireless"))
    }

    async fn service_running(&self, service: &str) -> PlatformResult<bool> {
        self.state
            .lock()
            .services
            .get(service)
            .copied()
            .ok_or_else(|| failed("service"))
    }

    async fn wireless_region_code(&self) -> PlatformResult<String> {
        self.state
            .lock()
            .region_code
            .clone()
            .ok_or_else(|| failed("region"))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}
