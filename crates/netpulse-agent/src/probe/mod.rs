//! Host state probe
//!
//! Captures one immutable [`Snapshot`] per call by querying a [`Platform`].
//! Individual query failures are logged and replaced with empty defaults, so
//! a capture never fails as a whole.

mod system;


pub use system::SystemPlatform;

use std::sync::Arc;

use netpulse_common::{
    InterfaceRecord, Platform, ServiceRecord, Snapshot, StringSet, SERVICE_REGISTRY,
};
use tracing::debug;

/// Interface excluded from every snapshot
pub const LOOPBACK_INTERFACE: &str = "lo";

/// Snapshot producer backed by a platform implementation
#[derive(Clone)]
pub struct StateProbe {
    platform: Arc<dyn Platform>,
}

impl StateProbe {
    /// Create a probe over the given platform
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }

    /// Name of the underlying platform
    pub fn platform_name(&self) -> &'static str {
        self.platform.name()
    }

    /// Capture the current interface, service and region state
    pub async fn capture(&self) -> Snapshot {
        let interfaces = self.gather_interfaces().await;
        let services = self.gather_services().await;
        let region_code = self.region_code().await;

        Snapshot::new(interfaces, services, region_code)
    }

    async fn gather_interfaces(&self) -> Vec<InterfaceRecord> {
        let default_wireless = match self.platform.default_wireless_interface().await {
            Ok(name) => Some(name),
            Err(e) => {
                debug!(error = %e, "Cannot obtain default wireless interface");
                None
            }
        };

        let names = match self.platform.interface_names().await {
            Ok(names) => names,
            Err(e) => {
                debug!(error = %e, "Cannot obtain network interfaces");
                return Vec::new();
            }
        };

        let mut records = Vec::with_capacity(names.len());
        for name in names {
            if name == LOOPBACK_INTERFACE {
                continue;
            }

            let addresses: StringSet = match self.platform.interface_addresses(&name).await {
                Ok(addresses) => addresses.into_iter().collect(),
                Err(e) => {
                    debug!(interface = %name, error = %e, "Cannot obtain addresses");
                    StringSet::new()
                }
            };

            let ssid = if InterfaceRecord::is_wireless_name(&name) && !addresses.is_empty() {
                self.platform.ssid(&name).await.unwrap_or_else(|e| {
                    debug!(interface = %name, error = %e, "Cannot obtain SSID");
                    String::new()
                })
            } else {
                String::new()
            };

            let is_default = default_wireless.as_deref() == Some(name.as_str());
            records.push(InterfaceRecord {
                name,
                addresses,
                ssid,
                default_wireless: is_default,
            });
        }

        records
    }

    async fn gather_services(&self) -> Vec<ServiceRecord> {
        let mut services = Vec::with_capacity(SERVICE_REGISTRY.len());
        for name in SERVICE_REGISTRY {
            // Failures read as "not running"
            let running = self.platform.service_running(name).await.unwrap_or(false);
            services.push(ServiceRecord::new(name, running));
        }
        services
    }

    async fn region_code(&self) -> String {
        self.platform.wireless_region_code().await.unwrap_or_default()
    }
}
