//! Linux platform implementation
//!
//! Interfaces and addresses come from the sysinfo crate. SSID, service and
//! regulatory queries shell out to `iwgetid`, `systemctl` and `iw`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use netpulse_common::{Platform, PlatformError, PlatformResult};
use parking_lot::Mutex;
use regex::Regex;
use sysinfo::Networks;
use tokio::process::Command;

/// Matches the first `country XX:` line of `iw reg get`
const REGION_PATTERN: &str = r"(?m)^country\s+([A-Z0-9]{2}):";

/// Directory listing the kernel's network devices
const SYS_CLASS_NET: &str = "/sys/class/net";

/// Platform backed by sysinfo and standard Linux tooling
pub struct SystemPlatform {
    /// Interface list from the most recent enumeration
    networks: Mutex<Networks>,
    region_pattern: Regex,
    sys_class_net: PathBuf,
}

impl SystemPlatform {
    pub fn new() -> PlatformResult<Self> {
        let region_pattern =
            Regex::new(REGION_PATTERN).map_err(|e| PlatformError::ParseError(e.to_string()))?;

        Ok(Self {
            networks: Mutex::new(Networks::new()),
            region_pattern,
            sys_class_net: PathBuf::from(SYS_CLASS_NET),
        })
    }

    /// Extract the region code from `iw reg get` output
    fn parse_region_code(&self, output: &str) -> Option<String> {
        self.region_pattern
            .captures(output)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

#[async_trait]
impl Platform for SystemPlatform {
    async fn interface_names(&self) -> PlatformResult<Vec<String>> {
        let refreshed = blocking(Networks::new_with_refreshed_list).await?;
        let names = refreshed.list().keys().cloned().collect();
        *self.networks.lock() = refreshed;
        Ok(names)
    }

    async fn interface_addresses(&self, interface: &str) -> PlatformResult<Vec<String>> {
        let networks = self.networks.lock();
        let data = networks.list().get(interface).ok_or_else(|| {
            PlatformError::ResourceUnavailable(format!("interface {} disappeared", interface))
        })?;

        Ok(data
            .ip_networks()
            .iter()
            .map(|network| network.addr.to_string())
            .collect())
    }

    async fn ssid(&self, interface: &str) -> PlatformResult<String> {
        let output = run_command("iwgetid", &[interface, "--raw"]).await?;
        let stdout = successful_stdout("iwgetid", output)?;
        Ok(stdout.trim().to_string())
    }

    async fn default_wireless_interface(&self) -> PlatformResult<String> {
        let root = self.sys_class_net.clone();
        blocking(move || first_wireless_interface(&root)).await?
    }

    async fn service_running(&self, service: &str) -> PlatformResult<bool> {
        let unit = service_unit(service).ok_or_else(|| {
            PlatformError::NotSupported(format!("unknown service {}", service))
        })?;

        let output = run_command("systemctl", &["is-active", "--quiet", unit]).await?;
        Ok(output.status.success())
    }

    async fn wireless_region_code(&self) -> PlatformResult<String> {
        let output = run_command("iw", &["reg", "get"]).await?;
        let stdout = successful_stdout("iw", output)?;
        self.parse_region_code(&stdout)
            .ok_or_else(|| PlatformError::ParseError("no country line in iw output".to_string()))
    }

    fn name(&self) -> &'static str {
        "linux"
    }
}

/// systemd unit backing a registry service
fn service_unit(service: &str) -> Option<&'static str> {
    match service {
        "SSH" => Some("ssh"),
        "VNC" => Some("vncserver-x11-serviced"),
        _ => None,
    }
}

/// Lowest-named device under `root` that exposes a `wireless` directory
fn first_wireless_interface(root: &Path) -> PlatformResult<String> {
    let entries = fs::read_dir(root).map_err(|e| {
        PlatformError::ResourceUnavailable(format!("Failed to read {}: {}", root.display(), e))
    })?;

    entries
        .flatten()
        .filter(|entry| entry.path().join("wireless").is_dir())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .min()
        .ok_or_else(|| PlatformError::ResourceUnavailable("no wireless interface".to_string()))
}

/// Run filesystem or sysinfo work off the async worker threads
async fn blocking<T, F>(f: F) -> PlatformResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PlatformError::QueryFailed(format!("blocking query failed: {}", e)))
}

async fn run_command(program: &str, args: &[&str]) -> PlatformResult<Output> {
    Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                PlatformError::NotSupported(format!("{} not installed", program))
            }
            std::io::ErrorKind::PermissionDenied => {
                PlatformError::PermissionDenied(format!("{}: {}", program, e))
            }
            _ => PlatformError::QueryFailed(format!("{}: {}", program, e)),
        })
}

fn successful_stdout(program: &str, output: Output) -> PlatformResult<String> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PlatformError::QueryFailed(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            stderr.trim()
        )));
    }

    String::from_utf8(output.stdout).map_err(|e| PlatformError::ParseError(e.to_string()))
}
