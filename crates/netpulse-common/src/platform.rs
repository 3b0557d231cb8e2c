//! Platform abstraction for host state queries
//!
//! Each query is best effort. Callers substitute an empty or false default
//! when a query fails and carry on.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during platform queries
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Platform not supported: {0}")]
    NotSupported(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Unexpected output: {0}")]
    ParseError(String),

    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),
}

/// Result type for platform operations
pub type PlatformResult<T> = Result<T, PlatformError>;

/// OS-level queries consumed by the state probe
///
/// Implementations must be cheap to share between monitor workers; all
/// methods take `&self`.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Names of all network interfaces, loopback included
    async fn interface_names(&self) -> PlatformResult<Vec<String>>;

    /// Addresses assigned to one interface, in textual form
    async fn interface_addresses(&self, interface: &str) -> PlatformResult<Vec<String>>;

    /// SSID of the network a wireless interface is joined to
    async fn ssid(&self, interface: &str) -> PlatformResult<String>;

    /// Name of the platform's default wireless interface
    async fn default_wireless_interface(&self) -> PlatformResult<String>;

    /// Whether a registry service is currently running
    async fn service_running(&self, service: &str) -> PlatformResult<bool>;

    /// Configured wireless regulatory region, e.g. "US"
    async fn wireless_region_code(&self) -> PlatformResult<String>;

    /// Short platform name for logging
    fn name(&self) -> &'static str;
}
