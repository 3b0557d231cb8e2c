//! netpulse-agent library
//!
//! Provides the sampling, diffing and supervision components of the netpulse
//! host monitoring agent.

pub mod config;
pub mod control;
pub mod monitor;
pub mod probe;
pub mod report;
pub mod supervisor;

#[cfg(test)]
mod fixtures;

pub use config::AgentConfig;
pub use control::{parse_control_line, ControlSignal};
pub use monitor::{spawn_monitor, MonitorConfig, MonitorError, MonitorId, Termination};
pub use probe::{StateProbe, SystemPlatform};
pub use report::{diff_report, full_report};
pub use supervisor::Supervisor;
