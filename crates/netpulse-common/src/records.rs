//! Record types for interface and service state

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix that marks an interface as wireless by naming convention
pub const WIRELESS_PREFIX: &str = "wlan";

/// Services whose running state is tracked on every snapshot
pub const SERVICE_REGISTRY: [&str; 2] = ["SSH", "VNC"];

/// Unordered, deduplicated set of strings
///
/// Used for the addresses assigned to an interface and for the key sets of a
/// snapshot. Equality is set equality, insertion order is irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StringSet(BTreeSet<String>);

impl StringSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, returning false if it was already present
    pub fn insert(&mut self, value: impl Into<String>) -> bool {
        self.0.insert(value.into())
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.contains(value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for StringSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> Extend<S> for StringSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

impl IntoIterator for StringSet {
    type Item = String;
    type IntoIter = std::collections::btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for StringSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, "}}")
    }
}

/// State of one network interface at capture time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRecord {
    /// Interface name, unique within a snapshot
    pub name: String,
    /// Assigned addresses
    pub addresses: StringSet,
    /// SSID of the joined network; empty when unknown or not wireless
    #[serde(default)]
    pub ssid: String,
    /// Whether this is the platform's current default wireless interface
    #[serde(default)]
    pub default_wireless: bool,
}

impl InterfaceRecord {
    /// Create a record with no addresses
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addresses: StringSet::new(),
            ssid: String::new(),
            default_wireless: false,
        }
    }

    /// Builder-style helper to set the addresses
    pub fn with_addresses<S: Into<String>>(mut self, addresses: impl IntoIterator<Item = S>) -> Self {
        self.addresses = addresses.into_iter().collect();
        self
    }

    /// Builder-style helper to set the SSID
    pub fn with_ssid(mut self, ssid: impl Into<String>) -> Self {
        self.ssid = ssid.into();
        self
    }

    /// Builder-style helper to mark the default wireless interface
    pub fn with_default_wireless(mut self, default_wireless: bool) -> Self {
        self.default_wireless = default_wireless;
        self
    }

    /// Whether the name follows the wireless naming convention
    pub fn is_wireless_name(name: &str) -> bool {
        name.starts_with(WIRELESS_PREFIX)
    }
}

/// Running state of a registry service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub name: String,
    pub running: bool,
}

impl ServiceRecord {
    pub fn new(name: impl Into<String>, running: bool) -> Self {
        Self {
            name: name.into(),
            running,
        }
    }
}
