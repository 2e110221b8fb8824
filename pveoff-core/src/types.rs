use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;

use crate::error::PveoffError;

/// Category of a guest on a Proxmox VE node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuestKind {
    /// Full-virtualization guest
    Qemu,
    /// Lightweight container
    Lxc,
}

impl GuestKind {
    /// Collection order: all qemu guests first, then containers
    pub const ALL: [GuestKind; 2] = [GuestKind::Qemu, GuestKind::Lxc];

    /// Path segment used by the management API
    pub fn as_str(&self) -> &'static str {
        match self {
            GuestKind::Qemu => "qemu",
            GuestKind::Lxc => "lxc",
        }
    }

    /// Whether `method` can be applied to guests of this kind
    pub fn supports(&self, method: ShutdownMethod) -> bool {
        match method {
            ShutdownMethod::Shutdown | ShutdownMethod::Stop => true,
            ShutdownMethod::Suspend => matches!(self, GuestKind::Qemu),
        }
    }
}

impl fmt::Display for GuestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a guest is powered off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownMethod {
    /// Cooperative power-down bounded by a timeout
    Shutdown,
    /// Immediate power cut
    Stop,
    /// Save state to disk (qemu only)
    Suspend,
}

impl ShutdownMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownMethod::Shutdown => "shutdown",
            ShutdownMethod::Stop => "stop",
            ShutdownMethod::Suspend => "suspend",
        }
    }
}

impl fmt::Display for ShutdownMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShutdownMethod {
    type Err = PveoffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shutdown" => Ok(ShutdownMethod::Shutdown),
            "stop" => Ok(ShutdownMethod::Stop),
            "suspend" => Ok(ShutdownMethod::Suspend),
            other => Err(PveoffError::InvalidInput {
                field: "shutdown method".to_string(),
                message: format!("unknown method '{}'", other),
            }),
        }
    }
}

/// One entry of `GET /nodes/{node}/{qemu,lxc}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GuestSummary {
    #[serde(deserialize_with = "deserialize_vmid")]
    pub vmid: u32,
    #[serde(default)]
    pub name: Option<String>,
}

/// The subset of `GET /nodes/{node}/{kind}/{vmid}/config` that drives shutdown policy.
/// Every other key of the record is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuestConfig {
    /// `;`-separated tag list
    pub tags: Option<String>,
    /// `,`-separated `key=value` list, e.g. `order=2,up=30,down=60`
    pub startup: Option<String>,
    /// qemu display name
    pub name: Option<String>,
    /// lxc display name
    pub hostname: Option<String>,
}

impl GuestConfig {
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().or(self.hostname.as_deref())
    }
}

/// Live run-state reported by `status/current`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Running,
    Stopped,
    Other(String),
}

impl RunState {
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running)
    }
}

impl From<&str> for RunState {
    fn from(status: &str) -> Self {
        match status {
            "running" => RunState::Running,
            "stopped" => RunState::Stopped,
            other => RunState::Other(other.to_string()),
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Running => f.write_str("running"),
            RunState::Stopped => f.write_str("stopped"),
            RunState::Other(s) => f.write_str(s),
        }
    }
}

/// A guest and its raw config as collected from the node
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryEntry {
    pub vmid: u32,
    pub kind: GuestKind,
    pub config: GuestConfig,
}

/// Fully resolved shutdown instructions for one guest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuestDescriptor {
    pub vmid: u32,
    pub kind: GuestKind,
    pub name: Option<String>,
    pub method: ShutdownMethod,
    /// Higher values are shut down first
    pub priority: i64,
    pub timeout_secs: NonZeroU64,
}

impl fmt::Display for GuestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.vmid)?;
        if let Some(name) = &self.name {
            write!(f, " ({})", name)?;
        }
        Ok(())
    }
}

/// Parameters of a graceful shutdown request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownRequest {
    pub timeout_secs: NonZeroU64,
    /// Ask the management API to hard-stop the guest once the timeout expires
    pub force_stop: bool,
}

/// pvesh returns vmids as numbers for qemu and occasionally as strings
fn deserialize_vmid<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Vmid {
        Number(u32),
        Text(String),
    }

    match Vmid::deserialize(deserializer)? {
        Vmid::Number(n) => Ok(n),
        Vmid::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
