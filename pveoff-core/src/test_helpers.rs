//! In-memory [`GuestBackend`] for tests
//!
//! Records every call so tests can assert on ordering and parameters.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::backend::GuestBackend;
use crate::error::{PveoffError, PveoffResult};
use crate::types::{GuestConfig, GuestKind, GuestSummary, RunState, ShutdownRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    NodeStatus,
    ListGuests { kind: GuestKind },
    GuestConfig { kind: GuestKind, vmid: u32 },
    GuestStatus { kind: GuestKind, vmid: u32 },
    Shutdown { kind: GuestKind, vmid: u32, request: ShutdownRequest },
    Stop { kind: GuestKind, vmid: u32 },
    SuspendToDisk { vmid: u32 },
}

impl BackendCall {
    pub fn is_power_off(&self) -> bool {
        matches!(
            self,
            BackendCall::Shutdown { .. } | BackendCall::Stop { .. } | BackendCall::SuspendToDisk { .. }
        )
    }

    pub fn vmid(&self) -> Option<u32> {
        match self {
            BackendCall::GuestConfig { vmid, .. }
            | BackendCall::GuestStatus { vmid, .. }
            | BackendCall::Shutdown { vmid, .. }
            | BackendCall::Stop { vmid, .. }
            | BackendCall::SuspendToDisk { vmid } => Some(*vmid),
            BackendCall::NodeStatus | BackendCall::ListGuests { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockGuest {
    pub vmid: u32,
    pub kind: GuestKind,
    pub config: GuestConfig,
    pub state: RunState,
    pub fail_config: bool,
    pub fail_status: bool,
    pub fail_power_off: bool,
}

impl MockGuest {
    fn new(kind: GuestKind, vmid: u32) -> Self {
        Self {
            vmid,
            kind,
            config: GuestConfig::default(),
            state: RunState::Running,
            fail_config: false,
            fail_status: false,
            fail_power_off: false,
        }
    }

    pub fn qemu(vmid: u32) -> Self {
        Self::new(GuestKind::Qemu, vmid)
    }

    pub fn lxc(vmid: u32) -> Self {
        Self::new(GuestKind::Lxc, vmid)
    }

    pub fn tags(mut self, tags: &str) -> Self {
        self.config.tags = Some(tags.to_string());
        self
    }

    pub fn startup(mut self, startup: &str) -> Self {
        self.config.startup = Some(startup.to_string());
        self
    }

    pub fn named(mut self, name: &str) -> Self {
        match self.kind {
            GuestKind::Qemu => self.config.name = Some(name.to_string()),
            GuestKind::Lxc => self.config.hostname = Some(name.to_string()),
        }
        self
    }

    pub fn running(mut self) -> Self {
        self.state = RunState::Running;
        self
    }

    pub fn stopped(mut self) -> Self {
        self.state = RunState::Stopped;
        self
    }

    pub fn fail_config(mut self) -> Self {
        self.fail_config = true;
        self
    }

    pub fn fail_status(mut self) -> Self {
        self.fail_status = true;
        self
    }

    pub fn fail_power_off(mut self) -> Self {
        self.fail_power_off = true;
        self
    }
}

#[derive(Debug, Default)]
pub struct MockBackend {
    guests: Vec<MockGuest>,
    fail_node_status: bool,
    fail_list: Vec<GuestKind>,
    calls: Mutex<Vec<BackendCall>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_guest(mut self, guest: MockGuest) -> Self {
        self.guests.push(guest);
        self
    }

    pub fn fail_node_status(mut self) -> Self {
        self.fail_node_status = true;
        self
    }

    pub fn fail_list(mut self, kind: GuestKind) -> Self {
        self.fail_list.push(kind);
        self
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    /// vmids of every attempted power-off, in order
    pub fn dispatched_vmids(&self) -> Vec<u32> {
        self.calls()
            .iter()
            .filter(|c| c.is_power_off())
            .filter_map(BackendCall::vmid)
            .collect()
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().push(call);
    }

    fn guest(&self, kind: GuestKind, vmid: u32) -> PveoffResult<&MockGuest> {
        self.guests
            .iter()
            .find(|g| g.kind == kind && g.vmid == vmid)
            .ok_or_else(|| failure(&format!("no such {} {}", kind, vmid)))
    }

    fn power_off(&self, kind: GuestKind, vmid: u32, call: BackendCall) -> PveoffResult<()> {
        self.record(call);
        if self.guest(kind, vmid)?.fail_power_off {
            return Err(failure("power off rejected"));
        }
        Ok(())
    }
}

fn failure(message: &str) -> PveoffError {
    PveoffError::CommandFailed {
        code: Some(255),
        stderr: message.to_string(),
        stdout: String::new(),
        args: Vec::new(),
    }
}

#[async_trait]
impl GuestBackend for MockBackend {
    async fn node_status(&self, _node: &str) -> PveoffResult<serde_json::Value> {
        self.record(BackendCall::NodeStatus);
        if self.fail_node_status {
            return Err(failure("hostname lookup failed"));
        }
        Ok(serde_json::json!({ "uptime": 1 }))
    }

    async fn list_guests(&self, _node: &str, kind: GuestKind) -> PveoffResult<Vec<GuestSummary>> {
        self.record(BackendCall::ListGuests { kind });
        if self.fail_list.contains(&kind) {
            return Err(failure("list failed"));
        }
        Ok(self
            .guests
            .iter()
            .filter(|g| g.kind == kind)
            .map(|g| GuestSummary {
                vmid: g.vmid,
                name: g.config.display_name().map(str::to_string),
            })
            .collect())
    }

    async fn guest_config(&self, _node: &str, kind: GuestKind, vmid: u32) -> PveoffResult<GuestConfig> {
        self.record(BackendCall::GuestConfig { kind, vmid });
        let guest = self.guest(kind, vmid)?;
        if guest.fail_config {
            return Err(failure("config unavailable"));
        }
        Ok(guest.config.clone())
    }

    async fn guest_status(&self, _node: &str, kind: GuestKind, vmid: u32) -> PveoffResult<RunState> {
        self.record(BackendCall::GuestStatus { kind, vmid });
        let guest = self.guest(kind, vmid)?;
        if guest.fail_status {
            return Err(failure("status unavailable"));
        }
        Ok(guest.state.clone())
    }

    async fn shutdown(
        &self,
        _node: &str,
        kind: GuestKind,
        vmid: u32,
        request: ShutdownRequest,
    ) -> PveoffResult<()> {
        self.power_off(kind, vmid, BackendCall::Shutdown { kind, vmid, request })
    }

    async fn stop(&self, _node: &str, kind: GuestKind, vmid: u32) -> PveoffResult<()> {
        self.power_off(kind, vmid, BackendCall::Stop { kind, vmid })
    }

    async fn suspend_to_disk(&self, _node: &str, vmid: u32) -> PveoffResult<()> {
        self.power_off(GuestKind::Qemu, vmid, BackendCall::SuspendToDisk { vmid })
    }
}
