use async_trait::async_trait;

use crate::error::PveoffResult;
use crate::types::{GuestConfig, GuestKind, GuestSummary, RunState, ShutdownRequest};

/// Read and power operations a node's management interface must provide.
///
/// Every call blocks the pipeline until it completes. Implementations report
/// any failure of the underlying interface as an error and never retry.
#[async_trait]
pub trait GuestBackend: Send + Sync {
    /// Status record of `node`; used to confirm the node name resolves
    async fn node_status(&self, node: &str) -> PveoffResult<serde_json::Value>;

    /// Guests of `kind` on `node`, in the order the interface returns them
    async fn list_guests(&self, node: &str, kind: GuestKind) -> PveoffResult<Vec<GuestSummary>>;

    /// Raw configuration record of one guest
    async fn guest_config(
        &self,
        node: &str,
        kind: GuestKind,
        vmid: u32,
    ) -> PveoffResult<GuestConfig>;

    /// Live run-state of one guest
    async fn guest_status(&self, node: &str, kind: GuestKind, vmid: u32) -> PveoffResult<RunState>;

    /// Cooperative power-down bounded by `request.timeout_secs`
    async fn shutdown(
        &self,
        node: &str,
        kind: GuestKind,
        vmid: u32,
        request: ShutdownRequest,
    ) -> PveoffResult<()>;

    /// Immediate power cut
    async fn stop(&self, node: &str, kind: GuestKind, vmid: u32) -> PveoffResult<()>;

    /// Save a qemu guest's state to disk
    async fn suspend_to_disk(&self, node: &str, vmid: u32) -> PveoffResult<()>;
}
