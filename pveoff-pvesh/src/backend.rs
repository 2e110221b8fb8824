use async_trait::async_trait;
use pveoff_core::backend::GuestBackend;
use pveoff_core::config::PveshConfig;
use pveoff_core::error::{PveoffError, PveoffResult};
use pveoff_core::types::{GuestConfig, GuestKind, GuestSummary, RunState, ShutdownRequest};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::client::{PveshClient, PveshOutput};
use crate::command_executor::CommandExecutor;

/// [`GuestBackend`] backed by the local `pvesh` tool
pub struct PveshBackend {
    client: PveshClient,
}

impl PveshBackend {
    pub fn new(config: &PveshConfig) -> Self {
        Self {
            client: PveshClient::new(config),
        }
    }

    /// Create a backend with a custom command executor (for testing)
    pub fn with_executor(config: &PveshConfig, executor: Box<dyn CommandExecutor>) -> Self {
        Self {
            client: PveshClient::with_executor(config, executor),
        }
    }

    /// Query `segments` and decode the JSON response into `T`
    async fn query_as<T: DeserializeOwned>(&self, segments: &[&str]) -> PveoffResult<T> {
        let value = self.query_json(segments).await?;
        serde_json::from_value(value).map_err(|e| PveoffError::UnexpectedResponse {
            path: segments.join("/"),
            details: e.to_string(),
        })
    }

    async fn query_json(&self, segments: &[&str]) -> PveoffResult<Value> {
        match self.client.query(segments).await? {
            PveshOutput::Json(value) => Ok(value),
            PveshOutput::Text(text) => Err(PveoffError::UnexpectedResponse {
                path: segments.join("/"),
                details: format!("expected JSON, got '{}'", text.trim()),
            }),
        }
    }

    async fn power_command(
        &self,
        node: &str,
        kind: GuestKind,
        vmid: u32,
        action: &str,
        params: &[(&str, String)],
    ) -> PveoffResult<()> {
        let vmid = vmid.to_string();
        let output = self
            .client
            .command(&["nodes", node, kind.as_str(), &vmid, "status", action], params)
            .await?;

        // Long-running requests return the task UPID
        if let PveshOutput::Json(Value::String(upid)) = &output {
            debug!("{} {} {} started task {}", action, kind, vmid, upid);
        }
        Ok(())
    }
}

/// Body of `status/current`
#[derive(serde::Deserialize)]
struct CurrentStatus {
    status: String,
}

#[async_trait]
impl GuestBackend for PveshBackend {
    async fn node_status(&self, node: &str) -> PveoffResult<Value> {
        self.query_json(&["nodes", node, "status"]).await
    }

    async fn list_guests(&self, node: &str, kind: GuestKind) -> PveoffResult<Vec<GuestSummary>> {
        self.query_as(&["nodes", node, kind.as_str()]).await
    }

    async fn guest_config(&self, node: &str, kind: GuestKind, vmid: u32) -> PveoffResult<GuestConfig> {
        let vmid = vmid.to_string();
        self.query_as(&["nodes", node, kind.as_str(), &vmid, "config"])
            .await
    }

    async fn guest_status(&self, node: &str, kind: GuestKind, vmid: u32) -> PveoffResult<RunState> {
        let vmid = vmid.to_string();
        let current: CurrentStatus = self
            .query_as(&["nodes", node, kind.as_str(), &vmid, "status", "current"])
            .await?;
        Ok(RunState::from(current.status.as_str()))
    }

    async fn shutdown(
        &self,
        node: &str,
        kind: GuestKind,
        vmid: u32,
        request: ShutdownRequest,
    ) -> PveoffResult<()> {
        let mut params = vec![("timeout", request.timeout_secs.to_string())];
        if request.force_stop {
            params.push(("forceStop", "1".to_string()));
        }
        self.power_command(node, kind, vmid, "shutdown", &params).await
    }

    async fn stop(&self, node: &str, kind: GuestKind, vmid: u32) -> PveoffResult<()> {
        self.power_command(node, kind, vmid, "stop", &[]).await
    }

    async fn suspend_to_disk(&self, node: &str, vmid: u32) -> PveoffResult<()> {
        self.power_command(node, GuestKind::Qemu, vmid, "suspend", &[("todisk", "1".to_string())])
            .await
    }
}
