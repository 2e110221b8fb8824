use std::sync::Arc;

use pveoff_core::{
    build_plan, collect_inventory, GuestBackend, PolicyResolver, PveoffResult, ShutdownConfig,
    ShutdownExecutor, ShutdownPlan, ShutdownReport,
};
use tracing::info;

/// Drives one shutdown run on a single node
///
/// ```text
/// collect_inventory ──▶ PolicyResolver ──▶ build_plan ──▶ ShutdownExecutor
///   (fatal errors)        (fatal errors)                  (per-guest errors)
/// ```
pub struct ShutdownOrchestrator {
    backend: Arc<dyn GuestBackend>,
    node: String,
    config: ShutdownConfig,
}

impl ShutdownOrchestrator {
    pub fn new(backend: Arc<dyn GuestBackend>, node: impl Into<String>, config: ShutdownConfig) -> Self {
        Self {
            backend,
            node: node.into(),
            config,
        }
    }

    /// Collect, resolve and order every guest on the node without touching any of them
    pub async fn plan(&self) -> PveoffResult<ShutdownPlan> {
        let inventory = collect_inventory(self.backend.as_ref(), &self.node).await?;
        let resolver = PolicyResolver::new(self.config.clone());
        let plan = build_plan(resolver.describe_all(&inventory)?);

        info!("Ordered off list: {} guest(s)", plan.len());
        for (step, guest) in plan.iter().enumerate() {
            info!(
                step = step + 1,
                priority = guest.priority,
                method = %guest.method,
                timeout_secs = guest.timeout_secs.get(),
                "{}",
                guest
            );
        }
        Ok(plan)
    }

    /// Build the plan, then power off every guest in it.
    ///
    /// Errors are returned only for the planning phase; once execution starts
    /// every guest is attempted and the outcome is in the report.
    pub async fn run(&self) -> PveoffResult<ShutdownReport> {
        let plan = self.plan().await?;
        let executor = ShutdownExecutor::new(self.backend.clone(), self.node.clone(), self.config.clone());
        Ok(executor.run(&plan).await)
    }
}
