pub mod backend;
pub mod config;
pub mod error;
pub mod executor;
pub mod inventory;
pub mod node;
pub mod observability;
pub mod plan;
pub mod policy;
pub mod types;

// Test helpers are exposed for integration tests
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use backend::GuestBackend;
pub use config::{Config, ConfigBuilder, ShutdownConfig};
pub use error::{PveoffError, PveoffResult};
pub use executor::{ReportEntry, ShutdownExecutor, ShutdownOutcome, ShutdownReport};
pub use inventory::collect_inventory;
pub use plan::{build_plan, ShutdownPlan};
pub use policy::{PolicyResolver, ResolvedPolicy, StartupSpec};
pub use types::{
    GuestConfig, GuestDescriptor, GuestKind, GuestSummary, InventoryEntry, RunState,
    ShutdownMethod, ShutdownRequest,
};
