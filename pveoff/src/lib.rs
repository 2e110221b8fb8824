pub mod orchestrator;

pub use orchestrator::ShutdownOrchestrator;

// Re-export commonly used types
pub use pveoff_core::{
    config::Config,
    error::{PveoffError, PveoffResult},
    ShutdownPlan, ShutdownReport,
};

pub use pveoff_pvesh::PveshBackend;
