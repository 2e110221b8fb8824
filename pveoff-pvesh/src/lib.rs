pub mod backend;
pub mod client;
pub mod command_executor;

pub use backend::PveshBackend;
pub use client::{PveshClient, PveshOutput};
pub use command_executor::{CommandExecutor, CommandOutput, SystemCommandExecutor};

// Re-export core types for convenience
pub use pveoff_core::{
    backend::GuestBackend,
    error::{PveoffError, PveoffResult},
};
