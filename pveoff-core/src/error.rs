use thiserror::Error;

use crate::types::GuestKind;

#[derive(Error, Debug)]
pub enum PveoffError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to execute '{program}'")]
    CommandSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("pvesh exit code is not 0: {code:?} /// stderr: {stderr} /// stdout: {stdout} /// args: {args:?}")]
    CommandFailed {
        code: Option<i32>,
        stderr: String,
        stdout: String,
        args: Vec<String>,
    },

    #[error("Unexpected response from '{path}': {details}")]
    UnexpectedResponse { path: String, details: String },

    #[error("Invalid {field} value '{value}'")]
    InvalidPolicy { field: String, value: String },

    #[error("Shutdown policy of {kind} {vmid} is invalid: {source}")]
    GuestPolicy {
        kind: GuestKind,
        vmid: u32,
        #[source]
        source: Box<PveoffError>,
    },

    #[error("Operation '{operation}' is not supported for {kind} guests")]
    UnsupportedOperation { operation: String, kind: GuestKind },

    #[error("Failed to resolve node name: {0}")]
    NodeResolution(String),

    #[error("Invalid input for {field}: {message}")]
    InvalidInput { field: String, message: String },
}

pub type PveoffResult<T> = std::result::Result<T, PveoffError>;

impl PveoffError {
    /// Attach guest identity to a policy parsing error
    pub fn for_guest(self, kind: GuestKind, vmid: u32) -> Self {
        PveoffError::GuestPolicy {
            kind,
            vmid,
            source: Box::new(self),
        }
    }
}
