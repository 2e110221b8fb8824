use pveoff_core::config::PveshConfig;
use pveoff_core::error::{PveoffError, PveoffResult};
use pveoff_core::observability::{pvesh_span, record_duration};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, warn, Instrument};
use url::Url;

use crate::command_executor::{CommandExecutor, SystemCommandExecutor};

/// Every call asks for JSON; typed queries cannot decode anything else
const OUTPUT_FORMAT_ARG: &str = "--output-format=json";

/// Decoded stdout of a successful pvesh call
#[derive(Debug, Clone, PartialEq)]
pub enum PveshOutput {
    Json(Value),
    /// stdout was not valid JSON
    Text(String),
}

/// Thin wrapper around the `pvesh` command-line tool
pub struct PveshClient {
    binary: String,
    command_executor: Box<dyn CommandExecutor>,
}

impl PveshClient {
    pub fn new(config: &PveshConfig) -> Self {
        Self::with_executor(config, Box::new(SystemCommandExecutor))
    }

    /// Create a client with a custom command executor (for testing)
    pub fn with_executor(config: &PveshConfig, executor: Box<dyn CommandExecutor>) -> Self {
        Self {
            binary: config.binary.to_string_lossy().into_owned(),
            command_executor: executor,
        }
    }

    /// `/`-joined API path with every segment percent-encoded
    pub fn resource_path(segments: &[&str]) -> PveoffResult<String> {
        let mut url = Url::parse("pve://localhost/").map_err(|e| PveoffError::InvalidInput {
            field: "resource path".to_string(),
            message: e.to_string(),
        })?;

        url.path_segments_mut()
            .map_err(|_| PveoffError::InvalidInput {
                field: "resource path".to_string(),
                message: "base cannot hold path segments".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);

        Ok(url.path().to_string())
    }

    /// Read operation: `pvesh get <path>`
    pub async fn query(&self, segments: &[&str]) -> PveoffResult<PveshOutput> {
        self.exec("get", segments, &[]).await
    }

    /// Mutating operation: `pvesh create <path> -key=value ...`
    pub async fn command(
        &self,
        segments: &[&str],
        params: &[(&str, String)],
    ) -> PveoffResult<PveshOutput> {
        self.exec("create", segments, params).await
    }

    async fn exec(
        &self,
        action: &str,
        segments: &[&str],
        params: &[(&str, String)],
    ) -> PveoffResult<PveshOutput> {
        let path = Self::resource_path(segments)?;
        let span = pvesh_span(action, &path);
        self.run(action, path, params).instrument(span).await
    }

    async fn run(
        &self,
        action: &str,
        path: String,
        params: &[(&str, String)],
    ) -> PveoffResult<PveshOutput> {
        let mut args = vec![action.to_string(), path];
        args.extend(params.iter().map(|(k, v)| format!("-{}={}", k, v)));
        args.push(OUTPUT_FORMAT_ARG.to_string());

        debug!("Executing {} {:?}", self.binary, args);
        let start = Instant::now();

        let output = self
            .command_executor
            .execute(&self.binary, &args)
            .await
            .map_err(|source| PveoffError::CommandSpawn {
                program: self.binary.clone(),
                source,
            })?;

        record_duration(start);

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.success() {
            return Err(PveoffError::CommandFailed {
                code: output.code,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                stdout,
                args,
            });
        }

        match serde_json::from_str(&stdout) {
            Ok(value) => Ok(PveshOutput::Json(value)),
            Err(_) => {
                if !stdout.trim().is_empty() {
                    warn!("Plain text returned: {}", stdout.trim());
                }
                Ok(PveshOutput::Text(stdout))
            }
        }
    }
}
