use std::process::Stdio;
use tokio::process::Command;

/// Trait for executing commands - allows mocking in tests
#[async_trait::async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, program: &str, args: &[String]) -> Result<CommandOutput, std::io::Error>;
}

pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Default command executor that runs real commands
pub struct SystemCommandExecutor;

#[async_trait::async_trait]
impl CommandExecutor for SystemCommandExecutor {
    async fn execute(&self, program: &str, args: &[String]) -> Result<CommandOutput, std::io::Error> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let output = SystemCommandExecutor
            .execute("sh", &["-c".to_string(), "echo hello; exit 3".to_string()])
            .await
            .unwrap();

        assert_eq!(output.code, Some(3));
        assert!(!output.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }

    #[tokio::test]
    async fn missing_program_is_an_io_error() {
        let result = SystemCommandExecutor
            .execute("/nonexistent/pvesh", &[])
            .await;
        assert!(result.is_err());
    }
}
