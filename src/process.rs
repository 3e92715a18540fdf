//! Subprocess spawning, abstracted behind a trait so the discovery protocol
//! and dispatcher are testable without forking real children.
//!
//! Real spawning uses `std::process::Command` with piped stdio and one
//! reader thread per pipe, joined before the child is waited on — the
//! idiomatic way to drain two pipes concurrently without deadlocking when
//! there's no async runtime in the crate (see DESIGN.md for why `tokio` was
//! dropped from the teacher's stack).

use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::thread;

use crate::error::{ChildFailureError, IoFailureError, ShellError};

/// One finished child invocation.
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

/// A child process to spawn: program, argv, working directory, and the
/// sanitised environment (callers build this from [`crate::config::ShellConfig::child_env`]).
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<String>,
    pub env: Vec<(String, String)>,
    pub stdin: Option<Vec<u8>>,
}

/// Abstracts over "run this program, give me stdout/stderr/exit code",
/// letting the resolver and dispatcher be exercised against a fake in
/// tests.
pub trait ProcessSpawner: Send + Sync {
    fn spawn(&self, request: &SpawnRequest) -> Result<ExecResult, ShellError>;

    /// Spawn inheriting the caller's stdio (used for command execution,
    /// not discovery, which needs to capture output).
    fn spawn_inherited(&self, request: &SpawnRequest) -> Result<i32, ShellError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RealProcessSpawner;

impl RealProcessSpawner {
    pub fn new() -> Self {
        RealProcessSpawner
    }

    fn build_command(request: &SpawnRequest) -> Command {
        let mut cmd = Command::new(&request.program);
        cmd.args(&request.args);
        if let Some(cwd) = &request.cwd {
            cmd.current_dir(cwd);
        }
        cmd.env_clear();
        for (k, v) in &request.env {
            cmd.env(k, v);
        }
        cmd
    }
}

impl ProcessSpawner for RealProcessSpawner {
    fn spawn(&self, request: &SpawnRequest) -> Result<ExecResult, ShellError> {
        let mut cmd = Self::build_command(request);
        cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            ShellError::from(IoFailureError { message: format!("spawn '{}': {e}", request.program) })
        })?;

        if let Some(input) = &request.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                let _ = stdin.write_all(input);
            }
        }
        drop(child.stdin.take());

        let mut stdout_pipe = child.stdout.take().expect("piped stdout");
        let mut stderr_pipe = child.stderr.take().expect("piped stderr");

        let stdout_handle = thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stdout_pipe.read_to_end(&mut buf);
            buf
        });
        let mut stderr_buf = Vec::new();
        let _ = stderr_pipe.read_to_end(&mut stderr_buf);
        let stdout_buf = stdout_handle.join().unwrap_or_default();

        let status = child.wait().map_err(|e| ShellError::from(IoFailureError { message: e.to_string() }))?;
        let exit_code = status.code().unwrap_or(-1);

        if !status.success() {
            return Err(ShellError::from(ChildFailureError {
                exit_reason: format!("exited with status {}", exit_code),
                exit_code: status.code(),
                stdout: stdout_buf,
                stderr: stderr_buf,
            }));
        }

        Ok(ExecResult { stdout: stdout_buf, stderr: stderr_buf, exit_code })
    }

    fn spawn_inherited(&self, request: &SpawnRequest) -> Result<i32, ShellError> {
        let mut cmd = Self::build_command(request);
        cmd.stdin(Stdio::inherit()).stdout(Stdio::inherit()).stderr(Stdio::inherit());
        let status = cmd.status().map_err(|e| {
            ShellError::from(IoFailureError { message: format!("spawn '{}': {e}", request.program) })
        })?;
        Ok(status.code().unwrap_or(-1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_captures_stdout_and_exit_code() {
        let spawner = RealProcessSpawner::new();
        let result = spawner
            .spawn(&SpawnRequest {
                program: "/bin/echo".to_string(),
                args: vec!["hello".to_string()],
                cwd: None,
                env: vec![],
                stdin: None,
            })
            .unwrap();
        assert_eq!(result.stdout, b"hello\n");
        assert_eq!(result.exit_code, 0);
    }

    #[test]
    fn nonzero_exit_surfaces_as_child_failure() {
        let spawner = RealProcessSpawner::new();
        let err = spawner
            .spawn(&SpawnRequest {
                program: "/bin/sh".to_string(),
                args: vec!["-c".to_string(), "echo candidate; echo oops 1>&2; exit 3".to_string()],
                cwd: None,
                env: vec![],
                stdin: None,
            })
            .unwrap_err();
        match err {
            ShellError::ChildFailure(cf) => {
                assert_eq!(cf.exit_code, Some(3));
                assert_eq!(cf.stdout, b"candidate\n");
                assert_eq!(cf.stderr, b"oops\n");
            }
            other => panic!("expected ChildFailure, got {other:?}"),
        }
    }
}
