//! Docker-compatible CLI runtime

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{ContainerRuntime, RunSpec, ToolOutput};
use crate::error::{PipelineError, Result};

pub const DEFAULT_PROGRAM: &str = "docker";

/// Runs containers through a Docker-compatible command line client
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
}

impl DockerCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments for `<program> run ...`
    pub fn run_args(name: &str, spec: &RunSpec) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "--name".to_string(),
            name.to_string(),
        ];

        if spec.stdin.is_some() {
            args.push("--interactive".to_string());
        }
        if let Some(user) = &spec.user {
            args.push("--user".to_string());
            args.push(user.clone());
        }
        if let Some(workdir) = &spec.workdir {
            args.push("--workdir".to_string());
            args.push(workdir.clone());
        }
        for mount in &spec.mounts {
            let mut value = format!(
                "type=bind,source={},target={}",
                mount.host.display(),
                mount.target
            );
            if mount.read_only {
                value.push_str(",readonly");
            }
            args.push("--mount".to_string());
            args.push(value);
        }
        for (key, value) in &spec.env {
            args.push("--env".to_string());
            args.push(format!("{}={}", key, value));
        }

        args.push(spec.image.clone());
        args.extend(spec.args.iter().cloned());
        args
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn ping(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .args(["version", "--format", "{{.Server.Version}}"])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PipelineError::EnvironmentUnavailable {
                message: format!("failed to run '{}': {}", self.program, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::EnvironmentUnavailable {
                message: format!("'{} version' failed: {}", self.program, stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn run(&self, name: &str, spec: &RunSpec) -> Result<ToolOutput> {
        let mut child = Command::new(&self.program)
            .args(Self::run_args(name, spec))
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PipelineError::EnvironmentUnavailable {
                message: format!("failed to spawn '{}': {}", self.program, e),
            })?;

        if let Some(input) = &spec.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                // A tool that exits before reading its input closes the pipe;
                // its exit status and stderr say why
                let written = match stdin.write_all(input.as_bytes()).await {
                    Ok(()) => stdin.shutdown().await,
                    Err(e) => Err(e),
                };
                match written {
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                        debug!(container = %name, "{} closed its input early", spec.tool);
                    }
                    other => other?,
                }
            }
        }

        let output = child.wait_with_output().await?;

        Ok(ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn remove(&self, names: &[String]) {
        if names.is_empty() {
            return;
        }
        let status = std::process::Command::new(&self.program)
            .args(["rm", "--force"])
            .args(names)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        if let Err(e) = status {
            tracing::warn!("failed to remove containers {:?}: {}", names, e);
        }
    }
}
