//! Container runtimes
//!
//! Every external tool runs in a throwaway container. The runtime trait is the
//! only seam between the pipeline and the container engine:
//! - **DockerCli** (default): drives any Docker-compatible CLI (`docker`,
//!   `podman`, `nerdctl`)
//! - **MockRuntime**: records invocations and answers from a handler, for
//!   tests without a container engine

mod docker;
mod mock;

pub use docker::DockerCli;
pub use mock::{MockRuntime, RecordedRun};

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;

use crate::error::Result;

/// Container runtime used by execution environments
///
/// Implementations must be Send + Sync so environments can hold them behind
/// an `Arc`.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Check that the backend is reachable and return its version
    async fn ping(&self) -> Result<String>;

    /// Run one container to completion under the given name
    async fn run(&self, name: &str, spec: &RunSpec) -> Result<ToolOutput>;

    /// Force-remove containers that may still be running.
    ///
    /// Called from `Drop`, so it must not block on the async runtime.
    fn remove(&self, names: &[String]);
}

/// A host path mounted into a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub host: PathBuf,
    pub target: String,
    pub read_only: bool,
}

/// Description of a single containerized tool invocation
#[derive(Clone, Default)]
pub struct RunSpec {
    /// Tool name used in logs and errors
    pub tool: String,
    pub image: String,
    pub args: Vec<String>,
    pub mounts: Vec<Mount>,
    pub env: Vec<(String, String)>,
    pub workdir: Option<String>,
    pub user: Option<String>,
    /// Data written to the container's standard input
    pub stdin: Option<String>,
}

impl RunSpec {
    pub fn new(tool: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            image: image.into(),
            ..Default::default()
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn mount(mut self, host: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        self.mounts.push(Mount {
            host: host.into(),
            target: target.into(),
            read_only: false,
        });
        self
    }

    pub fn mount_read_only(mut self, host: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        self.mounts.push(Mount {
            host: host.into(),
            target: target.into(),
            read_only: true,
        });
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn workdir(mut self, dir: impl Into<String>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Host path mounted at `target`, if any
    pub fn mount_for(&self, target: &str) -> Option<&Mount> {
        self.mounts.iter().find(|m| m.target == target)
    }
}

// Standard input may carry credentials
impl fmt::Debug for RunSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunSpec")
            .field("tool", &self.tool)
            .field("image", &self.image)
            .field("args", &self.args)
            .field("mounts", &self.mounts)
            .field("env", &self.env)
            .field("workdir", &self.workdir)
            .field("user", &self.user)
            .field("stdin", &self.stdin.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Captured result of a container run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    /// Diagnostic text for a failed run: stderr, or stdout when stderr is empty
    pub fn diagnostics(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim()
        } else {
            stderr
        }
    }
}
