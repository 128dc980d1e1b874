//! Scoped execution environments
//!
//! An [`Environment`] is acquired per stage from the [`EnvironmentProvider`]
//! and never shared. It owns a scratch directory on the host and tracks the
//! containers it has started. Dropping it releases both: scratch files are
//! deleted and containers still running (because the stage was cancelled or
//! panicked mid-run) are force-removed.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{PipelineError, Result};
use crate::runtime::{ContainerRuntime, RunSpec, ToolOutput};

/// Hands out fresh environments backed by one container runtime
#[derive(Clone)]
pub struct EnvironmentProvider {
    runtime: Arc<dyn ContainerRuntime>,
    scratch_root: PathBuf,
}

impl EnvironmentProvider {
    /// `scratch_root` must be a directory the container engine can bind-mount
    pub fn new(runtime: Arc<dyn ContainerRuntime>, scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            scratch_root: scratch_root.into(),
        }
    }

    /// Connect to the backend and create a new environment
    pub async fn acquire(&self) -> Result<Environment> {
        let version = self.runtime.ping().await?;

        let scratch = tempfile::Builder::new()
            .prefix(".chartpipe-")
            .tempdir_in(&self.scratch_root)
            .map_err(|e| PipelineError::file_access(&self.scratch_root, e))?;

        let id = uuid::Uuid::new_v4().simple().to_string()[..12].to_string();
        debug!(environment = %id, backend = %version, "acquired execution environment");

        Ok(Environment {
            id,
            runtime: Arc::clone(&self.runtime),
            scratch_path: scratch.path().to_path_buf(),
            scratch: Some(scratch),
            active: Vec::new(),
            runs: 0,
        })
    }
}

/// One stage's private execution environment
pub struct Environment {
    id: String,
    runtime: Arc<dyn ContainerRuntime>,
    scratch_path: PathBuf,
    /// `None` once released
    scratch: Option<TempDir>,
    /// Containers started but not yet known to have exited
    active: Vec<String>,
    runs: usize,
}

impl Environment {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_path
    }

    /// Run one container to completion.
    ///
    /// A non-zero exit becomes [`PipelineError::ToolFailed`] carrying the
    /// tool's own diagnostics.
    pub async fn exec(&mut self, spec: &RunSpec) -> Result<ToolOutput> {
        self.runs += 1;
        let name = format!("chartpipe-{}-{}", self.id, self.runs);
        debug!(container = %name, image = %spec.image, args = ?spec.args, "starting {}", spec.tool);

        self.active.push(name.clone());
        let result = self.runtime.run(&name, spec).await;
        self.active.retain(|n| n != &name);

        // The client failed, so the container may still be running
        let output = match result {
            Ok(output) => output,
            Err(e) => {
                warn!(container = %name, "{} run failed: {}", spec.tool, e);
                self.runtime.remove(std::slice::from_ref(&name));
                return Err(e);
            }
        };

        for line in output.stderr.lines().filter(|l| !l.trim().is_empty()) {
            debug!(tool = %spec.tool, "{}", line);
        }

        if !output.is_success() {
            return Err(PipelineError::ToolFailed {
                tool: spec.tool.clone(),
                image: spec.image.clone(),
                code: output.code,
                stderr: output.diagnostics().to_string(),
            });
        }

        Ok(output)
    }

    /// Copy a host file into the scratch directory under `name`
    pub fn stage_file(&self, source: &Path, name: &str) -> Result<PathBuf> {
        let dest = self.scratch_dir().join(name);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PipelineError::file_access(parent, e))?;
        }
        std::fs::copy(source, &dest).map_err(|e| PipelineError::file_access(source, e))?;
        Ok(dest)
    }

    /// Copy a host directory tree into the scratch directory under `name`.
    ///
    /// Tools then work on the copy, leaving the host tree untouched.
    pub fn stage_directory(&self, source: &Path, name: &str) -> Result<PathBuf> {
        if !source.is_dir() {
            return Err(PipelineError::file_access(
                source,
                std::io::Error::new(std::io::ErrorKind::NotFound, "directory not found"),
            ));
        }

        let dest = self.scratch_dir().join(name);
        let scratch = self.scratch_dir();
        let walker = WalkDir::new(source)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| !e.path().starts_with(scratch));
        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(source).to_path_buf();
                PipelineError::file_access(path, std::io::Error::other(e.to_string()))
            })?;
            let rel_path = entry.path().strip_prefix(source).unwrap_or(entry.path());
            let target = dest.join(rel_path);

            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&target)
                    .map_err(|e| PipelineError::file_access(&target, e))?;
            } else {
                std::fs::copy(entry.path(), &target)
                    .map_err(|e| PipelineError::file_access(entry.path(), e))?;
            }
        }

        Ok(dest)
    }

    /// Delete the scratch directory now instead of on drop
    pub(crate) fn release_scratch(&mut self) -> Result<()> {
        match self.scratch.take() {
            Some(scratch) => scratch
                .close()
                .map_err(|e| PipelineError::file_access(&self.scratch_path, e)),
            None => Ok(()),
        }
    }

    /// Copy a file out of the scratch directory over a host path
    pub fn export_file(&self, staged: &Path, dest: &Path) -> Result<()> {
        std::fs::copy(staged, dest).map_err(|e| PipelineError::file_access(dest, e))?;
        Ok(())
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        if !self.active.is_empty() {
            warn!(
                environment = %self.id,
                "removing {} interrupted container(s)",
                self.active.len()
            );
            self.runtime.remove(&self.active);
        }
        if let Err(e) = self.release_scratch() {
            warn!(
                environment = %self.id,
                path = %self.scratch_path.display(),
                "scratch directory left behind: {}",
                e
            );
        }
        debug!(environment = %self.id, "released execution environment");
    }
}
