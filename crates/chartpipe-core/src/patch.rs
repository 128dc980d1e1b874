//! In-place YAML edits through a containerized yq

use std::path::Path;
use tracing::info;

use crate::environment::EnvironmentProvider;
use crate::error::{PipelineError, Result};
use crate::runtime::RunSpec;

/// Working directory of the yq image
const PATCH_MOUNT: &str = "/workdir";

/// Applies a yq expression to a host file
pub struct Patcher<'a> {
    provider: &'a EnvironmentProvider,
    image: &'a str,
}

impl<'a> Patcher<'a> {
    pub fn new(provider: &'a EnvironmentProvider, image: &'a str) -> Self {
        Self { provider, image }
    }

    /// Edit `file` in place with `expression`.
    ///
    /// The file is copied into a fresh environment, edited there, and only
    /// exported back over the host path when the edit succeeds.
    pub async fn patch(&self, expression: &str, file: &Path) -> Result<bool> {
        if expression.trim().is_empty() || file.as_os_str().is_empty() {
            return Err(PipelineError::validation(
                "expression and file are required to update YAML",
            ));
        }
        let file_name = file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                PipelineError::validation(format!("'{}' does not name a file", file.display()))
            })?;
        if !file.is_file() {
            return Err(PipelineError::file_access(
                file,
                std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            ));
        }

        let mut env = self.provider.acquire().await?;
        let staged = env.stage_file(file, &format!("patch/{}", file_name))?;
        let stage_dir = staged.parent().unwrap_or(env.scratch_dir()).to_path_buf();

        // yq must run as root to write the bind-mounted copy
        let spec = RunSpec::new("yq", self.image)
            .user("root")
            .mount(stage_dir, PATCH_MOUNT)
            .workdir(PATCH_MOUNT)
            .args(["-i", expression, file_name]);
        env.exec(&spec).await?;

        env.export_file(&staged, file)?;
        info!(file = %file.display(), "applied '{}'", expression);
        Ok(true)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::runtime::{MockRuntime, ToolOutput};
    use std::sync::Arc;

    /// Handler that emulates `yq -i '.version = "<v>"'` with a line rewrite
    pub(crate) fn fake_yq(spec: &RunSpec) -> Result<ToolOutput> {
        let mount = spec.mount_for(PATCH_MOUNT).expect("patch mount");
        let expression = &spec.args[1];
        let (field, value) = expression
            .split_once(" = ")
            .expect("assignment expression");
        let key = field.trim_start_matches('.');
        let value = value.trim_matches('"');

        let path = mount.host.join(&spec.args[2]);
        let content = std::fs::read_to_string(&path)?;
        let patched: Vec<String> = content
            .lines()
            .map(|line| {
                if line.starts_with(&format!("{}:", key)) {
                    format!("{}: {}", key, value)
                } else {
                    line.to_string()
                }
            })
            .collect();
        std::fs::write(&path, patched.join("\n") + "\n")?;
        Ok(ToolOutput::success(""))
    }

    fn setup(runtime: &MockRuntime) -> (tempfile::TempDir, EnvironmentProvider) {
        let dir = tempfile::tempdir().unwrap();
        let provider = EnvironmentProvider::new(Arc::new(runtime.clone()), dir.path());
        (dir, provider)
    }

    #[tokio::test]
    async fn test_patch_updates_host_file() {
        let runtime = MockRuntime::with_handler(fake_yq);
        let (dir, provider) = setup(&runtime);
        let values = dir.path().join("values.yaml");
        std::fs::write(&values, "version: v0.0.1\nreplicas: 1\n").unwrap();

        let patched = Patcher::new(&provider, "mikefarah/yq:4")
            .patch(r#".version = "v1.0.0""#, &values)
            .await
            .unwrap();

        assert!(patched);
        assert_eq!(
            std::fs::read_to_string(&values).unwrap(),
            "version: v1.0.0\nreplicas: 1\n"
        );

        let runs = runtime.runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].spec.user.as_deref(), Some("root"));
        assert_eq!(runs[0].spec.args, vec!["-i", r#".version = "v1.0.0""#, "values.yaml"]);
    }

    #[tokio::test]
    async fn test_empty_inputs_fail_without_container_work() {
        let runtime = MockRuntime::new();
        let (dir, provider) = setup(&runtime);
        let values = dir.path().join("values.yaml");
        std::fs::write(&values, "version: v0.0.1\n").unwrap();
        let patcher = Patcher::new(&provider, "mikefarah/yq:4");

        let err = patcher.patch("", &values).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation { .. }));
        let err = patcher.patch(".version = \"1\"", Path::new("")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation { .. }));

        assert_eq!(runtime.ping_count(), 0);
        assert!(runtime.runs().is_empty());
        assert_eq!(std::fs::read_to_string(&values).unwrap(), "version: v0.0.1\n");
    }

    #[tokio::test]
    async fn test_tool_error_leaves_file_untouched() {
        let runtime = MockRuntime::with_handler(|spec| {
            // Simulate a partial write before the failure
            let mount = spec.mount_for(PATCH_MOUNT).unwrap();
            std::fs::write(mount.host.join(&spec.args[2]), "garbage")?;
            Ok(ToolOutput::failure(1, "Error: 1:10: lexer: invalid input text"))
        });
        let (dir, provider) = setup(&runtime);
        let values = dir.path().join("values.yaml");
        std::fs::write(&values, "version: v0.0.1\n").unwrap();

        let err = Patcher::new(&provider, "mikefarah/yq:4")
            .patch(".version ==== x", &values)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("lexer: invalid input text"));
        assert_eq!(std::fs::read_to_string(&values).unwrap(), "version: v0.0.1\n");
    }

    #[tokio::test]
    async fn test_missing_file_is_access_error() {
        let runtime = MockRuntime::new();
        let (dir, provider) = setup(&runtime);

        let err = Patcher::new(&provider, "mikefarah/yq:4")
            .patch(".version = \"1\"", &dir.path().join("nope.yaml"))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::FileAccess { .. }));
        assert!(runtime.runs().is_empty());
    }
}
