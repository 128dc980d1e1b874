//! Publish stage: `helm registry login` + `helm push`

use std::path::{Component, Path, PathBuf};
use tracing::info;

use crate::config::PipelineConfig;
use crate::environment::EnvironmentProvider;
use crate::error::{PipelineError, Result};
use crate::package::ARTIFACT_MOUNT;
use crate::reference::ChartReference;
use crate::runtime::RunSpec;

/// Registry credentials directory shared by the login and push containers
const REGISTRY_MOUNT: &str = "/registry";
const REGISTRY_CONFIG: &str = "/registry/config.json";

/// Result of a successful push
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    /// `oci://<host>/<user>`
    pub destination: String,
    /// Host path of the pushed archive
    pub archive: PathBuf,
    /// Push tool output
    pub output: String,
}

pub struct Publisher<'a> {
    config: &'a PipelineConfig,
    provider: &'a EnvironmentProvider,
}

impl<'a> Publisher<'a> {
    pub fn new(config: &'a PipelineConfig, provider: &'a EnvironmentProvider) -> Self {
        Self { config, provider }
    }

    /// Log in to the configured registry and push the referenced archive
    pub async fn publish(&self, reference: &ChartReference) -> Result<PublishOutcome> {
        let (archive, chart_path) = self.locate_archive(reference)?;
        let registry = &self.config.registry;
        let destination = registry.destination();

        let mut env = self.provider.acquire().await?;
        let registry_dir = env.scratch_dir().join("registry");
        std::fs::create_dir_all(&registry_dir)
            .map_err(|e| PipelineError::file_access(&registry_dir, e))?;

        // The password only ever travels over stdin
        let login = RunSpec::new("helm", &self.config.images.helm)
            .mount(&registry_dir, REGISTRY_MOUNT)
            .env("HELM_REGISTRY_CONFIG", REGISTRY_CONFIG)
            .args([
                "registry",
                "login",
                "-u",
                registry.username.as_str(),
                registry.host.as_str(),
                "--password-stdin",
            ])
            .stdin(registry.password());
        env.exec(&login).await?;
        info!(registry = %registry.host, user = %registry.username, "logged in");

        let push = RunSpec::new("helm", &self.config.images.helm)
            .mount(&registry_dir, REGISTRY_MOUNT)
            .mount_read_only(self.config.output_path(), ARTIFACT_MOUNT)
            .env("HELM_REGISTRY_CONFIG", REGISTRY_CONFIG)
            .args(["push", chart_path.as_str(), destination.as_str()]);
        let output = env.exec(&push).await?;

        // helm push reports the pushed digest on stderr
        let report = [output.stdout.trim(), output.stderr.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        info!(destination = %destination, "pushed {}", archive.display());
        for line in report.lines() {
            info!("{}", line);
        }

        Ok(PublishOutcome {
            destination,
            archive,
            output: report,
        })
    }

    /// Map the reference path to the host archive and the path pushed from
    /// inside the container.
    ///
    /// Absolute paths must live under the artifact mount; relative paths are
    /// taken relative to it.
    fn locate_archive(&self, reference: &ChartReference) -> Result<(PathBuf, String)> {
        let path = reference.path();
        let missing = || PipelineError::ArtifactMissing {
            path: PathBuf::from(path),
        };

        let relative = if path.starts_with('/') {
            path.strip_prefix(ARTIFACT_MOUNT)
                .and_then(|rest| rest.strip_prefix('/'))
                .ok_or_else(missing)?
        } else {
            path
        };

        let relative = Path::new(relative);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if relative.as_os_str().is_empty() || escapes {
            return Err(missing());
        }

        let archive = self.config.output_path().join(relative);
        if !archive.is_file() {
            return Err(PipelineError::ArtifactMissing { path: archive });
        }

        let chart_path = format!("{}/{}", ARTIFACT_MOUNT, relative.display());
        Ok((archive, chart_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::runtime::{MockRuntime, ToolOutput};
    use std::sync::Arc;

    fn setup(
        runtime: &MockRuntime,
        registry: RegistryConfig,
        archives: &[&str],
    ) -> (tempfile::TempDir, PipelineConfig, EnvironmentProvider) {
        let root = tempfile::tempdir().unwrap();
        for archive in archives {
            std::fs::write(root.path().join(archive), b"chart").unwrap();
        }
        let config = PipelineConfig {
            work_dir: root.path().to_path_buf(),
            registry,
            ..Default::default()
        };
        let provider = EnvironmentProvider::new(Arc::new(runtime.clone()), root.path());
        (root, config, provider)
    }

    fn push_ok(spec: &RunSpec) -> Result<ToolOutput> {
        if spec.args[0] == "push" {
            Ok(ToolOutput {
                code: Some(0),
                stdout: String::new(),
                stderr: "Pushed: docker.io/salaboy/conference-app:v1.0.0\nDigest: sha256:abc\n"
                    .to_string(),
            })
        } else {
            Ok(ToolOutput::success("Login Succeeded\n"))
        }
    }

    #[tokio::test]
    async fn test_login_then_push() {
        let runtime = MockRuntime::with_handler(push_ok);
        let registry = RegistryConfig::new("ghcr.io", "octo", "s3cret");
        let (_root, config, provider) =
            setup(&runtime, registry, &["conference-app-v1.0.0.tgz"]);
        let reference = ChartReference::from_output(
            "Successfully packaged chart and saved it to: /dist/conference-app-v1.0.0.tgz",
        )
        .unwrap();

        let outcome = Publisher::new(&config, &provider)
            .publish(&reference)
            .await
            .unwrap();

        assert_eq!(outcome.destination, "oci://ghcr.io/octo");
        assert!(outcome.output.contains("Digest: sha256:abc"));
        assert_eq!(
            runtime.commands(),
            vec![
                vec!["registry", "login", "-u", "octo", "ghcr.io", "--password-stdin"],
                vec!["push", "/dist/conference-app-v1.0.0.tgz", "oci://ghcr.io/octo"],
            ]
        );

        let runs = runtime.runs();
        assert_eq!(runs[0].spec.stdin.as_deref(), Some("s3cret"));
        assert!(runs[1].spec.stdin.is_none());
        // Both containers share the registry credentials directory
        assert_eq!(
            runs[0].spec.mount_for(REGISTRY_MOUNT),
            runs[1].spec.mount_for(REGISTRY_MOUNT)
        );
        assert!(runs.iter().all(|r| !r.spec.args.iter().any(|a| a.contains("s3cret"))));
    }

    #[tokio::test]
    async fn test_relative_reference_path() {
        let runtime = MockRuntime::with_handler(push_ok);
        let (_root, config, provider) = setup(&runtime, RegistryConfig::default(), &["1.2.3"]);
        let reference: ChartReference = "my-chart:1.2.3".parse().unwrap();

        Publisher::new(&config, &provider)
            .publish(&reference)
            .await
            .unwrap();

        let commands = runtime.commands();
        assert_eq!(commands[1], vec!["push", "/dist/1.2.3", "oci://docker.io/salaboy"]);
    }

    #[tokio::test]
    async fn test_empty_password_still_logs_in() {
        let runtime = MockRuntime::with_handler(|spec| {
            if spec.stdin.as_deref() == Some("") {
                Ok(ToolOutput::failure(
                    1,
                    "Error: login attempt to https://registry-1.docker.io/v2/ failed with status: 401 Unauthorized",
                ))
            } else {
                Ok(ToolOutput::success(""))
            }
        });
        let (_root, config, provider) =
            setup(&runtime, RegistryConfig::default(), &["app-1.0.0.tgz"]);
        let reference: ChartReference = "saved it to: /dist/app-1.0.0.tgz".parse().unwrap();

        let err = Publisher::new(&config, &provider)
            .publish(&reference)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("401 Unauthorized"));
        assert_eq!(runtime.runs().len(), 1, "push must not run after failed login");
    }

    #[tokio::test]
    async fn test_push_rejection_is_surfaced() {
        let runtime = MockRuntime::with_handler(|spec| {
            if spec.args[0] == "push" {
                Ok(ToolOutput::failure(1, "Error: denied: requested access to the resource is denied"))
            } else {
                Ok(ToolOutput::success("Login Succeeded"))
            }
        });
        let (_root, config, provider) =
            setup(&runtime, RegistryConfig::default(), &["app-1.0.0.tgz"]);
        let reference: ChartReference = "saved it to: /dist/app-1.0.0.tgz".parse().unwrap();

        let err = Publisher::new(&config, &provider)
            .publish(&reference)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::ToolFailed { .. }));
        assert!(err.to_string().contains("requested access to the resource is denied"));
    }

    #[tokio::test]
    async fn test_missing_archive_fails_before_login() {
        let runtime = MockRuntime::new();
        let (_root, config, provider) = setup(&runtime, RegistryConfig::default(), &[]);
        let reference: ChartReference = "saved it to: /dist/app-1.0.0.tgz".parse().unwrap();

        let err = Publisher::new(&config, &provider)
            .publish(&reference)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::ArtifactMissing { .. }));
        assert_eq!(runtime.ping_count(), 0);
    }

    #[tokio::test]
    async fn test_reference_outside_artifact_mount() {
        let runtime = MockRuntime::new();
        let (_root, config, provider) = setup(&runtime, RegistryConfig::default(), &["app.tgz"]);

        for raw in ["x: /apps/app.tgz", "x: /dist", "x: ../app.tgz", "x: /dist/../etc/passwd"] {
            let reference: ChartReference = raw.parse().unwrap();
            let err = Publisher::new(&config, &provider)
                .publish(&reference)
                .await
                .unwrap_err();
            assert!(
                matches!(err, PipelineError::ArtifactMissing { .. }),
                "{raw} should be rejected"
            );
        }
        assert!(runtime.runs().is_empty());
    }
}
