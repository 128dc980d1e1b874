//! Package stage: stamp the version, then `helm package`

use tracing::info;

use crate::config::PipelineConfig;
use crate::environment::EnvironmentProvider;
use crate::error::{PipelineError, Result};
use crate::patch::Patcher;
use crate::reference::ChartReference;
use crate::runtime::RunSpec;
use crate::tag::VersionTag;

/// Where the chart source is mounted in the helm container
pub const CHART_MOUNT: &str = "/apps";
/// Where the host output directory is mounted in helm containers
pub const ARTIFACT_MOUNT: &str = "/dist";

pub struct Packager<'a> {
    config: &'a PipelineConfig,
    provider: &'a EnvironmentProvider,
}

impl<'a> Packager<'a> {
    pub fn new(config: &'a PipelineConfig, provider: &'a EnvironmentProvider) -> Self {
        Self { config, provider }
    }

    /// Package the chart for `tag` and return the reference helm reports.
    ///
    /// The values file is patched on the host before packaging; if the patch
    /// fails nothing is packaged.
    pub async fn package(&self, tag: &VersionTag) -> Result<ChartReference> {
        let mut env = self.provider.acquire().await?;

        Patcher::new(self.provider, &self.config.images.yq)
            .patch(
                &tag.assignment(&self.config.version_field),
                &self.config.values_path(),
            )
            .await?;

        // Dependency updates write into the chart, so helm works on a copy
        let chart = env.stage_directory(&self.config.chart_path(), "chart")?;
        let output_dir = self.config.output_path();
        std::fs::create_dir_all(&output_dir)
            .map_err(|e| PipelineError::file_access(&output_dir, e))?;

        let spec = RunSpec::new("helm", &self.config.images.helm)
            .mount(chart, CHART_MOUNT)
            .mount(output_dir, ARTIFACT_MOUNT)
            .workdir(CHART_MOUNT)
            .args(["package", "-u", ".", "--version", tag.as_str(), "-d", ARTIFACT_MOUNT]);
        let output = env.exec(&spec).await?;

        let reference = ChartReference::from_output(&output.stdout)?;
        info!(tag = %tag, archive = %reference.path(), "packaged chart");
        Ok(reference)
    }
}
