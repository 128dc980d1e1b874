//! Test stage

use tracing::{debug, info};

use crate::config::{PipelineConfig, TestMode};
use crate::environment::EnvironmentProvider;
use crate::error::Result;
use crate::package::CHART_MOUNT;
use crate::runtime::RunSpec;
use crate::tag::VersionTag;

pub struct Tester<'a> {
    config: &'a PipelineConfig,
    provider: &'a EnvironmentProvider,
}

impl<'a> Tester<'a> {
    pub fn new(config: &'a PipelineConfig, provider: &'a EnvironmentProvider) -> Self {
        Self { config, provider }
    }

    /// Validate the chart for `tag`.
    ///
    /// Does not depend on a packaged archive; lint mode checks the chart
    /// source directly.
    pub async fn test(&self, tag: &VersionTag) -> Result<()> {
        match self.config.test_mode {
            TestMode::Noop => {
                debug!(tag = %tag, "no chart tests configured");
                Ok(())
            }
            TestMode::Lint => {
                let mut env = self.provider.acquire().await?;
                let chart = env.stage_directory(&self.config.chart_path(), "chart")?;

                let spec = RunSpec::new("helm", &self.config.images.helm)
                    .mount_read_only(chart, CHART_MOUNT)
                    .workdir(CHART_MOUNT)
                    .args(["lint", "."]);
                let output = env.exec(&spec).await?;

                for line in output.stdout.lines().filter(|l| !l.trim().is_empty()) {
                    debug!(tool = "helm", "{}", line);
                }
                info!(tag = %tag, "chart lint passed");
                Ok(())
            }
        }
    }
}
