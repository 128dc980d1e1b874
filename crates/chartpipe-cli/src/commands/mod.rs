//! CLI commands

pub mod all;
pub mod package;
pub mod publish;

use chartpipe_core::{
    DockerCli, Pipeline, PipelineConfig, PipelineReport, PipelineState, RegistryConfig, TestMode,
    Verb, VersionTag,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::display::ConsoleObserver;
use crate::error::{CliError, Result};

/// Options shared by every verb
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub config: Option<PathBuf>,
    pub chart_dir: Option<PathBuf>,
    pub values_file: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub registry: Option<String>,
    pub registry_user: Option<String>,
    pub test_mode: Option<TestMode>,
    pub container_cli: String,
}

impl Settings {
    /// Defaults, then the config file, then the environment, then flags
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };
        config.work_dir = std::env::current_dir()?;

        if let Some(dir) = &self.chart_dir {
            config.chart_dir = dir.clone();
        }
        if let Some(file) = &self.values_file {
            config.values_file = file.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(mode) = self.test_mode {
            config.test_mode = mode;
        }

        config.registry = RegistryConfig::from_env();
        if let Some(host) = &self.registry {
            config.registry.host = host.clone();
        }
        if let Some(user) = &self.registry_user {
            config.registry.username = user.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

/// Run the stages of `verb` with terminal progress output
pub(crate) async fn execute(settings: &Settings, verb: Verb, tag: &str) -> Result<PipelineReport> {
    let tag = VersionTag::new(tag)?;
    let config = settings.pipeline_config()?;
    debug!(config = ?config, "resolved configuration");
    for platform in &config.platforms {
        debug!(
            platform = %platform,
            architecture = platform.architecture(),
            "declared target platform"
        );
    }

    let runtime = Arc::new(DockerCli::new(settings.container_cli.as_str()));
    let mut pipeline = Pipeline::new(config, runtime);
    let mut observer = ConsoleObserver::new();

    let result = pipeline.run(verb, &tag, &mut observer).await;
    result.map_err(|e| match pipeline.state() {
        PipelineState::Failed(stage) => CliError::from_stage(&stage.to_string(), e),
        _ => CliError::from(e),
    })
}
