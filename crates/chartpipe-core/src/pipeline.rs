//! Stage sequencing
//!
//! ```text
//! package:  Idle -> Running(Package) -> Done
//! test:     Idle -> Running(Test) -> Done
//! publish:  Idle -> Running(Package) -> Running(Publish) -> Done
//! all:      Idle -> Running(Package) -> Running(Test) -> Running(Publish) -> Done
//! ```
//!
//! The first failing stage moves the pipeline to `Failed(stage)` and no later
//! stage runs.

use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::environment::EnvironmentProvider;
use crate::error::{PipelineError, Result};
use crate::package::Packager;
use crate::publish::{PublishOutcome, Publisher};
use crate::reference::ChartReference;
use crate::runtime::ContainerRuntime;
use crate::tag::VersionTag;
use crate::tester::Tester;

/// Command verbs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Package,
    Test,
    Publish,
    All,
}

impl Verb {
    /// Stages run for this verb, in order
    pub fn stages(self) -> &'static [Stage] {
        match self {
            Verb::Package => &[Stage::Package],
            Verb::Test => &[Stage::Test],
            Verb::Publish => &[Stage::Package, Stage::Publish],
            Verb::All => &[Stage::Package, Stage::Test, Stage::Publish],
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verb::Package => "package",
            Verb::Test => "test",
            Verb::Publish => "publish",
            Verb::All => "all",
        };
        f.write_str(s)
    }
}

/// A pipeline phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Package,
    Test,
    Publish,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Package => "package",
            Stage::Test => "test",
            Stage::Publish => "publish",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running(Stage),
    Done,
    Failed(Stage),
}

/// Progress callbacks, e.g. for terminal output
pub trait StageObserver {
    fn stage_started(&mut self, _stage: Stage, _tag: &VersionTag) {}
    fn stage_finished(&mut self, _stage: Stage, _report: &PipelineReport) {}
    fn stage_failed(&mut self, _stage: Stage, _error: &PipelineError) {}
}

/// Observer that ignores every event
pub struct NoopObserver;

impl StageObserver for NoopObserver {}

/// What a pipeline run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub verb: Verb,
    pub tag: VersionTag,
    pub completed: Vec<Stage>,
    pub reference: Option<ChartReference>,
    pub publish: Option<PublishOutcome>,
}

pub struct Pipeline {
    config: PipelineConfig,
    provider: EnvironmentProvider,
    state: PipelineState,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, runtime: Arc<dyn ContainerRuntime>) -> Self {
        let provider = EnvironmentProvider::new(runtime, config.work_dir.clone());
        Self {
            config,
            provider,
            state: PipelineState::Idle,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Run every stage of `verb`, stopping at the first failure
    pub async fn run(
        &mut self,
        verb: Verb,
        tag: &VersionTag,
        observer: &mut dyn StageObserver,
    ) -> Result<PipelineReport> {
        let mut report = PipelineReport {
            verb,
            tag: tag.clone(),
            completed: Vec::new(),
            reference: None,
            publish: None,
        };
        self.state = PipelineState::Idle;

        for &stage in verb.stages() {
            self.state = PipelineState::Running(stage);
            observer.stage_started(stage, tag);
            info!(stage = %stage, tag = %tag, "starting stage");

            let result = match stage {
                Stage::Package => Packager::new(&self.config, &self.provider)
                    .package(tag)
                    .await
                    .map(|reference| report.reference = Some(reference)),
                Stage::Test => Tester::new(&self.config, &self.provider).test(tag).await,
                Stage::Publish => match &report.reference {
                    Some(reference) => Publisher::new(&self.config, &self.provider)
                        .publish(reference)
                        .await
                        .map(|outcome| report.publish = Some(outcome)),
                    None => Err(PipelineError::validation(
                        "publish requires a packaged chart",
                    )),
                },
            };

            if let Err(e) = result {
                self.state = PipelineState::Failed(stage);
                warn!(stage = %stage, "stage failed: {}", e);
                observer.stage_failed(stage, &e);
                return Err(e);
            }

            report.completed.push(stage);
            observer.stage_finished(stage, &report);
        }

        self.state = PipelineState::Done;
        Ok(report)
    }
}
