//! chartpipe core - Helm chart build pipeline
//!
//! Packages a Helm chart, runs chart tests and publishes the archive to an
//! OCI registry. Every tool (yq, helm) runs in a throwaway container:
//! - `Pipeline`: sequences the stages for a command verb
//! - `Packager` / `Tester` / `Publisher`: the individual stages
//! - `Patcher`: in-place YAML edits used to stamp the chart version
//! - `EnvironmentProvider` / `Environment`: scoped container environments
//! - `ContainerRuntime`: the seam to the container engine

pub mod config;
pub mod environment;
pub mod error;
pub mod package;
pub mod patch;
pub mod pipeline;
pub mod publish;
pub mod reference;
pub mod runtime;
pub mod tag;
pub mod tester;

pub use config::{Platform, PipelineConfig, RegistryConfig, TestMode, ToolImages};
pub use environment::{Environment, EnvironmentProvider};
pub use error::{ErrorKind, PipelineError, Result};
pub use package::Packager;
pub use patch::Patcher;
pub use pipeline::{NoopObserver, Pipeline, PipelineReport, PipelineState, Stage, StageObserver, Verb};
pub use publish::{PublishOutcome, Publisher};
pub use reference::ChartReference;
pub use runtime::{ContainerRuntime, DockerCli, MockRuntime, RunSpec, ToolOutput};
pub use tag::VersionTag;
pub use tester::Tester;
