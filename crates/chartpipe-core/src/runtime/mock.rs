//! Mock container runtime for testing
//!
//! Records every invocation and answers from a handler closure, so pipeline
//! stages can be exercised without a container engine.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{ContainerRuntime, RunSpec, ToolOutput};
use crate::error::{PipelineError, Result};

type Handler = dyn Fn(&RunSpec) -> Result<ToolOutput> + Send + Sync;

/// A container run seen by the mock
#[derive(Debug, Clone)]
pub struct RecordedRun {
    pub name: String,
    pub spec: RunSpec,
}

/// In-memory runtime for tests
#[derive(Clone)]
pub struct MockRuntime {
    handler: Arc<Handler>,
    available: bool,
    delay: Option<Duration>,
    pings: Arc<AtomicUsize>,
    runs: Arc<Mutex<Vec<RecordedRun>>>,
    removed: Arc<Mutex<Vec<String>>>,
}

impl MockRuntime {
    /// A runtime where every container succeeds with empty output
    pub fn new() -> Self {
        Self::with_handler(|_| Ok(ToolOutput::success("")))
    }

    /// A runtime answering every run with `handler`
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&RunSpec) -> Result<ToolOutput> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            available: true,
            delay: None,
            pings: Arc::new(AtomicUsize::new(0)),
            runs: Arc::new(Mutex::new(Vec::new())),
            removed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A runtime whose backend can never be reached
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Sleep before answering each run
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn ping_count(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn runs(&self) -> Vec<RecordedRun> {
        lock(&self.runs).clone()
    }

    /// Tool arguments of every run, in order
    pub fn commands(&self) -> Vec<Vec<String>> {
        lock(&self.runs).iter().map(|r| r.spec.args.clone()).collect()
    }

    pub fn removed(&self) -> Vec<String> {
        lock(&self.removed).clone()
    }
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn ping(&self) -> Result<String> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        if self.available {
            Ok("mock".to_string())
        } else {
            Err(PipelineError::EnvironmentUnavailable {
                message: "mock backend is unavailable".to_string(),
            })
        }
    }

    async fn run(&self, name: &str, spec: &RunSpec) -> Result<ToolOutput> {
        lock(&self.runs).push(RecordedRun {
            name: name.to_string(),
            spec: spec.clone(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.handler)(spec)
    }

    fn remove(&self, names: &[String]) {
        lock(&self.removed).extend(names.iter().cloned());
    }
}
