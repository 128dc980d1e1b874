//! Display formatting for CLI output
//!
//! Stage progress goes to stdout; logs and errors go to stderr.

use chartpipe_core::{PipelineError, PipelineReport, Stage, StageObserver, VersionTag};
use console::style;
use std::time::Instant;

fn stage_verb(stage: Stage) -> &'static str {
    match stage {
        Stage::Package => "Packaging",
        Stage::Test => "Testing",
        Stage::Publish => "Publishing",
    }
}

/// Prints a line per stage transition
#[derive(Default)]
pub struct ConsoleObserver {
    started: Option<Instant>,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn elapsed(&self) -> String {
        self.started
            .map(|t| format!("{:.1}s", t.elapsed().as_secs_f64()))
            .unwrap_or_default()
    }
}

impl StageObserver for ConsoleObserver {
    fn stage_started(&mut self, stage: Stage, tag: &VersionTag) {
        self.started = Some(Instant::now());
        println!("{} {}", style(stage_verb(stage)).cyan().bold(), tag);
    }

    fn stage_finished(&mut self, stage: Stage, report: &PipelineReport) {
        println!(
            "  {} {} {}",
            style("✓").green().bold(),
            stage,
            style(self.elapsed()).dim()
        );
        match stage {
            Stage::Package => {
                if let Some(reference) = &report.reference {
                    println!("  {} {}", style("Chart").dim(), reference.path());
                }
            }
            Stage::Publish => {
                if let Some(outcome) = &report.publish {
                    println!("  {} {}", style("Pushed to").dim(), outcome.destination);
                }
            }
            Stage::Test => {}
        }
    }

    fn stage_failed(&mut self, stage: Stage, _error: &PipelineError) {
        println!(
            "  {} {} {}",
            style("✗").red().bold(),
            stage,
            style(self.elapsed()).dim()
        );
    }
}

/// Final summary after a successful run
pub fn print_summary(report: &PipelineReport) {
    println!();
    let stages: Vec<String> = report.completed.iter().map(ToString::to_string).collect();
    println!(
        "{} {} {} ({})",
        style("Done").green().bold(),
        report.verb,
        report.tag,
        stages.join(" → ")
    );

    if let Some(outcome) = &report.publish {
        for line in outcome.output.lines() {
            println!("  {}", style(line).dim());
        }
    }
}
