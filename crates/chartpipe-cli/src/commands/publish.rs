//! Publish command - package the chart and push it to the registry

use chartpipe_core::Verb;
use console::style;

use super::{Settings, execute};
use crate::display::print_summary;
use crate::error::Result;

pub async fn run(settings: &Settings, tag: &str) -> Result<()> {
    let report = execute(settings, Verb::Publish, tag).await?;
    print_summary(&report);

    if let Some(outcome) = &report.publish {
        println!();
        println!(
            "{} helm install <release> {}/<chart> --version {}",
            style("Install with:").bold(),
            outcome.destination,
            report.tag
        );
    }

    Ok(())
}
