//! Package command - stamp the version and build the chart archive

use chartpipe_core::Verb;
use console::style;

use super::{Settings, execute};
use crate::display::print_summary;
use crate::error::Result;

pub async fn run(settings: &Settings, tag: &str) -> Result<()> {
    let report = execute(settings, Verb::Package, tag).await?;
    print_summary(&report);

    if let Some(reference) = &report.reference {
        println!("  {} {}", style("Archive").dim(), reference.file_name());
        println!();
        println!("To publish: chartpipe publish {}", report.tag);
    }

    Ok(())
}
