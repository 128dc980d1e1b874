//! All command - package, test and publish in one run

use chartpipe_core::Verb;

use super::{Settings, execute};
use crate::display::print_summary;
use crate::error::Result;

pub async fn run(settings: &Settings, tag: &str) -> Result<()> {
    let report = execute(settings, Verb::All, tag).await?;
    print_summary(&report);
    Ok(())
}
