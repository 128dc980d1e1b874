//! Chart references produced by the packaging stage
//!
//! `helm package` reports its result as a single line:
//!
//! ```text
//! Successfully packaged chart and saved it to: /dist/conference-app-v1.0.0.tgz
//! ```
//!
//! The text before the `:` is kept as the reference name, the text after it is
//! the archive path the publish stage pushes.

use std::fmt;
use std::str::FromStr;

use crate::error::{PipelineError, Result};

/// Typed `<name>:<path>` record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartReference {
    name: String,
    path: String,
}

impl ChartReference {
    /// Parse the raw standard output of the packaging tool.
    ///
    /// Dependency updates print progress lines before the result, so only the
    /// last non-empty line is considered.
    pub fn from_output(output: &str) -> Result<Self> {
        let line = output
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("");
        line.parse()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Archive path, as seen from inside the packaging container
    pub fn path(&self) -> &str {
        &self.path
    }

    /// File name component of the archive path
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

impl FromStr for ChartReference {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        let separators = s.matches(':').count();
        let malformed = || PipelineError::MalformedReference {
            reference: s.to_string(),
            separators,
        };

        if separators != 1 {
            return Err(malformed());
        }
        let (name, path) = s.split_once(':').ok_or_else(malformed)?;
        let path = path.trim();
        if path.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            name: name.trim().to_string(),
            path: path.to_string(),
        })
    }
}

impl fmt::Display for ChartReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.path)
    }
}
