//! Version tags stamped into the chart and used for the archive version

use std::fmt;

use crate::error::{PipelineError, Result};

/// A non-empty chart version tag such as `v1.0.0`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionTag(String);

impl VersionTag {
    pub fn new(tag: impl AsRef<str>) -> Result<Self> {
        let tag = tag.as_ref().trim();
        if tag.is_empty() {
            return Err(PipelineError::validation("version tag must not be empty"));
        }
        if tag.chars().any(char::is_whitespace) {
            return Err(PipelineError::validation(format!(
                "version tag '{}' must not contain whitespace",
                tag
            )));
        }
        Ok(Self(tag.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// yq assignment that stamps this tag into `field`.
    ///
    /// The tag is emitted as a double-quoted string literal so that values
    /// like `1.10` stay strings.
    pub fn assignment(&self, field: &str) -> String {
        let quoted = serde_json::to_string(&self.0).unwrap_or_else(|_| format!("\"{}\"", self.0));
        format!("{} = {}", field, quoted)
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VersionTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
