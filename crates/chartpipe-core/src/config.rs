//! Pipeline configuration
//!
//! Configuration comes from three places, read once at startup:
//! - built-in defaults (`PipelineConfig::default`)
//! - an optional YAML file (`PipelineConfig::load`)
//! - the process environment, for registry credentials only
//!   (`RegistryConfig::from_env`)

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{PipelineError, Result};

pub const REGISTRY_ENV: &str = "CONTAINER_REGISTRY";
pub const REGISTRY_USER_ENV: &str = "CONTAINER_REGISTRY_USER";
pub const REGISTRY_PASSWORD_ENV: &str = "CONTAINER_REGISTRY_PASSWORD";

pub const DEFAULT_REGISTRY: &str = "docker.io";
pub const DEFAULT_REGISTRY_USER: &str = "salaboy";

pub const DEFAULT_HELM_IMAGE: &str = "alpine/helm:3.12.1";
pub const DEFAULT_YQ_IMAGE: &str = "mikefarah/yq:4";

/// Registry host and credentials used by the publish stage
#[derive(Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    pub host: String,
    pub username: String,
    password: String,
}

impl RegistryConfig {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Read the registry settings from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the registry settings from an arbitrary variable lookup.
    ///
    /// A variable that is set to the empty string counts as set; only a
    /// missing variable falls back to the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            host: lookup(REGISTRY_ENV).unwrap_or_else(|| DEFAULT_REGISTRY.to_string()),
            username: lookup(REGISTRY_USER_ENV)
                .unwrap_or_else(|| DEFAULT_REGISTRY_USER.to_string()),
            password: lookup(REGISTRY_PASSWORD_ENV).unwrap_or_default(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// OCI destination charts are pushed to: `oci://<host>/<user>`
    pub fn destination(&self) -> String {
        format!("oci://{}/{}", self.host, self.username)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY, DEFAULT_REGISTRY_USER, "")
    }
}

impl fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .finish()
    }
}

/// Container images for the external tools
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolImages {
    pub helm: String,
    pub yq: String,
}

impl Default for ToolImages {
    fn default() -> Self {
        Self {
            helm: DEFAULT_HELM_IMAGE.to_string(),
            yq: DEFAULT_YQ_IMAGE.to_string(),
        }
    }
}

/// Target platform in `os/arch[/variant]` form
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Platform {
    os: String,
    architecture: String,
    variant: Option<String>,
}

impl Platform {
    pub fn os(&self) -> &str {
        &self.os
    }

    pub fn architecture(&self) -> &str {
        &self.architecture
    }

    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }
}

impl FromStr for Platform {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        let invalid = || PipelineError::config(format!("invalid platform '{}': expected os/arch[/variant]", s));

        match parts.as_slice() {
            [os, arch] if !os.is_empty() && !arch.is_empty() => Ok(Self {
                os: os.to_string(),
                architecture: normalize_arch(arch),
                variant: None,
            }),
            [os, arch, variant] if !os.is_empty() && !arch.is_empty() && !variant.is_empty() => {
                Ok(Self {
                    os: os.to_string(),
                    architecture: normalize_arch(arch),
                    variant: Some(variant.to_string()),
                })
            }
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Platform {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.architecture)?;
        if let Some(variant) = &self.variant {
            write!(f, "/{}", variant)?;
        }
        Ok(())
    }
}

/// Map common aliases to their OCI architecture names
fn normalize_arch(arch: &str) -> String {
    match arch {
        "x86_64" | "x86-64" => "amd64".to_string(),
        "aarch64" => "arm64".to_string(),
        other => other.to_string(),
    }
}

/// What the test stage does
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestMode {
    /// Always succeeds without touching the container backend
    #[default]
    Noop,
    /// Run `helm lint` against the chart source
    Lint,
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Chart source directory, relative to the working directory
    pub chart_dir: PathBuf,
    /// Values file, relative to the chart directory
    pub values_file: PathBuf,
    /// yq path of the field that receives the version tag
    pub version_field: String,
    /// Host directory packaged archives are written to
    pub output_dir: PathBuf,
    pub images: ToolImages,
    /// Declared target platforms. Charts are architecture independent, so
    /// these are informational only.
    pub platforms: Vec<Platform>,
    pub test_mode: TestMode,

    #[serde(skip)]
    pub registry: RegistryConfig,
    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub work_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chart_dir: PathBuf::from("helm/conference-app"),
            values_file: PathBuf::from("values.yaml"),
            version_field: ".version".to_string(),
            output_dir: PathBuf::from("."),
            images: ToolImages::default(),
            platforms: vec![
                Platform {
                    os: "linux".to_string(),
                    architecture: "amd64".to_string(),
                    variant: None,
                },
                Platform {
                    os: "linux".to_string(),
                    architecture: "arm64".to_string(),
                    variant: None,
                },
            ],
            test_mode: TestMode::Noop,
            registry: RegistryConfig::default(),
            work_dir: PathBuf::from("."),
        }
    }
}

impl PipelineConfig {
    /// Load a YAML configuration file on top of the defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| PipelineError::file_access(path, e))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a defaulted struct
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chart_dir.as_os_str().is_empty() {
            return Err(PipelineError::config("chart_dir must not be empty"));
        }
        if self.values_file.as_os_str().is_empty() {
            return Err(PipelineError::config("values_file must not be empty"));
        }
        if !self.version_field.starts_with('.') {
            return Err(PipelineError::config(format!(
                "version_field '{}' must be a yq path starting with '.'",
                self.version_field
            )));
        }
        if self.images.helm.is_empty() || self.images.yq.is_empty() {
            return Err(PipelineError::config("tool images must not be empty"));
        }
        Ok(())
    }

    /// Resolve a path against the working directory
    pub fn host_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.work_dir.join(path)
        }
    }

    pub fn chart_path(&self) -> PathBuf {
        self.host_path(&self.chart_dir)
    }

    pub fn values_path(&self) -> PathBuf {
        self.chart_path().join(&self.values_file)
    }

    pub fn output_path(&self) -> PathBuf {
        self.host_path(&self.output_dir)
    }
}
