//! Probe configuration stored as TOML (default `envprobe.toml`).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "envprobe.toml";

/// Probe configuration (TOML).
///
/// Missing fields default to the values the catalog was designed around.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProbeConfig {
    /// Prefix of the coordinated dummy variables (`<prefix>_0 .. <prefix>_3`).
    pub variable_prefix: String,

    pub probe: ExternalConfig,

    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExternalConfig {
    /// Build-system command (e.g. `["b2"]`). Empty means re-spawn this binary.
    pub command: Vec<String>,

    /// Name of the staged no-op toolset.
    pub toolset: String,

    /// Where to stage toolset files. Unset means a temporary directory.
    pub staging_dir: Option<PathBuf>,

    /// Kill the child after this many seconds. Unset means wait forever.
    pub timeout_secs: Option<u64>,

    /// Truncate captured child stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            toolset: "__envprobeDummyToolset__".to_string(),
            staging_dir: None,
            timeout_secs: None,
            output_limit_bytes: 100_000,
        }
    }
}

impl ExternalConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReportConfig {
    /// Leave out the "environment changes during run" section.
    pub suppress_aux_diff: bool,

    pub format: ReportFormat,

    /// Also write the report to this file.
    pub path: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            suppress_aux_diff: true,
            format: ReportFormat::Text,
            path: None,
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            variable_prefix: "ENVPROBE_DUMMY".to_string(),
            probe: ExternalConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl ProbeConfig {
    pub fn validate(&self) -> Result<()> {
        let prefix = self.variable_prefix.trim();
        if prefix.is_empty() {
            return Err(anyhow!("variable_prefix must be non-empty"));
        }
        if prefix.contains('=') || prefix.contains('\0') {
            return Err(anyhow!("variable_prefix must not contain '=' or NUL"));
        }
        if self.probe.toolset.trim().is_empty() {
            return Err(anyhow!("probe.toolset must be non-empty"));
        }
        if self.probe.output_limit_bytes == 0 {
            return Err(anyhow!("probe.output_limit_bytes must be > 0"));
        }
        if self.probe.timeout_secs == Some(0) {
            return Err(anyhow!("probe.timeout_secs must be > 0 when set"));
        }
        if let Some(program) = self.probe.command.first()
            && program.trim().is_empty()
        {
            return Err(anyhow!("probe.command must start with a program"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ProbeConfig::default()`.
pub fn load_config(path: &Path) -> Result<ProbeConfig> {
    if !path.exists() {
        let cfg = ProbeConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ProbeConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &ProbeConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
