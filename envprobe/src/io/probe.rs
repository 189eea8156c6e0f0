//! External probe: ask a freshly spawned child what it sees.
//!
//! The [`Probe`] trait decouples the collector from the actual child backend.
//! Tests use in-process or scripted probes that answer without spawning.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::core::marker::{format_marker, parse_markers, selector_arg};
use crate::error::{ProbeError, Result};
use crate::io::config::ExternalConfig;
use crate::io::environ::primary_get;
use crate::io::process::run_command;
use crate::io::staging::StagedToolset;

/// Values reported by one probe invocation, keyed by requested name.
pub type ProbeValues = BTreeMap<String, Option<String>>;

/// Abstraction over external probe backends.
pub trait Probe {
    /// Report the value of every name as seen by a new external process.
    fn query(&self, names: &[&str]) -> Result<ProbeValues>;
}

/// Program plus leading arguments; selectors are appended per query.
#[derive(Debug, Clone)]
pub struct ProbeCommand {
    pub program: PathBuf,
    pub leading_args: Vec<OsString>,
}

impl ProbeCommand {
    /// Re-spawn `program` (an `envprobe` binary) in `probe` mode.
    pub fn envprobe(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: vec![OsString::from("probe")],
        }
    }

    /// Re-spawn the running executable in `probe` mode.
    pub fn current_exe() -> anyhow::Result<Self> {
        let exe = std::env::current_exe().context("locate current executable")?;
        Ok(Self::envprobe(exe))
    }

    /// Run a build-system command with the dummy toolset selected.
    pub fn build_system(command: &[String], toolset: &str) -> anyhow::Result<Self> {
        let (program, rest) = command
            .split_first()
            .ok_or_else(|| anyhow!("build-system command is empty"))?;
        let mut leading_args: Vec<OsString> = rest.iter().map(OsString::from).collect();
        leading_args.push(OsString::from(format!("toolset={toolset}")));
        Ok(Self {
            program: PathBuf::from(program),
            leading_args,
        })
    }
}

/// Probe that spawns a real child process for every query.
#[derive(Debug)]
pub struct ExternalProbe {
    command: ProbeCommand,
    staged: StagedToolset,
    timeout: Option<Duration>,
    output_limit_bytes: usize,
}

impl ExternalProbe {
    pub fn new(command: ProbeCommand, staged: StagedToolset, config: &ExternalConfig) -> Self {
        Self {
            command,
            staged,
            timeout: config.timeout(),
            output_limit_bytes: config.output_limit_bytes,
        }
    }

    /// Stage the dummy toolset and pick the backend described by `config`.
    pub fn from_config(config: &ExternalConfig) -> anyhow::Result<Self> {
        let staged = match &config.staging_dir {
            Some(dir) => StagedToolset::stage_into(dir, &config.toolset)?,
            None => StagedToolset::temporary(&config.toolset)?,
        };
        let command = if config.command.is_empty() {
            ProbeCommand::current_exe()?
        } else {
            ProbeCommand::build_system(&config.command, &config.toolset)?
        };
        info!(program = %command.program.display(), staging = %staged.dir.display(), "external probe ready");
        Ok(Self::new(command, staged, config))
    }
}

impl Probe for ExternalProbe {
    #[instrument(skip_all, fields(names = ?names))]
    fn query(&self, names: &[&str]) -> Result<ProbeValues> {
        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.leading_args)
            .args(names.iter().map(|name| selector_arg(name)))
            .current_dir(&self.staged.dir);

        let output = run_command(cmd, self.timeout, self.output_limit_bytes)
            .with_context(|| format!("run probe {}", self.command.program.display()))?;

        if output.timed_out {
            return Err(ProbeError::ProbeInvocation(format!(
                "probe timed out after {:?}",
                self.timeout.unwrap_or_default()
            )));
        }
        if output.stdout_truncated > 0 {
            return Err(ProbeError::ProbeInvocation(format!(
                "probe stdout exceeded {} bytes ({} bytes dropped)",
                self.output_limit_bytes, output.stdout_truncated
            )));
        }
        if !output.status.success() {
            warn!(
                exit_code = ?output.status.code(),
                stderr = %output.stderr_lossy().trim(),
                "probe exited unsuccessfully"
            );
        }

        let values = parse_markers(&output.stdout_lossy(), names)?;
        debug!(?values, "probe answered");
        Ok(values)
    }
}

/// Child side of the protocol: one marker line per name, from this
/// process's own inherited environment.
pub fn render_probe_response<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            format_marker(name, primary_get(name).as_deref())
        })
        .map(|line| line + "\n")
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{EnvGuard, env_lock, unique_name};

    #[test]
    fn build_system_command_selects_toolset() {
        let command =
            ProbeCommand::build_system(&["b2".to_string(), "-q".to_string()], "__t__").expect("cmd");
        assert_eq!(command.program, PathBuf::from("b2"));
        assert_eq!(
            command.leading_args,
            vec![OsString::from("-q"), OsString::from("toolset=__t__")]
        );
    }

    #[test]
    fn empty_build_system_command_is_rejected() {
        assert!(ProbeCommand::build_system(&[], "__t__").is_err());
    }

    #[test]
    fn response_uses_sentinel_for_absent_names() {
        let _lock = env_lock();
        let present = unique_name("present");
        let absent = unique_name("absent");
        let _guard = EnvGuard::set(&present, "foo");

        let response = render_probe_response(&[present.as_str(), absent.as_str()]);
        assert_eq!(
            response,
            format!("*** {present}: 'foo' ***\n*** {absent}: <unset> ***\n")
        );
    }

    #[test]
    fn missing_program_is_invocation_fault() {
        let _lock = env_lock();
        let staged = StagedToolset::temporary("__t__").expect("stage");
        let probe = ExternalProbe::new(
            ProbeCommand::envprobe("envprobe-definitely-not-a-real-program"),
            staged,
            &ExternalConfig::default(),
        );
        let err = probe.query(&["V0"]).unwrap_err();
        assert_eq!(err.kind(), "ProbeInvocation");
    }

    #[cfg(unix)]
    #[test]
    fn parses_markers_from_build_system_style_child() {
        let _lock = env_lock();
        let staged = StagedToolset::temporary("__t__").expect("stage");
        let command = ProbeCommand {
            program: PathBuf::from("sh"),
            leading_args: vec![
                OsString::from("-c"),
                OsString::from("echo \"*** V0: 'x' ***\"; echo \"*** V1: '' ***\""),
                OsString::from("sh"),
            ],
        };
        let probe = ExternalProbe::new(command, staged, &ExternalConfig::default());
        let values = probe.query(&["V0", "V1", "V2"]).expect("query");
        assert_eq!(values["V0"], Some("x".to_string()));
        assert_eq!(values["V1"], Some(String::new()));
        assert_eq!(values["V2"], None);
    }

    #[cfg(unix)]
    #[test]
    fn truncated_stdout_is_invocation_fault() {
        let _lock = env_lock();
        let staged = StagedToolset::temporary("__t__").expect("stage");
        let command = ProbeCommand {
            program: PathBuf::from("sh"),
            leading_args: vec![
                OsString::from("-c"),
                OsString::from(
                    "i=0; while [ $i -lt 20 ]; do printf 'xxxxxxxxxx'; i=$((i+1)); done; \
                     echo; echo \"*** V0: 'present' ***\"",
                ),
                OsString::from("sh"),
            ],
        };
        let config = ExternalConfig {
            output_limit_bytes: 64,
            ..ExternalConfig::default()
        };
        let probe = ExternalProbe::new(command, staged, &config);

        let err = probe.query(&["V0"]).unwrap_err();
        assert_eq!(err.kind(), "ProbeInvocation");
        assert!(err.to_string().contains("64 bytes"), "{err}");
    }
}
