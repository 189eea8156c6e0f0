//! Environment propagation probe.
//!
//! `envprobe run` walks the scenario catalog and prints the annotation report.
//! The run always exits with [`exit_codes::REPORTED`]: delivering the report is
//! the point, not a verdict. `envprobe probe` is the child side of the marker
//! protocol and is what `run` spawns by default.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use envprobe::core::catalog::default_catalog;
use envprobe::exit_codes;
use envprobe::io::config::{DEFAULT_CONFIG_FILE, ProbeConfig, ReportFormat, load_config};
use envprobe::io::probe::{ExternalProbe, render_probe_response};
use envprobe::io::report::{deliver_report, render_report};
use envprobe::logging;
use envprobe::scenario::{HarnessOptions, ScenarioRunner};

#[derive(Parser)]
#[command(
    name = "envprobe",
    version,
    about = "Compare in-process and child-process views of environment mutations"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scenario catalog and print the report (always exits with code 2).
    Run {
        /// Configuration file; defaults apply when it does not exist.
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
        /// Probe through this build-system executable instead of re-spawning envprobe.
        #[arg(long)]
        build_system: Option<PathBuf>,
        /// Report format (overrides the config file).
        #[arg(long, value_enum)]
        format: Option<ReportFormat>,
        /// Also write the report to this file.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Append the environment changes made during the run.
        #[arg(long)]
        show_env_diff: bool,
    },
    /// Print one marker line per requested variable from this process's environment.
    Probe {
        #[arg(long = "var-name", value_name = "NAME")]
        var_names: Vec<String>,
    },
    /// Print the catalog tags in execution order.
    List {
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            config,
            build_system,
            format,
            output,
            show_env_diff,
        } => {
            let mut cfg = load_config(&config)?;
            if let Some(program) = build_system {
                cfg.probe.command = vec![program.to_string_lossy().into_owned()];
            }
            if let Some(format) = format {
                cfg.report.format = format;
            }
            if output.is_some() {
                cfg.report.path = output;
            }
            if show_env_diff {
                cfg.report.suppress_aux_diff = false;
            }
            cfg.validate()?;
            cmd_run(&cfg)
        }
        Command::Probe { var_names } => cmd_probe(&var_names),
        Command::List { config } => cmd_list(&load_config(&config)?),
    }
}

fn cmd_run(cfg: &ProbeConfig) -> Result<i32> {
    let probe = ExternalProbe::from_config(&cfg.probe).context("prepare external probe")?;
    let catalog = default_catalog(&cfg.variable_prefix);
    let options = HarnessOptions {
        suppress_aux_diff: cfg.report.suppress_aux_diff,
    };

    let outcome = ScenarioRunner::new(&probe, options).run(&catalog);
    let rendered = render_report(&outcome.report, cfg.report.format)?;
    deliver_report(
        &rendered,
        &mut std::io::stdout().lock(),
        cfg.report.path.as_deref(),
    )?;
    info!(
        entries = outcome.report.entries.len(),
        faulted = outcome.faulted(),
        "report delivered"
    );
    Ok(exit_codes::REPORTED)
}

fn cmd_probe(var_names: &[String]) -> Result<i32> {
    debug!(?var_names, "answering probe");
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(render_probe_response(var_names).as_bytes())
        .context("write marker lines")?;
    stdout.flush().context("flush marker lines")?;
    Ok(exit_codes::OK)
}

fn cmd_list(cfg: &ProbeConfig) -> Result<i32> {
    for tag in default_catalog(&cfg.variable_prefix).tags() {
        println!("{tag}");
    }
    Ok(exit_codes::OK)
}
