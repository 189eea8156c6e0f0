//! End-to-end tests for `envprobe run` and `envprobe list`.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use envprobe::core::catalog::default_catalog;
use envprobe::exit_codes;
use envprobe::io::config::{ProbeConfig, write_config};
use envprobe::test_support::{env_lock, unique_name};

fn envprobe(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_envprobe"))
        .args(args)
        .current_dir(dir)
        .env("RUST_LOG", "off")
        .output()
        .expect("spawn envprobe")
}

fn write_prefix_config(dir: &Path, prefix: &str) {
    let cfg = ProbeConfig {
        variable_prefix: prefix.to_string(),
        ..ProbeConfig::default()
    };
    write_config(&dir.join("envprobe.toml"), &cfg).expect("write config");
}

#[test]
fn run_reports_every_tag_in_catalog_order() {
    let _lock = env_lock();
    let temp = tempfile::tempdir().expect("tempdir");
    let prefix = unique_name("run_order");
    write_prefix_config(temp.path(), &prefix);

    let output = envprobe(temp.path(), &["run"]);

    assert_eq!(output.status.code(), Some(exit_codes::REPORTED));
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    let mut cursor = 0;
    for tag in default_catalog(&prefix).tags() {
        let header = format!("{tag}:\n");
        let found = stdout[cursor..]
            .find(&header)
            .unwrap_or_else(|| panic!("missing or out of order: {tag}\n{stdout}"));
        cursor += found + header.len();
    }
    assert!(!stdout.contains("Environment changes during run:"));
}

#[cfg(unix)]
#[test]
fn run_shows_raw_set_reaching_children_but_not_the_mapping() {
    let _lock = env_lock();
    let temp = tempfile::tempdir().expect("tempdir");
    let prefix = unique_name("run_raw");
    write_prefix_config(temp.path(), &prefix);

    let output = envprobe(temp.path(), &["run"]);

    let stdout = String::from_utf8(output.stdout).expect("utf8");
    let name = format!("{prefix}_0");
    let expected = [
        format!("before - {name} - getenv(): None"),
        format!("before - {name} - mapping.get(): None"),
        format!("before - {name} - external: None"),
        format!("after - {name} - getenv(): \"foo\""),
        format!("after - {name} - mapping.get(): None"),
        format!("after - {name} - external: \"foo\""),
    ]
    .join("\n");
    assert!(stdout.contains(&expected), "{stdout}");
}

#[test]
fn run_writes_json_report_and_env_diff_on_request() {
    let _lock = env_lock();
    let temp = tempfile::tempdir().expect("tempdir");
    let prefix = unique_name("run_json");
    write_prefix_config(temp.path(), &prefix);
    let report_path = temp.path().join("reports").join("probe.json");

    let output = envprobe(
        temp.path(),
        &[
            "run",
            "--format",
            "json",
            "--show-env-diff",
            "--output",
            report_path.to_str().expect("utf8 path"),
        ],
    );

    assert_eq!(output.status.code(), Some(exit_codes::REPORTED));
    let persisted = fs::read_to_string(&report_path).expect("read report");
    assert_eq!(String::from_utf8(output.stdout).expect("utf8"), persisted);

    let value: serde_json::Value = serde_json::from_str(&persisted).expect("parse");
    assert_eq!(value["status"], "failed");
    let entries = value["entries"].as_array().expect("entries");
    assert_eq!(entries.len(), default_catalog(&prefix).tags().len());
    let diff = value["aux_diff"].as_array().expect("aux diff");
    assert!(
        diff.iter()
            .any(|change| change["name"] == format!("{prefix}_1").as_str())
    );
}

#[test]
fn list_prints_tags_without_running() {
    let temp = tempfile::tempdir().expect("tempdir");
    let prefix = unique_name("list");
    write_prefix_config(temp.path(), &prefix);

    let output = envprobe(temp.path(), &["list"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    let listed: Vec<&str> = stdout.lines().collect();
    assert_eq!(listed, default_catalog(&prefix).tags());
}

#[test]
fn invalid_config_exits_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(temp.path().join("envprobe.toml"), "variable_prefix = \"\"\n").expect("write");

    let output = envprobe(temp.path(), &["run"]);

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8(output.stderr).expect("utf8");
    assert!(stderr.contains("variable_prefix"), "{stderr}");
}
