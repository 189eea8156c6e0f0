//! External probe tests against the real `envprobe probe` child.
//!
//! Every query here spawns the compiled binary, so the observed values are
//! whatever a fresh process inherits at spawn time.

use std::process::Command;

use envprobe::core::marker::selector_arg;
use envprobe::core::types::{Mutation, Scenario};
use envprobe::io::config::ExternalConfig;
use envprobe::io::environ::EnvMapping;
use envprobe::io::probe::{ExternalProbe, Probe, ProbeCommand};
use envprobe::io::staging::StagedToolset;
use envprobe::scenario::execute_scenario;
use envprobe::test_support::{EnvGuard, env_lock, unique_name};

fn binary_probe() -> ExternalProbe {
    let staged = StagedToolset::temporary("__envprobeTestToolset__").expect("stage");
    ExternalProbe::new(
        ProbeCommand::envprobe(env!("CARGO_BIN_EXE_envprobe")),
        staged,
        &ExternalConfig::default(),
    )
}

#[test]
fn probe_child_prints_markers_and_sentinel() {
    let _lock = env_lock();
    let present = unique_name("cli_present");
    let empty = unique_name("cli_empty");
    let absent = unique_name("cli_absent");

    let output = Command::new(env!("CARGO_BIN_EXE_envprobe"))
        .arg("probe")
        .arg(selector_arg(&present))
        .arg(selector_arg(&empty))
        .arg(selector_arg(&absent))
        .env(&present, "foo")
        .env(&empty, "")
        .env_remove(&absent)
        .output()
        .expect("envprobe probe");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert_eq!(
        stdout,
        format!("*** {present}: 'foo' ***\n*** {empty}: '' ***\n*** {absent}: <unset> ***\n")
    );
}

#[test]
fn external_query_distinguishes_empty_from_absent() {
    let _lock = env_lock();
    let empty = unique_name("ext_empty");
    let absent = unique_name("ext_absent");
    let _guard = EnvGuard::set(&empty, "");

    let values = binary_probe()
        .query(&[empty.as_str(), absent.as_str()])
        .expect("query");

    assert_eq!(values[&empty], Some(String::new()));
    assert_eq!(values[&absent], None);
}

#[test]
fn multiline_value_survives_the_round_trip() {
    let _lock = env_lock();
    let name = unique_name("ext_multiline");
    let _guard = EnvGuard::set(&name, "first\nsecond");

    let values = binary_probe().query(&[name.as_str()]).expect("query");

    assert_eq!(values[&name].as_deref(), Some("first\nsecond"));
}

#[test]
fn repeated_queries_agree_when_environment_is_quiet() {
    let _lock = env_lock();
    let name = unique_name("ext_idem");
    let _guard = EnvGuard::set(&name, "steady");
    let probe = binary_probe();

    let first = probe.query(&[name.as_str()]).expect("first");
    let second = probe.query(&[name.as_str()]).expect("second");

    assert_eq!(first, second);
    assert_eq!(first[&name].as_deref(), Some("steady"));
}

#[test]
fn set_scenario_is_visible_to_a_new_child() {
    let _lock = env_lock();
    let name = unique_name("ext_set");
    let _guard = EnvGuard::new([&name]);
    let mut mapping = EnvMapping::capture();

    let report = execute_scenario(
        &binary_probe(),
        &mut mapping,
        &Scenario::new(&name, Mutation::set("foo")),
    )
    .expect("scenario");

    assert!(report.before.iter().all(|record| record.value.is_none()));
    assert!(
        report
            .after
            .iter()
            .all(|record| record.value.as_deref() == Some("foo"))
    );
}

#[cfg(unix)]
#[test]
fn unset_scenario_records_each_channel_as_observed() {
    let _lock = env_lock();
    let name = unique_name("ext_unset");
    let _guard = EnvGuard::new([&name]);
    let mut mapping = EnvMapping::capture();

    let report = execute_scenario(
        &binary_probe(),
        &mut mapping,
        &Scenario::new(&name, Mutation::Unset).preseeded("bar"),
    )
    .expect("scenario");

    assert!(
        report
            .before
            .iter()
            .all(|record| record.value.as_deref() == Some("bar"))
    );
    let after: Vec<Option<&str>> = report.after.iter().map(|r| r.value.as_deref()).collect();
    assert_eq!(after, vec![None, Some("bar"), None]);
}

#[cfg(unix)]
#[test]
fn set_empty_is_captured_literally_on_every_channel() {
    let _lock = env_lock();
    let name = unique_name("ext_empty_set");
    let _guard = EnvGuard::new([&name]);
    let mut mapping = EnvMapping::capture();

    let report = execute_scenario(
        &binary_probe(),
        &mut mapping,
        &Scenario::new(
            &name,
            Mutation::SetEmpty {
                layer: envprobe::core::types::Layer::Raw,
            },
        )
        .preseeded("foo"),
    )
    .expect("scenario");

    let after: Vec<Option<&str>> = report.after.iter().map(|r| r.value.as_deref()).collect();
    assert_eq!(after, vec![Some(""), Some("foo"), Some("")]);
}
