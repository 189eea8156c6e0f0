//! Orchestration of a full probe run.
//!
//! Every catalog entry runs inside its own fault boundary: the executor
//! returns a `Result`, the runner records either the observations or the
//! fault text under the entry's tag and moves on.

use std::collections::BTreeMap;

use tracing::{debug, info, instrument, warn};

use crate::collect::{ObservationBatch, collect_into};
use crate::core::annotation::{AnnotationSink, Report};
use crate::core::diff::diff_environments;
use crate::core::types::{Catalog, Phase, Scenario, Survey, render_value};
use crate::error::Result;
use crate::io::environ::{self, EnvMapping, primary_get};
use crate::io::probe::Probe;

/// Observations of one completed scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioReport {
    pub before: ObservationBatch,
    pub after: ObservationBatch,
    /// Rendered records: the before batch, then the after batch.
    pub lines: Vec<String>,
}

/// Terminal state of one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Done,
    Faulted(String),
}

/// Harness switches applied when the run is flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarnessOptions {
    /// Leave the environment-changes section out of the report.
    pub suppress_aux_diff: bool,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            suppress_aux_diff: true,
        }
    }
}

/// Result of [`ScenarioRunner::run`].
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: Report,
    /// Per-entry outcome in catalog order (surveys, then scenarios).
    pub outcomes: Vec<(String, EntryOutcome)>,
}

impl RunOutcome {
    pub fn faulted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, EntryOutcome::Faulted(_)))
            .count()
    }
}

pub struct ScenarioRunner<'p, P: Probe> {
    probe: &'p P,
    mapping: EnvMapping,
    sink: AnnotationSink,
    options: HarnessOptions,
    start_snapshot: BTreeMap<String, String>,
}

impl<'p, P: Probe> ScenarioRunner<'p, P> {
    /// Capture the mapping accessor and the start-of-run environment.
    pub fn new(probe: &'p P, options: HarnessOptions) -> Self {
        Self {
            probe,
            mapping: EnvMapping::capture(),
            sink: AnnotationSink::new(),
            options,
            start_snapshot: environ::snapshot(),
        }
    }

    /// Execute the catalog in order and flush the report.
    ///
    /// The returned report always carries failed status.
    #[instrument(skip_all, fields(surveys = catalog.surveys.len(), scenarios = catalog.scenarios.len()))]
    pub fn run(mut self, catalog: &Catalog) -> RunOutcome {
        info!("probe run started");
        let mut outcomes = Vec::with_capacity(catalog.surveys.len() + catalog.scenarios.len());

        for survey in &catalog.surveys {
            let tag = survey.tag();
            let result = run_survey(survey, &self.mapping);
            outcomes.push((tag.to_string(), self.record(tag, result)));
        }

        for scenario in &catalog.scenarios {
            let result =
                execute_scenario(self.probe, &mut self.mapping, scenario).map(|report| report.lines);
            outcomes.push((scenario.tag.clone(), self.record(&scenario.tag, result)));
        }

        let aux_diff = (!self.options.suppress_aux_diff)
            .then(|| diff_environments(&self.start_snapshot, &environ::snapshot()));
        let report = self.sink.flush(aux_diff);
        info!(entries = report.entries.len(), "probe run finished");
        RunOutcome { report, outcomes }
    }

    fn record(&mut self, tag: &str, result: Result<Vec<String>>) -> EntryOutcome {
        match result {
            Ok(mut lines) => {
                lines.push(String::new());
                self.sink.record_lines(tag, lines);
                EntryOutcome::Done
            }
            Err(err) => {
                warn!(tag, kind = err.kind(), err = %err, "entry faulted");
                let text = err.fault_text();
                self.sink.record_lines(tag, [text.as_str(), ""]);
                EntryOutcome::Faulted(text)
            }
        }
    }
}

/// Run one scenario: `[PreSeed] → ObserveBefore → Mutate → ObserveAfter`.
#[instrument(skip(probe, mapping), fields(tag = %scenario.tag))]
pub fn execute_scenario<P: Probe>(
    probe: &P,
    mapping: &mut EnvMapping,
    scenario: &Scenario,
) -> Result<ScenarioReport> {
    let name = scenario.name.as_str();
    if let Some(seed) = &scenario.preseed {
        debug!(name, seed = %seed, "pre-seeding");
        mapping.set(name, seed)?;
    }

    let mut lines = Vec::with_capacity(6);
    let before = collect_into(&mut lines, probe, mapping, Phase::Before, name)?;
    environ::apply(mapping, name, &scenario.mutation)?;
    let after = collect_into(&mut lines, probe, mapping, Phase::After, name)?;

    Ok(ScenarioReport {
        before,
        after,
        lines,
    })
}

/// Produce the lines of one read-only survey entry.
pub fn run_survey(survey: &Survey, mapping: &EnvMapping) -> Result<Vec<String>> {
    let lines = match survey {
        Survey::ProbeVersion => vec![format!(
            "{} {}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        )],
        Survey::HostPlatform => vec![format!(
            "{} {} ({})",
            std::env::consts::OS,
            std::env::consts::ARCH,
            std::env::consts::FAMILY
        )],
        Survey::MappingContains(names) => names
            .iter()
            .map(|name| format!("{name}: {}", mapping.contains(name)))
            .collect(),
        Survey::MappingIndex(names) => names
            .iter()
            .map(|name| match mapping.index(name) {
                Ok(value) => format!("{name}: {}", render_value(Some(value))),
                Err(err) => format!("{name}: {}", err.fault_text()),
            })
            .collect(),
        Survey::MappingGet(names) => names
            .iter()
            .map(|name| format!("{name}: {}", render_value(mapping.get(name))))
            .collect(),
        Survey::PrimaryGet(names) => names
            .iter()
            .map(|name| format!("{name}: {}", render_value(primary_get(name).as_deref())))
            .collect(),
    };
    Ok(lines)
}
