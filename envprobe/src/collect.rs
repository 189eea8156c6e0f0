//! Cross-channel observation of one variable.

use tracing::instrument;

use crate::core::types::{Channel, ObservationRecord, Phase};
use crate::error::Result;
use crate::io::environ::{EnvMapping, primary_get};
use crate::io::probe::Probe;

/// One reading per channel, in [`Channel::ALL`] order.
pub type ObservationBatch = [ObservationRecord; 3];

/// Read `name` through the primary accessor, the mapping, and a fresh child.
///
/// Values are kept exactly as each channel reports them.
#[instrument(skip(probe, mapping))]
pub fn collect<P: Probe>(
    probe: &P,
    mapping: &EnvMapping,
    phase: Phase,
    name: &str,
) -> Result<ObservationBatch> {
    let primary = primary_get(name);
    let mapped = mapping.get(name).map(str::to_string);
    let external = probe.query(&[name])?.remove(name).flatten();

    let record = |channel, value| ObservationRecord {
        channel,
        phase,
        name: name.to_string(),
        value,
    };
    Ok([
        record(Channel::PrimaryAccessor, primary),
        record(Channel::MappingAccessor, mapped),
        record(Channel::ExternalProcess, external),
    ])
}

/// Collect and append the rendered records to `results`.
pub fn collect_into<P: Probe>(
    results: &mut Vec<String>,
    probe: &P,
    mapping: &EnvMapping,
    phase: Phase,
    name: &str,
) -> Result<ObservationBatch> {
    let batch = collect(probe, mapping, phase, name)?;
    results.extend(batch.iter().map(ObservationRecord::render));
    Ok(batch)
}
