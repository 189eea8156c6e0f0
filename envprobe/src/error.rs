//! Fault taxonomy for everything that can go wrong inside a scenario.
//!
//! Faults never escape a scenario: the runner renders them with
//! [`ProbeError::fault_text`] and records them as the scenario's annotation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProbeError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// A mutation or accessor primitive does not exist on this host.
    #[error("{primitive} is not available on {os}")]
    PlatformPrimitiveUnavailable {
        primitive: &'static str,
        os: &'static str,
    },

    /// A marker line for `name` was present but did not match the protocol.
    #[error("malformed marker for {name}: {line:?}")]
    ProbeParseFailure { name: String, line: String },

    /// Applying a mutation failed.
    #[error("{name}: {reason}")]
    MutationFailure { name: String, reason: String },

    /// Strict lookup or deletion of a name the mapping does not hold.
    #[error("{name}")]
    MissingVariable { name: String },

    /// The external process could not be spawned or waited on.
    #[error("{0}")]
    ProbeInvocation(String),
}

impl ProbeError {
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::PlatformPrimitiveUnavailable { .. } => "PlatformPrimitiveUnavailable",
            ProbeError::ProbeParseFailure { .. } => "ProbeParseFailure",
            ProbeError::MutationFailure { .. } => "MutationFailure",
            ProbeError::MissingVariable { .. } => "MissingVariable",
            ProbeError::ProbeInvocation(_) => "ProbeInvocation",
        }
    }

    /// Single-line rendering used in the report in place of observations.
    pub fn fault_text(&self) -> String {
        format!("*** EXCEPTION *** {} - {} ***", self.kind(), self)
    }

    pub(crate) fn mutation(name: &str, reason: impl Into<String>) -> Self {
        ProbeError::MutationFailure {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<anyhow::Error> for ProbeError {
    fn from(err: anyhow::Error) -> Self {
        ProbeError::ProbeInvocation(format!("{err:#}"))
    }
}
