//! Shared deterministic types for probe core logic.
//!
//! These types define the vocabulary of a run (channels, phases, mutations,
//! scenarios) and must not depend on the process environment.

use serde::Serialize;

/// Where a value was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Single-value lookup against the live process environment.
    PrimaryAccessor,
    /// Lookup in the in-process mapping captured at startup.
    MappingAccessor,
    /// Value reported by a freshly spawned child process.
    ExternalProcess,
}

impl Channel {
    /// Fixed order in which every batch is collected.
    pub const ALL: [Channel; 3] = [
        Channel::PrimaryAccessor,
        Channel::MappingAccessor,
        Channel::ExternalProcess,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Channel::PrimaryAccessor => "getenv()",
            Channel::MappingAccessor => "mapping.get()",
            Channel::ExternalProcess => "external",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Before,
    After,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Before => "before",
            Phase::After => "after",
        }
    }
}

/// One reading of one variable on one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObservationRecord {
    pub channel: Channel,
    pub phase: Phase,
    pub name: String,
    pub value: Option<String>,
}

impl ObservationRecord {
    /// `<phase> - <name> - <channel>: <value>`
    pub fn render(&self) -> String {
        format!(
            "{} - {} - {}: {}",
            self.phase.label(),
            self.name,
            self.channel.label(),
            render_value(self.value.as_deref())
        )
    }
}

/// Render an optional value so that `""` and "absent" stay distinguishable.
pub fn render_value(value: Option<&str>) -> String {
    match value {
        Some(value) => format!("{value:?}"),
        None => "None".to_string(),
    }
}

/// Which primitive a set-style mutation goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    /// Mapping assignment that writes through to the process environment.
    Mapping,
    /// Low-level `setenv`, invisible to the mapping.
    Raw,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutation {
    Set { value: String, layer: Layer },
    SetEmpty { layer: Layer },
    /// Low-level `unsetenv`; the mapping keeps its stale entry.
    Unset,
    /// Mapping deletion, written through to the process environment.
    Delete,
}

impl Mutation {
    pub fn set(value: impl Into<String>) -> Self {
        Mutation::Set {
            value: value.into(),
            layer: Layer::Mapping,
        }
    }

    pub fn raw_set(value: impl Into<String>) -> Self {
        Mutation::Set {
            value: value.into(),
            layer: Layer::Raw,
        }
    }

    /// Short operation description used to build scenario tags.
    pub fn describe(&self, name: &str) -> String {
        match self {
            Mutation::Set {
                value,
                layer: Layer::Mapping,
            } => format!("mapping[{name}] to {value:?}"),
            Mutation::Set {
                value,
                layer: Layer::Raw,
            } => format!("setenv({name}) to {value:?}"),
            Mutation::SetEmpty {
                layer: Layer::Mapping,
            } => format!("mapping[{name}] to \"\""),
            Mutation::SetEmpty { layer: Layer::Raw } => format!("setenv({name}) to \"\""),
            Mutation::Unset => format!("unsetenv({name})"),
            Mutation::Delete => format!("mapping.remove({name})"),
        }
    }
}

/// One named mutation-and-observation case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scenario {
    pub tag: String,
    pub name: String,
    pub mutation: Mutation,
    /// Value assigned through the mapping before the "before" batch.
    pub preseed: Option<String>,
}

impl Scenario {
    /// Build a scenario whose tag is derived from its mutation.
    pub fn new(name: impl Into<String>, mutation: Mutation) -> Self {
        let name = name.into();
        Self {
            tag: mutation.describe(&name),
            name,
            mutation,
            preseed: None,
        }
    }

    /// Pre-seed `value` through the mapping and mention it in the tag.
    pub fn preseeded(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        self.tag = format!("{} from {value:?}", self.tag);
        self.preseed = Some(value);
        self
    }
}

/// Read-only informational entries recorded before any mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Survey {
    ProbeVersion,
    HostPlatform,
    MappingContains(Vec<String>),
    MappingIndex(Vec<String>),
    MappingGet(Vec<String>),
    PrimaryGet(Vec<String>),
}

impl Survey {
    pub fn tag(&self) -> &'static str {
        match self {
            Survey::ProbeVersion => "Probe version",
            Survey::HostPlatform => "Host platform",
            Survey::MappingContains(_) => "XXX in mapping",
            Survey::MappingIndex(_) => "mapping[XXX]",
            Survey::MappingGet(_) => "mapping.get(XXX)",
            Survey::PrimaryGet(_) => "getenv(XXX)",
        }
    }
}

/// Ordered catalog of a run: surveys first, then scenarios.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    pub surveys: Vec<Survey>,
    pub scenarios: Vec<Scenario>,
}

impl Catalog {
    /// Entry tags in execution order.
    pub fn tags(&self) -> Vec<String> {
        self.surveys
            .iter()
            .map(|survey| survey.tag().to_string())
            .chain(self.scenarios.iter().map(|scenario| scenario.tag.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_renders_phase_name_channel_value() {
        let record = ObservationRecord {
            channel: Channel::MappingAccessor,
            phase: Phase::After,
            name: "V0".to_string(),
            value: Some("foo".to_string()),
        };
        assert_eq!(record.render(), "after - V0 - mapping.get(): \"foo\"");
    }

    #[test]
    fn empty_and_absent_render_differently() {
        assert_eq!(render_value(Some("")), "\"\"");
        assert_eq!(render_value(None), "None");
    }

    #[test]
    fn preseeded_tag_mentions_seed_value() {
        let scenario = Scenario::new("V2", Mutation::Unset).preseeded("foo");
        assert_eq!(scenario.tag, "unsetenv(V2) from \"foo\"");
        assert_eq!(scenario.preseed.as_deref(), Some("foo"));
    }

    #[test]
    fn catalog_tags_list_surveys_before_scenarios() {
        let catalog = Catalog {
            surveys: vec![Survey::HostPlatform],
            scenarios: vec![Scenario::new("V0", Mutation::raw_set("foo"))],
        };
        assert_eq!(
            catalog.tags(),
            vec!["Host platform", "setenv(V0) to \"foo\""]
        );
    }
}
