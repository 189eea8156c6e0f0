//! The fixed scenario catalog.
//!
//! Variable names are shared between scenarios on purpose: later scenarios
//! observe what earlier ones left behind, so the order below is part of the
//! contract.

use crate::core::types::{Catalog, Layer, Mutation, Scenario, Survey};

/// Number of coordinated dummy variables used by the default catalog.
pub const DUMMY_VARIABLES: usize = 4;

/// Dummy variable names `<prefix>_0 .. <prefix>_3`.
pub fn dummy_names(prefix: &str) -> Vec<String> {
    (0..DUMMY_VARIABLES)
        .map(|index| format!("{prefix}_{index}"))
        .collect()
}

/// Build the default catalog for the given variable prefix.
pub fn default_catalog(prefix: &str) -> Catalog {
    let names = dummy_names(prefix);
    let surveys = vec![
        Survey::ProbeVersion,
        Survey::HostPlatform,
        Survey::MappingContains(names.clone()),
        Survey::MappingIndex(names.clone()),
        Survey::MappingGet(names.clone()),
        Survey::PrimaryGet(names.clone()),
    ];

    let scenarios = vec![
        Scenario::new(&names[0], Mutation::raw_set("foo")),
        Scenario::new(&names[1], Mutation::set("bar")),
        Scenario::new(&names[1], Mutation::raw_set("baz")),
        Scenario::new(&names[1], Mutation::SetEmpty { layer: Layer::Raw }),
        Scenario::new(&names[2], Mutation::Unset).preseeded("foo"),
        Scenario::new(&names[2], Mutation::Delete).preseeded("foo"),
        Scenario::new(
            &names[2],
            Mutation::SetEmpty {
                layer: Layer::Mapping,
            },
        )
        .preseeded("foo"),
        Scenario::new(&names[3], Mutation::set("\"\"")),
    ];

    Catalog { surveys, scenarios }
}
