//! Accessors and mutations for the process environment.
//!
//! Two in-process views exist:
//!
//! - the *primary* accessor, a direct lookup in the live environment table;
//! - the *mapping* accessor, [`EnvMapping`], a copy of the environment taken at
//!   startup that is kept in sync only by its own write-through operations.
//!
//! The raw `setenv`/`unsetenv` primitives change the live table without
//! touching the mapping, which is the divergence the probe reports on.

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::types::{Layer, Mutation};
use crate::error::{ProbeError, Result};

/// Read `name` from the live process environment.
pub fn primary_get(name: &str) -> Option<String> {
    if validate_name(name).is_err() {
        return None;
    }
    std::env::var_os(name).map(|value| value.to_string_lossy().into_owned())
}

/// Snapshot of the live process environment, lossily decoded.
pub fn snapshot() -> BTreeMap<String, String> {
    std::env::vars_os()
        .map(|(name, value)| {
            (
                name.to_string_lossy().into_owned(),
                value.to_string_lossy().into_owned(),
            )
        })
        .collect()
}

/// In-process mapping view of the environment.
#[derive(Debug, Clone, Default)]
pub struct EnvMapping {
    vars: BTreeMap<String, String>,
}

impl EnvMapping {
    /// Copy the current process environment.
    pub fn capture() -> Self {
        Self { vars: snapshot() }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Strict lookup: an absent name is a fault.
    pub fn index(&self, name: &str) -> Result<&str> {
        self.get(name).ok_or_else(|| ProbeError::MissingVariable {
            name: name.to_string(),
        })
    }

    /// Assign through the mapping and write through to the process environment.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        validate_name(name)?;
        validate_value(name, value)?;
        write_through_set(name, value);
        self.vars.insert(name.to_string(), value.to_string());
        Ok(())
    }

    /// Delete through the mapping and write through to the process environment.
    ///
    /// Returns the value the mapping held.
    pub fn remove(&mut self, name: &str) -> Result<String> {
        validate_name(name)?;
        let value = self
            .vars
            .remove(name)
            .ok_or_else(|| ProbeError::MissingVariable {
                name: name.to_string(),
            })?;
        write_through_remove(name);
        Ok(value)
    }
}

/// Apply one mutation to one variable.
pub fn apply(mapping: &mut EnvMapping, name: &str, mutation: &Mutation) -> Result<()> {
    debug!(name, ?mutation, "applying mutation");
    match mutation {
        Mutation::Set { value, layer } => set_on_layer(mapping, name, value, *layer),
        Mutation::SetEmpty { layer } => set_on_layer(mapping, name, "", *layer),
        Mutation::Unset => raw_unset(name),
        Mutation::Delete => mapping.remove(name).map(|_| ()),
    }
}

fn set_on_layer(mapping: &mut EnvMapping, name: &str, value: &str, layer: Layer) -> Result<()> {
    match layer {
        Layer::Mapping => mapping.set(name, value),
        Layer::Raw => raw_set(name, value),
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ProbeError::mutation(name, "empty variable name"));
    }
    if name.contains('=') || name.contains('\0') {
        return Err(ProbeError::mutation(
            name,
            "variable name contains '=' or NUL",
        ));
    }
    Ok(())
}

fn validate_value(name: &str, value: &str) -> Result<()> {
    if value.contains('\0') {
        return Err(ProbeError::mutation(name, "value contains NUL"));
    }
    Ok(())
}

#[allow(unsafe_code)]
fn write_through_set(name: &str, value: &str) {
    // SAFETY: the environment is only touched from the runner thread.
    unsafe { std::env::set_var(name, value) }
}

#[allow(unsafe_code)]
fn write_through_remove(name: &str) {
    // SAFETY: the environment is only touched from the runner thread.
    unsafe { std::env::remove_var(name) }
}

/// Low-level `setenv(3)`; the mapping is not updated.
#[cfg(unix)]
#[allow(unsafe_code)]
pub fn raw_set(name: &str, value: &str) -> Result<()> {
    use std::ffi::CString;

    validate_name(name)?;
    validate_value(name, value)?;
    let c_name = CString::new(name).map_err(|err| ProbeError::mutation(name, err.to_string()))?;
    let c_value =
        CString::new(value).map_err(|err| ProbeError::mutation(name, err.to_string()))?;
    // SAFETY: both pointers are valid NUL-terminated strings for the duration
    // of the call and the environment is only touched from the runner thread.
    let rc = unsafe { libc::setenv(c_name.as_ptr(), c_value.as_ptr(), 1) };
    if rc != 0 {
        return Err(ProbeError::mutation(
            name,
            std::io::Error::last_os_error().to_string(),
        ));
    }
    Ok(())
}

/// Low-level `unsetenv(3)`; the mapping keeps whatever it held.
#[cfg(unix)]
#[allow(unsafe_code)]
pub fn raw_unset(name: &str) -> Result<()> {
    use std::ffi::CString;

    validate_name(name)?;
    let c_name = CString::new(name).map_err(|err| ProbeError::mutation(name, err.to_string()))?;
    // SAFETY: valid NUL-terminated string; single-threaded environment access.
    let rc = unsafe { libc::unsetenv(c_name.as_ptr()) };
    if rc != 0 {
        return Err(ProbeError::mutation(
            name,
            std::io::Error::last_os_error().to_string(),
        ));
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn raw_set(name: &str, _value: &str) -> Result<()> {
    validate_name(name)?;
    Err(ProbeError::PlatformPrimitiveUnavailable {
        primitive: "setenv",
        os: std::env::consts::OS,
    })
}

#[cfg(not(unix))]
pub fn raw_unset(name: &str) -> Result<()> {
    validate_name(name)?;
    Err(ProbeError::PlatformPrimitiveUnavailable {
        primitive: "unsetenv",
        os: std::env::consts::OS,
    })
}
