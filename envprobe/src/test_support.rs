//! Test-only helpers for environment isolation and fake probes.

#![allow(unsafe_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::ffi::OsString;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::error::{ProbeError, Result};
use crate::io::environ::primary_get;
use crate::io::probe::{Probe, ProbeValues};

static ENV_LOCK: Mutex<()> = Mutex::new(());
static NAME_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Serialize tests that read or write the process environment or spawn children.
pub fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Variable name no other test (or process) uses.
pub fn unique_name(label: &str) -> String {
    let n = NAME_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!(
        "ENVPROBE_TEST_{}_{}_{n}",
        label.to_uppercase(),
        std::process::id()
    )
}

/// Restores the listed variables to their prior state on drop.
pub struct EnvGuard {
    saved: Vec<(String, Option<OsString>)>,
}

impl EnvGuard {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let saved = names
            .into_iter()
            .map(|name| {
                let name = name.as_ref().to_string();
                let value = std::env::var_os(&name);
                (name, value)
            })
            .collect();
        Self { saved }
    }

    /// Set `name` for the lifetime of the guard.
    pub fn set(name: &str, value: &str) -> Self {
        let guard = Self::new([name]);
        // SAFETY: callers hold `env_lock()`.
        unsafe { std::env::set_var(name, value) };
        guard
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (name, value) in self.saved.drain(..) {
            // SAFETY: callers hold `env_lock()`.
            match value {
                Some(value) => unsafe { std::env::set_var(&name, value) },
                None => unsafe { std::env::remove_var(&name) },
            }
        }
    }
}

/// Probe that answers from the live environment at query time, standing in
/// for a child that inherits the environment when it is spawned.
#[derive(Debug, Default)]
pub struct InProcessProbe {
    calls: Cell<usize>,
}

impl InProcessProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Probe for InProcessProbe {
    fn query(&self, names: &[&str]) -> Result<ProbeValues> {
        self.calls.set(self.calls.get() + 1);
        Ok(names
            .iter()
            .map(|name| (name.to_string(), primary_get(name)))
            .collect())
    }
}

/// Probe that replays queued answers; `None` entries fall through to the
/// live environment.
pub struct ScriptedProbe {
    answers: RefCell<VecDeque<Option<Result<ProbeValues>>>>,
}

impl ScriptedProbe {
    pub fn new(answers: Vec<Option<Result<ProbeValues>>>) -> Self {
        Self {
            answers: RefCell::new(answers.into()),
        }
    }

    /// One scripted fault followed by live answers.
    pub fn failing_once(err: ProbeError) -> Self {
        Self::new(vec![Some(Err(err))])
    }
}

impl Probe for ScriptedProbe {
    fn query(&self, names: &[&str]) -> Result<ProbeValues> {
        match self.answers.borrow_mut().pop_front() {
            Some(Some(answer)) => answer,
            Some(None) | None => InProcessProbe::new().query(names),
        }
    }
}
