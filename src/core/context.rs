//! Scenario context - per-step values shared across a scenario run

use crate::error::{MaintainError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Context name under which extra command-line arguments are bound
pub const ARGUMENTS: &str = "arguments";

/// A value stored in the context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Arguments(Vec<String>),
    Text(String),
    Flag(bool),
}

impl ContextValue {
    pub fn as_arguments(&self) -> Option<&[String]> {
        match self {
            ContextValue::Arguments(args) => Some(args.as_slice()),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContextValue::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

impl From<Vec<String>> for ContextValue {
    fn from(args: Vec<String>) -> Self {
        ContextValue::Arguments(args)
    }
}

/// Entry address: a context name and the label of the step it targets
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ContextKey {
    name: String,
    step: String,
}

impl ContextKey {
    fn new(name: &str, step: &str) -> Self {
        Self {
            name: name.to_string(),
            step: step.to_string(),
        }
    }
}

/// Values bound to steps by label
///
/// Entries bound with [`ScenarioContext::map`] or [`ScenarioContext::bind`]
/// belong to composition time: each key is written once, and once the
/// context is sealed (when execution starts) nothing can rebind them.
/// During execution a step may publish entries under its own label for the
/// steps that run after it.
#[derive(Debug, Default)]
pub struct ScenarioContext {
    entries: HashMap<ContextKey, ContextValue>,
    declared: HashSet<ContextKey>,
    sealed: bool,
}

impl ScenarioContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` for each of the given step labels
    pub fn map<I, S>(&mut self, name: &str, bindings: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, ContextValue)>,
        S: AsRef<str>,
    {
        for (step, value) in bindings {
            self.bind(name, step.as_ref(), value)?;
        }
        Ok(())
    }

    /// Bind one value for one step label
    pub fn bind(&mut self, name: &str, step: &str, value: ContextValue) -> Result<()> {
        if self.sealed {
            return Err(MaintainError::argument(format!(
                "Cannot bind '{}' for step '{}': execution has already started",
                name, step
            )));
        }

        let key = ContextKey::new(name, step);
        if self.declared.contains(&key) {
            return Err(MaintainError::argument(format!(
                "'{}' is already bound for step '{}'",
                name, step
            )));
        }
        self.declared.insert(key.clone());
        self.entries.insert(key, value);
        Ok(())
    }

    /// Freeze composition-time bindings
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Look up the value bound to `name` for `step`
    pub fn get(&self, name: &str, step: &str) -> Option<&ContextValue> {
        self.entries.get(&ContextKey::new(name, step))
    }

    /// Whether anything is bound to `name` for `step`
    pub fn contains(&self, name: &str, step: &str) -> bool {
        self.entries.contains_key(&ContextKey::new(name, step))
    }

    /// Extra arguments bound to a step; empty when nothing was bound
    pub fn arguments(&self, step: &str) -> &[String] {
        self.get(ARGUMENTS, step)
            .and_then(ContextValue::as_arguments)
            .unwrap_or(&[])
    }

    /// Store a run-time value under the publishing step's own label
    pub(crate) fn publish(&mut self, name: &str, step: &str, value: ContextValue) -> Result<()> {
        let key = ContextKey::new(name, step);
        if self.declared.contains(&key) {
            return Err(MaintainError::argument(format!(
                "Step '{}' cannot overwrite its composition-time binding '{}'",
                step, name
            )));
        }
        self.entries.insert(key, value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
