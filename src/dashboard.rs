// Key-value dashboard store
//
// Tunables are read with a default and telemetry is written by name. The
// runtime drains the changed keys every tick and publishes them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A single dashboard value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DashValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<f64> for DashValue {
    fn from(v: f64) -> Self {
        DashValue::Number(v)
    }
}

impl From<bool> for DashValue {
    fn from(v: bool) -> Self {
        DashValue::Bool(v)
    }
}

impl From<&str> for DashValue {
    fn from(v: &str) -> Self {
        DashValue::Text(v.to_string())
    }
}

/// Generic key-value store shared with the operator dashboard
pub trait Dashboard {
    fn get(&self, key: &str) -> Option<&DashValue>;

    fn put(&mut self, key: &str, value: DashValue);

    fn get_number(&self, key: &str, default: f64) -> f64 {
        match self.get(key) {
            Some(DashValue::Number(v)) => *v,
            _ => default,
        }
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(DashValue::Bool(v)) => *v,
            _ => default,
        }
    }

    fn get_text(&self, key: &str, default: &str) -> String {
        match self.get(key) {
            Some(DashValue::Text(v)) => v.clone(),
            _ => default.to_string(),
        }
    }

    fn put_number(&mut self, key: &str, value: f64) {
        self.put(key, DashValue::Number(value));
    }

    fn put_bool(&mut self, key: &str, value: bool) {
        self.put(key, DashValue::Bool(value));
    }

    fn put_text(&mut self, key: &str, value: &str) {
        self.put(key, DashValue::Text(value.to_string()));
    }

    /// Read the current value (or default) and write it back so the key shows up
    fn initialize_number(&mut self, key: &str, default: f64) -> f64 {
        let value = self.get_number(key, default);
        self.put_number(key, value);
        value
    }

    fn initialize_bool(&mut self, key: &str, default: bool) -> bool {
        let value = self.get_bool(key, default);
        self.put_bool(key, value);
        value
    }
}

/// In-process dashboard that remembers which keys changed since the last drain
#[derive(Debug, Default)]
pub struct MemoryDashboard {
    values: BTreeMap<String, DashValue>,
    dirty: BTreeSet<String>,
}

impl MemoryDashboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the values written since the previous call
    pub fn drain_changed(&mut self) -> BTreeMap<String, DashValue> {
        let dirty = std::mem::take(&mut self.dirty);
        dirty
            .into_iter()
            .filter_map(|k| self.values.get(&k).map(|v| (k, v.clone())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Dashboard for MemoryDashboard {
    fn get(&self, key: &str) -> Option<&DashValue> {
        self.values.get(key)
    }

    fn put(&mut self, key: &str, value: DashValue) {
        // Unchanged writes are not republished
        if self.values.get(key) == Some(&value) {
            return;
        }
        self.values.insert(key.to_string(), value);
        self.dirty.insert(key.to_string());
    }
}
