use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Free-form string attributes attached to every entity of the store.
///
/// Multi-valued attributes are kept as a single comma separated value, see
/// [AttributeBag::extend] and [AttributeBag::get_collection].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeBag(BTreeMap<String, String>);

impl AttributeBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn add_if_absent(&mut self, key: &str, value: impl Into<String>) {
        self.0
            .entry(key.to_string())
            .or_insert_with(|| value.into());
    }

    /// Append one or more comma separated values to an attribute. Values that
    /// are already present are not added twice.
    pub fn extend(&mut self, key: &str, value: &str) {
        let mut values = self.get_collection(key);
        for v in value.split(',').filter(|v| !v.is_empty()) {
            if !values.iter().any(|existing| existing == v) {
                values.push(v.to_string());
            }
        }
        if !values.is_empty() {
            self.0.insert(key.to_string(), values.join(","));
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn get_collection(&self, key: &str) -> Vec<String> {
        self.0
            .get(key)
            .map(|v| {
                v.split(',')
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render as `key=value;key=value`.
    pub fn as_string(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl Display for AttributeBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}
