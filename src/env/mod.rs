//! Environment variable sets for the build and for the running app
//!
//! Two independent sets exist per build: the build-time set, seeded from
//! the platform environment captured at startup and handed to every child
//! process, and the persisted set rendered into `.profile.d/ruby.sh`.

mod configurator;
mod scoped;

pub use configurator::{EnvironmentConfigurator, DEFAULT_LANG, SYSTEM_PATH};
pub use scoped::ScopedUnset;

use std::collections::BTreeMap;
use std::fmt::Write as _;

/// How an entry was written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvPolicy {
    /// Written only because the key was not defined
    Default,
    /// Always written, last writer wins
    Override,
    /// Removed from the environment
    Unset,
}

/// A single write to an environment variable set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvEntry {
    pub key: String,
    pub value: String,
    pub policy: EnvPolicy,
}

/// Ordered environment variables layered over an inherited snapshot
#[derive(Debug, Clone, Default)]
pub struct EnvironmentVariableSet {
    inherited: BTreeMap<String, String>,
    entries: Vec<EnvEntry>,
}

impl EnvironmentVariableSet {
    /// Create an empty set with nothing inherited
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a set inheriting the given variables
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            inherited: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            entries: Vec::new(),
        }
    }

    /// Snapshot the current process environment (non-UTF-8 entries are skipped)
    pub fn inherit() -> Self {
        Self::from_vars(std::env::vars_os().filter_map(|(k, v)| {
            Some((k.into_string().ok()?, v.into_string().ok()?))
        }))
    }

    /// Current value of `key`, written or inherited
    pub fn get(&self, key: &str) -> Option<&str> {
        match self.entries.iter().find(|e| e.key == key) {
            Some(entry) if entry.policy == EnvPolicy::Unset => None,
            Some(entry) => Some(entry.value.as_str()),
            None => self.inherited.get(key).map(String::as_str),
        }
    }

    /// Write `value` only if `key` is not already defined.
    ///
    /// Returns whether the value was written.
    pub fn set_default(&mut self, key: &str, value: impl Into<String>) -> bool {
        if self.get(key).is_some() {
            return false;
        }
        self.write(key, value.into(), EnvPolicy::Default);
        true
    }

    /// Always write `value`
    pub fn set_override(&mut self, key: &str, value: impl Into<String>) {
        self.write(key, value.into(), EnvPolicy::Override);
    }

    /// Put `value` in front of the current `:`-separated value
    pub fn prepend(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        let joined = match self.get(key) {
            Some(current) if !current.is_empty() => format!("{}:{}", value, current),
            _ => value,
        };
        self.set_override(key, joined);
    }

    /// Put `value` after the current `:`-separated value
    pub fn append(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        let joined = match self.get(key) {
            Some(current) if !current.is_empty() => format!("{}:{}", current, value),
            _ => value,
        };
        self.set_override(key, joined);
    }

    /// Remove `key`, returning the value it had
    pub fn unset(&mut self, key: &str) -> Option<String> {
        let previous = self.get(key).map(str::to_string);
        self.entries.retain(|e| e.key != key);
        if self.inherited.contains_key(key) {
            self.entries.push(EnvEntry {
                key: key.to_string(),
                value: String::new(),
                policy: EnvPolicy::Unset,
            });
        }
        previous
    }

    /// Put `key` back to `previous`, as returned by [`unset`](Self::unset)
    pub fn restore(&mut self, key: &str, previous: Option<String>) {
        self.entries.retain(|e| e.key != key);
        match previous {
            Some(value) if self.inherited.get(key) == Some(&value) => {}
            Some(value) => self.write(key, value, EnvPolicy::Override),
            None => {
                if self.inherited.contains_key(key) {
                    self.entries.push(EnvEntry {
                        key: key.to_string(),
                        value: String::new(),
                        policy: EnvPolicy::Unset,
                    });
                }
            }
        }
    }

    /// Resolved variables as a child process should see them
    pub fn vars(&self) -> BTreeMap<String, String> {
        let mut vars = self.inherited.clone();
        for entry in &self.entries {
            match entry.policy {
                EnvPolicy::Unset => {
                    vars.remove(&entry.key);
                }
                EnvPolicy::Default | EnvPolicy::Override => {
                    vars.insert(entry.key.clone(), entry.value.clone());
                }
            }
        }
        vars
    }

    /// Writes made on top of the inherited snapshot, in order
    pub fn entries(&self) -> &[EnvEntry] {
        &self.entries
    }

    /// Render the writes as a POSIX shell startup script.
    ///
    /// Defaults defer to whatever the app's environment defines at boot.
    pub fn render_profile(&self) -> String {
        let mut script = String::new();
        for entry in &self.entries {
            let _ = match entry.policy {
                EnvPolicy::Default => writeln!(
                    script,
                    "export {key}=${{{key}:-{value}}}",
                    key = entry.key,
                    value = entry.value
                ),
                EnvPolicy::Override => {
                    writeln!(script, "export {}=\"{}\"", entry.key, entry.value)
                }
                EnvPolicy::Unset => writeln!(script, "unset {}", entry.key),
            };
        }
        script
    }

    fn write(&mut self, key: &str, value: String, policy: EnvPolicy) {
        self.entries.retain(|e| e.key != key);
        self.entries.push(EnvEntry {
            key: key.to_string(),
            value,
            policy,
        });
    }
}
