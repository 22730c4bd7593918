//! Scoped removal of an environment variable

use super::EnvironmentVariableSet;
use std::ops::{Deref, DerefMut};
use tracing::debug;

/// Removes a variable from a set for as long as the guard lives.
///
/// The original value is put back when the guard is dropped, so an early
/// return through `?` restores it the same way a normal return does.
pub struct ScopedUnset<'a> {
    env: &'a mut EnvironmentVariableSet,
    key: &'static str,
    saved: Option<String>,
}

impl<'a> ScopedUnset<'a> {
    pub fn new(env: &'a mut EnvironmentVariableSet, key: &'static str) -> Self {
        let saved = env.unset(key);
        if saved.is_some() {
            debug!("Unset {} for the enclosed stage", key);
        }
        Self { env, key, saved }
    }
}

impl Deref for ScopedUnset<'_> {
    type Target = EnvironmentVariableSet;

    fn deref(&self) -> &Self::Target {
        self.env
    }
}

impl DerefMut for ScopedUnset<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.env
    }
}

impl Drop for ScopedUnset<'_> {
    fn drop(&mut self) {
        self.env.restore(self.key, self.saved.take());
    }
}
