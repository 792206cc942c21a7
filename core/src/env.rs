//! Environment lookup used by the default resolver.

use std::collections::{BTreeMap, HashMap};

/// Source of environment variables.
///
/// Implemented for the process environment and for plain maps, so tests can
/// inject variables without touching process state.
pub trait Environment {
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl Environment for BTreeMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<T: Environment + ?Sized> Environment for &T {
    fn var(&self, name: &str) -> Option<String> {
        (**self).var(name)
    }
}
