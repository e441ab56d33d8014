//! Last observed up/down state per monitor.

use std::collections::HashMap;
use std::sync::Mutex;

/// Process-lifetime map from monitor name to its last observed state.
///
/// Starts empty, so the first observation for any monitor after a restart
/// counts as a transition.
#[derive(Debug, Default)]
pub struct StatusTracker {
    last: Mutex<HashMap<String, bool>>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `is_up` for `name` and report whether it is a transition.
    ///
    /// A transition is a first observation or a change from the previous one.
    pub fn observe(&self, name: &str, is_up: bool) -> bool {
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = last.insert(name.to_string(), is_up);
        previous != Some(is_up)
    }
}
