use std::collections::BTreeMap;
use std::sync::Mutex;

/// Named event counters shared by every worker
#[derive(Debug, Default)]
pub struct EventCounter {
    counts: Mutex<BTreeMap<String, u64>>,
}

impl EventCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(&self, name: &str) {
        self.incr_by(name, 1);
    }

    pub fn incr_by(&self, name: &str, amount: u64) {
        let mut counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        *counts.entry(name.to_string()).or_insert(0) += amount;
    }

    /// Current value of a counter, zero if never incremented
    pub fn get(&self, name: &str) -> u64 {
        let counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        counts.get(name).copied().unwrap_or(0)
    }

    /// Copy of every counter, ordered by name
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.counts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
