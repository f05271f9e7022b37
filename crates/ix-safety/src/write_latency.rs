//! Write-latency monitor gate: tracks a per-table p95 and
//! blocks index creation on that table when the ceiling is exceeded.

use parking_lot::RwLock;
use std::collections::HashMap;

pub struct WriteLatencyMonitor {
    ceiling_ms: f64,
    recent_ms: RwLock<HashMap<String, Vec<f64>>>,
}

const MAX_SAMPLES_PER_TABLE: usize = 500;

impl WriteLatencyMonitor {
    pub fn new(ceiling_ms: f64) -> Self {
        Self {
            ceiling_ms,
            recent_ms: RwLock::new(HashMap::new()),
        }
    }

    pub fn record(&self, table: &str, write_latency_ms: f64) {
        let mut recent = self.recent_ms.write();
        let entry = recent.entry(table.to_owned()).or_default();
        entry.push(write_latency_ms);
        if entry.len() > MAX_SAMPLES_PER_TABLE {
            entry.remove(0);
        }
    }

    pub fn p95_ms(&self, table: &str) -> Option<f64> {
        let recent = self.recent_ms.read();
        let samples = recent.get(table)?;
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let idx = ((sorted.len() as f64 - 1.0) * 0.95).round() as usize;
        Some(sorted[idx.min(sorted.len() - 1)])
    }

    pub fn admits(&self, table: &str) -> bool {
        match self.p95_ms(table) {
            Some(p95) => p95 <= self.ceiling_ms,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_with_no_history() {
        let monitor = WriteLatencyMonitor::new(250.0);
        assert!(monitor.admits("contacts"));
    }

    #[test]
    fn denies_when_p95_exceeds_ceiling() {
        let monitor = WriteLatencyMonitor::new(100.0);
        for ms in [10.0, 20.0, 500.0, 500.0, 500.0] {
            monitor.record("contacts", ms);
        }
        assert!(!monitor.admits("contacts"));
    }

    #[test]
    fn tables_are_tracked_independently() {
        let monitor = WriteLatencyMonitor::new(100.0);
        monitor.record("contacts", 500.0);
        assert!(monitor.admits("orders"));
    }
}
