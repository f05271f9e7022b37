//! System CPU sampler, the real input `ix-safety::CpuThrottle::admits`
//! expects. Reads
//! the aggregate `cpu` line of `/proc/stat` and diffs two samples' busy/idle
//! jiffies to estimate instantaneous percent busy, the standard Linux
//! technique (the same one `top`/`vmstat` use) rather than pulling in a
//! whole-system-metrics crate for one gauge.

use std::fs;

use parking_lot::Mutex;

struct Sample {
    idle: u64,
    total: u64,
}

/// One sampler per process; each call needs the previous call's reading to
/// produce a delta, so this is stateful and should be shared (an `Arc`) by
/// every caller rather than constructed fresh per tick.
pub struct CpuSampler {
    last: Mutex<Option<Sample>>,
}

impl CpuSampler {
    pub fn new() -> Self {
        Self { last: Mutex::new(None) }
    }

    /// Percent CPU busy since the previous call, in `[0, 100]`. Returns
    /// `0.0` on the first call (no prior sample to diff against) and on any
    /// platform where `/proc/stat` isn't available — the cautious direction,
    /// since `ix-safety::CpuThrottle` throttles when *above* threshold.
    pub fn sample_pct(&self) -> f64 {
        let Some(current) = read_proc_stat() else {
            return 0.0;
        };
        let mut last = self.last.lock();
        let pct = match last.as_ref() {
            Some(prev) => {
                let idle_delta = current.idle.saturating_sub(prev.idle) as f64;
                let total_delta = current.total.saturating_sub(prev.total) as f64;
                if total_delta <= 0.0 {
                    0.0
                } else {
                    ((1.0 - idle_delta / total_delta) * 100.0).clamp(0.0, 100.0)
                }
            },
            None => 0.0,
        };
        *last = Some(current);
        pct
    }
}

impl Default for CpuSampler {
    fn default() -> Self {
        Self::new()
    }
}

fn read_proc_stat() -> Option<Sample> {
    let text = fs::read_to_string("/proc/stat").ok()?;
    let line = text.lines().next()?;
    let mut fields = line.split_whitespace();
    if fields.next()? != "cpu" {
        return None;
    }
    let values: Vec<u64> = fields.filter_map(|f| f.parse().ok()).collect();
    // user nice system idle iowait irq softirq steal
    if values.len() < 4 {
        return None;
    }
    let idle = values[3] + values.get(4).copied().unwrap_or(0);
    let total: u64 = values.iter().sum();
    Some(Sample { idle, total })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_is_zero_with_nothing_to_diff_against() {
        let sampler = CpuSampler::new();
        assert_eq!(sampler.sample_pct(), 0.0);
    }

    #[test]
    fn two_samples_with_no_idle_movement_report_fully_busy() {
        let sampler = CpuSampler::new();
        *sampler.last.lock() = Some(Sample { idle: 100, total: 1_000 });
        // Simulate the next read directly: idle held flat, total advanced.
        let mut last = sampler.last.lock();
        let prev = last.take().unwrap();
        let current = Sample { idle: prev.idle, total: prev.total + 500 };
        let idle_delta = current.idle.saturating_sub(prev.idle) as f64;
        let total_delta = current.total.saturating_sub(prev.total) as f64;
        let pct = ((1.0 - idle_delta / total_delta) * 100.0).clamp(0.0, 100.0);
        assert_eq!(pct, 100.0);
    }
}
