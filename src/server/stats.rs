//! Host CPU and RAM sampling.

use serde::Serialize;
use sysinfo::System;

/// Cumulative CPU tick counters from the aggregate `cpu` line of
/// `/proc/stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuTicks {
    pub idle: u64,
    pub total: u64,
}

impl CpuTicks {
    /// Parses the first `cpu ` line of `/proc/stat`. Idle time includes
    /// iowait.
    pub fn parse(stat: &str) -> Option<Self> {
        let line = stat.lines().find(|l| l.starts_with("cpu "))?;
        let values: Vec<u64> = line
            .split_whitespace()
            .skip(1)
            .map(|v| v.parse::<u64>())
            .collect::<Result<_, _>>()
            .ok()?;
        if values.len() < 4 {
            return None;
        }

        let idle = values[3] + values.get(4).copied().unwrap_or(0);
        let total = values.iter().sum();
        Some(Self { idle, total })
    }

    /// Busy share of the interval between `prev` and `self`, in percent.
    pub fn usage_since(&self, prev: &CpuTicks) -> f64 {
        let total = self.total.saturating_sub(prev.total);
        if total == 0 {
            return 0.0;
        }
        let idle = self.idle.saturating_sub(prev.idle).min(total);
        (total - idle) as f64 / total as f64 * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSample {
    pub cpu: f64,
    pub ram: f64,
    pub ram_used: u64,
    pub ram_total: u64,
}

pub struct StatsSampler {
    system: System,
    prev: Option<CpuTicks>,
}

impl Default for StatsSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsSampler {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            prev: None,
        }
    }

    pub async fn sample(&mut self) -> StatsSample {
        let ticks = read_cpu_ticks().await;
        let cpu = self.cpu_from(ticks);

        self.system.refresh_memory();
        let total = self.system.total_memory();
        let free = self.system.free_memory();

        sample_from(cpu, total, free)
    }

    /// The first reading has nothing to diff against and reports 0.
    fn cpu_from(&mut self, ticks: Option<CpuTicks>) -> f64 {
        let cpu = match (self.prev, ticks) {
            (Some(prev), Some(cur)) => cur.usage_since(&prev),
            _ => 0.0,
        };
        if ticks.is_some() {
            self.prev = ticks;
        }
        cpu
    }
}

fn sample_from(cpu: f64, total: u64, free: u64) -> StatsSample {
    let used = total.saturating_sub(free);
    let ram = if total == 0 {
        0.0
    } else {
        used as f64 / total as f64 * 100.0
    };
    StatsSample {
        cpu,
        ram,
        ram_used: used,
        ram_total: total,
    }
}

async fn read_cpu_ticks() -> Option<CpuTicks> {
    let stat = tokio::fs::read_to_string("/proc/stat").await.ok()?;
    CpuTicks::parse(&stat)
}
