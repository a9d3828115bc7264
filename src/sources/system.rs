use super::traits::{MetricSource, unavailable};
use crate::engine::MetricSnapshot;
use crate::error::TransportError;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

const SOURCE_NAME: &str = "system";
const CPU_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);
const PROCESSES_PER_RESTART: usize = 5;
const MAX_RESTARTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    pub idle: u64,
    pub total: u64,
}

/// Live host sampling from procfs. Hosts without `/proc` report every tick
/// as unavailable.
pub struct SystemSource {
    prev_net_errors: Option<(u64, Instant)>,
    prev_process_count: Option<usize>,
}

impl SystemSource {
    pub fn new() -> Self {
        let prev_net_errors = std::fs::read_to_string("/proc/net/dev")
            .ok()
            .map(|raw| (parse_net_errors(&raw), Instant::now()));
        let prev_process_count = count_processes().ok();
        Self {
            prev_net_errors,
            prev_process_count,
        }
    }

    async fn collect(&mut self) -> Result<MetricSnapshot, TransportError> {
        let first = read_cpu_times().await?;
        tokio::time::sleep(CPU_SAMPLE_INTERVAL).await;
        let second = read_cpu_times().await?;
        let cpu_usage = cpu_usage_between(first, second);

        let meminfo = read_proc("/proc/meminfo").await?;
        let mem_usage = parse_mem_usage(&meminfo)
            .ok_or_else(|| unavailable(SOURCE_NAME, "MemTotal/MemAvailable missing"))?;

        let net_dev = read_proc("/proc/net/dev").await?;
        let errors = parse_net_errors(&net_dev);
        let now = Instant::now();
        let error_rate = match self.prev_net_errors {
            Some((prev, at)) => {
                let elapsed = now.duration_since(at).as_secs_f64();
                #[allow(clippy::cast_precision_loss)]
                let delta = errors.saturating_sub(prev) as f64;
                if elapsed > 0.0 { delta / elapsed } else { 0.0 }
            }
            None => 0.0,
        };
        self.prev_net_errors = Some((errors, now));

        let processes = count_processes()
            .map_err(|e| unavailable(SOURCE_NAME, format!("failed to list /proc: {e}")))?;
        let restart_count = self
            .prev_process_count
            .map_or(0, |prev| restarts_from_process_delta(prev, processes));
        self.prev_process_count = Some(processes);

        Ok(MetricSnapshot {
            cpu_usage,
            mem_usage,
            error_rate,
            response_p95_ms: p95_proxy_from_cpu(cpu_usage),
            restart_count,
        })
    }
}

impl MetricSource for SystemSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn sample(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<MetricSnapshot, TransportError>> + Send + '_>> {
        Box::pin(self.collect())
    }
}

async fn read_proc(path: &str) -> Result<String, TransportError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| unavailable(SOURCE_NAME, format!("failed to read {path}: {e}")))
}

async fn read_cpu_times() -> Result<CpuTimes, TransportError> {
    let stat = read_proc("/proc/stat").await?;
    parse_cpu_times(&stat).ok_or_else(|| unavailable(SOURCE_NAME, "malformed /proc/stat"))
}

fn count_processes() -> std::io::Result<usize> {
    Ok(std::fs::read_dir("/proc")?
        .filter_map(Result::ok)
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.bytes().all(|b| b.is_ascii_digit()))
        })
        .count())
}

/// Aggregate `cpu` line of `/proc/stat`. iowait counts as idle.
pub fn parse_cpu_times(stat: &str) -> Option<CpuTimes> {
    let line = stat.lines().find(|l| l.starts_with("cpu "))?;
    let values: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .take(8)
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    if values.len() < 4 {
        return None;
    }
    let idle = values[3] + values.get(4).copied().unwrap_or(0);
    Some(CpuTimes {
        idle,
        total: values.iter().sum(),
    })
}

pub fn cpu_usage_between(first: CpuTimes, second: CpuTimes) -> f64 {
    let total = second.total.saturating_sub(first.total);
    if total == 0 {
        return 0.0;
    }
    let idle = second.idle.saturating_sub(first.idle).min(total);
    #[allow(clippy::cast_precision_loss)]
    let busy = (total - idle) as f64 / total as f64;
    (busy * 100.0).clamp(0.0, 100.0)
}

pub fn parse_mem_usage(meminfo: &str) -> Option<f64> {
    let field = |key: &str| -> Option<f64> {
        meminfo
            .lines()
            .find(|l| l.starts_with(key))?
            .split_whitespace()
            .nth(1)?
            .parse()
            .ok()
    };
    let total = field("MemTotal:")?;
    let available = field("MemAvailable:")?;
    if total <= 0.0 {
        return None;
    }
    Some(((1.0 - available / total) * 100.0).clamp(0.0, 100.0))
}

/// Sum of receive and transmit error counters across interfaces.
pub fn parse_net_errors(net_dev: &str) -> u64 {
    net_dev
        .lines()
        .skip(2)
        .filter_map(|line| line.split_once(':').map(|(_, rest)| rest))
        .map(|rest| {
            let fields: Vec<u64> = rest
                .split_whitespace()
                .map(|f| f.parse().unwrap_or(0))
                .collect();
            fields.get(2).copied().unwrap_or(0) + fields.get(10).copied().unwrap_or(0)
        })
        .sum()
}

/// Latency proxy in bands: <20% → 100ms, then linear to 500, 1500 and 3000ms.
pub fn p95_proxy_from_cpu(cpu_usage: f64) -> f64 {
    if cpu_usage < 20.0 {
        100.0
    } else if cpu_usage < 50.0 {
        100.0 + (cpu_usage - 20.0) / 30.0 * 400.0
    } else if cpu_usage < 80.0 {
        500.0 + (cpu_usage - 50.0) / 30.0 * 1000.0
    } else {
        1500.0 + (cpu_usage - 80.0) / 20.0 * 1500.0
    }
}

/// Every five processes appearing or vanishing between samples counts as one
/// restart, capped at ten.
pub fn restarts_from_process_delta(previous: usize, current: usize) -> u32 {
    let delta = previous.abs_diff(current);
    u32::try_from((delta / PROCESSES_PER_RESTART).min(MAX_RESTARTS)).unwrap_or(u32::MAX)
}
