use crate::cmd::{load_config, load_registry, PulseArgs};
use crate::output::status_symbol;
use anyhow::Context;
use seed_core::io;
use seed_core::status::{EcosystemStatus, StatusAggregator};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Pulse in a loop. The registry is reloaded every cycle so realities added
/// to the seed model show up without a restart; the aggregator (and its
/// verdict cache) lives for the whole run.
pub fn run(
    root: &Path,
    pulse: &PulseArgs,
    interval: Option<u64>,
    iterations: Option<u64>,
    write: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let interval = interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.pulse.poll_interval());
    let level = pulse.level(&config);
    let busy = pulse.busy(&config);
    let mut aggregator = StatusAggregator::from_config(&config.pulse);

    info!(interval = ?interval, level = %level, "watching");
    let mut cycle: u64 = 0;
    loop {
        cycle += 1;
        let registry = load_registry(root, &config)?;
        let status = aggregator.aggregate(registry.list(), level, &busy);

        if json {
            println!("{}", serde_json::to_string(&status)?);
        } else {
            println!("{}", summary_line(&status));
        }
        if let Some(path) = write {
            write_snapshot(root, path, &status)?;
        }

        if iterations.is_some_and(|n| cycle >= n) {
            return Ok(());
        }
        std::thread::sleep(interval);
    }
}

fn summary_line(status: &EcosystemStatus) -> String {
    let s = status.summary();
    format!(
        "{} {} {}  green={} yellow={} red={} pending={} drift={}",
        status.generated_at.format("%Y-%m-%dT%H:%M:%SZ"),
        status_symbol(s.overall_status),
        s.overall_status,
        s.green,
        s.yellow,
        s.red,
        s.total_pending_work,
        s.realities_with_drift
    )
}

fn write_snapshot(root: &Path, path: &Path, status: &EcosystemStatus) -> anyhow::Result<()> {
    let target = seed_core::paths::resolve(root, path);
    let mut data = serde_json::to_vec_pretty(status)?;
    data.push(b'\n');
    io::atomic_write(&target, &data)
        .with_context(|| format!("failed to write snapshot {}", target.display()))
}
