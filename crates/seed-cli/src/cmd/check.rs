use crate::cmd::{load_config, load_registry, status::print_details, PulseArgs};
use crate::output::print_json;
use seed_core::status::StatusAggregator;
use std::path::Path;

pub fn run(root: &Path, pulse: &PulseArgs, reality: &str, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let registry = load_registry(root, &config)?;
    let mut aggregator = StatusAggregator::from_config(&config.pulse);
    let verdict = aggregator.reality_status(
        &registry,
        reality,
        pulse.level(&config),
        &pulse.busy(&config),
    )?;

    if json {
        print_json(&verdict)?;
    } else {
        print_details(&verdict);
    }
    Ok(())
}
