use crate::cmd::{load_config, load_registry, PulseArgs};
use crate::output::{activity_cell, print_json, print_table, status_cell, status_symbol};
use seed_core::pulse::{HealthStatus, HealthVerdict};
use seed_core::status::{EcosystemStatus, StatusAggregator};
use std::path::Path;

pub fn run(
    root: &Path,
    pulse: &PulseArgs,
    verbose: bool,
    strict: bool,
    json: bool,
) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let registry = load_registry(root, &config)?;
    let mut aggregator = StatusAggregator::from_config(&config.pulse);
    let status = aggregator.aggregate(registry.list(), pulse.level(&config), &pulse.busy(&config));

    if json {
        print_json(&status)?;
    } else {
        print_status(&status, verbose);
    }

    if strict && status.overall_status != HealthStatus::Green {
        anyhow::bail!("ecosystem status is {}", status.overall_status);
    }
    Ok(())
}

pub fn print_status(status: &EcosystemStatus, verbose: bool) {
    let s = status.summary();
    println!(
        "{} Ecosystem: {}  ({} realities: {} green, {} yellow, {} red)",
        status_symbol(s.overall_status),
        s.overall_status.as_str().to_uppercase(),
        s.total,
        s.green,
        s.yellow,
        s.red
    );
    println!(
        "  pending work: {}  realities with drift: {}  busy: {}",
        s.total_pending_work, s.realities_with_drift, s.busy
    );

    if status.verdicts().is_empty() {
        println!("\nNo realities registered.");
        return;
    }
    println!();

    let rows: Vec<Vec<String>> = status.verdicts().iter().map(verdict_row).collect();
    print_table(
        &["ID", "LABEL", "STATUS", "ACTIVITY", "HASHES", "PENDING", "ERRORS"],
        rows,
    );

    if verbose {
        for v in status.verdicts().iter().filter(|v| v.has_issues()) {
            println!();
            print_details(v);
        }
    }
}

fn verdict_row(v: &HealthVerdict) -> Vec<String> {
    vec![
        v.reality_id.clone(),
        v.label.clone(),
        status_cell(v.status),
        activity_cell(v.activity),
        hash_cell(v),
        v.pending_work_count.to_string(),
        v.error_work_count.to_string(),
    ]
}

fn hash_cell(v: &HealthVerdict) -> String {
    if v.error.is_some() {
        return "-".to_string();
    }
    format!(
        "{} ok / {} drift / {} missing",
        v.verified_count, v.drifted_count, v.missing_count
    )
}

/// Multi-line breakdown of one verdict.
pub fn print_details(v: &HealthVerdict) {
    println!("{} {} ({})", status_symbol(v.status), v.label, v.reality_id);
    println!("  status:    {}", status_cell(v.status));
    println!("  activity:  {}", activity_cell(v.activity));
    if let Some(err) = &v.error {
        println!("  error:     {err}");
        return;
    }
    println!(
        "  hashes:    {} verified, {} drifted, {} missing{}",
        v.verified_count,
        v.drifted_count,
        v.missing_count,
        if v.hash_verified { "" } else { "  (run `seed verify`)" }
    );
    println!(
        "  work:      {} pending, {} errored",
        v.pending_work_count, v.error_work_count
    );
    println!("  checked:   {}", v.checked_at.to_rfc3339());
}
