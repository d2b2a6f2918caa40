//! Parallel flash command implementation.

use anyhow::{Result, bail};
use armflash::{DeviceRegistry, MAX_PARALLEL_JOBS, parse_jobs, run_jobs};
use console::style;

/// Flash command implementation.
pub(crate) fn cmd_flash(tokens: &[String], quiet: bool) -> Result<()> {
    let jobs = parse_jobs(tokens)?;
    let registry = DeviceRegistry::default();

    if !quiet {
        eprintln!(
            "{} Flashing {} device(s), up to {} in parallel",
            style("→").cyan(),
            jobs.len(),
            MAX_PARALLEL_JOBS
        );
    }

    let reports = run_jobs(&registry, &jobs);

    for report in &reports {
        match &report.result {
            Ok(()) => eprintln!(
                "  {} {} ({})",
                style("✓").green(),
                report.port,
                report.device
            ),
            Err(e) => eprintln!(
                "  {} {} ({}): {e}",
                style("✗")
                    .red()
                    .bold(),
                report.port,
                report.device
            ),
        }
    }

    let failed = reports
        .iter()
        .filter(|r| !r.succeeded())
        .count();
    if failed > 0 {
        bail!("{failed} of {} jobs failed", reports.len());
    }

    if !quiet {
        eprintln!(
            "{} All devices programmed.",
            style("✓")
                .green()
                .bold()
        );
    }
    Ok(())
}
