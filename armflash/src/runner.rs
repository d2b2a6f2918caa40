//! Parallel flash orchestration.
//!
//! Every job gets its own worker thread, capped at
//! [`MAX_PARALLEL_JOBS`] concurrent workers. Jobs are fully
//! independent: one device failing to synchronize or program does not
//! stop the others, it only shows up in that job's report.

use std::thread;

use log::{error, info};

use crate::error::Result;
use crate::job::FlashJob;
use crate::target::DeviceRegistry;

/// Upper bound on concurrently flashed devices.
pub const MAX_PARALLEL_JOBS: usize = 32;

/// Outcome of one flash job.
#[derive(Debug)]
pub struct JobReport {
    /// Serial port the job ran on.
    pub port: String,
    /// Device name from the job.
    pub device: String,
    /// What happened.
    pub result: Result<()>,
}

impl JobReport {
    /// Whether the job programmed its device successfully.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.result
            .is_ok()
    }
}

/// Flash all jobs, at most [`MAX_PARALLEL_JOBS`] at a time.
///
/// Reports come back in job order regardless of completion order.
pub fn run_jobs(registry: &DeviceRegistry, jobs: &[FlashJob]) -> Vec<JobReport> {
    execute(jobs, |job| run_one(registry, job))
}

/// Worker body for a single job.
fn run_one(registry: &DeviceRegistry, job: &FlashJob) -> Result<()> {
    let kind = registry.resolve(&job.device)?;
    let mut flasher = kind.create_flasher(
        &job.port,
        job.baud
            .as_u32(),
        job.crystal_khz,
    )?;
    flasher.initialize()?;
    flasher.flash(&job.firmware)
}

/// Run `work` for every job in bounded waves of scoped threads.
fn execute<F>(jobs: &[FlashJob], work: F) -> Vec<JobReport>
where
    F: Fn(&FlashJob) -> Result<()> + Sync,
{
    let mut reports = Vec::with_capacity(jobs.len());

    for wave in jobs.chunks(MAX_PARALLEL_JOBS) {
        thread::scope(|scope| {
            let handles: Vec<_> = wave
                .iter()
                .map(|job| scope.spawn(|| work(job)))
                .collect();

            for (job, handle) in wave
                .iter()
                .zip(handles)
            {
                let result = handle
                    .join()
                    .unwrap_or_else(|_| {
                        Err(crate::error::Error::Io(std::io::Error::other(
                            "flash worker panicked",
                        )))
                    });

                match &result {
                    Ok(()) => info!("{}: job finished", job.port),
                    Err(e) => error!("{}: job failed: {e}", job.port),
                }

                reports.push(JobReport {
                    port: job
                        .port
                        .clone(),
                    device: job
                        .device
                        .clone(),
                    result,
                });
            }
        });
    }

    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::job::BaudRate;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn job(port: &str, device: &str) -> FlashJob {
        FlashJob {
            port: port.to_string(),
            firmware: PathBuf::from("firmware.hex"),
            baud: BaudRate::B38400,
            crystal_khz: 14746,
            device: device.to_string(),
        }
    }

    #[test]
    fn unsupported_device_fails_its_job_only() {
        let registry = DeviceRegistry::default();
        let jobs = vec![job("/dev/null0", "LPC9999"), job("/dev/null1", "LPC9999")];
        let reports = run_jobs(&registry, &jobs);
        assert_eq!(reports.len(), 2);
        for report in &reports {
            assert!(!report.succeeded());
            assert!(matches!(report.result, Err(Error::UnsupportedDevice(_))));
        }
    }

    #[test]
    fn one_failing_job_does_not_stop_the_others() {
        let jobs = vec![job("p0", "LPC2103"), job("bad", "LPC2103"), job("p2", "LPC2103")];
        let reports = execute(&jobs, |job| {
            if job.port == "bad" {
                Err(Error::NotInitialized)
            } else {
                Ok(())
            }
        });
        assert_eq!(reports.len(), 3);
        assert!(reports[0].succeeded());
        assert!(!reports[1].succeeded());
        assert!(reports[2].succeeded());
        // Report order follows job order.
        assert_eq!(reports[1].port, "bad");
    }

    #[test]
    fn worker_count_never_exceeds_the_cap() {
        let jobs: Vec<FlashJob> = (0..40)
            .map(|i| job(&format!("p{i}"), "LPC2103"))
            .collect();
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        let reports = execute(&jobs, |_| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(1));
            active.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(reports.len(), 40);
        assert!(peak.load(Ordering::SeqCst) <= MAX_PARALLEL_JOBS);
    }
}
