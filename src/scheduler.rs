//! # Job Scheduler
//!
//! Owns the recurring background jobs of the process. Each job is a named
//! tick loop; the first tick is offset by a random jitter so that several
//! instances started together do not hit the platform at the same moment.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use metrics::histogram;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub struct Scheduler {
    jobs: HashMap<String, JoinHandle<()>>,
    shutdown: CancellationToken,
    jitter_pct_max: f64,
}

impl Scheduler {
    pub fn new(jitter_pct_max: f64) -> Self {
        Self {
            jobs: HashMap::new(),
            shutdown: CancellationToken::new(),
            jitter_pct_max: jitter_pct_max.clamp(0.0, 1.0),
        }
    }

    /// Spawn `job` every `interval` until [`Scheduler::stop`]. A job that is
    /// already registered under `name` is replaced.
    pub fn start<F, Fut>(&mut self, name: impl Into<String>, interval: Duration, job: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let offset = compute_jitter(interval, self.jitter_pct_max, &mut rand::thread_rng());
        let shutdown = self.shutdown.child_token();
        let task_name = name.clone();

        let handle = tokio::spawn(async move {
            info!(job = %task_name, interval_secs = interval.as_secs(), offset_secs = offset.as_secs(), "Job scheduled");
            let mut wait = offset;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = sleep(wait) => {}
                }

                let started = Instant::now();
                job().await;
                let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;
                histogram!("scheduler_job_duration_ms", "job" => task_name.clone()).record(elapsed_ms);
                debug!(job = %task_name, elapsed_ms, "Job tick finished");

                wait = interval;
            }

            info!(job = %task_name, "Job stopped");
        });

        if let Some(previous) = self.jobs.insert(name.clone(), handle) {
            warn!(job = %name, "Replacing already running job");
            previous.abort();
        }
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.jobs
            .get(name)
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn job_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.jobs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Cancel every job and wait for in-flight ticks to finish.
    pub async fn stop(&mut self) {
        self.shutdown.cancel();
        for (name, handle) in self.jobs.drain() {
            if let Err(err) = handle.await
                && !err.is_cancelled()
            {
                error!(job = %name, error = %err, "Job terminated abnormally");
            }
        }
        info!("Scheduler stopped");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Random offset in `[0, interval * pct_max]`, whole seconds.
fn compute_jitter<R: Rng + ?Sized>(interval: Duration, pct_max: f64, rng: &mut R) -> Duration {
    let max_seconds = (interval.as_secs_f64() * pct_max.clamp(0.0, 1.0)).round() as u64;
    if max_seconds == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs(rng.gen_range(0..=max_seconds))
}
