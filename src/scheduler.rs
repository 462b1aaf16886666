//! Daily trigger for the sync job.

use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::job::SyncJob;
use crate::source::RateSource;
use crate::store::RateConnector;

/// 06:00:00 UTC every day (seconds field first).
pub const DAILY_CRON: &str = "0 0 6 * * *";

fn daily_job<S, C>(job: Arc<SyncJob<S, C>>) -> Result<Job>
where
    S: RateSource + 'static,
    C: RateConnector + 'static,
{
    Job::new_async(DAILY_CRON, move |_uuid, _l| {
        let job = Arc::clone(&job);
        Box::pin(async move {
            // Failures are already logged by the job; the next trigger runs regardless.
            let _ = job.run().await;
        })
    })
    .with_context(|| format!("creating scheduler job for cron {DAILY_CRON}"))
}

/// Registers the job at 06:00 UTC daily and blocks until Ctrl+C.
pub async fn run_daily<S, C>(job: Arc<SyncJob<S, C>>) -> Result<()>
where
    S: RateSource + 'static,
    C: RateConnector + 'static,
{
    let mut sched = JobScheduler::new().await.context("creating scheduler")?;
    sched
        .add(daily_job(job)?)
        .await
        .context("adding scheduler job")?;
    sched.start().await.context("starting scheduler")?;
    info!("Job scheduled daily at 06:00 UTC. Press Ctrl+C to exit.");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;

    info!("Scheduler stopped.");
    sched.shutdown().await.context("stopping scheduler")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::HttpRateSource;
    use crate::store::MemoryConnector;

    #[tokio::test]
    async fn test_daily_cron_is_accepted() {
        let job = SyncJob::new(
            HttpRateSource::new("http://127.0.0.1:1"),
            MemoryConnector::new(),
            None,
        );
        assert!(daily_job(Arc::new(job)).is_ok());
    }
}
