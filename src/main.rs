use std::sync::Arc;

use anyhow::Result;
use daily_rates::{Config, HttpRateSource, PgConnector, RunMode, SyncJob, scheduler};
use log::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Application starting...");
    let config = Config::from_env();

    let mode = match config.run_mode() {
        Ok(mode) => mode,
        Err(e) => {
            error!("{}", e);
            return Ok(());
        }
    };

    let job = SyncJob::new(
        HttpRateSource::new(&config.api_url),
        PgConnector::new(config.db.clone()),
        config.api_key.clone(),
    );

    match mode {
        RunMode::RunOnce => {
            info!("SCRIPT_MODE is 'run_once'. Running the job immediately.");
            let _ = job.run().await;
            info!("Job finished. Exiting.");
        }
        RunMode::Schedule => {
            info!("SCRIPT_MODE is 'schedule'. Scheduler is active.");
            if let Err(e) = scheduler::run_daily(Arc::new(job)).await {
                error!("Scheduler failed: {:#}", e);
            }
        }
    }

    Ok(())
}
