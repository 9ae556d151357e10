use renewal_watch::config::WatchConfig;
use renewal_watch::jobs::DueOrderJob;
use renewal_watch::logging::init_tracing;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match WatchConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = init_tracing(&config.logging.level) {
        eprintln!("Logging setup failed: {e}");
    }

    let settings = match config.job_settings() {
        Ok(s) => s,
        Err(e) => {
            error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let job = match DueOrderJob::from_config(&config, settings) {
        Ok(job) => job,
        Err(e) => {
            error!("Failed to set up clients: {e}");
            std::process::exit(1);
        }
    };

    match job.run_now().await {
        Ok(report) => info!(
            run_id = %report.run_id,
            notified = report.notify.sent,
            deleted = report.cleanup.deleted,
            "Run complete"
        ),
        Err(e) => {
            error!("Due-order job failed: {e}");
            std::process::exit(1);
        }
    }
}
