use std::sync::Arc;

use anyhow::Result;
use log::{info, warn};
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::bot::ChannelBot;

/// Runs a cycle on every tick of `schedule`. A tick that fires while the
/// previous cycle is still verifying is skipped.
pub async fn setup_cycle_scheduler(
    bot: Arc<Mutex<ChannelBot>>,
    schedule: &str,
) -> Result<JobScheduler> {
    info!("Setting up polling scheduler ({schedule})...");

    let sched = JobScheduler::new().await?;

    let cycle_job = Job::new_async(schedule, move |_uuid, _l| {
        let bot = bot.clone();
        Box::pin(async move {
            run_guarded_cycle(&bot).await;
        })
    })?;

    sched.add(cycle_job).await?;

    sched.start().await?;
    info!("Polling scheduler started.");
    Ok(sched)
}

pub async fn run_guarded_cycle(bot: &Mutex<ChannelBot>) {
    match bot.try_lock() {
        Ok(mut bot) => {
            let outcome = bot.run_cycle().await;
            let stored = bot.history().map_or(0, |history| history.len());
            info!("Cycle finished: {outcome:?} ({stored} videos stored)");
        }
        Err(_) => warn!("Previous cycle still running, skipping this tick"),
    }
}
