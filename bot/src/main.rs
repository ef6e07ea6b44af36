mod bot;
mod config;
mod models;
mod services;
mod utils;

use std::sync::Arc;

use log::info;
use tokio::sync::Mutex;

use crate::bot::ChannelBot;
use crate::config::{init_logger, load_environment, BotConfig};
use crate::services::scheduler::{run_guarded_cycle, setup_cycle_scheduler};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    load_environment();
    init_logger();

    let config = BotConfig::from_env()?;
    info!(
        "Watching channel {} in {:?} mode",
        config.channel_id, config.mode
    );

    let bot = Arc::new(Mutex::new(ChannelBot::from_config(&config)?));

    let startup = bot.clone();
    tokio::spawn(async move {
        run_guarded_cycle(&startup).await;
    });

    let mut scheduler = setup_cycle_scheduler(bot, &config.check_schedule).await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");
    scheduler.shutdown().await?;
    Ok(())
}
