use color_eyre::Result;
use log::{info, warn};
use roster_tracker::config::Config;
use roster_tracker::roster::RobotEventsClient;
use roster_tracker::storage::JsonFileStore;
use roster_tracker::tracker::Tracker;
use roster_tracker::webhook::SlackWebhook;

fn main() -> Result<()> {
    color_eyre::install()?;
    let config = Config::from_env()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let api = RobotEventsClient::new(&config)?;
    let store = JsonFileStore::new(&config.storage_path);
    let webhook = SlackWebhook::new(config.slack_webhook_url.clone(), &config.user_agent)?;

    let report = Tracker::new(&api, &store, &webhook)
        .notify_unchanged(config.notify_unchanged)
        .run(&config.event_ids);

    if report.failures() > 0 {
        warn!(
            "Processed {} event(s), {} failed",
            report.len(),
            report.failures()
        );
    } else {
        info!("Processed {} event(s)", report.len());
    }
    Ok(())
}
