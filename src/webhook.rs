use color_eyre::{
    Result,
    eyre::{Context, bail},
};
use log::info;
use reqwest::blocking::Client;
use slack_morphism::prelude::*;
use url::Url;

/// Outbound channel for roster alerts.
pub trait Notifier {
    fn notify(&self, message: &str) -> Result<()>;
}

pub fn payload(message: &str) -> SlackMessageContent {
    SlackMessageContent::new().with_text(message.to_string())
}

/// Posts plain-text messages to a Slack incoming webhook.
pub struct SlackWebhook {
    client: Client,
    url: Url,
}

impl SlackWebhook {
    pub fn new(url: Url, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .wrap_err("failed to build webhook client")?;
        Ok(Self { client, url })
    }
}

impl Notifier for SlackWebhook {
    fn notify(&self, message: &str) -> Result<()> {
        let res = self
            .client
            .post(self.url.clone())
            .json(&payload(message))
            .send()
            .wrap_err("failed to reach Slack webhook")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().unwrap_or_default();
            bail!("failed to send Slack message, status code: {status} {body}");
        }

        info!("Successfully sent webhook notification");
        Ok(())
    }
}
