use color_eyre::{
    Result,
    eyre::{Context, bail, eyre},
};
use log::debug;
use reqwest::blocking::Client;
use reqwest::header;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::config::Config;

pub type TeamId = u64;
pub type Teams = Vec<Team>;

/// Decodes `null` as the field's default instead of failing.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, deserialize_with = "nullable")]
    pub city: String,
    #[serde(default, deserialize_with = "nullable")]
    pub region: String,
    #[serde(default, deserialize_with = "nullable")]
    pub country: String,
    #[serde(default, deserialize_with = "nullable")]
    pub postcode: String,
}

/// One registered team. Only `id` takes part in roster comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    #[serde(default, deserialize_with = "nullable")]
    pub number: String,
    #[serde(default, deserialize_with = "nullable")]
    pub team_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub robot_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub organization: String,
    #[serde(default, deserialize_with = "nullable")]
    pub location: Location,
    #[serde(default, deserialize_with = "nullable")]
    pub registered: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterMeta {
    pub total: usize,
}

/// A page of an event's team list, as served by the API and as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    pub meta: RosterMeta,
    pub data: Teams,
}

impl Roster {
    /// True when the API reports more teams than the single page we fetched.
    pub fn is_truncated(&self) -> bool {
        self.meta.total > self.data.len()
    }
}

/// Where rosters and event names come from.
pub trait RosterSource {
    fn fetch_roster(&self, event_id: &str) -> Result<Roster>;
    fn fetch_event_name(&self, event_id: &str) -> Result<String>;
}

#[derive(Deserialize)]
struct EventResponse {
    name: String,
}

/// Blocking client for the RobotEvents v2 API.
pub struct RobotEventsClient {
    client: Client,
    base_url: Url,
    page_size: u32,
}

impl RobotEventsClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", config.api_token))
            .wrap_err("API token is not a valid header value")?;
        auth.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .build()
            .wrap_err("failed to build API client")?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            page_size: config.page_size,
        })
    }

    /// Joins `segments` onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| eyre!("API base URL {} cannot take a path", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn roster_url(&self, event_id: &str) -> Result<Url> {
        check_event_id(event_id)?;
        let mut url = self.endpoint(&["events", event_id, "teams"])?;
        url.query_pairs_mut()
            .append_pair("per_page", &self.page_size.to_string())
            .append_pair("page", "1");
        Ok(url)
    }

    pub fn event_url(&self, event_id: &str) -> Result<Url> {
        check_event_id(event_id)?;
        self.endpoint(&["events", event_id])
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url, event_id: &str) -> Result<T> {
        let res = self
            .client
            .get(url)
            .send()
            .and_then(|res| res.error_for_status())
            .wrap_err_with(|| format!("event {event_id}: request failed"))?;
        res.json()
            .wrap_err_with(|| format!("event {event_id}: malformed response body"))
    }
}

/// `.` and `..` would be resolved as relative path segments.
fn check_event_id(event_id: &str) -> Result<()> {
    if matches!(event_id, "" | "." | "..") {
        bail!("invalid event ID {event_id:?}");
    }
    Ok(())
}

impl RosterSource for RobotEventsClient {
    fn fetch_roster(&self, event_id: &str) -> Result<Roster> {
        let url = self.roster_url(event_id)?;
        debug!("Fetching roster from {url}");
        self.get_json(url, event_id)
    }

    fn fetch_event_name(&self, event_id: &str) -> Result<String> {
        let url = self.event_url(event_id)?;
        debug!("Fetching event name from {url}");
        let event: EventResponse = self.get_json(url, event_id)?;
        Ok(event.name)
    }
}
