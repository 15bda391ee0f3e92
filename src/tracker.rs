//! Per-event pipeline: fetch, load previous, persist, diff, notify.
//!
//! Events are processed one after another. A failure in one event is logged
//! and recorded in the [`RunReport`]; it never stops the remaining events.

use std::fmt;

use color_eyre::{Result, eyre::Report};
use log::{error, info, warn};
use strum_macros::Display;

use crate::diff::{find_missing_teams, render_message, team_numbers};
use crate::roster::RosterSource;
use crate::storage::SnapshotStore;
use crate::webhook::Notifier;

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    #[strum(to_string = "fetching teams")]
    Fetch,
    #[strum(to_string = "reading previous teams file")]
    LoadPrevious,
    #[strum(to_string = "saving teams to file")]
    Persist,
    #[strum(to_string = "retrieving event name")]
    ResolveName,
    #[strum(to_string = "sending Slack message")]
    Notify,
}

#[derive(Debug)]
pub enum EventOutcome {
    /// No earlier snapshot existed; the current roster was saved and nothing compared.
    FirstSeen { teams: usize },
    Unchanged { notified: bool },
    Notified { missing: usize },
    Failed { stage: Stage, error: Report },
}

impl EventOutcome {
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for EventOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstSeen { teams } => {
                write!(f, "no previous team data to compare, saved {teams} teams")
            }
            Self::Unchanged { notified: false } => write!(f, "no teams missing"),
            Self::Unchanged { notified: true } => {
                write!(f, "no teams missing, notification sent")
            }
            Self::Notified { missing } => write!(f, "{missing} missing team(s) reported"),
            Self::Failed { stage, error } => write!(f, "error {stage}: {error:#}"),
        }
    }
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<(String, EventOutcome)>,
}

impl RunReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_failure()).count()
    }

    pub fn outcome(&self, event_id: &str) -> Option<&EventOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| id == event_id)
            .map(|(_, outcome)| outcome)
    }
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, (Stage, Report)>;
}

impl<T> AtStage<T> for Result<T> {
    fn at(self, stage: Stage) -> Result<T, (Stage, Report)> {
        self.map_err(|error| (stage, error))
    }
}

pub struct Tracker<'a, R, S, N> {
    roster: &'a R,
    store: &'a S,
    notifier: &'a N,
    notify_unchanged: bool,
}

impl<'a, R, S, N> Tracker<'a, R, S, N>
where
    R: RosterSource,
    S: SnapshotStore,
    N: Notifier,
{
    pub fn new(roster: &'a R, store: &'a S, notifier: &'a N) -> Self {
        Self {
            roster,
            store,
            notifier,
            notify_unchanged: false,
        }
    }

    /// Also send the "no teams are missing" message when a compared roster is unchanged.
    pub fn notify_unchanged(mut self, enabled: bool) -> Self {
        self.notify_unchanged = enabled;
        self
    }

    pub fn run(&self, event_ids: &[String]) -> RunReport {
        let outcomes = event_ids
            .iter()
            .map(|id| (id.clone(), self.process_event(id)))
            .collect();
        RunReport { outcomes }
    }

    pub fn process_event(&self, event_id: &str) -> EventOutcome {
        info!("Processing event ID: {event_id}");

        let outcome = match self.try_process(event_id) {
            Ok(outcome) => outcome,
            Err((stage, error)) => EventOutcome::Failed { stage, error },
        };

        if outcome.is_failure() {
            error!("Event {event_id}: {outcome}");
        } else {
            info!("Event {event_id}: {outcome}");
        }
        outcome
    }

    fn try_process(&self, event_id: &str) -> Result<EventOutcome, (Stage, Report)> {
        let current = self.roster.fetch_roster(event_id).at(Stage::Fetch)?;
        if current.is_truncated() {
            warn!(
                "Event {event_id} reports {} teams but only {} were returned",
                current.meta.total,
                current.data.len()
            );
        }

        let previous = self.store.load(event_id).at(Stage::LoadPrevious)?;
        self.store.save(event_id, &current).at(Stage::Persist)?;

        let Some(previous) = previous else {
            return Ok(EventOutcome::FirstSeen {
                teams: current.data.len(),
            });
        };

        let missing = find_missing_teams(&previous.data, &current.data);
        if missing.is_empty() && !self.notify_unchanged {
            return Ok(EventOutcome::Unchanged { notified: false });
        }

        if !missing.is_empty() {
            warn!(
                "{} team(s) missing from event {event_id}: {}",
                missing.len(),
                team_numbers(&missing)
            );
        }

        let event_name = self
            .roster
            .fetch_event_name(event_id)
            .at(Stage::ResolveName)?;
        self.notifier
            .notify(&render_message(&event_name, &missing))
            .at(Stage::Notify)?;

        Ok(if missing.is_empty() {
            EventOutcome::Unchanged { notified: true }
        } else {
            EventOutcome::Notified {
                missing: missing.len(),
            }
        })
    }
}
