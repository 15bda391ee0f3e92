//! Roster comparison and the Slack message built from it.
//!
//! The comparison is one-directional: it only reports teams that were in the
//! previous roster and are gone from the current one. New registrations and
//! edits to a team's details are not tracked.

use std::collections::HashMap;

use crate::roster::{Team, TeamId, Teams};

/// Teams from `previous` whose id does not appear in `current`, in `previous` order.
///
/// An empty `current` reports every previous team as missing.
pub fn find_missing_teams(previous: &[Team], current: &[Team]) -> Teams {
    // duplicate ids: the last occurrence wins, membership is unaffected
    let current_map: HashMap<TeamId, &Team> = current.iter().map(|t| (t.id, t)).collect();

    previous
        .iter()
        .filter(|team| !current_map.contains_key(&team.id))
        .cloned()
        .collect()
}

pub fn render_message(event_name: &str, missing: &[Team]) -> String {
    if missing.is_empty() {
        return format!("No teams are missing for event {event_name}.");
    }

    let mut message = format!("*Missing teams for* `{event_name}`:\n\n");
    for team in missing {
        message.push_str(&format!("`{}` - `{}`\n", team.number, team.organization));
    }
    message
}

/// Comma-separated team numbers, for log lines.
pub fn team_numbers(teams: &[Team]) -> String {
    teams
        .iter()
        .map(|t| t.number.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
