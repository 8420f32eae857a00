use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::error;

use crate::client::{FetchError, UrcClient};

const SQUAD_OPERATION: &str = "GetPlayerThemeSettingsById";
const SQUAD_QUERY_HASH: &str =
    "e1b82de16fadff0637731c7e7ca176c6f304685eb2760ea391fc1ee5745636ab";

/// Fetch the full roster for a club. No crawling or inference; this is the
/// same persisted query the club pages use.
pub fn fetch_squad(client: &UrcClient, club_id: &str) -> Result<Value, FetchError> {
    client.get_operation(
        SQUAD_OPERATION,
        json!({ "currentClub": [club_id] }),
        SQUAD_QUERY_HASH,
    )
}

/// Roster detail record, as much of it as the squad payload carries.
#[derive(Debug, Clone, Serialize)]
pub struct SquadPlayer {
    pub player_id: u64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub position: Option<String>,
    pub age: Option<u32>,
    pub nationality: Option<String>,
}

impl SquadPlayer {
    pub fn full_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("");
        let last = self.last_name.as_deref().unwrap_or("");
        format!("{first} {last}").trim().to_string()
    }
}

#[derive(Debug, Deserialize)]
struct SquadResponse {
    #[serde(default)]
    data: Option<SquadData>,
}

#[derive(Debug, Deserialize)]
struct SquadData {
    #[serde(rename = "playerThemeSettings", default)]
    player_theme_settings: Option<ThemeSettings>,
}

#[derive(Debug, Deserialize)]
struct ThemeSettings {
    #[serde(default)]
    squads: Vec<SquadGroup>,
}

#[derive(Debug, Deserialize)]
struct SquadGroup {
    #[serde(default)]
    squad: Vec<RosterEntry>,
}

#[derive(Debug, Deserialize)]
struct RosterEntry {
    #[serde(rename = "playerId", default)]
    player_id: Option<u64>,
    #[serde(rename = "playerFirstName", default)]
    first_name: Option<String>,
    #[serde(rename = "playerLastName", default)]
    last_name: Option<String>,
    #[serde(rename = "playerPosition", default)]
    position: Option<String>,
    #[serde(rename = "playerAge", default)]
    age: Option<u32>,
    #[serde(rename = "nationalTeam", default)]
    nationality: Option<String>,
}

fn parse_squad(raw: &Value) -> Vec<SquadPlayer> {
    let parsed: SquadResponse = match serde_json::from_value(raw.clone()) {
        Ok(parsed) => parsed,
        Err(err) => {
            error!(%err, "failed to parse squad response");
            return Vec::new();
        }
    };
    parsed
        .data
        .and_then(|d| d.player_theme_settings)
        .map(|settings| {
            settings
                .squads
                .into_iter()
                .flat_map(|group| group.squad)
                // Entries without an id cannot be fetched; drop them.
                .filter_map(|entry| {
                    let player_id = entry.player_id?;
                    Some(SquadPlayer {
                        player_id,
                        first_name: entry.first_name,
                        last_name: entry.last_name,
                        position: entry.position,
                        age: entry.age,
                        nationality: entry.nationality,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// `(player_id, display name)` pairs for batch processing.
pub fn extract_player_ids(raw: &Value) -> Vec<(u64, String)> {
    parse_squad(raw)
        .into_iter()
        .map(|player| {
            let name = player.full_name();
            (player.player_id, name)
        })
        .collect()
}

/// Full detail records; the batch coordinator uses these for position lookup.
pub fn extract_squad_details(raw: &Value) -> Vec<SquadPlayer> {
    parse_squad(raw)
}
