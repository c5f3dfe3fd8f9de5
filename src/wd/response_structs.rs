//! Response structures for War Dragons API endpoints.
//!
//! This module contains structures for deserializing JSON responses from the
//! War Dragons server. Responses wrapped in an envelope carry optional `error`
//! and `error_code` fields, see [`EmbeddedError`].
//!
//! Endpoints whose schema changed between api versions are modeled as enums
//! with one variant per version ([`Battles`], [`TeamsMacro`]).

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

use crate::wd::lenient;
use crate::wd::place_id::{IdError, PlaceId, ensure_kridx};
use crate::wd::structs::{Coords, Primarch};
use crate::wd::time::{Epoch, PgTimestamp};
use crate::wd::ApiError;

/// Application level error reported inside a successful HTTP response.
pub trait EmbeddedError {
    /// Value of the `error` field, if any.
    fn error_message(&self) -> Option<&str>;
    /// Value of the `error_code` field, if any.
    fn error_code(&self) -> Option<i64>;

    /// Converts an embedded error into [`ApiError::Upstream`].
    ///
    /// A response is in error when its `error` field is not empty or its
    /// `error_code` is not zero.
    fn check(self) -> Result<Self, ApiError>
    where
        Self: Sized,
    {
        let message = self.error_message().filter(|m| !m.is_empty());
        let code = self.error_code().filter(|c| *c != 0);
        if message.is_none() && code.is_none() {
            return Ok(self);
        }

        Err(ApiError::Upstream {
            message: message.unwrap_or_default().to_string(),
            code: code.unwrap_or_default(),
        })
    }
}

macro_rules! embedded_error {
    ($($response:ty),+ $(,)?) => {
        $(
            impl EmbeddedError for $response {
                fn error_message(&self) -> Option<&str> {
                    self.error.as_deref()
                }

                fn error_code(&self) -> Option<i64> {
                    self.error_code
                }
            }
        )+
    };
}

embedded_error!(
    ErrorEnvelope,
    Alliances,
    CastlesMacro,
    EventScore,
    Contribution,
    TroopCount,
    BattlesV1,
    BattlesV2,
    TeamsMacroV1,
    TeamsMacroV2,
    TeamsMetadata,
    MonthlyKills,
);

/// Error fields of a response whose payload is not an envelope.
///
/// `/castle_info` answers with a bare map of castles, or with this object
/// when the server rejects the request.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ErrorEnvelope {
    pub error: Option<String>,
    #[serde(deserialize_with = "lenient::option_integer")]
    pub error_code: Option<i64>,
}

/// Response from `/atlas/alliances/teams`.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Alliances {
    pub timestamp: Option<Epoch>,
    pub error: Option<String>,
    #[serde(deserialize_with = "lenient::option_integer")]
    pub error_code: Option<i64>,
    /// Team names of each alliance
    pub alliances: HashMap<String, Vec<String>>,
}

/// Response from `/atlas/castles/metadata/macro`.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct CastlesMacro {
    pub error: Option<String>,
    #[serde(deserialize_with = "lenient::option_integer")]
    pub error_code: Option<i64>,
    /// Castles keyed by their identifier, KRIDX once returned by the requester
    #[serde(rename = "castle")]
    pub castles: HashMap<String, Castle>,
}

/// Castle summary from `/atlas/castles/metadata/macro`.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Castle {
    pub owner_team: String,
    pub coords: Coords,
    #[serde(deserialize_with = "lenient::integer")]
    pub level: i64,
}

impl fmt::Display for Castle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "level={}, owner_team={}, coords={}",
            self.level, self.owner_team, self.coords
        )
    }
}

/// Detailed castle state from `/castle_info`.
#[derive(Deserialize, Debug, Clone)]
pub struct CastleInfo {
    pub place_id: PlaceId,
    /// Primarchs defending the castle
    #[serde(default)]
    pub fleets: HashMap<String, Prim>,
    #[serde(default, rename = "last_battle_ts")]
    pub last_battle: Option<Epoch>,
    #[serde(default, rename = "infra")]
    pub infrastructure: Infra,
    #[serde(default)]
    pub last_unlocked_ts: Option<Epoch>,
    #[serde(default)]
    pub owner_team: String,
    #[serde(default)]
    pub custom_name: String,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub level: i64,
    #[serde(default)]
    pub owned_since_epoch: Option<Epoch>,
    #[serde(default)]
    pub owner_alliance: String,
    #[serde(default)]
    pub last_renamed_ts: Option<Epoch>,
}

/// Buildings of a castle.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Infra {
    pub online_epoch: Option<Epoch>,
    pub auto_upkeep: bool,
    pub upkeep_epoch: Option<Epoch>,
    pub epoch_updated: Option<Epoch>,
    #[serde(rename = "hq")]
    pub headquarters: Infrastructure,
    pub refinery: Infrastructure,
    pub bank: Infrastructure,
    pub port: Port,
    pub fort: Fort,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Infrastructure {
    pub upgrade_epoch: Option<Epoch>,
    #[serde(deserialize_with = "lenient::integer")]
    pub storage_level: i64,
    pub executor: Executor,
    #[serde(deserialize_with = "lenient::integer")]
    pub level: i64,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Port {
    pub upgrade_epoch: Option<Epoch>,
    #[serde(deserialize_with = "lenient::integer")]
    pub storage_level: i64,
    pub executor: Executor,
    #[serde(deserialize_with = "lenient::integer")]
    pub level: i64,
    #[serde(deserialize_with = "lenient::integer")]
    pub sludge_cd: i64,
    pub portal_epoch: Option<Epoch>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Fort {
    pub upgrade_epoch: Option<Epoch>,
    #[serde(deserialize_with = "lenient::integer")]
    pub storage_level: i64,
    pub executor: Executor,
    #[serde(deserialize_with = "lenient::integer")]
    pub level: i64,
    #[serde(rename = "shield_ships_lost", deserialize_with = "lenient::number")]
    pub shield_troops_lost: f64,
    pub shield_time_ts: Option<Epoch>,
    #[serde(deserialize_with = "lenient::integer")]
    pub guards_hired_today: i64,
    pub shield_turned_on: bool,
    #[serde(deserialize_with = "lenient::integer")]
    pub day_idx: i64,
}

/// Player appointed to a building.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Executor {
    pub epoch_appointed: Option<Epoch>,
    pub name: String,
}

/// Primarch defending a castle.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Prim {
    #[serde(rename = "PrimarchBuffs", alias = "primarch_buffs")]
    pub primarch_buffs: HashMap<String, Buffs>,
    #[serde(deserialize_with = "lenient::integer")]
    pub taunt_progress: i64,
    pub taunt_epoch: Option<Epoch>,
    pub alliance_name: String,
    #[serde(deserialize_with = "lenient::integer")]
    pub level: i64,
    #[serde(rename = "dtype")]
    pub prim_type: String,
    #[serde(deserialize_with = "lenient::integer")]
    pub total_troops: i64,
    pub blockade_until_epoch: Option<Epoch>,
    #[serde(deserialize_with = "lenient::integer")]
    pub taunt_threshold: i64,
    pub team_name: String,
    pub summon_epoch: Option<Epoch>,
}

impl Prim {
    /// Type and level of the primarch, for display.
    pub fn primarch(&self) -> Primarch {
        Primarch {
            dtype: self.prim_type.clone(),
            level: self.level,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Buffs {
    pub defend: Buff,
    pub attack: Buff,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Buff {
    #[serde(deserialize_with = "lenient::integer")]
    pub amount: i64,
    pub ts: Option<Epoch>,
}

/// Response from `/atlas/player/event/score`.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct EventScore {
    #[serde(rename = "Events", alias = "events")]
    pub events: HashMap<String, SingleEvent>,
    pub error: Option<String>,
    #[serde(deserialize_with = "lenient::option_integer")]
    pub error_code: Option<i64>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct SingleEvent {
    #[serde(deserialize_with = "lenient::integer")]
    pub score: i64,
    pub player_name: String,
    pub team_name: String,
    #[serde(rename = "event")]
    pub details: EventDetails,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct EventDetails {
    #[serde(rename = "start_ts")]
    pub start: Option<Epoch>,
    #[serde(rename = "type")]
    pub event_type: String,
}

/// Response from `/team/contribution`.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Contribution {
    pub ts: Option<Epoch>,
    pub entries: Vec<Entry>,
    pub error: Option<String>,
    #[serde(deserialize_with = "lenient::option_integer")]
    pub error_code: Option<i64>,
}

/// Contribution of one team member.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Entry {
    pub stats: EntryStats,
    #[serde(rename = "for_name")]
    pub player_name: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct EntryStats {
    #[serde(deserialize_with = "lenient::integer")]
    pub monthly_gold: i64,
    #[serde(deserialize_with = "lenient::integer")]
    pub monthly_mats: i64,
    #[serde(rename = "monthly_ships_killed", deserialize_with = "lenient::integer")]
    pub monthly_troops: i64,
    #[serde(rename = "lifetime_ships_killed", deserialize_with = "lenient::integer")]
    pub lifetime_troops: i64,
}

/// Response from `/atlas/team/troop_count`.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct TroopCount {
    pub error: Option<String>,
    #[serde(deserialize_with = "lenient::option_integer")]
    pub error_code: Option<i64>,
    pub timestamp: Option<Epoch>,
    pub troop_count: HashMap<String, TeamTroops>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct TeamTroops {
    #[serde(deserialize_with = "lenient::integer")]
    pub total: i64,
    /// Troops of each member, keyed by player name
    pub members: HashMap<String, i64>,
}

/// Response from `/atlas/team/battles`, one variant per api version.
#[derive(Debug, Clone)]
pub enum Battles {
    V1(BattlesV1),
    V2(BattlesV2),
}

impl Battles {
    /// Cursor to pass to the next request.
    pub fn cursor(&self) -> &str {
        match self {
            Battles::V1(b) => &b.cursor,
            Battles::V2(b) => &b.cursor,
        }
    }

    /// Whether more reports are available after the cursor.
    pub fn more(&self) -> bool {
        match self {
            Battles::V1(b) => b.more,
            Battles::V2(b) => b.more,
        }
    }
}

impl EmbeddedError for Battles {
    fn error_message(&self) -> Option<&str> {
        match self {
            Battles::V1(b) => b.error_message(),
            Battles::V2(b) => b.error_message(),
        }
    }

    fn error_code(&self) -> Option<i64> {
        match self {
            Battles::V1(b) => EmbeddedError::error_code(b),
            Battles::V2(b) => EmbeddedError::error_code(b),
        }
    }
}

/// `api/v1` battles, a single report with a timestamp in seconds.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct BattlesV1 {
    pub cursor: String,
    pub reports: Option<Report>,
    pub more: bool,
    pub error: Option<String>,
    #[serde(deserialize_with = "lenient::option_integer")]
    pub error_code: Option<i64>,
}

/// `api/v2` battles, a list of reports with timestamps in milliseconds.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct BattlesV2 {
    pub cursor: String,
    pub reports: Vec<ReportV2>,
    pub more: bool,
    pub error: Option<String>,
    #[serde(deserialize_with = "lenient::option_integer")]
    pub error_code: Option<i64>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Report {
    pub defender: BattlePrim,
    pub attacker: BattlePrim,
    pub place_id: PlaceId,
    #[serde(rename = "ts")]
    pub timestamp: Epoch,
    #[serde(default, deserialize_with = "lenient::number")]
    pub percent_destroyed: f64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ReportV2 {
    pub defender: BattlePrim,
    pub attacker: BattlePrim,
    pub place_id: PlaceId,
    #[serde(rename = "ts")]
    pub timestamp: PgTimestamp,
    #[serde(default, deserialize_with = "lenient::number")]
    pub percent_destroyed: f64,
}

/// One side of a battle.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct BattlePrim {
    #[serde(rename = "xp_won", deserialize_with = "lenient::integer")]
    pub glory_won: i64,
    pub name: String,
    #[serde(deserialize_with = "lenient::integer")]
    pub level: i64,
    #[serde(rename = "ships")]
    pub troops: Ships,
    pub primarch: Primarch,
    pub team: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Ships {
    #[serde(rename = "init", deserialize_with = "lenient::integer")]
    pub initial: i64,
    #[serde(deserialize_with = "lenient::integer")]
    pub lost: i64,
}

/// Response from `/atlas/teams/metadata/macro`, one variant per api version.
#[derive(Debug, Clone)]
pub enum TeamsMacro {
    V1(TeamsMacroV1),
    V2(TeamsMacroV2),
}

impl TeamsMacro {
    /// Names of the teams in the response.
    pub fn team_names(&self) -> Vec<&str> {
        match self {
            TeamsMacro::V1(t) => t.teams.keys().map(String::as_str).collect(),
            TeamsMacro::V2(t) => t.teams.keys().map(String::as_str).collect(),
        }
    }

    /// Capital of each team owning one, as a KRIDX identifier.
    pub fn capitals(&self, kingdom_id: i64) -> Result<HashMap<String, String>, IdError> {
        let mut capitals = HashMap::new();
        match self {
            TeamsMacro::V1(t) => {
                for (name, team) in &t.teams {
                    if let Some(capital) = team.capital_kridx(kingdom_id)? {
                        capitals.insert(name.clone(), capital);
                    }
                }
            }
            TeamsMacro::V2(t) => {
                for (name, team) in &t.teams {
                    if let Some(capital) = team.capital_kridx() {
                        capitals.insert(name.clone(), capital);
                    }
                }
            }
        }
        Ok(capitals)
    }
}

impl EmbeddedError for TeamsMacro {
    fn error_message(&self) -> Option<&str> {
        match self {
            TeamsMacro::V1(t) => t.error_message(),
            TeamsMacro::V2(t) => t.error_message(),
        }
    }

    fn error_code(&self) -> Option<i64> {
        match self {
            TeamsMacro::V1(t) => EmbeddedError::error_code(t),
            TeamsMacro::V2(t) => EmbeddedError::error_code(t),
        }
    }
}

/// `api/v1` teams, update time in seconds.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct TeamsMacroV1 {
    #[serde(rename = "update_ts")]
    pub timestamp: Option<Epoch>,
    pub teams: HashMap<String, TeamMacroV1>,
    pub error: Option<String>,
    #[serde(deserialize_with = "lenient::option_integer")]
    pub error_code: Option<i64>,
}

/// `api/v2` teams, update time in milliseconds.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct TeamsMacroV2 {
    #[serde(rename = "update_ts")]
    pub timestamp: Option<PgTimestamp>,
    pub teams: HashMap<String, TeamMacroV2>,
    pub error: Option<String>,
    #[serde(deserialize_with = "lenient::option_integer")]
    pub error_code: Option<i64>,
}

/// `api/v1` team summary, the capital is an identifier string.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct TeamMacroV1 {
    #[serde(deserialize_with = "lenient::integer")]
    pub elo: i64,
    pub league_info: League,
    #[serde(deserialize_with = "lenient::integer")]
    pub influence: i64,
    #[serde(deserialize_with = "lenient::integer")]
    pub rank: i64,
    pub activeness: Activity,
    #[serde(deserialize_with = "lenient::integer")]
    pub power_rank: i64,
    pub crest: String,
    /// RIDX or KRIDX identifier of the capital
    pub capital: Option<String>,
}

impl TeamMacroV1 {
    /// Capital of the team as a KRIDX identifier.
    pub fn capital_kridx(&self, kingdom_id: i64) -> Result<Option<String>, IdError> {
        self.capital
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(|c| ensure_kridx(c, kingdom_id))
            .transpose()
    }
}

/// `api/v2` team summary, the capital is a place object.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct TeamMacroV2 {
    #[serde(deserialize_with = "lenient::integer")]
    pub elo: i64,
    pub league_info: League,
    #[serde(deserialize_with = "lenient::integer")]
    pub influence: i64,
    #[serde(deserialize_with = "lenient::integer")]
    pub rank: i64,
    pub activeness: Activity,
    #[serde(deserialize_with = "lenient::integer")]
    pub power_rank: i64,
    pub crest: String,
    pub capital: Option<PlaceId>,
}

impl TeamMacroV2 {
    /// Capital of the team as a KRIDX identifier.
    pub fn capital_kridx(&self) -> Option<String> {
        self.capital.as_ref().map(PlaceId::kridx)
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct League {
    #[serde(deserialize_with = "lenient::integer")]
    pub division_id: i64,
    pub league_id: String,
    pub subleague_id: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Activity {
    #[serde(deserialize_with = "lenient::integer")]
    pub level: i64,
    #[serde(deserialize_with = "lenient::number")]
    pub score: f64,
    pub label: String,
}

/// Response from `/atlas/teams/metadata`.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct TeamsMetadata {
    #[serde(alias = "Teams")]
    pub teams: HashMap<String, TeamMetadata>,
    pub error: Option<String>,
    #[serde(deserialize_with = "lenient::option_integer")]
    pub error_code: Option<i64>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct TeamMetadata {
    pub team_name: String,
    pub alliance: String,
    pub roster: Vec<RosterPlayer>,
    #[serde(rename = "free_passages")]
    pub passages: Vec<String>,
}

/// Member of a team roster.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct RosterPlayer {
    pub player_name: String,
    #[serde(deserialize_with = "lenient::integer")]
    pub level: i64,
}

impl fmt::Display for RosterPlayer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (level {})", self.player_name, self.level)
    }
}

/// Response from `/atlas/teams/monthly_kill_count`.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct MonthlyKills {
    #[serde(rename = "ReqTeams", alias = "req_teams")]
    pub teams: HashMap<String, TeamKills>,
    pub error: Option<String>,
    #[serde(deserialize_with = "lenient::option_integer")]
    pub error_code: Option<i64>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct TeamKills {
    #[serde(rename = "ts")]
    pub timestamp: Option<Epoch>,
    #[serde(deserialize_with = "lenient::integer")]
    pub total_kills: i64,
}
