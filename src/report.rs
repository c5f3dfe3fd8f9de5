//! Human readable reports of the api responses.
//!
//! Each function performs the requests of one command line command through a
//! [`Requester`] and renders the result as lines of text. Maps are sorted by
//! key so the output is stable.

use std::collections::BTreeMap;

use log::debug;
use wdapi::wd::{ApiError, ApiTime, Battles, BattlePrim, PlaceId, Requester};

fn sorted<V>(map: impl IntoIterator<Item = (String, V)>) -> BTreeMap<String, V> {
    map.into_iter().collect()
}

fn side(prim: &BattlePrim) -> String {
    format!("{} ({})", prim.name, prim.team)
}

fn battle_line(
    when: &impl ApiTime,
    attacker: &BattlePrim,
    defender: &BattlePrim,
    place_id: &PlaceId,
    percent: f64,
) -> String {
    format!(
        "{} {} vs {} at {} ({}), {:.1}% destroyed",
        when.age(),
        side(attacker),
        side(defender),
        place_id,
        defender.primarch,
        percent
    )
}

/// Teams of each alliance.
pub async fn alliances<R: Requester>(requester: &R) -> Result<Vec<String>, ApiError> {
    let alliances = requester.alliances().await?;

    Ok(sorted(alliances.alliances)
        .into_iter()
        .map(|(name, teams)| format!("{}: {}", name, teams.join(", ")))
        .collect())
}

/// Castles of a kingdom.
pub async fn castles<R: Requester>(
    requester: &R,
    kingdom_id: i64,
    realm_name: &str,
) -> Result<Vec<String>, ApiError> {
    let castles = requester.castles_macro(kingdom_id, realm_name).await?;

    Ok(sorted(castles.castles)
        .into_iter()
        .map(|(id, castle)| format!("{} {}", id, castle))
        .collect())
}

/// Detailed state of castles, with their defenders.
pub async fn castle_info<R: Requester>(
    requester: &R,
    castle_ids: &[String],
) -> Result<Vec<String>, ApiError> {
    let castles = requester.castle_info(castle_ids).await?;

    let mut lines = vec![];
    for (id, castle) in sorted(castles) {
        let last_battle = castle
            .last_battle
            .map(|t| t.age())
            .unwrap_or_else(|| "never".to_string());
        lines.push(format!(
            "{} {:?} level={} owner={} [{}] last battle {}",
            id,
            castle.custom_name,
            castle.level,
            castle.owner_team,
            castle.owner_alliance,
            last_battle
        ));
        for (_, fleet) in sorted(castle.fleets) {
            lines.push(format!("  {} ({})", fleet.primarch(), fleet.team_name));
        }
    }
    Ok(lines)
}

/// Teams of a kingdom with their capital.
pub async fn teams<R: Requester>(
    requester: &R,
    kingdom_id: i64,
    realm_name: &str,
) -> Result<Vec<String>, ApiError> {
    let teams = requester.teams_macro(kingdom_id, realm_name).await?;
    let capitals = teams.capitals(kingdom_id)?;

    let mut names = teams.team_names();
    names.sort();
    Ok(names
        .into_iter()
        .map(|name| match capitals.get(name) {
            Some(capital) => format!("{} capital={}", name, capital),
            None => format!("{} capital=none", name),
        })
        .collect())
}

/// Alliance and roster of teams.
pub async fn teams_metadata<R: Requester>(
    requester: &R,
    kingdom_id: i64,
    realm_name: &str,
    team_names: &[String],
) -> Result<Vec<String>, ApiError> {
    let metadata = requester
        .teams_metadata(kingdom_id, realm_name, team_names)
        .await?;

    let mut lines = vec![];
    for (name, team) in sorted(metadata.teams) {
        lines.push(format!("{} [{}] {} players", name, team.alliance, team.roster.len()));
        lines.extend(team.roster.iter().map(|p| format!("  {}", p)));
    }
    Ok(lines)
}

/// Kills of teams for the current month.
pub async fn monthly_kills<R: Requester>(
    requester: &R,
    team_names: &[String],
) -> Result<Vec<String>, ApiError> {
    let kills = requester.monthly_kill_count(team_names).await?;

    Ok(sorted(kills.teams)
        .into_iter()
        .map(|(name, team)| format!("{}: {} kills", name, team.total_kills))
        .collect())
}

/// Event scores of a player.
pub async fn event_score<R: Requester>(
    requester: &R,
    api_key: &str,
) -> Result<Vec<String>, ApiError> {
    let score = requester.event_score(api_key).await?;

    Ok(sorted(score.events)
        .into_values()
        .map(|e| {
            format!(
                "{} {} ({}): {}",
                e.details.event_type, e.player_name, e.team_name, e.score
            )
        })
        .collect())
}

/// Monthly contribution of each team member.
pub async fn contribution<R: Requester>(
    requester: &R,
    api_key: &str,
) -> Result<Vec<String>, ApiError> {
    let contribution = requester.contribution(api_key).await?;

    Ok(contribution
        .entries
        .iter()
        .map(|e| {
            format!(
                "{}: gold={} mats={} troops={}",
                e.player_name, e.stats.monthly_gold, e.stats.monthly_mats, e.stats.monthly_troops
            )
        })
        .collect())
}

/// Troops of the team of a player.
pub async fn troop_count<R: Requester>(
    requester: &R,
    api_key: &str,
) -> Result<Vec<String>, ApiError> {
    let troops = requester.troop_count(api_key).await?;

    Ok(sorted(troops.troop_count)
        .into_iter()
        .map(|(name, team)| {
            format!(
                "{}: {} troops, {} members",
                name,
                team.total,
                team.members.len()
            )
        })
        .collect())
}

/// One page of battle reports.
pub async fn battles<R: Requester>(
    requester: &R,
    api_key: &str,
    cursor: &str,
) -> Result<Vec<String>, ApiError> {
    let battles = requester.battles(api_key, cursor).await?;

    let mut lines: Vec<String> = match &battles {
        Battles::V1(b) => b
            .reports
            .iter()
            .map(|r| {
                battle_line(
                    &r.timestamp,
                    &r.attacker,
                    &r.defender,
                    &r.place_id,
                    r.percent_destroyed,
                )
            })
            .collect(),
        Battles::V2(b) => b
            .reports
            .iter()
            .map(|r| {
                battle_line(
                    &r.timestamp,
                    &r.attacker,
                    &r.defender,
                    &r.place_id,
                    r.percent_destroyed,
                )
            })
            .collect(),
    };
    if battles.more() {
        lines.push(format!("next cursor: {}", battles.cursor()));
    }
    Ok(lines)
}

/// Castles owned by each team of a kingdom.
///
/// Castles and teams are requested concurrently.
pub async fn kingdom<R: Requester>(
    requester: &R,
    kingdom_id: i64,
    realm_name: &str,
) -> Result<Vec<String>, ApiError> {
    let (castles, teams) = futures::try_join!(
        requester.castles_macro(kingdom_id, realm_name),
        requester.teams_macro(kingdom_id, realm_name)
    )?;
    let capitals = teams.capitals(kingdom_id)?;

    let mut owned: BTreeMap<&str, usize> = teams.team_names().into_iter().map(|t| (t, 0)).collect();
    for castle in castles.castles.values() {
        match owned.get_mut(castle.owner_team.as_str()) {
            Some(count) => *count += 1,
            None => debug!("castle owner {} is not in the team list", castle.owner_team),
        }
    }

    Ok(owned
        .into_iter()
        .map(|(team, count)| {
            let capital = capitals.get(team).map(String::as_str).unwrap_or("none");
            format!("{}: {} castles, capital={}", team, count, capital)
        })
        .collect())
}
