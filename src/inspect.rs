//! Read-only queries against a built store.

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::error::Result;
use crate::storage::row_count;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub name: String,
    /// `table` or `view`
    pub kind: String,
    pub rows: u64,
}

/// First and last game date of a league, from home team performances
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeagueSpan {
    pub league_id: Option<String>,
    pub name: Option<String>,
    pub first_date: i64,
    pub last_date: i64,
    pub games: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameAppearance {
    pub person_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub team_id: Option<String>,
    pub appearance_type_id: String,
    pub type_name: Option<String>,
    pub category: Option<String>,
}

pub fn list_tables(conn: &Connection) -> Result<Vec<TableSummary>> {
    let mut stmt = conn.prepare(
        "SELECT name, type FROM sqlite_master \
         WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' \
         ORDER BY name",
    )?;
    let entries = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    entries
        .into_iter()
        .map(|(name, kind)| {
            let rows = row_count(conn, &name)?;
            Ok(TableSummary { name, kind, rows })
        })
        .collect()
}

pub fn league_spans(conn: &Connection) -> Result<Vec<LeagueSpan>> {
    let mut stmt = conn.prepare(
        "SELECT tp.league_id, l.name, MIN(g.date), MAX(g.date), COUNT(*) \
         FROM team_performance tp \
         JOIN game g ON g.game_id = tp.game_id \
         LEFT JOIN league l ON l.league_id = tp.league_id \
         WHERE tp.home = 1 \
         GROUP BY tp.league_id \
         ORDER BY MIN(g.date), tp.league_id",
    )?;
    let spans = stmt
        .query_map([], |row| {
            Ok(LeagueSpan {
                league_id: row.get(0)?,
                name: row.get(1)?,
                first_date: row.get(2)?,
                last_date: row.get(3)?,
                games: row.get::<_, i64>(4)? as u64,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(spans)
}

/// Everyone who appeared in one game, ordered by team then appearance type
pub fn game_appearances(conn: &Connection, game_id: &str) -> Result<Vec<GameAppearance>> {
    let mut stmt = conn.prepare(
        "SELECT pa.person_id, p.first_name, p.last_name, pa.team_id, \
                pa.appearance_type_id, ty.name, ty.category \
         FROM person_appearance pa \
         LEFT JOIN person p ON p.person_id = pa.person_id \
         LEFT JOIN appearance_type ty ON ty.appearance_type_id = pa.appearance_type_id \
         WHERE pa.game_id = ?1 \
         ORDER BY pa.team_id, pa.appearance_type_id, pa.person_id",
    )?;
    let appearances = stmt
        .query_map(params![game_id], |row| {
            Ok(GameAppearance {
                person_id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
                team_id: row.get(3)?,
                appearance_type_id: row.get(4)?,
                type_name: row.get(5)?,
                category: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(appearances)
}
