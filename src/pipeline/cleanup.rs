//! Post-build verification and staging removal.

use std::collections::{HashMap, HashSet};

use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::constants::LEGACY_STAGING_TABLES;
use crate::error::{BuildError, Result};
use crate::loader::Staging;
use crate::pipeline::transform::NormalizedSet;
use crate::storage::Store;

/// Games the store must account for after a build
#[derive(Debug, Clone, Default)]
pub struct ExpectedGames {
    pub ids: Vec<String>,
    /// Games with at least one filled role
    pub with_appearances: HashSet<String>,
}

impl ExpectedGames {
    pub fn from_set(set: &NormalizedSet) -> Self {
        let mut seen = HashSet::new();
        let ids = set
            .games
            .iter()
            .filter(|g| seen.insert(g.game_id.as_str()))
            .map(|g| g.game_id.clone())
            .collect();
        let with_appearances = set
            .person_appearances
            .iter()
            .map(|a| a.game_id.clone())
            .collect();
        Self { ids, with_appearances }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub games_checked: usize,
    pub missing_games: Vec<String>,
    /// Games without exactly one home and one visiting performance
    pub unpaired_performances: Vec<String>,
    pub missing_appearances: Vec<String>,
}

impl Verification {
    pub fn is_ok(&self) -> bool {
        self.missing_games.is_empty()
            && self.unpaired_performances.is_empty()
            && self.missing_appearances.is_empty()
    }

    fn describe(&self) -> String {
        let mut parts = Vec::new();
        for (label, ids) in [
            ("missing game rows", &self.missing_games),
            ("unpaired team performances", &self.unpaired_performances),
            ("games without appearances", &self.missing_appearances),
        ] {
            if let Some(first) = ids.first() {
                parts.push(format!("{} {} (first: {})", ids.len(), label, first));
            }
        }
        parts.join("; ")
    }
}

fn string_set(conn: &Connection, sql: &str) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<HashSet<_>, _>>()?;
    Ok(rows)
}

/// (home, visiting) performance counts per game
fn performance_sides(conn: &Connection) -> Result<HashMap<String, (i64, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT game_id, SUM(CASE WHEN home THEN 1 ELSE 0 END), \
         SUM(CASE WHEN home THEN 0 ELSE 1 END) \
         FROM team_performance GROUP BY game_id",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, (row.get(1)?, row.get(2)?))))?
        .collect::<std::result::Result<HashMap<_, _>, _>>()?;
    Ok(rows)
}

/// Check every expected game against the store
#[instrument(skip(conn, expected), fields(games = expected.ids.len()))]
pub fn verify(conn: &Connection, expected: &ExpectedGames) -> Result<Verification> {
    let games = string_set(conn, "SELECT game_id FROM game")?;
    let appearances = string_set(conn, "SELECT DISTINCT game_id FROM person_appearance")?;
    let sides = performance_sides(conn)?;

    let mut verification = Verification {
        games_checked: expected.ids.len(),
        ..Verification::default()
    };
    for game_id in &expected.ids {
        if !games.contains(game_id) {
            verification.missing_games.push(game_id.clone());
        }
        if sides.get(game_id) != Some(&(1, 1)) {
            verification.unpaired_performances.push(game_id.clone());
        }
        if expected.with_appearances.contains(game_id) && !appearances.contains(game_id) {
            verification.missing_appearances.push(game_id.clone());
        }
    }

    if verification.is_ok() {
        info!(games = verification.games_checked, "Verification passed");
    } else {
        warn!(details = %verification.describe(), "Verification failed");
    }
    Ok(verification)
}

/// Verify an existing store without its sources: every stored game must
/// have its pair of team performances.
pub fn verify_store(conn: &Connection) -> Result<Verification> {
    let mut ids: Vec<String> = string_set(conn, "SELECT game_id FROM game")?.into_iter().collect();
    ids.sort();
    verify(
        conn,
        &ExpectedGames {
            ids,
            with_appearances: HashSet::new(),
        },
    )
}

/// Discard staging once the build verified. Legacy staging tables left in
/// the store by older builds are dropped too when `drop_legacy` is set.
/// Returns the legacy tables dropped.
#[instrument(skip(store, staging, verification))]
pub fn cleanup(
    store: &Store,
    staging: Staging,
    verification: &Verification,
    drop_legacy: bool,
) -> Result<Vec<String>> {
    if !verification.is_ok() {
        return Err(BuildError::Verification(verification.describe()));
    }

    let staged_rows: usize = staging.tables().iter().map(|t| t.len()).sum();
    drop(staging);
    debug!(rows = staged_rows, "Discarded staged extracts");

    let mut dropped = Vec::new();
    if drop_legacy {
        for table in LEGACY_STAGING_TABLES {
            if store.drop_table_if_exists(table)? {
                info!(table, "Dropped legacy staging table");
                dropped.push(table.to_string());
            }
        }
    }
    Ok(dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    fn store_with_games() -> Store {
        let store = Store::open_in_memory().unwrap();
        schema::declare(store.connection()).unwrap();
        store.set_foreign_keys(false).unwrap();
        store
            .connection()
            .execute_batch(
                "INSERT INTO game (game_id, date, number_of_game) VALUES ('g1', 18710504, 0);
                 INSERT INTO game (game_id, date, number_of_game) VALUES ('g2', 18710505, 0);
                 INSERT INTO team_performance (team_id, game_id, home) VALUES ('CL1', 'g1', 1);
                 INSERT INTO team_performance (team_id, game_id, home) VALUES ('FW1', 'g1', 0);
                 INSERT INTO team_performance (team_id, game_id, home) VALUES ('BS1', 'g2', 1);
                 INSERT INTO person_appearance (person_id, team_id, game_id, appearance_type_id)
                     VALUES ('whiteb01', 'CL1', 'g1', 'AWP');",
            )
            .unwrap();
        store
    }

    #[test]
    fn test_verify_reports_each_kind_of_gap() {
        let store = store_with_games();
        let expected = ExpectedGames {
            ids: vec!["g1".into(), "g2".into(), "g3".into()],
            with_appearances: ["g1".to_string(), "g2".to_string()].into_iter().collect(),
        };

        let verification = verify(store.connection(), &expected).unwrap();
        assert_eq!(verification.games_checked, 3);
        assert_eq!(verification.missing_games, vec!["g3"]);
        assert_eq!(verification.unpaired_performances, vec!["g2", "g3"]);
        assert_eq!(verification.missing_appearances, vec!["g2"]);
        assert!(!verification.is_ok());
    }

    #[test]
    fn test_verify_store_checks_pairs_only() {
        let store = store_with_games();
        let verification = verify_store(store.connection()).unwrap();
        assert_eq!(verification.games_checked, 2);
        assert_eq!(verification.unpaired_performances, vec!["g2"]);
        assert!(verification.missing_appearances.is_empty());
    }

    #[test]
    fn test_failed_verification_keeps_legacy_tables() {
        let store = store_with_games();
        store.connection().execute_batch("CREATE TABLE game_log (x TEXT);").unwrap();
        let staging = crate::loader::tests::empty_staging();
        let failed = Verification {
            missing_games: vec!["g9".into()],
            ..Verification::default()
        };

        let err = cleanup(&store, staging, &failed, true).unwrap_err();
        assert!(matches!(err, BuildError::Verification(_)));
        assert!(store.table_exists("game_log").unwrap());
    }

    #[test]
    fn test_cleanup_drops_legacy_tables() {
        let store = store_with_games();
        store
            .connection()
            .execute_batch("CREATE TABLE game_log (x TEXT); CREATE TABLE park_codes (x TEXT);")
            .unwrap();
        let staging = crate::loader::tests::empty_staging();

        let dropped = cleanup(&store, staging, &Verification::default(), true).unwrap();
        assert!(dropped.contains(&"game_log".to_string()));
        assert!(dropped.contains(&"park_codes".to_string()));
        assert!(!store.table_exists("game_log").unwrap());
    }
}
