mod common;

use baseball_db::schema::Entity;
use baseball_db::{BuildError, IntegrityMode};
use common::{count, Fixture, GameRow};

#[test]
fn test_game_id_and_performance_pair() {
    let fixture = Fixture::new(&[GameRow::new("18710504", "0")]);
    let report = fixture.build(IntegrityMode::Strict).unwrap();
    assert_eq!(report.table("game").unwrap().inserted, 1);

    let store = fixture.open_store();
    assert_eq!(count(&store, "game", "game_id = '18710504CL10'"), 1);
    assert_eq!(count(&store, "team_performance", "game_id = '18710504CL10'"), 2);

    let (day, park): (bool, String) = store
        .connection()
        .query_row("SELECT day, park_id FROM game WHERE game_id = '18710504CL10'", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap();
    assert!(day);
    assert_eq!(park, "FOR01");

    let sides: Vec<(String, bool, i64, i64)> = {
        let mut stmt = store
            .connection()
            .prepare("SELECT team_id, home, score, hits FROM team_performance ORDER BY home DESC")
            .unwrap();
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        rows
    };
    assert_eq!(
        sides,
        vec![("CL1".to_string(), true, 5, 10), ("FW1".to_string(), false, 3, 8)]
    );
}

#[test]
fn test_winning_pitcher_credited_to_home_winner() {
    let fixture = Fixture::new(&[GameRow::new("18710504", "0")]);
    fixture.build(IntegrityMode::Strict).unwrap();

    let store = fixture.open_store();
    assert_eq!(
        count(
            &store,
            "person_appearance",
            "person_id = 'whiteb01' AND team_id = 'CL1' AND game_id = '18710504CL10' \
             AND appearance_type_id = 'AWP'"
        ),
        1
    );
    assert_eq!(
        count(
            &store,
            "person_appearance",
            "person_id = 'mathb01' AND team_id = 'FW1' AND appearance_type_id = 'ALP'"
        ),
        1
    );
    assert_eq!(count(&store, "person_appearance", "1 = 1"), 11);
}

#[test]
fn test_missing_umpire_emits_no_row() {
    let fixture = Fixture::new(&[
        GameRow::new("18710504", "0"),
        GameRow::new("18710505", "0").set("hp_umpire_id", ""),
    ]);
    fixture.build(IntegrityMode::Strict).unwrap();

    let store = fixture.open_store();
    assert_eq!(count(&store, "person_appearance", "appearance_type_id = 'UHP'"), 1);
    assert_eq!(
        count(
            &store,
            "person_appearance",
            "game_id = '18710505CL10' AND appearance_type_id = 'UHP'"
        ),
        0
    );
    assert_eq!(
        count(&store, "person_appearance", "appearance_type_id = 'UHP' AND team_id IS NULL"),
        1
    );
}

#[test]
fn test_tie_credits_home_team_once() {
    let fixture = Fixture::new(&[GameRow::new("18710520", "0")
        .set("h_score", "4")
        .set("v_score", "4")]);
    fixture.build(IntegrityMode::Strict).unwrap();

    let store = fixture.open_store();
    assert_eq!(count(&store, "person_appearance", "appearance_type_id = 'AWP'"), 1);
    assert_eq!(
        count(&store, "person_appearance", "appearance_type_id = 'AWP' AND team_id = 'CL1'"),
        1
    );
    assert_eq!(
        count(&store, "person_appearance", "appearance_type_id = 'ALP' AND team_id = 'FW1'"),
        1
    );
}

#[test]
fn test_visitor_win_and_defense_codes() {
    let fixture = Fixture::new(&[GameRow::new("18710506", "2")
        .set("h_score", "1")
        .set("v_score", "9")
        .set("winning_pitcher_id", "mathb01")
        .set("losing_pitcher_id", "prata101")
        .set("h_player_2_id", "allie101")]);
    fixture.build(IntegrityMode::Strict).unwrap();

    let store = fixture.open_store();
    let credited = |person: &str, team: &str, code: &str| {
        count(
            &store,
            "person_appearance",
            &format!(
                "game_id = '18710506CL12' AND person_id = '{person}' AND team_id = '{team}' \
                 AND appearance_type_id = '{code}'"
            ),
        )
    };
    assert_eq!(credited("mathb01", "FW1", "AWP"), 1);
    assert_eq!(credited("prata101", "CL1", "ALP"), 1);
    // `7.0` in the position column reads as left field
    assert_eq!(
        count(&store, "person_appearance", "person_id = 'carlj102' AND appearance_type_id = 'D7'"),
        1
    );
    // No recorded position: the batting slot still counts, the defense row does not
    assert_eq!(
        count(&store, "person_appearance", "person_id = 'allie101' AND appearance_type_id = 'O2'"),
        1
    );
    assert_eq!(
        count(
            &store,
            "person_appearance",
            "person_id = 'allie101' AND appearance_type_id LIKE 'D%'"
        ),
        0
    );
}

#[test]
fn test_visitor_win_credits_save_and_winning_rbi_to_visitors() {
    let fixture = Fixture::new(&[GameRow::new("18710507", "0")
        .set("h_score", "2")
        .set("v_score", "6")
        .set("winning_pitcher_id", "mathb01")
        .set("losing_pitcher_id", "prata101")
        .set("saving_pitcher_id", "lennb101")
        .set("winning_rbi_batter_id", "carlj102")
        .set("2b_umpire_id", "mcdej101")]);
    fixture.build(IntegrityMode::Strict).unwrap();

    let store = fixture.open_store();
    let mut stmt = store
        .connection()
        .prepare(
            "SELECT person_id, team_id, appearance_type_id FROM person_appearance \
             WHERE appearance_type_id IN ('ASP', 'AWB', 'U2B') ORDER BY appearance_type_id",
        )
        .unwrap();
    let rows: Vec<(String, Option<String>, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        rows,
        vec![
            ("lennb101".to_string(), Some("FW1".to_string()), "ASP".to_string()),
            ("carlj102".to_string(), Some("FW1".to_string()), "AWB".to_string()),
            ("mcdej101".to_string(), None, "U2B".to_string()),
        ]
    );
}

#[test]
fn test_unreadable_attendance_is_stored_as_null() {
    let fixture = Fixture::new(&[
        GameRow::new("18710504", "0"),
        GameRow::new("18710505", "0")
            .set("attendance", "unknown")
            .set("h_hits", "x"),
    ]);
    let report = fixture.build(IntegrityMode::Strict).unwrap();
    assert_eq!(report.table("game").unwrap().inserted, 2);

    let store = fixture.open_store();
    assert_eq!(
        count(&store, "game", "game_id = '18710505CL10' AND attendance IS NULL"),
        1
    );
    assert_eq!(
        count(
            &store,
            "team_performance",
            "game_id = '18710505CL10' AND home = 1 AND hits IS NULL AND score = 5"
        ),
        1
    );
}

#[test]
fn test_second_run_changes_nothing() {
    let fixture = Fixture::new(&[GameRow::new("18710504", "0"), GameRow::new("18710505", "0")]);
    let first = fixture.build(IntegrityMode::Strict).unwrap();
    let counts_after_first: Vec<u64> = {
        let store = fixture.open_store();
        Entity::ALL
            .iter()
            .map(|e| store.row_count(e.table_name()).unwrap())
            .collect()
    };

    let second = fixture.build(IntegrityMode::Strict).unwrap();
    let store = fixture.open_store();
    let counts_after_second: Vec<u64> = Entity::ALL
        .iter()
        .map(|e| store.row_count(e.table_name()).unwrap())
        .collect();

    assert_eq!(counts_after_first, counts_after_second);
    assert!(first.total_inserted() > 0);
    assert_eq!(second.total_inserted(), 0);
    assert_eq!(second.total_skipped(), first.total_inserted());
    assert_eq!(second.schema.unchanged.len(), 8);
}

#[test]
fn test_appearance_tuples_are_unique() {
    // The same person holds two roles, and the game is listed twice.
    let game = GameRow::new("18710504", "0").set("h_starting_pitcher_id", "whiteb01");
    let fixture = Fixture::new(&[game.clone(), game]);
    let report = fixture.build(IntegrityMode::Strict).unwrap();
    assert_eq!(
        report.table("game").unwrap(),
        baseball_db::storage::InsertCounts {
            inserted: 1,
            skipped: 1
        }
    );

    let store = fixture.open_store();
    let (total, distinct): (i64, i64) = store
        .connection()
        .query_row(
            "SELECT COUNT(*), COUNT(DISTINCT person_id || '|' || COALESCE(team_id, '') \
             || '|' || game_id || '|' || appearance_type_id) FROM person_appearance",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(total, distinct);
    assert_eq!(count(&store, "person_appearance", "person_id = 'whiteb01'"), 4);
}

#[test]
fn test_strict_integrity_rolls_back_everything() {
    let fixture =
        Fixture::new(&[GameRow::new("18710504", "0").set("winning_pitcher_id", "ghost01")]);

    let err = fixture.build(IntegrityMode::Strict).unwrap_err();
    match err {
        BuildError::Integrity { count, first } => {
            assert_eq!(count, 1);
            assert!(first.contains("person_appearance"), "{first}");
        }
        other => panic!("unexpected error: {other}"),
    }

    let store = fixture.open_store();
    for entity in Entity::ALL {
        let table = entity.table_name();
        assert_eq!(store.row_count(table).unwrap(), 0, "{table}");
    }
}

#[test]
fn test_advisory_integrity_reports_violations() {
    let fixture =
        Fixture::new(&[GameRow::new("18710504", "0").set("winning_pitcher_id", "ghost01")]);

    let report = fixture.build(IntegrityMode::Advisory).unwrap();
    assert_eq!(report.integrity_violations.len(), 1);
    assert_eq!(report.integrity_violations[0].table, "person_appearance");
    assert_eq!(report.integrity_violations[0].parent, "person");

    let store = fixture.open_store();
    assert_eq!(store.row_count("game").unwrap(), 1);
    assert_eq!(count(&store, "person_appearance", "person_id = 'ghost01'"), 1);
}

#[test]
fn test_missing_source_is_fatal_before_any_write() {
    let fixture = Fixture::new(&[GameRow::new("18710504", "0")]);
    std::fs::remove_file(fixture.paths().teams).unwrap();

    let err = fixture.build(IntegrityMode::Strict).unwrap_err();
    assert!(matches!(err, BuildError::SourceRead { .. }));

    let store = fixture.open_store();
    assert!(!store.table_exists("game").unwrap());
}

#[test]
fn test_legacy_staging_tables_are_dropped() {
    let fixture = Fixture::new(&[GameRow::new("18710504", "0")]);
    fixture
        .open_store()
        .connection()
        .execute_batch(
            "CREATE TABLE game_log (date INTEGER); CREATE TABLE team_codes (team_id TEXT);",
        )
        .unwrap();

    let report = fixture.build(IntegrityMode::Strict).unwrap();
    assert_eq!(report.legacy_tables_dropped, vec!["game_log", "team_codes"]);
    assert!(report.verification.is_ok());

    let store = fixture.open_store();
    assert!(!store.table_exists("game_log").unwrap());
    assert!(!store.table_exists("team_codes").unwrap());
}
