#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use baseball_db::loader::SourcePaths;
use baseball_db::pipeline::transform::game_log_columns;
use baseball_db::{BuildOptions, BuildReport, IntegrityMode, Pipeline, Result, Store};
use tempfile::TempDir;

pub const PERSONS: &[(&str, &str, &str)] = &[
    ("whiteb01", "Deacon", "White"),
    ("mathb01", "Bobby", "Mathews"),
    ("prata101", "Al", "Pratt"),
    ("lennb101", "Bill", "Lennon"),
    ("paboc101", "Charlie", "Pabor"),
    ("carlj102", "Jim", "Carleton"),
    ("allie101", "Art", "Allison"),
    ("dinnb101", "Bill", "Dinneen"),
    ("mcdej101", "John", "McDermott"),
];

/// One game log row; unset columns are written empty
#[derive(Debug, Clone)]
pub struct GameRow {
    values: Vec<(String, String)>,
}

impl GameRow {
    /// Cleveland at home against Fort Wayne with a full set of roles
    pub fn new(date: &str, number_of_game: &str) -> Self {
        Self { values: Vec::new() }
            .set("date", date)
            .set("number_of_game", number_of_game)
            .set("day_night", "D")
            .set("park_id", "FOR01")
            .set("h_name", "CL1")
            .set("v_name", "FW1")
            .set("h_league", "NL")
            .set("v_league", "NL")
            .set("h_score", "5")
            .set("v_score", "3")
            .set("h_hits", "10")
            .set("v_hits", "8")
            .set("hp_umpire_id", "dinnb101")
            .set("h_manager_id", "paboc101")
            .set("v_manager_id", "lennb101")
            .set("winning_pitcher_id", "whiteb01")
            .set("losing_pitcher_id", "mathb01")
            .set("h_starting_pitcher_id", "prata101")
            .set("v_starting_pitcher_id", "mathb01")
            .set("h_player_1_id", "whiteb01")
            .set("h_player_1_def_pos", "2")
            .set("v_player_1_id", "carlj102")
            .set("v_player_1_def_pos", "7.0")
    }

    pub fn set(mut self, column: &str, value: &str) -> Self {
        self.values.retain(|(c, _)| c != column);
        self.values.push((column.to_string(), value.to_string()));
        self
    }

    fn get(&self, column: &str) -> &str {
        self.values
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }
}

/// Source extracts written to a temporary directory, next to a store path
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new(games: &[GameRow]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let fixture = Self { dir };
        fixture.write_game_log(games);
        fixture.write_references();
        fixture
    }

    pub fn paths(&self) -> SourcePaths {
        SourcePaths::in_dir(self.dir.path())
    }

    pub fn database(&self) -> PathBuf {
        self.dir.path().join("out").join("BB.db")
    }

    pub fn open_store(&self) -> Store {
        Store::open(self.database()).unwrap()
    }

    pub fn build(&self, integrity: IntegrityMode) -> Result<BuildReport> {
        let mut store = self.open_store();
        Pipeline::new(
            &mut store,
            BuildOptions {
                integrity,
                drop_staging: true,
            },
        )
        .run(&self.paths())
    }

    pub fn write_game_log(&self, games: &[GameRow]) {
        let columns = game_log_columns();
        let mut writer = csv::Writer::from_path(self.paths().game_log).unwrap();
        writer.write_record(&columns).unwrap();
        for game in games {
            writer
                .write_record(columns.iter().map(|c| game.get(c)))
                .unwrap();
        }
        writer.flush().unwrap();
    }

    fn write_references(&self) {
        let paths = self.paths();

        let mut persons = String::from("id,first,last\n");
        for (id, first, last) in PERSONS {
            persons.push_str(&format!("{id},{first},{last}\n"));
        }
        write(&paths.persons, &persons);

        write(
            &paths.parks,
            "park_id,name,aka,city,state,notes\n\
             CLE01,National Association Grounds,,Cleveland,OH,\n\
             FOR01,Grand Duchess,,Fort Wayne,IN,\n",
        );
        write(
            &paths.teams,
            "team_id,league,city,nickname,franch_id\n\
             CL1,NA,Cleveland,Forest Citys,CL1\n\
             FW1,NA,Fort Wayne,Kekiongas,FW1\n",
        );

        let mut types = String::from("appearance_type_id,name,category\n");
        for (code, name) in [
            ("UHP", "Home Plate Umpire"),
            ("U1B", "First Base Umpire"),
            ("U2B", "Second Base Umpire"),
            ("U3B", "Third Base Umpire"),
            ("ULF", "Left Field Umpire"),
            ("URF", "Right Field Umpire"),
        ] {
            types.push_str(&format!("{code},{name},umpire\n"));
        }
        types.push_str("MM,Manager,manager\n");
        for (code, name) in [
            ("AWP", "Winning Pitcher"),
            ("ALP", "Losing Pitcher"),
            ("ASP", "Saving Pitcher"),
            ("AWB", "Winning RBI Batter"),
        ] {
            types.push_str(&format!("{code},{name},award\n"));
        }
        types.push_str("PSP,Starting Pitcher,pitcher\n");
        for slot in 1..=9 {
            types.push_str(&format!("O{slot},Batter {slot},offense\n"));
        }
        for position in 1..=10 {
            types.push_str(&format!("D{position},Position {position},defense\n"));
        }
        write(&paths.appearance_types, &types);
    }
}

fn write(path: &Path, content: &str) {
    fs::write(path, content).unwrap();
}

/// Count rows matching a WHERE clause
pub fn count(store: &Store, table: &str, filter: &str) -> i64 {
    store
        .connection()
        .query_row(&format!("SELECT COUNT(*) FROM {table} WHERE {filter}"), [], |row| row.get(0))
        .unwrap()
}
