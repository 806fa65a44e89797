//! Projections from the staged extracts to normalized rows.
//!
//! Reference entities are straight field renames. `game` adds the derived
//! identifier and day flag. `team_performance` and `person_appearance`
//! unpivot the wide game log. Performances go through a deduplicating
//! union; appearances are made distinct within each game, and the unique
//! index drops repeats across duplicated game rows.

use std::collections::HashSet;
use std::hash::Hash;
use std::time::Instant;

use tracing::{debug, info, instrument};

use crate::constants::{BOX_SCORE_FIELDS, GAME_FIELDS, GAME_LOG_SOURCE, LEAGUES};
use crate::error::{BuildError, Result};
use crate::loader::{Record, SourceTable, Staging};
use crate::metrics::BuildMetrics;
use crate::pipeline::roles::{GameContext, Outcome, ResolvedRole, ROLES};
use crate::types::{
    AppearanceType, Game, League, Park, Person, PersonAppearance, Side, Team, TeamPerformance,
};

/// Every normalized row derived from one staging set
#[derive(Debug, Clone, Default)]
pub struct NormalizedSet {
    pub persons: Vec<Person>,
    pub parks: Vec<Park>,
    pub leagues: Vec<League>,
    pub appearance_types: Vec<AppearanceType>,
    pub teams: Vec<Team>,
    pub games: Vec<Game>,
    pub team_performances: Vec<TeamPerformance>,
    pub person_appearances: Vec<PersonAppearance>,
}

/// Columns the game log must provide
pub fn game_log_columns() -> Vec<String> {
    let mut columns: Vec<String> = GAME_FIELDS.iter().map(|c| c.to_string()).collect();
    for side in Side::BOTH {
        for field in ["name", "league", "score", "line_score"]
            .iter()
            .chain(BOX_SCORE_FIELDS.iter())
        {
            columns.push(side.column(field));
        }
    }
    for role in ROLES.iter() {
        for column in role.columns() {
            if !columns.iter().any(|c| c == column) {
                columns.push(column.to_string());
            }
        }
    }
    columns
}

/// `date ‖ home team ‖ game number`, e.g. `18710504CL10`
pub fn game_id(date: i64, home_team: &str, number_of_game: i64) -> String {
    format!("{date}{home_team}{number_of_game}")
}

/// `D` is a day game, `N` a night game; anything else is unknown
pub fn day_flag(day_night: Option<&str>) -> Option<bool> {
    match day_night {
        Some("D") => Some(true),
        Some("N") => Some(false),
        _ => None,
    }
}

/// Union of row sets that keeps first occurrences in order
fn union_distinct<T: Eq + Hash>(rows: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::with_capacity(rows.len());
    let keep: Vec<bool> = rows.iter().map(|row| seen.insert(row)).collect();
    drop(seen);
    rows.into_iter()
        .zip(keep)
        .filter_map(|(row, keep)| keep.then_some(row))
        .collect()
}

pub fn persons(table: &SourceTable) -> Result<Vec<Person>> {
    table
        .records()
        .map(|r| -> Result<Person> {
            Ok(Person {
                person_id: r.required("id")?.to_string(),
                first_name: r.owned("first")?,
                last_name: r.owned("last")?,
            })
        })
        .collect()
}

pub fn parks(table: &SourceTable) -> Result<Vec<Park>> {
    table
        .records()
        .map(|r| -> Result<Park> {
            Ok(Park {
                park_id: r.required("park_id")?.to_string(),
                name: r.owned("name")?,
                nickname: r.owned("aka")?,
                city: r.owned("city")?,
                state: r.owned("state")?,
                notes: r.owned("notes")?,
            })
        })
        .collect()
}

pub fn leagues() -> Vec<League> {
    LEAGUES
        .iter()
        .map(|(id, name)| League {
            league_id: id.to_string(),
            name: name.to_string(),
        })
        .collect()
}

pub fn appearance_types(table: &SourceTable) -> Result<Vec<AppearanceType>> {
    table
        .records()
        .map(|r| -> Result<AppearanceType> {
            Ok(AppearanceType {
                appearance_type_id: r.required("appearance_type_id")?.to_string(),
                name: r.owned("name")?,
                category: r.owned("category")?,
            })
        })
        .collect()
}

pub fn teams(table: &SourceTable) -> Result<Vec<Team>> {
    table
        .records()
        .map(|r| -> Result<Team> {
            Ok(Team {
                team_id: r.required("team_id")?.to_string(),
                league_id: r.owned("league")?,
                city: r.owned("city")?,
                nickname: r.owned("nickname")?,
                franch_id: r.owned("franch_id")?,
            })
        })
        .collect()
}

fn record_game_id(record: &Record<'_>) -> Result<String> {
    Ok(game_id(
        record.required_int("date")?,
        record.required("h_name")?,
        record.required_int("number_of_game")?,
    ))
}

fn game(record: &Record<'_>) -> Result<Game> {
    Ok(Game {
        game_id: record_game_id(record)?,
        date: record.required_int("date")?,
        number_of_game: record.required_int("number_of_game")?,
        park_id: record.owned("park_id")?,
        length_outs: record.lenient_int("length_outs")?,
        day: day_flag(record.text("day_night")?),
        completion: record.owned("completion")?,
        forefeit: record.owned("forefeit")?,
        protest: record.owned("protest")?,
        attendance: record.lenient_int("attendance")?,
        length_minutes: record.lenient_int("length_minutes")?,
        additional_info: record.owned("additional_info")?,
        acquisition_info: record.owned("acquisition_info")?,
    })
}

pub fn games(game_log: &SourceTable) -> Result<Vec<Game>> {
    game_log.records().map(|r| game(&r)).collect()
}

/// Column positions of one side's field group
struct SideColumns {
    side: Side,
    name: usize,
    league: usize,
    score: usize,
    line_score: usize,
    box_score: Vec<usize>,
}

impl SideColumns {
    fn resolve(game_log: &SourceTable, side: Side) -> Result<Self> {
        Ok(Self {
            side,
            name: game_log.resolve(&side.column("name"))?,
            league: game_log.resolve(&side.column("league"))?,
            score: game_log.resolve(&side.column("score"))?,
            line_score: game_log.resolve(&side.column("line_score"))?,
            box_score: BOX_SCORE_FIELDS
                .iter()
                .map(|f| game_log.resolve(&side.column(f)))
                .collect::<Result<_>>()?,
        })
    }

    fn project(&self, record: &Record<'_>, game_id: &str) -> Result<TeamPerformance> {
        let mut box_score = [None; BOX_SCORE_FIELDS.len()];
        for (slot, column) in box_score.iter_mut().zip(&self.box_score) {
            *slot = record.lenient_int_at(*column);
        }
        let team_id = record
            .text_at(self.name)
            .ok_or_else(|| BuildError::MissingValue {
                source_name: GAME_LOG_SOURCE.to_string(),
                row: record.line(),
                column: self.side.column("name"),
            })?;
        Ok(TeamPerformance {
            team_id: team_id.to_string(),
            game_id: game_id.to_string(),
            home: self.side.is_home(),
            league_id: record.text_at(self.league).map(str::to_string),
            score: record.lenient_int_at(self.score),
            line_score: record.text_at(self.line_score).map(str::to_string),
            box_score,
        })
    }
}

/// Two rows per game: the home field group with `home = true` and the
/// visiting field group with `home = false`.
pub fn team_performances(game_log: &SourceTable) -> Result<Vec<TeamPerformance>> {
    let sides = [
        SideColumns::resolve(game_log, Side::Home)?,
        SideColumns::resolve(game_log, Side::Visiting)?,
    ];

    let mut rows = Vec::with_capacity(game_log.len() * 2);
    for side in &sides {
        for record in game_log.records() {
            let game_id = record_game_id(&record)?;
            rows.push(side.project(&record, &game_id)?);
        }
    }
    Ok(union_distinct(rows))
}

/// Every filled role of every game, distinct on (person, team, type)
/// within each game
pub fn person_appearances(game_log: &SourceTable) -> Result<Vec<PersonAppearance>> {
    let roles = ResolvedRole::resolve_all(game_log)?;
    let home = SideColumns::resolve(game_log, Side::Home)?;
    let visiting = SideColumns::resolve(game_log, Side::Visiting)?;

    let mut rows = Vec::new();
    for record in game_log.records() {
        let game_id = record_game_id(&record)?;
        let game = GameContext {
            game_id: &game_id,
            home_team: record.text_at(home.name),
            visiting_team: record.text_at(visiting.name),
            outcome: Outcome::from_scores(
                record.lenient_int_at(home.score),
                record.lenient_int_at(visiting.score),
            ),
        };

        let before = rows.len();
        for a in roles.iter().filter_map(|role| role.apply(&record, &game)) {
            let row = PersonAppearance {
                person_id: a.person_id.to_string(),
                team_id: a.team_id.map(str::to_string),
                game_id: game.game_id.to_string(),
                appearance_type_id: a.appearance_type_id,
            };
            if !rows[before..].contains(&row) {
                rows.push(row);
            }
        }
        if rows.len() == before {
            debug!(game_id = %game_id, "Game has no recorded appearances");
        }
    }
    Ok(rows)
}

/// Project every entity from the staged extracts
#[instrument(skip(staging))]
pub fn normalize(staging: &Staging) -> Result<NormalizedSet> {
    let start = Instant::now();
    let set = NormalizedSet {
        persons: persons(&staging.persons)?,
        parks: parks(&staging.parks)?,
        leagues: leagues(),
        appearance_types: appearance_types(&staging.appearance_types)?,
        teams: teams(&staging.teams)?,
        games: games(&staging.game_log)?,
        team_performances: team_performances(&staging.game_log)?,
        person_appearances: person_appearances(&staging.game_log)?,
    };
    BuildMetrics::record_stage_duration("transform", start.elapsed().as_secs_f64());
    info!(
        games = set.games.len(),
        team_performances = set.team_performances.len(),
        person_appearances = set.person_appearances.len(),
        "Normalized game log"
    );
    Ok(set)
}
