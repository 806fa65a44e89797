use rusqlite::types::Value;
use serde::Serialize;

use crate::constants::BOX_SCORE_FIELDS;

/// Which side of a game a team played on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Visiting,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Home, Side::Visiting];

    /// Column prefix used by the game log for this side's field group
    pub fn prefix(self) -> &'static str {
        match self {
            Side::Home => "h",
            Side::Visiting => "v",
        }
    }

    /// Qualify a bare field name with this side's prefix (`hits` -> `h_hits`)
    pub fn column(self, field: &str) -> String {
        format!("{}_{}", self.prefix(), field)
    }

    pub fn is_home(self) -> bool {
        matches!(self, Side::Home)
    }
}

/// A person known to the record (player, manager or umpire)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Person {
    pub person_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Park {
    pub park_id: String,
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct League {
    pub league_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AppearanceType {
    pub appearance_type_id: String,
    pub name: Option<String>,
    pub category: Option<String>,
}

/// A team identity. Relocated or renamed clubs get a new `team_id` but keep
/// their `franch_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Team {
    pub team_id: String,
    pub league_id: Option<String>,
    pub city: Option<String>,
    pub nickname: Option<String>,
    pub franch_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Game {
    pub game_id: String,
    pub date: i64,
    pub number_of_game: i64,
    pub park_id: Option<String>,
    pub length_outs: Option<i64>,
    /// `None` when the day/night flag is neither `D` nor `N`
    pub day: Option<bool>,
    pub completion: Option<String>,
    pub forefeit: Option<String>,
    pub protest: Option<String>,
    pub attendance: Option<i64>,
    pub length_minutes: Option<i64>,
    pub additional_info: Option<String>,
    pub acquisition_info: Option<String>,
}

/// One team's box score for one game
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TeamPerformance {
    pub team_id: String,
    pub game_id: String,
    pub home: bool,
    pub league_id: Option<String>,
    pub score: Option<i64>,
    pub line_score: Option<String>,
    /// Values in `BOX_SCORE_FIELDS` order
    pub box_score: [Option<i64>; BOX_SCORE_FIELDS.len()],
}

/// A person's role in one game. The surrogate `appearance_id` is assigned
/// by the store, so it is not part of the row identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PersonAppearance {
    pub person_id: String,
    pub team_id: Option<String>,
    pub game_id: String,
    pub appearance_type_id: String,
}

/// A row that can be written to its entity's table. `values` must follow
/// the order of the table's insert columns.
pub trait TableRow {
    fn values(&self) -> Vec<Value>;
}

fn text(value: &Option<String>) -> Value {
    value.clone().map(Value::Text).unwrap_or(Value::Null)
}

fn int(value: Option<i64>) -> Value {
    value.map(Value::Integer).unwrap_or(Value::Null)
}

fn boolean(value: Option<bool>) -> Value {
    int(value.map(i64::from))
}

impl TableRow for Person {
    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.person_id.clone()),
            text(&self.first_name),
            text(&self.last_name),
        ]
    }
}

impl TableRow for Park {
    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.park_id.clone()),
            text(&self.name),
            text(&self.nickname),
            text(&self.city),
            text(&self.state),
            text(&self.notes),
        ]
    }
}

impl TableRow for League {
    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.league_id.clone()),
            Value::Text(self.name.clone()),
        ]
    }
}

impl TableRow for AppearanceType {
    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.appearance_type_id.clone()),
            text(&self.name),
            text(&self.category),
        ]
    }
}

impl TableRow for Team {
    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.team_id.clone()),
            text(&self.league_id),
            text(&self.city),
            text(&self.nickname),
            text(&self.franch_id),
        ]
    }
}

impl TableRow for Game {
    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.game_id.clone()),
            Value::Integer(self.date),
            Value::Integer(self.number_of_game),
            text(&self.park_id),
            int(self.length_outs),
            boolean(self.day),
            text(&self.completion),
            text(&self.forefeit),
            text(&self.protest),
            int(self.attendance),
            int(self.length_minutes),
            text(&self.additional_info),
            text(&self.acquisition_info),
        ]
    }
}

impl TableRow for TeamPerformance {
    fn values(&self) -> Vec<Value> {
        let mut values = vec![
            Value::Text(self.team_id.clone()),
            Value::Text(self.game_id.clone()),
            boolean(Some(self.home)),
            text(&self.league_id),
            int(self.score),
            text(&self.line_score),
        ];
        values.extend(self.box_score.iter().copied().map(int));
        values
    }
}

impl TableRow for PersonAppearance {
    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.person_id.clone()),
            text(&self.team_id),
            Value::Text(self.game_id.clone()),
            Value::Text(self.appearance_type_id.clone()),
        ]
    }
}
