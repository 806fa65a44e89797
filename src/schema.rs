//! Declarations of the eight normalized tables.
//!
//! Declaring is idempotent: a table that exists with the declared column
//! list is left alone, a missing table is created, and a table whose
//! columns differ is dropped and recreated.

use once_cell::sync::Lazy;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::constants::BOX_SCORE_FIELDS;
use crate::error::Result;

/// The normalized entities, in the order they must be populated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Person,
    Park,
    League,
    AppearanceType,
    Team,
    Game,
    TeamPerformance,
    PersonAppearance,
}

impl Entity {
    pub const ALL: [Entity; 8] = [
        Entity::Person,
        Entity::Park,
        Entity::League,
        Entity::AppearanceType,
        Entity::Team,
        Entity::Game,
        Entity::TeamPerformance,
        Entity::PersonAppearance,
    ];

    pub fn table_name(self) -> &'static str {
        match self {
            Entity::Person => "person",
            Entity::Park => "park",
            Entity::League => "league",
            Entity::AppearanceType => "appearance_type",
            Entity::Team => "team",
            Entity::Game => "game",
            Entity::TeamPerformance => "team_performance",
            Entity::PersonAppearance => "person_appearance",
        }
    }

    pub fn definition(self) -> &'static TableDef {
        &DEFINITIONS[self as usize]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: &'static str,
    /// Assigned by the store (`INTEGER PRIMARY KEY`), never inserted
    pub generated: bool,
}

impl ColumnDef {
    const fn new(name: &'static str, sql_type: &'static str) -> Self {
        Self {
            name,
            sql_type,
            generated: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableDef {
    pub entity: Entity,
    pub columns: Vec<ColumnDef>,
    /// Table constraints: primary and foreign keys
    pub constraints: Vec<String>,
    /// Index statements run after the table exists
    pub indexes: Vec<String>,
}

impl TableDef {
    pub fn name(&self) -> &'static str {
        self.entity.table_name()
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Columns supplied on insert, in `TableRow::values` order
    pub fn insert_columns(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .filter(|c| !c.generated)
            .map(|c| c.name)
            .collect()
    }

    pub fn create_sql(&self) -> String {
        let mut lines: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("    {} {}", c.name, c.sql_type))
            .collect();
        lines.extend(self.constraints.iter().map(|c| format!("    {c}")));
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n);",
            self.name(),
            lines.join(",\n")
        )
    }

    pub fn insert_or_ignore_sql(&self) -> String {
        let columns = self.insert_columns();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        format!(
            "INSERT OR IGNORE INTO {} ({}) VALUES ({})",
            self.name(),
            columns.join(", "),
            placeholders.join(", ")
        )
    }
}

static DEFINITIONS: Lazy<Vec<TableDef>> =
    Lazy::new(|| Entity::ALL.iter().map(|e| build(*e)).collect());

fn build(entity: Entity) -> TableDef {
    let text = |name: &'static str| ColumnDef::new(name, "TEXT");
    let int = |name: &'static str| ColumnDef::new(name, "INTEGER");
    let boolean = |name: &'static str| ColumnDef::new(name, "BOOLEAN");

    let (columns, constraints, indexes) = match entity {
        Entity::Person => (
            vec![text("person_id"), text("first_name"), text("last_name")],
            vec!["PRIMARY KEY (person_id)".to_string()],
            vec![],
        ),
        Entity::Park => (
            vec![
                text("park_id"),
                text("name"),
                text("nickname"),
                text("city"),
                text("state"),
                text("notes"),
            ],
            vec!["PRIMARY KEY (park_id)".to_string()],
            vec![],
        ),
        Entity::League => (
            vec![text("league_id"), text("name")],
            vec!["PRIMARY KEY (league_id)".to_string()],
            vec![],
        ),
        Entity::AppearanceType => (
            vec![text("appearance_type_id"), text("name"), text("category")],
            vec!["PRIMARY KEY (appearance_type_id)".to_string()],
            vec![],
        ),
        // No foreign key on league_id; unknown league codes load as-is.
        Entity::Team => (
            vec![
                text("team_id"),
                text("league_id"),
                text("city"),
                text("nickname"),
                text("franch_id"),
            ],
            vec!["PRIMARY KEY (team_id)".to_string()],
            vec![],
        ),
        Entity::Game => (
            vec![
                text("game_id"),
                int("date"),
                int("number_of_game"),
                text("park_id"),
                int("length_outs"),
                boolean("day"),
                text("completion"),
                text("forefeit"),
                text("protest"),
                int("attendance"),
                int("length_minutes"),
                text("additional_info"),
                text("acquisition_info"),
            ],
            vec![
                "PRIMARY KEY (game_id)".to_string(),
                "FOREIGN KEY (park_id) REFERENCES park(park_id)".to_string(),
            ],
            vec![],
        ),
        Entity::TeamPerformance => {
            let mut columns = vec![
                text("team_id"),
                text("game_id"),
                boolean("home"),
                text("league_id"),
                int("score"),
                text("line_score"),
            ];
            columns.extend(BOX_SCORE_FIELDS.iter().map(|f| int(*f)));
            (
                columns,
                vec![
                    "PRIMARY KEY (team_id, game_id)".to_string(),
                    "FOREIGN KEY (team_id) REFERENCES team(team_id)".to_string(),
                    "FOREIGN KEY (game_id) REFERENCES game(game_id)".to_string(),
                ],
                vec![],
            )
        }
        Entity::PersonAppearance => (
            vec![
                ColumnDef {
                    name: "appearance_id",
                    sql_type: "INTEGER PRIMARY KEY",
                    generated: true,
                },
                text("person_id"),
                text("team_id"),
                text("game_id"),
                text("appearance_type_id"),
            ],
            vec![
                "FOREIGN KEY (person_id) REFERENCES person(person_id)".to_string(),
                "FOREIGN KEY (team_id) REFERENCES team(team_id)".to_string(),
                "FOREIGN KEY (game_id) REFERENCES game(game_id)".to_string(),
                "FOREIGN KEY (appearance_type_id) REFERENCES appearance_type(appearance_type_id)"
                    .to_string(),
            ],
            // Umpires have no team; NULL teams must still collide.
            vec!["CREATE UNIQUE INDEX IF NOT EXISTS person_appearance_identity \
                  ON person_appearance \
                  (person_id, COALESCE(team_id, ''), game_id, appearance_type_id);"
                .to_string()],
        ),
    };

    TableDef {
        entity,
        columns,
        constraints,
        indexes,
    }
}

/// What declaring did to each table
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaOutcome {
    pub created: Vec<Entity>,
    pub rebuilt: Vec<Entity>,
    pub unchanged: Vec<Entity>,
}

/// Column names of an existing table, or `None` if it does not exist
pub fn existing_columns(conn: &Connection, table: &str) -> Result<Option<Vec<String>>> {
    let exists: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Ok(None);
    }

    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Some(columns))
}

/// Declare every normalized table on `conn`.
///
/// Foreign key enforcement is suspended while declaring so a rebuilt parent
/// table can be dropped under existing child rows; the previous setting is
/// restored afterwards.
#[instrument(skip(conn))]
pub fn declare(conn: &Connection) -> Result<SchemaOutcome> {
    let foreign_keys: i64 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
    conn.execute_batch("PRAGMA foreign_keys = OFF;")?;

    let outcome = declare_tables(conn);

    let restore = if foreign_keys != 0 { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {restore};"))?;
    outcome
}

fn declare_tables(conn: &Connection) -> Result<SchemaOutcome> {
    let mut outcome = SchemaOutcome::default();

    for entity in Entity::ALL {
        let def = entity.definition();
        match existing_columns(conn, def.name())? {
            None => {
                conn.execute_batch(&def.create_sql())?;
                debug!(table = def.name(), "Created table");
                outcome.created.push(entity);
            }
            Some(columns) if columns == def.column_names() => {
                outcome.unchanged.push(entity);
            }
            Some(columns) => {
                warn!(
                    table = def.name(),
                    existing = ?columns,
                    "Table shape changed, dropping and recreating"
                );
                conn.execute_batch(&format!("DROP TABLE {};", def.name()))?;
                conn.execute_batch(&def.create_sql())?;
                outcome.rebuilt.push(entity);
            }
        }
        for index in &def.indexes {
            conn.execute_batch(index)?;
        }
    }

    info!(
        created = outcome.created.len(),
        rebuilt = outcome.rebuilt.len(),
        unchanged = outcome.unchanged.len(),
        "Schema declared"
    );
    Ok(outcome)
}
