//! Source file names and fixed reference data shared across the build.
//!
//! File names match the extracts as they are published; the loader resolves
//! them relative to the configured sources directory.

pub const DEFAULT_DATABASE: &str = "BB.db";
pub const DEFAULT_CONFIG_FILE: &str = "baseball_db.toml";
pub const CONFIG_ENV_VAR: &str = "BASEBALL_DB_CONFIG";

// Source extracts
pub const GAME_LOG_FILE: &str = "game_log.csv";
pub const PARK_CODES_FILE: &str = "park_codes.csv";
pub const PERSON_CODES_FILE: &str = "person_codes.csv";
pub const TEAM_CODES_FILE: &str = "team_codes.csv";
pub const APPEARANCE_TYPE_FILE: &str = "appearance_type.csv";

// Source names as they appear in logs, errors and metric labels
pub const GAME_LOG_SOURCE: &str = "game_log";
pub const PARK_CODES_SOURCE: &str = "park_codes";
pub const PERSON_CODES_SOURCE: &str = "person_codes";
pub const TEAM_CODES_SOURCE: &str = "team_codes";
pub const APPEARANCE_TYPE_SOURCE: &str = "appearance_type";

/// Staging tables an earlier SQL-based build may have left in the store.
pub const LEGACY_STAGING_TABLES: [&str; 4] =
    ["game_log", "park_codes", "person_codes", "team_codes"];

/// The six leagues that appear in the historical record. Not derived from
/// the extracts.
pub const LEAGUES: [(&str, &str); 6] = [
    ("NL", "National League"),
    ("AL", "American League"),
    ("AA", "American Association"),
    ("FL", "Federal League"),
    ("PL", "Players League"),
    ("UA", "Union Association"),
];

// Appearance type codes assigned by fixed roles
pub const UMPIRE_HOME_PLATE: &str = "UHP";
pub const UMPIRE_FIRST_BASE: &str = "U1B";
pub const UMPIRE_SECOND_BASE: &str = "U2B";
pub const UMPIRE_THIRD_BASE: &str = "U3B";
pub const UMPIRE_LEFT_FIELD: &str = "ULF";
pub const UMPIRE_RIGHT_FIELD: &str = "URF";
pub const MANAGER: &str = "MM";
pub const WINNING_PITCHER: &str = "AWP";
pub const LOSING_PITCHER: &str = "ALP";
pub const SAVING_PITCHER: &str = "ASP";
pub const WINNING_RBI_BATTER: &str = "AWB";
pub const STARTING_PITCHER: &str = "PSP";

/// Prefix of offense codes (`O1`..`O9`), suffixed with the batting slot.
pub const OFFENSE_PREFIX: &str = "O";
/// Prefix of defense codes (`D1`..`D10`), suffixed with the fielding position.
pub const DEFENSE_PREFIX: &str = "D";

pub const BATTING_ORDER_SLOTS: u8 = 9;

/// Integer box-score statistics recorded per side. The game log carries each
/// one twice, prefixed `h_` and `v_`; `team_performance` stores them under
/// the bare name.
pub const BOX_SCORE_FIELDS: [&str; 28] = [
    "at_bats",
    "hits",
    "doubles",
    "triples",
    "homeruns",
    "rbi",
    "sacrifice_hits",
    "sacrifice_flies",
    "hit_by_pitch",
    "walks",
    "intentional_walks",
    "strikeouts",
    "stolen_bases",
    "caught_stealing",
    "grounded_into_double",
    "first_catcher_interference",
    "left_on_base",
    "pitchers_used",
    "individual_earned_runs",
    "team_earned_runs",
    "wild_pitches",
    "balks",
    "putouts",
    "assists",
    "errors",
    "passed_balls",
    "double_plays",
    "triple_plays",
];

/// Game-level columns of the game log projected into `game`.
pub const GAME_FIELDS: [&str; 12] = [
    "date",
    "number_of_game",
    "park_id",
    "length_outs",
    "day_night",
    "completion",
    "forefeit",
    "protest",
    "attendance",
    "length_minutes",
    "additional_info",
    "acquisition_info",
];

pub const PARK_COLUMNS: [&str; 6] = ["park_id", "name", "aka", "city", "state", "notes"];
pub const PERSON_COLUMNS: [&str; 3] = ["id", "first", "last"];
pub const TEAM_COLUMNS: [&str; 5] = ["team_id", "league", "city", "nickname", "franch_id"];
pub const APPEARANCE_TYPE_COLUMNS: [&str; 3] = ["appearance_type_id", "name", "category"];
