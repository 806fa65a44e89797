//! The catalog of roles a person can hold in a game.
//!
//! Every role is a [`RoleDescriptor`]: which game log field names the
//! person, how the team is chosen, and which appearance type is assigned.
//! The transformer walks this table once per game.

use once_cell::sync::Lazy;

use crate::constants::{
    BATTING_ORDER_SLOTS, DEFENSE_PREFIX, LOSING_PITCHER, MANAGER, OFFENSE_PREFIX, SAVING_PITCHER,
    STARTING_PITCHER, UMPIRE_FIRST_BASE, UMPIRE_HOME_PLATE, UMPIRE_LEFT_FIELD, UMPIRE_RIGHT_FIELD,
    UMPIRE_SECOND_BASE, UMPIRE_THIRD_BASE, WINNING_PITCHER, WINNING_RBI_BATTER,
};
use crate::error::Result;
use crate::loader::{parse_int, Record, SourceTable};
use crate::types::Side;

/// How the team of an appearance is determined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamRule {
    /// Officials belong to neither team
    Neutral,
    Fixed(Side),
    Winner,
    Loser,
}

/// How the appearance type code is determined
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeRule {
    Fixed(&'static str),
    /// `O{slot}`
    Offense(u8),
    /// `D{position}`, the position read from the named field
    Defense { position_field: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDescriptor {
    pub person_field: String,
    pub team: TeamRule,
    pub code: CodeRule,
}

impl RoleDescriptor {
    fn new(person_field: impl Into<String>, team: TeamRule, code: CodeRule) -> Self {
        Self {
            person_field: person_field.into(),
            team,
            code,
        }
    }

    /// Game log columns this role reads
    pub fn columns(&self) -> Vec<&str> {
        let mut columns = vec![self.person_field.as_str()];
        if let CodeRule::Defense { position_field } = &self.code {
            columns.push(position_field);
        }
        columns
    }
}

/// Every role, in a stable order: umpires, managers, awards, starting
/// pitchers, then each side's batting order.
pub static ROLES: Lazy<Vec<RoleDescriptor>> = Lazy::new(|| {
    use CodeRule::Fixed as Code;
    use TeamRule::*;

    let mut roles = vec![
        RoleDescriptor::new("hp_umpire_id", Neutral, Code(UMPIRE_HOME_PLATE)),
        RoleDescriptor::new("1b_umpire_id", Neutral, Code(UMPIRE_FIRST_BASE)),
        RoleDescriptor::new("2b_umpire_id", Neutral, Code(UMPIRE_SECOND_BASE)),
        RoleDescriptor::new("3b_umpire_id", Neutral, Code(UMPIRE_THIRD_BASE)),
        RoleDescriptor::new("lf_umpire_id", Neutral, Code(UMPIRE_LEFT_FIELD)),
        RoleDescriptor::new("rf_umpire_id", Neutral, Code(UMPIRE_RIGHT_FIELD)),
        RoleDescriptor::new("v_manager_id", Fixed(Side::Visiting), Code(MANAGER)),
        RoleDescriptor::new("h_manager_id", Fixed(Side::Home), Code(MANAGER)),
        RoleDescriptor::new("winning_pitcher_id", Winner, Code(WINNING_PITCHER)),
        RoleDescriptor::new("losing_pitcher_id", Loser, Code(LOSING_PITCHER)),
        RoleDescriptor::new("saving_pitcher_id", Winner, Code(SAVING_PITCHER)),
        RoleDescriptor::new("winning_rbi_batter_id", Winner, Code(WINNING_RBI_BATTER)),
        RoleDescriptor::new("v_starting_pitcher_id", Fixed(Side::Visiting), Code(STARTING_PITCHER)),
        RoleDescriptor::new("h_starting_pitcher_id", Fixed(Side::Home), Code(STARTING_PITCHER)),
    ];

    for side in Side::BOTH {
        for slot in 1..=BATTING_ORDER_SLOTS {
            let player = side.column(&format!("player_{slot}_id"));
            roles.push(RoleDescriptor::new(
                player.clone(),
                Fixed(side),
                CodeRule::Offense(slot),
            ));
            roles.push(RoleDescriptor::new(
                player,
                Fixed(side),
                CodeRule::Defense {
                    position_field: side.column(&format!("player_{slot}_def_pos")),
                },
            ));
        }
    }
    roles
});

/// Result of a game as far as award roles are concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    HomeWon,
    VisitorWon,
    Tied,
    /// A score is missing
    Unknown,
}

impl Outcome {
    pub fn from_scores(home: Option<i64>, visitor: Option<i64>) -> Self {
        match (home, visitor) {
            (Some(h), Some(v)) if h > v => Outcome::HomeWon,
            (Some(h), Some(v)) if h < v => Outcome::VisitorWon,
            (Some(_), Some(_)) => Outcome::Tied,
            _ => Outcome::Unknown,
        }
    }

    /// Side credited with winning-side awards. A tie credits the home team,
    /// which mislabels tied games (known defect).
    pub fn winner(self) -> Side {
        match self {
            Outcome::HomeWon | Outcome::Tied => Side::Home,
            Outcome::VisitorWon | Outcome::Unknown => Side::Visiting,
        }
    }

    /// Side charged with losing-side awards. Ties and unknown results fall
    /// to the visiting team.
    pub fn loser(self) -> Side {
        match self {
            Outcome::VisitorWon => Side::Home,
            Outcome::HomeWon | Outcome::Tied | Outcome::Unknown => Side::Visiting,
        }
    }
}

/// Per-game facts every role needs
#[derive(Debug, Clone, Copy)]
pub struct GameContext<'a> {
    pub game_id: &'a str,
    pub home_team: Option<&'a str>,
    pub visiting_team: Option<&'a str>,
    pub outcome: Outcome,
}

impl<'a> GameContext<'a> {
    fn team(&self, side: Side) -> Option<&'a str> {
        match side {
            Side::Home => self.home_team,
            Side::Visiting => self.visiting_team,
        }
    }

    fn team_for(&self, rule: TeamRule) -> Option<&'a str> {
        match rule {
            TeamRule::Neutral => None,
            TeamRule::Fixed(side) => self.team(side),
            TeamRule::Winner => self.team(self.outcome.winner()),
            TeamRule::Loser => self.team(self.outcome.loser()),
        }
    }
}

#[derive(Debug, Clone)]
enum ResolvedCode {
    Fixed(&'static str),
    Offense(u8),
    Defense(usize),
}

/// A role bound to column positions of a particular game log
#[derive(Debug, Clone)]
pub struct ResolvedRole {
    person: usize,
    team: TeamRule,
    code: ResolvedCode,
}

/// One derived appearance, borrowed from the game log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAppearance<'a> {
    pub person_id: &'a str,
    pub team_id: Option<&'a str>,
    pub appearance_type_id: String,
}

impl ResolvedRole {
    /// Bind every role in [`ROLES`] to `game_log`'s columns
    pub fn resolve_all(game_log: &SourceTable) -> Result<Vec<ResolvedRole>> {
        ROLES
            .iter()
            .map(|role| -> Result<ResolvedRole> {
                let code = match &role.code {
                    CodeRule::Fixed(code) => ResolvedCode::Fixed(*code),
                    CodeRule::Offense(slot) => ResolvedCode::Offense(*slot),
                    CodeRule::Defense { position_field } => {
                        ResolvedCode::Defense(game_log.resolve(position_field)?)
                    }
                };
                Ok(ResolvedRole {
                    person: game_log.resolve(&role.person_field)?,
                    team: role.team,
                    code,
                })
            })
            .collect()
    }

    /// The appearance this role yields for one game, if any. Nothing is
    /// produced when the person field is empty, or for a defense role whose
    /// fielding position is empty or not a whole number.
    pub fn apply<'a>(
        &self,
        record: &Record<'a>,
        game: &GameContext<'a>,
    ) -> Option<RoleAppearance<'a>> {
        let person_id = record.text_at(self.person)?;
        let appearance_type_id = match &self.code {
            ResolvedCode::Fixed(code) => (*code).to_string(),
            ResolvedCode::Offense(slot) => format!("{OFFENSE_PREFIX}{slot}"),
            ResolvedCode::Defense(column) => {
                let position = parse_int(record.text_at(*column)?)?;
                format!("{DEFENSE_PREFIX}{position}")
            }
        };
        Some(RoleAppearance {
            person_id,
            team_id: game.team_for(self.team),
            appearance_type_id,
        })
    }
}
