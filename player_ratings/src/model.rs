// ********* Match data structures ***********

use std::error::Error;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A player in a match lineup.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub name: String,
    /// Short position code (GK, CB, LW, ...).
    pub position: String,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub shirt_number: Option<u32>,
}

impl PlayerInfo {
    pub fn new(name: &str, position: &str) -> PlayerInfo {
        PlayerInfo {
            name: name.to_string(),
            position: position.to_string(),
            image_path: None,
            shirt_number: None,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SubstitutionEvent {
    pub player_in: String,
    pub player_out: String,
    pub minute: u32,
}

/// A goal involving the club, as reported by the key events of a match.
///
/// Own goals are recorded with `own_goal` set and the (club) player who
/// scored it as `scorer`.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct GoalEvent {
    pub scorer: String,
    #[serde(default)]
    pub assist: Option<String>,
    pub minute: u32,
    #[serde(default)]
    pub own_goal: bool,
}

/// All the data for a single match of the club.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct MatchData {
    pub match_id: u64,
    pub home_team: String,
    pub away_team: String,
    pub competition: String,
    pub matchday: String,
    pub date: String,
    pub venue: String,
    pub formation: String,
    pub coach: String,
    #[serde(default)]
    pub starting_players: Vec<PlayerInfo>,
    #[serde(default)]
    pub substitutions: Vec<SubstitutionEvent>,
    #[serde(default)]
    pub goals: Vec<GoalEvent>,
    #[serde(rename = "is_tottenham_home", default = "default_true")]
    pub is_home: bool,
    #[serde(default)]
    pub home_score: Option<u32>,
    #[serde(default)]
    pub away_score: Option<u32>,
}

fn default_true() -> bool {
    true
}

/// Number of players in a complete starting lineup.
pub const STARTING_PLAYERS: usize = 11;

/// The fields of a match record that must be filled before a survey can be
/// generated from it.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum MatchField {
    HomeTeam,
    AwayTeam,
    Competition,
    Matchday,
    Date,
    Venue,
    Formation,
    Coach,
    StartingPlayers,
}

impl MatchField {
    pub const SCALARS: [MatchField; 8] = [
        MatchField::HomeTeam,
        MatchField::AwayTeam,
        MatchField::Competition,
        MatchField::Matchday,
        MatchField::Date,
        MatchField::Venue,
        MatchField::Formation,
        MatchField::Coach,
    ];

    /// The name of the field in the match data file.
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchField::HomeTeam => "home_team",
            MatchField::AwayTeam => "away_team",
            MatchField::Competition => "competition",
            MatchField::Matchday => "matchday",
            MatchField::Date => "date",
            MatchField::Venue => "venue",
            MatchField::Formation => "formation",
            MatchField::Coach => "coach",
            MatchField::StartingPlayers => "starting_players",
        }
    }
}

impl Display for MatchField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl MatchData {
    /// The team the survey is run for.
    pub fn club_team(&self) -> &str {
        if self.is_home {
            &self.home_team
        } else {
            &self.away_team
        }
    }

    /// The team that is not the club.
    pub fn opponent(&self) -> &str {
        if self.is_home {
            &self.away_team
        } else {
            &self.home_team
        }
    }

    /// The coach name used in the question titles.
    pub fn coach_display_name(&self) -> &str {
        if self.coach.trim().is_empty() {
            "Manager"
        } else {
            &self.coach
        }
    }

    /// Names of the players who came off the bench, in event order.
    pub fn substitute_names(&self) -> Vec<String> {
        self.substitutions
            .iter()
            .map(|s| s.player_in.clone())
            .collect()
    }

    pub fn scalar_field(&self, field: MatchField) -> Option<&String> {
        match field {
            MatchField::HomeTeam => Some(&self.home_team),
            MatchField::AwayTeam => Some(&self.away_team),
            MatchField::Competition => Some(&self.competition),
            MatchField::Matchday => Some(&self.matchday),
            MatchField::Date => Some(&self.date),
            MatchField::Venue => Some(&self.venue),
            MatchField::Formation => Some(&self.formation),
            MatchField::Coach => Some(&self.coach),
            MatchField::StartingPlayers => None,
        }
    }

    pub(crate) fn scalar_field_mut(&mut self, field: MatchField) -> Option<&mut String> {
        match field {
            MatchField::HomeTeam => Some(&mut self.home_team),
            MatchField::AwayTeam => Some(&mut self.away_team),
            MatchField::Competition => Some(&mut self.competition),
            MatchField::Matchday => Some(&mut self.matchday),
            MatchField::Date => Some(&mut self.date),
            MatchField::Venue => Some(&mut self.venue),
            MatchField::Formation => Some(&mut self.formation),
            MatchField::Coach => Some(&mut self.coach),
            MatchField::StartingPlayers => None,
        }
    }

    /// The required fields that are empty, in a stable order.
    ///
    /// The starting lineup counts as missing unless it holds exactly
    /// eleven players.
    pub fn missing_fields(&self) -> Vec<MatchField> {
        let mut missing: Vec<MatchField> = MatchField::SCALARS
            .iter()
            .filter(|f| {
                self.scalar_field(**f)
                    .map(|v| v.trim().is_empty())
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        if self.starting_players.len() != STARTING_PLAYERS {
            missing.push(MatchField::StartingPlayers);
        }
        missing
    }

    /// Checks that the record is complete.
    pub fn into_complete(self) -> Result<MatchData, IncompleteMatch> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(self)
        } else {
            Err(IncompleteMatch {
                data: self,
                missing,
            })
        }
    }
}

/// A match record that still has gaps, together with the names of the
/// fields to fill.
#[derive(PartialEq, Debug, Clone)]
pub struct IncompleteMatch {
    pub data: MatchData,
    pub missing: Vec<MatchField>,
}

// ******** Compiled results *********

/// Mean and population standard deviation of a set of votes.
#[derive(PartialEq, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RatingStats {
    pub mean: f64,
    pub std_dev: f64,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PlayerRating {
    pub name: String,
    pub position: String,
    #[serde(default)]
    pub image_path: Option<String>,
    pub rating: RatingStats,
    pub is_starter: bool,
    #[serde(default)]
    pub goals: u32,
    #[serde(default)]
    pub assists: u32,
    #[serde(default)]
    pub own_goals: u32,
    #[serde(default)]
    pub is_motm: bool,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct MatchMetadata {
    pub opponent: String,
    pub competition: String,
    pub matchday: String,
    pub date: String,
    pub venue: String,
    pub home_score: u32,
    pub away_score: u32,
    #[serde(rename = "is_tottenham_home")]
    pub is_home: bool,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CoachRatings {
    pub name: String,
    pub starting_eleven: RatingStats,
    pub on_field_tactics: RatingStats,
    pub substitutions: RatingStats,
}

/// The compiled survey results for one match.
///
/// This is the record persisted as `results.json`.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CompiledResults {
    pub match_id: u64,
    #[serde(rename = "metadata")]
    pub match_metadata: MatchMetadata,
    pub team_rating: RatingStats,
    pub opponent_rating: RatingStats,
    pub referee_rating: RatingStats,
    pub coach_ratings: CoachRatings,
    pub overall_rating: f64,
    #[serde(rename = "starting_players", default)]
    pub starting_player_ratings: Vec<PlayerRating>,
    #[serde(rename = "substitute_players", default)]
    pub substitute_player_ratings: Vec<PlayerRating>,
    #[serde(default)]
    pub motm_winners: Vec<String>,
    #[serde(default)]
    pub total_responses: u64,
    #[serde(default = "default_formation")]
    pub formation: String,
}

fn default_formation() -> String {
    "4-3-3".to_string()
}

impl CompiledResults {
    /// Serializes the results in the storage format (pretty JSON).
    pub fn to_storage(&self) -> Result<String, RatingsError> {
        serde_json::to_string_pretty(self).map_err(|e| RatingsError::Storage(e.to_string()))
    }

    pub fn from_storage(contents: &str) -> Result<CompiledResults, RatingsError> {
        serde_json::from_str(contents).map_err(|e| RatingsError::Storage(e.to_string()))
    }

    /// Starters followed by substitutes.
    pub fn all_players(&self) -> impl Iterator<Item = &PlayerRating> {
        self.starting_player_ratings
            .iter()
            .chain(self.substitute_player_ratings.iter())
    }
}

/// Errors raised by the library.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum RatingsError {
    /// The stored content could not be read or written.
    Storage(String),
    /// A field name that does not designate a fillable scalar field.
    NotAScalarField(MatchField),
    /// A value that cannot be used to fill a field.
    InvalidValue { field: MatchField, value: String },
}

impl Error for RatingsError {}

impl Display for RatingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RatingsError::Storage(msg) => write!(f, "storage error: {}", msg),
            RatingsError::NotAScalarField(field) => {
                write!(f, "field {} cannot be set from a single value", field)
            }
            RatingsError::InvalidValue { field, value } => {
                write!(f, "invalid value {:?} for field {}", value, field)
            }
        }
    }
}
