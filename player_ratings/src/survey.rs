use log::debug;

use crate::model::MatchData;

/// The text of the header section, shown once at the top of the survey.
pub const RATING_SCALE_DESCRIPTION: &str = "Rating Scale Guide:\n\
0 — Worst Performance of the Year Contender\n\
1 — Abysmal\n\
2 — Very Poor\n\
3 — Poor\n\
4 — Below Average\n\
5 — Average\n\
6 — Above Average\n\
7 — Good\n\
8 — Very Good\n\
9 — Excellent\n\
10 — Perfect Performance";

pub const RATING_LOW_LABEL: &str = "Worst Performance of the Year Contender";
pub const RATING_HIGH_LABEL: &str = "Perfect Performance";

pub const RATING_MIN: u32 = 0;
pub const RATING_MAX: u32 = 10;

pub const MOTM_TITLE: &str = "Man of the Match";
pub const REFEREE_TITLE: &str = "Referee Rating";
pub const RATING_SCALE_TITLE: &str = "Rating Scale";

/// Every kind of section that can appear in a survey.
///
/// The player kinds carry the name of the player they are about.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum QuestionKind {
    RatingScale,
    TeamRating,
    OpponentRating,
    CoachStartingEleven,
    CoachTactics,
    CoachSubstitutions,
    RefereeRating,
    StarterRating(String),
    SubRating(String),
    ManOfTheMatch,
}

impl QuestionKind {
    /// A stable identifier of the kind, without the player name.
    pub fn tag(&self) -> &'static str {
        match self {
            QuestionKind::RatingScale => "rating_scale_description",
            QuestionKind::TeamRating => "team_rating",
            QuestionKind::OpponentRating => "opponent_rating",
            QuestionKind::CoachStartingEleven => "coach_starting_eleven",
            QuestionKind::CoachTactics => "coach_on_field_tactics",
            QuestionKind::CoachSubstitutions => "coach_substitutions",
            QuestionKind::RefereeRating => "referee_rating",
            QuestionKind::StarterRating(_) => "starter_rating",
            QuestionKind::SubRating(_) => "sub_rating",
            QuestionKind::ManOfTheMatch => "motm_vote",
        }
    }

    /// True for the questions answered on the 0-10 scale.
    pub fn is_rating(&self) -> bool {
        !matches!(self, QuestionKind::RatingScale | QuestionKind::ManOfTheMatch)
    }

    /// Resolves the display title of this kind of question for a match.
    ///
    /// The compiler looks up the answers with the same titles, so both sides
    /// must go through this function.
    pub fn title(&self, match_data: &MatchData) -> String {
        let coach = match_data.coach_display_name();
        match self {
            QuestionKind::RatingScale => RATING_SCALE_TITLE.to_string(),
            QuestionKind::TeamRating => format!("{} — Team Rating", match_data.club_team()),
            QuestionKind::OpponentRating => format!("{} — Team Rating", match_data.opponent()),
            QuestionKind::CoachStartingEleven => format!("{} — Starting Eleven Selection", coach),
            QuestionKind::CoachTactics => format!("{} — On-Field Tactics", coach),
            QuestionKind::CoachSubstitutions => format!("{} — Substitution Decisions", coach),
            QuestionKind::RefereeRating => REFEREE_TITLE.to_string(),
            QuestionKind::StarterRating(name) | QuestionKind::SubRating(name) => {
                player_rating_title(name)
            }
            QuestionKind::ManOfTheMatch => MOTM_TITLE.to_string(),
        }
    }
}

pub fn player_rating_title(name: &str) -> String {
    format!("{} — Rating", name)
}

/// One section of the survey.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Question {
    pub kind: QuestionKind,
    pub title: String,
    /// Only set for the header section.
    pub description: Option<String>,
    /// The legal answers. Empty for the header section.
    pub choices: Vec<String>,
}

/// The 0-10 integer choices of every rating question.
pub fn rating_choices() -> Vec<String> {
    (RATING_MIN..=RATING_MAX).map(|i| i.to_string()).collect()
}

/// Builds the ordered list of survey sections for a match.
///
/// The order is fixed: header, club team, opponent, the three coach
/// questions, referee, one question per starter, one per substitute who
/// came on, and the man of the match vote.
///
/// The man of the match options are the starters followed by the
/// substitutes, without removing duplicates.
///
/// ```
/// use player_ratings::{build_survey_structure, MatchData, PlayerInfo};
///
/// let md = MatchData {
///     match_id: 1,
///     home_team: "Tottenham Hotspur".to_string(),
///     away_team: "Newcastle United".to_string(),
///     competition: "Premier League".to_string(),
///     matchday: "Week 5".to_string(),
///     date: "2026-02-07".to_string(),
///     venue: "Tottenham Hotspur Stadium".to_string(),
///     formation: "4-3-3".to_string(),
///     coach: "Ange Postecoglou".to_string(),
///     starting_players: (1..=11).map(|i| PlayerInfo::new(&format!("Starter {}", i), "MF")).collect(),
///     substitutions: vec![],
///     goals: vec![],
///     is_home: true,
///     home_score: None,
///     away_score: None,
/// };
/// let sections = build_survey_structure(&md);
/// assert_eq!(sections.len(), 7 + 11 + 1);
/// assert_eq!(sections[2].title, "Newcastle United — Team Rating");
/// ```
pub fn build_survey_structure(match_data: &MatchData) -> Vec<Question> {
    let mut kinds: Vec<QuestionKind> = vec![
        QuestionKind::RatingScale,
        QuestionKind::TeamRating,
        QuestionKind::OpponentRating,
        QuestionKind::CoachStartingEleven,
        QuestionKind::CoachTactics,
        QuestionKind::CoachSubstitutions,
        QuestionKind::RefereeRating,
    ];
    kinds.extend(
        match_data
            .starting_players
            .iter()
            .map(|p| QuestionKind::StarterRating(p.name.clone())),
    );
    let sub_names = match_data.substitute_names();
    kinds.extend(sub_names.iter().cloned().map(QuestionKind::SubRating));
    kinds.push(QuestionKind::ManOfTheMatch);

    let motm_choices: Vec<String> = match_data
        .starting_players
        .iter()
        .map(|p| p.name.clone())
        .chain(sub_names)
        .collect();

    let sections: Vec<Question> = kinds
        .into_iter()
        .map(|kind| {
            let title = kind.title(match_data);
            let (description, choices) = match kind {
                QuestionKind::RatingScale => (Some(RATING_SCALE_DESCRIPTION.to_string()), vec![]),
                QuestionKind::ManOfTheMatch => (None, motm_choices.clone()),
                _ => (None, rating_choices()),
            };
            Question {
                kind,
                title,
                description,
                choices,
            }
        })
        .collect();
    debug!(
        "build_survey_structure: match {}: {} sections",
        match_data.match_id,
        sections.len()
    );
    sections
}

/// The title of the form created for a match.
pub fn form_title(match_data: &MatchData) -> String {
    format!(
        "r/coys Post-Match Ratings | Tottenham vs {} | {} {} | {}",
        match_data.opponent(),
        match_data.competition,
        match_data.matchday,
        match_data.date
    )
}
