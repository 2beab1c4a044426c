/*!

Post-match player ratings: survey structure, rating statistics and results
compilation.

The typical flow is:
1. build the survey sections for a match with [`build_survey_structure`],
2. collect the answers (one map from question title to answer per respondent),
3. turn them into a [`CompiledResults`] with [`compile_responses`].

See the [manual] for the file formats.
*/

pub mod archive;
pub mod builder;
pub mod formations;
pub mod manual;
mod model;
mod survey;

use log::{debug, info};

use std::collections::{BTreeMap, HashMap, HashSet};

pub use crate::archive::{filter_matches, sort_matches, IndexEntry, MatchFilter};
pub use crate::model::*;
pub use crate::survey::*;

/// The answers of one respondent, keyed by question title.
pub type Response = HashMap<String, String>;

// **** Statistics ****

impl RatingStats {
    pub const EMPTY: RatingStats = RatingStats {
        mean: 0.0,
        std_dev: 0.0,
    };

    /// Computes the mean and population standard deviation of the votes.
    ///
    /// Returns `None` when there are no votes.
    ///
    /// ```
    /// use player_ratings::RatingStats;
    ///
    /// let stats = RatingStats::from_votes(&[7, 5]).unwrap();
    /// assert_eq!(stats, RatingStats { mean: 6.0, std_dev: 1.0 });
    /// assert_eq!(RatingStats::from_votes(&[]), None);
    /// ```
    pub fn from_votes(votes: &[u32]) -> Option<RatingStats> {
        if votes.is_empty() {
            return None;
        }
        let n = votes.len() as f64;
        let mean = votes.iter().map(|v| *v as f64).sum::<f64>() / n;
        let variance = votes
            .iter()
            .map(|v| {
                let d = *v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        Some(RatingStats {
            mean,
            std_dev: variance.sqrt(),
        })
    }
}

/// Returns the names with the highest number of votes, sorted.
///
/// Votes are trimmed and blank votes are ignored. Ties are all kept.
///
/// ```
/// use player_ratings::determine_winners;
///
/// assert_eq!(determine_winners(&["A", "A", "B"]), vec!["A"]);
/// assert_eq!(determine_winners(&["B", "A"]), vec!["A", "B"]);
/// assert!(determine_winners::<&str>(&[]).is_empty());
/// ```
pub fn determine_winners<S: AsRef<str>>(votes: &[S]) -> Vec<String> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for v in votes.iter() {
        let name = v.as_ref().trim();
        if !name.is_empty() {
            *counts.entry(name).or_insert(0) += 1;
        }
    }
    let max_count = match counts.values().max() {
        Some(m) => *m,
        None => return vec![],
    };
    counts
        .iter()
        .filter(|(_, count)| **count == max_count)
        .map(|(name, _)| name.to_string())
        .collect()
}

// **** Compilation ****

/// Reads a 0-10 rating out of a free-form answer.
fn parse_rating(raw: &str) -> Option<u32> {
    match raw.trim().parse::<i64>() {
        Ok(x) if (RATING_MIN as i64..=RATING_MAX as i64).contains(&x) => Some(x as u32),
        _ => None,
    }
}

/// All the valid ratings given to one question.
fn collect_ratings(responses: &[Response], title: &str) -> Vec<u32> {
    let mut values: Vec<u32> = Vec::new();
    for resp in responses.iter() {
        if let Some(raw) = resp.get(title) {
            match parse_rating(raw) {
                Some(x) => values.push(x),
                None if raw.trim().is_empty() => {}
                None => debug!("collect_ratings: {:?}: skipping answer {:?}", title, raw),
            }
        }
    }
    values
}

fn stats_for(responses: &[Response], title: &str) -> RatingStats {
    let values = collect_ratings(responses, title);
    let stats = RatingStats::from_votes(&values).unwrap_or(RatingStats::EMPTY);
    debug!(
        "stats_for: {:?}: {} ratings -> {:?}",
        title,
        values.len(),
        stats
    );
    stats
}

#[derive(Default)]
struct Contributions {
    goals: u32,
    assists: u32,
    own_goals: u32,
}

fn contributions(match_data: &MatchData) -> HashMap<&str, Contributions> {
    let mut res: HashMap<&str, Contributions> = HashMap::new();
    for g in match_data.goals.iter() {
        if g.own_goal {
            res.entry(g.scorer.as_str()).or_default().own_goals += 1;
        } else {
            res.entry(g.scorer.as_str()).or_default().goals += 1;
            if let Some(assist) = &g.assist {
                res.entry(assist.as_str()).or_default().assists += 1;
            }
        }
    }
    res
}

/// Compiles the raw survey answers of a match into statistics.
///
/// Arguments:
/// * `responses` the answers, one map per respondent, keyed by question title
/// * `match_data` the match the survey was generated from
///
/// Answers that are not integers between 0 and 10 are ignored. A question
/// without any valid answer gets zero statistics.
pub fn compile_responses(responses: &[Response], match_data: &MatchData) -> CompiledResults {
    info!(
        "Compiling {} responses for match {}",
        responses.len(),
        match_data.match_id
    );
    let stats = |kind: QuestionKind| stats_for(responses, &kind.title(match_data));

    let team_rating = stats(QuestionKind::TeamRating);
    let opponent_rating = stats(QuestionKind::OpponentRating);
    let referee_rating = stats(QuestionKind::RefereeRating);
    let coach_ratings = CoachRatings {
        name: match_data.coach_display_name().to_string(),
        starting_eleven: stats(QuestionKind::CoachStartingEleven),
        on_field_tactics: stats(QuestionKind::CoachTactics),
        substitutions: stats(QuestionKind::CoachSubstitutions),
    };

    let contribs = contributions(match_data);
    let rating_for = |name: &str,
                      position: &str,
                      image_path: Option<String>,
                      kind: QuestionKind,
                      is_starter: bool| {
        let c = contribs.get(name);
        PlayerRating {
            name: name.to_string(),
            position: position.to_string(),
            image_path,
            rating: stats(kind),
            is_starter,
            goals: c.map(|c| c.goals).unwrap_or(0),
            assists: c.map(|c| c.assists).unwrap_or(0),
            own_goals: c.map(|c| c.own_goals).unwrap_or(0),
            is_motm: false,
        }
    };

    let mut starting_player_ratings: Vec<PlayerRating> = match_data
        .starting_players
        .iter()
        .map(|p| {
            rating_for(
                &p.name,
                &p.position,
                p.image_path.clone(),
                QuestionKind::StarterRating(p.name.clone()),
                true,
            )
        })
        .collect();
    let mut substitute_player_ratings: Vec<PlayerRating> = match_data
        .substitute_names()
        .into_iter()
        .map(|name| {
            rating_for(
                &name,
                "SUB",
                None,
                QuestionKind::SubRating(name.clone()),
                false,
            )
        })
        .collect();

    let player_means: Vec<f64> = starting_player_ratings
        .iter()
        .chain(substitute_player_ratings.iter())
        .map(|p| p.rating.mean)
        .collect();
    let overall_rating = if player_means.is_empty() {
        0.0
    } else {
        player_means.iter().sum::<f64>() / player_means.len() as f64
    };

    let motm_votes: Vec<&str> = responses
        .iter()
        .filter_map(|r| r.get(MOTM_TITLE).map(|s| s.as_str()))
        .collect();
    let motm_winners = determine_winners(&motm_votes);
    let motm_set: HashSet<&str> = motm_winners.iter().map(|s| s.as_str()).collect();
    for p in starting_player_ratings
        .iter_mut()
        .chain(substitute_player_ratings.iter_mut())
    {
        p.is_motm = motm_set.contains(p.name.as_str());
    }
    info!(
        "Match {}: overall rating {:.2}, man of the match: {:?}",
        match_data.match_id, overall_rating, motm_winners
    );

    let match_metadata = MatchMetadata {
        opponent: match_data.opponent().to_string(),
        competition: match_data.competition.clone(),
        matchday: match_data.matchday.clone(),
        date: match_data.date.clone(),
        venue: match_data.venue.clone(),
        home_score: match_data.home_score.unwrap_or(0),
        away_score: match_data.away_score.unwrap_or(0),
        is_home: match_data.is_home,
    };

    CompiledResults {
        match_id: match_data.match_id,
        match_metadata,
        team_rating,
        opponent_rating,
        referee_rating,
        coach_ratings,
        overall_rating,
        starting_player_ratings,
        substitute_player_ratings,
        motm_winners,
        total_responses: responses.len() as u64,
        formation: match_data.formation.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn make_match_data(num_starters: usize, subs: &[(&str, &str, u32)]) -> MatchData {
        MatchData {
            match_id: 1,
            home_team: "Tottenham Hotspur".to_string(),
            away_team: "Newcastle".to_string(),
            competition: "Premier League".to_string(),
            matchday: "Week 3".to_string(),
            date: "2024-09-01".to_string(),
            venue: "Tottenham Hotspur Stadium".to_string(),
            formation: "4-3-3".to_string(),
            coach: "Postecoglou".to_string(),
            starting_players: (0..num_starters)
                .map(|i| PlayerInfo::new(&format!("Player{}", i + 1), "MF"))
                .collect(),
            substitutions: subs
                .iter()
                .map(|(pin, pout, minute)| SubstitutionEvent {
                    player_in: pin.to_string(),
                    player_out: pout.to_string(),
                    minute: *minute,
                })
                .collect(),
            goals: vec![],
            is_home: true,
            home_score: Some(2),
            away_score: Some(1),
        }
    }

    fn response(pairs: &[(&str, &str)]) -> Response {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn stats_textbook_values() {
        let s = RatingStats::from_votes(&[2, 4, 4, 4, 5, 5, 7, 9]).unwrap();
        assert!(close(s.mean, 5.0));
        assert!(close(s.std_dev, 2.0));

        let s = RatingStats::from_votes(&[7]).unwrap();
        assert_eq!(s.mean, 7.0);
        assert_eq!(s.std_dev, 0.0);

        let s = RatingStats::from_votes(&[0, 10]).unwrap();
        assert!(close(s.mean, 5.0));
        assert!(close(s.std_dev, 5.0));
    }

    #[test]
    fn stats_match_a_direct_computation() {
        let cases: Vec<Vec<u32>> = vec![
            vec![1, 2, 3],
            vec![10, 10, 10, 10],
            vec![0, 3, 7, 7, 8, 10, 1],
            (0..=10).collect(),
        ];
        for votes in cases.iter() {
            let s = RatingStats::from_votes(votes).unwrap();
            let n = votes.len() as f64;
            let mean = votes.iter().sum::<u32>() as f64 / n;
            let var = votes
                .iter()
                .map(|v| (*v as f64 - mean).powi(2))
                .sum::<f64>()
                / n;
            assert!(close(s.mean, mean), "{:?}", votes);
            assert!(close(s.std_dev, var.sqrt()), "{:?}", votes);
        }
    }

    #[test]
    fn winners() {
        assert_eq!(determine_winners(&["A", "A", "B"]), vec!["A"]);
        assert_eq!(determine_winners(&["A", "B"]), vec!["A", "B"]);
        assert_eq!(determine_winners(&["C", "B", "C", "B", "A"]), vec!["B", "C"]);
        assert_eq!(determine_winners(&[" A ", "", "  ", "A", "B"]), vec!["A"]);
        assert!(determine_winners(&["", " "]).is_empty());
        let empty: Vec<String> = vec![];
        assert!(determine_winners(&empty).is_empty());
    }

    #[test]
    fn rating_parsing() {
        assert_eq!(parse_rating("7"), Some(7));
        assert_eq!(parse_rating(" 10 "), Some(10));
        assert_eq!(parse_rating("0"), Some(0));
        assert_eq!(parse_rating("11"), None);
        assert_eq!(parse_rating("-1"), None);
        assert_eq!(parse_rating("7.5"), None);
        assert_eq!(parse_rating("seven"), None);
        assert_eq!(parse_rating(""), None);
    }

    #[test]
    fn compile_basic() {
        init();
        let md = make_match_data(2, &[]);
        let responses = vec![
            response(&[
                ("Tottenham Hotspur — Team Rating", "7"),
                ("Newcastle — Team Rating", "5"),
                ("Referee Rating", "6"),
                ("Postecoglou — Starting Eleven Selection", "8"),
                ("Postecoglou — On-Field Tactics", "7"),
                ("Postecoglou — Substitution Decisions", "6"),
                ("Player1 — Rating", "8"),
                ("Player2 — Rating", "6"),
                ("Man of the Match", "Player1"),
            ]),
            response(&[
                ("Tottenham Hotspur — Team Rating", "5"),
                ("Newcastle — Team Rating", "7"),
                ("Referee Rating", "4"),
                ("Postecoglou — Starting Eleven Selection", "6"),
                ("Postecoglou — On-Field Tactics", "5"),
                ("Postecoglou — Substitution Decisions", "4"),
                ("Player1 — Rating", "6"),
                ("Player2 — Rating", "8"),
                ("Man of the Match", "Player1"),
            ]),
        ];
        let res = compile_responses(&responses, &md);
        assert_eq!(res.total_responses, 2);
        assert_eq!(res.match_id, 1);
        assert_eq!(res.formation, "4-3-3");
        assert_eq!(
            res.team_rating,
            RatingStats {
                mean: 6.0,
                std_dev: 1.0
            }
        );
        assert!(close(res.opponent_rating.mean, 6.0));
        assert!(close(res.referee_rating.mean, 5.0));
        assert!(close(res.coach_ratings.starting_eleven.mean, 7.0));
        assert!(close(res.coach_ratings.substitutions.mean, 5.0));
        assert_eq!(res.coach_ratings.name, "Postecoglou");
        assert!(close(res.starting_player_ratings[0].rating.mean, 7.0));
        assert!(close(res.starting_player_ratings[1].rating.mean, 7.0));
        assert!(close(res.overall_rating, 7.0));
        assert_eq!(res.motm_winners, vec!["Player1"]);
        assert!(res.starting_player_ratings[0].is_motm);
        assert!(!res.starting_player_ratings[1].is_motm);
        assert_eq!(res.match_metadata.opponent, "Newcastle");
        assert_eq!(res.match_metadata.home_score, 2);
    }

    #[test]
    fn compile_with_subs() {
        let md = make_match_data(2, &[("SubPlayer", "Player2", 60)]);
        let responses = vec![response(&[
            ("Player1 — Rating", "8"),
            ("Player2 — Rating", "6"),
            ("SubPlayer — Rating", "7"),
            ("Man of the Match", "SubPlayer"),
        ])];
        let res = compile_responses(&responses, &md);
        assert_eq!(res.substitute_player_ratings.len(), 1);
        let sub = &res.substitute_player_ratings[0];
        assert_eq!(sub.name, "SubPlayer");
        assert_eq!(sub.position, "SUB");
        assert!(!sub.is_starter);
        assert!(sub.is_motm);
        assert!(close(sub.rating.mean, 7.0));
        assert!(close(res.overall_rating, 7.0));
    }

    #[test]
    fn compile_motm_tie() {
        let md = make_match_data(2, &[]);
        let responses = vec![
            response(&[("Man of the Match", "Player2")]),
            response(&[("Man of the Match", "Player1")]),
        ];
        let res = compile_responses(&responses, &md);
        assert_eq!(res.motm_winners, vec!["Player1", "Player2"]);
        assert!(res.starting_player_ratings.iter().all(|p| p.is_motm));
    }

    #[test]
    fn compile_without_responses() {
        let md = make_match_data(2, &[]);
        let res = compile_responses(&[], &md);
        assert_eq!(res.total_responses, 0);
        assert_eq!(res.team_rating, RatingStats::EMPTY);
        assert!(res.motm_winners.is_empty());
        assert_eq!(res.overall_rating, 0.0);
    }

    #[test]
    fn compile_without_players() {
        let md = make_match_data(0, &[]);
        let res = compile_responses(&[response(&[("Referee Rating", "3")])], &md);
        assert_eq!(res.overall_rating, 0.0);
        assert!(close(res.referee_rating.mean, 3.0));
    }

    #[test]
    fn compile_skips_invalid_answers() {
        let md = make_match_data(1, &[]);
        let responses = vec![
            response(&[("Player1 — Rating", "9")]),
            response(&[("Player1 — Rating", "")]),
            response(&[("Player1 — Rating", "great")]),
            response(&[("Player1 — Rating", "12")]),
            response(&[("Player1 — Rating", " 5 ")]),
        ];
        let res = compile_responses(&responses, &md);
        let r = res.starting_player_ratings[0].rating;
        assert!(close(r.mean, 7.0));
        assert!(close(r.std_dev, 2.0));
        assert_eq!(res.total_responses, 5);
    }

    #[test]
    fn compile_counts_goal_contributions() {
        let mut md = make_match_data(3, &[("SubPlayer", "Player3", 70)]);
        md.goals = vec![
            GoalEvent {
                scorer: "Player1".to_string(),
                assist: Some("Player2".to_string()),
                minute: 12,
                own_goal: false,
            },
            GoalEvent {
                scorer: "Player1".to_string(),
                assist: None,
                minute: 55,
                own_goal: false,
            },
            GoalEvent {
                scorer: "SubPlayer".to_string(),
                assist: None,
                minute: 80,
                own_goal: true,
            },
        ];
        let res = compile_responses(&[], &md);
        let p = &res.starting_player_ratings;
        assert_eq!((p[0].goals, p[0].assists, p[0].own_goals), (2, 0, 0));
        assert_eq!((p[1].goals, p[1].assists, p[1].own_goals), (0, 1, 0));
        assert_eq!(p[2].goals, 0);
        assert_eq!(res.substitute_player_ratings[0].own_goals, 1);
    }

    #[test]
    fn compiled_titles_follow_the_survey() {
        // Every rating answer keyed by the survey's own titles is picked up.
        let md = make_match_data(11, &[("SubPlayer", "Player2", 60)]);
        let sections = build_survey_structure(&md);
        let answers: Response = sections
            .iter()
            .filter(|s| s.kind.is_rating())
            .map(|s| (s.title.clone(), "4".to_string()))
            .collect();
        let res = compile_responses(&[answers], &md);
        assert!(res.all_players().all(|p| close(p.rating.mean, 4.0)));
        assert!(close(res.team_rating.mean, 4.0));
        assert!(close(res.opponent_rating.mean, 4.0));
        assert!(close(res.referee_rating.mean, 4.0));
        assert!(close(res.coach_ratings.on_field_tactics.mean, 4.0));
    }

    #[test]
    fn storage_round_trip() {
        let md = make_match_data(2, &[("SubPlayer", "Player2", 60)]);
        let responses = vec![
            response(&[("Player1 — Rating", "8"), ("Man of the Match", "Player1")]),
            response(&[("Player1 — Rating", "3"), ("SubPlayer — Rating", "9")]),
            response(&[("Player1 — Rating", "6"), ("Referee Rating", "1")]),
        ];
        let res = compile_responses(&responses, &md);
        let stored = res.to_storage().unwrap();
        let back = CompiledResults::from_storage(&stored).unwrap();
        assert_eq!(back, res);
        assert_eq!(back.starting_player_ratings.len(), 2);
    }

    #[test]
    fn storage_uses_the_results_keys() {
        let res = compile_responses(&[], &make_match_data(1, &[]));
        let js: serde_json::Value = serde_json::from_str(&res.to_storage().unwrap()).unwrap();
        for key in [
            "match_id",
            "metadata",
            "team_rating",
            "opponent_rating",
            "referee_rating",
            "coach_ratings",
            "overall_rating",
            "starting_players",
            "substitute_players",
            "motm_winners",
            "total_responses",
            "formation",
        ] {
            assert!(js.get(key).is_some(), "missing key {}", key);
        }
        assert_eq!(js["metadata"]["is_tottenham_home"], serde_json::json!(true));
    }

    #[test]
    fn storage_defaults_for_optional_keys() {
        let js = r#"{
            "match_id": 3,
            "metadata": {"opponent": "Arsenal", "competition": "PL", "matchday": "1",
                         "date": "2024-09-15", "venue": "Home", "home_score": 0,
                         "away_score": 1, "is_tottenham_home": true},
            "team_rating": {"mean": 4.0, "std_dev": 1.0},
            "opponent_rating": {"mean": 7.0, "std_dev": 1.0},
            "referee_rating": {"mean": 5.0, "std_dev": 1.0},
            "coach_ratings": {"name": "Ange",
                              "starting_eleven": {"mean": 5.0, "std_dev": 0.0},
                              "on_field_tactics": {"mean": 5.0, "std_dev": 0.0},
                              "substitutions": {"mean": 5.0, "std_dev": 0.0}},
            "overall_rating": 5.5
        }"#;
        let res = CompiledResults::from_storage(js).unwrap();
        assert_eq!(res.formation, "4-3-3");
        assert_eq!(res.total_responses, 0);
        assert!(res.starting_player_ratings.is_empty());
        assert!(CompiledResults::from_storage("{}").is_err());
    }
}
