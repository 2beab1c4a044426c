use log::{debug, info, warn};

use crate::pipeline::config_reader::Settings;
use crate::pipeline::io_common::*;
use crate::pipeline::*;

use serde_json::Value as JSValue;
use std::collections::HashSet;

/// ESPN position abbreviation to the short position codes.
const POSITION_MAP: &[(&str, &str)] = &[
    ("G", "GK"),
    ("D", "CB"),
    ("CD", "CB"),
    ("CD-L", "CB"),
    ("CD-R", "CB"),
    ("LB", "LB"),
    ("RB", "RB"),
    ("DM", "DM"),
    ("CM", "CM"),
    ("AM", "AM"),
    ("LM", "LM"),
    ("RM", "RM"),
    ("LW", "LW"),
    ("RW", "RW"),
    ("LF", "LW"),
    ("RF", "RW"),
    ("F", "FW"),
    ("CF", "FW"),
    ("SS", "FW"),
];

pub fn short_position(abbreviation: Option<&str>) -> &'static str {
    abbreviation
        .and_then(|a| POSITION_MAP.iter().find(|(k, _)| *k == a))
        .map(|(_, v)| *v)
        .unwrap_or("MF")
}

/// Parses a clock display such as `32'` or `90'+2'`. Anything else is minute 0.
pub fn parse_minute(clock: &str) -> u32 {
    let clean: String = clock
        .chars()
        .filter(|c| *c != '\'' && *c != '\u{2019}')
        .collect();
    let clean = clean.trim();
    match clean.split_once('+') {
        Some((base, extra)) => match (base.trim().parse::<u32>(), extra.trim().parse::<u32>()) {
            (Ok(b), Ok(e)) => b.checked_add(e).unwrap_or(0),
            _ => 0,
        },
        None => clean.parse::<u32>().unwrap_or(0),
    }
}

/// The club whose matches are fetched.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Club {
    pub name: String,
    pub espn_id: String,
}

impl Club {
    pub fn from_settings(settings: &Settings) -> Club {
        Club {
            name: settings.club_name.clone(),
            espn_id: settings.espn_team_id.clone(),
        }
    }
}

pub fn summary_url(base_url: &str, league: &str) -> String {
    format!("{}/{}/summary", base_url.trim_end_matches('/'), league)
}

pub fn scoreboard_url(base_url: &str, league: &str) -> String {
    format!("{}/{}/scoreboard", base_url.trim_end_matches('/'), league)
}

/// Fetches a match summary from ESPN.
pub fn fetch_match_data(settings: &Settings, event_id: u64, league: &str) -> PipelineResult<MatchData> {
    let url = summary_url(&settings.espn_base_url, league);
    info!("Fetching ESPN summary {} for event {}", url, event_id);
    let resp = http_client()?
        .get(&url)
        .query(&[("event", event_id.to_string())])
        .send()
        .context(HttpSnafu { url: url.clone() })?;
    let js = response_json(resp, &url)?;
    parse_summary(&js, event_id, &Club::from_settings(settings))
}

/// Looks for the club's event on a day (`YYYY-MM-DD`).
pub fn find_club_match(settings: &Settings, date: &str, league: &str) -> PipelineResult<Option<u64>> {
    let url = scoreboard_url(&settings.espn_base_url, league);
    let ymd = date.replace('-', "");
    info!("Fetching ESPN scoreboard {} for {}", url, ymd);
    let resp = http_client()?
        .get(&url)
        .query(&[("dates", ymd)])
        .send()
        .context(HttpSnafu { url: url.clone() })?;
    let js = response_json(resp, &url)?;
    Ok(parse_scoreboard(&js, &Club::from_settings(settings)))
}

/// The id of the first event in which the club is a competitor.
pub fn parse_scoreboard(js: &JSValue, club: &Club) -> Option<u64> {
    let events = js["events"].as_array()?;
    for event in events.iter() {
        let has_club = event["competitions"]
            .as_array()
            .into_iter()
            .flatten()
            .flat_map(|comp| comp["competitors"].as_array().into_iter().flatten())
            .any(|team| js_str(&team["team"]["id"]).as_deref() == Some(club.espn_id.as_str()));
        if has_club {
            let id = js_str(&event["id"]).and_then(|s| s.parse::<u64>().ok());
            debug!("parse_scoreboard: found event {:?}", id);
            if id.is_some() {
                return id;
            }
        }
    }
    None
}

static NULL_JS: JSValue = JSValue::Null;

fn competitor<'a>(competitors: &[&'a JSValue], home_away: &str) -> &'a JSValue {
    competitors
        .iter()
        .find(|c| c["homeAway"].as_str() == Some(home_away))
        .copied()
        .unwrap_or(&NULL_JS)
}

fn display_name(js: &JSValue) -> String {
    js["athlete"]["displayName"]
        .as_str()
        .unwrap_or("")
        .to_string()
}

/// Converts an ESPN summary into match data.
///
/// Only the club's players are kept. Fields ESPN does not report are left
/// empty (the coach always is).
pub fn parse_summary(js: &JSValue, event_id: u64, club: &Club) -> PipelineResult<MatchData> {
    let header = &js["header"];
    let comp = match header["competitions"].as_array().and_then(|l| l.first()) {
        Some(c) => c,
        None => whatever!("No competition data in ESPN response for event {}", event_id),
    };

    let competitors: Vec<&JSValue> = comp["competitors"].as_array().into_iter().flatten().collect();
    let (home, away) = (
        competitor(&competitors, "home"),
        competitor(&competitors, "away"),
    );

    let home_team = home["team"]["displayName"].as_str().unwrap_or("").to_string();
    let away_team = away["team"]["displayName"].as_str().unwrap_or("").to_string();
    let club_id = Some(club.espn_id.clone());
    let is_home = if js_str(&home["team"]["id"]) == club_id {
        true
    } else if js_str(&away["team"]["id"]) == club_id {
        false
    } else {
        return NotAClubMatchSnafu {
            club: club.name.clone(),
            team_id: club.espn_id.clone(),
            home: home_team,
            away: away_team,
        }
        .fail();
    };

    let competition = header["league"]["name"].as_str().unwrap_or("").to_string();
    let date: String = comp["date"].as_str().unwrap_or("").chars().take(10).collect();
    let venue = js["gameInfo"]["venue"]["fullName"]
        .as_str()
        .unwrap_or("")
        .to_string();
    let matchday = match &header["season"] {
        JSValue::Object(season) => format!(
            "Matchday {}",
            season.get("type").and_then(js_str).unwrap_or_default()
        ),
        _ => "".to_string(),
    };

    // The club's roster
    let roster: Vec<&JSValue> = js["rosters"]
        .as_array()
        .into_iter()
        .flatten()
        .find(|r| js_str(&r["team"]["id"]) == club_id)
        .and_then(|r| r["roster"].as_array())
        .map(|l| l.iter().collect())
        .unwrap_or_default();

    let starting_players: Vec<PlayerInfo> = roster
        .iter()
        .filter(|p| p["starter"].as_bool().unwrap_or(false))
        .map(|p| PlayerInfo {
            name: display_name(p),
            position: short_position(p["position"]["abbreviation"].as_str()).to_string(),
            image_path: None,
            shirt_number: read_js_u32(&p["jersey"]),
        })
        .collect();
    let club_players: HashSet<String> = roster.iter().map(|p| display_name(p)).collect();

    let (substitutions, goals) = parse_key_events(&js["keyEvents"], club, &club_players);

    let formation = js["boxscore"]["form"]
        .as_array()
        .into_iter()
        .flatten()
        .find(|f| js_str(&f["team"]["id"]) == club_id)
        .and_then(|f| f["formation"].as_str())
        .unwrap_or("")
        .to_string();

    let md = MatchData {
        match_id: event_id,
        home_team,
        away_team,
        competition,
        matchday,
        date,
        venue,
        formation,
        coach: "".to_string(),
        starting_players,
        substitutions,
        goals,
        is_home,
        home_score: read_js_u32(&home["score"]).or(Some(0)),
        away_score: read_js_u32(&away["score"]).or(Some(0)),
    };
    info!(
        "Parsed event {}: {} vs {} ({} starters, {} substitutions, {} goals)",
        event_id,
        md.home_team,
        md.away_team,
        md.starting_players.len(),
        md.substitutions.len(),
        md.goals.len()
    );
    if md.starting_players.len() != STARTING_PLAYERS {
        warn!(
            "Found {} starters for {} in event {}",
            md.starting_players.len(),
            club.name,
            event_id
        );
    }
    Ok(md)
}

fn parse_key_events(
    events: &JSValue,
    club: &Club,
    club_players: &HashSet<String>,
) -> (Vec<SubstitutionEvent>, Vec<GoalEvent>) {
    let mut substitutions: Vec<SubstitutionEvent> = Vec::new();
    let mut goals: Vec<GoalEvent> = Vec::new();
    for ev in events.as_array().into_iter().flatten() {
        let ev_type = ev["type"]["text"].as_str().unwrap_or("");
        let lowered = ev_type.to_lowercase();
        let for_club = js_str(&ev["team"]["id"]).as_deref() == Some(club.espn_id.as_str());
        let participants: Vec<String> = ev["participants"]
            .as_array()
            .into_iter()
            .flatten()
            .map(display_name)
            .collect();
        let minute = parse_minute(ev["clock"]["displayValue"].as_str().unwrap_or("0"));

        if ev_type == "Substitution" {
            if !for_club {
                continue;
            }
            if let [player_in, player_out, ..] = participants.as_slice() {
                substitutions.push(SubstitutionEvent {
                    player_in: player_in.clone(),
                    player_out: player_out.clone(),
                    minute,
                });
            } else {
                debug!("parse_key_events: substitution without two players: {:?}", ev);
            }
        } else if lowered.contains("own goal") {
            match participants.first() {
                Some(scorer) if club_players.contains(scorer) => goals.push(GoalEvent {
                    scorer: scorer.clone(),
                    assist: None,
                    minute,
                    own_goal: true,
                }),
                _ => {}
            }
        } else if ev["scoringPlay"].as_bool() == Some(true)
            || lowered.starts_with("goal")
            || lowered.contains("penalty - scored")
        {
            if !for_club {
                continue;
            }
            if let Some(scorer) = participants.first() {
                goals.push(GoalEvent {
                    scorer: scorer.clone(),
                    assist: participants.get(1).cloned(),
                    minute,
                    own_goal: false,
                });
            }
        }
    }
    (substitutions, goals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn club() -> Club {
        Club {
            name: "Tottenham Hotspur".to_string(),
            espn_id: "367".to_string(),
        }
    }

    fn athlete(name: &str) -> JSValue {
        json!({"athlete": {"displayName": name}})
    }

    fn summary(spurs_home: bool) -> JSValue {
        let spurs = json!({"id": "367", "displayName": "Tottenham Hotspur"});
        let other = json!({"id": 360, "displayName": "Manchester United"});
        let (home, away) = if spurs_home {
            (spurs, other)
        } else {
            (other, spurs)
        };
        let positions = ["G", "RB", "CD-R", "CD-L", "LB", "DM", "CM", "AM", "RF", "CF", "XX"];
        let mut roster: Vec<JSValue> = positions
            .iter()
            .enumerate()
            .map(|(i, pos)| {
                json!({
                    "starter": true,
                    "jersey": (i + 1).to_string(),
                    "athlete": {"displayName": format!("Starter {}", i + 1)},
                    "position": {"abbreviation": pos}
                })
            })
            .collect();
        roster.push(json!({"starter": false, "athlete": {"displayName": "Bench 1"}}));
        json!({
            "header": {
                "competitions": [{
                    "date": "2026-02-07T17:30Z",
                    "competitors": [
                        {"homeAway": "home", "team": home, "score": "2"},
                        {"homeAway": "away", "team": away, "score": 1}
                    ]
                }],
                "league": {"name": "English Premier League"},
                "season": {"year": 2026, "type": 12654}
            },
            "gameInfo": {"venue": {"fullName": "Old Trafford"}},
            "rosters": [
                {"team": {"id": "360"}, "roster": [
                    {"starter": true, "athlete": {"displayName": "Someone Else"}, "position": {"abbreviation": "G"}}
                ]},
                {"team": {"id": "367"}, "roster": roster}
            ],
            "keyEvents": [
                {"type": {"text": "Goal"}, "scoringPlay": true, "team": {"id": "367"},
                 "clock": {"displayValue": "32'"},
                 "participants": [athlete("Starter 10"), athlete("Starter 8")]},
                {"type": {"text": "Substitution"}, "team": {"id": "367"},
                 "clock": {"displayValue": "61'"},
                 "participants": [athlete("Bench 1"), athlete("Starter 9")]},
                {"type": {"text": "Substitution"}, "team": {"id": "360"},
                 "clock": {"displayValue": "70'"},
                 "participants": [athlete("Other In"), athlete("Other Out")]},
                {"type": {"text": "Goal - Header"}, "scoringPlay": true, "team": {"id": "360"},
                 "clock": {"displayValue": "80'"},
                 "participants": [athlete("Someone Else")]},
                {"type": {"text": "Own Goal"}, "scoringPlay": true, "team": {"id": "360"},
                 "clock": {"displayValue": "90'+2'"},
                 "participants": [athlete("Starter 3")]},
                {"type": {"text": "Substitution"}, "team": {"id": "367"},
                 "clock": {"displayValue": "88'"},
                 "participants": [athlete("Lonely")]}
            ],
            "boxscore": {"form": [{"team": {"id": "367"}, "formation": "4-2-3-1"}]}
        })
    }

    #[test]
    fn positions() {
        assert_eq!(short_position(Some("G")), "GK");
        assert_eq!(short_position(Some("CD-L")), "CB");
        assert_eq!(short_position(Some("LF")), "LW");
        assert_eq!(short_position(Some("SS")), "FW");
        assert_eq!(short_position(Some("??")), "MF");
        assert_eq!(short_position(None), "MF");
    }

    #[test]
    fn minutes() {
        assert_eq!(parse_minute("32'"), 32);
        assert_eq!(parse_minute("90'+2'"), 92);
        assert_eq!(parse_minute("45'+1'"), 46);
        assert_eq!(parse_minute(""), 0);
        assert_eq!(parse_minute("HT"), 0);
        assert_eq!(parse_minute("90'+x'"), 0);
        assert_eq!(parse_minute("4294967295'+1'"), 0);
        assert_eq!(parse_minute("4294967296'"), 0);
    }

    #[test]
    fn parse_home_match() {
        let md = parse_summary(&summary(true), 740843, &club()).unwrap();
        assert_eq!(md.match_id, 740843);
        assert!(md.is_home);
        assert_eq!(md.home_team, "Tottenham Hotspur");
        assert_eq!(md.away_team, "Manchester United");
        assert_eq!(md.competition, "English Premier League");
        assert_eq!(md.matchday, "Matchday 12654");
        assert_eq!(md.date, "2026-02-07");
        assert_eq!(md.venue, "Old Trafford");
        assert_eq!(md.formation, "4-2-3-1");
        assert_eq!(md.coach, "");
        assert_eq!(md.home_score, Some(2));
        assert_eq!(md.away_score, Some(1));

        assert_eq!(md.starting_players.len(), 11);
        assert_eq!(md.starting_players[0].position, "GK");
        assert_eq!(md.starting_players[0].shirt_number, Some(1));
        assert_eq!(md.starting_players[2].position, "CB");
        assert_eq!(md.starting_players[8].position, "RW");
        assert_eq!(md.starting_players[10].position, "MF");
        assert!(md.missing_fields() == vec![MatchField::Coach]);
    }

    #[test]
    fn parse_away_match() {
        let md = parse_summary(&summary(false), 1, &club()).unwrap();
        assert!(!md.is_home);
        assert_eq!(md.club_team(), "Tottenham Hotspur");
        assert_eq!(md.opponent(), "Manchester United");
        // Still the club's roster.
        assert_eq!(md.starting_players[0].name, "Starter 1");
    }

    #[test]
    fn club_substitutions_only() {
        let md = parse_summary(&summary(true), 1, &club()).unwrap();
        assert_eq!(
            md.substitutions,
            vec![SubstitutionEvent {
                player_in: "Bench 1".to_string(),
                player_out: "Starter 9".to_string(),
                minute: 61,
            }]
        );
    }

    #[test]
    fn club_goals_and_own_goals() {
        let md = parse_summary(&summary(true), 1, &club()).unwrap();
        assert_eq!(
            md.goals,
            vec![
                GoalEvent {
                    scorer: "Starter 10".to_string(),
                    assist: Some("Starter 8".to_string()),
                    minute: 32,
                    own_goal: false,
                },
                GoalEvent {
                    scorer: "Starter 3".to_string(),
                    assist: None,
                    minute: 92,
                    own_goal: true,
                },
            ]
        );
    }

    #[test]
    fn match_without_the_club() {
        let mut js = summary(true);
        js["header"]["competitions"][0]["competitors"][0]["team"]["id"] = json!("1");
        match parse_summary(&js, 1, &club()) {
            Err(e @ PipelineError::NotAClubMatch { .. }) => {
                let msg = e.to_string();
                assert!(msg.contains("Tottenham Hotspur"));
                assert!(msg.contains("Manchester United"));
            }
            x => panic!("unexpected {:?}", x),
        }
    }

    #[test]
    fn sparse_summary() {
        let js = json!({
            "header": {"competitions": [{"competitors": [
                {"homeAway": "home", "team": {"id": "367", "displayName": "Tottenham Hotspur"}},
                {"homeAway": "away", "team": {"id": "1", "displayName": "Arsenal"}}
            ]}]}
        });
        let md = parse_summary(&js, 3, &club()).unwrap();
        assert_eq!(md.matchday, "");
        assert_eq!(md.formation, "");
        assert_eq!(md.home_score, Some(0));
        assert!(md.starting_players.is_empty());
        let missing = md.missing_fields();
        assert!(missing.contains(&MatchField::StartingPlayers));
        assert!(missing.contains(&MatchField::Venue));

        assert!(parse_summary(&json!({}), 3, &club()).is_err());
    }

    #[test]
    fn scoreboard() {
        let js = json!({"events": [
            {"id": "100", "competitions": [{"competitors": [
                {"team": {"id": "1"}}, {"team": {"id": "2"}}]}]},
            {"id": "740843", "competitions": [{"competitors": [
                {"team": {"id": "360"}}, {"team": {"id": "367"}}]}]}
        ]});
        assert_eq!(parse_scoreboard(&js, &club()), Some(740843));
        assert_eq!(parse_scoreboard(&json!({"events": []}), &club()), None);
        assert_eq!(parse_scoreboard(&json!({}), &club()), None);
    }

    #[test]
    fn urls() {
        assert_eq!(
            summary_url("https://site.api.espn.com/apis/site/v2/sports/soccer/", "eng.1"),
            "https://site.api.espn.com/apis/site/v2/sports/soccer/eng.1/summary"
        );
        assert_eq!(scoreboard_url("http://x", "uefa.europa"), "http://x/uefa.europa/scoreboard");
    }
}
