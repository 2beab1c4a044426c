use serde::{Deserialize, Serialize};

use crate::model::CompiledResults;

/// One match in the archive index (`matches.json`).
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub match_id: u64,
    pub opponent: String,
    pub competition: String,
    pub matchday: String,
    /// ISO date, compared as a string.
    pub date: String,
    pub venue: String,
    pub home_score: u32,
    pub away_score: u32,
    #[serde(rename = "is_tottenham_home")]
    pub is_home: bool,
}

impl From<&CompiledResults> for IndexEntry {
    fn from(results: &CompiledResults) -> IndexEntry {
        let meta = &results.match_metadata;
        IndexEntry {
            match_id: results.match_id,
            opponent: meta.opponent.clone(),
            competition: meta.competition.clone(),
            matchday: meta.matchday.clone(),
            date: meta.date.clone(),
            venue: meta.venue.clone(),
            home_score: meta.home_score,
            away_score: meta.away_score,
            is_home: meta.is_home,
        }
    }
}

/// Sorts the entries with the most recent match first.
///
/// Entries on the same date keep their input order.
pub fn sort_matches(mut entries: Vec<IndexEntry>) -> Vec<IndexEntry> {
    entries.sort_by(|a, b| b.date.cmp(&a.date));
    entries
}

/// Criteria for narrowing down the archive. Unset criteria match everything.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct MatchFilter {
    pub opponent: Option<String>,
    pub competition: Option<String>,
    /// Inclusive lower bound on the date.
    pub date_from: Option<String>,
    /// Inclusive upper bound on the date.
    pub date_to: Option<String>,
}

impl MatchFilter {
    pub fn matches(&self, entry: &IndexEntry) -> bool {
        if let Some(opponent) = &self.opponent {
            if entry.opponent != *opponent {
                return false;
            }
        }
        if let Some(competition) = &self.competition {
            if entry.competition != *competition {
                return false;
            }
        }
        if let Some(from) = &self.date_from {
            if entry.date.as_str() < from.as_str() {
                return false;
            }
        }
        if let Some(to) = &self.date_to {
            if entry.date.as_str() > to.as_str() {
                return false;
            }
        }
        true
    }
}

/// Returns the entries satisfying every criterion of the filter, in input order.
pub fn filter_matches(entries: &[IndexEntry], filter: &MatchFilter) -> Vec<IndexEntry> {
    entries
        .iter()
        .filter(|e| filter.matches(e))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(match_id: u64, opponent: &str, competition: &str, date: &str) -> IndexEntry {
        IndexEntry {
            match_id,
            opponent: opponent.to_string(),
            competition: competition.to_string(),
            matchday: "Matchday 1".to_string(),
            date: date.to_string(),
            venue: "Stadium".to_string(),
            home_score: 1,
            away_score: 0,
            is_home: true,
        }
    }

    fn sample() -> Vec<IndexEntry> {
        vec![
            entry(1, "Arsenal", "Premier League", "2024-09-15"),
            entry(2, "Chelsea", "Premier League", "2024-12-08"),
            entry(3, "Roma", "Europa League", "2024-11-28"),
            entry(4, "Arsenal", "Premier League", "2025-01-15"),
            entry(5, "Coventry City", "EFL Cup", "2024-12-08"),
        ]
    }

    #[test]
    fn sort_is_descending_by_date() {
        let sorted = sort_matches(sample());
        let ids: Vec<u64> = sorted.iter().map(|e| e.match_id).collect();
        assert_eq!(ids, vec![4, 2, 5, 3, 1]);
        for w in sorted.windows(2) {
            assert!(w[0].date >= w[1].date);
        }
    }

    #[test]
    fn sort_keeps_input_order_on_ties() {
        let entries = vec![
            entry(7, "A", "C", "2024-01-01"),
            entry(3, "B", "C", "2024-01-01"),
            entry(9, "C", "C", "2024-01-01"),
        ];
        let ids: Vec<u64> = sort_matches(entries).iter().map(|e| e.match_id).collect();
        assert_eq!(ids, vec![7, 3, 9]);
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let entries = sample();
        assert_eq!(filter_matches(&entries, &MatchFilter::default()), entries);
    }

    #[test]
    fn filter_by_opponent_and_competition() {
        let f = MatchFilter {
            opponent: Some("Arsenal".to_string()),
            competition: Some("Premier League".to_string()),
            ..Default::default()
        };
        let ids: Vec<u64> = filter_matches(&sample(), &f)
            .iter()
            .map(|e| e.match_id)
            .collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let f = MatchFilter {
            date_from: Some("2024-11-28".to_string()),
            date_to: Some("2024-12-08".to_string()),
            ..Default::default()
        };
        let ids: Vec<u64> = filter_matches(&sample(), &f)
            .iter()
            .map(|e| e.match_id)
            .collect();
        assert_eq!(ids, vec![2, 3, 5]);
    }

    #[test]
    fn filter_has_no_false_inclusions_or_exclusions() {
        let entries = sample();
        let filters = vec![
            MatchFilter {
                opponent: Some("Roma".to_string()),
                ..Default::default()
            },
            MatchFilter {
                competition: Some("Premier League".to_string()),
                date_to: Some("2024-12-31".to_string()),
                ..Default::default()
            },
            MatchFilter {
                date_from: Some("2026-01-01".to_string()),
                ..Default::default()
            },
        ];
        for f in filters.iter() {
            let out = filter_matches(&entries, f);
            assert!(out.iter().all(|e| f.matches(e)));
            let expected = entries.iter().filter(|e| f.matches(e)).count();
            assert_eq!(out.len(), expected);
        }
    }

    #[test]
    fn index_uses_the_archive_keys() {
        let js = serde_json::to_value(entry(1, "Arsenal", "Premier League", "2024-09-15")).unwrap();
        let obj = js.as_object().unwrap();
        let mut keys: Vec<&String> = obj.keys().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "away_score",
                "competition",
                "date",
                "home_score",
                "is_tottenham_home",
                "match_id",
                "matchday",
                "opponent",
                "venue"
            ]
        );
    }
}
