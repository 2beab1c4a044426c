pub use crate::model::*;

/// A builder for filling in the gaps of a match record.
///
/// The fetch step may return a record with empty fields (the public API does
/// not always report the formation or the coach). The caller asks
/// [`Builder::missing`] what is left to fill, supplies the values by whatever
/// means it has (prompting a user, a test fixture), and calls
/// [`Builder::build`] to get a complete record back.
///
/// ```
/// pub use player_ratings::builder::Builder;
/// pub use player_ratings::{MatchData, MatchField, PlayerInfo};
/// # use player_ratings::RatingsError;
///
/// let md: MatchData = serde_json::from_str(r#"{
///   "match_id": 740843, "home_team": "Tottenham Hotspur", "away_team": "Manchester United",
///   "competition": "English Premier League", "matchday": "Matchday 1", "date": "2026-02-07",
///   "venue": "Old Trafford", "formation": "", "coach": ""
/// }"#).unwrap();
///
/// let mut builder = Builder::new(md);
/// builder.set(MatchField::Formation, "4-2-3-1")?;
/// builder.set(MatchField::Coach, "Thomas Frank")?;
/// builder.starting_line("Guglielmo Vicario, GK")?;
///
/// assert!(builder.missing().contains(&MatchField::StartingPlayers));
/// assert!(builder.build().is_err());
///
/// # Ok::<(), RatingsError>(())
/// ```
pub struct Builder {
    pub(crate) _data: MatchData,
    pub(crate) _lineup: Option<Vec<PlayerInfo>>,
}

impl Builder {
    pub fn new(data: MatchData) -> Builder {
        Builder {
            _data: data,
            _lineup: None,
        }
    }

    /// The fields that still need a value.
    pub fn missing(&self) -> Vec<MatchField> {
        let mut data = self._data.clone();
        if let Some(lineup) = &self._lineup {
            data.starting_players = lineup.clone();
        }
        data.missing_fields()
    }

    /// Sets one of the scalar fields. Surrounding whitespace is removed.
    pub fn set(&mut self, field: MatchField, value: &str) -> Result<(), RatingsError> {
        let v = value.trim();
        if v.is_empty() {
            return Err(RatingsError::InvalidValue {
                field,
                value: value.to_string(),
            });
        }
        let slot = self
            ._data
            .scalar_field_mut(field)
            .ok_or(RatingsError::NotAScalarField(field))?;
        *slot = v.to_string();
        Ok(())
    }

    /// Adds a starter from a `name,position` line.
    ///
    /// The first line replaces the lineup that came with the record.
    pub fn starting_line(&mut self, line: &str) -> Result<(), RatingsError> {
        let (name, position) = parse_player_line(line).ok_or(RatingsError::InvalidValue {
            field: MatchField::StartingPlayers,
            value: line.to_string(),
        })?;
        self._lineup
            .get_or_insert_with(Vec::new)
            .push(PlayerInfo::new(&name, &position));
        Ok(())
    }

    /// Returns the completed record, or the record with its remaining gaps.
    pub fn build(self) -> Result<MatchData, IncompleteMatch> {
        let mut data = self._data;
        if let Some(lineup) = self._lineup {
            data.starting_players = lineup;
        }
        data.into_complete()
    }
}

/// Parses a `name,position` line. Both parts must be non-empty.
pub fn parse_player_line(line: &str) -> Option<(String, String)> {
    let (name, position) = line.split_once(',')?;
    let (name, position) = (name.trim(), position.trim());
    if name.is_empty() || position.is_empty() {
        None
    } else {
        Some((name.to_string(), position.to_string()))
    }
}
