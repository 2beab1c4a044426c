//! Formation layouts used to place the starters on the results image.
//!
//! Each formation maps to its rows, from the attackers down to the
//! goalkeeper. A row is a position label and a number of players.

pub type FormationRow = (&'static str, usize);

pub const FORMATION_LAYOUTS: &[(&str, &[FormationRow])] = &[
    ("4-3-3", &[("FW", 3), ("MF", 3), ("DF", 4), ("GK", 1)]),
    ("4-4-2", &[("FW", 2), ("MF", 4), ("DF", 4), ("GK", 1)]),
    ("3-5-2", &[("FW", 2), ("MF", 5), ("DF", 3), ("GK", 1)]),
    (
        "4-2-3-1",
        &[("FW", 1), ("AM", 3), ("DM", 2), ("DF", 4), ("GK", 1)],
    ),
    ("3-4-3", &[("FW", 3), ("MF", 4), ("DF", 3), ("GK", 1)]),
    ("5-3-2", &[("FW", 2), ("MF", 3), ("DF", 5), ("GK", 1)]),
    (
        "4-1-4-1",
        &[("FW", 1), ("MF", 4), ("DM", 1), ("DF", 4), ("GK", 1)],
    ),
];

pub fn formation_layout(formation: &str) -> Option<&'static [FormationRow]> {
    FORMATION_LAYOUTS
        .iter()
        .find(|(name, _)| *name == formation.trim())
        .map(|(_, rows)| *rows)
}

/// Splits the starters into the rows of the formation.
///
/// Unknown formations give a single row holding every player. Players
/// beyond the eleven slots of a known formation are not placed.
pub fn distribute_rows<'a, T>(formation: &str, players: &'a [T]) -> Vec<Vec<&'a T>> {
    match formation_layout(formation) {
        Some(layout) => {
            let mut rows: Vec<Vec<&'a T>> = Vec::with_capacity(layout.len());
            let mut idx = 0;
            for (_, count) in layout.iter() {
                let end = (idx + count).min(players.len());
                let start = idx.min(end);
                rows.push(players[start..end].iter().collect());
                idx += count;
            }
            rows
        }
        None => vec![players.iter().collect()],
    }
}
