use log::{debug, info, warn};

use crate::pipeline::*;

use std::fs;

/// Location of the index inside the archive.
pub fn index_path(archive_dir: &Path) -> PathBuf {
    archive_dir.join("data").join("matches.json")
}

fn copy_file(from: &Path, to: &Path) -> PipelineResult<()> {
    debug!("copy_file: {:?} -> {:?}", from, to);
    fs::copy(from, to).context(WritingFileSnafu {
        path: to.display().to_string(),
    })?;
    Ok(())
}

/// Publishes the compiled matches of `data_dir` into `out_dir`.
///
/// Every subdirectory holding a readable `results.json` is copied to
/// `out_dir/matches/<match_id>/` along with its infographic, and listed in
/// the index, most recent match first. Other subdirectories are skipped
/// with a warning. A missing `data_dir` gives an empty index.
pub fn build_site(data_dir: &Path, out_dir: &Path) -> PipelineResult<Vec<IndexEntry>> {
    let matches_out = out_dir.join("matches");
    let index_file = index_path(out_dir);
    fs::create_dir_all(&matches_out).context(WritingFileSnafu {
        path: matches_out.display().to_string(),
    })?;

    if !data_dir.is_dir() {
        warn!(
            "Data directory {:?} does not exist, writing an empty index",
            data_dir
        );
        let empty: Vec<IndexEntry> = vec![];
        write_json(&index_file, &empty)?;
        return Ok(empty);
    }

    let mut match_dirs: Vec<PathBuf> = fs::read_dir(data_dir)
        .context(OpeningJsonSnafu {
            path: data_dir.display().to_string(),
        })?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    match_dirs.sort();

    let mut entries: Vec<IndexEntry> = Vec::new();
    for match_dir in match_dirs.iter() {
        let results_file = match_dir.join("results.json");
        if !results_file.is_file() {
            warn!("Skipping {:?}: no results.json found", match_dir);
            continue;
        }
        let results = match load_results(&results_file) {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping {:?}: {}", match_dir, e);
                continue;
            }
        };

        let dest = matches_out.join(results.match_id.to_string());
        fs::create_dir_all(&dest).context(WritingFileSnafu {
            path: dest.display().to_string(),
        })?;
        copy_file(&results_file, &dest.join("results.json"))?;
        let infographic = match_dir.join("infographic.png");
        if infographic.is_file() {
            copy_file(&infographic, &dest.join("infographic.png"))?;
        }
        entries.push(IndexEntry::from(&results));
    }

    let entries = sort_matches(entries);
    write_json(&index_file, &entries)?;
    info!("Archive built: {} match(es) indexed.", entries.len());
    Ok(entries)
}

/// One line summary of an archived match.
pub fn describe_entry(entry: &IndexEntry, club_label: &str) -> String {
    let (home, away) = if entry.is_home {
        (club_label, entry.opponent.as_str())
    } else {
        (entry.opponent.as_str(), club_label)
    };
    format!(
        "{}  {} {} - {} {}  ({}, {})  [{}]",
        entry.date,
        home,
        entry.home_score,
        entry.away_score,
        away,
        entry.competition,
        entry.matchday,
        entry.match_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(match_id: u64, opponent: &str, date: &str) -> CompiledResults {
        let md = MatchData {
            match_id,
            home_team: "Tottenham Hotspur".to_string(),
            away_team: opponent.to_string(),
            competition: "English Premier League".to_string(),
            matchday: "Matchday 1".to_string(),
            date: date.to_string(),
            venue: "Tottenham Hotspur Stadium".to_string(),
            formation: "4-3-3".to_string(),
            coach: "Thomas Frank".to_string(),
            starting_players: vec![],
            substitutions: vec![],
            goals: vec![],
            is_home: true,
            home_score: Some(3),
            away_score: Some(1),
        };
        compile_responses(&[], &md)
    }

    #[test]
    fn builds_index_and_copies_files() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        let out = dir.path().join("site");

        save_results(&data.join("100/results.json"), &results(100, "Burnley", "2025-08-16")).unwrap();
        fs::write(data.join("100/infographic.png"), b"png").unwrap();
        save_results(&data.join("200/results.json"), &results(200, "Arsenal", "2025-11-23")).unwrap();
        // Skipped: no results, broken results, plain file.
        fs::create_dir_all(data.join("300")).unwrap();
        fs::create_dir_all(data.join("400")).unwrap();
        fs::write(data.join("400/results.json"), "{ broken").unwrap();
        fs::write(data.join("notes.txt"), "x").unwrap();

        let entries = build_site(&data, &out).unwrap();
        let ids: Vec<u64> = entries.iter().map(|e| e.match_id).collect();
        assert_eq!(ids, vec![200, 100]);
        assert_eq!(entries[0].opponent, "Arsenal");
        assert_eq!(entries[0].home_score, 3);

        assert!(out.join("matches/100/results.json").is_file());
        assert!(out.join("matches/100/infographic.png").is_file());
        assert!(out.join("matches/200/results.json").is_file());
        assert!(!out.join("matches/200/infographic.png").exists());
        assert!(!out.join("matches/300").exists());

        let stored: Vec<IndexEntry> = read_json(&index_path(&out)).unwrap();
        assert_eq!(stored, entries);
    }

    #[test]
    fn missing_data_dir_gives_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("site");
        let entries = build_site(&dir.path().join("nope"), &out).unwrap();
        assert!(entries.is_empty());
        assert_eq!(read_text(&index_path(&out)).unwrap().trim(), "[]");
        assert!(out.join("matches").is_dir());
    }

    #[test]
    fn describes_entries() {
        let mut e = IndexEntry::from(&results(7, "Brentford", "2025-09-13"));
        assert_eq!(
            describe_entry(&e, "TOTTENHAM"),
            "2025-09-13  TOTTENHAM 3 - 1 Brentford  (English Premier League, Matchday 1)  [7]"
        );
        e.is_home = false;
        e.home_score = 0;
        e.away_score = 2;
        assert_eq!(
            describe_entry(&e, "SPURS"),
            "2025-09-13  Brentford 0 - 2 SPURS  (English Premier League, Matchday 1)  [7]"
        );
    }
}
