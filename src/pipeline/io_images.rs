use log::{debug, warn};

use rapidfuzz::fuzz;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Lower case, with dashes and underscores turned into spaces.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase().replace(['-', '_'], " ")
}

/// Similarity of two strings between 0 and 100, based on the number of
/// insertions and deletions needed to turn one into the other.
pub fn similarity_ratio(a: &str, b: &str) -> u32 {
    if a.is_empty() && b.is_empty() {
        return 100;
    }
    (100.0 * fuzz::ratio(a.chars(), b.chars())).round() as u32
}

fn list_images(dir: &Path) -> Vec<String> {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!("Could not read image directory {:?}: {}", dir, e);
            return vec![];
        }
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter_map(|e| e.file_name().to_str().map(|s| s.to_string()))
        .filter(|name| {
            Path::new(name)
                .extension()
                .and_then(|x| x.to_str())
                .map(|x| IMAGE_EXTENSIONS.contains(&x.to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    names.sort();
    names
}

fn file_stem(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
}

/// Maps each player name to the closest image file name in `image_dir`.
///
/// A player gets `None` when no file scores at least `threshold`. When the
/// directory does not exist, every player gets `None`.
pub fn map_player_images(
    players: &[String],
    image_dir: &Path,
    threshold: u32,
) -> HashMap<String, Option<String>> {
    if !image_dir.is_dir() {
        warn!("Image directory does not exist: {:?}", image_dir);
        return players.iter().map(|p| (p.clone(), None)).collect();
    }
    let files = list_images(image_dir);
    let stems: Vec<String> = files.iter().map(|f| normalize_name(file_stem(f))).collect();

    let mut res: HashMap<String, Option<String>> = HashMap::new();
    for player in players.iter() {
        let name = normalize_name(player);
        let mut best: Option<(u32, &String)> = None;
        for (file, stem) in files.iter().zip(stems.iter()) {
            let score = similarity_ratio(&name, stem);
            if best.map(|(s, _)| score > s).unwrap_or(true) {
                best = Some((score, file));
            }
        }
        let matched = match best {
            Some((score, file)) if score >= threshold => Some(file.clone()),
            _ => None,
        };
        debug!("map_player_images: {:?} -> {:?} ({:?})", player, matched, best);
        res.insert(player.clone(), matched);
    }
    res
}
