use log::{debug, info};

use crate::pipeline::infographic::RenderConfig;
use crate::pipeline::*;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CLUB_NAME: &str = "Tottenham Hotspur";
pub const DEFAULT_CLUB_LABEL: &str = "TOTTENHAM";
pub const DEFAULT_ESPN_TEAM_ID: &str = "367";
pub const DEFAULT_DATA_DIR: &str = "data/matches";
pub const DEFAULT_IMAGE_DIR: &str = "tottenham 2025 squad/cropped images";
pub const DEFAULT_ARCHIVE_DIR: &str = "archive";
pub const DEFAULT_ESPN_BASE_URL: &str = "https://site.api.espn.com/apis/site/v2/sports/soccer";
pub const DEFAULT_LEAGUE: &str = "eng.1";
pub const DEFAULT_FORMS_BASE_URL: &str = "https://forms.googleapis.com/v1";
pub const DEFAULT_TOKEN_ENV: &str = "GOOGLE_FORMS_ACCESS_TOKEN";
/// Environment variables naming a service account key file, in priority order.
pub const CREDENTIALS_FILE_ENVS: &[&str] =
    &["GOOGLE_FORMS_CREDENTIALS_FILE", "GOOGLE_APPLICATION_CREDENTIALS"];
pub const DEFAULT_IMAGE_MATCH_THRESHOLD: u32 = 70;

// ********* Configuration file ***********

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClubSettings {
    pub name: Option<String>,
    pub label: Option<String>,
    #[serde(rename = "espnTeamId")]
    pub espn_team_id: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathSettings {
    #[serde(rename = "dataDir")]
    pub data_dir: Option<String>,
    #[serde(rename = "imageDir")]
    pub image_dir: Option<String>,
    #[serde(rename = "archiveDir")]
    pub archive_dir: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct EspnSettings {
    #[serde(rename = "baseUrl")]
    pub base_url: Option<String>,
    pub league: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormsSettings {
    #[serde(rename = "baseUrl")]
    pub base_url: Option<String>,
    #[serde(rename = "tokenEnv")]
    pub token_env: Option<String>,
    #[serde(rename = "credentialsFile")]
    pub credentials_file: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderSettings {
    pub font: Option<String>,
    #[serde(rename = "boldFont")]
    pub bold_font: Option<String>,
    pub placeholder: Option<String>,
}

/// The content of the configuration file. Every key is optional.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub club: ClubSettings,
    #[serde(default)]
    pub paths: PathSettings,
    #[serde(default)]
    pub espn: EspnSettings,
    #[serde(default)]
    pub forms: FormsSettings,
    #[serde(default)]
    pub render: RenderSettings,
    #[serde(rename = "imageMatchThreshold")]
    pub image_match_threshold: Option<u32>,
}

// ********* Resolved settings ***********

/// The configuration with all the defaults applied.
#[derive(PartialEq, Debug, Clone)]
pub struct Settings {
    pub club_name: String,
    pub club_label: String,
    pub espn_team_id: String,
    pub data_dir: PathBuf,
    pub image_dir: PathBuf,
    pub archive_dir: PathBuf,
    pub espn_base_url: String,
    pub league: String,
    pub forms_base_url: String,
    pub token_env: String,
    pub credentials_file: Option<PathBuf>,
    pub image_match_threshold: u32,
    pub render: RenderConfig,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings::resolve(ConfigFile::default(), None)
    }
}

impl Settings {
    /// Applies the defaults. Relative paths of the configuration file are
    /// taken relative to `root` when provided.
    pub fn resolve(config: ConfigFile, root: Option<&Path>) -> Settings {
        let path = |p: Option<String>, default: &str| -> PathBuf {
            match (p, root) {
                (Some(x), Some(r)) => r.join(x),
                (Some(x), None) => PathBuf::from(x),
                (None, _) => PathBuf::from(default),
            }
        };
        let opt_path = |p: Option<String>| -> Option<PathBuf> {
            p.map(|x| match root {
                Some(r) => r.join(x),
                None => PathBuf::from(x),
            })
        };

        let club_label = config
            .club
            .label
            .unwrap_or_else(|| DEFAULT_CLUB_LABEL.to_string());
        let render = RenderConfig {
            font: opt_path(config.render.font),
            bold_font: opt_path(config.render.bold_font),
            placeholder: opt_path(config.render.placeholder),
            club_label: club_label.clone(),
            ..RenderConfig::default()
        };

        Settings {
            club_name: config
                .club
                .name
                .unwrap_or_else(|| DEFAULT_CLUB_NAME.to_string()),
            club_label,
            espn_team_id: config
                .club
                .espn_team_id
                .unwrap_or_else(|| DEFAULT_ESPN_TEAM_ID.to_string()),
            data_dir: path(config.paths.data_dir, DEFAULT_DATA_DIR),
            image_dir: path(config.paths.image_dir, DEFAULT_IMAGE_DIR),
            archive_dir: path(config.paths.archive_dir, DEFAULT_ARCHIVE_DIR),
            espn_base_url: config
                .espn
                .base_url
                .unwrap_or_else(|| DEFAULT_ESPN_BASE_URL.to_string()),
            league: config
                .espn
                .league
                .unwrap_or_else(|| DEFAULT_LEAGUE.to_string()),
            forms_base_url: config
                .forms
                .base_url
                .unwrap_or_else(|| DEFAULT_FORMS_BASE_URL.to_string()),
            token_env: config
                .forms
                .token_env
                .unwrap_or_else(|| DEFAULT_TOKEN_ENV.to_string()),
            credentials_file: opt_path(config.forms.credentials_file),
            image_match_threshold: config
                .image_match_threshold
                .unwrap_or(DEFAULT_IMAGE_MATCH_THRESHOLD),
            render,
        }
    }
}

/// Reads the configuration file, if any, and applies the defaults.
pub fn read_settings(config_path: Option<&str>) -> PipelineResult<Settings> {
    match config_path {
        None => Ok(Settings::default()),
        Some(p) => {
            info!("Reading configuration {:?}", p);
            let path = Path::new(p);
            let config: ConfigFile = read_json(path)?;
            debug!("read_settings: {:?}", config);
            let root = path.parent().filter(|r| !r.as_os_str().is_empty());
            Ok(Settings::resolve(config, root))
        }
    }
}
