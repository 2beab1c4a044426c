use log::{debug, info, warn};

use player_ratings::builder::Builder;
use player_ratings::*;
use snafu::{prelude::*, Snafu};

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use text_diff::print_diff;

use crate::args::{Args, Command};
use crate::pipeline::config_reader::*;
use crate::pipeline::io_common::*;

pub mod archive;
pub mod config_reader;
pub mod infographic;
pub mod io_common;
pub mod io_espn;
pub mod io_forms;
pub mod io_images;
pub mod io_responses;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PipelineError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the JSON content of {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Worksheet {name} not found in {path}"))]
    MissingWorksheet { name: String, path: String },
    #[snafu(display("No header row in {path}"))]
    EmptyExport { path: String },
    #[snafu(display("Error reading CSV file {path}"))]
    ReadingCsv { source: csv::Error, path: String },
    #[snafu(display("Unsupported response export {path} (expected .xlsx or .csv)"))]
    UnsupportedExport { path: String },
    #[snafu(display("Could not build the HTTP client"))]
    HttpClient { source: reqwest::Error },
    #[snafu(display("Request to {url} failed"))]
    Http { source: reqwest::Error, url: String },
    #[snafu(display("Unexpected response from {url}: {message}"))]
    UnexpectedResponse { url: String, message: String },
    #[snafu(display(
        "No Google credentials found. Set {file_vars} to a service account JSON key file, or {token_var} to an access token (a .env file works too)."
    ))]
    MissingCredentials { token_var: String, file_vars: String },
    #[snafu(display("Could not sign the token request of service account {account}"))]
    SigningToken {
        source: jsonwebtoken::errors::Error,
        account: String,
    },
    #[snafu(display(
        "{club} (ESPN id={team_id}) is not in this match. Home: {home}, Away: {away}"
    ))]
    NotAClubMatch {
        club: String,
        team_id: String,
        home: String,
        away: String,
    },
    #[snafu(display("{what} not found at {path}. Run '{command}' first."))]
    MissingArtifact {
        what: String,
        path: String,
        command: String,
    },
    #[snafu(display("Error encoding image {path}"))]
    EncodingImage {
        source: image::ImageError,
        path: String,
    },
    #[snafu(display("Invalid stored data in {path}"))]
    Storage { source: RatingsError, path: String },
    #[snafu(display("Error reading from the terminal"))]
    Prompt { source: std::io::Error },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// The files of one match under the data directory.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MatchPaths {
    pub dir: PathBuf,
}

impl MatchPaths {
    pub fn new(data_dir: &Path, match_id: u64) -> MatchPaths {
        MatchPaths {
            dir: data_dir.join(match_id.to_string()),
        }
    }

    pub fn match_data(&self) -> PathBuf {
        self.dir.join("match_data.json")
    }

    pub fn results(&self) -> PathBuf {
        self.dir.join("results.json")
    }

    pub fn form(&self) -> PathBuf {
        self.dir.join("form.json")
    }

    pub fn infographic(&self) -> PathBuf {
        self.dir.join("infographic.png")
    }
}

pub fn run_command(args: &Args) -> PipelineResult<()> {
    if dotenvy::dotenv().is_ok() {
        debug!("run_command: loaded .env");
    }
    let settings = read_settings(args.config.as_deref())?;
    debug!("run_command: settings: {:?}", settings);

    match &args.command {
        Command::Fetch { match_id, league } => {
            let stdin = std::io::stdin();
            let mut input = stdin.lock();
            cmd_fetch(
                &settings,
                *match_id,
                league.as_deref(),
                &mut input,
                &mut std::io::stdout(),
            )?;
        }
        Command::Find { date, league } => cmd_find(&settings, date.as_deref(), league.as_deref())?,
        Command::CreateSurvey { match_id } => {
            cmd_create_survey(&settings, *match_id)?;
        }
        Command::Compile {
            match_id,
            form_id,
            responses,
            reference,
            excel_worksheet_name,
        } => {
            let source = match (responses, form_id) {
                (Some(path), _) => ResponseSource::Export {
                    path: PathBuf::from(path),
                    worksheet: excel_worksheet_name.clone(),
                },
                (None, Some(form_id)) => ResponseSource::Form(Some(form_id.clone())),
                (None, None) => ResponseSource::Form(None),
            };
            cmd_compile(&settings, *match_id, &source, reference.as_deref())?;
        }
        Command::Infographic {
            match_id,
            quote,
            photo,
        } => {
            cmd_infographic(
                &settings,
                *match_id,
                quote.as_deref(),
                photo.as_deref().map(Path::new),
            )?;
        }
        Command::BuildSite => {
            cmd_build_site(&settings)?;
        }
        Command::List {
            opponent,
            competition,
            from,
            to,
        } => {
            let filter = MatchFilter {
                opponent: opponent.clone(),
                competition: competition.clone(),
                date_from: from.clone(),
                date_to: to.clone(),
            };
            cmd_list(&settings, &filter)?;
        }
        Command::Run { match_id } => cmd_run(&settings, *match_id)?,
    }
    Ok(())
}

// ********* Commands ***********

pub fn cmd_fetch<R: BufRead, W: Write>(
    settings: &Settings,
    match_id: u64,
    league: Option<&str>,
    input: &mut R,
    output: &mut W,
) -> PipelineResult<MatchData> {
    let league = league.unwrap_or(&settings.league);
    println!("Fetching match data for event {}...", match_id);
    let mut match_data = io_espn::fetch_match_data(settings, match_id, league)?;

    let names: Vec<String> = match_data
        .starting_players
        .iter()
        .map(|p| p.name.clone())
        .collect();
    let image_map = io_images::map_player_images(
        &names,
        &settings.image_dir,
        settings.image_match_threshold,
    );
    for player in match_data.starting_players.iter_mut() {
        if let Some(Some(file_name)) = image_map.get(&player.name) {
            player.image_path = Some(settings.image_dir.join(file_name).display().to_string());
        }
    }

    let match_data = fill_missing_fields(match_data, input, output)?;

    let paths = MatchPaths::new(&settings.data_dir, match_id);
    write_json(&paths.match_data(), &match_data)?;
    println!("Match data saved to {}", paths.match_data().display());
    Ok(match_data)
}

pub fn cmd_find(settings: &Settings, date: Option<&str>, league: Option<&str>) -> PipelineResult<()> {
    let date = match date {
        Some(d) => match chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d") {
            Ok(x) => x,
            Err(_) => whatever!("Invalid date {:?}, expected YYYY-MM-DD", d),
        },
        None => chrono::Local::now().date_naive(),
    };
    let league = league.unwrap_or(&settings.league);
    match io_espn::find_club_match(settings, &date.format("%Y-%m-%d").to_string(), league)? {
        Some(event_id) => println!("{}", event_id),
        None => println!(
            "No {} match found on {} in {}",
            settings.club_name, date, league
        ),
    }
    Ok(())
}

pub fn cmd_create_survey(settings: &Settings, match_id: u64) -> PipelineResult<io_forms::FormRecord> {
    let paths = MatchPaths::new(&settings.data_dir, match_id);
    let match_data = load_match_data(&paths)?;

    println!("Creating Google Form survey...");
    let client = io_forms::FormsClient::from_settings(settings)?;
    let record = client.create_survey(&match_data)?;
    write_json(&paths.form(), &record)?;
    println!("Survey link: {}", record.responder_uri);
    Ok(record)
}

/// Where to read the survey answers from.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ResponseSource {
    /// The forms API. Without an id, the form recorded by `create-survey` is used.
    Form(Option<String>),
    /// An exported spreadsheet or CSV file.
    Export {
        path: PathBuf,
        worksheet: Option<String>,
    },
}

pub fn cmd_compile(
    settings: &Settings,
    match_id: u64,
    source: &ResponseSource,
    reference: Option<&str>,
) -> PipelineResult<CompiledResults> {
    let paths = MatchPaths::new(&settings.data_dir, match_id);
    let match_data = load_match_data(&paths)?;

    let responses = match source {
        ResponseSource::Export { path, worksheet } => {
            println!("Reading responses from {}...", path.display());
            io_responses::read_responses(path, worksheet.as_deref())?
        }
        ResponseSource::Form(form_id) => {
            let form_id = match form_id {
                Some(x) => x.clone(),
                None => {
                    let form_path = paths.form();
                    require_file(&form_path, "Form record", "create-survey")?;
                    let record: io_forms::FormRecord = read_json(&form_path)?;
                    record.form_id
                }
            };
            println!("Fetching responses for form {}...", form_id);
            let client = io_forms::FormsClient::from_settings(settings)?;
            client.fetch_responses(&form_id)?
        }
    };
    println!("Got {} responses.", responses.len());

    let results = compile_responses(&responses, &match_data);
    let out_path = paths.results();
    save_results(&out_path, &results)?;
    println!("Results saved to {}", out_path.display());

    if let Some(reference_path) = reference {
        check_reference(&results, Path::new(reference_path))?;
    }
    Ok(results)
}

/// Compares the results with a reference results file.
pub fn check_reference(results: &CompiledResults, reference_path: &Path) -> PipelineResult<()> {
    let reference = load_results(reference_path)?;
    let pretty_reference = reference.to_storage().context(StorageSnafu {
        path: reference_path.display().to_string(),
    })?;
    let pretty_results = results.to_storage().context(StorageSnafu {
        path: reference_path.display().to_string(),
    })?;
    info!("check_reference: comparing with {:?}", reference_path);
    if pretty_reference != pretty_results {
        warn!("Found differences with the reference results");
        print_diff(pretty_reference.as_str(), pretty_results.as_str(), "\n");
        whatever!("Difference detected between compiled results and reference results")
    }
    Ok(())
}

pub fn cmd_infographic(
    settings: &Settings,
    match_id: u64,
    quote: Option<&str>,
    photo: Option<&Path>,
) -> PipelineResult<PathBuf> {
    let paths = MatchPaths::new(&settings.data_dir, match_id);
    let results_path = paths.results();
    require_file(&results_path, "Results", "compile")?;
    let results = load_results(&results_path)?;

    println!("Generating infographic...");
    let out_path = paths.infographic();
    infographic::render_infographic(&results, quote, photo, &out_path, &settings.render)?;
    println!("Infographic saved to {}", out_path.display());
    Ok(out_path)
}

pub fn cmd_build_site(settings: &Settings) -> PipelineResult<Vec<IndexEntry>> {
    println!("Building archive site...");
    let entries = archive::build_site(&settings.data_dir, &settings.archive_dir)?;
    println!("Archive site built: {} match(es).", entries.len());
    Ok(entries)
}

pub fn cmd_list(settings: &Settings, filter: &MatchFilter) -> PipelineResult<Vec<IndexEntry>> {
    let index_path = archive::index_path(&settings.archive_dir);
    require_file(&index_path, "Archive index", "build-site")?;
    let entries: Vec<IndexEntry> = read_json(&index_path)?;
    let selected = filter_matches(&entries, filter);
    for e in selected.iter() {
        println!("{}", archive::describe_entry(e, &settings.club_label));
    }
    info!("{} of {} matches", selected.len(), entries.len());
    Ok(selected)
}

pub fn cmd_run(settings: &Settings, match_id: u64) -> PipelineResult<()> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout();

    cmd_fetch(settings, match_id, None, &mut input, &mut output)?;
    cmd_create_survey(settings, match_id)?;

    prompt_line(
        &mut input,
        &mut output,
        "\nSurvey created. Collect responses, then press Enter to continue...",
    )?;
    cmd_compile(settings, match_id, &ResponseSource::Form(None), None)?;

    let quote = prompt_line(
        &mut input,
        &mut output,
        "Enter quote of the match (or press Enter to skip): ",
    )?;
    let photo = prompt_line(
        &mut input,
        &mut output,
        "Enter path to photo of the match (or press Enter to skip): ",
    )?;
    let photo_path = non_empty(&photo).map(PathBuf::from);
    cmd_infographic(
        settings,
        match_id,
        non_empty(&quote),
        photo_path.as_deref(),
    )?;

    cmd_build_site(settings)?;
    println!("\nPipeline complete!");
    Ok(())
}

// ********* Helpers ***********

fn non_empty(s: &str) -> Option<&str> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t)
    }
}

pub fn load_match_data(paths: &MatchPaths) -> PipelineResult<MatchData> {
    let path = paths.match_data();
    require_file(&path, "Match data", "fetch")?;
    read_json(&path)
}

pub fn load_results(path: &Path) -> PipelineResult<CompiledResults> {
    let contents = read_text(path)?;
    CompiledResults::from_storage(&contents).context(StorageSnafu {
        path: path.display().to_string(),
    })
}

pub fn save_results(path: &Path, results: &CompiledResults) -> PipelineResult<()> {
    let contents = results.to_storage().context(StorageSnafu {
        path: path.display().to_string(),
    })?;
    write_text(path, &contents)
}

/// Writes the prompt and reads one line. The end of the input is an error.
fn prompt_line<R: BufRead, W: Write>(input: &mut R, output: &mut W, prompt: &str) -> PipelineResult<String> {
    write!(output, "{}", prompt).context(PromptSnafu {})?;
    output.flush().context(PromptSnafu {})?;
    let mut line = String::new();
    let n = input.read_line(&mut line).context(PromptSnafu {})?;
    if n == 0 {
        whatever!("Unexpected end of input while waiting for: {}", prompt.trim())
    }
    Ok(line.trim().to_string())
}

/// Asks for the values of the fields the API left empty.
pub fn fill_missing_fields<R: BufRead, W: Write>(
    match_data: MatchData,
    input: &mut R,
    output: &mut W,
) -> PipelineResult<MatchData> {
    let mut builder = Builder::new(match_data);
    let missing = builder.missing();
    if !missing.is_empty() {
        prompt_fields(&mut builder, &missing, input, output)?;
    }
    match builder.build() {
        Ok(md) => Ok(md),
        Err(e) => whatever!("Match data still incomplete: {:?}", e.missing),
    }
}

fn prompt_fields<R: BufRead, W: Write>(
    builder: &mut Builder,
    missing: &[MatchField],
    input: &mut R,
    output: &mut W,
) -> PipelineResult<()> {
    writeln!(output, "\nThe following required fields are missing or empty:").context(PromptSnafu {})?;
    for field in missing.iter() {
        writeln!(output, "  - {}", field).context(PromptSnafu {})?;
    }
    writeln!(output).context(PromptSnafu {})?;

    for field in missing.iter() {
        if *field == MatchField::StartingPlayers {
            writeln!(
                output,
                "Starting players are missing. Please enter {} player names, one per line.",
                STARTING_PLAYERS
            )
            .context(PromptSnafu {})?;
            writeln!(output, "Format: name,position (e.g., 'Son Heung-min,LW')").context(PromptSnafu {})?;
            for i in 0..STARTING_PLAYERS {
                loop {
                    let raw = prompt_line(input, output, &format!("  Player {}: ", i + 1))?;
                    match builder.starting_line(&raw) {
                        Ok(()) => break,
                        Err(e) => {
                            debug!("fill_missing_fields: {}", e);
                            writeln!(output, "    Please use format: name,position").context(PromptSnafu {})?;
                        }
                    }
                }
            }
        } else {
            loop {
                let raw = prompt_line(input, output, &format!("  Enter value for '{}': ", field))?;
                match builder.set(*field, &raw) {
                    Ok(()) => break,
                    Err(e) => {
                        debug!("fill_missing_fields: {}", e);
                        writeln!(output, "    A value is required.").context(PromptSnafu {})?;
                    }
                }
            }
        }
    }
    Ok(())
}
