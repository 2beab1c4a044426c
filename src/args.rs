use clap::{Parser, Subcommand};

/// Post-match player rating surveys for r/coys.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON configuration file. All the keys are optional, see the
    /// manual of the player_ratings crate for the format.
    #[clap(short, long, value_parser, global = true)]
    pub config: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(short, long, takes_value = false, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetches the match data from the ESPN API and fills in the gaps interactively.
    Fetch {
        /// The ESPN event id of the match.
        #[clap(value_parser)]
        match_id: u64,
        /// (default from the configuration, eng.1) The ESPN league slug.
        #[clap(long, value_parser)]
        league: Option<String>,
    },
    /// Looks for the ESPN event id of the club's match on a given day.
    Find {
        /// (YYYY-MM-DD, default today) The day of the match.
        #[clap(value_parser)]
        date: Option<String>,
        /// (default from the configuration, eng.1) The ESPN league slug.
        #[clap(long, value_parser)]
        league: Option<String>,
    },
    /// Creates the Google Form survey of a match.
    CreateSurvey {
        #[clap(value_parser)]
        match_id: u64,
    },
    /// Compiles the survey responses into results.
    Compile {
        #[clap(value_parser)]
        match_id: u64,
        /// (optional) The id of the Google Form. Defaults to the form created by create-survey.
        #[clap(long, value_parser)]
        form_id: Option<String>,
        /// (file path, .xlsx or .csv) Reads the responses from an export instead of the forms API.
        #[clap(long, value_parser, conflicts_with = "form_id")]
        responses: Option<String>,
        /// (file path) A reference results file. If provided, the compiled results must match it.
        #[clap(short, long, value_parser)]
        reference: Option<String>,
        /// (default: first worksheet) When using an Excel export, the name of the worksheet to use.
        #[clap(long, value_parser)]
        excel_worksheet_name: Option<String>,
    },
    /// Renders the results infographic of a match.
    Infographic {
        #[clap(value_parser)]
        match_id: u64,
        /// The quote of the match.
        #[clap(long, value_parser)]
        quote: Option<String>,
        /// (file path) The photo of the match.
        #[clap(long, value_parser)]
        photo: Option<String>,
    },
    /// Rebuilds the archive from all the compiled matches.
    BuildSite,
    /// Lists the archived matches.
    List {
        #[clap(long, value_parser)]
        opponent: Option<String>,
        #[clap(long, value_parser)]
        competition: Option<String>,
        /// (YYYY-MM-DD, inclusive)
        #[clap(long, value_parser)]
        from: Option<String>,
        /// (YYYY-MM-DD, inclusive)
        #[clap(long, value_parser)]
        to: Option<String>,
    },
    /// Runs every step for a match, asking for the missing inputs along the way.
    Run {
        #[clap(value_parser)]
        match_id: u64,
    },
}
