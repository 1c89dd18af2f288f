use clap::Parser;

/// This is a facilitation and tabulation program for Brede Welvaart workshop sessions.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The JSON session configuration: store URL and key, workshop session code,
    /// participant name, and optional overrides for the similarity metric, the top-N size and
    /// the vote budgets.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) A reference file containing a previously generated report in JSON format.
    /// If provided, werksessie will check that the generated report matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path or empty) If specified, the session report will be written in JSON format to
    /// the given location in addition to being printed.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) If specified, a Markdown rendering of the session report will be
    /// written to the given location.
    #[clap(long, value_parser)]
    pub report_doc: Option<String>,

    /// ('domain|text|score|polarity') Records one scored effect for the configured participant
    /// before tabulating, e.g. 'Gezondheid|minder stress bij inwoners|4|+1'.
    #[clap(long, value_parser)]
    pub submit: Option<String>,

    /// (label, e.g. 'Groep 3') Records the configured participant's team choice before
    /// tabulating.
    #[clap(long, value_parser)]
    pub choose_team: Option<String>,

    /// (row identifier) Deletes one previously recorded submission from the store.
    #[clap(long, value_parser)]
    pub delete_submission: Option<i64>,

    /// ('group_id=+1' or 'group_id=-1') Casts one vote on an effect group. The vote is checked
    /// against the participant's budgets and own submissions before anything is written.
    #[clap(long, value_parser)]
    pub vote: Option<String>,

    /// (file path) A JSON file with the team's answers for its top-ranked effects, recorded to
    /// the store before tabulating.
    #[clap(long, value_parser)]
    pub feedback: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
