use clap::Parser;

/// Fills a report template for every session of a training roster.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON configuration: answer groups, operator choices, inputs and outputs.
    /// If not provided, the built-in configuration for training reports is used.
    /// Relative paths of the configuration are resolved from its directory.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) The roster of participants (.xlsx or .csv). Setting this option overrides the
    /// path that may be specified in the configuration.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (file path) The .docx template. Setting this option overrides the path that may be specified
    /// in the configuration.
    #[clap(short, long, value_parser)]
    pub template: Option<String>,

    /// (file path) Where the archive is written.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (integer) Seed of the random answers, to get reproducible documents.
    #[clap(long, value_parser)]
    pub seed: Option<u64>,

    /// (sessionReport or participantQuiz) One report per session, or one questionnaire per participant.
    #[clap(long, value_parser)]
    pub variant: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
