use clap::Parser;

/// This is a program to run Bayesian risk-limiting audits of elections with
/// several contests and several collections of paper ballots.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The file containing the audit configuration, in JSON format.
    /// The paths to the data files are relative to the directory of this file.
    /// For more information about the file format, read the documentation of the bayes_audit crate (manual section).
    #[clap(short, long, value_parser)]
    pub config: String,

    /// (file path) A reference file containing the summary of an audit in JSON format. If provided, multiaudit will
    /// check that the produced summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the audit will be written in JSON format to the given
    /// location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (integer) If specified, overrides the seed of the audit configuration.
    #[clap(long, value_parser)]
    pub seed: Option<u64>,

    /// (integer) If specified, overrides the number of Monte Carlo trials of each risk estimate.
    #[clap(long, value_parser)]
    pub trials: Option<u32>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
