use clap::{Parser, ValueEnum};

/// Strains used to inoculate the host at the start of an infection phase.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Infection {
    /// Inoculate with the first strain only.
    Monovalent,
    /// Split the inoculum evenly across all strains.
    Polyvalent,
}

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about,
    long_about = None,
    name = "immunosim",
)]
pub struct Args {
    /// Path to antigen definition file (`;`-delimited, one header line).
    #[clap(long, short)]
    pub antigens: String,

    /// Path to settings (yaml). Defaults reproduce the dengue scenario.
    #[clap(long, short)]
    pub settings: Option<String>,

    /// Output prefix, the time series is written to `<output>.txt`.
    #[clap(long, short)]
    pub output: String,

    /// Infection mode for every inoculation.
    #[clap(long, short, value_enum, default_value_t = Infection::Monovalent)]
    pub infection: Infection,

    /// Seed for the random number generator.
    #[clap(long)]
    pub seed: Option<u64>,

    /// Minimum interval between two samples in simulation time units.
    #[clap(long, default_value_t = 0.1)]
    pub sample_interval: f64,

    /// Path to log file.
    #[clap(long, default_value = "immunosim.log")]
    pub log_file: String,

    /// Increase log verbosity.
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable the progress bar.
    #[clap(long)]
    pub disable_progress_bar: bool,
}
