//! Reading and writing antigen tables, genotype dumps, strata and time series.

mod antigen;
mod genotype;
mod sample_writer;
mod strata;

pub use antigen::{read_antigens, read_antigens_from_path};
pub use genotype::GenotypeIO;
pub use sample_writer::{DIVERSITY_FRACTIONS, SampleColumns, SampleWriter};
pub use strata::{write_strata, write_strata_to_file};
