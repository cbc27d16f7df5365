use npyz::WriterBuilder;

use crate::core::bcell::BCell;
use crate::errors::{ImmuneError, Result};

/// Write the epitope by phenotype table of `bcell` against `antigen` as a 2d `.npy` array.
pub fn write_strata(bcell: &BCell, antigen: usize, writer: &mut impl std::io::Write) -> Result<()> {
    let strata = bcell.strata(antigen);
    let shape = &[strata.nrows() as u64, strata.ncols() as u64];
    let mut npy_writer = npyz::WriteOptions::new()
        .default_dtype()
        .shape(shape)
        .writer(writer)
        .begin_nd()
        .map_err(|e| ImmuneError::WriteError(format!("{}", e)))?;
    npy_writer
        .extend(strata.iter().copied())
        .map_err(|e| ImmuneError::WriteError(format!("{}", e)))?;
    npy_writer
        .finish()
        .map_err(|e| ImmuneError::WriteError(format!("{}", e)))?;
    Ok(())
}

pub fn write_strata_to_file(bcell: &BCell, antigen: usize, path: &str) -> Result<()> {
    let file = std::fs::File::create(path)
        .map_err(|e| ImmuneError::WriteError(format!("Failed to create {path}: {e}")))?;
    let mut writer = std::io::BufWriter::new(file);
    write_strata(bcell, antigen, &mut writer)
}
