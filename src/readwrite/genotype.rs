use std::io::{Read, Write};

use crate::core::antigen::AntigenList;
use crate::core::bcell::BCell;
use crate::core::gene::Gene;
use crate::errors::{ImmuneError, Result};

/// Dump and restore the genotype table of a repertoire.
///
/// One `sequence;epitope;count` row per genotype, without header. The epitope column is the
/// nearest epitope index and is recomputed on reading.
pub trait GenotypeIO: Sized {
    fn write_genotypes(&self, writer: &mut dyn Write) -> Result<()>;
    fn read_genotypes(name: &str, antigens: AntigenList, reader: &mut dyn Read) -> Result<Self>;

    fn write_genotypes_to_file(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)
            .map_err(|err| ImmuneError::WriteError(format!("Failed to create {path}: {err}")))?;
        let mut writer = std::io::BufWriter::new(file);
        self.write_genotypes(&mut writer)?;
        writer
            .flush()
            .map_err(|err| ImmuneError::WriteError(format!("{err}")))
    }

    fn read_genotypes_from_path(name: &str, antigens: AntigenList, path: &str) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|err| ImmuneError::ReadError(format!("Failed to open {path}: {err}")))?;
        let mut reader = std::io::BufReader::new(file);
        Self::read_genotypes(name, antigens, &mut reader)
    }
}

impl GenotypeIO for BCell {
    fn write_genotypes(&self, writer: &mut dyn Write) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .from_writer(writer);
        for record in self.records() {
            csv_writer
                .write_record(&[
                    record.gene().to_string(),
                    record.epitope().to_string(),
                    record.count().to_string(),
                ])
                .map_err(|err| ImmuneError::WriteError(format!("{err}")))?;
        }
        csv_writer
            .flush()
            .map_err(|err| ImmuneError::WriteError(format!("{err}")))
    }

    fn read_genotypes(name: &str, antigens: AntigenList, reader: &mut dyn Read) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut genotypes = Vec::new();
        for result in reader.records() {
            let row = result.map_err(|err| ImmuneError::ReadError(format!("{err}")))?;
            let line = row.position().map_or(0, |position| position.line());
            let (Some(sequence), Some(count)) = (row.get(0), row.get(2)) else {
                return Err(ImmuneError::ReadError(format!(
                    "Genotype record on line {line} needs sequence, epitope and count"
                )));
            };
            let gene: Gene = sequence.trim().parse().map_err(|err| {
                ImmuneError::ReadError(format!("Invalid genotype on line {line}: {err}"))
            })?;
            let count: u64 = count.trim().parse().map_err(|_| {
                ImmuneError::ReadError(format!("Invalid count `{count}` on line {line}"))
            })?;
            genotypes.push((gene, count));
        }
        Ok(BCell::from_genotypes(name, antigens, genotypes))
    }
}
