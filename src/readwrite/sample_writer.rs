use std::io::Write;

use crate::core::affinity::BINDING_PHENOTYPES;
use crate::core::system::{BCellRef, ImmuneSystem, PopulationRef};
use crate::errors::{ImmuneError, Result};
use crate::stats::repertoire::{antigen_subsets, subset_label};
use crate::stats::{Crossreactivity, Neutralization, RepertoireProfile};

/// Coverage fractions reported as repertoire diversity.
pub const DIVERSITY_FRACTIONS: [f64; 4] = [0.25, 0.5, 0.75, 1.];

/// Which statistics end up in the time series.
#[derive(Clone, Debug, Default)]
pub struct SampleColumns {
    /// Populations whose sizes are reported, groups report their total.
    pub populations: Vec<PopulationRef>,
    /// Repertoires reported with phenotype profile, crossreactivity and isotype counts.
    pub repertoires: Vec<BCellRef>,
    /// Repertoires whose largest diversity is reported.
    pub diversity: Vec<BCellRef>,
    /// Antibody repertoire and the affinity factor used for its neutralization estimate.
    pub antibody: Option<(BCellRef, f64)>,
}

/// `;` separated time series of a running simulation.
///
/// A row is written for the first sample and then whenever simulated time has advanced by more
/// than `interval` units since the last row. Time is reported in days.
pub struct SampleWriter<W: Write> {
    writer: csv::Writer<W>,
    columns: SampleColumns,
    tau: f64,
    interval: f64,
    last: Option<f64>,
}

fn write_error(err: impl std::fmt::Display) -> ImmuneError {
    ImmuneError::WriteError(format!("{err}"))
}

impl SampleWriter<std::io::BufWriter<std::fs::File>> {
    pub fn from_path(path: &str, columns: SampleColumns, tau: f64, interval: f64) -> Result<Self> {
        let file = std::fs::File::create(path)
            .map_err(|err| ImmuneError::WriteError(format!("Failed to create {path}: {err}")))?;
        Ok(Self::new(
            std::io::BufWriter::new(file),
            columns,
            tau,
            interval,
        ))
    }
}

impl<W: Write> SampleWriter<W> {
    pub fn new(writer: W, columns: SampleColumns, tau: f64, interval: f64) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .flexible(false)
            .from_writer(writer);
        Self {
            writer,
            columns,
            tau,
            interval,
            last: None,
        }
    }

    pub fn header(&self, system: &ImmuneSystem) -> Vec<String> {
        let antigens = system.antigens();
        let subsets = antigen_subsets(antigens.len());
        let mut header = vec!["Time".to_string()];

        header.extend(
            self.columns
                .populations
                .iter()
                .map(|&population| system.name(population).to_string()),
        );

        for &repertoire in &self.columns.repertoires {
            let name = system.bcell(repertoire).name();
            header.extend(
                (0..BINDING_PHENOTYPES).map(|phenotype| format!("{name}_{phenotype}")),
            );
            header.extend(
                subsets
                    .iter()
                    .map(|subset| format!("{name}_cross{}", subset_label(subset))),
            );
            header.push(format!("{name}_cross_none"));
            header.push(format!("{name}_IgM"));
            header.push(format!("{name}_IgG"));
        }

        if !self.columns.diversity.is_empty() {
            header.extend(
                DIVERSITY_FRACTIONS
                    .iter()
                    .map(|fraction| format!("diversity_{}", (fraction * 100.).round())),
            );
        }

        if let Some((antibody, _)) = self.columns.antibody {
            let name = system.bcell(antibody).name();
            let n_epitopes = antigens
                .iter()
                .map(|antigen| antigen.epitope_count())
                .max()
                .unwrap_or(0);
            for subset in &subsets {
                let label = subset_label(subset);
                header.extend(
                    (1..=n_epitopes).map(|epitope| format!("{name}_spec{label}_{epitope}")),
                );
            }
            header.extend((0..=antigens.len()).map(|count| format!("{name}_trans_{count}")));
            for antigen in antigens.iter() {
                for epitope in antigen.epitopes() {
                    let tag = format!("{name}_{}_{}", antigen.name(), epitope.name());
                    header.extend(
                        ["0-4", "5", "6", "7", "sum"]
                            .iter()
                            .map(|bin| format!("{tag}_{bin}")),
                    );
                }
            }
            header.extend(
                antigens
                    .iter()
                    .map(|antigen| format!("{name}_neutralization_{}", antigen.name())),
            );
        }
        header
    }

    pub fn row(&self, time: f64, system: &ImmuneSystem) -> Vec<String> {
        let mut row = vec![(time * self.tau / 24.).to_string()];

        row.extend(
            self.columns
                .populations
                .iter()
                .map(|&population| system.size(population).to_string()),
        );

        for &repertoire in &self.columns.repertoires {
            let bcell = system.bcell(repertoire);
            row.extend(
                (0..BINDING_PHENOTYPES)
                    .map(|phenotype| bcell.phenotype_size(phenotype, 0).to_string()),
            );
            row.extend(bcell.crossreactivity().iter().map(u64::to_string));
            row.extend(bcell.isotype().iter().map(u64::to_string));
        }

        if !self.columns.diversity.is_empty() {
            row.extend(DIVERSITY_FRACTIONS.iter().map(|&fraction| {
                self.columns
                    .diversity
                    .iter()
                    .map(|&repertoire| system.bcell(repertoire).diversity2(fraction))
                    .max()
                    .unwrap_or(0)
                    .to_string()
            }));
        }

        if let Some((antibody, factor)) = self.columns.antibody {
            let bcell = system.bcell(antibody);
            row.extend(bcell.crossreactivity_specificity().iter().map(u64::to_string));
            row.extend(bcell.transcend().iter().map(u64::to_string));
            for antigen in system.antigens().iter() {
                for epitope in 0..antigen.epitope_count() {
                    let profile = bcell.epitope_profile(antigen.id(), epitope);
                    row.extend(profile.iter().map(u64::to_string));
                    row.push(profile.iter().sum::<u64>().to_string());
                }
            }
            row.extend(
                bcell
                    .neutralization(system.affinity(), factor)
                    .iter()
                    .map(f64::to_string),
            );
        }
        row
    }

    pub fn write_header(&mut self, system: &ImmuneSystem) -> Result<()> {
        let header = self.header(system);
        self.writer.write_record(&header).map_err(write_error)
    }

    /// Write a row if `time` is due, returns whether a row was written.
    pub fn sample(&mut self, time: f64, system: &ImmuneSystem) -> Result<bool> {
        if let Some(last) = self.last {
            if time <= last + self.interval {
                return Ok(false);
            }
        }
        let row = self.row(time, system);
        self.writer.write_record(&row).map_err(write_error)?;
        self.last = Some(time);
        Ok(true)
    }

    /// Time of the last written row.
    pub fn last(&self) -> Option<f64> {
        self.last
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(write_error)
    }

    pub fn finish(self) -> Result<W> {
        self.writer.into_inner().map_err(write_error)
    }
}
