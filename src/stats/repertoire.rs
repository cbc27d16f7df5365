use itertools::Itertools;

use crate::core::affinity::{AffinityTable, MAX_DIST};
use crate::core::bcell::{BCell, GenotypeRecord};
use crate::encoding::Isotype;

/// Antigen subsets in output order: larger subsets first, lexicographic within a size.
///
/// The empty set is not included.
pub fn antigen_subsets(n_antigens: usize) -> Vec<Vec<usize>> {
    (1..=n_antigens)
        .rev()
        .flat_map(|size| (0..n_antigens).combinations(size))
        .collect()
}

/// Label of an antigen subset, e.g. `124` for antigens 0, 1 and 3.
pub fn subset_label(subset: &[usize]) -> String {
    subset.iter().map(|antigen| (antigen + 1).to_string()).join("")
}

/// Indices of the antigens a genotype binds to (phenotype within `MAX_DIST`).
fn recognised(record: &GenotypeRecord) -> Vec<usize> {
    record
        .bindings()
        .iter()
        .enumerate()
        .filter(|(_, binding)| binding.distance <= MAX_DIST)
        .map(|(antigen, _)| antigen)
        .collect()
}

/// Trait extension to break a repertoire down by the antigens it recognises
pub trait Crossreactivity {
    /// Cell counts per recognised antigen set, one bin per subset of [`antigen_subsets`] and a
    /// final bin for cells that bind no antigen.
    fn crossreactivity(&self) -> Vec<u64>;

    /// Cell counts per recognised antigen set and shared nearest epitope index.
    ///
    /// For each subset of [`antigen_subsets`] there are as many bins as the largest antigen has
    /// epitopes. A genotype is counted if the set of antigens it binds is exactly the subset and
    /// its nearest epitope has the same index on every antigen of the subset.
    fn crossreactivity_specificity(&self) -> Vec<u64>;

    /// Cell counts by number of bound antigens, `0..=n_antigens`.
    ///
    /// Only the first `n_antigens - 1` antigens are counted, so the last bin is always empty and
    /// cells that bind only the last antigen land in bin 0.
    fn transcend(&self) -> Vec<u64>;
}

impl Crossreactivity for BCell {
    fn crossreactivity(&self) -> Vec<u64> {
        let subsets = antigen_subsets(self.antigens().len());
        let mut output = vec![0; subsets.len() + 1];
        for record in self.records() {
            let bound = recognised(record);
            let bin = subsets
                .iter()
                .position(|subset| *subset == bound)
                .unwrap_or(subsets.len());
            output[bin] += record.count();
        }
        output
    }

    fn crossreactivity_specificity(&self) -> Vec<u64> {
        let subsets = antigen_subsets(self.antigens().len());
        let n_epitopes = self
            .antigens()
            .iter()
            .map(|antigen| antigen.epitope_count())
            .max()
            .unwrap_or(0);
        let mut output = vec![0; subsets.len() * n_epitopes];
        for record in self.records() {
            let bound = recognised(record);
            let Some(bin) = subsets.iter().position(|subset| *subset == bound) else {
                continue;
            };
            let bindings = record.bindings();
            let epitope = bindings[bound[0]].epitope;
            if bound.iter().all(|&antigen| bindings[antigen].epitope == epitope) {
                output[bin * n_epitopes + epitope] += record.count();
            }
        }
        output
    }

    fn transcend(&self) -> Vec<u64> {
        let n_antigens = self.antigens().len();
        let mut output = vec![0; n_antigens + 1];
        // the last antigen is not counted, its bin stays empty
        let counted = n_antigens.saturating_sub(1);
        for record in self.records() {
            let bound = recognised(record)
                .into_iter()
                .filter(|&antigen| antigen < counted)
                .count();
            output[bound] += record.count();
        }
        output
    }
}

/// Trait extension to estimate the neutralizing capacity of an antibody repertoire
pub trait Neutralization {
    /// Per antigen sum of `count * binding_affinity(phenotype, factor)` over binding genotypes.
    fn neutralization(&self, table: &AffinityTable, factor: f64) -> Vec<f64>;
}

impl Neutralization for BCell {
    fn neutralization(&self, table: &AffinityTable, factor: f64) -> Vec<f64> {
        let mut output = vec![0.; self.antigens().len()];
        for record in self.records() {
            for (antigen, binding) in record.bindings().iter().enumerate() {
                output[antigen] +=
                    table.apparent_size(record.count() as f64, binding.distance, factor);
            }
        }
        output
    }
}

/// Trait extension for per epitope and isotype summaries
pub trait RepertoireProfile {
    /// Cells binding epitope `epitope` of `antigen`: `[phenotypes 0..=4, 5, 6, 7]`.
    fn epitope_profile(&self, antigen: usize, epitope: usize) -> [u64; 4];

    /// Cell counts by isotype, `[IgM, IgG]`.
    fn isotype(&self) -> [u64; 2];
}

impl RepertoireProfile for BCell {
    fn epitope_profile(&self, antigen: usize, epitope: usize) -> [u64; 4] {
        let stratum = |phenotype| self.stratum(epitope, phenotype, antigen);
        [
            (0..=4).map(stratum).sum(),
            stratum(5),
            stratum(6),
            stratum(7),
        ]
    }

    fn isotype(&self) -> [u64; 2] {
        let switched = self
            .records()
            .iter()
            .filter(|record| record.gene().isotype() == Isotype::IgG)
            .map(|record| record.count())
            .sum::<u64>();
        [self.size() - switched, switched]
    }
}
