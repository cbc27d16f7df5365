//! Genotype indexed B cell populations
//!
//! A [`BCell`] population tracks every receptor genotype it contains together with its count. On
//! insertion each genotype is annotated with its nearest epitope across all antigens and its
//! binding phenotype (closest distance) against each antigen. The annotations feed a per antigen
//! stratification table addressed by `(epitope, phenotype)` that is kept in sync with the
//! genotype counts, so that affinity weighted selection only has to inspect strata instead of
//! single genotypes.

use ndarray::Array2;
use rand::prelude::*;
use smallvec::SmallVec;
use std::collections::HashMap;

use super::affinity::{AffinityTable, BINDING_PHENOTYPES, MAX_DIST};
use super::antigen::{AntigenList, WeightKind};
use super::gene::{Binding, Gene, GENE_LENGTH, PHENOTYPES};
use super::kernel::select_cumulative;
use crate::errors::{ImmuneError, Result};

/// Fraction of a naive repertoire seeded per `(antigen, epitope, phenotype)` stratum.
pub const NAIVE_REPRESENTATION: f64 = 1e-5;

/// Smallest distance of a synthesized naive genotype.
pub const NAIVE_MIN_DISTANCE: usize = MAX_DIST;

/// Parameters of an affinity weighted interaction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Weighting {
    pub factor: f64,
    pub max_rate: f64,
    pub kind: WeightKind,
}

#[derive(Clone, Debug)]
pub struct GenotypeRecord {
    gene: Gene,
    count: u64,
    epitope: usize,
    bindings: SmallVec<[Binding; 4]>,
}

impl GenotypeRecord {
    pub fn gene(&self) -> &Gene {
        &self.gene
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Nearest epitope across all antigens.
    pub fn epitope(&self) -> usize {
        self.epitope
    }

    /// Binding phenotype against each antigen, indexed by antigen id.
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    #[inline]
    pub fn phenotype(&self, antigen: usize) -> usize {
        self.bindings[antigen].distance
    }
}

#[derive(Clone, Debug)]
pub struct BCell {
    name: String,
    size: u64,
    antigens: AntigenList,
    records: Vec<GenotypeRecord>,
    index: HashMap<Gene, usize>,
    strata: Vec<Array2<u64>>,
}

impl BCell {
    pub fn new(name: &str, antigens: AntigenList) -> Self {
        let epitopes = antigens
            .iter()
            .map(|antigen| antigen.epitope_count())
            .max()
            .unwrap_or(0);
        let strata = antigens
            .iter()
            .map(|_| Array2::zeros((epitopes, PHENOTYPES)))
            .collect();
        Self {
            name: name.to_string(),
            size: 0,
            antigens,
            records: Vec::new(),
            index: HashMap::new(),
            strata,
        }
    }

    /// Rebuild a population from `(gene, count)` pairs, e.g. a genotype dump.
    pub fn from_genotypes<I>(name: &str, antigens: AntigenList, genotypes: I) -> Self
    where
        I: IntoIterator<Item = (Gene, u64)>,
    {
        let mut bcell = Self::new(name, antigens);
        genotypes
            .into_iter()
            .for_each(|(gene, count)| bcell.genotype_increase(gene, count));
        bcell
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of distinct genotypes.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn antigens(&self) -> &AntigenList {
        &self.antigens
    }

    pub fn records(&self) -> &[GenotypeRecord] {
        &self.records
    }

    pub fn get(&self, gene: &Gene) -> Option<&GenotypeRecord> {
        self.index.get(gene).map(|&idx| &self.records[idx])
    }

    /// Count of cells by `(epitope, phenotype)` against `antigen`.
    pub fn strata(&self, antigen: usize) -> &Array2<u64> {
        &self.strata[antigen]
    }

    #[inline]
    pub fn stratum(&self, epitope: usize, phenotype: usize, antigen: usize) -> u64 {
        self.strata[antigen]
            .get((epitope, phenotype))
            .copied()
            .unwrap_or(0)
    }

    fn annotate(&self, gene: Gene, count: u64) -> GenotypeRecord {
        GenotypeRecord {
            gene,
            count,
            epitope: gene.nearest_epitope(&self.antigens),
            bindings: self
                .antigens
                .iter()
                .map(|antigen| gene.phenotype_against(antigen))
                .collect(),
        }
    }

    fn update_strata(&mut self, idx: usize, n: u64, add: bool) {
        let record = &self.records[idx];
        for (strata, binding) in self.strata.iter_mut().zip(record.bindings.iter()) {
            let cell = &mut strata[[record.epitope, binding.distance]];
            if add {
                *cell += n;
            } else {
                *cell -= n;
            }
        }
    }

    /// Insert `n` cells of `gene`, creating the genotype if it is not present yet.
    pub fn add_genotype(&mut self, gene: Gene, n: u64) {
        self.genotype_increase(gene, n)
    }

    pub fn genotype_increase(&mut self, gene: Gene, n: u64) {
        if n == 0 {
            return;
        }
        let idx = match self.index.get(&gene) {
            Some(&idx) => {
                self.records[idx].count += n;
                idx
            }
            None => {
                let record = self.annotate(gene, n);
                self.records.push(record);
                let idx = self.records.len() - 1;
                self.index.insert(gene, idx);
                idx
            }
        };
        self.update_strata(idx, n, true);
        self.size += n;
    }

    /// Remove up to `n` cells of `gene`; the genotype disappears with its last cell.
    pub fn genotype_decrease(&mut self, gene: &Gene, n: u64) -> Result<()> {
        let idx = *self.index.get(gene).ok_or_else(|| {
            ImmuneError::InconsistencyError(format!(
                "Genotype {gene} is not present in population {} of size {}",
                self.name, self.size
            ))
        })?;
        let removed = n.min(self.records[idx].count);
        self.update_strata(idx, removed, false);
        self.records[idx].count -= removed;
        self.size -= removed;

        if self.records[idx].count == 0 {
            let record = self.records.swap_remove(idx);
            self.index.remove(&record.gene);
            if let Some(moved) = self.records.get(idx) {
                self.index.insert(moved.gene, idx);
            }
        }
        Ok(())
    }

    /// Draw a genotype with probability proportional to its count.
    pub fn select_random<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Gene> {
        if self.size == 0 {
            return Err(ImmuneError::InconsistencyError(format!(
                "Cannot select from empty population {}",
                self.name
            )));
        }
        let mut draw = rng.random_range(0..self.size);
        for record in self.records.iter() {
            if draw < record.count {
                return Ok(record.gene);
            }
            draw -= record.count;
        }
        log::debug!("Random selection in {} fell through, using last genotype.", self.name);
        self.records
            .last()
            .map(|record| record.gene)
            .ok_or_else(|| ImmuneError::InconsistencyError(self.name.clone()))
    }

    /// Draw a genotype from the `(epitope, phenotype)` stratum of `antigen`.
    pub fn select_epitope_phenotype<R: Rng + ?Sized>(
        &self,
        epitope: usize,
        phenotype: usize,
        antigen: usize,
        rng: &mut R,
    ) -> Result<Gene> {
        let total = self.stratum(epitope, phenotype, antigen);
        if total == 0 {
            return Err(ImmuneError::InconsistencyError(format!(
                "Stratum (epitope {epitope}, phenotype {phenotype}) of antigen {antigen} in {} is empty",
                self.name
            )));
        }
        let mut draw = rng.random_range(0..total);
        let mut last = None;
        for record in self
            .records
            .iter()
            .filter(|record| record.epitope == epitope && record.phenotype(antigen) == phenotype)
        {
            if draw < record.count {
                return Ok(record.gene);
            }
            draw -= record.count;
            last = Some(record.gene);
        }
        log::debug!(
            "Stratum selection in {} fell through, using last genotype of stratum.",
            self.name
        );
        last.ok_or_else(|| {
            ImmuneError::InconsistencyError(format!(
                "Stratum table of {} is out of sync with its genotypes",
                self.name
            ))
        })
    }

    #[inline]
    fn weight(&self, epitope: usize, kind: WeightKind, antigen: usize) -> f64 {
        self.antigens[antigen]
            .epitope(epitope)
            .map_or(0., |epitope| epitope.weight(kind))
    }

    /// Epitope weighted number of cells in a stratum.
    pub fn real_size_phenotype(
        &self,
        epitope: usize,
        phenotype: usize,
        kind: WeightKind,
        antigen: usize,
    ) -> f64 {
        self.stratum(epitope, phenotype, antigen) as f64 * self.weight(epitope, kind, antigen)
    }

    /// Epitope and affinity weighted number of cells in a stratum.
    pub fn apparent_size_phenotype(
        &self,
        table: &AffinityTable,
        epitope: usize,
        phenotype: usize,
        factor: f64,
        kind: WeightKind,
        antigen: usize,
    ) -> f64 {
        let count = self.stratum(epitope, phenotype, antigen) as f64;
        table.apparent_size(count, phenotype, factor) * self.weight(epitope, kind, antigen)
    }

    pub fn apparent_size_epitope(
        &self,
        table: &AffinityTable,
        epitope: usize,
        factor: f64,
        kind: WeightKind,
        antigen: usize,
    ) -> f64 {
        (0..BINDING_PHENOTYPES)
            .map(|phenotype| {
                self.apparent_size_phenotype(table, epitope, phenotype, factor, kind, antigen)
            })
            .sum()
    }

    /// Apparent size summed over every epitope of `antigen`.
    pub fn apparent_size_all(
        &self,
        table: &AffinityTable,
        factor: f64,
        kind: WeightKind,
        antigen: usize,
    ) -> f64 {
        (0..self.antigens[antigen].epitope_count())
            .map(|epitope| self.apparent_size_epitope(table, epitope, factor, kind, antigen))
            .sum()
    }

    /// Select a genotype for an affinity weighted interaction with `antigen`.
    ///
    /// Every binding stratum gets the saturating propensity
    /// `min(apparent_size * aggregate_rate, real_size * max_rate)`. A stratum is drawn in
    /// proportion to its propensity and a genotype is then drawn from within the stratum.
    pub fn select_random_weighted<R: Rng + ?Sized>(
        &self,
        table: &AffinityTable,
        weighting: &Weighting,
        aggregate_rate: f64,
        antigen: usize,
        rng: &mut R,
    ) -> Result<Gene> {
        let epitopes = self.antigens[antigen].epitope_count();
        let row = table.row(weighting.factor);
        let mut propensities = Vec::with_capacity(epitopes * BINDING_PHENOTYPES);
        for epitope in 0..epitopes {
            let weight = self.weight(epitope, weighting.kind, antigen);
            for (phenotype, affinity) in row.iter().enumerate() {
                let count = self.stratum(epitope, phenotype, antigen) as f64 * weight;
                let propensity =
                    (count * affinity * aggregate_rate).min(count * weighting.max_rate);
                propensities.push((epitope, phenotype, propensity));
            }
        }

        let total: f64 = propensities.iter().map(|(_, _, p)| p).sum();
        if total.is_nan() || total <= 0. {
            return Err(ImmuneError::InconsistencyError(format!(
                "No stratum of {} binds antigen {antigen}",
                self.name
            )));
        }

        let draw = rng.random::<f64>() * total;
        let selected = select_cumulative(propensities.iter().map(|&(_, _, p)| p), draw);
        match selected.map(|index| propensities[index]) {
            Some((epitope, phenotype, _)) => {
                self.select_epitope_phenotype(epitope, phenotype, antigen, rng)
            }
            None => Err(ImmuneError::InconsistencyError(format!(
                "No stratum of {} binds antigen {antigen}",
                self.name
            ))),
        }
    }

    /// Add `n` cells of a freshly synthesized naive genotype.
    ///
    /// The genotype lies at a uniformly drawn distance `NAIVE_MIN_DISTANCE..=GENE_LENGTH` from a
    /// uniformly drawn epitope of a uniformly drawn antigen.
    pub fn increase<R: Rng + ?Sized>(&mut self, n: u64, rng: &mut R) -> Result<()> {
        if self.antigens.is_empty() {
            return Err(ImmuneError::InconsistencyError(format!(
                "Cannot synthesize genotypes for {} without antigens",
                self.name
            )));
        }
        let phenotype = rng.random_range(NAIVE_MIN_DISTANCE..=GENE_LENGTH);
        let antigen = &self.antigens[rng.random_range(0..self.antigens.len())];
        let epitope = rng.random_range(0..antigen.epitope_count());
        let gene = Gene::from_phenotype(phenotype, antigen, epitope, rng)?;
        self.genotype_increase(gene, n);
        Ok(())
    }

    /// Remove `n` cells, each from a genotype drawn in proportion to its count.
    pub fn decrease<R: Rng + ?Sized>(&mut self, n: u64, rng: &mut R) -> Result<()> {
        for _ in 0..n {
            let gene = self.select_random(rng)?;
            self.genotype_decrease(&gene, 1)?;
        }
        Ok(())
    }

    /// Number of cells at `phenotype` against `antigen`.
    pub fn phenotype_size(&self, phenotype: usize, antigen: usize) -> u64 {
        self.strata[antigen].column(phenotype).sum()
    }

    /// Number of cells whose nearest epitope is `epitope`.
    pub fn epitope_size(&self, epitope: usize) -> u64 {
        self.records
            .iter()
            .filter(|record| record.epitope == epitope)
            .map(|record| record.count)
            .sum()
    }

    /// Number of genotypes with at least `threshold` cells.
    pub fn diversity(&self, threshold: u64) -> usize {
        self.records
            .iter()
            .filter(|record| record.count >= threshold)
            .count()
    }

    /// Smallest number of largest genotypes that together hold `fraction` of all cells.
    pub fn diversity2(&self, fraction: f64) -> usize {
        let target = fraction * self.size as f64;
        let mut counts: Vec<u64> = self.records.iter().map(|record| record.count).collect();
        counts.sort_unstable_by(|a, b| b.cmp(a));

        let mut covered = 0u64;
        let mut genotypes = 0;
        for count in counts {
            if covered as f64 >= target {
                break;
            }
            covered += count;
            genotypes += 1;
        }
        genotypes
    }

    /// Seed a naive repertoire at distance `NAIVE_MIN_DISTANCE` from every epitope.
    pub fn generate_population<R: Rng + ?Sized>(&mut self, target: u64, rng: &mut R) -> Result<()> {
        self.populate(target, NAIVE_MIN_DISTANCE..=NAIVE_MIN_DISTANCE, rng)
    }

    /// Seed a naive repertoire at distances `NAIVE_MIN_DISTANCE..GENE_LENGTH` from every epitope.
    pub fn generate_population_new<R: Rng + ?Sized>(
        &mut self,
        target: u64,
        rng: &mut R,
    ) -> Result<()> {
        self.populate(target, NAIVE_MIN_DISTANCE..=GENE_LENGTH - 1, rng)
    }

    fn populate<R: Rng + ?Sized>(
        &mut self,
        target: u64,
        phenotypes: std::ops::RangeInclusive<usize>,
        rng: &mut R,
    ) -> Result<()> {
        let represented = (target as f64 * NAIVE_REPRESENTATION).floor() as u64;
        let antigens = self.antigens.clone();

        for antigen in antigens.iter() {
            let quota = represented / antigen.epitope_count() as u64;
            for epitope in 0..antigen.epitope_count() {
                for phenotype in phenotypes.clone() {
                    for _ in 0..quota {
                        let gene = Gene::from_phenotype(phenotype, antigen, epitope, rng)?;
                        // reject genotypes that bind another antigen more closely
                        let closest = antigens
                            .iter()
                            .map(|other| gene.phenotype_against(other).distance)
                            .min()
                            .unwrap_or(phenotype);
                        if closest == phenotype {
                            self.genotype_increase(gene, 1);
                        }
                    }
                }
            }
        }

        // genotypes may land in the stratum of another epitope, trim overfull strata
        for antigen in antigens.iter() {
            let quota = represented / antigen.epitope_count() as u64;
            for epitope in 0..antigen.epitope_count() {
                for phenotype in phenotypes.clone() {
                    while self.stratum(epitope, phenotype, antigen.id()) > quota {
                        let gene =
                            self.select_epitope_phenotype(epitope, phenotype, antigen.id(), rng)?;
                        self.genotype_decrease(&gene, 1)?;
                    }
                }
            }
        }

        log::debug!(
            "Generated naive population {} with {} cells in {} genotypes.",
            self.name,
            self.size,
            self.len()
        );
        Ok(())
    }

    /// Verify that genotype counts, total size and stratification agree.
    pub fn check_invariants(&self) -> Result<()> {
        let total: u64 = self.records.iter().map(|record| record.count).sum();
        if total != self.size {
            return Err(ImmuneError::InconsistencyError(format!(
                "{}: genotype counts sum to {total}, size is {}",
                self.name, self.size
            )));
        }
        if self.index.len() != self.records.len() {
            return Err(ImmuneError::InconsistencyError(format!(
                "{}: index holds {} genotypes, records hold {}",
                self.name,
                self.index.len(),
                self.records.len()
            )));
        }
        for (idx, record) in self.records.iter().enumerate() {
            if record.count == 0 || self.index.get(&record.gene) != Some(&idx) {
                return Err(ImmuneError::InconsistencyError(format!(
                    "{}: genotype {} is stale or misindexed",
                    self.name, record.gene
                )));
            }
        }
        for (antigen, strata) in self.strata.iter().enumerate() {
            if strata.sum() != self.size {
                return Err(ImmuneError::InconsistencyError(format!(
                    "{}: strata of antigen {antigen} sum to {}, size is {}",
                    self.name,
                    strata.sum(),
                    self.size
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::antigen::{AntigenType, Epitope};
    use crate::core::gene::parse_residues;
    use rand::rngs::StdRng;
    use std::sync::Arc;

    fn antigens() -> AntigenList {
        let definitions = [
            ("V0", ["11111111111111111111", "22222222222222222222"]),
            ("V1", ["11111111111111113333", "22222222222222224444"]),
        ];
        definitions
            .iter()
            .enumerate()
            .map(|(id, (name, sequences))| {
                let epitopes = sequences
                    .iter()
                    .enumerate()
                    .map(|(idx, seq)| {
                        Epitope::new(&format!("e{idx}"), parse_residues(seq).unwrap(), 1., 0.5)
                    })
                    .collect();
                AntigenType::new(name, id, epitopes).unwrap()
            })
            .collect::<Vec<_>>()
            .into()
    }

    fn gene(s: &str) -> Gene {
        s.parse().unwrap()
    }

    #[test]
    fn increase_annotates_genotype() {
        let mut bcell = BCell::new("B", antigens());
        bcell.genotype_increase(gene("11111111111111111112M"), 3);
        let record = bcell.get(&gene("11111111111111111112M")).unwrap();
        assert_eq!(record.count(), 3);
        assert_eq!(record.epitope(), 0);
        assert_eq!(record.phenotype(0), 1);
        assert_eq!(record.phenotype(1), 4);
        assert_eq!(bcell.stratum(0, 1, 0), 3);
        assert_eq!(bcell.stratum(0, 4, 1), 3);
        assert_eq!(bcell.size(), 3);
        bcell.check_invariants().unwrap();
    }

    #[test]
    fn zero_increase_is_noop() {
        let mut bcell = BCell::new("B", antigens());
        bcell.genotype_increase(gene("11111111111111111112M"), 0);
        assert!(bcell.is_empty());
        assert_eq!(bcell.size(), 0);
    }

    #[test]
    fn decrease_removes_exhausted_genotypes() {
        let mut bcell = BCell::new("B", antigens());
        let a = gene("11111111111111111112M");
        let b = gene("22222222222222222221M");
        let c = gene("11111111111111111112G");
        bcell.genotype_increase(a, 2);
        bcell.genotype_increase(b, 1);
        bcell.genotype_increase(c, 5);
        bcell.genotype_decrease(&a, 2).unwrap();
        assert!(bcell.get(&a).is_none());
        assert_eq!(bcell.len(), 2);
        assert_eq!(bcell.get(&c).unwrap().count(), 5);
        bcell.check_invariants().unwrap();

        // removing more cells than present clears the genotype
        bcell.genotype_decrease(&c, 10).unwrap();
        assert!(bcell.get(&c).is_none());
        assert_eq!(bcell.size(), 1);
        bcell.check_invariants().unwrap();
    }

    #[test]
    fn decrease_of_absent_genotype_is_reported() {
        let mut bcell = BCell::new("B", antigens());
        bcell.genotype_increase(gene("11111111111111111112M"), 1);
        let result = bcell.genotype_decrease(&gene("11111111111111111113M"), 1);
        assert!(matches!(result, Err(ImmuneError::InconsistencyError(_))));
        assert_eq!(bcell.size(), 1);
    }

    #[test]
    fn invariants_hold_under_random_operations() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut bcell = BCell::new("B", antigens());
        let pool: Vec<Gene> = (0..50).map(|_| Gene::random(&mut rng)).collect();
        for step in 0..10_000 {
            let gene = pool[rng.random_range(0..pool.len())];
            if rng.random_bool(0.55) || bcell.is_empty() {
                bcell.genotype_increase(gene, rng.random_range(1..4));
            } else {
                let gene = bcell.select_random(&mut rng).unwrap();
                bcell.genotype_decrease(&gene, rng.random_range(1..3)).unwrap();
            }
            if step % 100 == 0 {
                bcell.check_invariants().unwrap();
            }
        }
        bcell.check_invariants().unwrap();
    }

    #[test]
    fn naive_increase_and_random_decrease() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut bcell = BCell::new("B", antigens());
        for _ in 0..200 {
            bcell.increase(1, &mut rng).unwrap();
        }
        assert_eq!(bcell.size(), 200);
        bcell.decrease(150, &mut rng).unwrap();
        assert_eq!(bcell.size(), 50);
        bcell.check_invariants().unwrap();
        assert!(bcell.decrease(51, &mut rng).is_err());
    }

    #[test]
    fn select_random_follows_counts() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut bcell = BCell::new("B", antigens());
        let common = gene("11111111111111111112M");
        let rare = gene("22222222222222222221M");
        bcell.genotype_increase(common, 9);
        bcell.genotype_increase(rare, 1);
        let hits = (0..10_000)
            .filter(|_| bcell.select_random(&mut rng).unwrap() == rare)
            .count();
        assert!((800..1200).contains(&hits));
        assert!(BCell::new("E", antigens()).select_random(&mut rng).is_err());
    }

    #[test]
    fn select_epitope_phenotype_stays_in_stratum() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut bcell = BCell::new("B", antigens());
        bcell.genotype_increase(gene("11111111111111111122M"), 4);
        bcell.genotype_increase(gene("11111111111111112211M"), 4);
        bcell.genotype_increase(gene("22222222222222222211M"), 4);
        for _ in 0..100 {
            let selected = bcell.select_epitope_phenotype(0, 2, 0, &mut rng).unwrap();
            assert_eq!(bcell.get(&selected).unwrap().phenotype(0), 2);
            assert_eq!(bcell.get(&selected).unwrap().epitope(), 0);
        }
        assert!(bcell.select_epitope_phenotype(0, 3, 0, &mut rng).is_err());
    }

    /// Always yields the largest word: float draws land just below one, integer draws on the
    /// top of their range.
    struct MaxRng;

    impl RngCore for MaxRng {
        fn next_u32(&mut self) -> u32 {
            u32::MAX
        }

        fn next_u64(&mut self) -> u64 {
            u64::MAX
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            dst.fill(u8::MAX);
        }
    }

    // two genotypes in stratum (epitope 0, phenotype 2) of V0 followed by one in epitope 1
    fn stratified() -> (BCell, [Gene; 3]) {
        let genes = [
            gene("11111111111111111122M"),
            gene("11111111111111112211M"),
            gene("22222222222222222211M"),
        ];
        let mut bcell = BCell::new("B", antigens());
        for gene in genes {
            bcell.genotype_increase(gene, 4);
        }
        (bcell, genes)
    }

    #[test]
    fn largest_draws_pick_last_candidates() {
        let (bcell, genes) = stratified();
        assert_eq!(bcell.select_random(&mut MaxRng).unwrap(), genes[2]);
        assert_eq!(
            bcell.select_epitope_phenotype(0, 2, 0, &mut MaxRng).unwrap(),
            genes[1]
        );

        let table = AffinityTable::new();
        let weighting = Weighting {
            factor: 10.,
            max_rate: 1.,
            kind: WeightKind::Immunogenicity,
        };
        let selected = bcell
            .select_random_weighted(&table, &weighting, 1., 0, &mut MaxRng)
            .unwrap();
        assert_eq!(selected, genes[2]);
    }

    #[test]
    fn selection_falls_back_on_stale_counts() {
        let (mut bcell, genes) = stratified();
        // counts claim more cells than the genotypes hold
        bcell.size += 3;
        assert_eq!(bcell.select_random(&mut MaxRng).unwrap(), genes[2]);

        bcell.strata[0][[0, 2]] += 3;
        assert_eq!(
            bcell.select_epitope_phenotype(0, 2, 0, &mut MaxRng).unwrap(),
            genes[1]
        );
        assert!(bcell.check_invariants().is_err());
    }

    #[test]
    fn increase_requires_antigens() {
        let mut rng = StdRng::seed_from_u64(3);
        let antigens: AntigenList = Vec::<AntigenType>::new().into();
        let mut bcell = BCell::new("B", antigens);
        assert!(matches!(
            bcell.increase(1, &mut rng),
            Err(ImmuneError::InconsistencyError(_))
        ));
        assert!(bcell.is_empty());
    }

    #[test]
    fn weighted_selection_only_picks_binders() {
        let mut rng = StdRng::seed_from_u64(17);
        let table = AffinityTable::new();
        let mut bcell = BCell::new("B", antigens());
        let binder = gene("11111111111111111222M");
        bcell.genotype_increase(binder, 1);
        bcell.genotype_increase(gene("34343434343434343434M"), 1000);
        let weighting = Weighting {
            factor: 10.,
            max_rate: 1.,
            kind: WeightKind::Immunogenicity,
        };
        for _ in 0..100 {
            let selected = bcell
                .select_random_weighted(&table, &weighting, 1., 0, &mut rng)
                .unwrap();
            assert_eq!(selected, binder);
        }

        let mut empty = BCell::new("E", antigens());
        empty.genotype_increase(gene("34343434343434343434M"), 10);
        assert!(
            empty
                .select_random_weighted(&table, &weighting, 1., 0, &mut rng)
                .is_err()
        );
    }

    #[test]
    fn apparent_sizes() {
        let table = AffinityTable::new();
        let mut bcell = BCell::new("B", antigens());
        // distance 5 to epitope 0 of V0
        bcell.genotype_increase(gene("11111111111111122222M"), 2);
        assert_eq!(bcell.real_size_phenotype(0, 5, WeightKind::Clearance, 0), 1.);
        assert_eq!(
            bcell.apparent_size_phenotype(&table, 0, 5, 10., WeightKind::Immunogenicity, 0),
            20.
        );
        assert_eq!(
            bcell.apparent_size_epitope(&table, 0, 10., WeightKind::Immunogenicity, 0),
            20.
        );
        assert_eq!(
            bcell.apparent_size_all(&table, 10., WeightKind::Clearance, 0),
            10.
        );
    }

    #[test]
    fn diversity_measures() {
        let mut bcell = BCell::new("B", antigens());
        let mut rng = StdRng::seed_from_u64(1);
        for count in [50, 30, 10, 5, 5] {
            bcell.genotype_increase(Gene::random(&mut rng), count);
        }
        assert_eq!(bcell.diversity(10), 3);
        assert_eq!(bcell.diversity(1), 5);
        assert_eq!(bcell.diversity2(0.25), 1);
        assert_eq!(bcell.diversity2(0.5), 1);
        assert_eq!(bcell.diversity2(0.75), 2);
        assert_eq!(bcell.diversity2(1.), 5);
    }

    #[test]
    fn generated_population_respects_quota() {
        let mut rng = StdRng::seed_from_u64(23);
        let mut bcell = BCell::new("nB", antigens());
        bcell.generate_population(2_000_000, &mut rng).unwrap();
        bcell.check_invariants().unwrap();
        assert!(bcell.size() > 0);
        for antigen in 0..2 {
            for epitope in 0..2 {
                assert!(bcell.stratum(epitope, NAIVE_MIN_DISTANCE, antigen) <= 10);
            }
            for phenotype in 0..NAIVE_MIN_DISTANCE {
                assert_eq!(bcell.phenotype_size(phenotype, antigen), 0);
            }
        }

        let mut bcell = BCell::new("nB", antigens());
        bcell.generate_population_new(400_000, &mut rng).unwrap();
        bcell.check_invariants().unwrap();
        for record in bcell.records() {
            let closest = record.bindings().iter().map(|b| b.distance).min().unwrap();
            assert!((NAIVE_MIN_DISTANCE..GENE_LENGTH).contains(&closest));
        }
    }

    #[test]
    fn rebuild_from_genotypes() {
        let mut rng = StdRng::seed_from_u64(29);
        let mut bcell = BCell::new("Ab", antigens());
        for _ in 0..100 {
            bcell.genotype_increase(Gene::random(&mut rng), rng.random_range(1..10));
        }
        let rebuilt = BCell::from_genotypes(
            "Ab",
            Arc::clone(bcell.antigens()),
            bcell.records().iter().map(|r| (*r.gene(), r.count())),
        );
        assert_eq!(rebuilt.size(), bcell.size());
        for antigen in 0..2 {
            assert_eq!(rebuilt.strata(antigen), bcell.strata(antigen));
        }
    }
}
