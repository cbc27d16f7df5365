use rand::Rng;
use rand_distr::{Distribution, Triangular};
use serde::{Deserialize, Serialize};

use crate::core::reactions::FateProbabilities;
use crate::errors::{ImmuneError, Result};

/// Triangular distribution of a formation constant, sampled once per run.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TriangularRange {
    pub min: f64,
    pub mode: f64,
    pub max: f64,
}

impl TriangularRange {
    pub const fn new(min: f64, mode: f64, max: f64) -> Self {
        Self { min, mode, max }
    }

    /// Draw a value, rounded to four decimals.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64> {
        let distribution = Triangular::new(self.min, self.max, self.mode).map_err(|err| {
            ImmuneError::InitializationError(format!(
                "Invalid triangular range {self:?}: {err}"
            ))
        })?;
        let value: f64 = distribution.sample(rng);
        Ok((value * 1e4).round() / 1e4)
    }
}

/// Formation constants of naive lymphocytes (hours per formation event).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FormationRanges {
    pub naive_b: TriangularRange,
    pub t_cd4: TriangularRange,
    pub t_cd8: TriangularRange,
}

impl Default for FormationRanges {
    fn default() -> Self {
        Self {
            naive_b: TriangularRange::new(0.0848, 0.1479, 0.2488),
            t_cd4: TriangularRange::new(0.0496, 0.0735, 0.1223),
            t_cd8: TriangularRange::new(0.0949, 0.1306, 0.2225),
        }
    }
}

/// Model parameters.
///
/// Times are given in hours and turned into rate constants per `tau` period by the scenario
/// builder, typically as `tau / time`. Every field defaults to the dengue reinfection setup.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Parameters {
    /// Length of one simulated time unit in hours.
    pub tau: f64,

    /// Initial size of the naive B cell repertoire.
    pub naive_b_initial: u64,
    pub t_cd4_initial: u64,
    pub t_cd8_initial: u64,

    /// Carrying capacity of the germinal center populations.
    pub b_capacity: f64,
    /// Carrying capacity of the stimulated T cell populations.
    pub t_capacity: f64,

    /// Affinity factor used for B cell stimulation.
    pub b_affinity: f64,
    /// Affinity factor used for antibody clearance and neutralization.
    pub antibody_affinity: f64,

    /// Global stimulation strength, scales the saturation limits.
    pub stimulation: f64,
    pub naive_stimulation_time: f64,
    pub naive_stimulation_limit: f64,
    pub germinal_stimulation_time: f64,
    pub germinal_stimulation_limit: f64,
    pub memory_stimulation_time: f64,
    pub memory_stimulation_limit: f64,

    /// T cell help by naive and memory CD4 T cells, and CD8 activation.
    pub t_help_time: f64,
    pub t_memory_help_time: f64,
    pub t_cd8_stimulation_time: f64,

    /// Half life of naive lymphocytes, also the lower bound of germinal center decay.
    pub lymphocyte_decay_time: f64,
    /// Offset of the germinal center logistic decay, `r = tau / (tau + offset)`.
    pub germinal_decay_offset: f64,
    pub t_decay_offset: f64,
    pub t_decay_time: f64,

    pub stimulated_differentiation_time: f64,
    pub helped_differentiation_time: f64,
    pub t_cd4_differentiation_time: f64,
    pub t_cd8_differentiation_time: f64,

    /// Antibody secretion constants of short and long lived plasma cells.
    pub short_lived_production: f64,
    pub long_lived_production: f64,
    pub antibody_decay_time: f64,
    pub plasma_decay_time: f64,

    /// Intrinsic half life and replication time of the antigen.
    pub antigen_decay_time: f64,
    pub antigen_replication_time: f64,

    pub antibody_clearance: f64,
    pub antibody_clearance_limit: f64,
    /// Antibody count that has to be exceeded before antigen is cleared.
    pub antibody_clearance_threshold: u64,
    pub t_cd8_clearance: f64,

    /// Antigen units added at every inoculation.
    pub inoculum: u64,

    pub fates: FateProbabilities,
    pub formation: FormationRanges,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            tau: 8.,
            naive_b_initial: 50_000_000,
            t_cd4_initial: 1150,
            t_cd8_initial: 1050,
            b_capacity: 5000.,
            t_capacity: 5000.,
            b_affinity: 10.,
            antibody_affinity: 2.5,
            stimulation: 1.,
            naive_stimulation_time: 360.,
            naive_stimulation_limit: 6.,
            germinal_stimulation_time: 20.,
            germinal_stimulation_limit: 0.45,
            memory_stimulation_time: 80.,
            memory_stimulation_limit: 24.,
            t_help_time: 1200.,
            t_memory_help_time: 2400.,
            t_cd8_stimulation_time: 8.,
            lymphocyte_decay_time: 108.,
            germinal_decay_offset: 1.,
            t_decay_offset: 200.,
            t_decay_time: 21600.,
            stimulated_differentiation_time: 60.,
            helped_differentiation_time: 8.,
            t_cd4_differentiation_time: 15.,
            t_cd8_differentiation_time: 180.,
            short_lived_production: 1.,
            long_lived_production: 0.1,
            antibody_decay_time: 360.,
            plasma_decay_time: 72.,
            antigen_decay_time: 8.,
            antigen_replication_time: 6.2,
            antibody_clearance: 0.00025,
            antibody_clearance_limit: 10_000.,
            antibody_clearance_threshold: 900,
            t_cd8_clearance: 0.000025,
            inoculum: 100,
            fates: FateProbabilities::default(),
            formation: FormationRanges::default(),
        }
    }
}

impl Parameters {
    /// Per tau rate of an event with characteristic time `hours`.
    pub fn per_tau(&self, hours: f64) -> f64 {
        self.tau / hours
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("tau", self.tau),
            ("b_capacity", self.b_capacity),
            ("t_capacity", self.t_capacity),
            ("b_affinity", self.b_affinity),
            ("antibody_affinity", self.antibody_affinity),
            ("naive_stimulation_time", self.naive_stimulation_time),
            ("naive_stimulation_limit", self.naive_stimulation_limit),
            ("germinal_stimulation_time", self.germinal_stimulation_time),
            ("germinal_stimulation_limit", self.germinal_stimulation_limit),
            ("memory_stimulation_time", self.memory_stimulation_time),
            ("memory_stimulation_limit", self.memory_stimulation_limit),
            ("t_help_time", self.t_help_time),
            ("t_memory_help_time", self.t_memory_help_time),
            ("t_cd8_stimulation_time", self.t_cd8_stimulation_time),
            ("lymphocyte_decay_time", self.lymphocyte_decay_time),
            ("t_decay_time", self.t_decay_time),
            ("stimulated_differentiation_time", self.stimulated_differentiation_time),
            ("helped_differentiation_time", self.helped_differentiation_time),
            ("t_cd4_differentiation_time", self.t_cd4_differentiation_time),
            ("t_cd8_differentiation_time", self.t_cd8_differentiation_time),
            ("antibody_decay_time", self.antibody_decay_time),
            ("plasma_decay_time", self.plasma_decay_time),
            ("antigen_decay_time", self.antigen_decay_time),
            ("antigen_replication_time", self.antigen_replication_time),
        ];
        if let Some((name, value)) = positive
            .iter()
            .find(|(_, value)| value.is_nan() || *value <= 0.)
        {
            return Err(ImmuneError::InitializationError(format!(
                "Parameter `{name}` has to be positive, got {value}."
            )));
        }

        let fates = &self.fates;
        let probabilities = [
            ("fates.isotype", fates.isotype),
            ("fates.mutation", fates.mutation),
            ("fates.reverse", fates.reverse),
            ("fates.differentiation", fates.differentiation),
            ("fates.lethal", fates.lethal),
            ("fates.memory", fates.memory),
            ("fates.short_lived", fates.short_lived),
            ("fates.memory_short_lived", fates.memory_short_lived),
        ];
        if let Some((name, value)) = probabilities
            .iter()
            .find(|(_, value)| !(0. ..=1.).contains(value))
        {
            return Err(ImmuneError::InitializationError(format!(
                "Probability `{name}` has to lie in [0, 1], got {value}."
            )));
        }
        let total = fates.isotype
            + fates.effective_mutation()
            + fates.reverse
            + fates.differentiation;
        if total > 1. {
            return Err(ImmuneError::InitializationError(format!(
                "Daughter cell fate probabilities sum to {total} > 1."
            )));
        }

        for range in [
            &self.formation.naive_b,
            &self.formation.t_cd4,
            &self.formation.t_cd8,
        ] {
            if !(range.min > 0. && range.min <= range.mode && range.mode <= range.max) {
                return Err(ImmuneError::InitializationError(format!(
                    "Invalid formation range {range:?}."
                )));
            }
        }
        Ok(())
    }
}
