use rand::prelude::*;
use serde::{Deserialize, Serialize};

use super::{OrderOne, Reaction};
use crate::core::system::{BCellRef, CountRef, ImmuneSystem, PopulationRef};
use crate::encoding::VOCABULARY;
use crate::errors::Result;

/// Fate probabilities of dividing germinal center B cells.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FateProbabilities {
    /// Class switch to IgG.
    pub isotype: f64,
    /// Somatic hypermutation, before lethal and silent corrections.
    pub mutation: f64,
    /// Reversion to the stimulated pool.
    pub reverse: f64,
    /// Exit into memory or plasma cells.
    pub differentiation: f64,
    /// Share of mutations that are lethal.
    pub lethal: f64,
    /// Share of exiting cells that become memory cells.
    pub memory: f64,
    /// Share of exiting plasma cells that are short lived.
    pub short_lived: f64,
    /// Share of restimulated memory cells that become short lived plasma cells.
    pub memory_short_lived: f64,
}

impl Default for FateProbabilities {
    fn default() -> Self {
        Self {
            isotype: 0.10,
            mutation: 0.10,
            reverse: 0.10,
            differentiation: 0.10,
            lethal: 0.0,
            memory: 0.2,
            short_lived: 0.975,
            memory_short_lived: 0.975,
        }
    }
}

impl FateProbabilities {
    /// Effective mutation probability, corrected for silent and lethal mutations.
    pub fn effective_mutation(&self) -> f64 {
        (self.mutation + self.mutation / VOCABULARY as f64) * (1. - self.lethal)
    }
}

/// Germinal center division `A -> 2 daughters`.
///
/// Each of the two daughters independently switches isotype into `B`, mutates into `B`, reverts
/// into `C`, exits into memory `D`, short lived plasma `E` or long lived plasma `F`, or stays in
/// `B` unchanged.
#[derive(Clone, Debug)]
pub struct Differentiation {
    name: String,
    base: OrderOne,
    source: BCellRef,
    germinal: BCellRef,
    stimulated: BCellRef,
    memory: BCellRef,
    short_lived: BCellRef,
    long_lived: BCellRef,
    fates: FateProbabilities,
}

impl Differentiation {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &str,
        k: f64,
        source: BCellRef,
        germinal: BCellRef,
        stimulated: BCellRef,
        memory: BCellRef,
        short_lived: BCellRef,
        long_lived: BCellRef,
        fates: FateProbabilities,
    ) -> Self {
        Self {
            name: name.to_string(),
            base: OrderOne::new(k, source),
            source,
            germinal,
            stimulated,
            memory,
            short_lived,
            long_lived,
            fates,
        }
    }
}

impl Reaction for Differentiation {
    fn name(&self) -> &str {
        &self.name
    }

    fn rate(&self, system: &ImmuneSystem) -> f64 {
        self.base.rate(system)
    }

    fn react(&self, system: &mut ImmuneSystem, rng: &mut dyn RngCore) -> Result<()> {
        let gene = system.bcell(self.source).select_random(rng)?;
        system.bcell_mut(self.source).genotype_decrease(&gene, 1)?;

        let isotype = self.fates.isotype;
        let mutation = isotype + self.fates.effective_mutation();
        let reverse = mutation + self.fates.reverse;
        let differentiation = reverse + self.fates.differentiation;

        for _ in 0..2 {
            let draw: f64 = rng.random();
            let (target, daughter) = if draw <= isotype {
                (self.germinal, gene.switch_isotype())
            } else if draw <= mutation {
                (self.germinal, gene.mutate(rng))
            } else if draw <= reverse {
                (self.stimulated, gene)
            } else if draw <= differentiation {
                if rng.random::<f64>() < self.fates.memory {
                    (self.memory, gene)
                } else if rng.random::<f64>() < self.fates.short_lived {
                    (self.short_lived, gene)
                } else {
                    (self.long_lived, gene)
                }
            } else {
                (self.germinal, gene)
            };
            system.bcell_mut(target).genotype_increase(daughter, 1);
        }
        Ok(())
    }
}

/// Division of stimulated B cells into two germinal center daughters `A -> 2B`.
#[derive(Clone, Debug)]
pub struct BDifferentiation {
    name: String,
    base: OrderOne,
    source: BCellRef,
    target: BCellRef,
    fates: FateProbabilities,
}

impl BDifferentiation {
    pub fn new(
        name: &str,
        k: f64,
        source: BCellRef,
        target: BCellRef,
        fates: FateProbabilities,
    ) -> Self {
        Self {
            name: name.to_string(),
            base: OrderOne::new(k, source),
            source,
            target,
            fates,
        }
    }
}

impl Reaction for BDifferentiation {
    fn name(&self) -> &str {
        &self.name
    }

    fn rate(&self, system: &ImmuneSystem) -> f64 {
        self.base.rate(system)
    }

    fn react(&self, system: &mut ImmuneSystem, rng: &mut dyn RngCore) -> Result<()> {
        let gene = system.bcell(self.source).select_random(rng)?;
        system.bcell_mut(self.source).genotype_decrease(&gene, 1)?;

        let isotype = self.fates.isotype;
        let mutation = isotype + self.fates.effective_mutation();
        for _ in 0..2 {
            let draw: f64 = rng.random();
            let daughter = if draw <= isotype {
                gene.switch_isotype()
            } else if draw <= mutation {
                gene.mutate(rng)
            } else {
                gene
            };
            system.bcell_mut(self.target).genotype_increase(daughter, 1);
        }
        Ok(())
    }
}

/// Probability that an activated helper T cell expands into two effectors.
const T_EXPANSION: f64 = 0.025;

/// Cumulative probability that an activated helper T cell yields at least one effector.
const T_EFFECTOR: f64 = 0.9;

/// Helper T cell fate `A -> 2B | B | C`.
#[derive(Clone, Debug)]
pub struct TDifferentiation {
    name: String,
    base: OrderOne,
    effector: PopulationRef,
    memory: PopulationRef,
}

impl TDifferentiation {
    pub fn new(
        name: &str,
        k: f64,
        source: impl Into<PopulationRef>,
        effector: impl Into<PopulationRef>,
        memory: impl Into<PopulationRef>,
    ) -> Self {
        Self {
            name: name.to_string(),
            base: OrderOne::new(k, source),
            effector: effector.into(),
            memory: memory.into(),
        }
    }
}

impl Reaction for TDifferentiation {
    fn name(&self) -> &str {
        &self.name
    }

    fn rate(&self, system: &ImmuneSystem) -> f64 {
        self.base.rate(system)
    }

    fn react(&self, system: &mut ImmuneSystem, rng: &mut dyn RngCore) -> Result<()> {
        system.decrease(self.base.a(), 1, rng)?;
        let draw: f64 = rng.random();
        if draw <= T_EXPANSION {
            system.increase(self.effector, 2, rng)
        } else if draw <= T_EFFECTOR {
            system.increase(self.effector, 1, rng)
        } else {
            system.increase(self.memory, 1, rng)
        }
    }
}

/// Cytotoxic T cell expansion `A -> 2B`.
#[derive(Clone, Debug)]
pub struct T8Differentiation {
    name: String,
    base: OrderOne,
    target: CountRef,
}

impl T8Differentiation {
    pub fn new(name: &str, k: f64, source: impl Into<PopulationRef>, target: CountRef) -> Self {
        Self {
            name: name.to_string(),
            base: OrderOne::new(k, source),
            target,
        }
    }
}

impl Reaction for T8Differentiation {
    fn name(&self) -> &str {
        &self.name
    }

    fn rate(&self, system: &ImmuneSystem) -> f64 {
        self.base.rate(system)
    }

    fn react(&self, system: &mut ImmuneSystem, rng: &mut dyn RngCore) -> Result<()> {
        system.decrease(self.base.a(), 1, rng)?;
        system.population_mut(self.target).increase(2);
        Ok(())
    }
}
