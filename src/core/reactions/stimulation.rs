use rand::prelude::*;

use super::{OrderTwo, OrderTwoPhenotype, Reaction};
use crate::core::bcell::Weighting;
use crate::core::gene::Gene;
use crate::core::system::{AntigenRef, BCellRef, CountRef, ImmuneSystem, PopulationRef};
use crate::errors::Result;

/// Pick the genotype of `B` that binds the antigen of `A`, weighted by affinity.
fn select_binder(
    base: &OrderTwoPhenotype,
    system: &ImmuneSystem,
    rng: &mut dyn RngCore,
) -> Result<Gene> {
    let antigen = system.antigen(base.a()).antigen();
    system.bcell(base.b()).select_random_weighted(
        system.affinity(),
        base.weighting(),
        base.aggregate_rate(system),
        antigen,
        rng,
    )
}

/// Antigen driven activation `Ag + B -> Ag + C`.
#[derive(Clone, Debug)]
pub struct Stimulation {
    name: String,
    base: OrderTwoPhenotype,
    product: BCellRef,
}

impl Stimulation {
    pub fn new(
        name: &str,
        k: f64,
        antigen: AntigenRef,
        source: BCellRef,
        product: BCellRef,
        weighting: Weighting,
    ) -> Self {
        Self {
            name: name.to_string(),
            base: OrderTwoPhenotype::new(k, antigen, source, weighting),
            product,
        }
    }
}

impl Reaction for Stimulation {
    fn name(&self) -> &str {
        &self.name
    }

    fn rate(&self, system: &ImmuneSystem) -> f64 {
        self.base.rate(system)
    }

    fn react(&self, system: &mut ImmuneSystem, rng: &mut dyn RngCore) -> Result<()> {
        let gene = select_binder(&self.base, system, rng)?;
        system.bcell_mut(self.base.b()).genotype_decrease(&gene, 1)?;
        system.bcell_mut(self.product).genotype_increase(gene, 1);
        Ok(())
    }
}

/// Memory restimulation `Ag + B -> Ag + C | Ag + D`, `C` with probability `share`.
#[derive(Clone, Debug)]
pub struct MStimulation {
    name: String,
    base: OrderTwoPhenotype,
    primary: BCellRef,
    secondary: BCellRef,
    share: f64,
}

impl MStimulation {
    pub fn new(
        name: &str,
        k: f64,
        antigen: AntigenRef,
        source: BCellRef,
        (primary, secondary): (BCellRef, BCellRef),
        share: f64,
        weighting: Weighting,
    ) -> Self {
        Self {
            name: name.to_string(),
            base: OrderTwoPhenotype::new(k, antigen, source, weighting),
            primary,
            secondary,
            share,
        }
    }
}

impl Reaction for MStimulation {
    fn name(&self) -> &str {
        &self.name
    }

    fn rate(&self, system: &ImmuneSystem) -> f64 {
        self.base.rate(system)
    }

    fn react(&self, system: &mut ImmuneSystem, rng: &mut dyn RngCore) -> Result<()> {
        let gene = select_binder(&self.base, system, rng)?;
        system.bcell_mut(self.base.b()).genotype_decrease(&gene, 1)?;
        let target = if rng.random::<f64>() < self.share {
            self.primary
        } else {
            self.secondary
        };
        system.bcell_mut(target).genotype_increase(gene, 1);
        Ok(())
    }
}

/// T cell help `A + T -> C + T*`: a random B cell of `A` moves to `C`, a helper `T` is activated.
#[derive(Clone, Debug)]
pub struct TStimulation {
    name: String,
    base: OrderTwo,
    source: BCellRef,
    helper: PopulationRef,
    product: BCellRef,
    activated: CountRef,
}

impl TStimulation {
    pub fn new(
        name: &str,
        k: f64,
        (source, helper): (BCellRef, PopulationRef),
        product: BCellRef,
        activated: CountRef,
    ) -> Self {
        Self {
            name: name.to_string(),
            base: OrderTwo::new(k, source, helper),
            source,
            helper,
            product,
            activated,
        }
    }
}

impl Reaction for TStimulation {
    fn name(&self) -> &str {
        &self.name
    }

    fn rate(&self, system: &ImmuneSystem) -> f64 {
        self.base.rate(system)
    }

    fn react(&self, system: &mut ImmuneSystem, rng: &mut dyn RngCore) -> Result<()> {
        let gene = system.bcell(self.source).select_random(rng)?;
        system.bcell_mut(self.source).genotype_decrease(&gene, 1)?;
        system.decrease(self.helper, 1, rng)?;
        system.bcell_mut(self.product).genotype_increase(gene, 1);
        system.population_mut(self.activated).increase(1);
        Ok(())
    }
}

/// Cytotoxic T cell activation `A + B -> A + C`, driven by activated helpers `A`.
#[derive(Clone, Debug)]
pub struct T8Stimulation {
    name: String,
    base: OrderTwo,
    product: PopulationRef,
}

impl T8Stimulation {
    pub fn new(
        name: &str,
        k: f64,
        helper: impl Into<PopulationRef>,
        source: impl Into<PopulationRef>,
        product: impl Into<PopulationRef>,
    ) -> Self {
        Self {
            name: name.to_string(),
            base: OrderTwo::new(k, helper, source),
            product: product.into(),
        }
    }
}

impl Reaction for T8Stimulation {
    fn name(&self) -> &str {
        &self.name
    }

    fn rate(&self, system: &ImmuneSystem) -> f64 {
        self.base.rate(system)
    }

    fn react(&self, system: &mut ImmuneSystem, rng: &mut dyn RngCore) -> Result<()> {
        system.decrease(self.base.b(), 1, rng)?;
        system.increase(self.product, 1, rng)
    }
}
