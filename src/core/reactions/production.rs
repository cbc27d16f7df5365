use rand::RngCore;

use super::{OrderOne, OrderTwo, Reaction};
use crate::core::system::{BCellRef, ImmuneSystem, PopulationRef};
use crate::errors::Result;

/// Antibody secretion `A -> A + B`, the product inherits the producer's genotype.
#[derive(Clone, Debug)]
pub struct Production {
    name: String,
    base: OrderOne,
    producer: BCellRef,
    product: BCellRef,
}

impl Production {
    pub fn new(name: &str, k: f64, producer: BCellRef, product: BCellRef) -> Self {
        Self {
            name: name.to_string(),
            base: OrderOne::new(k, producer),
            producer,
            product,
        }
    }
}

impl Reaction for Production {
    fn name(&self) -> &str {
        &self.name
    }

    fn rate(&self, system: &ImmuneSystem) -> f64 {
        self.base.rate(system)
    }

    fn react(&self, system: &mut ImmuneSystem, rng: &mut dyn RngCore) -> Result<()> {
        let gene = system.bcell(self.producer).select_random(rng)?;
        system.bcell_mut(self.product).genotype_increase(gene, 1);
        Ok(())
    }
}

/// Secretion by long lived plasma cells `A + B -> A + B + C`, scaled by a niche population `A`.
#[derive(Clone, Debug)]
pub struct LLPCProduction {
    name: String,
    base: OrderTwo,
    producer: BCellRef,
    product: BCellRef,
}

impl LLPCProduction {
    pub fn new(
        name: &str,
        k: f64,
        niche: impl Into<PopulationRef>,
        producer: BCellRef,
        product: BCellRef,
    ) -> Self {
        Self {
            name: name.to_string(),
            base: OrderTwo::new(k, niche, producer),
            producer,
            product,
        }
    }
}

impl Reaction for LLPCProduction {
    fn name(&self) -> &str {
        &self.name
    }

    fn rate(&self, system: &ImmuneSystem) -> f64 {
        self.base.rate(system)
    }

    fn react(&self, system: &mut ImmuneSystem, rng: &mut dyn RngCore) -> Result<()> {
        let gene = system.bcell(self.producer).select_random(rng)?;
        system.bcell_mut(self.product).genotype_increase(gene, 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gene::Gene;
    use crate::core::reactions::tests::system;
    use rand::prelude::*;
    use rand::rngs::StdRng;
    use std::f64::consts::LN_2;

    #[test]
    fn products_inherit_genotypes() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut system = system();
        let plasma = system.add_bcell("PLs");
        let antibody = system.add_bcell("Ab");
        let a: Gene = "11111111111111112222G".parse().unwrap();
        let b: Gene = "22222222222222221111M".parse().unwrap();
        system.bcell_mut(plasma).genotype_increase(a, 3);
        system.bcell_mut(plasma).genotype_increase(b, 1);

        let reaction = Production::new("prod", 1., plasma, antibody);
        assert!((reaction.rate(&system) - 4. * LN_2).abs() < 1e-12);
        for _ in 0..400 {
            reaction.react(&mut system, &mut rng).unwrap();
        }
        assert_eq!(system.bcell(plasma).size(), 4);
        let antibodies = system.bcell(antibody);
        assert_eq!(antibodies.size(), 400);
        assert_eq!(antibodies.len(), 2);
        assert!((250..350).contains(&antibodies.get(&a).unwrap().count()));
    }

    #[test]
    fn long_lived_production_needs_niche() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut system = system();
        let niche = system.add_population("niche", 0);
        let plasma = system.add_bcell("PLl");
        let antibody = system.add_bcell("Ab");
        system
            .bcell_mut(plasma)
            .genotype_increase(Gene::random(&mut rng), 2);

        let reaction = LLPCProduction::new("llpc", 0.1, niche, plasma, antibody);
        assert_eq!(reaction.rate(&system), 0.);
        system.population_mut(niche).set_size(5);
        assert!((reaction.rate(&system) - 0.1 * LN_2 * 10.).abs() < 1e-12);
        reaction.react(&mut system, &mut rng).unwrap();
        assert_eq!(system.bcell(antibody).size(), 1);
    }
}
