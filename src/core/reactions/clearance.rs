use rand::RngCore;

use super::{OrderTwo, OrderTwoPhenotype, Reaction};
use crate::core::bcell::Weighting;
use crate::core::system::{AntigenRef, BCellRef, CountRef, ImmuneSystem, PopulationRef};
use crate::errors::Result;

/// Antibody mediated clearance `Ag + Ab -> Ab`.
///
/// The event only removes an antigen while the antibody population exceeds `threshold`, every
/// clearance is tallied in `counter`.
#[derive(Clone, Debug)]
pub struct AbClearance {
    name: String,
    base: OrderTwoPhenotype,
    threshold: u64,
    counter: CountRef,
}

impl AbClearance {
    pub fn new(
        name: &str,
        k: f64,
        (antigen, antibody): (AntigenRef, BCellRef),
        weighting: Weighting,
        threshold: u64,
        counter: CountRef,
    ) -> Self {
        Self {
            name: name.to_string(),
            base: OrderTwoPhenotype::new(k, antigen, antibody, weighting),
            threshold,
            counter,
        }
    }
}

impl Reaction for AbClearance {
    fn name(&self) -> &str {
        &self.name
    }

    fn rate(&self, system: &ImmuneSystem) -> f64 {
        self.base.rate(system)
    }

    fn react(&self, system: &mut ImmuneSystem, _rng: &mut dyn RngCore) -> Result<()> {
        if system.bcell(self.base.b()).size() > self.threshold {
            system.antigen_mut(self.base.a()).decrease(1)?;
            system.population_mut(self.counter).increase(1);
        }
        Ok(())
    }
}

/// Cytotoxic clearance `Ag + T -> T`, tallied in `counter`.
#[derive(Clone, Debug)]
pub struct TClearance {
    name: String,
    base: OrderTwo,
    counter: CountRef,
}

impl TClearance {
    pub fn new(
        name: &str,
        k: f64,
        target: impl Into<PopulationRef>,
        effector: impl Into<PopulationRef>,
        counter: CountRef,
    ) -> Self {
        Self {
            name: name.to_string(),
            base: OrderTwo::new(k, target, effector),
            counter,
        }
    }
}

impl Reaction for TClearance {
    fn name(&self) -> &str {
        &self.name
    }

    fn rate(&self, system: &ImmuneSystem) -> f64 {
        self.base.rate(system)
    }

    fn react(&self, system: &mut ImmuneSystem, rng: &mut dyn RngCore) -> Result<()> {
        system.decrease(self.base.a(), 1, rng)?;
        system.population_mut(self.counter).increase(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::antigen::WeightKind;
    use crate::core::gene::Gene;
    use crate::core::reactions::tests::system;
    use rand::prelude::*;
    use rand::rngs::StdRng;

    #[test]
    fn antibody_clearance_threshold() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut system = system();
        let virus = system.add_antigen("V", 10, 0).unwrap();
        let antibody = system.add_bcell("Ab");
        let counter = system.add_population("AbClearance", 0);
        let gene: Gene = "11111111111111112222G".parse().unwrap();
        system.bcell_mut(antibody).genotype_increase(gene, 900);

        let weighting = Weighting {
            factor: 2.5,
            max_rate: 10_000.,
            kind: WeightKind::Clearance,
        };
        let reaction = AbClearance::new(
            "abclear",
            0.00025,
            (virus, antibody),
            weighting,
            900,
            counter,
        );
        assert!(reaction.rate(&system) > 0.);

        // at the threshold nothing happens
        reaction.react(&mut system, &mut rng).unwrap();
        assert_eq!(system.antigen(virus).size(), 10);
        assert_eq!(system.population(counter).size(), 0);

        system.bcell_mut(antibody).genotype_increase(gene, 1);
        reaction.react(&mut system, &mut rng).unwrap();
        assert_eq!(system.antigen(virus).size(), 9);
        assert_eq!(system.population(counter).size(), 1);
        assert_eq!(system.bcell(antibody).size(), 901);
    }

    #[test]
    fn cytotoxic_clearance() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut system = system();
        let virus = system.add_antigen("V", 2, 0).unwrap();
        let effector = system.add_population("T8act", 3);
        let counter = system.add_population("T8Clearance", 0);
        let reaction = TClearance::new("tclear", 1., virus, effector, counter);
        reaction.react(&mut system, &mut rng).unwrap();
        reaction.react(&mut system, &mut rng).unwrap();
        assert_eq!(system.antigen(virus).size(), 0);
        assert_eq!(system.population(counter).size(), 2);
        assert_eq!(reaction.rate(&system), 0.);
        assert!(reaction.react(&mut system, &mut rng).is_err());
    }
}
