//! Elementary reactions of the immune system
//!
//! Every reaction reports a propensity from the current state of an [`ImmuneSystem`] and can fire
//! exactly one elementary event on it. Reactions only keep handles to the populations they act
//! on. Rate constants are given per tau period and scaled by `ln 2` at construction, the population
//! decay reactions are the only exception and take their constants unscaled.

use rand::RngCore;
use std::f64::consts::LN_2;
use std::fmt::Debug;

use super::bcell::Weighting;
use super::system::{AntigenRef, BCellRef, ImmuneSystem, PopulationRef};
use crate::errors::Result;

mod basic;
mod clearance;
mod differentiation;
mod production;
mod stimulation;

pub use basic::{Decay, Formation, PopulationDecay, Replication, TPopulationDecay};
pub use clearance::{AbClearance, TClearance};
pub use differentiation::{
    BDifferentiation, Differentiation, FateProbabilities, T8Differentiation, TDifferentiation,
};
pub use production::{LLPCProduction, Production};
pub use stimulation::{MStimulation, Stimulation, T8Stimulation, TStimulation};

pub trait Reaction: Debug {
    fn name(&self) -> &str;

    /// Current propensity, never negative.
    fn rate(&self, system: &ImmuneSystem) -> f64;

    /// Fire one elementary event.
    fn react(&self, system: &mut ImmuneSystem, rng: &mut dyn RngCore) -> Result<()>;
}

/// Constant propensity.
#[derive(Clone, Debug)]
pub struct OrderZero {
    k: f64,
}

impl OrderZero {
    pub fn new(k: f64) -> Self {
        Self { k: LN_2 * k }
    }

    #[inline]
    pub fn rate(&self) -> f64 {
        self.k
    }
}

/// Propensity proportional to one population.
#[derive(Clone, Debug)]
pub struct OrderOne {
    k: f64,
    a: PopulationRef,
}

impl OrderOne {
    pub fn new(k: f64, a: impl Into<PopulationRef>) -> Self {
        Self {
            k: LN_2 * k,
            a: a.into(),
        }
    }

    pub fn a(&self) -> PopulationRef {
        self.a
    }

    #[inline]
    pub fn rate(&self, system: &ImmuneSystem) -> f64 {
        self.k * system.size(self.a) as f64
    }
}

/// Mass action propensity of two populations.
#[derive(Clone, Debug)]
pub struct OrderTwo {
    k: f64,
    a: PopulationRef,
    b: PopulationRef,
}

impl OrderTwo {
    pub fn new(k: f64, a: impl Into<PopulationRef>, b: impl Into<PopulationRef>) -> Self {
        Self {
            k: LN_2 * k,
            a: a.into(),
            b: b.into(),
        }
    }

    pub fn a(&self) -> PopulationRef {
        self.a
    }

    pub fn b(&self) -> PopulationRef {
        self.b
    }

    #[inline]
    pub fn rate(&self, system: &ImmuneSystem) -> f64 {
        self.k * system.size(self.a) as f64 * system.size(self.b) as f64
    }
}

/// Saturating propensity of an antigen binding to a heterogeneous B cell population.
///
/// The rate is `min(|A| * apparent(B) * k, |B| * max_rate)`, where the apparent size of `B`
/// weights every binding stratum by its affinity to the antigen currently carried by `A`.
#[derive(Clone, Debug)]
pub struct OrderTwoPhenotype {
    k: f64,
    a: AntigenRef,
    b: BCellRef,
    weighting: Weighting,
}

impl OrderTwoPhenotype {
    pub fn new(k: f64, a: AntigenRef, b: BCellRef, weighting: Weighting) -> Self {
        Self {
            k: LN_2 * k,
            a,
            b,
            weighting: Weighting {
                max_rate: LN_2 * weighting.max_rate,
                ..weighting
            },
        }
    }

    pub fn a(&self) -> AntigenRef {
        self.a
    }

    pub fn b(&self) -> BCellRef {
        self.b
    }

    pub fn weighting(&self) -> &Weighting {
        &self.weighting
    }

    /// Rate per binding unit handed to stratum selection.
    pub fn aggregate_rate(&self, system: &ImmuneSystem) -> f64 {
        self.k * system.antigen(self.a).size() as f64
    }

    pub fn rate(&self, system: &ImmuneSystem) -> f64 {
        let bcell = system.bcell(self.b);
        if bcell.size() == 0 {
            return 0.;
        }
        let antigen = system.antigen(self.a);
        let apparent = bcell.apparent_size_all(
            system.affinity(),
            self.weighting.factor,
            self.weighting.kind,
            antigen.antigen(),
        );
        (antigen.size() as f64 * apparent * self.k)
            .min(bcell.size() as f64 * self.weighting.max_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::antigen::{AntigenList, AntigenType, Epitope, WeightKind};
    use crate::core::gene::{parse_residues, Gene};

    pub(super) fn system() -> ImmuneSystem {
        let antigens: AntigenList = ["11111111111111111111", "22222222222222222222"]
            .iter()
            .enumerate()
            .map(|(id, seq)| {
                let epitope = Epitope::new("e0", parse_residues(seq).unwrap(), 1., 0.5);
                AntigenType::new(&format!("V{id}"), id, vec![epitope]).unwrap()
            })
            .collect::<Vec<_>>()
            .into();
        ImmuneSystem::new(antigens).unwrap()
    }

    #[test]
    fn mass_action_rates() {
        let mut system = system();
        let a = system.add_population("A", 4);
        let b = system.add_population("B", 5);
        assert_eq!(OrderZero::new(2.).rate(), 2. * LN_2);
        assert_eq!(OrderOne::new(2., a).rate(&system), 8. * LN_2);
        assert_eq!(OrderTwo::new(2., a, b).rate(&system), 40. * LN_2);
        system.population_mut(b).set_size(0);
        assert_eq!(OrderTwo::new(2., a, b).rate(&system), 0.);
    }

    #[test]
    fn phenotype_rate_saturates() {
        let mut system = system();
        let virus = system.add_antigen("V", 10, 0).unwrap();
        let bcell = system.add_bcell("B");
        let weighting = Weighting {
            factor: 10.,
            max_rate: 1.,
            kind: WeightKind::Immunogenicity,
        };
        let reaction = OrderTwoPhenotype::new(0.01, virus, bcell, weighting);
        assert_eq!(reaction.rate(&system), 0.);

        // distance 5 to V0, apparent size 2 * 10
        let gene: Gene = "11111111111111122222M".parse().unwrap();
        system.bcell_mut(bcell).genotype_increase(gene, 2);
        let expected = (10. * 20. * 0.01 * LN_2).min(2. * LN_2);
        assert!((reaction.rate(&system) - expected).abs() < 1e-12);

        system.antigen_mut(virus).set_size(1000);
        assert!((reaction.rate(&system) - 2. * LN_2).abs() < 1e-12);

        // switching the antigen drops the binding
        system.antigen_mut(virus).change_antigen(1);
        assert_eq!(reaction.rate(&system), 0.);
    }
}
