//! Stochastic simulation kernel
//!
//! [`TotalReaction`] advances an [`ImmuneSystem`] with the direct method of Gillespie's
//! algorithm. Every iteration first computes all propensities and draws an exponential waiting
//! time ([`TotalReaction::time_step`]) and then fires one reaction chosen in proportion to the
//! propensities computed in that same iteration ([`TotalReaction::react`]).

use rand::distr::Open01;
use rand::prelude::*;

use super::reactions::Reaction;
use super::system::ImmuneSystem;
use crate::errors::{ImmuneError, Result};

/// Index of the first positive weight at which the running sum reaches `draw`.
///
/// When rounding leaves `draw` above the running sum the last positive weight is chosen. Returns
/// `None` if no weight is positive.
pub fn select_cumulative<I: IntoIterator<Item = f64>>(weights: I, draw: f64) -> Option<usize> {
    let mut cumulative = 0.;
    let mut selected = None;
    for (index, weight) in weights.into_iter().enumerate() {
        if weight.is_nan() || weight <= 0. {
            continue;
        }
        cumulative += weight;
        selected = Some(index);
        if draw <= cumulative {
            return selected;
        }
    }
    if selected.is_some() {
        log::debug!("Selection fell through ({draw} > {cumulative}), using last positive weight.");
    }
    selected
}

#[derive(Debug, Default)]
pub struct TotalReaction {
    reactions: Vec<Box<dyn Reaction>>,
    rates: Vec<f64>,
    total_rate: f64,
    fresh: bool,
}

impl TotalReaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_reaction(&mut self, reaction: Box<dyn Reaction>) {
        self.reactions.push(reaction);
        self.fresh = false;
    }

    pub fn add<R: Reaction + 'static>(&mut self, reaction: R) {
        self.add_reaction(Box::new(reaction));
    }

    pub fn remove_reaction(&mut self, index: usize) -> Option<Box<dyn Reaction>> {
        if index >= self.reactions.len() {
            return None;
        }
        self.fresh = false;
        Some(self.reactions.remove(index))
    }

    pub fn len(&self) -> usize {
        self.reactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }

    pub fn reactions(&self) -> &[Box<dyn Reaction>] {
        &self.reactions
    }

    /// Propensities of the last [`update_rates`](Self::update_rates).
    pub fn rates(&self) -> &[f64] {
        &self.rates
    }

    pub fn total_rate(&self) -> f64 {
        self.total_rate
    }

    pub fn update_rates(&mut self, system: &ImmuneSystem) {
        self.rates.clear();
        self.rates
            .extend(self.reactions.iter().map(|reaction| reaction.rate(system)));
        self.total_rate = self.rates.iter().sum();
        self.fresh = true;
    }

    /// Recompute all propensities and draw the waiting time until the next event.
    ///
    /// Returns `0.` if no reaction can fire, callers have to stop in that case.
    pub fn time_step<R: Rng + ?Sized>(&mut self, system: &ImmuneSystem, rng: &mut R) -> f64 {
        let u: f64 = rng.sample(Open01);
        self.update_rates(system);
        if self.total_rate > 0. {
            -u.ln() / self.total_rate
        } else {
            0.
        }
    }

    /// Fire one reaction according to the propensities of the preceding time step.
    ///
    /// Returns the index of the fired reaction, or `None` if all propensities vanish.
    pub fn react(
        &mut self,
        system: &mut ImmuneSystem,
        rng: &mut dyn RngCore,
    ) -> Result<Option<usize>> {
        if !self.fresh {
            return Err(ImmuneError::ImplementationError(
                "Reaction rates are stale, call time_step before react".to_string(),
            ));
        }
        self.fresh = false;
        if self.total_rate.is_nan() || self.total_rate <= 0. {
            return Ok(None);
        }

        let draw: f64 = rng.random::<f64>() * self.total_rate;
        match select_cumulative(self.rates.iter().copied(), draw) {
            Some(index) => {
                let reaction = &self.reactions[index];
                log::trace!("Firing {}.", reaction.name());
                reaction.react(system, rng)?;
                Ok(Some(index))
            }
            None => Ok(None),
        }
    }

    /// One full iteration, returns the elapsed time or `None` once the system is exhausted.
    pub fn step(
        &mut self,
        system: &mut ImmuneSystem,
        rng: &mut dyn RngCore,
    ) -> Result<Option<f64>> {
        let dt = self.time_step(system, rng);
        match self.react(system, rng)? {
            Some(_) => Ok(Some(dt)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::antigen::{AntigenList, AntigenType, Epitope};
    use crate::core::gene::parse_residues;
    use crate::core::reactions::{Decay, Formation};
    use crate::core::system::PopulationRef;
    use rand::rngs::StdRng;

    fn system() -> ImmuneSystem {
        let epitope = Epitope::new("e0", parse_residues("12341234123412341234").unwrap(), 1., 1.);
        let antigens: AntigenList = vec![AntigenType::new("V0", 0, vec![epitope]).unwrap()].into();
        ImmuneSystem::new(antigens).unwrap()
    }

    /// Always yields the largest word, so `random::<f64>()` is just below one.
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

    #[test]
    fn cumulative_selection() {
        assert_eq!(select_cumulative([1., 2., 3.], 0.5), Some(0));
        assert_eq!(select_cumulative([1., 2., 3.], 1.), Some(0));
        assert_eq!(select_cumulative([1., 2., 3.], 2.5), Some(1));
        assert_eq!(select_cumulative([0., 2., 0.], 0.), Some(1));
        assert_eq!(select_cumulative([0., 0.], 0.), None);
        assert_eq!(select_cumulative(Vec::<f64>::new(), 0.), None);
    }

    #[test]
    fn overshooting_draw_picks_last_positive_weight() {
        // trailing zero and NaN weights are never chosen
        assert_eq!(select_cumulative([1., 2., 0.], 3. + 1e-9), Some(1));
        assert_eq!(select_cumulative([1., f64::NAN, 2., 0.], 10.), Some(2));
    }

    #[test]
    fn largest_draw_fires_last_active_reaction() {
        let mut rng = MaxRng;
        let mut system = system();
        let a = system.add_population("A", 0);
        let b = system.add_population("B", 0);
        let c = system.add_population("C", 0);
        let mut kernel = TotalReaction::new();
        kernel.add(Formation::new("a", 0.1, a));
        kernel.add(Formation::new("b", 0.2, b));
        kernel.add(Decay::new("c", 1., c));
        assert!(kernel.time_step(&system, &mut rng) > 0.);
        assert_eq!(kernel.rates()[2], 0.);
        assert_eq!(kernel.react(&mut system, &mut rng).unwrap(), Some(1));
        assert_eq!(system.population(b).size(), 1);
        assert_eq!(system.population(a).size(), 0);
    }

    #[test]
    fn react_falls_back_when_total_exceeds_rates() {
        let mut rng = MaxRng;
        let mut system = system();
        let a = system.add_population("A", 0);
        let b = system.add_population("B", 0);
        let c = system.add_population("C", 0);
        let mut kernel = TotalReaction::new();
        kernel.add(Formation::new("a", 1., a));
        kernel.add(Formation::new("b", 1., b));
        kernel.add(Decay::new("c", 1., c));
        kernel.time_step(&system, &mut rng);
        // draw lands past the summed rates
        kernel.total_rate *= 2.;
        assert_eq!(kernel.react(&mut system, &mut rng).unwrap(), Some(1));
        assert_eq!(system.population(b).size(), 1);
        assert_eq!(system.population(c).size(), 0);
    }

    #[test]
    fn zero_rates_terminate() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut system = system();
        let a = system.add_population("A", 0);
        let mut kernel = TotalReaction::new();
        kernel.add(Decay::new("decay", 1., a));
        assert_eq!(kernel.time_step(&system, &mut rng), 0.);
        assert_eq!(kernel.react(&mut system, &mut rng).unwrap(), None);

        let mut iterations = 0;
        while let Some(_dt) = kernel.step(&mut system, &mut rng).unwrap() {
            iterations += 1;
        }
        assert_eq!(iterations, 0);

        let mut empty = TotalReaction::new();
        assert!(empty.is_empty());
        assert_eq!(empty.time_step(&system, &mut rng), 0.);
    }

    #[test]
    fn stale_rates_are_rejected() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut system = system();
        let a = system.add_population("A", 0);
        let mut kernel = TotalReaction::new();
        kernel.add(Formation::new("form", 1., a));
        assert!(matches!(
            kernel.react(&mut system, &mut rng),
            Err(ImmuneError::ImplementationError(_))
        ));
        assert!(kernel.time_step(&system, &mut rng) > 0.);
        assert_eq!(kernel.react(&mut system, &mut rng).unwrap(), Some(0));
        // each time step licenses exactly one reaction
        assert!(kernel.react(&mut system, &mut rng).is_err());
    }

    #[test]
    fn zero_rate_reactions_never_fire() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut system = system();
        let a = system.add_population("A", 0);
        let b = system.add_population("B", 0);
        let mut kernel = TotalReaction::new();
        kernel.add(Formation::new("form", 1., a));
        kernel.add(Decay::new("decay", 1., b));
        for _ in 0..100 {
            kernel.time_step(&system, &mut rng);
            assert_eq!(kernel.rates()[1], 0.);
            assert_eq!(kernel.react(&mut system, &mut rng).unwrap(), Some(0));
        }
        assert_eq!(system.population(a).size(), 100);
    }

    #[test]
    fn selection_follows_rates() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut system = system();
        let a = system.add_population("A", 0);
        let b = system.add_population("B", 0);
        let mut kernel = TotalReaction::new();
        kernel.add(Formation::new("a", 1., a));
        kernel.add(Formation::new("b", 3., b));
        for _ in 0..4000 {
            kernel.step(&mut system, &mut rng).unwrap();
        }
        let fired_a = system.population(a).size();
        assert!((850..1150).contains(&fired_a));
    }

    #[test]
    fn add_and_remove() {
        let mut system = system();
        let a = system.add_population("A", 0);
        let mut kernel = TotalReaction::new();
        kernel.add(Formation::new("form", 1., a));
        kernel.add(Decay::new("decay", 1., a));
        assert_eq!(kernel.len(), 2);
        assert_eq!(kernel.remove_reaction(0).unwrap().name(), "form");
        assert!(kernel.remove_reaction(5).is_none());
        assert_eq!(kernel.reactions()[0].name(), "decay");
    }

    #[test]
    fn waiting_times_are_exponential() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut system = system();
        let a = system.add_population("A", 0);
        let mut kernel = TotalReaction::new();
        kernel.add(Formation::new("form", 1., a));
        let n = 20_000;
        let mean = (0..n)
            .map(|_| kernel.time_step(&system, &mut rng))
            .sum::<f64>()
            / n as f64;
        let expected = 1. / std::f64::consts::LN_2;
        assert!((mean - expected).abs() < 0.05 * expected);
    }

    #[test]
    fn formation_decay_equilibrium() {
        // birth k_f and death k_d * n balance at n = k_f / k_d
        let k = 0.5;
        let mut mean = 0.;
        let trials = 20;
        for trial in 0..trials {
            let mut rng = StdRng::seed_from_u64(100 + trial);
            let mut system = system();
            let a = PopulationRef::from(system.add_population("A", 0));
            let mut kernel = TotalReaction::new();
            kernel.add(Formation::new("form", 20. * k, a));
            kernel.add(Decay::new("decay", k, a));

            let mut t = 0.;
            let mut time_weighted = 0.;
            while t < 200. {
                let size = system.size(a) as f64;
                let dt = kernel
                    .step(&mut system, &mut rng)
                    .unwrap()
                    .expect("formation keeps the system alive");
                if t > 50. {
                    time_weighted += size * dt;
                }
                t += dt;
            }
            mean += time_weighted / (t - 50.);
        }
        mean /= trials as f64;
        assert!((mean - 20.).abs() < 1.5, "mean population {mean}");
    }
}
