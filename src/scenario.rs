//! Dengue reinfection scenario
//!
//! Builds the immune system populations and the two reaction networks of the dengue setup: an
//! equilibration network of lymphocyte turnover only, and the full response network with one
//! antigen population per serotype.

use rand::Rng;

use crate::config::{Parameters, PhaseKind};
use crate::core::antigen::{AntigenList, WeightKind};
use crate::core::bcell::{BCell, Weighting};
use crate::core::kernel::TotalReaction;
use crate::core::reactions::{
    AbClearance, BDifferentiation, Decay, Differentiation, Formation, MStimulation,
    PopulationDecay, Production, Replication, Stimulation, T8Differentiation, T8Stimulation,
    TClearance, TDifferentiation, TPopulationDecay, TStimulation,
};
use crate::core::system::{AntigenRef, BCellRef, CountRef, GroupRef, ImmuneSystem, PopulationRef};
use crate::errors::Result;
use crate::readwrite::SampleColumns;

/// Formation constants drawn once per run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FormationConstants {
    pub naive_b: f64,
    pub t_cd4: f64,
    pub t_cd8: f64,
}

impl FormationConstants {
    pub fn sample<R: Rng + ?Sized>(parameters: &Parameters, rng: &mut R) -> Result<Self> {
        let ranges = &parameters.formation;
        Ok(Self {
            naive_b: ranges.naive_b.sample(rng)?,
            t_cd4: ranges.t_cd4.sample(rng)?,
            t_cd8: ranges.t_cd8.sample(rng)?,
        })
    }
}

/// Handles to every population of the dengue setup.
#[derive(Clone, Debug)]
pub struct Compartments {
    pub germinal: BCellRef,
    pub stimulated: BCellRef,
    pub memory: BCellRef,
    pub short_lived: BCellRef,
    pub long_lived: BCellRef,
    pub antibody: BCellRef,
    pub naive: BCellRef,
    pub helped: BCellRef,
    pub viruses: Vec<AntigenRef>,
    pub t_cd4: CountRef,
    pub t_cd4_stimulated: CountRef,
    pub t_cd4_memory: CountRef,
    pub t_cd8: CountRef,
    pub t_cd8_stimulated: CountRef,
    pub ab_clearance: CountRef,
    pub t8_clearance: CountRef,
    pub germinal_group: GroupRef,
    pub t_cd4_group: GroupRef,
    pub t_cd8_group: GroupRef,
}

pub struct Scenario {
    pub system: ImmuneSystem,
    pub compartments: Compartments,
    pub parameters: Parameters,
    pub formation: FormationConstants,
}

impl Scenario {
    /// Set up all populations, the naive repertoire is generated from the antigen list.
    pub fn new<R: Rng + ?Sized>(
        antigens: AntigenList,
        parameters: Parameters,
        rng: &mut R,
    ) -> Result<Self> {
        parameters.validate()?;
        let formation = FormationConstants::sample(&parameters, rng)?;
        log::info!(
            "Formation constants knB={}, kT4={}, kT8={}.",
            formation.naive_b,
            formation.t_cd4,
            formation.t_cd8
        );

        let mut system = ImmuneSystem::new(antigens.clone())?;
        let germinal = system.add_bcell("GC_B");
        let stimulated = system.add_bcell("Stimulated_B");
        let memory = system.add_bcell("Memory_B");
        let short_lived = system.add_bcell("SL_Plasma_B");
        let long_lived = system.add_bcell("LL_Plasma_B");
        let antibody = system.add_bcell("Antibody");

        log::info!("Generating naive repertoire of {} cells.", parameters.naive_b_initial);
        let mut naive_repertoire = BCell::new("Naive_B", antigens.clone());
        naive_repertoire.generate_population_new(parameters.naive_b_initial, rng)?;
        let naive = system.insert_bcell(naive_repertoire)?;

        let t_cd4 = system.add_population("T_cd4", parameters.t_cd4_initial);
        let t_cd4_stimulated = system.add_population("T_cd4_stim", 0);
        let t_cd4_memory = system.add_population("T_cd4_me", 0);
        let t_cd8 = system.add_population("T_cd8", parameters.t_cd8_initial);
        let helped = system.add_bcell("Tstimulated_B");
        let t_cd8_stimulated = system.add_population("T_cd8_stim", 0);
        let ab_clearance = system.add_population("AbClearance", 0);
        let t8_clearance = system.add_population("T8Clearance", 0);

        let viruses = antigens
            .iter()
            .map(|antigen| system.add_antigen(&format!("V{}", antigen.id()), 0, antigen.id()))
            .collect::<Result<Vec<AntigenRef>>>()?;

        let germinal_group = system.add_group(
            "GC Bcell Population",
            &[germinal.into(), stimulated.into(), helped.into()],
        )?;
        let t_cd4_group = system.add_group(
            "CD4 T-cell Population",
            &[t_cd4.into(), t_cd4_stimulated.into()],
        )?;
        let t_cd8_group = system.add_group(
            "CD8 T-cell Population",
            &[t_cd8.into(), t_cd8_stimulated.into()],
        )?;

        Ok(Self {
            system,
            compartments: Compartments {
                germinal,
                stimulated,
                memory,
                short_lived,
                long_lived,
                antibody,
                naive,
                helped,
                viruses,
                t_cd4,
                t_cd4_stimulated,
                t_cd4_memory,
                t_cd8,
                t_cd8_stimulated,
                ab_clearance,
                t8_clearance,
                germinal_group,
                t_cd4_group,
                t_cd8_group,
            },
            parameters,
            formation,
        })
    }

    pub fn reactions(&self, kind: PhaseKind) -> TotalReaction {
        match kind {
            PhaseKind::Equilibration => self.equilibration(),
            PhaseKind::Infection => self.infection(),
        }
    }

    fn turnover(&self, reactions: &mut TotalReaction) {
        let p = &self.parameters;
        let c = &self.compartments;
        let decay = p.per_tau(p.lymphocyte_decay_time);

        reactions.add(Formation::new(
            "Naive B cell formation",
            p.per_tau(self.formation.naive_b),
            c.naive,
        ));
        reactions.add(Decay::new("Naive B cell decay", decay, c.naive));
        reactions.add(Formation::new(
            "T CD4 cell formation",
            p.per_tau(self.formation.t_cd4),
            c.t_cd4,
        ));
        reactions.add(Decay::new("T CD4 cell decay", decay, c.t_cd4));
        reactions.add(Formation::new(
            "T CD8 cell formation",
            p.per_tau(self.formation.t_cd8),
            c.t_cd8,
        ));
        reactions.add(Decay::new("T CD8 cell decay", decay, c.t_cd8));
    }

    /// Lymphocyte formation and decay.
    pub fn equilibration(&self) -> TotalReaction {
        let mut reactions = TotalReaction::new();
        self.turnover(&mut reactions);
        reactions
    }

    /// The full response network.
    pub fn infection(&self) -> TotalReaction {
        let p = &self.parameters;
        let c = &self.compartments;
        let mut reactions = TotalReaction::new();
        self.turnover(&mut reactions);

        let stimulation = |max_rate| Weighting {
            factor: p.b_affinity,
            max_rate,
            kind: WeightKind::Immunogenicity,
        };

        for &virus in &c.viruses {
            reactions.add(Stimulation::new(
                "Free Naive B Cell Stimulation",
                p.per_tau(p.naive_stimulation_time),
                virus,
                c.naive,
                c.germinal,
                stimulation(p.stimulation / p.naive_stimulation_limit),
            ));
        }
        for &virus in &c.viruses {
            reactions.add(Stimulation::new(
                "GC B Cell Stimulation",
                p.per_tau(p.germinal_stimulation_time),
                virus,
                c.germinal,
                c.stimulated,
                stimulation(p.stimulation / p.germinal_stimulation_limit),
            ));
        }

        reactions.add(TStimulation::new(
            "Stimulation of antigen-stimulated GC B cell by T_cd4 cell",
            p.per_tau(p.t_help_time),
            (c.stimulated, c.t_cd4.into()),
            c.helped,
            c.t_cd4_stimulated,
        ));
        reactions.add(TStimulation::new(
            "Stimulation of antigen-stimulated GC B cell by T_cd4 memory cell",
            p.per_tau(p.t_memory_help_time),
            (c.stimulated, c.t_cd4_memory.into()),
            c.helped,
            c.t_cd4_stimulated,
        ));
        reactions.add(T8Stimulation::new(
            "Stimulation of T_cd8 cell",
            p.per_tau(p.t_cd8_stimulation_time),
            c.t_cd4_stimulated,
            c.t_cd8,
            c.t_cd8_stimulated,
        ));

        reactions.add(PopulationDecay::new(
            "B Cell decay",
            p.tau / (p.tau + p.germinal_decay_offset),
            p.per_tau(p.lymphocyte_decay_time),
            p.b_capacity,
            c.germinal_group,
            [c.germinal.into(), c.stimulated.into(), c.helped.into()],
        ));
        reactions.add(TPopulationDecay::new(
            "Stimulated T CD4 cell decay",
            p.tau / (p.tau + p.t_decay_offset),
            p.per_tau(p.t_decay_time),
            p.t_capacity,
            c.t_cd4_group,
            c.t_cd4_stimulated,
        ));
        reactions.add(TPopulationDecay::new(
            "Stimulated T CD8 cell decay",
            p.tau / (p.tau + p.t_decay_offset),
            p.per_tau(p.t_decay_time),
            p.t_capacity,
            c.t_cd8_group,
            c.t_cd8_stimulated,
        ));

        reactions.add(BDifferentiation::new(
            "B cell differentiation",
            p.per_tau(p.stimulated_differentiation_time),
            c.stimulated,
            c.germinal,
            p.fates.clone(),
        ));
        reactions.add(Differentiation::new(
            "Helped B cell differentiation",
            p.per_tau(p.helped_differentiation_time),
            c.helped,
            c.germinal,
            c.stimulated,
            c.memory,
            c.short_lived,
            c.long_lived,
            p.fates.clone(),
        ));
        reactions.add(TDifferentiation::new(
            "TCD4 cell differentiation",
            p.per_tau(p.t_cd4_differentiation_time),
            c.t_cd4_stimulated,
            c.t_cd4,
            c.t_cd4_memory,
        ));
        reactions.add(T8Differentiation::new(
            "TCD8 cell differentiation",
            p.per_tau(p.t_cd8_differentiation_time),
            c.t_cd8_stimulated,
            c.t_cd8,
        ));

        reactions.add(Production::new(
            "Short lived antibody production",
            p.short_lived_production,
            c.short_lived,
            c.antibody,
        ));
        reactions.add(Production::new(
            "Long lived antibody production",
            p.long_lived_production,
            c.long_lived,
            c.antibody,
        ));
        reactions.add(Decay::new(
            "Antibody decay",
            p.per_tau(p.antibody_decay_time),
            c.antibody,
        ));

        for &virus in &c.viruses {
            reactions.add(Decay::new(
                "Antigen decay",
                p.per_tau(p.antigen_decay_time),
                virus,
            ));
        }
        let clearance = Weighting {
            factor: p.antibody_affinity,
            max_rate: p.antibody_clearance_limit,
            kind: WeightKind::Clearance,
        };
        for &virus in &c.viruses {
            reactions.add(AbClearance::new(
                "Antigen clearance",
                p.antibody_clearance,
                (virus, c.antibody),
                clearance,
                p.antibody_clearance_threshold,
                c.ab_clearance,
            ));
        }
        for &virus in &c.viruses {
            reactions.add(TClearance::new(
                "Antigen clearance by CD8 T cell",
                p.t_cd8_clearance,
                virus,
                c.t_cd8_stimulated,
                c.t8_clearance,
            ));
        }

        reactions.add(Decay::new(
            "Plasma B cell decay",
            p.per_tau(p.plasma_decay_time),
            c.short_lived,
        ));
        for &virus in &c.viruses {
            reactions.add(MStimulation::new(
                "Memory B cell stimulation",
                p.stimulation / p.memory_stimulation_time,
                virus,
                c.memory,
                (c.short_lived, c.long_lived),
                p.fates.memory_short_lived,
                stimulation(p.per_tau(p.memory_stimulation_limit)),
            ));
        }
        for &virus in &c.viruses {
            reactions.add(Replication::new(
                "Viral replication",
                p.per_tau(p.antigen_replication_time),
                virus,
            ));
        }
        reactions
    }

    /// Inoculate antigen: all of it into the first serotype, or split evenly across serotypes.
    pub fn inoculate(&mut self, polyvalent: bool) {
        let inoculum = self.parameters.inoculum;
        let viruses = &self.compartments.viruses;
        if polyvalent {
            let share = inoculum / viruses.len() as u64;
            for &virus in viruses {
                self.system.antigen_mut(virus).increase(share);
            }
            log::info!("Inoculated {share} units of each of {} serotypes.", viruses.len());
        } else if let Some(&virus) = viruses.first() {
            self.system.antigen_mut(virus).increase(inoculum);
            log::info!("Inoculated {inoculum} units of {}.", self.system.antigen(virus).name());
        }
    }

    /// Time series columns of the dengue setup.
    pub fn sample_columns(&self) -> SampleColumns {
        let c = &self.compartments;
        let mut populations: Vec<PopulationRef> =
            vec![c.ab_clearance.into(), c.t8_clearance.into()];
        populations.extend(c.viruses.iter().map(|&virus| PopulationRef::from(virus)));
        let tracked: [PopulationRef; 16] = [
            c.t_cd4_group.into(),
            c.t_cd4.into(),
            c.t_cd4_stimulated.into(),
            c.t_cd4_memory.into(),
            c.t_cd8_group.into(),
            c.t_cd8.into(),
            c.t_cd8_stimulated.into(),
            c.germinal_group.into(),
            c.germinal.into(),
            c.stimulated.into(),
            c.memory.into(),
            c.short_lived.into(),
            c.long_lived.into(),
            c.antibody.into(),
            c.naive.into(),
            c.helped.into(),
        ];
        populations.extend(tracked);
        SampleColumns {
            populations,
            repertoires: vec![
                c.antibody,
                c.naive,
                c.germinal,
                c.stimulated,
                c.helped,
                c.memory,
                c.long_lived,
            ],
            diversity: vec![c.germinal, c.stimulated, c.memory, c.helped],
            antibody: Some((c.antibody, self.parameters.antibody_affinity)),
        }
    }
}
