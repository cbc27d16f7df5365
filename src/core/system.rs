//! The immune system context
//!
//! [`ImmuneSystem`] owns every population of a simulation run together with the antigen
//! definitions and the affinity memo table. Reactions never hold populations themselves, they
//! refer to them through small copyable handles that are resolved against the system whenever a
//! rate is computed or a reaction fires.
//!
//! Handles are only minted by the system that owns the population. The read accessors
//! ([`ImmuneSystem::size`], [`ImmuneSystem::name`], [`ImmuneSystem::bcell`], ...) sit on the
//! rate computation path and panic on a handle of another system, while every fallible operation
//! reports it as [`ImmuneError::ImplementationError`]. Use [`ImmuneSystem::contains`] to check a
//! handle of unknown origin.

use derive_more::{Display, From};
use rand::distr::weighted::WeightedIndex;
use rand::prelude::*;

use super::affinity::AffinityTable;
use super::antigen::{validate_antigens, Antigen, AntigenList};
use super::bcell::BCell;
use super::population::{GroupPopulation, Population};
use crate::errors::{ImmuneError, Result};

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
#[display("count#{_0}")]
pub struct CountRef(pub(crate) usize);

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
#[display("antigen#{_0}")]
pub struct AntigenRef(pub(crate) usize);

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
#[display("bcell#{_0}")]
pub struct BCellRef(pub(crate) usize);

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
#[display("group#{_0}")]
pub struct GroupRef(pub(crate) usize);

/// Handle to any population kind.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, From)]
pub enum PopulationRef {
    Count(CountRef),
    Antigen(AntigenRef),
    BCell(BCellRef),
    Group(GroupRef),
}

#[derive(Debug)]
pub struct ImmuneSystem {
    antigens: AntigenList,
    affinity: AffinityTable,
    counts: Vec<Population>,
    viruses: Vec<Antigen>,
    bcells: Vec<BCell>,
    groups: Vec<GroupPopulation>,
}

macro_rules! resolve {
    ($collection:expr, $handle:expr, $kind:literal) => {
        $collection.get_mut($handle.0).ok_or_else(|| {
            ImmuneError::ImplementationError(format!(
                "Invalid {} handle {}",
                $kind, $handle
            ))
        })
    };
}

impl ImmuneSystem {
    pub fn new(antigens: AntigenList) -> Result<Self> {
        validate_antigens(&antigens)?;
        Ok(Self {
            antigens,
            affinity: AffinityTable::new(),
            counts: Vec::new(),
            viruses: Vec::new(),
            bcells: Vec::new(),
            groups: Vec::new(),
        })
    }

    pub fn antigens(&self) -> &AntigenList {
        &self.antigens
    }

    pub fn affinity(&self) -> &AffinityTable {
        &self.affinity
    }

    pub fn add_population(&mut self, name: &str, count: u64) -> CountRef {
        self.counts.push(Population::new(name, count));
        CountRef(self.counts.len() - 1)
    }

    pub fn add_antigen(&mut self, name: &str, count: u64, antigen: usize) -> Result<AntigenRef> {
        if antigen >= self.antigens.len() {
            return Err(ImmuneError::InitializationError(format!(
                "Antigen population {name} refers to unknown antigen {antigen}"
            )));
        }
        self.viruses.push(Antigen::new(name, count, antigen));
        Ok(AntigenRef(self.viruses.len() - 1))
    }

    /// Add an empty genotype indexed population.
    pub fn add_bcell(&mut self, name: &str) -> BCellRef {
        self.bcells.push(BCell::new(name, self.antigens.clone()));
        BCellRef(self.bcells.len() - 1)
    }

    /// Add a prepared population, it must share this system's antigen definitions.
    pub fn insert_bcell(&mut self, bcell: BCell) -> Result<BCellRef> {
        if bcell.antigens()[..] != self.antigens[..] {
            return Err(ImmuneError::InitializationError(format!(
                "Population {} was built for different antigens",
                bcell.name()
            )));
        }
        self.bcells.push(bcell);
        Ok(BCellRef(self.bcells.len() - 1))
    }

    pub fn add_group(&mut self, name: &str, members: &[PopulationRef]) -> Result<GroupRef> {
        let mut group = GroupPopulation::new(name);
        for &member in members {
            if !self.contains(member) {
                return Err(ImmuneError::InitializationError(format!(
                    "Group {name} refers to unknown population {member}"
                )));
            }
            group.add_population(member);
        }
        self.groups.push(group);
        Ok(GroupRef(self.groups.len() - 1))
    }

    /// Whether `handle` refers to a population of this system.
    pub fn contains(&self, handle: PopulationRef) -> bool {
        match handle {
            PopulationRef::Count(r) => r.0 < self.counts.len(),
            PopulationRef::Antigen(r) => r.0 < self.viruses.len(),
            PopulationRef::BCell(r) => r.0 < self.bcells.len(),
            PopulationRef::Group(r) => r.0 < self.groups.len(),
        }
    }

    /// # Panics
    ///
    /// This and the other handle accessors panic if the handle belongs to another system.
    pub fn population(&self, handle: CountRef) -> &Population {
        &self.counts[handle.0]
    }

    pub fn population_mut(&mut self, handle: CountRef) -> &mut Population {
        &mut self.counts[handle.0]
    }

    pub fn antigen(&self, handle: AntigenRef) -> &Antigen {
        &self.viruses[handle.0]
    }

    pub fn antigen_mut(&mut self, handle: AntigenRef) -> &mut Antigen {
        &mut self.viruses[handle.0]
    }

    pub fn bcell(&self, handle: BCellRef) -> &BCell {
        &self.bcells[handle.0]
    }

    pub fn bcell_mut(&mut self, handle: BCellRef) -> &mut BCell {
        &mut self.bcells[handle.0]
    }

    pub fn group(&self, handle: GroupRef) -> &GroupPopulation {
        &self.groups[handle.0]
    }

    pub fn name(&self, handle: PopulationRef) -> &str {
        match handle {
            PopulationRef::Count(r) => self.counts[r.0].name(),
            PopulationRef::Antigen(r) => self.viruses[r.0].name(),
            PopulationRef::BCell(r) => self.bcells[r.0].name(),
            PopulationRef::Group(r) => self.groups[r.0].name(),
        }
    }

    /// Current size of any population; groups report the sum over their members.
    ///
    /// # Panics
    ///
    /// If the handle belongs to another system.
    pub fn size(&self, handle: PopulationRef) -> u64 {
        match handle {
            PopulationRef::Count(r) => self.counts[r.0].size(),
            PopulationRef::Antigen(r) => self.viruses[r.0].size(),
            PopulationRef::BCell(r) => self.bcells[r.0].size(),
            PopulationRef::Group(r) => self.groups[r.0]
                .members()
                .iter()
                .map(|&member| self.size(member))
                .sum(),
        }
    }

    /// Pick a member of `group` with probability proportional to its size.
    pub fn select_member<R: Rng + ?Sized>(
        &self,
        group: GroupRef,
        rng: &mut R,
    ) -> Result<PopulationRef> {
        let group = self.groups.get(group.0).ok_or_else(|| {
            ImmuneError::ImplementationError(format!("Invalid group handle {group}"))
        })?;
        let members = group.members();
        let weights = members.iter().map(|&member| self.size(member));
        let distribution = WeightedIndex::new(weights).map_err(|err| {
            ImmuneError::InconsistencyError(format!(
                "Cannot select a member of group {}: {err}",
                group.name()
            ))
        })?;
        Ok(members[distribution.sample(rng)])
    }

    /// Add `n` individuals.
    ///
    /// B cell populations receive `n` cells of one freshly synthesized naive genotype, groups pass
    /// the increase on to a size weighted member.
    pub fn increase<R: Rng + ?Sized>(
        &mut self,
        handle: PopulationRef,
        n: u64,
        rng: &mut R,
    ) -> Result<()> {
        match handle {
            PopulationRef::Count(r) => resolve!(self.counts, r, "population")?.increase(n),
            PopulationRef::Antigen(r) => resolve!(self.viruses, r, "antigen")?.increase(n),
            PopulationRef::BCell(r) => resolve!(self.bcells, r, "bcell")?.increase(n, rng)?,
            PopulationRef::Group(r) => {
                let member = self.select_member(r, rng)?;
                self.increase(member, n, rng)?;
            }
        }
        Ok(())
    }

    /// Remove `n` individuals.
    ///
    /// B cell populations lose `n` cells drawn in proportion to genotype counts, groups pass the
    /// decrease on to a size weighted member.
    pub fn decrease<R: Rng + ?Sized>(
        &mut self,
        handle: PopulationRef,
        n: u64,
        rng: &mut R,
    ) -> Result<()> {
        match handle {
            PopulationRef::Count(r) => resolve!(self.counts, r, "population")?.decrease(n)?,
            PopulationRef::Antigen(r) => resolve!(self.viruses, r, "antigen")?.decrease(n)?,
            PopulationRef::BCell(r) => resolve!(self.bcells, r, "bcell")?.decrease(n, rng)?,
            PopulationRef::Group(r) => {
                let member = self.select_member(r, rng)?;
                self.decrease(member, n, rng)?;
            }
        }
        Ok(())
    }

    pub fn bcells(&self) -> impl Iterator<Item = (BCellRef, &BCell)> {
        self.bcells
            .iter()
            .enumerate()
            .map(|(idx, bcell)| (BCellRef(idx), bcell))
    }
}
