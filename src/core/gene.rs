//! Gene sequence representation and operations
//!
//! A `Gene` is a fixed length receptor sequence in immune shape space followed by an isotype tag.
//! Genes are immutable values: mutation, isotype switching and synthesis always produce a new
//! `Gene`. The genetic distance between a gene and an epitope is the Hamming distance over the
//! residues only, the isotype never contributes.

use rand::prelude::*;
use std::fmt;
use std::str::FromStr;

use super::antigen::AntigenType;
use crate::encoding::{Isotype, Residue, Symbol, VOCABULARY};
use crate::errors::{ImmuneError, Result};

/// Number of residues in a receptor or epitope sequence.
pub const GENE_LENGTH: usize = 20;

/// Number of distinct genetic distances (`0..=GENE_LENGTH`).
pub const PHENOTYPES: usize = GENE_LENGTH + 1;

pub type Residues = [Residue; GENE_LENGTH];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Gene {
    residues: Residues,
    isotype: Isotype,
}

/// Distance of a gene to the closest epitope of an antigen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Binding {
    pub distance: usize,
    pub epitope: usize,
}

/// Hamming distance between two residue sequences.
#[inline]
pub fn hamming(lhs: &Residues, rhs: &Residues) -> usize {
    lhs.iter().zip(rhs.iter()).filter(|(a, b)| a != b).count()
}

/// Parse a residue sequence of exactly `GENE_LENGTH` symbols.
pub fn parse_residues(sequence: &str) -> Result<Residues> {
    let bytes = sequence.as_bytes();
    if bytes.len() != GENE_LENGTH {
        return Err(ImmuneError::ReadError(format!(
            "Sequence `{sequence}` has length {} instead of {GENE_LENGTH}",
            bytes.len()
        )));
    }
    let mut residues = [Residue::from_index(0); GENE_LENGTH];
    for (residue, byte) in residues.iter_mut().zip(bytes) {
        *residue = Residue::try_decode(byte).ok_or_else(|| {
            ImmuneError::ReadError(format!(
                "Unable to decode literal `{}` in `{sequence}`",
                *byte as char
            ))
        })?;
    }
    Ok(residues)
}

impl Gene {
    pub fn new(residues: Residues, isotype: Isotype) -> Self {
        Self { residues, isotype }
    }

    /// Draw a uniformly random naive gene.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut residues = [Residue::from_index(0); GENE_LENGTH];
        residues
            .iter_mut()
            .for_each(|residue| *residue = Residue::from_index(rng.random_range(0..VOCABULARY)));
        Self::new(residues, Isotype::IgM)
    }

    /// Synthesize a naive gene at exactly `distance` from an epitope of `antigen`.
    ///
    /// `GENE_LENGTH - distance` positions are chosen at random to match the epitope, every other
    /// position is set to a residue that differs from the epitope.
    pub fn from_phenotype<R: Rng + ?Sized>(
        distance: usize,
        antigen: &AntigenType,
        epitope: usize,
        rng: &mut R,
    ) -> Result<Self> {
        if distance > GENE_LENGTH {
            return Err(ImmuneError::InitializationError(format!(
                "Target distance {distance} exceeds gene length {GENE_LENGTH}"
            )));
        }
        let target = antigen
            .epitope(epitope)
            .ok_or_else(|| {
                ImmuneError::InitializationError(format!(
                    "Antigen {} has no epitope {epitope}",
                    antigen.name()
                ))
            })?
            .residues();

        let mut matching = [false; GENE_LENGTH];
        rand::seq::index::sample(rng, GENE_LENGTH, GENE_LENGTH - distance)
            .into_iter()
            .for_each(|position| matching[position] = true);

        let mut residues = *target;
        for (position, residue) in residues.iter_mut().enumerate() {
            if !matching[position] {
                // skip over the epitope residue to guarantee a mismatch
                let mut index = rng.random_range(0..VOCABULARY - 1);
                if index >= target[position].index() {
                    index += 1;
                }
                *residue = Residue::from_index(index);
            }
        }
        Ok(Self::new(residues, Isotype::IgM))
    }

    pub fn residues(&self) -> &Residues {
        &self.residues
    }

    pub fn isotype(&self) -> Isotype {
        self.isotype
    }

    /// Replace the residue at a uniformly chosen position with a uniformly chosen residue.
    ///
    /// The replacement may equal the original residue. The isotype is preserved.
    pub fn mutate<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let position = rng.random_range(0..GENE_LENGTH);
        let residue = Residue::from_index(rng.random_range(0..VOCABULARY));
        self.mutate_at(position, residue)
    }

    pub fn mutate_at(&self, position: usize, residue: Residue) -> Self {
        let mut residues = self.residues;
        residues[position] = residue;
        Self::new(residues, self.isotype)
    }

    pub fn switch_isotype(&self) -> Self {
        Self::new(self.residues, Isotype::IgG)
    }

    pub fn distance(&self, other: &Residues) -> usize {
        hamming(&self.residues, other)
    }

    /// Distance to the closest epitope of `antigen`, ties resolve to the lowest epitope index.
    pub fn phenotype_against(&self, antigen: &AntigenType) -> Binding {
        antigen.epitopes().iter().enumerate().fold(
            Binding {
                distance: usize::MAX,
                epitope: 0,
            },
            |best, (index, epitope)| {
                let distance = self.distance(epitope.residues());
                if distance < best.distance {
                    Binding {
                        distance,
                        epitope: index,
                    }
                } else {
                    best
                }
            },
        )
    }

    /// Index of the closest epitope across all antigens, scanned in the given order.
    ///
    /// The index refers to the position of the epitope within its own antigen.
    pub fn nearest_epitope(&self, antigens: &[AntigenType]) -> usize {
        antigens
            .iter()
            .map(|antigen| self.phenotype_against(antigen))
            .fold(None::<Binding>, |best, binding| match best {
                Some(best) if best.distance <= binding.distance => Some(best),
                _ => Some(binding),
            })
            .map(|binding| binding.epitope)
            .unwrap_or(0)
    }
}

impl fmt::Display for Gene {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for residue in self.residues.iter() {
            write!(f, "{residue}")?;
        }
        write!(f, "{}", self.isotype)
    }
}

impl FromStr for Gene {
    type Err = ImmuneError;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != GENE_LENGTH + 1 || !s.is_char_boundary(GENE_LENGTH) {
            return Err(ImmuneError::ReadError(format!(
                "Gene `{s}` must have {GENE_LENGTH} residues and an isotype"
            )));
        }
        let (residues, isotype) = s.split_at(GENE_LENGTH);
        let isotype = Isotype::try_decode(&isotype.as_bytes()[0])
            .ok_or_else(|| ImmuneError::ReadError(format!("Invalid isotype in `{s}`")))?;
        Ok(Self::new(parse_residues(residues)?, isotype))
    }
}
