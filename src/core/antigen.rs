//! Antigen definitions and antigen populations.

use derive_more::{Deref, DerefMut};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::gene::Residues;
use super::population::Population;
use crate::errors::{ImmuneError, Result};

/// Shared, immutable list of antigen definitions, indexed by antigen id.
pub type AntigenList = Arc<[AntigenType]>;

/// Which epitope weight scales the size of a stratum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightKind {
    Immunogenicity,
    Clearance,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Epitope {
    name: String,
    residues: Residues,
    immunogenicity: f64,
    clearance: f64,
}

impl Epitope {
    pub fn new(name: &str, residues: Residues, immunogenicity: f64, clearance: f64) -> Self {
        Self {
            name: name.to_string(),
            residues,
            immunogenicity,
            clearance,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn residues(&self) -> &Residues {
        &self.residues
    }

    pub fn immunogenicity(&self) -> f64 {
        self.immunogenicity
    }

    pub fn clearance(&self) -> f64 {
        self.clearance
    }

    #[inline]
    pub fn weight(&self, kind: WeightKind) -> f64 {
        match kind {
            WeightKind::Immunogenicity => self.immunogenicity,
            WeightKind::Clearance => self.clearance,
        }
    }
}

/// An antigen strain: a name, a stable id and its ordered epitopes.
#[derive(Clone, Debug, PartialEq)]
pub struct AntigenType {
    name: String,
    id: usize,
    epitopes: Vec<Epitope>,
}

impl AntigenType {
    pub fn new(name: &str, id: usize, epitopes: Vec<Epitope>) -> Result<Self> {
        if epitopes.is_empty() {
            return Err(ImmuneError::InitializationError(format!(
                "Antigen {name} has no epitopes"
            )));
        }
        Ok(Self {
            name: name.to_string(),
            id,
            epitopes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn epitope(&self, index: usize) -> Option<&Epitope> {
        self.epitopes.get(index)
    }

    pub fn epitopes(&self) -> &[Epitope] {
        &self.epitopes
    }

    pub fn epitope_count(&self) -> usize {
        self.epitopes.len()
    }
}

/// Check that antigen ids match their position in the list.
pub fn validate_antigens(antigens: &[AntigenType]) -> Result<()> {
    if antigens.is_empty() {
        return Err(ImmuneError::InitializationError(
            "At least one antigen is required".to_string(),
        ));
    }
    for (index, antigen) in antigens.iter().enumerate() {
        if antigen.id() != index {
            return Err(ImmuneError::InitializationError(format!(
                "Antigen {} has id {} but is stored at position {index}",
                antigen.name(),
                antigen.id()
            )));
        }
    }
    Ok(())
}

/// Count of antigen particles carrying a given antigen type.
#[derive(Clone, Debug, Deref, DerefMut)]
pub struct Antigen {
    #[deref]
    #[deref_mut]
    population: Population,
    antigen: usize,
}

impl Antigen {
    pub fn new(name: &str, count: u64, antigen: usize) -> Self {
        Self {
            population: Population::new(name, count),
            antigen,
        }
    }

    /// Id of the antigen type these particles carry.
    pub fn antigen(&self) -> usize {
        self.antigen
    }

    pub fn change_antigen(&mut self, antigen: usize) {
        self.antigen = antigen;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gene::parse_residues;

    fn epitope(name: &str) -> Epitope {
        Epitope::new(name, parse_residues("12341234123412341234").unwrap(), 2., 0.5)
    }

    #[test]
    fn epitope_weights() {
        let ep = epitope("e0");
        assert_eq!(ep.weight(WeightKind::Immunogenicity), 2.);
        assert_eq!(ep.weight(WeightKind::Clearance), 0.5);
        assert_eq!(ep.name(), "e0");
    }

    #[test]
    fn antigen_type_requires_epitopes() {
        assert!(AntigenType::new("empty", 0, Vec::new()).is_err());
        let antigen = AntigenType::new("V0", 0, vec![epitope("e0"), epitope("e1")]).unwrap();
        assert_eq!(antigen.epitope_count(), 2);
        assert_eq!(antigen.epitope(1).unwrap().name(), "e1");
        assert!(antigen.epitope(2).is_none());
    }

    #[test]
    fn antigen_ids_must_match_positions() {
        let a = AntigenType::new("V0", 0, vec![epitope("e0")]).unwrap();
        let b = AntigenType::new("V1", 2, vec![epitope("e0")]).unwrap();
        assert!(validate_antigens(&[a.clone()]).is_ok());
        assert!(validate_antigens(&[a, b]).is_err());
        assert!(validate_antigens(&[]).is_err());
    }

    #[test]
    fn change_antigen_keeps_count() {
        let mut virus = Antigen::new("V", 100, 0);
        virus.change_antigen(3);
        assert_eq!(virus.antigen(), 3);
        assert_eq!(virus.size(), 100);
        virus.increase(5);
        assert_eq!(virus.size(), 105);
    }
}
