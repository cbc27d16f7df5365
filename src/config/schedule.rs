use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{ImmuneError, Result};

/// Which reaction network is active during a phase.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    /// Lymphocyte formation and decay only.
    Equilibration,
    /// The full response network.
    Infection,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Phase {
    pub name: String,
    /// Length of the phase in days.
    pub duration: f64,
    pub kind: PhaseKind,
    /// Whether antigen is inoculated when the phase starts.
    #[serde(default)]
    pub inoculation: bool,
}

impl Phase {
    pub fn new(name: &str, duration: f64, kind: PhaseKind, inoculation: bool) -> Self {
        Self {
            name: name.to_string(),
            duration,
            kind,
            inoculation,
        }
    }

    /// Duration in simulated time units of `tau` hours.
    pub fn units(&self, tau: f64) -> f64 {
        self.duration * 24. / tau
    }

    pub fn is_empty(&self) -> bool {
        self.duration <= 0.
    }
}

/// Ordered list of simulation phases.
#[derive(Clone, Debug, PartialEq)]
pub struct Schedule {
    phases: Vec<Phase>,
}

impl Serialize for Schedule {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.phases.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Schedule {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let phases = Vec::<Phase>::deserialize(deserializer)?;
        Self::from_vec(phases).map_err(serde::de::Error::custom)
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            phases: vec![
                Phase::new("equilibration", 100., PhaseKind::Equilibration, false),
                Phase::new("first infection", 0., PhaseKind::Infection, true),
                Phase::new("second infection", 365., PhaseKind::Infection, true),
            ],
        }
    }
}

impl Schedule {
    pub fn from_vec(phases: Vec<Phase>) -> Result<Self> {
        if let Some(phase) = phases
            .iter()
            .find(|phase| phase.duration.is_nan() || phase.duration < 0.)
        {
            return Err(ImmuneError::InitializationError(format!(
                "Phase `{}` has invalid duration {}.",
                phase.name, phase.duration
            )));
        }
        Ok(Self { phases })
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Phases that actually advance the simulation.
    pub fn active_phases(&self) -> impl Iterator<Item = &Phase> {
        self.phases.iter().filter(|phase| !phase.is_empty())
    }

    /// Total simulated time in units of `tau` hours.
    pub fn total_units(&self, tau: f64) -> f64 {
        self.active_phases().map(|phase| phase.units(tau)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule() {
        let schedule = Schedule::default();
        assert_eq!(schedule.phases().len(), 3);
        let active: Vec<&str> = schedule
            .active_phases()
            .map(|phase| phase.name.as_str())
            .collect();
        assert_eq!(active, vec!["equilibration", "second infection"]);
        assert_eq!(schedule.phases()[0].units(8.), 300.);
        assert_eq!(schedule.total_units(8.), 300. + 1095.);
    }

    #[test]
    fn yaml_sequence() {
        let yaml = "- name: warmup\n  duration: 10.0\n  kind: equilibration\n\
                    - name: boost\n  duration: 30.0\n  kind: infection\n  inoculation: true\n";
        let schedule: Schedule = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(schedule.phases()[0].kind, PhaseKind::Equilibration);
        assert!(!schedule.phases()[0].inoculation);
        assert!(schedule.phases()[1].inoculation);

        let negative = "- name: broken\n  duration: -1.0\n  kind: infection\n";
        assert!(serde_yaml::from_str::<Schedule>(negative).is_err());
    }
}
