//! Settings module.

use super::parameters::Parameters;
use super::schedule::Schedule;

use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Settings {
    pub parameters: Parameters,
    pub schedule: Schedule,
}

#[derive(Debug)]
pub enum SettingsError {
    IoError(std::io::Error),
    YamlError(serde_yaml::Error),
}

impl std::error::Error for SettingsError {}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::IoError(error) => write!(formatter, "IO error: {}", error),
            SettingsError::YamlError(error) => write!(formatter, "YAML error: {}", error),
        }
    }
}

impl std::fmt::Display for Settings {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut output = vec![];
        self.write(&mut output).map_err(|_| std::fmt::Error)?;
        let output = String::from_utf8(output).map_err(|_| std::fmt::Error)?;
        write!(formatter, "{}", output)
    }
}

impl Settings {
    pub fn write(&self, writer: &mut dyn std::io::Write) -> Result<(), SettingsError> {
        serde_yaml::to_writer(writer, self).map_err(SettingsError::YamlError)
    }

    pub fn read(reader: &mut dyn std::io::Read) -> Result<Settings, SettingsError> {
        serde_yaml::from_reader(reader).map_err(SettingsError::YamlError)
    }

    pub fn write_to_file(&self, filename: &str) -> Result<(), SettingsError> {
        let file = fs::File::create(filename).map_err(SettingsError::IoError)?;
        let mut writer = std::io::BufWriter::new(file);
        self.write(&mut writer)
    }

    pub fn read_from_file(filename: &str) -> Result<Settings, SettingsError> {
        let file = fs::File::open(filename).map_err(SettingsError::IoError)?;
        let mut reader = std::io::BufReader::new(file);
        Self::read(&mut reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::schedule::{Phase, PhaseKind};

    #[test]
    fn read_write() {
        let mut parameters = Parameters {
            tau: 12.,
            inoculum: 40,
            ..Parameters::default()
        };
        parameters.fates.lethal = 0.05;
        let settings = Settings {
            parameters,
            schedule: Schedule::from_vec(vec![
                Phase::new("equilibration", 10., PhaseKind::Equilibration, false),
                Phase::new("infection", 60., PhaseKind::Infection, true),
            ])
            .unwrap(),
        };
        let mut output = vec![];
        settings.write(&mut output).unwrap();
        let settings2 = Settings::read(&mut &output[..]).unwrap();
        assert_eq!(settings, settings2);
    }

    #[test]
    fn empty_document_is_default() {
        let settings = Settings::read(&mut "{}".as_bytes()).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.to_string().contains("tau: 8.0"));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            Settings::read_from_file("/nonexistent/immunosim.yaml"),
            Err(SettingsError::IoError(_))
        ));
    }
}
