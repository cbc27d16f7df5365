use serde::Deserialize;

use crate::core::antigen::{AntigenList, AntigenType, Epitope};
use crate::core::gene::parse_residues;
use crate::errors::{ImmuneError, Result};

#[derive(Debug, Deserialize)]
struct EpitopeRecord {
    antigen: String,
    epitope: String,
    sequence: String,
    immunogenicity: f64,
    clearance: f64,
}

/// Read antigen definitions from a `;` separated table.
///
/// The header line is skipped. Consecutive rows with the same antigen name form one antigen,
/// antigens are numbered in order of appearance starting at 0.
pub fn read_antigens(reader: &mut dyn std::io::Read) -> Result<AntigenList> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut groups: Vec<(String, Vec<Epitope>)> = Vec::new();
    for result in reader.records() {
        let row = result.map_err(|err| ImmuneError::ReadError(format!("{err}")))?;
        let line = row.position().map_or(0, |position| position.line());
        let record: EpitopeRecord = row.deserialize(None).map_err(|err| {
            ImmuneError::ReadError(format!("Malformed antigen record on line {line}: {err}"))
        })?;
        let residues = parse_residues(&record.sequence).map_err(|err| {
            ImmuneError::ReadError(format!("Invalid epitope on line {line}: {err}"))
        })?;
        let epitope = Epitope::new(
            &record.epitope,
            residues,
            record.immunogenicity,
            record.clearance,
        );

        match groups.last_mut() {
            Some((name, epitopes)) if *name == record.antigen => epitopes.push(epitope),
            _ => groups.push((record.antigen, vec![epitope])),
        }
    }

    if groups.is_empty() {
        return Err(ImmuneError::ReadError(
            "Antigen file contains no epitopes".to_string(),
        ));
    }

    let antigens = groups
        .into_iter()
        .enumerate()
        .map(|(id, (name, epitopes))| AntigenType::new(&name, id, epitopes))
        .collect::<Result<Vec<AntigenType>>>()?;
    log::info!(
        "Read {} antigens: {}.",
        antigens.len(),
        antigens.iter().map(|antigen| antigen.name()).collect::<Vec<_>>().join(", ")
    );
    Ok(antigens.into())
}

pub fn read_antigens_from_path(path: &str) -> Result<AntigenList> {
    let file = std::fs::File::open(path)
        .map_err(|err| ImmuneError::ReadError(format!("Failed to open {path}: {err}")))?;
    let mut reader = std::io::BufReader::new(file);
    read_antigens(&mut reader)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
antigen;epitope;sequence;immunogenicity;clearance
DENV1;E1A;11112222333344441111;1.0;1.0
DENV1;E1B;22223333444411112222;0.5;1.0
DENV2;E2A;33334444111122223333;1.0;0.25
DENV1;E1C;44441111222233334444;1.0;1.0
";

    #[test]
    fn groups_consecutive_rows() {
        let antigens = read_antigens(&mut TABLE.as_bytes()).unwrap();
        assert_eq!(antigens.len(), 3);
        assert_eq!(antigens[0].name(), "DENV1");
        assert_eq!(antigens[0].epitope_count(), 2);
        assert_eq!(antigens[1].name(), "DENV2");
        assert_eq!(antigens[1].id(), 1);
        assert_eq!(antigens[1].epitope(0).unwrap().clearance(), 0.25);
        // a name reappearing later starts a new antigen
        assert_eq!(antigens[2].name(), "DENV1");
        assert_eq!(antigens[2].id(), 2);
        assert_eq!(antigens[0].epitope(1).unwrap().immunogenicity(), 0.5);
        assert_eq!(antigens[0].epitope(1).unwrap().name(), "E1B");
    }

    #[test]
    fn malformed_rows_fail() {
        let bad_number = "h\nV;e;11112222333344441111;x;1.0\n";
        assert!(matches!(
            read_antigens(&mut bad_number.as_bytes()),
            Err(ImmuneError::ReadError(_))
        ));

        let bad_sequence = "h\nV;e;1111;1.0;1.0\n";
        assert!(read_antigens(&mut bad_sequence.as_bytes()).is_err());

        let missing_column = "h\nV;e;11112222333344441111;1.0\n";
        assert!(read_antigens(&mut missing_column.as_bytes()).is_err());

        assert!(read_antigens(&mut "header only\n".as_bytes()).is_err());
    }
}
