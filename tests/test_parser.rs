use grrm2xtb::parser::{parse_grrm_input, Task};
use grrm2xtb::text::ParseError;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_parse_minimal_energy_input() {
    let input = "\
TASK: ENERGY
COMMENT
STATE
NACTIVEATOM / NATOM:    2 /    2
H        0.000000000000      0.000000000000      0.000000000000
H        0.000000000000      0.000000000000      0.740000000000
NFROZENATOM:    0
";
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("h2_INP4GEN.rrm");
    fs::write(&path, input).unwrap();

    let job = parse_grrm_input(&path).unwrap();
    assert_eq!(job.task, Task::Energy);
    assert_eq!(job.num_atoms, 2);
    assert_eq!(job.num_frozen_atoms, 0);
    assert_eq!(job.atom_coordinates.len(), 2);
    assert!(job.atom_coordinates[1].ends_with("0.740000000000"));
}

#[test]
fn test_parse_egh_with_frozen_atoms() {
    let input = "\
TASK: ENERGY, GRADIENT, and HESSIAN
COMMENT
STATE
NACTIVEATOM / NATOM: 1 / 2
O 0.0 0.0 0.0
H 0.0 0.0 0.96
NFROZENATOM: 1
Ar 4.0 0.0 0.0
";
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("w_INP4GEN.rrm");
    fs::write(&path, input).unwrap();

    let job = parse_grrm_input(&path).unwrap();
    assert_eq!(job.task, Task::EnergyGradientHessian);
    assert_eq!(job.num_active_atoms, 1);
    assert_eq!(job.total_atoms(), 3);
    assert_eq!(job.frozen_atom_coordinates, vec!["Ar 4.0 0.0 0.0"]);
}

#[test]
fn test_missing_input_file() {
    let dir = TempDir::new().unwrap();
    let err = parse_grrm_input(&dir.path().join("none_INP4GEN.rrm")).unwrap_err();
    assert!(matches!(err, ParseError::NotFound(_)));
    assert!(err.to_string().ends_with("none_INP4GEN.rrm not found."));
}
