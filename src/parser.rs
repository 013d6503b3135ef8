//! Reader for the GRRM `*_INP4GEN.rrm` job file.
//!
//! GRRM hands every gradient/Hessian request to its external program through
//! a fixed-layout text file. Parsing is strictly positional:
//!
//! ```text
//! TASK: ENERGY and GRADIENT                  <- line 0, label after the colon
//! ...                                        <- lines 1-2, ignored
//! NACTIVEATOM / NATOM:    2 /    3           <- line 3, active / total
//! C   0.000000000000   0.000000000000   0.0  <- NATOM coordinate lines
//! H   ...
//! H   ...
//! NFROZENATOM:    1                          <- frozen-atom count
//! O   ...                                    <- NFROZENATOM more lines
//! ```
//!
//! Coordinate lines are kept verbatim (tabs become spaces) so that the
//! precision GRRM printed is what xtb reads.

use crate::text::{normalize_tabs, LineCursor, ParseError, Result};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::fmt;
use std::path::Path;

const TASK_LINE: usize = 0;
const ATOM_COUNT_LINE: usize = 3;
const FIRST_COORDINATE_LINE: usize = 4;

lazy_static! {
    // "  2 /    3" with any amount of blank around the slash
    static ref ATOM_COUNTS_RE: Regex = Regex::new(r"^\s*(\d+)\s*/\s*(\d+)\s*$").unwrap();
}

/// Calculation requested by GRRM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// `MAKE GUESS`: initial wavefunction guess, which xtb cannot provide
    Guess,
    /// `MICROITERATION`: constrained optimisation of the inactive region
    MicroIteration,
    /// `ENERGY`
    Energy,
    /// `ENERGY and GRADIENT`
    EnergyGradient,
    /// `ENERGY, GRADIENT, and HESSIAN`
    EnergyGradientHessian,
}

impl Task {
    /// Maps a GRRM task label to a task. Labels are matched exactly.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "MAKE GUESS" => Some(Task::Guess),
            "MICROITERATION" => Some(Task::MicroIteration),
            "ENERGY" => Some(Task::Energy),
            "ENERGY and GRADIENT" => Some(Task::EnergyGradient),
            "ENERGY, GRADIENT, and HESSIAN" => Some(Task::EnergyGradientHessian),
            _ => None,
        }
    }

    /// The label GRRM uses for this task.
    pub fn label(&self) -> &'static str {
        match self {
            Task::Guess => "MAKE GUESS",
            Task::MicroIteration => "MICROITERATION",
            Task::Energy => "ENERGY",
            Task::EnergyGradient => "ENERGY and GRADIENT",
            Task::EnergyGradientHessian => "ENERGY, GRADIENT, and HESSIAN",
        }
    }

    /// Whether a real gradient is returned to GRRM.
    pub fn returns_gradient(&self) -> bool {
        matches!(
            self,
            Task::MicroIteration | Task::EnergyGradient | Task::EnergyGradientHessian
        )
    }

    /// Whether a real Hessian is returned to GRRM.
    pub fn returns_hessian(&self) -> bool {
        matches!(self, Task::EnergyGradientHessian)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything GRRM asked for in one `*_INP4GEN.rrm` file.
///
/// Built once by [`parse_grrm_input`] and only read afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct GrrmJob {
    /// Requested calculation
    pub task: Task,
    /// Number of active atoms (NACTIVEATOM)
    pub num_active_atoms: usize,
    /// Number of atoms whose coordinates are listed (NATOM)
    pub num_atoms: usize,
    /// `num_atoms` coordinate lines, `Element x y z`
    pub atom_coordinates: Vec<String>,
    /// Number of frozen atoms (NFROZENATOM)
    pub num_frozen_atoms: usize,
    /// `num_frozen_atoms` coordinate lines
    pub frozen_atom_coordinates: Vec<String>,
}

impl GrrmJob {
    /// Atoms handed to xtb: regular atoms followed by frozen atoms.
    pub fn total_atoms(&self) -> usize {
        self.num_atoms + self.num_frozen_atoms
    }
}

/// Reads and parses a GRRM input file.
///
/// # Errors
///
/// - [`ParseError::NotFound`] if `path` does not exist
/// - [`ParseError::UnknownTask`] for an unrecognised task label
/// - [`ParseError::Malformed`] for a missing line, a missing field or a
///   count that is not an integer
///
/// # Examples
///
/// ```no_run
/// use grrm2xtb::parser::parse_grrm_input;
/// use std::path::Path;
///
/// let job = parse_grrm_input(Path::new("ts1_INP4GEN.rrm"))?;
/// println!("{} atoms, task {}", job.num_atoms, job.task);
/// # Ok::<(), grrm2xtb::text::ParseError>(())
/// ```
pub fn parse_grrm_input(path: &Path) -> Result<GrrmJob> {
    let cursor = LineCursor::open(path)?;
    parse_grrm_lines(&cursor)
}

/// Parses GRRM input already loaded into a [`LineCursor`].
pub fn parse_grrm_lines(cursor: &LineCursor) -> Result<GrrmJob> {
    let label = cursor.field_after_colon(TASK_LINE)?;
    let task = Task::from_label(label).ok_or_else(|| ParseError::UnknownTask {
        file: cursor.name().to_string(),
        task: label.to_string(),
    })?;

    let (num_active_atoms, num_atoms) = parse_atom_counts(cursor)?;

    let atom_coordinates = cursor
        .lines(FIRST_COORDINATE_LINE, num_atoms)?
        .iter()
        .map(|line| normalize_tabs(line))
        .collect();

    let frozen_line = FIRST_COORDINATE_LINE + num_atoms;
    let frozen_field = cursor.field_after_colon(frozen_line)?;
    let num_frozen_atoms: usize =
        cursor.parse_int(frozen_line, frozen_field, "frozen atom count")?;

    let frozen_atom_coordinates = if num_frozen_atoms > 0 {
        cursor
            .lines(frozen_line + 1, num_frozen_atoms)?
            .iter()
            .map(|line| normalize_tabs(line))
            .collect()
    } else {
        Vec::new()
    };

    debug!(
        "Parsed {}: task={:?}, active/total atoms={}/{}, frozen atoms={}",
        cursor.name(),
        task,
        num_active_atoms,
        num_atoms,
        num_frozen_atoms
    );

    Ok(GrrmJob {
        task,
        num_active_atoms,
        num_atoms,
        atom_coordinates,
        num_frozen_atoms,
        frozen_atom_coordinates,
    })
}

fn parse_atom_counts(cursor: &LineCursor) -> Result<(usize, usize)> {
    let field = cursor.field_after_colon(ATOM_COUNT_LINE)?;
    let caps = ATOM_COUNTS_RE.captures(field).ok_or_else(|| {
        cursor.error(
            ATOM_COUNT_LINE,
            format!("expected 'active / total' atom counts, found '{}'", field),
        )
    })?;

    let active: usize = cursor.parse_int(ATOM_COUNT_LINE, &caps[1], "active atom count")?;
    let total: usize = cursor.parse_int(ATOM_COUNT_LINE, &caps[2], "atom count")?;
    if active > total {
        return Err(cursor.error(
            ATOM_COUNT_LINE,
            format!("active atom count {} exceeds atom count {}", active, total),
        ));
    }
    Ok((active, total))
}
