//! Writer for the GRRM `*_OUT4GEN.rrm` result file.
//!
//! The layout is fixed; quantities xtb does not provide (dipole, S**2,
//! dipole derivatives, polarizability, and the gradient or Hessian for tasks
//! that skip them) are written as zeros so GRRM always finds every block.

use crate::convert::{dummy_dipole_derivatives, ZERO};
use std::fs;
use std::io::Result;
use std::path::Path;

/// Data for one result file, gradient and Hessian already formatted.
#[derive(Debug, Clone, PartialEq)]
pub struct GrrmResult {
    /// Number of atoms reported to GRRM (frozen atoms excluded)
    pub num_atoms: usize,
    /// `CURRENT COORDINATE` lines
    pub coordinates: Vec<String>,
    /// Total energy as printed by xtb
    pub energy: String,
    /// `GRADIENT` block lines
    pub gradient: Vec<String>,
    /// `HESSIAN` block lines
    pub hessian: Vec<String>,
}

impl GrrmResult {
    /// Renders the complete file content.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut line = |text: &str| {
            out.push_str(text);
            out.push('\n');
        };

        line("RESULTS");
        line("CURRENT COORDINATE");
        self.coordinates.iter().for_each(|c| line(c));
        line(&format!("ENERGY =  {}  {ZERO}  {ZERO}", self.energy));
        line(&format!("       =  {ZERO}  {ZERO}  {ZERO}"));
        line(&format!("S**2   =  {ZERO}"));
        line("GRADIENT");
        self.gradient.iter().for_each(|g| line(g));
        line(&format!("DIPOLE =  {ZERO}  {ZERO}  {ZERO}"));
        line("HESSIAN");
        self.hessian.iter().for_each(|h| line(h));
        line("DIPOLE DERIVATIVES");
        dummy_dipole_derivatives(self.num_atoms)
            .iter()
            .for_each(|d| line(d));
        line("POLARIZABILITY");
        line(&format!("  {ZERO}"));
        line(&format!("  {ZERO}  {ZERO}"));
        line(&format!("  {ZERO}  {ZERO}  {ZERO}"));

        out
    }
}

/// Writes `result` to `path`, replacing any existing file.
pub fn write_grrm_output(path: &Path, result: &GrrmResult) -> Result<()> {
    fs::write(path, result.render())
}
