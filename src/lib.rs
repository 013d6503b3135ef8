#![deny(missing_docs)]

//! grrm2xtb - xtb as the external energy program of GRRM
//!
//! GRRM explores reaction paths but delegates every energy, gradient and
//! Hessian evaluation to an external program through a pair of text files.
//! This crate plays that external program with the semiempirical code
//! [xtb](https://github.com/grimme-lab/xtb):
//!
//! ```text
//! {job}_INP4GEN.rrm  ->  input.xyz, constrain.inp  ->  xtb
//!                                                       |
//! {job}_OUT4GEN.rrm  <-  energy, gradient, hessian, xtbopt.xyz
//! ```
//!
//! # Tasks
//!
//! | GRRM task | xtb flags | Returned to GRRM |
//! |-----------|-----------|------------------|
//! | `MICROITERATION` | `--opt --grad` | optimised coordinates, energy, gradient |
//! | `ENERGY` | `--grad` | energy |
//! | `ENERGY and GRADIENT` | `--grad` | energy, gradient |
//! | `ENERGY, GRADIENT, and HESSIAN` | `--hess --grad` | energy, gradient, Hessian |
//!
//! `MAKE GUESS` is rejected. Quantities xtb does not provide are written as
//! zero blocks.
//!
//! Numbers are never converted to floating point on their way from xtb to
//! GRRM: matrices hold the text tokens xtb printed, so GRRM receives xtb's
//! own precision.
//!
//! # Quick Start
//!
//! ```no_run
//! use grrm2xtb::job::run_job;
//! use grrm2xtb::settings::Settings;
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load()?;
//!     let output = run_job("ts1", Path::new("."), &settings)?;
//!     println!("wrote {}", output.display());
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! Settings come from built-in defaults, `~/.config/grrm2xtb/grrm2xtb.cfg`,
//! `./grrm2xtb.cfg` and finally the `XTB_*` environment variables, see
//! [`settings`](settings/index.html).
//!
//! # Modules
//!
//! - [`parser`](parser/index.html) - GRRM input file
//! - [`qm_interface`](qm_interface/index.html) - xtb input files and process
//! - [`xtb_output`](xtb_output/index.html) - xtb result files
//! - [`convert`](convert/index.html) - gradient/Hessian trimming and formatting
//! - [`output`](output/index.html) - GRRM output file
//! - [`job`](job/index.html) - the whole request

/// Gradient and Hessian trimming and GRRM formatting
pub mod convert;
pub mod job;
/// File naming derived from the job name
pub mod naming;
pub mod output;
pub mod parser;
pub mod qm_interface;
/// Configuration management system
pub mod settings;
/// Line-oriented text helpers shared by the readers
pub mod text;
/// Scratch working directory management
pub mod workdir;
pub mod xtb_output;

pub use job::{run_job, JobError};
pub use parser::{GrrmJob, Task};
pub use settings::Settings;
