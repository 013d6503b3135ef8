//! One GRRM request from input file to result file.
//!
//! ```text
//! {job}_INP4GEN.rrm -> GrrmJob -> input.xyz / constrain.inp -> xtb
//!     -> energy / gradient / hessian / xtbopt.xyz -> {job}_OUT4GEN.rrm
//! ```
//!
//! Every step returns an error instead of exiting; `main` decides how to
//! terminate. The result file is written only after every xtb output was read
//! back successfully.

use crate::convert::{
    dummy_gradient, dummy_hessian, format_gradient, format_hessian, resize_gradient,
    resize_hessian,
};
use crate::naming::JobNaming;
use crate::output::{write_grrm_output, GrrmResult};
use crate::parser::{parse_grrm_input, GrrmJob, Task};
use crate::qm_interface::{
    QMError, QMInterface, XtbInterface, XTB_ENERGY_FILE, XTB_GRADIENT_FILE, XTB_HESSIAN_FILE,
    XTB_OPT_XYZ_FILE,
};
use crate::settings::{ConfigError, Settings};
use crate::text::ParseError;
use crate::workdir::{WorkDir, WorkDirError};
use crate::xtb_output::{read_energy, read_gradient, read_hessian, read_xyz};
use log::info;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Any failure that aborts a job.
#[derive(Error, Debug)]
pub enum JobError {
    /// GRRM input or xtb output could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Preparing or running xtb failed
    #[error(transparent)]
    QM(#[from] QMError),
    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The task exists in GRRM but xtb cannot perform it
    #[error("TASK {0} is unavailable with XTB.")]
    UnsupportedTask(Task),
    /// Working directory could not be created or removed
    #[error(transparent)]
    WorkDir(#[from] WorkDirError),
    /// The result file could not be written
    #[error("Failed to write output file {}: {source}", .path.display())]
    Output {
        /// Result file path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

/// Type alias for job results
pub type Result<T> = std::result::Result<T, JobError>;

/// Runs `job_name` with xtb; `job_dir` holds the GRRM input and output files.
///
/// Returns the path of the written result file.
pub fn run_job(job_name: &str, job_dir: &Path, settings: &Settings) -> Result<PathBuf> {
    let interface = XtbInterface::new(settings.xtb.clone());
    run_job_with(job_name, job_dir, settings, &interface)
}

/// Runs `job_name` with any [`QMInterface`].
pub fn run_job_with<Q>(job_name: &str, job_dir: &Path, settings: &Settings, qm: &Q) -> Result<PathBuf>
where
    Q: QMInterface + ?Sized,
{
    let naming = JobNaming::new(job_name);
    let input_path = naming.input_path(job_dir);
    let output_path = naming.output_path(job_dir);

    info!("Reading GRRM input: {}", input_path.display());
    let job = parse_grrm_input(&input_path)?;
    if job.task == Task::Guess {
        return Err(JobError::UnsupportedTask(job.task));
    }
    settings.validate()?;
    info!(
        "Task: {}, atoms: {} (active {}), frozen atoms: {}",
        job.task, job.num_atoms, job.num_active_atoms, job.num_frozen_atoms
    );

    let scratch_root = match &settings.runtime.scratch_dir {
        Some(dir) => job_dir.join(dir),
        None => job_dir.to_path_buf(),
    };
    let work_dir = WorkDir::create(&scratch_root, &naming.unique_work_dir_name())?;
    info!("Working directory: {}", work_dir.path().display());

    let constrained = qm.write_input(&job, work_dir.path())?;
    qm.run_calculation(&job, constrained, work_dir.path())?;
    let result = collect_results(&job, work_dir.path())?;

    write_grrm_output(&output_path, &result).map_err(|source| JobError::Output {
        path: output_path.clone(),
        source,
    })?;
    info!("Wrote GRRM output: {}", output_path.display());

    work_dir.finish(settings.runtime.keep_log)?;
    Ok(output_path)
}

/// Reads the xtb outputs the task needs and builds the GRRM result.
///
/// Files are read for all `num_atoms + num_frozen_atoms` atoms and trimmed
/// back to the `num_atoms` GRRM asked about.
pub fn collect_results(job: &GrrmJob, work_dir: &Path) -> Result<GrrmResult> {
    let total_atoms = job.total_atoms();

    let coordinates = if job.task == Task::MicroIteration {
        let optimized = read_xyz(&work_dir.join(XTB_OPT_XYZ_FILE))?;
        if optimized.len() < job.num_atoms {
            return Err(ParseError::Malformed {
                file: XTB_OPT_XYZ_FILE.to_string(),
                line: 1,
                message: format!(
                    "expected at least {} atoms, found {}",
                    job.num_atoms,
                    optimized.len()
                ),
            }
            .into());
        }
        optimized.into_iter().take(job.num_atoms).collect()
    } else {
        job.atom_coordinates.clone()
    };

    let energy = read_energy(&work_dir.join(XTB_ENERGY_FILE))?;

    let gradient = if job.task.returns_gradient() {
        let gradient = read_gradient(&work_dir.join(XTB_GRADIENT_FILE), total_atoms)?;
        format_gradient(&resize_gradient(&gradient, job.num_atoms))
    } else {
        dummy_gradient(job.num_atoms)
    };

    let hessian = if job.task.returns_hessian() {
        let hessian = read_hessian(&work_dir.join(XTB_HESSIAN_FILE), total_atoms)?;
        format_hessian(&resize_hessian(&hessian, job.num_atoms))
    } else {
        dummy_hessian(job.num_atoms)
    };

    Ok(GrrmResult {
        num_atoms: job.num_atoms,
        coordinates,
        energy,
        gradient,
        hessian,
    })
}
