//! Running xtb for a GRRM job.
//!
//! The [`QMInterface`] trait is the seam between the job orchestrator and the
//! program that does the chemistry. [`XtbInterface`] is the real
//! implementation:
//!
//! 1. [`write_xyz_input`] writes `input.xyz` (regular atoms, then frozen atoms)
//! 2. [`write_constraint_file`] writes `constrain.inp` when atoms must be fixed
//! 3. [`build_xtb_command`] assembles the argument list from the job and the
//!    [`XtbSettings`]
//! 4. xtb runs inside the working directory with stdout and stderr in
//!    `xtblog.log`
//!
//! The command is spawned directly, never through a shell, so solvent names
//! or paths with spaces reach xtb as single arguments.

use crate::parser::{GrrmJob, Task};
use crate::settings::{ConfigError, XtbSettings};
use crate::text::ParseError;
use log::{debug, info};
use std::fmt;
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use thiserror::Error;

/// Geometry handed to xtb.
pub const XTB_INPUT_XYZ_FILE: &str = "input.xyz";
/// Detailed-input file holding the `$fix` block.
pub const XTB_CONSTRAIN_FILE: &str = "constrain.inp";
/// Energy written by xtb.
pub const XTB_ENERGY_FILE: &str = "energy";
/// Gradient written by `--grad`.
pub const XTB_GRADIENT_FILE: &str = "gradient";
/// Hessian written by `--hess`.
pub const XTB_HESSIAN_FILE: &str = "hessian";
/// Optimised geometry written by `--opt`.
pub const XTB_OPT_XYZ_FILE: &str = "xtbopt.xyz";
/// Combined stdout/stderr of the xtb run.
pub const XTB_LOG_FILE: &str = "xtblog.log";

/// Error type for preparing and running xtb.
#[derive(Error, Debug)]
pub enum QMError {
    /// File system or I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// An xtb output file could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    /// The settings do not form a valid command line
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// xtb could not be started
    #[error("Failed to launch {command}: {source}")]
    Launch {
        /// Command line that was attempted
        command: String,
        /// Underlying spawn error
        source: std::io::Error,
    },
    /// xtb exited with a nonzero status
    #[error("XTB command failed: {0}")]
    Calculation(String),
}

type Result<T> = std::result::Result<T, QMError>;

/// Contract between the orchestrator and a quantum chemistry program.
pub trait QMInterface {
    /// Writes the program input for `job` into `work_dir`.
    ///
    /// Returns `true` when a constraint file was written.
    fn write_input(&self, job: &GrrmJob, work_dir: &Path) -> Result<bool>;

    /// Runs the calculation in `work_dir` and waits for it to finish.
    fn run_calculation(&self, job: &GrrmJob, constrained: bool, work_dir: &Path) -> Result<()>;
}

/// An xtb invocation: program plus explicit argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XtbCommand {
    /// Executable
    pub program: String,
    /// Arguments, in order
    pub args: Vec<String>,
}

impl XtbCommand {
    fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
        }
    }

    fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }
}

impl fmt::Display for XtbCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// xtb interface driven by [`XtbSettings`].
pub struct XtbInterface {
    settings: XtbSettings,
}

impl XtbInterface {
    /// Creates an interface with the given settings.
    pub fn new(settings: XtbSettings) -> Self {
        Self { settings }
    }
}

impl QMInterface for XtbInterface {
    fn write_input(&self, job: &GrrmJob, work_dir: &Path) -> Result<bool> {
        write_xyz_input(job, &work_dir.join(XTB_INPUT_XYZ_FILE))?;
        write_constraint_file(job, &work_dir.join(XTB_CONSTRAIN_FILE))
    }

    fn run_calculation(&self, job: &GrrmJob, constrained: bool, work_dir: &Path) -> Result<()> {
        let command = build_xtb_command(job, constrained, &self.settings)?;
        info!("Running: {}", command);

        let log_file = fs::File::create(work_dir.join(XTB_LOG_FILE))?;
        let status = Command::new(&command.program)
            .args(&command.args)
            .current_dir(work_dir)
            .stdout(Stdio::from(log_file.try_clone()?))
            .stderr(Stdio::from(log_file))
            .status()
            .map_err(|source| QMError::Launch {
                command: command.to_string(),
                source,
            })?;

        if !status.success() {
            return Err(QMError::Calculation(command.to_string()));
        }
        debug!("xtb finished with {}", status);
        Ok(())
    }
}

/// Writes the XYZ file xtb reads: regular atoms followed by frozen atoms.
pub fn write_xyz_input(job: &GrrmJob, path: &Path) -> Result<()> {
    let mut content = format!("{}\ncoord\n", job.total_atoms());
    for line in job.atom_coordinates.iter().chain(&job.frozen_atom_coordinates) {
        content.push_str(line);
        content.push('\n');
    }
    fs::write(path, content)?;
    Ok(())
}

/// Writes `constrain.inp` if the job needs fixed atoms.
///
/// - microiteration: atoms `1..=num_active_atoms` and all frozen atoms are
///   fixed, the file is always written
/// - other tasks: only frozen atoms are fixed, nothing is written when there
///   are none
///
/// Returns whether the file was written.
pub fn write_constraint_file(job: &GrrmJob, path: &Path) -> Result<bool> {
    match constraint_block(job) {
        Some(block) => {
            fs::write(path, block)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// The `$fix` block for `job`, or `None` when nothing is fixed.
pub fn constraint_block(job: &GrrmJob) -> Option<String> {
    let frozen = (job.num_frozen_atoms > 0)
        .then(|| (job.num_atoms + 1, job.num_atoms + job.num_frozen_atoms));

    let ranges: Vec<(usize, usize)> = match job.task {
        Task::MicroIteration => [Some((1, job.num_active_atoms)), frozen]
            .into_iter()
            .flatten()
            .filter(|(start, end)| start <= end)
            .collect(),
        _ => vec![frozen?],
    };

    let mut block = String::from("$fix\n");
    if !ranges.is_empty() {
        let atoms: Vec<String> = ranges.iter().map(|&(s, e)| format_range(s, e)).collect();
        block.push_str(&format!("    atoms: {}\n", atoms.join(", ")));
    }
    block.push_str("$end\n");
    Some(block)
}

fn format_range(start: usize, end: usize) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{}-{}", start, end)
    }
}

/// Assembles the xtb command line for `job`.
///
/// Order: `--opt`, `--input`, `--chrg`, `--uhf`, solvation, `--gfn`, task
/// flags, geometry file.
pub fn build_xtb_command(
    job: &GrrmJob,
    constrained: bool,
    settings: &XtbSettings,
) -> std::result::Result<XtbCommand, ConfigError> {
    let mut command = XtbCommand::new(&settings.command);

    if job.task == Task::MicroIteration {
        command.arg("--opt");
    }
    if constrained {
        command.arg("--input").arg(XTB_CONSTRAIN_FILE);
    }

    command.arg("--chrg").arg(settings.charge.as_str());
    command.arg("--uhf").arg(settings.uhf().to_string());

    if let Some((model, solvent)) = settings.solvation()? {
        command.arg(model.flag()).arg(solvent);
    }
    if let Some(param) = &settings.param {
        command.arg("--gfn").arg(param.as_str());
    }

    match job.task {
        Task::EnergyGradientHessian => {
            command.arg("--hess").arg("--grad");
        }
        Task::Energy | Task::EnergyGradient | Task::MicroIteration => {
            command.arg("--grad");
        }
        Task::Guess => {}
    }

    command.arg(XTB_INPUT_XYZ_FILE);
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn job(task: Task, active: usize, atoms: usize, frozen: usize) -> GrrmJob {
        GrrmJob {
            task,
            num_active_atoms: active,
            num_atoms: atoms,
            atom_coordinates: (0..atoms).map(|i| format!("H 0.0 0.0 {}.0", i)).collect(),
            num_frozen_atoms: frozen,
            frozen_atom_coordinates: (0..frozen).map(|i| format!("O 9.0 0.0 {}.0", i)).collect(),
        }
    }

    #[test]
    fn test_write_xyz_input_appends_frozen_atoms() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(XTB_INPUT_XYZ_FILE);
        write_xyz_input(&job(Task::Energy, 2, 2, 1), &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "3\ncoord\nH 0.0 0.0 0.0\nH 0.0 0.0 1.0\nO 9.0 0.0 0.0\n"
        );
    }

    #[test]
    fn test_constraint_block_frozen_only() {
        assert_eq!(constraint_block(&job(Task::EnergyGradient, 3, 3, 0)), None);
        assert_eq!(
            constraint_block(&job(Task::EnergyGradient, 3, 3, 1)).unwrap(),
            "$fix\n    atoms: 4\n$end\n"
        );
        assert_eq!(
            constraint_block(&job(Task::EnergyGradientHessian, 3, 3, 4)).unwrap(),
            "$fix\n    atoms: 4-7\n$end\n"
        );
    }

    #[test]
    fn test_constraint_block_microiteration() {
        assert_eq!(
            constraint_block(&job(Task::MicroIteration, 1, 5, 0)).unwrap(),
            "$fix\n    atoms: 1\n$end\n"
        );
        assert_eq!(
            constraint_block(&job(Task::MicroIteration, 4, 10, 2)).unwrap(),
            "$fix\n    atoms: 1-4, 11-12\n$end\n"
        );
        assert_eq!(
            constraint_block(&job(Task::MicroIteration, 4, 10, 1)).unwrap(),
            "$fix\n    atoms: 1-4, 11\n$end\n"
        );
    }

    #[test]
    fn test_write_constraint_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(XTB_CONSTRAIN_FILE);
        assert!(!write_constraint_file(&job(Task::Energy, 2, 2, 0), &path).unwrap());
        assert!(!path.exists());
        assert!(write_constraint_file(&job(Task::MicroIteration, 2, 3, 0), &path).unwrap());
        assert!(path.exists());
    }

    #[test]
    fn test_command_energy_defaults() {
        let command = build_xtb_command(&job(Task::Energy, 2, 2, 0), false, &XtbSettings::default()).unwrap();
        assert_eq!(command.to_string(), "xtb --chrg 0 --uhf 0 --grad input.xyz");
    }

    #[test]
    fn test_command_microiteration_full_options() {
        let settings = XtbSettings {
            charge: "-1".to_string(),
            multiplicity: 2,
            solvation: Some("GBSA".to_string()),
            solvent: Some("water".to_string()),
            param: Some("2".to_string()),
            ..XtbSettings::default()
        };
        let command = build_xtb_command(&job(Task::MicroIteration, 1, 3, 0), true, &settings).unwrap();
        assert_eq!(
            command.args,
            vec![
                "--opt", "--input", "constrain.inp", "--chrg", "-1", "--uhf", "1", "--gbsa",
                "water", "--gfn", "2", "--grad", "input.xyz",
            ]
        );
    }

    #[test]
    fn test_command_hessian_flags() {
        let command =
            build_xtb_command(&job(Task::EnergyGradientHessian, 2, 2, 0), false, &XtbSettings::default())
                .unwrap();
        assert!(command.to_string().ends_with("--hess --grad input.xyz"));
    }

    #[test]
    fn test_command_solvation_without_solvent() {
        let settings = XtbSettings {
            solvation: Some("alpb".to_string()),
            ..XtbSettings::default()
        };
        let err = build_xtb_command(&job(Task::Energy, 1, 1, 0), false, &settings).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSolvent));
    }

    #[test]
    fn test_run_calculation_reports_launch_failure() {
        let dir = TempDir::new().unwrap();
        let interface = XtbInterface::new(XtbSettings {
            command: "grrm2xtb-no-such-program".to_string(),
            ..XtbSettings::default()
        });
        let job = job(Task::Energy, 1, 1, 0);
        let constrained = interface.write_input(&job, dir.path()).unwrap();
        let err = interface.run_calculation(&job, constrained, dir.path()).unwrap_err();
        assert!(matches!(err, QMError::Launch { .. }));
        assert!(err.to_string().contains("grrm2xtb-no-such-program"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_calculation_reports_nonzero_exit() {
        let dir = TempDir::new().unwrap();
        let interface = XtbInterface::new(XtbSettings {
            command: "false".to_string(),
            ..XtbSettings::default()
        });
        let job = job(Task::Energy, 1, 1, 0);
        let constrained = interface.write_input(&job, dir.path()).unwrap();
        let err = interface.run_calculation(&job, constrained, dir.path()).unwrap_err();
        match err {
            QMError::Calculation(command) => {
                assert!(command.starts_with("false "));
                assert_eq!(command, "false --chrg 0 --uhf 0 --grad input.xyz");
            }
            other => panic!("expected Calculation, got {:?}", other),
        }
        assert!(dir.path().join(XTB_LOG_FILE).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_calculation_logs_output_in_work_dir() {
        let dir = TempDir::new().unwrap();
        let interface = XtbInterface::new(XtbSettings {
            command: "echo".to_string(),
            ..XtbSettings::default()
        });
        let job = job(Task::EnergyGradientHessian, 1, 1, 0);
        interface.run_calculation(&job, false, dir.path()).unwrap();
        let log = fs::read_to_string(dir.path().join(XTB_LOG_FILE)).unwrap();
        assert_eq!(log, "--chrg 0 --uhf 0 --hess --grad input.xyz\n");
    }
}
