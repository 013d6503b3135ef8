//! File naming derived from the GRRM job name.
//!
//! GRRM calls the program with a bare job name and expects the result next
//! to the input:
//!
//! ```
//! use grrm2xtb::naming::JobNaming;
//!
//! let naming = JobNaming::new("ts1");
//! assert_eq!(naming.input_file(), "ts1_INP4GEN.rrm");
//! assert_eq!(naming.output_file(), "ts1_OUT4GEN.rrm");
//! assert_eq!(naming.work_dir_name(1700000000123456789, 4242), "ts1_1700000000123456789_4242");
//! ```

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Suffix of the file GRRM writes for us.
pub const GRRM_INPUT_SUFFIX: &str = "_INP4GEN.rrm";
/// Suffix of the file GRRM reads back.
pub const GRRM_OUTPUT_SUFFIX: &str = "_OUT4GEN.rrm";

/// Names of the files and directories belonging to one job.
#[derive(Debug, Clone)]
pub struct JobNaming {
    job_name: String,
}

impl JobNaming {
    /// Creates naming for `job_name` as given on the command line.
    pub fn new(job_name: &str) -> Self {
        Self {
            job_name: job_name.to_string(),
        }
    }

    /// Format: `{job}_INP4GEN.rrm`
    pub fn input_file(&self) -> String {
        format!("{}{}", self.job_name, GRRM_INPUT_SUFFIX)
    }

    /// Format: `{job}_OUT4GEN.rrm`
    pub fn output_file(&self) -> String {
        format!("{}{}", self.job_name, GRRM_OUTPUT_SUFFIX)
    }

    /// Input file path in `dir`.
    pub fn input_path(&self, dir: &Path) -> PathBuf {
        dir.join(self.input_file())
    }

    /// Output file path in `dir`.
    pub fn output_path(&self, dir: &Path) -> PathBuf {
        dir.join(self.output_file())
    }

    /// Format: `{job}_{timestamp}_{pid}`
    ///
    /// The job name may contain a path (GRRM sometimes passes one); only its
    /// final component is used.
    pub fn work_dir_name(&self, timestamp_nanos: u128, pid: u32) -> String {
        let stem = Path::new(&self.job_name)
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("job");
        format!("{}_{}_{}", stem, timestamp_nanos, pid)
    }

    /// A working-directory name unique to this process and moment.
    pub fn unique_work_dir_name(&self) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        self.work_dir_name(nanos, std::process::id())
    }
}
