//! grrm2xtb Command-Line Interface
//!
//! GRRM runs the external program once per energy evaluation with the job
//! name as the only argument:
//!
//! ```bash
//! # reads ts1_INP4GEN.rrm, writes ts1_OUT4GEN.rrm
//! grrm2xtb ts1
//!
//! # print the settings a job would run with
//! XTB_CHARGE=-1 grrm2xtb --show-config
//! ```
//!
//! Errors are printed to stderr and the process exits with status -1.

use grrm2xtb::job::run_job;
use grrm2xtb::settings::Settings;
use log::info;
use std::env;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("grrm2xtb");

    if args.len() < 2 {
        print_usage(program);
        process::exit(-1);
    }
    match args[1].as_str() {
        "--help" | "-h" => {
            print_usage(program);
            process::exit(0);
        }
        "--version" | "-V" => {
            println!("grrm2xtb {}", env!("CARGO_PKG_VERSION"));
            process::exit(0);
        }
        _ => {}
    }

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(-1);
        }
    };

    env_logger::Builder::from_default_env()
        .filter_level(settings.logging.level_filter())
        .target(env_logger::Target::Stderr)
        .format_timestamp_millis()
        .init();

    if args[1] == "--show-config" {
        match serde_json::to_string_pretty(&settings) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(-1);
            }
        }
        return;
    }

    let job_dir = match env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Error: cannot determine current directory: {}", e);
            process::exit(-1);
        }
    };

    info!("grrm2xtb {} job {}", env!("CARGO_PKG_VERSION"), args[1]);
    match run_job(&args[1], &job_dir, &settings) {
        Ok(output) => info!("Job finished: {}", output.display()),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(-1);
        }
    }
}

/// Prints usage information to stderr.
fn print_usage(program_name: &str) {
    eprintln!("grrm2xtb - xtb interface for GRRM");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {} <JOB>", program_name);
    eprintln!("                    Read <JOB>_INP4GEN.rrm, run xtb, write <JOB>_OUT4GEN.rrm");
    eprintln!();
    eprintln!("  {} --show-config", program_name);
    eprintln!("                    Print the resolved settings as JSON");
    eprintln!();
    eprintln!("  {} --help | --version", program_name);
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  XTB_COMMAND       xtb executable (default: xtb)");
    eprintln!("  XTB_CHARGE        molecular charge (default: 0)");
    eprintln!("  XTB_MULTI         spin multiplicity (default: 1)");
    eprintln!("  XTB_SOLVATION     gbsa or alpb, requires XTB_SOLVENT");
    eprintln!("  XTB_SOLVENT       solvent name");
    eprintln!("  XTB_PARAM         parametrization passed to --gfn");
    eprintln!("  XTB_SCRATCH_DIR   root for working directories (default: .)");
    eprintln!("  XTB_KEEP_LOG      true/1/on keeps the working directory");
    eprintln!();
    eprintln!("Settings files: ~/.config/grrm2xtb/grrm2xtb.cfg, ./grrm2xtb.cfg");
}
