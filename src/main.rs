/*!
Land Constraint Checker shows statutory and sensitive-use constraint layers against an uploaded site boundary. It prepares
the layers (unpacking uploads, reprojecting, simplifying) and writes a render payload for the map surface to draw.
*/

#![warn(noop_method_call)]
#![warn(single_use_lifetimes)]
#![warn(unused_lifetimes)]
#![warn(trivial_numeric_casts)]
#![warn(unreachable_pub)]
#![warn(unused_crate_dependencies)]
#![warn(meta_variable_misuse)]
#![warn(unused_macro_rules)]
#![warn(unused_qualifications)]
#![warn(unused_results)] // It's easy to get around by adding a `_ = ` before the code (a pattern assignment, not a variable)
#![warn(variant_size_differences)]

use clap::Parser;

pub(crate) mod errors;
pub(crate) mod commands;
pub(crate) mod progress;
pub(crate) mod utils;
pub(crate) mod geometry;
pub(crate) mod upload;
pub(crate) mod algorithms;
pub(crate) mod layers;
pub(crate) mod session;
pub(crate) mod render;
pub(crate) mod export;

use errors::ProgramError;

use commands::LandConstraintChecker;
use commands::Task as _;
use progress::ConsoleProgressBar;

/**
Runs the program with arbitrary arguments. The first item in the arguments will be ignored. All output will be printed to Stdout or Stderr.
*/
fn run<Arg, Args>(args: &mut Args) -> Result<(),ProgramError>
where
    Arg: Clone + Into<std::ffi::OsString>,
    Args: Iterator<Item = Arg>
{
    let mut progress = ConsoleProgressBar::new();
    let command = LandConstraintChecker::try_parse_from(args)?;
    command.run(&mut progress)?;
    Ok(())
}

fn main() -> std::process::ExitCode {
    let mut args = std::env::args();
    // Returning the error from main would print it with Debug, not Display.
    match run(&mut args) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            std::process::ExitCode::FAILURE
        }
    }
}
