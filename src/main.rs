//! taskdag - local-first task tracking over a dependency DAG

use std::process::ExitCode;

use taskdag::GraphError;

/// Exit code for operations refused because other tasks depend on the target
const EXIT_CONFLICT: u8 = 2;

fn main() -> ExitCode {
    let Err(e) = taskdag::cli::run() else {
        return ExitCode::SUCCESS;
    };

    eprintln!("Error: {:#}", e);

    match e.downcast_ref::<GraphError>() {
        Some(err) if err.is_conflict() => {
            eprintln!("hint: rerun with --force to delete it and its dependency edges");
            ExitCode::from(EXIT_CONFLICT)
        }
        _ => ExitCode::FAILURE,
    }
}
