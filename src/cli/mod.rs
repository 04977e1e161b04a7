mod commands;
mod error;
pub mod exit_codes;
pub mod output;

pub use commands::Cli;
pub use error::CommandError;

use output::OutputMode;

/// run a command and report its failure; returns the process exit code
pub fn run(cli: Cli) -> i32 {
    let output_mode = OutputMode::from_flags(cli.json, cli.no_json, cli.quiet);

    match commands::execute(cli) {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            report(&e, output_mode);
            e.code
        }
    }
}

fn report(e: &CommandError, output_mode: OutputMode) {
    if output_mode.is_json() {
        output::print_json_error(e.code, &e.message, e.error_data());
        return;
    }

    eprintln!("Error: {}", e.message);
    if !e.suggestions.is_empty() {
        eprintln!("Did you mean: {}?", e.suggestions.join(", "));
    }
}
