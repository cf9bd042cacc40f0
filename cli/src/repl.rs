//! REPL for math expressions.

use rustyline::{error::ReadlineError, DefaultEditor};

use std::io;

use crate::common::{Env, ParseAndEvalResult};

fn into_io_error(err: ReadlineError) -> io::Error {
    match err {
        ReadlineError::Io(err) => err,
        other => io::Error::new(io::ErrorKind::Other, other),
    }
}

/// Handles a REPL command starting with `.`.
fn run_command(env: &mut Env, line: &str) -> io::Result<()> {
    match line {
        ".help" => env.print_help(),
        ".vars" => env.dump_variables(),
        ".clear" => {
            env.clear_variables();
            Ok(())
        }
        _ => env.report_unknown_command(line),
    }
}

pub fn repl(env: &mut Env) -> io::Result<()> {
    let mut rl = DefaultEditor::new().map_err(into_io_error)?;
    env.print_greeting()?;

    loop {
        let line = rl.readline(">>> ");
        match line {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                rl.add_history_entry(trimmed).map_err(into_io_error)?;

                if trimmed.starts_with('.') {
                    run_command(env, trimmed)?;
                } else if env.parse_and_eval(&line)? == ParseAndEvalResult::Errored {
                    tracing::debug!(line = %line, "failed evaluating REPL line");
                }
            }

            Err(ReadlineError::Interrupted) => {
                println!("Bye");
                break Ok(());
            }

            Err(ReadlineError::Eof) => {
                break Ok(());
            }

            Err(err) => break Err(into_io_error(err)),
        }
    }
}
