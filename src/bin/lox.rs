//! Lox interpreter command line.
//!
//! When called without argument it drops into an interactive
//! read-evaluate-print loop.  Errors are printed and the loop keeps going.
//!
//! When called with a script path, it runs the script once.  The exit code
//! tells the two failure families apart: 65 for errors found while
//! analyzing the source, 70 for errors that happened while running it.

use std::env;
use std::fs;
use std::io;
use std::io::prelude::*;
use std::process;

use anyhow::Context;

use lox::interpreter::Interpreter;

fn main() -> Result<(), anyhow::Error> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    match args.len() {
        0 => run_prompt()?,
        1 => run_file(&args[0])?,
        _ => {
            eprintln!("Usage: lox [script]");
            process::exit(64);
        }
    }
    Ok(())
}

fn run_file(path: &str) -> Result<(), anyhow::Error> {
    let source =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path))?;

    let mut interp_stdout = io::stdout();
    let mut interp = Interpreter::new(&mut interp_stdout);
    interp.run(&source);

    for message in interp.take_diagnostics() {
        eprintln!("{}", message);
    }
    if interp.had_error() {
        process::exit(65);
    }
    if interp.had_runtime_error() {
        process::exit(70);
    }
    Ok(())
}

fn run_prompt() -> Result<(), io::Error> {
    let stdin = io::stdin();
    let mut repl_stdout = io::stdout();
    let mut interp_stdout = io::stdout();

    let mut interp = Interpreter::new(&mut interp_stdout);

    let mut input = String::new();
    loop {
        repl_stdout.write_all(b"> ")?;
        repl_stdout.flush()?;

        input.clear();
        let nbytes = stdin.read_line(&mut input)?;
        if nbytes == 0 {
            break;
        }

        interp.run(&input);
        for message in interp.take_diagnostics() {
            eprintln!("{}", message);
        }
    }

    Ok(())
}
