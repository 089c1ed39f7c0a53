//! CLI wrapper for the voxscript engine.
//!
//! Usage:
//!   voxscript [--budget N] <file.js>      # Execute a script file
//!   voxscript [--budget N] -e "code"      # Evaluate a script
//!   voxscript [--budget N]                # Start REPL (interactive mode)
//!
//! Diagnostics go to stderr, filtered by `RUST_LOG` (default `warn`).

use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::process;

use tracing_subscriber::EnvFilter;
use voxscript::{Context, ContextConfig, Runtime, RuntimeConfig, ScopeKind, ScriptError};

enum Mode {
    File(String),
    Eval(String),
    Repl,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let mut config = ContextConfig::new();
    let mut mode = Mode::Repl;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            "--budget" => match args.next().and_then(|n| n.parse::<u64>().ok()) {
                Some(0) => config = config.unbounded(),
                Some(n) => config = config.step_budget(n),
                None => usage_error(),
            },
            "-e" | "--eval" => match args.next() {
                Some(code) => mode = Mode::Eval(code),
                None => usage_error(),
            },
            file if !file.starts_with('-') => mode = Mode::File(file.to_string()),
            _ => usage_error(),
        }
    }

    let runtime = match Runtime::new(RuntimeConfig::new()) {
        Ok(r) => r,
        Err(e) => fail(&e),
    };
    let mut ctx = match Context::new(&runtime, config) {
        Ok(c) => c,
        Err(e) => fail(&e),
    };

    match mode {
        Mode::File(filename) => {
            let source = match fs::read_to_string(&filename) {
                Ok(content) => content,
                Err(e) => {
                    eprintln!("Error reading file '{}': {}", filename, e);
                    process::exit(1);
                }
            };
            if let Err(e) = ctx.evaluate(&source, false, true) {
                report(&ctx, &e);
                process::exit(1);
            }
        }
        Mode::Eval(code) => match ctx.eval(&code) {
            Ok(Some(value)) => println!("{}", value),
            Ok(None) => {}
            Err(e) => {
                report(&ctx, &e);
                process::exit(1);
            }
        },
        Mode::Repl => run_repl(&mut ctx),
    }
}

fn print_usage() {
    eprintln!("voxscript - scoped script engine");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  voxscript [--budget N] <file.js>   Execute a script file");
    eprintln!("  voxscript [--budget N] -e \"code\"   Evaluate a script");
    eprintln!("  voxscript [--budget N]             Start REPL (interactive mode)");
    eprintln!();
    eprintln!("  --budget N   step budget per evaluation, 0 for none");
}

fn usage_error() -> ! {
    print_usage();
    process::exit(1);
}

fn fail(error: &ScriptError) -> ! {
    eprintln!("Error: {}", error);
    process::exit(1);
}

fn report(ctx: &Context, error: &ScriptError) {
    eprintln!("Error: {}", error);
    if let Some(exception) = ctx.last_exception() {
        eprintln!("  {}", exception);
    }
}

fn print_repl_help() {
    println!("  :push NAME       push a nested scope");
    println!("  :alias NAME      name the current scope NAME as well");
    println!("  :pop             pop the last alias or scope");
    println!("  :clear           drop every scope above global");
    println!("  :ro NAME         make a variable read-only");
    println!("  :exception       show the last captured exception");
    println!("  :gc              collect garbage now");
    println!("  .exit            quit");
}

fn run_repl(ctx: &mut Context) {
    println!("voxscript v{}", env!("CARGO_PKG_VERSION"));
    println!("Type script code and press Enter. Type :help for commands, .exit to quit.");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();

    loop {
        print!("{}> ", ctx.scope_name());
        if stdout.flush().is_err() {
            break;
        }

        let input = match lines.next() {
            None => break,
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                eprintln!("Error reading input: {}", e);
                break;
            }
        };
        let input = input.trim();

        if input == ".exit" || input == ".quit" {
            break;
        }
        if input.is_empty() {
            continue;
        }

        if let Some(command) = input.strip_prefix(':') {
            let mut parts = command.split_whitespace();
            let result = match (parts.next(), parts.next()) {
                (Some("push"), Some(name)) => ctx.push_scope(name, ScopeKind::Nested),
                (Some("alias"), Some(name)) => ctx.push_scope(name, ScopeKind::Alias),
                (Some("pop"), None) => ctx.pop_scope(),
                (Some("clear"), None) => ctx.clear_scopes(),
                (Some("ro"), Some(name)) => ctx.set_read_only(name),
                (Some("exception"), None) => {
                    match ctx.last_exception() {
                        Some(exception) => println!("{}", exception),
                        None => println!("no exception"),
                    }
                    Ok(())
                }
                (Some("gc"), None) => ctx.collect_garbage().map(|freed| {
                    println!("freed {} objects, {} live", freed, ctx.live_objects());
                }),
                _ => {
                    print_repl_help();
                    Ok(())
                }
            };
            if let Err(e) = result {
                eprintln!("Error: {}", e);
            }
            continue;
        }

        match ctx.eval(input) {
            Ok(Some(value)) => println!("{}", value),
            Ok(None) => {}
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    println!("Goodbye!");
}
