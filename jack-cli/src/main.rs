//! Entrypoint for CLI
use std::{
    env,
    error::Error,
    fs,
    path::{Path, PathBuf},
    process,
};

use log::{error, info};

static USAGE: &str = r#"
usage: jackc CMD PATH

commands:
    compile   Compile the target source file, or every source file in a directory
    tokens    Print the token stream of the target source file as markup

examples:
    jackc compile Square.jack
    jackc compile projects/Square
    jackc tokens Square.jack
"#;

fn run_compile(path: impl AsRef<Path>) -> Result<(), Box<dyn Error>> {
    let sources = collect_sources(path.as_ref())?;
    if sources.is_empty() {
        error!("no .jack files found in {}", path.as_ref().display());
        process::exit(1);
    }

    let mut failed = 0;
    for source_path in &sources {
        info!("compiling {}", source_path.display());
        match compile_unit(source_path) {
            Ok(out_path) => info!("wrote {}", out_path.display()),
            Err(err) => {
                // Failures are scoped per source unit; keep going.
                error!("{}: {}", source_path.display(), err);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        error!("{} of {} source files failed", failed, sources.len());
        process::exit(1);
    }
    Ok(())
}

/// Compile one source unit to its `.vm` sibling.
///
/// On failure the partially written output file is left in place so
/// whatever was emitted can be inspected.
fn compile_unit(source_path: &Path) -> jack_compiler::JackResult<PathBuf> {
    let source = fs::read_to_string(source_path)?;
    let out_path = source_path.with_extension("vm");
    let outfile = fs::File::create(&out_path)?;

    jack_compiler::compile_source(&source, outfile)?;
    Ok(out_path)
}

fn run_tokens(path: impl AsRef<Path>) -> Result<(), Box<dyn Error>> {
    let source = fs::read_to_string(path.as_ref())?;
    let markup = jack_compiler::tokenize_to_markup(&source)?;
    print!("{}", markup);
    Ok(())
}

/// A `.jack` file contributes itself; a directory contributes every
/// `.jack` file inside it.
fn collect_sources(path: &Path) -> std::io::Result<Vec<PathBuf>> {
    if path.is_dir() {
        let mut files = vec![];
        for entry in fs::read_dir(path)? {
            let entry_path = entry?.path();
            if entry_path.extension().map(|ext| ext == "jack").unwrap_or(false) {
                files.push(entry_path);
            }
        }
        // Deterministic compile order.
        files.sort();
        Ok(files)
    } else {
        Ok(vec![path.to_path_buf()])
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new().env().init().unwrap();

    match parse_args() {
        Some(Cmd::Compile { path }) => run_compile(path)?,
        Some(Cmd::Tokens { path }) => run_tokens(path)?,
        None => {
            print_usage();
            // FreeBSD EX_USAGE (64)
            std::process::exit(64)
        }
    }

    Ok(())
}

fn parse_args() -> Option<Cmd> {
    let mut args = env::args().skip(1);
    match args.next() {
        Some(cmd) => match cmd.as_str() {
            "compile" => Some(Cmd::Compile {
                path: consume_arg(args)?,
            }),
            "tokens" => Some(Cmd::Tokens {
                path: consume_arg(args)?,
            }),
            _ => None,
        },
        None => None,
    }
}

/// Consumes the next argument, if it exists.
fn consume_arg(mut args: impl Iterator<Item = String>) -> Option<PathBuf> {
    args.next().map(PathBuf::from)
}

fn print_usage() {
    println!("{USAGE}");
}

enum Cmd {
    /// Compile source files
    Compile { path: PathBuf },
    /// Dump the token stream
    Tokens { path: PathBuf },
}
