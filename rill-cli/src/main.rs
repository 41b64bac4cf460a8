use std::fs;
use std::path::PathBuf;
use std::process::{exit, Command};

use anyhow::{Context, Result};
use clap::Parser;
use tempfile::tempdir;

use rill_compiler::{dump_program, CompileOptions, Compiler, SourceFile, SourceId};

#[derive(Parser)]
#[command(
    name = "rill",
    version,
    about = "Execute rill source files by transpiling them to Go."
)]
struct Cli {
    /// Path to a rill source file.
    input: PathBuf,

    /// Print intermediate artifacts (tokens, typed AST, generated Go
    /// source) to stderr.
    #[arg(long)]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<i32> {
    let contents = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read input file '{}'", cli.input.display()))?;
    let source = SourceFile::new(SourceId(0), cli.input.clone(), contents);

    let mut compiler = Compiler::new(CompileOptions {
        dump_tokens: cli.debug,
    });
    let compilation = match compiler.compile(&source) {
        Ok(compilation) => compilation,
        Err(_) => {
            for diagnostic in compiler.diagnostics().entries() {
                eprintln!(
                    "{}:{}:{}: {}",
                    source.path().display(),
                    diagnostic.line,
                    diagnostic.column,
                    diagnostic.message
                );
            }
            return Ok(1);
        }
    };

    if cli.debug {
        eprint!("{}", dump_program(&compilation.program));
        eprintln!("GENERATED CODE:");
        for (index, line) in compilation.go_source.lines().enumerate() {
            eprintln!("{}: {}", index + 1, line);
        }
    }

    let workdir = tempdir().context("failed to create build directory")?;
    let go_path = workdir.path().join("main.go");
    fs::write(&go_path, &compilation.go_source).context("failed to write generated program")?;
    let binary_path = workdir.path().join("prog");

    let build = Command::new("go")
        .arg("build")
        .arg("-o")
        .arg(&binary_path)
        .arg(&go_path)
        .output()
        .context("failed to invoke the go toolchain")?;
    if !build.status.success() {
        eprintln!("internal error: the generated program failed to compile");
        eprint!("{}", String::from_utf8_lossy(&build.stderr));
        return Ok(1);
    }

    let status = Command::new(&binary_path)
        .status()
        .context("failed to run the compiled program")?;
    Ok(status.code().unwrap_or(1))
}
