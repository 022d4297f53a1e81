use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use ilify::diagnostic::render_diagnostics;
use ilify::{generate_with_options, CompilationInput, GenOptions};

#[derive(Parser)]
#[command(
    name = "ilify",
    version,
    about = "ilify — emit stack-machine module builder programs from resolved syntax trees"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate the builder program for a resolved-tree JSON document
    Build {
        /// Input JSON file (resolved tree + semantic model)
        input: PathBuf,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Reject unsupported constructs instead of degrading to comments
        #[arg(long)]
        strict: bool,
        /// Omit comments echoing the originating source constructs
        #[arg(long)]
        no_comments: bool,
    },
    /// Validate an input document without writing output
    Check {
        /// Input JSON file (resolved tree + semantic model)
        input: PathBuf,
        /// Reject unsupported constructs instead of degrading to comments
        #[arg(long)]
        strict: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match cli.command {
        Command::Build {
            input,
            output,
            strict,
            no_comments,
        } => build(&input, output.as_deref(), strict, no_comments),
        Command::Check { input, strict } => check(&input, strict),
    };
    process::exit(exit_code);
}

fn load_input(path: &Path) -> Result<CompilationInput, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("cannot parse {}: {}", path.display(), e))
}

fn build(input: &Path, output: Option<&Path>, strict: bool, no_comments: bool) -> i32 {
    let compilation = match load_input(input) {
        Ok(c) => c,
        Err(message) => {
            eprintln!("error: {}", message);
            return 1;
        }
    };

    let options = GenOptions::default()
        .with_strict(strict)
        .with_source_comments(!no_comments);
    let result = match generate_with_options(&compilation, &options) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("error: {}", e);
            return 1;
        }
    };

    render_diagnostics(
        &result.diagnostics,
        &compilation.source_name,
        compilation.source.as_deref(),
    );

    match output {
        Some(path) => {
            if let Err(e) = fs::write(path, &result.text) {
                eprintln!("error: cannot write {}: {}", path.display(), e);
                return 1;
            }
            println!("wrote {}", path.display());
        }
        None => print!("{}", result.text),
    }
    0
}

fn check(input: &Path, strict: bool) -> i32 {
    let compilation = match load_input(input) {
        Ok(c) => c,
        Err(message) => {
            eprintln!("error: {}", message);
            return 1;
        }
    };

    let options = GenOptions::default().with_strict(strict);
    match generate_with_options(&compilation, &options) {
        Ok(result) => {
            render_diagnostics(
                &result.diagnostics,
                &compilation.source_name,
                compilation.source.as_deref(),
            );
            println!(
                "{}: ok ({} warning{})",
                compilation.source_name,
                result.diagnostics.len(),
                if result.diagnostics.len() == 1 { "" } else { "s" }
            );
            0
        }
        Err(e) => {
            eprintln!("error: {}", e);
            1
        }
    }
}
