//! Shade Compiler - compiles shader source into an IR container
//!
//! Usage: shadec [OPTIONS] <input> [-o <output>]

use anyhow::Context;
use clap::Parser as ClapParser;
use shade_compiler::{DiagnosticReporter, Session, SessionConfig};
use std::fs;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser, Debug)]
#[command(name = "shadec")]
#[command(version)]
#[command(about = "Semantic checker and CFG code generator for a small shader language", long_about = None)]
struct Args {
    /// Input shader source file
    #[arg(required = true)]
    input: PathBuf,

    /// Output container file (defaults to the input with a .shbin extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only run the checker; write nothing
    #[arg(long)]
    check: bool,

    /// Log debug events from every pass
    #[arg(short, long)]
    verbose: bool,

    /// Dump IR (for debugging)
    #[arg(long)]
    dump_ir: bool,

    /// Dump AST (for debugging)
    #[arg(long)]
    dump_ast: bool,

    /// Dump tokens (for debugging)
    #[arg(long)]
    dump_tokens: bool,
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("error: {:#}", e);
            process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,shade_compiler=debug"
    } else {
        "warn,shade_compiler=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Returns `false` when compilation failed and errors were reported
fn run(args: &Args) -> anyhow::Result<bool> {
    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let filename = args.input.display().to_string();

    let mut reporter = DiagnosticReporter::new();
    let file_id = reporter.add_file(&filename, &source);

    let module_name = args
        .input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(shade_compiler::codegen::DEFAULT_MODULE_NAME)
        .to_string();

    let session = Session::new(SessionConfig {
        module_name,
        dump_tokens: args.dump_tokens,
        dump_ast: args.dump_ast,
        dump_ir: args.dump_ir,
        check_only: args.check,
    });

    let compilation = match session.run(&source) {
        Ok(Some(compilation)) => compilation,
        Ok(None) => {
            tracing::info!("{}: no problems found", filename);
            return Ok(true);
        }
        Err(e) => {
            reporter.report_error(file_id, &e);
            return Ok(false);
        }
    };

    let output_path = args.output.clone().unwrap_or_else(|| {
        let mut path = args.input.clone();
        path.set_extension("shbin");
        path
    });

    fs::write(&output_path, &compilation.bytes)
        .with_context(|| format!("writing {}", output_path.display()))?;
    tracing::info!(
        output = %output_path.display(),
        bytes = compilation.bytes.len(),
        "wrote container"
    );
    Ok(true)
}
