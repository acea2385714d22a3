use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use pwaro_compiler::backend::{ExecutionHost, Interpreter, Lli};
use pwaro_compiler::ir::Module;
use pwaro_compiler::{compile_to_ir_with, CompileOptions};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pwaro")]
#[command(about = "Compile pwaro programs to LLVM-style IR and run them")]
struct Args {
    /// Path to the source file to compile
    file: PathBuf,

    /// Print the generated IR before running
    #[arg(long)]
    emit_ir: bool,

    /// Write the IR to this file instead of running the program
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Where to run the compiled module
    #[arg(long, value_enum, default_value_t = HostOpt::Interp)]
    host: HostOpt,

    /// The `lli` executable used by `--host lli`
    #[arg(long, env = "PWARO_LLI", default_value = "lli")]
    lli: PathBuf,

    /// Keep the `.ll` file written for `--host lli`
    #[arg(long)]
    keep_ir: bool,

    /// List the module's functions after compiling
    #[arg(long)]
    dump_symbols: bool,

    /// Log more (-v debug, -vv trace). RUST_LOG is used when not given.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum HostOpt {
    /// Built-in interpreter
    Interp,
    /// LLVM's `lli`
    Lli,
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Compile `args.file` and either write or execute it. Returns everything
/// meant for stdout.
fn run(args: &Args) -> Result<String> {
    let source = fs::read_to_string(&args.file)
        .with_context(|| format!("Error reading file '{}'", args.file.display()))?;
    let options = CompileOptions {
        module_name: module_name(&args.file),
    };
    let module = compile_to_ir_with(&source, &options).context("Compilation error")?;
    debug!(functions = module.functions.len(), "compiled");

    let mut out = String::new();
    if args.emit_ir {
        out.push_str("Generated IR:\n");
        for line in module.to_lines() {
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');
    }
    if args.dump_symbols {
        out.push_str(&dump_symbols(&module));
    }

    if let Some(path) = &args.output {
        fs::write(path, module.to_string())
            .with_context(|| format!("Error writing IR to '{}'", path.display()))?;
        info!(path = %path.display(), "wrote IR");
        return Ok(out);
    }

    let host: Box<dyn ExecutionHost> = match args.host {
        HostOpt::Interp => Box::new(Interpreter::default()),
        HostOpt::Lli => Box::new(Lli::new(&args.lli, ir_path(&args.file)).keep_ir(args.keep_ir)),
    };
    let printed = host.execute(&module).context("Execution failed")?;
    out.push_str(&printed);
    Ok(out)
}

fn module_name(file: &Path) -> String {
    file.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| CompileOptions::default().module_name)
}

fn ir_path(file: &Path) -> PathBuf {
    file.with_extension("ll")
}

fn dump_symbols(module: &Module) -> String {
    let mut out = String::from("Functions:\n");
    for func in &module.functions {
        let line = if func.is_declaration() {
            format!("  declare {}\n", func.name)
        } else {
            format!(
                "  define  {} ({} instructions)\n",
                func.name,
                func.instr_count()
            )
        };
        out.push_str(&line);
    }
    out
}
