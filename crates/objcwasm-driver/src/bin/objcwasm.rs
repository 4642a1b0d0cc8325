//! objcwasm CLI

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use objcwasm_driver::{BuildError, DriverConfig, Pipeline};

#[derive(Parser, Debug)]
#[command(name = "objcwasm")]
#[command(about = "Compile an Objective-C source file to a WASI WebAssembly module")]
#[command(version)]
struct Args {
    /// Objective-C source file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// JSON config file; flags and environment variables take precedence
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory containing clang and llc
    #[arg(long, value_name = "DIR", env = "OBJCWASM_LLVM_BIN")]
    llvm_bin: Option<PathBuf>,

    /// WASI sysroot for the host wasm compile
    #[arg(long, value_name = "DIR", env = "OBJCWASM_WASI_SYSROOT")]
    sysroot: Option<PathBuf>,

    /// Output directory for generated files
    #[arg(short, long, value_name = "DIR", env = "OBJCWASM_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// wasi-sdk image used when the host wasm compile fails
    #[arg(long, value_name = "IMAGE", env = "OBJCWASM_FALLBACK_IMAGE")]
    image: Option<String>,

    /// Container runtime executable
    #[arg(long, value_name = "PROGRAM", env = "OBJCWASM_CONTAINER_RUNTIME")]
    container_runtime: Option<String>,

    /// Fail instead of retrying the wasm step in a container
    #[arg(long)]
    no_fallback: bool,

    /// Print the commands without running them
    #[arg(long)]
    dry_run: bool,

    /// With --dry-run, print the plan as JSON
    #[arg(long, requires = "dry_run")]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version also arrive here, on stdout
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("\nBuild failed: {:#}", e);
        let code = e
            .downcast_ref::<BuildError>()
            .map(BuildError::exit_code)
            .unwrap_or(1);
        process::exit(code);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> anyhow::Result<()> {
    let config = resolve_config(args)?;
    tracing::info!(?config, "resolved configuration");

    let mut pipeline = Pipeline::new(config);

    if args.dry_run {
        let plan = pipeline.plan(&args.input)?;
        if args.json {
            let json = serde_json::to_string_pretty(&plan).context("failed to serialize build plan")?;
            println!("{}", json);
        } else {
            for step in &plan.steps {
                println!("{}: {}", step.stage, step.command);
            }
        }
        return Ok(());
    }

    let output = pipeline.build(&args.input)?;

    if args.verbose {
        println!("\nArtifacts:");
        for path in output.artifacts.outputs() {
            println!("  {}", path.display());
        }
        if output.used_fallback {
            println!("  (wasm built by {})", pipeline.config().fallback.image);
        }
    }
    println!("\nBuild complete -> {}", output.artifacts.wasm.display());

    Ok(())
}

/// Defaults, then the config file, then environment variables and flags.
fn resolve_config(args: &Args) -> anyhow::Result<DriverConfig> {
    let mut config = match &args.config {
        Some(path) => DriverConfig::from_file(path).context("failed to load configuration")?,
        None => DriverConfig::default(),
    };

    if let Some(dir) = &args.llvm_bin {
        config = config.llvm_bin(dir);
    }
    if let Some(dir) = &args.sysroot {
        config = config.wasi_sysroot(dir);
    }
    if let Some(dir) = &args.output_dir {
        config = config.output_dir(dir);
    }
    if let Some(image) = &args.image {
        config = config.fallback_image(image);
    }
    if let Some(runtime) = &args.container_runtime {
        config = config.container_runtime(runtime);
    }
    if args.no_fallback {
        config = config.fallback_enabled(false);
    }

    Ok(config)
}
